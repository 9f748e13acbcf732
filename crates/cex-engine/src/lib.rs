//! Content-addressed pipeline execution engine.
//!
//! See the crate's design document for the full module-by-module
//! breakdown; in short: [`Node`]/[`Namespace`] describe a pipeline,
//! [`Engine`] owns the root path, serializer registry, and metadata store,
//! and [`Engine::run`] validates then executes a namespace.

pub mod data;
pub mod exec;
pub mod graph;
pub mod match_rules;
pub mod meta;
pub mod namespace;
pub mod node;
pub mod serializer;
pub mod validate;

pub use data::{DataId, DataInfo, TypeTag};
pub use exec::{Engine, NodeState};
pub use graph::Graph;
pub use meta::{MetaStore, NamespaceMeta, NodeMeta};
pub use namespace::Namespace;
pub use node::{Node, NodeBuilder, NodeFn, NodeFnError, NodeRuntimeId, ParamSpec};
pub use serializer::{Serializer, SerializerRegistry};
pub use validate::validate_namespace;
