//! Facade over the `cex` workspace.
//!
//! Embedding a pipeline into another program only needs this one crate:
//! it re-exports the engine's public surface (`cex-engine`) and the
//! programmatic configuration builder (`cex-config`) so callers don't have
//! to depend on either directly.

pub use cex_config::EngineConfig;
pub use cex_engine::{
    validate_namespace, DataId, DataInfo, Engine, Graph, MetaStore, Namespace, NamespaceMeta,
    Node, NodeBuilder, NodeFn, NodeFnError, NodeMeta, NodeRuntimeId, NodeState, ParamSpec,
    Serializer, SerializerRegistry, TypeTag,
};
