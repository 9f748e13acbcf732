//! The node model (C3): a declarative description of one computation.
//!
//! Rust has no runtime reflection, so the "typed builder" described in the
//! design notes is not optional here: [`NodeBuilder`] is the only way to
//! construct a [`Node`]. Callers supply the parameter list, return type, and
//! a qualified function name explicitly instead of relying on introspection.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use camino::Utf8PathBuf;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::data::{DataInfo, TypeTag};
use crate::serializer::Serializer;

/// The error a node's own function can fail with. The engine wraps it in
/// `RuntimeError::NodeFailed` together with the node's name before it
/// reaches the caller of `Engine::run`.
pub type NodeFnError = Box<dyn std::error::Error + Send + Sync>;

/// A node's callable: bound parameters in, one value out.
pub type NodeFn = dyn Fn(&HashMap<String, Value>) -> Result<Value, NodeFnError> + Send + Sync;

/// One parameter a node's function requires.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub type_tag: TypeTag,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, type_tag: TypeTag) -> Self {
        Self {
            name: name.into(),
            type_tag,
        }
    }
}

static NEXT_RUNTIME_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRuntimeId(u64);

impl NodeRuntimeId {
    fn fresh() -> Self {
        Self(NEXT_RUNTIME_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// One declared computation: a function plus its wiring metadata.
///
/// Immutable once built. Wiring (`continue_with`) happens on the builder,
/// before the node is finalized and shared via `Arc`. A diamond join is
/// wired by building the shared successor first, then cloning its `Arc`
/// into each predecessor that feeds it.
pub struct Node {
    pub runtime_id: NodeRuntimeId,
    pub name: String,
    pub function_name: String,
    pub function: Arc<NodeFn>,
    pub params: Vec<ParamSpec>,
    pub return_type: Option<TypeTag>,
    pub input_aliases: HashMap<String, Vec<String>>,
    pub output_name: Option<String>,
    pub is_cached: bool,
    pub input_directory: Option<Utf8PathBuf>,
    pub output_directory: String,
    pub input_serializers: HashMap<String, Arc<dyn Serializer>>,
    pub output_serializer: Option<Arc<dyn Serializer>>,
    pub subsequent_nodes: Vec<Arc<Node>>,
}

impl Node {
    pub fn builder(
        name: impl Into<String>,
        function_name: impl Into<String>,
        params: Vec<ParamSpec>,
        function: impl Fn(&HashMap<String, Value>) -> Result<Value, NodeFnError> + Send + Sync + 'static,
    ) -> NodeBuilder {
        let name = name.into();
        NodeBuilder {
            output_directory: name.clone(),
            name,
            function_name: function_name.into(),
            function: Arc::new(function),
            params,
            return_type: None,
            input_aliases: HashMap::new(),
            output_name: None,
            is_cached: None,
            input_directory: None,
            input_serializers: HashMap::new(),
            output_serializer: None,
            subsequent_nodes: Vec::new(),
        }
    }

    /// One `DataInfo` per function parameter, per §4.3.
    pub fn required_inputs(&self) -> Vec<DataInfo> {
        self.params
            .iter()
            .map(|p| DataInfo::required(p.name.clone(), p.type_tag.clone()))
            .collect()
    }

    /// The alias list a parameter matches against; defaults to `[param_name]`.
    pub fn input_aliases(&self, param_name: &str) -> Vec<String> {
        self.input_aliases
            .get(param_name)
            .cloned()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| vec![param_name.to_string()])
    }

    /// Present iff `output_name` is set. The edge's declared type comes
    /// from `return_type`, defaulting to unknown if the builder never set
    /// one (a validation defect the validator will flag separately).
    pub fn output_information(&self) -> Option<DataInfo> {
        let output_name = self.output_name.as_ref()?;
        let type_tag = self.return_type.clone().unwrap_or_else(TypeTag::unknown);
        Some(DataInfo::required(output_name.clone(), type_tag))
    }

    /// Path an output would be saved at, given the resolved output
    /// serializer's extension. `None` for a non-cached node, whose output
    /// never touches disk.
    pub fn output_path(&self, namespace_root: &Utf8PathBuf, extension: &str) -> Option<Utf8PathBuf> {
        if !self.is_cached {
            return None;
        }
        let output_name = self.output_name.as_ref()?;
        Some(
            namespace_root
                .join(&self.output_directory)
                .join(format!("{output_name}.{extension}")),
        )
    }

    /// SHA-256 over the canonical `"|"`-joined stable attributes (§4.3):
    /// name, is_cached, qualified function name, output_name,
    /// input_directory, output_directory, sorted input_aliases. Excludes
    /// `runtime_id`, `subsequent_nodes`, serializer bindings, and the
    /// function body.
    pub fn persistent_hash(&self) -> String {
        let sorted_aliases: BTreeMap<_, _> = self.input_aliases.iter().collect();
        let aliases_repr = sorted_aliases
            .iter()
            .map(|(k, v)| format!("{k}={}", v.join(",")))
            .collect::<Vec<_>>()
            .join(";");

        let stable = [
            self.name.as_str(),
            if self.is_cached { "true" } else { "false" },
            self.function_name.as_str(),
            self.output_name.as_deref().unwrap_or(""),
            self.input_directory.as_deref().map(|p| p.as_str()).unwrap_or(""),
            self.output_directory.as_str(),
            aliases_repr.as_str(),
        ]
        .join("|");

        let mut hasher = Sha256::new();
        hasher.update(stable.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Keys used for this node's `input_hashes` map in metadata: one per
    /// parameter name.
    pub fn input_keys(&self) -> Vec<String> {
        self.params.iter().map(|p| p.name.clone()).collect()
    }
}

/// One `DataInfo` per file found directly under `dir`, named by file stem,
/// typed unknown, with hash left unpopulated (callers hash lazily). Used
/// for both a node's `input_directory` and, per §4.3, to populate
/// available inputs during validation and preparation.
pub fn available_file_inputs(dir: &std::path::Path) -> std::io::Result<Vec<DataInfo>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut inputs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let Ok(utf8_path) = Utf8PathBuf::from_path_buf(path.clone()) else {
            continue;
        };
        inputs.push(DataInfo::with_path(stem.to_string(), TypeTag::unknown(), utf8_path));
    }
    Ok(inputs)
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("runtime_id", &self.runtime_id)
            .field("is_cached", &self.is_cached)
            .field("output_name", &self.output_name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.runtime_id == other.runtime_id
    }
}
impl Eq for Node {}

impl std::hash::Hash for Node {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.runtime_id.hash(state);
    }
}

pub struct NodeBuilder {
    name: String,
    function_name: String,
    function: Arc<NodeFn>,
    params: Vec<ParamSpec>,
    return_type: Option<TypeTag>,
    input_aliases: HashMap<String, Vec<String>>,
    output_name: Option<String>,
    is_cached: Option<bool>,
    input_directory: Option<Utf8PathBuf>,
    output_directory: String,
    input_serializers: HashMap<String, Arc<dyn Serializer>>,
    output_serializer: Option<Arc<dyn Serializer>>,
    subsequent_nodes: Vec<Arc<Node>>,
}

impl NodeBuilder {
    pub fn output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    pub fn return_type(mut self, type_tag: TypeTag) -> Self {
        self.return_type = Some(type_tag);
        self
    }

    pub fn alias(mut self, param_name: impl Into<String>, alias: impl Into<String>) -> Self {
        self.input_aliases
            .entry(param_name.into())
            .or_default()
            .push(alias.into());
        self
    }

    pub fn not_cached(mut self) -> Self {
        self.is_cached = Some(false);
        self
    }

    /// Opt a sink (a node with no `output_name`) into caching: its skip
    /// decision is then driven entirely by its input hashes. A producing
    /// node is cached by default and never needs this.
    pub fn cached(mut self) -> Self {
        self.is_cached = Some(true);
        self
    }

    pub fn input_directory(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.input_directory = Some(dir.into());
        self
    }

    pub fn output_directory(mut self, dir: impl Into<String>) -> Self {
        self.output_directory = dir.into();
        self
    }

    pub fn input_serializer(mut self, param_name: impl Into<String>, serializer: Arc<dyn Serializer>) -> Self {
        self.input_serializers.insert(param_name.into(), serializer);
        self
    }

    pub fn output_serializer(mut self, serializer: Arc<dyn Serializer>) -> Self {
        self.output_serializer = Some(serializer);
        self
    }

    /// Append a successor. May be called more than once to fan out to
    /// several successors; repeated edges to the same successor are
    /// permitted.
    pub fn continue_with(mut self, successor: Arc<Node>) -> Self {
        self.subsequent_nodes.push(successor);
        self
    }

    pub fn build(self) -> Arc<Node> {
        // A producing node (one with an output) is cached by default; a
        // sink has nothing to cache unless told otherwise.
        let is_cached = self.is_cached.unwrap_or(self.output_name.is_some());

        Arc::new(Node {
            runtime_id: NodeRuntimeId::fresh(),
            name: self.name,
            function_name: self.function_name,
            function: self.function,
            params: self.params,
            return_type: self.return_type,
            input_aliases: self.input_aliases,
            output_name: self.output_name,
            is_cached,
            input_directory: self.input_directory,
            output_directory: self.output_directory,
            input_serializers: self.input_serializers,
            output_serializer: self.output_serializer,
            subsequent_nodes: self.subsequent_nodes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn noop_node(name: &str) -> Arc<Node> {
        Node::builder(name, "tests.noop", vec![], |_| Ok(Value::Null)).build()
    }

    #[test]
    fn persistent_hash_ignores_runtime_id() {
        let a = noop_node("same");
        let b = noop_node("same");
        assert_eq!(a.persistent_hash(), b.persistent_hash());
        assert_ne!(a.runtime_id, b.runtime_id);
    }

    #[test]
    fn persistent_hash_changes_with_name() {
        let a = noop_node("a");
        let b = noop_node("b");
        assert_ne!(a.persistent_hash(), b.persistent_hash());
    }

    #[test]
    fn persistent_hash_ignores_subsequent_nodes() {
        let leaf1 = noop_node("leaf");
        let leaf2 = noop_node("leaf2");

        let with_leaf1 = Node::builder("root", "tests.noop", vec![], |_| Ok(Value::Null))
            .continue_with(leaf1)
            .build();
        let with_leaf2 = Node::builder("root", "tests.noop", vec![], |_| Ok(Value::Null))
            .continue_with(leaf2)
            .build();

        assert_eq!(with_leaf1.persistent_hash(), with_leaf2.persistent_hash());
    }

    #[test]
    fn default_alias_is_param_name() {
        let node = Node::builder(
            "n",
            "tests.noop",
            vec![ParamSpec::new("x", TypeTag::new("int"))],
            |_| Ok(Value::Null),
        )
        .build();
        assert_eq!(node.input_aliases("x"), vec!["x".to_string()]);
    }

    #[test]
    fn sink_node_has_no_output_information() {
        let node = noop_node("sink");
        assert!(node.output_information().is_none());
    }

    proptest::proptest! {
        /// Persistent hash is a deterministic function of a node's stable
        /// attributes: rebuilding the exact same definition twice always
        /// produces the same hash (§8 invariant 3), independent of what the
        /// function closure captures or computes.
        #[test]
        fn persistent_hash_is_deterministic_and_ignores_function_body(
            name in "[a-z]{1,8}", output in "[a-z]{1,8}", seed in 0i64..1000,
        ) {
            let build = |seed: i64| {
                Node::builder(name.clone(), "tests.fn", vec![], move |_| Ok(Value::from(seed)))
                    .output_name(output.clone())
                    .return_type(TypeTag::new("int"))
                    .build()
            };
            let a = build(seed);
            let b = build(seed.wrapping_add(1));
            prop_assert_eq!(a.persistent_hash(), b.persistent_hash());
        }

        /// Changing the node name always changes the hash, regardless of
        /// what else is held constant.
        #[test]
        fn persistent_hash_changes_with_name_property(
            name_a in "[a-z]{1,8}", name_b in "[a-z]{1,8}",
        ) {
            prop_assume!(name_a != name_b);
            let a = Node::builder(name_a, "tests.fn", vec![], |_| Ok(Value::Null)).build();
            let b = Node::builder(name_b, "tests.fn", vec![], |_| Ok(Value::Null)).build();
            prop_assert_ne!(a.persistent_hash(), b.persistent_hash());
        }
    }
}
