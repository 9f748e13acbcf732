//! The scheduler/executor (C7): per-node state machine, match-based input
//! resolution, and the skip/run decision.

use std::collections::HashMap;
use std::sync::Arc;

use camino::Utf8PathBuf;
use cex_utils::error::{CexError, RuntimeError};
use cex_utils::hash::hash_file;
use cex_utils::paths::RootPath;
use serde_json::Value;

use crate::data::{value_shape, DataInfo};
use crate::match_rules::{best_match, MatchOutcome};
use crate::meta::MetaStore;
use crate::namespace::Namespace;
use crate::node::{available_file_inputs, Node, NodeRuntimeId};
use crate::serializer::{resolve_serializer, Serializer, SerializerRegistry};
use crate::validate::validate_namespace;

/// A node's lifecycle within one run (§4.7). `Skipped` and `Error` are
/// terminal; `Ready` always transitions to `Running` then to exactly one
/// of `Executed` or `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Uninitialized,
    Ready,
    Skipped,
    Running,
    Executed,
    Error,
}

/// Process-wide engine state: the root path, the engine-scope serializer
/// registry, and the metadata store. One `Engine` drives any number of
/// namespace runs.
pub struct Engine {
    pub root: RootPath,
    pub serializers: SerializerRegistry,
    pub meta: MetaStore,
}

impl Engine {
    pub fn new(root: RootPath) -> Result<Self, CexError> {
        let meta = MetaStore::open(&root)?;
        Ok(Self {
            root,
            serializers: SerializerRegistry::new(),
            meta,
        })
    }

    pub fn add_serializer_for_type(&mut self, type_tag: crate::data::TypeTag, serializer: Arc<dyn Serializer>) {
        self.serializers.register_for_type(type_tag, serializer);
    }

    pub fn add_default_serializer(&mut self, serializer: Arc<dyn Serializer>) {
        self.serializers.register_default(serializer);
    }

    /// Validate, then execute, a namespace.
    ///
    /// Preparation and execution (§4.7) are fused into one topological
    /// pass. A node's skip/run decision depends only on its predecessors,
    /// all of which appear earlier in the same topological order, so
    /// deciding and then immediately acting on each node in turn is
    /// observationally identical to deciding every node first and
    /// executing afterward.
    pub fn run(&mut self, namespace: &Namespace) -> Result<(), CexError> {
        let namespace_root = self.root.join(&namespace.path);
        let graph = validate_namespace(namespace, &namespace_root, &self.serializers)?;

        let live_nodes: Vec<(String, Vec<String>)> = graph
            .topo_order
            .iter()
            .map(|n| (n.persistent_hash(), n.input_keys()))
            .collect();
        self.meta
            .namespace_mut(&namespace.name)
            .update_from(live_nodes.iter().map(|(h, k)| (h.as_str(), k.clone())));

        let mut inbox: HashMap<NodeRuntimeId, Vec<DataInfo>> = HashMap::new();

        for node in &graph.topo_order {
            let available = self.available_inputs(node, &namespace_root, &inbox);
            let state = self.decide_state(node, namespace, &available)?;

            match state {
                NodeState::Skipped => {
                    if let Some(output) = self.skipped_output(node, namespace, &namespace_root)? {
                        self.fan_out(node, output, &mut inbox);
                    }
                }
                NodeState::Ready => {
                    let outcome = self.execute_node(node, namespace, &namespace_root, &available);
                    match outcome {
                        Ok(output) => {
                            if let Some(output) = output {
                                self.fan_out(node, output, &mut inbox);
                            }
                        }
                        Err(e) => return Err(e),
                    }
                }
                _ => unreachable!("decide_state only returns Ready or Skipped"),
            }
        }

        Ok(())
    }

    fn fan_out(&self, node: &Node, output: DataInfo, inbox: &mut HashMap<NodeRuntimeId, Vec<DataInfo>>) {
        for successor in &node.subsequent_nodes {
            inbox.entry(successor.runtime_id).or_default().push(output.clone());
        }
    }

    fn available_inputs(
        &self,
        node: &Node,
        namespace_root: &Utf8PathBuf,
        inbox: &HashMap<NodeRuntimeId, Vec<DataInfo>>,
    ) -> Vec<DataInfo> {
        let mut available = inbox.get(&node.runtime_id).cloned().unwrap_or_default();

        if let Some(dir) = &node.input_directory {
            let full_dir = namespace_root.join(dir);
            if let Ok(files) = available_file_inputs(full_dir.as_std_path()) {
                for mut file in files {
                    if let Some(path) = &file.path {
                        file.hash = hash_file(path.as_std_path()).ok().flatten();
                    }
                    available.push(file);
                }
            }
        }

        available
    }

    fn decide_state(
        &self,
        node: &Node,
        namespace: &Namespace,
        available: &[DataInfo],
    ) -> Result<NodeState, CexError> {
        if !node.is_cached {
            return Ok(NodeState::Ready);
        }

        let persistent_hash = node.persistent_hash();
        let ns_meta = self
            .meta
            .namespace(&namespace.name)
            .expect("namespace metadata reconciled before preparation");
        let node_meta = ns_meta
            .node_meta(&persistent_hash)
            .expect("node metadata reconciled before preparation");

        // A node that has never executed has nothing to compare against,
        // including one with zero required inputs, for which the loop below
        // would otherwise vacuously conclude "current" on its very first run.
        // This also covers a cached sink (no `output_name`): caching such a
        // node is driven entirely by its input hashes, not an output hash.
        if !node_meta.executed {
            return Ok(NodeState::Ready);
        }

        for param in &node.params {
            let aliases = node.input_aliases(&param.name);
            match best_match(&aliases, &param.type_tag, available.iter()) {
                MatchOutcome::Resolved(candidate) => match &candidate.hash {
                    Some(hash) if node_meta.is_current_input(&param.name, hash) => continue,
                    _ => return Ok(NodeState::Ready),
                },
                // Validation already guaranteed exactly one match; if the
                // runtime disagrees (e.g. a file appeared since validation)
                // treat it the same as an ambiguous/runtime failure.
                MatchOutcome::Unsatisfied => {
                    return Err(CexError::Runtime(RuntimeError::AmbiguousInput {
                        node: node.name.clone(),
                        parameter: param.name.clone(),
                    }))
                }
                MatchOutcome::Ambiguous => {
                    return Err(CexError::Runtime(RuntimeError::AmbiguousInput {
                        node: node.name.clone(),
                        parameter: param.name.clone(),
                    }))
                }
            }
        }

        Ok(NodeState::Skipped)
    }

    fn resolve_output_serializer(
        &self,
        node: &Node,
        namespace: &Namespace,
    ) -> Result<Arc<dyn Serializer>, CexError> {
        let output = node
            .output_information()
            .expect("only called for nodes with an output");
        let serializer = resolve_serializer(
            &output,
            node.output_serializer.as_ref(),
            &namespace.serializers,
            &self.serializers,
        )?;
        Ok(serializer)
    }

    /// The `DataInfo` a `Skipped` node contributes to its successors: the
    /// hash is read fresh from the file on disk right now, which is what
    /// lets hand-editing a cached output (outside the engine) be detected
    /// on the very next run even though the producing node itself is
    /// skipped (§8 S2).
    fn skipped_output(
        &self,
        node: &Node,
        namespace: &Namespace,
        namespace_root: &Utf8PathBuf,
    ) -> Result<Option<DataInfo>, CexError> {
        let Some(output) = node.output_information() else {
            return Ok(None);
        };
        if !node.is_cached {
            return Ok(Some(output));
        }

        let serializer = self.resolve_output_serializer(node, namespace)?;
        let path = node
            .output_path(namespace_root, serializer.file_extension())
            .expect("is_cached node with output_name has a path");
        let hash = hash_file(path.as_std_path())?;

        Ok(Some(output.with_output_path(Some(path)).with_hash(hash)))
    }

    fn execute_node(
        &mut self,
        node: &Node,
        namespace: &Namespace,
        namespace_root: &Utf8PathBuf,
        available: &[DataInfo],
    ) -> Result<Option<DataInfo>, CexError> {
        let mut args: HashMap<String, Value> = HashMap::new();
        let mut bound_ids = std::collections::HashSet::new();
        let mut input_hashes: Vec<(String, Option<String>)> = Vec::new();

        for param in &node.params {
            let aliases = node.input_aliases(&param.name);
            let candidate = match best_match(&aliases, &param.type_tag, available.iter()) {
                MatchOutcome::Resolved(c) => c,
                _ => {
                    return Err(CexError::Runtime(RuntimeError::AmbiguousInput {
                        node: node.name.clone(),
                        parameter: param.name.clone(),
                    }))
                }
            };

            if !bound_ids.insert(candidate.id) {
                return Err(CexError::Runtime(RuntimeError::DoubleBinding {
                    node: node.name.clone(),
                    parameter: param.name.clone(),
                }));
            }

            let value = match &candidate.value {
                Some(v) => v.clone(),
                None => {
                    let path = candidate
                        .path
                        .as_ref()
                        .expect("an unresolved DataInfo always has a value or a path");
                    let serializer = resolve_serializer(
                        candidate,
                        node.input_serializers.get(&param.name),
                        &namespace.serializers,
                        &self.serializers,
                    )?;
                    serializer.load(path)?
                }
            };

            input_hashes.push((param.name.clone(), candidate.hash.clone()));
            args.insert(param.name.clone(), value);
        }

        let result = (node.function)(&args).map_err(|source| {
            CexError::Runtime(RuntimeError::NodeFailed {
                node: node.name.clone(),
                source,
            })
        })?;

        let output_type = node
            .output_name
            .as_ref()
            .map(|_| node.return_type.clone().unwrap_or_else(crate::data::TypeTag::unknown));

        if let Some(type_tag) = &output_type {
            if !type_tag.matches_value(&result) {
                return Err(CexError::Runtime(RuntimeError::OutputTypeMismatch {
                    node: node.name.clone(),
                    expected: type_tag.to_string(),
                    actual: value_shape(&result).to_string(),
                }));
            }
        }

        let mut output_hash = None;
        let mut output_path = None;

        // A cached node records its execution regardless of whether it has an
        // output: a sink driven purely by `input_directory` is still skipped
        // on its next run once its input hashes are on file.
        if node.is_cached {
            if output_type.is_some() {
                let serializer = self.resolve_output_serializer(node, namespace)?;
                let path = node
                    .output_path(namespace_root, serializer.file_extension())
                    .expect("is_cached node with output_name has a path");
                serializer.save(&path, &result)?;
                output_hash = hash_file(path.as_std_path())?;
                output_path = Some(path);
            }

            let persistent_hash = node.persistent_hash();
            if let Some(node_meta) = self
                .meta
                .namespace_mut(&namespace.name)
                .node_meta_mut(&persistent_hash)
            {
                node_meta.mark_executed();
                if let Some(hash) = &output_hash {
                    node_meta.update_output_hash(hash.clone());
                }
                for (name, hash) in &input_hashes {
                    if let Some(hash) = hash {
                        node_meta.update_input_hash(name, hash.clone());
                    }
                }
            }
            if let Err(e) = self.meta.sync() {
                tracing::warn!(node = %node.name, error = %e, "metadata sync failed; continuing");
            }
        }

        let output = node.output_name.as_ref().zip(output_type).map(|(output_name, type_tag)| {
            let info = DataInfo::with_value(output_name.clone(), type_tag, result);
            if node.is_cached {
                info.with_output_path(output_path).with_hash(output_hash)
            } else {
                info
            }
        });

        Ok(output)
    }
}

impl DataInfo {
    fn with_output_path(mut self, path: Option<Utf8PathBuf>) -> Self {
        self.path = path;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TypeTag;
    use crate::node::ParamSpec;
    use crate::serializer::Serializer;
    use camino::Utf8Path;
    use cex_utils::error::SerializerError;
    use std::sync::Mutex;

    struct JsonSerializer;
    impl Serializer for JsonSerializer {
        fn file_extension(&self) -> &str {
            "json"
        }
        fn load(&self, path: &Utf8Path) -> Result<Value, SerializerError> {
            let text = std::fs::read_to_string(path).map_err(|e| SerializerError::Load {
                path: path.to_string(),
                source: Box::new(e),
            })?;
            serde_json::from_str(&text).map_err(|e| SerializerError::Load {
                path: path.to_string(),
                source: Box::new(e),
            })
        }
        fn save(&self, path: &Utf8Path, value: &Value) -> Result<(), SerializerError> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).ok();
            }
            std::fs::write(path, value.to_string()).map_err(|e| SerializerError::Save {
                path: path.to_string(),
                source: Box::new(e),
            })
        }
    }

    fn new_engine(dir: &std::path::Path) -> Engine {
        let root = RootPath::new(Utf8PathBuf::from_path_buf(dir.to_path_buf()).unwrap()).unwrap();
        let mut engine = Engine::new(root).unwrap();
        engine.add_default_serializer(Arc::new(JsonSerializer));
        engine
    }

    #[test]
    fn sequential_chain_reruns_once_then_skips() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = new_engine(dir.path());

        let calls = Arc::new(Mutex::new(0));
        let calls2 = calls.clone();

        let square = Node::builder(
            "square",
            "tests.square",
            vec![ParamSpec::new("z", TypeTag::new("int"))],
            move |args| {
                *calls2.lock().unwrap() += 1;
                let z = args["z"].as_i64().unwrap();
                Ok(Value::from(z * z))
            },
        )
        .output_name("result")
        .return_type(TypeTag::new("int"))
        .alias("z", "result")
        .build();

        let double = Node::builder(
            "double",
            "tests.double",
            vec![ParamSpec::new("y", TypeTag::new("int"))],
            |args| {
                let y = args["y"].as_i64().unwrap();
                Ok(Value::from(y * 2))
            },
        )
        .output_name("result")
        .return_type(TypeTag::new("int"))
        .alias("y", "result")
        .continue_with(square)
        .build();

        let one = Node::builder("one", "tests.one", vec![], |_| Ok(Value::from(1)))
            .output_name("result")
            .return_type(TypeTag::new("int"))
            .continue_with(double)
            .build();

        let namespace = Namespace::new("seq", "seq", vec![one]);

        engine.run(&namespace).unwrap();
        assert_eq!(*calls.lock().unwrap(), 1);

        engine.run(&namespace).unwrap();
        assert_eq!(*calls.lock().unwrap(), 1, "second run should skip square entirely");
    }

    #[test]
    fn output_type_mismatch_is_a_runtime_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = new_engine(dir.path());

        let wrong_shape = Node::builder("wrong_shape", "tests.wrong_shape", vec![], |_| {
            Ok(Value::from("not an int"))
        })
        .output_name("result")
        .return_type(TypeTag::new("int"))
        .build();

        let namespace = Namespace::new("mismatch", "mismatch", vec![wrong_shape]);

        let err = engine.run(&namespace).unwrap_err();
        match err {
            CexError::Runtime(RuntimeError::OutputTypeMismatch { node, expected, actual }) => {
                assert_eq!(node, "wrong_shape");
                assert_eq!(expected, "int");
                assert_eq!(actual, "str");
            }
            other => panic!("expected OutputTypeMismatch, got {other:?}"),
        }
    }
}
