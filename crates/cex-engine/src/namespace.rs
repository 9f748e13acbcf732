//! The namespace model (C4): a named, path-scoped group of nodes sharing a
//! cache root.

use std::sync::Arc;

use camino::Utf8PathBuf;

use crate::node::Node;
use crate::serializer::SerializerRegistry;

pub struct Namespace {
    pub name: String,
    pub path: Utf8PathBuf,
    pub root_nodes: Vec<Arc<Node>>,
    pub serializers: SerializerRegistry,
}

impl Namespace {
    pub fn new(name: impl Into<String>, path: impl Into<Utf8PathBuf>, root_nodes: Vec<Arc<Node>>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            root_nodes,
            serializers: SerializerRegistry::new(),
        }
    }

    pub fn with_serializer_for_type(
        mut self,
        type_tag: crate::data::TypeTag,
        serializer: Arc<dyn crate::serializer::Serializer>,
    ) -> Self {
        self.serializers.register_for_type(type_tag, serializer);
        self
    }

    /// Clone this namespace's node graph into a new namespace at
    /// `new_path`: nodes are shared by reference (not deep-copied), but
    /// the clone gets its own output directory under the engine root, so
    /// the two namespaces cache independently (§8 S6).
    pub fn init_from(&self, new_name: impl Into<String>, new_path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            name: new_name.into(),
            path: new_path.into(),
            root_nodes: self.root_nodes.clone(),
            serializers: self.serializers.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn init_from_shares_nodes_but_has_independent_path() {
        let leaf = Node::builder("leaf", "tests.noop", vec![], |_| Ok(Value::Null)).build();
        let ns1 = Namespace::new("ns1", "ns1", vec![leaf]);
        let ns2 = ns1.init_from("ns2", "other");

        assert_eq!(ns1.root_nodes[0].runtime_id, ns2.root_nodes[0].runtime_id);
        assert_ne!(ns1.path, ns2.path);
        assert_ne!(ns1.name, ns2.name);
    }
}
