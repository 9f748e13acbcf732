//! The metadata store (C2): persisted hash state used to decide skip vs.
//! re-run between invocations.

use std::collections::BTreeMap;

use camino::Utf8Path;
use cex_utils::atomic_write::write_file_atomic;
use cex_utils::error::MetaStoreError;
use cex_utils::paths::RootPath;
use serde::{Deserialize, Serialize};

/// Per-node hash state: the node's own persistent hash, the hash of each
/// input it last saw, and the hash of its own output (if cached).
///
/// `input_hashes` is a `BTreeMap` so it always serializes with sorted keys,
/// per the persisted-hash-stability requirement: no implementation may
/// depend on map iteration order.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct NodeMeta {
    #[serde(rename = "node_hash")]
    pub persistent_hash: String,
    #[serde(default)]
    pub input_hashes: BTreeMap<String, Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_hash: Option<String>,
    /// Whether this node has ever completed a run. A node with an output
    /// can fall back on `output_hash.is_some()` for the same question, but
    /// a cached sink has no output to anchor on, hence this separate flag.
    #[serde(default)]
    pub executed: bool,
}

impl NodeMeta {
    pub fn new(persistent_hash: String, input_keys: impl IntoIterator<Item = String>) -> Self {
        Self {
            persistent_hash,
            input_hashes: input_keys.into_iter().map(|k| (k, None)).collect(),
            output_hash: None,
            executed: false,
        }
    }

    /// Reconcile this entry's input keys with a node's current parameter
    /// set: existing hashes are kept for keys still present, new keys start
    /// out unset.
    pub fn reconcile_keys(&mut self, input_keys: impl IntoIterator<Item = String>) {
        let mut reconciled = BTreeMap::new();
        for key in input_keys {
            let existing = self.input_hashes.remove(&key).unwrap_or(None);
            reconciled.insert(key, existing);
        }
        self.input_hashes = reconciled;
    }

    pub fn is_current_input(&self, name: &str, hash: &str) -> bool {
        matches!(self.input_hashes.get(name), Some(Some(stored)) if stored == hash)
    }

    pub fn is_current_output(&self, hash: &str) -> bool {
        matches!(&self.output_hash, Some(stored) if stored == hash)
    }

    pub fn update_input_hash(&mut self, name: &str, hash: String) {
        self.input_hashes.insert(name.to_string(), Some(hash));
    }

    pub fn update_output_hash(&mut self, hash: String) {
        self.output_hash = Some(hash);
    }

    pub fn mark_executed(&mut self) {
        self.executed = true;
    }
}

/// All node metadata belonging to one namespace.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NamespaceMeta {
    pub name: String,
    #[serde(default)]
    pub nodes: BTreeMap<String, NodeMeta>,
}

impl NamespaceMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: BTreeMap::new(),
        }
    }

    pub fn node_meta(&self, persistent_hash: &str) -> Option<&NodeMeta> {
        self.nodes.get(persistent_hash)
    }

    pub fn node_meta_mut(&mut self, persistent_hash: &str) -> Option<&mut NodeMeta> {
        self.nodes.get_mut(persistent_hash)
    }

    /// Rebuild the node map for the live set of `(persistent_hash, input_keys)`
    /// pairs: existing entries for hashes still present are kept as-is
    /// (after reconciling their input keys), new hashes get a fresh empty
    /// entry, and entries for hashes no longer present are dropped.
    pub fn update_from<'a>(
        &mut self,
        live_nodes: impl IntoIterator<Item = (&'a str, Vec<String>)>,
    ) {
        let mut rebuilt = BTreeMap::new();
        for (hash, input_keys) in live_nodes {
            let mut entry = self
                .nodes
                .remove(hash)
                .unwrap_or_else(|| NodeMeta::new(hash.to_string(), Vec::new()));
            entry.reconcile_keys(input_keys);
            rebuilt.insert(hash.to_string(), entry);
        }
        self.nodes = rebuilt;
    }
}

/// The whole `.cex/cex.json` document: one [`NamespaceMeta`] per namespace.
#[derive(Debug, Default)]
pub struct MetaStore {
    path: camino::Utf8PathBuf,
    namespaces: Vec<NamespaceMeta>,
}

impl MetaStore {
    /// Load the store from `<root>/.cex/cex.json`, or start empty if the
    /// file doesn't exist yet. Unknown keys at any level are ignored by
    /// `serde_json`'s default deserialization behavior.
    pub fn open(root: &RootPath) -> Result<Self, MetaStoreError> {
        let path = root.meta_store_path();

        if !path.as_std_path().exists() {
            return Ok(Self {
                path,
                namespaces: Vec::new(),
            });
        }

        let contents = std::fs::read_to_string(&path).map_err(|source| MetaStoreError::Read {
            path: path.to_string(),
            source,
        })?;

        let namespaces: Vec<NamespaceMeta> =
            serde_json::from_str(&contents).map_err(|source| MetaStoreError::Parse {
                path: path.to_string(),
                source,
            })?;

        Ok(Self { path, namespaces })
    }

    pub fn namespace(&self, name: &str) -> Option<&NamespaceMeta> {
        self.namespaces.iter().find(|ns| ns.name == name)
    }

    /// Get or create the namespace entry named `name`.
    pub fn namespace_mut(&mut self, name: &str) -> &mut NamespaceMeta {
        if let Some(idx) = self.namespaces.iter().position(|ns| ns.name == name) {
            return &mut self.namespaces[idx];
        }
        self.namespaces.push(NamespaceMeta::new(name));
        self.namespaces.last_mut().expect("just pushed")
    }

    /// Drop a namespace's recorded metadata entirely (used by `cex-cli`'s
    /// `clean` command). A no-op if the namespace was never recorded.
    pub fn remove_namespace(&mut self, name: &str) {
        self.namespaces.retain(|ns| ns.name != name);
    }

    /// Atomically rewrite the store to disk as indented JSON.
    pub fn sync(&self) -> Result<(), MetaStoreError> {
        let json = serde_json::to_string_pretty(&self.namespaces).map_err(|source| {
            MetaStoreError::Write {
                path: self.path.to_string(),
                source: std::io::Error::other(source),
            }
        })?;
        write_file_atomic(Utf8Path::new(self.path.as_str()), &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_empty_when_no_file_present() {
        let dir = tempfile::tempdir().unwrap();
        let root =
            RootPath::new(camino::Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap())
                .unwrap();
        let store = MetaStore::open(&root).unwrap();
        assert!(store.namespace("ns").is_none());
    }

    #[test]
    fn sync_then_open_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let root =
            RootPath::new(camino::Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap())
                .unwrap();
        let mut store = MetaStore::open(&root).unwrap();
        let ns = store.namespace_mut("ns");
        ns.update_from([("hash1", vec!["x".to_string()])]);
        ns.node_meta_mut("hash1")
            .unwrap()
            .update_input_hash("x", "deadbeef".to_string());
        store.sync().unwrap();

        let reopened = MetaStore::open(&root).unwrap();
        let ns = reopened.namespace("ns").unwrap();
        assert!(ns.node_meta("hash1").unwrap().is_current_input("x", "deadbeef"));
    }

    #[test]
    fn remove_namespace_drops_it_from_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let root =
            RootPath::new(camino::Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap())
                .unwrap();
        let mut store = MetaStore::open(&root).unwrap();
        store.namespace_mut("ns");
        assert!(store.namespace("ns").is_some());

        store.remove_namespace("ns");
        assert!(store.namespace("ns").is_none());
    }

    #[test]
    fn update_from_drops_obsolete_and_keeps_current() {
        let mut ns = NamespaceMeta::new("ns");
        ns.update_from([("a", vec!["p".to_string()])]);
        ns.node_meta_mut("a").unwrap().update_input_hash("p", "h".to_string());

        ns.update_from([("b", vec!["q".to_string()])]);
        assert!(ns.node_meta("a").is_none());
        assert!(ns.node_meta("b").is_some());
    }

    #[test]
    fn reconcile_keys_preserves_hashes_for_surviving_keys() {
        let mut meta = NodeMeta::new("h".to_string(), vec!["a".to_string(), "b".to_string()]);
        meta.update_input_hash("a", "1".to_string());
        meta.update_input_hash("b", "2".to_string());

        meta.reconcile_keys(vec!["a".to_string(), "c".to_string()]);
        assert!(meta.is_current_input("a", "1"));
        assert!(meta.input_hashes.get("c").unwrap().is_none());
        assert!(!meta.input_hashes.contains_key("b"));
    }
}
