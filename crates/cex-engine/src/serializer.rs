//! Serializer contract and the three-tier resolution protocol (C1).
//!
//! Concrete formats (JSON, YAML, CSV, ...) are out of this crate's scope.
//! Callers register whichever `Serializer` implementations they need.

use std::collections::HashMap;
use std::sync::Arc;

use camino::Utf8Path;
use cex_utils::error::SerializerError;
use serde_json::Value;

use crate::data::{DataInfo, TypeTag};

/// Loads and saves a value of one on-disk representation.
pub trait Serializer: Send + Sync {
    /// The extension this serializer writes, without a leading dot.
    fn file_extension(&self) -> &str;

    /// Whether this serializer can read a file with the given extension.
    /// Default: exact match against `file_extension`.
    fn matches(&self, extension: &str) -> bool {
        extension == self.file_extension()
    }

    fn load(&self, path: &Utf8Path) -> Result<Value, SerializerError>;
    fn save(&self, path: &Utf8Path, value: &Value) -> Result<(), SerializerError>;
}

/// A type-keyed and extension-keyed set of serializers, scoped either to a
/// namespace or to the whole engine.
#[derive(Default, Clone)]
pub struct SerializerRegistry {
    by_type: HashMap<TypeTag, Arc<dyn Serializer>>,
    defaults: Vec<Arc<dyn Serializer>>,
}

impl SerializerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_for_type(&mut self, type_tag: TypeTag, serializer: Arc<dyn Serializer>) {
        self.by_type.insert(type_tag, serializer);
    }

    /// Register a serializer considered by extension when no type-scoped
    /// binding applies. Order of registration is the order of preference.
    pub fn register_default(&mut self, serializer: Arc<dyn Serializer>) {
        self.defaults.push(serializer);
    }

    fn resolve_by_type(&self, type_tag: &TypeTag) -> Option<Arc<dyn Serializer>> {
        self.by_type.get(type_tag).cloned()
    }

    fn resolve_by_extension(&self, extension: &str) -> Option<Arc<dyn Serializer>> {
        self.defaults
            .iter()
            .find(|s| s.matches(extension))
            .cloned()
    }
}

/// Walk the three-tier resolution protocol for one piece of data.
///
/// `node_override` is a node-local binding (tier 1); `namespace` and
/// `engine` are the namespace-scope and engine-scope registries (tiers 2
/// and 3). Returns `UnresolvedSerializer` if nothing matches.
pub fn resolve_serializer(
    data: &DataInfo,
    node_override: Option<&Arc<dyn Serializer>>,
    namespace: &SerializerRegistry,
    engine: &SerializerRegistry,
) -> Result<Arc<dyn Serializer>, SerializerError> {
    if let Some(serializer) = node_override {
        return Ok(serializer.clone());
    }

    if let Some(serializer) = namespace.resolve_by_type(&data.type_tag) {
        return Ok(serializer);
    }

    if let Some(serializer) = engine.resolve_by_type(&data.type_tag) {
        return Ok(serializer);
    }

    if let Some(path) = &data.path {
        if let Some(extension) = path.extension() {
            if let Some(serializer) = engine.resolve_by_extension(extension) {
                return Ok(serializer);
            }
        }
    }

    Err(SerializerError::Unresolved {
        name: data.name.clone(),
        type_tag: data.type_tag.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct RecordingSerializer {
        ext: &'static str,
        saved: RefCell<Vec<Value>>,
    }

    impl Serializer for RecordingSerializer {
        fn file_extension(&self) -> &str {
            self.ext
        }

        fn load(&self, _path: &Utf8Path) -> Result<Value, SerializerError> {
            Ok(Value::Null)
        }

        fn save(&self, _path: &Utf8Path, value: &Value) -> Result<(), SerializerError> {
            self.saved.borrow_mut().push(value.clone());
            Ok(())
        }
    }

    fn serializer(ext: &'static str) -> Arc<dyn Serializer> {
        Arc::new(RecordingSerializer {
            ext,
            saved: RefCell::new(Vec::new()),
        })
    }

    #[test]
    fn node_override_wins_over_everything() {
        let data = DataInfo::required("x", TypeTag::new("int"));
        let mut namespace = SerializerRegistry::new();
        namespace.register_for_type(TypeTag::new("int"), serializer("yaml"));
        let engine = SerializerRegistry::new();
        let node_override = serializer("json");

        let resolved =
            resolve_serializer(&data, Some(&node_override), &namespace, &engine).unwrap();
        assert_eq!(resolved.file_extension(), "json");
    }

    #[test]
    fn namespace_scope_beats_engine_scope() {
        let data = DataInfo::required("x", TypeTag::new("int"));
        let mut namespace = SerializerRegistry::new();
        namespace.register_for_type(TypeTag::new("int"), serializer("yaml"));
        let mut engine = SerializerRegistry::new();
        engine.register_for_type(TypeTag::new("int"), serializer("json"));

        let resolved = resolve_serializer(&data, None, &namespace, &engine).unwrap();
        assert_eq!(resolved.file_extension(), "yaml");
    }

    #[test]
    fn engine_scope_falls_back_to_extension_match() {
        let data = DataInfo::with_path(
            "x",
            TypeTag::new("int"),
            camino::Utf8PathBuf::from("out.csv"),
        );
        let namespace = SerializerRegistry::new();
        let mut engine = SerializerRegistry::new();
        engine.register_default(serializer("json"));
        engine.register_default(serializer("csv"));

        let resolved = resolve_serializer(&data, None, &namespace, &engine).unwrap();
        assert_eq!(resolved.file_extension(), "csv");
    }

    #[test]
    fn unresolved_when_nothing_matches() {
        let data = DataInfo::required("x", TypeTag::new("int"));
        let namespace = SerializerRegistry::new();
        let engine = SerializerRegistry::new();

        assert!(resolve_serializer(&data, None, &namespace, &engine).is_err());
    }
}
