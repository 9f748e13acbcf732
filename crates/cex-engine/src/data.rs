//! The data that flows along edges of a pipeline graph.

use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};

use camino::Utf8PathBuf;
use serde_json::Value;

/// A nominal type key used for matching and serializer lookup.
///
/// Two `TypeTag`s are equal iff their underlying strings are equal, so a
/// parameterized type like `list<int>` is a distinct key from `list<str>`
/// as long as callers spell them distinctly and consistently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeTag(Cow<'static, str>);

impl TypeTag {
    pub fn new(tag: impl Into<Cow<'static, str>>) -> Self {
        Self(tag.into())
    }

    /// The sentinel type that matches (and is matched by) anything.
    pub fn unknown() -> Self {
        Self(Cow::Borrowed("unknown"))
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == "unknown"
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `value`'s runtime shape agrees with this tag, for the
    /// built-in scalar and container tags. An unrecognized tag has no
    /// known shape to check against and is treated as satisfied, the same
    /// way `unknown` is: there's nothing principled to compare a
    /// `serde_json::Value` against for a caller-defined type name.
    pub fn matches_value(&self, value: &Value) -> bool {
        match self.0.as_ref() {
            "unknown" => true,
            "int" | "integer" => value.is_i64() || value.is_u64(),
            "float" | "number" => value.is_number(),
            "str" | "string" => value.is_string(),
            "bool" | "boolean" => value.is_boolean(),
            "dict" | "object" | "map" => value.is_object(),
            "list" | "array" => value.is_array(),
            "null" | "none" => value.is_null(),
            _ => true,
        }
    }
}

/// Names a `serde_json::Value`'s runtime shape, for error messages when it
/// disagrees with a node's declared `return_type`.
pub fn value_shape(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_i64() || n.is_u64() => "int",
        Value::Number(_) => "float",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for TypeTag {
    fn from(s: &'static str) -> Self {
        Self::new(s)
    }
}

static NEXT_DATA_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one *occurrence* of produced data, distinct from every other
/// occurrence even if the name and type are identical. Used to detect a
/// single value being bound to two parameters at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataId(u64);

impl DataId {
    pub fn fresh() -> Self {
        Self(NEXT_DATA_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A named, typed piece of data: either a parameter a node requires, or a
/// value/file a node (or the input directory) makes available.
#[derive(Debug, Clone)]
pub struct DataInfo {
    pub id: DataId,
    pub name: String,
    pub type_tag: TypeTag,
    pub path: Option<Utf8PathBuf>,
    pub hash: Option<String>,
    pub value: Option<Value>,
}

impl DataInfo {
    pub fn required(name: impl Into<String>, type_tag: TypeTag) -> Self {
        Self {
            id: DataId::fresh(),
            name: name.into(),
            type_tag,
            path: None,
            hash: None,
            value: None,
        }
    }

    pub fn with_value(name: impl Into<String>, type_tag: TypeTag, value: Value) -> Self {
        Self {
            id: DataId::fresh(),
            name: name.into(),
            type_tag,
            path: None,
            hash: None,
            value: Some(value),
        }
    }

    pub fn with_path(name: impl Into<String>, type_tag: TypeTag, path: Utf8PathBuf) -> Self {
        Self {
            id: DataId::fresh(),
            name: name.into(),
            type_tag,
            path: Some(path),
            hash: None,
            value: None,
        }
    }

    pub fn with_hash(mut self, hash: Option<String>) -> Self {
        self.hash = hash;
        self
    }

    /// Whether the invariant "value or path must be set" currently holds.
    pub fn is_resolvable(&self) -> bool {
        self.value.is_some() || self.path.is_some()
    }
}
