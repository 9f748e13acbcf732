//! Aggregated error types for the cex workspace.
//!
//! Each concern gets its own small `thiserror` enum; [`CexError`] aggregates
//! them with `#[from]` conversions so library code can return a single error
//! type while call sites still get a specific variant to match on.

use thiserror::Error;

/// A defect found while validating a namespace before any node runs.
///
/// Validation never stops at the first defect: every message produced
/// during a pass is carried on this variant so callers see the whole
/// picture in one report.
#[derive(Debug, Error)]
#[error("validation failed with {} issue(s)", .messages.len())]
pub struct ValidationFailure {
    pub messages: Vec<String>,
}

impl ValidationFailure {
    pub fn new(messages: Vec<String>) -> Self {
        Self { messages }
    }
}

/// An error raised while a node graph is executing.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("ambiguous input for parameter `{parameter}` of node `{node}`")]
    AmbiguousInput { node: String, parameter: String },

    #[error(
        "node `{node}` produced a value of type `{actual}`, declared output type is `{expected}`"
    )]
    OutputTypeMismatch {
        node: String,
        expected: String,
        actual: String,
    },

    #[error("node `{node}` failed: {source}")]
    NodeFailed {
        node: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("value already bound to parameter `{parameter}` of node `{node}`")]
    DoubleBinding { node: String, parameter: String },

    #[error(transparent)]
    Serializer(#[from] SerializerError),
}

/// An error raised resolving or invoking a serializer (the `Serializer`
/// trait itself lives in `cex-engine`, which depends on this crate).
#[derive(Debug, Error)]
pub enum SerializerError {
    #[error("no serializer could be resolved for `{name}` (type `{type_tag}`)")]
    Unresolved { name: String, type_tag: String },

    #[error("failed to load `{path}`: {source}")]
    Load {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to save `{path}`: {source}")]
    Save {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// An error raised reading or writing the metadata store.
#[derive(Debug, Error)]
pub enum MetaStoreError {
    #[error("failed to read metadata store at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse metadata store at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write metadata store at {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level error type for the cex workspace.
#[derive(Debug, Error)]
pub enum CexError {
    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    MetaStore(#[from] MetaStoreError),

    #[error(transparent)]
    Serializer(#[from] SerializerError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CexResult<T> = Result<T, CexError>;
