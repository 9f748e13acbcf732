//! Foundation utilities shared across the cex workspace.

pub mod atomic_write;
pub mod error;
pub mod hash;
pub mod paths;

pub use error::{CexError, CexResult, MetaStoreError, RuntimeError, SerializerError, ValidationFailure};
