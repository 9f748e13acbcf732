//! Programmatic configuration for an [`Engine`].
//!
//! The engine has no config file format to discover, since it is a library
//! and not a service. This crate carries only the fluent-builder half of
//! the inherited config crate's pattern: a root path, a set of serializers
//! to register up front, and a logging verbosity flag the CLI reads back
//! out.

use std::sync::Arc;

use camino::Utf8PathBuf;
use cex_engine::{Engine, Serializer, TypeTag};
use cex_utils::error::CexError;
use cex_utils::paths::RootPath;

/// Fluent builder for an [`Engine`] instance.
///
/// # Example
///
/// ```rust,no_run
/// use cex_config::EngineConfig;
///
/// let engine = EngineConfig::builder()
///     .root_dir("/tmp/my-pipeline")
///     .verbose(true)
///     .build()
///     .expect("failed to build engine");
/// ```
#[derive(Default)]
pub struct EngineConfig {
    root_dir: Option<Utf8PathBuf>,
    verbose: bool,
    default_serializers: Vec<Arc<dyn Serializer>>,
    type_serializers: Vec<(TypeTag, Arc<dyn Serializer>)>,
}

impl EngineConfig {
    #[must_use]
    pub fn builder() -> Self {
        Self::default()
    }

    /// Root directory the engine reads inputs from and writes cached
    /// outputs and `.cex/cex.json` under. Defaults to the current working
    /// directory if never set.
    #[must_use]
    pub fn root_dir(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.root_dir = Some(path.into());
        self
    }

    /// Enable verbose logging. Consumed by `cex-cli`'s `init_tracing`; the
    /// engine itself does not read this flag.
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    #[must_use]
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Register a serializer at engine scope for a specific type tag (the
    /// second tier of the three-tier resolution search, after any
    /// namespace-scope override).
    #[must_use]
    pub fn register_serializer_for_type(mut self, type_tag: TypeTag, serializer: Arc<dyn Serializer>) -> Self {
        self.type_serializers.push((type_tag, serializer));
        self
    }

    /// Register an engine-scope default serializer, tried by file
    /// extension when no type-tag match applies.
    #[must_use]
    pub fn register_default_serializer(mut self, serializer: Arc<dyn Serializer>) -> Self {
        self.default_serializers.push(serializer);
        self
    }

    /// Build the configured [`Engine`].
    pub fn build(self) -> Result<Engine, CexError> {
        let root = match self.root_dir {
            Some(dir) => RootPath::new(dir)?,
            None => RootPath::cwd()?,
        };

        let mut engine = Engine::new(root)?;
        for (type_tag, serializer) in self.type_serializers {
            engine.add_serializer_for_type(type_tag, serializer);
        }
        for serializer in self.default_serializers {
            engine.add_default_serializer(serializer);
        }

        Ok(engine)
    }
}
