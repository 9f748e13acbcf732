//! A thin demonstration CLI over [`cex_engine::Engine`].
//!
//! This crate is not part of the engine's contract (the engine is a
//! library, with no CLI, environment variable, or wire protocol of its
//! own), but every inherited crate ships a runnable surface alongside its
//! library, so the demo pipelines under `demos/` link against this one.
//! A demo binary builds its own `Namespace` and hands it to [`dispatch`]
//! along with a parsed [`Command`].

use camino::{Utf8Path, Utf8PathBuf};
use cex_engine::{Engine, Namespace, Serializer};
use cex_utils::error::{CexError, SerializerError};
use clap::{Parser, Subcommand};

/// A JSON-on-disk serializer for demo pipelines. Every demo node's output
/// type round-trips through `serde_json::Value`, so one serializer covers
/// them all. A real embedding application would register one serializer
/// per domain type instead.
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn file_extension(&self) -> &str {
        "json"
    }

    fn load(&self, path: &Utf8Path) -> Result<serde_json::Value, SerializerError> {
        let text = std::fs::read_to_string(path).map_err(|e| SerializerError::Load {
            path: path.to_string(),
            source: Box::new(e),
        })?;
        serde_json::from_str(&text).map_err(|e| SerializerError::Load {
            path: path.to_string(),
            source: Box::new(e),
        })
    }

    fn save(&self, path: &Utf8Path, value: &serde_json::Value) -> Result<(), SerializerError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SerializerError::Save {
                path: path.to_string(),
                source: Box::new(e),
            })?;
        }
        std::fs::write(path, serde_json::to_string_pretty(value).unwrap_or_default()).map_err(|e| {
            SerializerError::Save {
                path: path.to_string(),
                source: Box::new(e),
            }
        })
    }
}

/// Shared CLI argument shape for demo binaries.
#[derive(Parser, Debug)]
#[command(name = "cex", about = "Run, inspect, or clean a cex pipeline")]
pub struct Cli {
    /// Engine root directory (defaults to the current working directory).
    #[arg(long, global = true)]
    pub root: Option<Utf8PathBuf>,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Validate and execute the pipeline, skipping nodes whose inputs are unchanged.
    Run,
    /// Print each node's cached-vs-stale status without executing anything.
    Status,
    /// Forget this namespace's recorded metadata and delete its output directory.
    Clean,
}

/// Initialize a `tracing` subscriber, mirroring the inherited codebase's
/// compact-by-default / verbose-on-request logging split. Call once, from
/// a demo binary's `main`.
pub fn init_tracing(verbose: bool) -> Result<(), tracing_subscriber::util::TryInitError> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "cex=debug,info" } else { "cex=info,warn" })
    });

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if verbose {
        builder.with_target(true).with_line_number(true).try_init()
    } else {
        builder.with_target(false).without_time().try_init()
    }
}

/// Execute `command` against `namespace` using `engine`. Returns a
/// human-readable report for `Status`; `Run` and `Clean` report nothing on
/// success.
pub fn dispatch(engine: &mut Engine, namespace: &Namespace, command: Command) -> Result<Option<String>, CexError> {
    match command {
        Command::Run => {
            engine.run(namespace)?;
            Ok(None)
        }
        Command::Status => Ok(Some(status_report(engine, namespace))),
        Command::Clean => {
            let dir = engine.root.join(&namespace.path);
            if dir.as_std_path().exists() {
                std::fs::remove_dir_all(dir.as_std_path())?;
            }
            engine.meta.remove_namespace(&namespace.name);
            engine.meta.sync()?;
            Ok(None)
        }
    }
}

fn status_report(engine: &Engine, namespace: &Namespace) -> String {
    let mut report = format!("namespace `{}`:\n", namespace.name);
    let Some(ns_meta) = engine.meta.namespace(&namespace.name) else {
        report.push_str("  (no recorded metadata; next run executes every node)\n");
        return report;
    };

    let mut visited = std::collections::HashSet::new();
    for node in &namespace.root_nodes {
        describe_node(node, ns_meta, &mut visited, &mut report);
    }
    report
}

/// Depth-first, visiting each node once by runtime identity (a diamond
/// join would otherwise print its shared successor once per predecessor).
fn describe_node(
    node: &cex_engine::Node,
    ns_meta: &cex_engine::NamespaceMeta,
    visited: &mut std::collections::HashSet<cex_engine::NodeRuntimeId>,
    report: &mut String,
) {
    if !visited.insert(node.runtime_id) {
        return;
    }

    let hash = node.persistent_hash();
    match ns_meta.node_meta(&hash) {
        Some(meta) if meta.output_hash.is_some() => {
            report.push_str(&format!("  {}: cached (hash {})\n", node.name, &hash[..12]));
        }
        Some(meta) if meta.executed => {
            report.push_str(&format!("  {}: cached, no output\n", node.name));
        }
        Some(_) => {
            report.push_str(&format!("  {}: recorded, never executed\n", node.name));
        }
        None => {
            report.push_str(&format!("  {}: unknown\n", node.name));
        }
    }
    for successor in &node.subsequent_nodes {
        describe_node(successor, ns_meta, visited, report);
    }
}
