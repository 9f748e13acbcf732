//! Default `cex` binary: a one-node smoke-test pipeline, useful to confirm
//! an `Engine` is wired up correctly before writing a real namespace.
//!
//! For the named seed scenarios, see `demos/basic` (S1) and
//! `demos/diamond` (S2).

use std::sync::Arc;

use cex_cli::{Cli, JsonSerializer};
use cex_config::EngineConfig;
use cex_engine::{Namespace, Node, TypeTag};
use clap::Parser;
use serde_json::Value;

fn build_namespace() -> Namespace {
    let hello = Node::builder("hello", "cex.hello", vec![], |_| Ok(Value::from("hello from cex")))
        .output_name("greeting")
        .return_type(TypeTag::new("str"))
        .build();

    Namespace::new("hello", "hello", vec![hello])
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    cex_cli::init_tracing(cli.verbose).ok();

    let mut config = EngineConfig::builder().register_default_serializer(Arc::new(JsonSerializer));
    if let Some(root) = cli.root {
        config = config.root_dir(root);
    }
    let mut engine = config.build()?;

    let namespace = build_namespace();
    if let Some(report) = cex_cli::dispatch(&mut engine, &namespace, cli.command)? {
        println!("{report}");
    }
    Ok(())
}
