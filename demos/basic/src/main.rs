//! S1: a sequential chain `one -> double -> square`, each step cached.
//!
//! Run twice with nothing changed in between and the second run skips every
//! node: that is the behavior this demo exists to show.
//!
//! ```text
//! cargo run -p cex-demo-basic -- --root /tmp/cex-basic run
//! cargo run -p cex-demo-basic -- --root /tmp/cex-basic status
//! cargo run -p cex-demo-basic -- --root /tmp/cex-basic run    # fully skipped
//! ```

use std::sync::Arc;

use cex_cli::{Cli, JsonSerializer};
use cex_config::EngineConfig;
use cex_engine::{Namespace, Node, ParamSpec, TypeTag};
use clap::Parser;
use serde_json::Value;

fn build_namespace() -> Namespace {
    let square = Node::builder(
        "square",
        "demo.basic.square",
        vec![ParamSpec::new("z", TypeTag::new("int"))],
        |args| {
            let z = args["z"].as_i64().expect("z is an int");
            Ok(Value::from(z * z))
        },
    )
    .output_name("result")
    .return_type(TypeTag::new("int"))
    .alias("z", "result")
    .build();

    let double = Node::builder(
        "double",
        "demo.basic.double",
        vec![ParamSpec::new("y", TypeTag::new("int"))],
        |args| {
            let y = args["y"].as_i64().expect("y is an int");
            Ok(Value::from(y * 2))
        },
    )
    .output_name("result")
    .return_type(TypeTag::new("int"))
    .alias("y", "result")
    .continue_with(square)
    .build();

    let one = Node::builder("one", "demo.basic.one", vec![], |_| Ok(Value::from(1)))
        .output_name("result")
        .return_type(TypeTag::new("int"))
        .continue_with(double)
        .build();

    Namespace::new("basic", "basic", vec![one])
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
