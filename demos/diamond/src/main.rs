//! S2: a diamond join, `a` and `b` both feeding `combine`.
//!
//! Hand-edit `diamond/b.json` on disk (outside the engine) between two
//! `run`s and only `combine` re-executes on the next run. `a` and `b`
//! themselves stay skipped, since their own skip decision never
//! re-validates their own recorded output, only their (absent) inputs.
//! `combine`'s stored input hash for `b`'s output no longer matches what
//! is on disk now, so it alone goes `Ready`.
//!
//! ```text
//! cargo run -p cex-demo-diamond -- --root /tmp/cex-diamond run
//! # edit /tmp/cex-diamond/diamond/b.json by hand
//! cargo run -p cex-demo-diamond -- --root /tmp/cex-diamond run   # only combine reruns
//! ```

use std::sync::Arc;

use cex_cli::{Cli, JsonSerializer};
use cex_config::EngineConfig;
use cex_engine::{Namespace, Node, ParamSpec, TypeTag};
use clap::Parser;
use serde_json::Value;

fn build_namespace() -> Namespace {
    let combine = Node::builder(
        "combine",
        "demo.diamond.combine",
        vec![
            ParamSpec::new("x", TypeTag::new("int")),
            ParamSpec::new("y", TypeTag::new("int")),
        ],
        |args| {
            let x = args["x"].as_i64().expect("x is an int");
            let y = args["y"].as_i64().expect("y is an int");
            Ok(Value::from(x + y))
        },
    )
    .output_name("sum")
    .return_type(TypeTag::new("int"))
    .alias("x", "left")
    .alias("y", "right")
    .build();

    let a = Node::builder("a", "demo.diamond.a", vec![], |_| Ok(Value::from(10)))
        .output_name("left")
        .return_type(TypeTag::new("int"))
        .continue_with(combine.clone())
        .build();

    let b = Node::builder("b", "demo.diamond.b", vec![], |_| Ok(Value::from(32)))
        .output_name("right")
        .return_type(TypeTag::new("int"))
        .continue_with(combine)
        .build();

    Namespace::new("diamond", "diamond", vec![a, b])
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
