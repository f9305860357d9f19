//! # aerie
//!
//! Runs an analysis pipeline. Without a nest file the builtin demo is
//! assembled:
//!
//! ```text
//! CountingSource ─▶ PrescaleModule ─▶ BagDumpModule
//! ```
//!
//! Parameters can be overridden with `AERIE_PARAM__<service>__<parameter>`
//! environment variables, e.g. `AERIE_PARAM__prescale__prescale=10`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use aerie_pipeline::Direction;
use aerie_runtime::{load_nest_file, Nest, RuntimeConfig};
use aerie_telemetry::{encode_metrics, init_telemetry, TelemetryConfig};

/// aerie: modular event-processing runtime
#[derive(Parser, Debug)]
#[command(name = "aerie")]
#[command(about = "Run an aerie analysis pipeline")]
struct Args {
    /// Nest file describing the services (default: builtin demo pipeline)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Main loop to execute
    #[arg(short, long)]
    main_loop: Option<String>,

    /// Walk the source backwards
    #[arg(long)]
    reverse: bool,

    /// Number of bags emitted by the demo source
    #[arg(long, default_value = "100")]
    count: i32,

    /// Keep one demo bag out of every N
    #[arg(long, default_value = "10")]
    prescale: i32,

    /// Print the assembled configuration before running
    #[arg(long)]
    dump_config: bool,

    /// Print the Prometheus metrics after the run
    #[arg(long)]
    metrics: bool,
}

fn assemble_demo(nest: &mut Nest, args: &Args) -> Result<()> {
    nest.add_service("CountingSource", "source")?.set("count", args.count)?;
    nest.add_service("PrescaleModule", "prescale")?
        .set("prescale", args.prescale)?;
    nest.add_service("BagDumpModule", "dump")?;
    nest.add_service("SequentialMainLoop", "main")?
        .set("source", "source")?
        .set("modulechain", vec!["prescale".to_string(), "dump".to_string()])?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _telemetry =
        init_telemetry(TelemetryConfig::from_env()).context("Failed to initialize telemetry")?;
    let runtime = RuntimeConfig::from_env();

    let mut nest = Nest::new();
    match args.config.as_ref().or(runtime.nest_file.as_ref()) {
        Some(path) => {
            load_nest_file(&mut nest, path)
                .with_context(|| format!("Failed to load nest file {}", path.display()))?;
        }
        None => assemble_demo(&mut nest, &args)?,
    }

    let applied = nest.apply_overrides(&runtime.override_prefix, runtime.overrides_from_env())?;
    if applied > 0 {
        info!("Applied {} parameter overrides from the environment", applied);
    }

    if args.dump_config || runtime.dump_config {
        let mut dump = String::new();
        nest.dump_ini(&mut dump)?;
        println!("{dump}");
    }

    nest.configure().context("Configuration failed")?;

    let main_loop = args.main_loop.clone().unwrap_or(runtime.main_loop);
    let direction = if args.reverse {
        Direction::Reverse
    } else {
        runtime.direction
    };
    let stats = nest
        .execute_main_loop(&main_loop, direction)
        .with_context(|| format!("Main loop '{main_loop}' failed"))?;
    nest.finish()?;

    println!("run:        {}", nest.run_id());
    println!("fetched:    {}", stats.fetched);
    println!("completed:  {}", stats.completed);
    println!("filtered:   {}", stats.filtered);
    println!("terminated: {}", stats.terminated);

    if args.metrics {
        print!("{}", encode_metrics()?);
    }
    Ok(())
}
