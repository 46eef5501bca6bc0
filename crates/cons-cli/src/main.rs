//! `cons`: run Lua scripts against the console bindings.
//!
//! The script sees the module table (`cons` unless configured otherwise)
//! bound to an in-memory virtual console.
//!
//! # Configuration
//!
//! Configuration is loaded from multiple sources with priority:
//!
//! 1. Environment variables (`CONS_*`)
//! 2. Project config (`.cons/config.toml` in the project root)
//! 3. Global config (`~/.cons/config.toml`)
//! 4. Default values
//!
//! # Output
//!
//! Logs go to stderr. `--snapshot` and `--dump-flags` print JSON to stdout.

use anyhow::{Context, Result};
use clap::Parser;
use cons_core::config::{ConfigLoader, ConsConfig};
use cons_core::VirtualConsole;
use cons_lua::ConsoleModule;
use mlua::Lua;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Run Lua scripts against the console bindings
#[derive(Parser, Debug)]
#[command(name = "cons")]
#[command(version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Project root directory (defaults to current directory)
    #[arg(short = 'C', long)]
    project: Option<PathBuf>,

    /// Print a JSON snapshot of the active screen buffer after the script
    #[arg(long)]
    snapshot: bool,

    /// Print the flag table as JSON and exit
    #[arg(long)]
    dump_flags: bool,

    /// Lua script to run
    #[arg(required_unless_present = "dump_flags")]
    script: Option<PathBuf>,
}

fn init_tracing(args: &Args) {
    // --debug > --verbose > RUST_LOG > "warn"
    let filter = if args.debug {
        EnvFilter::new("debug")
    } else if args.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .init();
}

fn load_config(args: &Args) -> Result<ConsConfig> {
    let project_root = args.project.clone().unwrap_or_else(|| {
        std::env::current_dir().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to get current directory, using '.'");
            PathBuf::from(".")
        })
    });
    info!(path = %project_root.display(), "Project root");
    ConfigLoader::new()
        .with_project_root(&project_root)
        .load()
        .map_err(|e| anyhow::anyhow!("Config error: {e}"))
}

fn dump_flags(config: &ConsConfig) -> Result<()> {
    let table = config.flag_table();
    let flags: BTreeMap<&str, i64> = table.iter().collect();
    let json = serde_json::to_string_pretty(&flags).context("serialize flag table")?;
    println!("{json}");
    Ok(())
}

fn run(config: &ConsConfig, script: &Path, snapshot: bool) -> Result<()> {
    let console = Arc::new(VirtualConsole::new(config.console.clone()));
    let lua = Lua::new();
    ConsoleModule::from_config(console.clone(), config)
        .register(&lua)
        .map_err(|e| anyhow::anyhow!("Failed to register module: {e}"))?;

    cons_lua::run_file(&lua, script).map_err(|e| anyhow::anyhow!("{e}"))?;

    if snapshot {
        let json = serde_json::to_string_pretty(&console.snapshot()).context("serialize snapshot")?;
        println!("{json}");
    }

    // Finalizes any owned handle the script left open.
    drop(lua);
    let stats = console.stats();
    debug!(
        handles_closed = stats.handles_closed,
        live_handles = stats.live_handles,
        queued_input = stats.queued_input,
        "Console state after script"
    );
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args);

    let config = load_config(&args)?;
    debug!(module = %config.module_name, flags = config.flags.len(), "Config loaded");

    if args.dump_flags {
        return dump_flags(&config);
    }

    let Some(script) = args.script.as_deref() else {
        anyhow::bail!("no script given");
    };
    run(&config, script, args.snapshot)
}
