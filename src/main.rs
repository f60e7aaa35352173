use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing::{info, warn};

use autonet::compiler::{ArtifactCompiler, RustcBackend};
use autonet::config::{Config, resolve_abi_library};
use autonet::console::Console;
use autonet::loader::DylibLoader;
use autonet::logging::init_logging;
use autonet::repl::Repl;
use autonet::session::Session;

/// Compile Rust source units into libraries and poke at the types they export.
#[derive(Parser, Debug)]
#[command(name = "autonet", version, about)]
struct Args {
    /// Change to this directory before doing anything else
    #[arg(long)]
    cwd: Option<PathBuf>,

    /// Config file (default: ./autonet.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Folder holding the *.rs source units
    #[arg(short, long)]
    sources: Option<PathBuf>,

    /// Rebuild every unit even when its artifact exists
    #[arg(long)]
    rebuild: bool,

    /// Log level (error, warn, info, debug, trace); RUST_LOG wins
    #[arg(long)]
    log_level: Option<String>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

fn main() {
    let args = Args::parse();

    if args.no_color || !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    if let Err(e) = run(args) {
        eprintln!("{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    if let Some(dir) = &args.cwd {
        std::env::set_current_dir(dir)
            .with_context(|| format!("cannot change to directory '{}'", dir.display()))?;
    }

    let cwd = std::env::current_dir().context("cannot read working directory")?;
    let mut config = Config::discover(args.config.as_deref(), &cwd)?;
    if let Some(sources) = args.sources {
        config.source_folder = sources;
    }
    if args.rebuild {
        config.skip_existing_artifacts = false;
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }

    let _guard = init_logging(&config.log_level, config.log_file.as_deref());

    let abi_library = resolve_abi_library(config.compiler.abi_library.as_deref());
    match &abi_library {
        Some(path) => info!("Linking source units against {}", path.display()),
        None => warn!("autonet-abi rlib not found; source units will fail to resolve autonet_abi"),
    }

    let backend = RustcBackend::new(&config.compiler, abi_library);
    let compiler = ArtifactCompiler::new(backend, config.skip_existing_artifacts);
    let loader = DylibLoader::new().context("cannot create library staging directory")?;
    let session = Session::new(config.source_folder.clone(), compiler, loader);

    let mut repl = Repl::new(session, Console::stdout(), config.title.clone());
    repl.start().context("console output failed")?;
    repl.run().context("line editor failed")?;
    Ok(())
}
