use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::Level;

use sievec::config::paths;
use sievec::store::config_store::{load_config, save_config};
use sievec::store::script_io::load_script;
use sievec::{compile, CompilerConfig, SieveScript};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_COMMIT"),
    " ",
    env!("BUILD_DATE"),
    ")"
);

/// sievec - check and compile SIEVE mail filtering scripts
#[derive(Parser, Debug)]
#[command(name = "sievec")]
#[command(author, version = VERSION, about, long_about = None)]
struct Cli {
    /// Configuration file (default: the per-user config directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the compiled tree as JSON
    #[arg(long)]
    json: bool,

    /// Only check the script, print nothing on success
    #[arg(short, long, conflicts_with = "json")]
    quiet: bool,

    /// More logging (repeat for trace output)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Write the default configuration to the config file and exit
    #[arg(long)]
    init_config: bool,

    /// Script to compile, `-` for standard input
    #[arg(required_unless_present = "init_config")]
    script: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

/// Returns whether the script compiled cleanly.
fn run(cli: &Cli) -> anyhow::Result<bool> {
    if cli.init_config {
        let path = match &cli.config {
            Some(path) => path.clone(),
            None => paths::default_config_path().context("no configuration directory")?,
        };
        save_config(&path, &CompilerConfig::default())?;
        println!("Wrote {}", path.display());
        return Ok(true);
    }
    let Some(script_path) = &cli.script else {
        anyhow::bail!("no script given");
    };

    let config = load_config(cli.config.as_deref())?;
    let input = load_script(script_path)
        .with_context(|| format!("cannot read {}", script_path.display()))?;
    tracing::info!(path = %script_path.display(), bytes = input.len(), "compiling");

    let name = script_path.display().to_string();
    let mut script = SieveScript::new(config).on_error(|d| eprintln!("{name}: {d}"));
    let Some(block) = compile(&mut script, &input) else {
        let errors = script.err_count();
        eprintln!("{name}: {errors} error{}", if errors == 1 { "" } else { "s" });
        return Ok(false);
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&block)?);
    } else if !cli.quiet {
        println!("{block:#?}");
    }
    Ok(true)
}
