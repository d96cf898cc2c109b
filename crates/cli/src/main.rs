//! `opensqli` entry point.
//!
//! Loads a Swagger 2.0 / OpenAPI 3.x description, resolves every reference and prints the
//! request surface (servers, operations, parameters, payloads) as text or JSON.

mod config;
mod report;

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use opensqli_spec::SpecAdapter;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::config::{default_config_path, load_config};
use crate::report::SurfaceReport;

#[derive(Parser, Debug)]
#[command(name = "opensqli", version, about, long_about = None)]
struct Cli {
    /// URL or file path of the Swagger 2.0 / OpenAPI 3.x document.
    spec: String,

    /// Header sent with every document fetch ("Name: value"). Repeatable.
    #[arg(short = 'H', long = "header", value_name = "HEADER")]
    headers: Vec<String>,

    /// Path to configuration file (JSON or YAML).
    #[arg(long, env = "OPENSQLI_CONFIG")]
    config: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config_path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => default_config_path().ok(),
    };
    let file_config = match &config_path {
        Some(path) => load_config(path)?,
        None => config::CliConfig::default(),
    };
    let loader_config = file_config.into_loader_config(&cli.headers)?;

    let spec = SpecAdapter::from_location(&cli.spec, &loader_config)
        .with_context(|| format!("load {}", cli.spec))?;
    let report = SurfaceReport::build(&spec).context("inspect specification")?;
    tracing::info!(
        "{} endpoints across {} paths",
        report.endpoints.len(),
        path_count(&report)
    );

    match cli.format {
        OutputFormat::Text => print!("{}", report.render_text()),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serialize report as json")?
        ),
    }
    Ok(())
}

fn path_count(report: &SurfaceReport) -> usize {
    let mut paths: Vec<&str> = report.endpoints.iter().map(|e| e.path.as_str()).collect();
    paths.dedup();
    paths.len()
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
