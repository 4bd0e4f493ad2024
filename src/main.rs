//! Binary entry point for piiguard.
//!
//! This binary provides the CLI interface for PII detection and redaction.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use piiguard::models::{Detection, RedactionPolicy};
use piiguard::observability;
use piiguard::pipeline::Redaction;
use piiguard::{PiiPipeline, PiiguardConfig};
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

/// piiguard - Detect and redact personally identifiable information.
#[derive(Parser)]
#[command(name = "piiguard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "PIIGUARD_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Detect PII and print one record per span.
    Detect {
        /// Text to scan; read from stdin when omitted.
        text: Option<String>,

        /// Minimum recognizer confidence.
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Output format.
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Print text with PII replaced.
    Redact {
        /// Text to redact; read from stdin when omitted.
        text: Option<String>,

        /// Placeholder override, e.g. `EMAIL=<email>` (repeatable).
        #[arg(short, long = "policy", value_name = "CATEGORY=PLACEHOLDER")]
        policies: Vec<String>,

        /// Substitute instance keys (`Person_1`) instead of placeholders.
        #[arg(long)]
        keys: bool,
    },

    /// Run the HTTP detection API.
    Serve {
        /// Listen port.
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage configuration.
    Config {
        /// Show effective configuration.
        #[arg(long)]
        show: bool,
    },
}

/// Detection output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// JSON array.
    Json,
    /// Aligned columns.
    Table,
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match PiiguardConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init_from_settings(&config.logging, cli.verbose) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli.command, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(command: Commands, config: PiiguardConfig) -> anyhow::Result<()> {
    match command {
        Commands::Detect {
            text,
            threshold,
            format,
        } => cmd_detect(config, text, threshold, format),
        Commands::Redact {
            text,
            policies,
            keys,
        } => cmd_redact(config, text, policies, keys),
        Commands::Serve { port } => cmd_serve(config, port),
        Commands::Config { show } => cmd_config(config, show),
    }
}

/// Returns the argument, or all of stdin when absent.
fn read_input(text: Option<String>) -> anyhow::Result<String> {
    if let Some(text) = text {
        return Ok(text);
    }
    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .context("failed to read text from stdin")?;
    Ok(buffer)
}

fn cmd_detect(
    config: PiiguardConfig,
    text: Option<String>,
    threshold: Option<f64>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let config = match threshold {
        Some(threshold) => config.with_threshold(threshold),
        None => config,
    };
    let pipeline = config.build_pipeline()?;
    let text = read_input(text)?;
    let result = pipeline.process(&text)?;
    warn_if_degraded(&result);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result.detections)?),
        OutputFormat::Table => print_table(&result.detections),
    }
    Ok(())
}

/// Tells the user when only pattern detectors contributed.
fn warn_if_degraded(result: &Redaction) {
    if let Some(e) = &result.recognizer_error {
        eprintln!("warning: {e}; showing pattern detections only");
    }
}

fn print_table(detections: &[Detection]) {
    if detections.is_empty() {
        println!("No PII detected.");
        return;
    }
    println!(
        "{:<16} {:<12} {:>6} {:>6} {:>7}  ORIGINAL",
        "KEY", "LABEL", "START", "END", "SCORE"
    );
    for d in detections {
        println!(
            "{:<16} {:<12} {:>6} {:>6} {:>7.4}  {}",
            d.key, d.label, d.start, d.end, d.score, d.original_text
        );
    }
}

fn cmd_redact(
    config: PiiguardConfig,
    text: Option<String>,
    policies: Vec<String>,
    keys: bool,
) -> anyhow::Result<()> {
    let overrides = policies
        .iter()
        .map(|raw| RedactionPolicy::parse_override(raw))
        .collect::<piiguard::Result<Vec<_>>>()?;

    let pipeline: PiiPipeline = config.build_pipeline()?;
    let text = read_input(text)?;

    let policy = pipeline.config().policy.with_overrides(overrides);
    let result = pipeline.process_with(&text, &policy)?;
    warn_if_degraded(&result);

    let output = if keys { result.keyed } else { result.redacted };
    println!("{output}");
    Ok(())
}

#[cfg(feature = "http")]
fn cmd_serve(config: PiiguardConfig, port: Option<u16>) -> anyhow::Result<()> {
    let pipeline = config.build_pipeline()?;
    let mut server = piiguard::server::Server::new(pipeline, config.server.clone());
    if let Some(port) = port {
        server = server.with_port(port);
    }
    server.run()?;
    Ok(())
}

#[cfg(not(feature = "http"))]
fn cmd_serve(_config: PiiguardConfig, _port: Option<u16>) -> anyhow::Result<()> {
    Err(piiguard::Error::FeatureNotEnabled("http".to_string()).into())
}

fn cmd_config(config: PiiguardConfig, show: bool) -> anyhow::Result<()> {
    if !show {
        bail!("nothing to do; pass --show to print the effective configuration");
    }
    println!("# Effective configuration");
    if let Some(path) = PiiguardConfig::default_path() {
        println!("# Default file: {}", path.display());
    }
    println!();
    print!("{}", config.to_toml()?);
    Ok(())
}
