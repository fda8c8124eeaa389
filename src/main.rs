//! CLI entry point for the retail report tool.
//!
//! Provides subcommands for running the whole report pipeline and for
//! re-assembling the PDF from pages already on disk.

use anyhow::Result;
use clap::{Parser, Subcommand};
use retail_report::{
    config::ReportConfig,
    error::ReportError,
    fetch::BasicClient,
    pipeline,
    report::{AssembledReport, assemble_dir},
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "retail_report")]
#[command(about = "Builds a PDF report on retail store square footage", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the datasets, render every chart page and assemble the report
    Run {
        /// JSON configuration file
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,
    },
    /// Assemble the report from the pages already in the pages directory
    Assemble {
        /// JSON configuration file
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/retail_report.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("retail_report.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Run { config } => run(&config).await,
        Commands::Assemble { config } => assemble(&config),
    };

    match outcome {
        Ok(report) => {
            info!(
                path = %report.path.display(),
                pages = report.pages.len(),
                "Report written"
            );
            Ok(())
        }
        Err(e) => {
            error!(stage = e.stage(), error = %e, "Report generation failed");
            Err(e.into())
        }
    }
}

/// Runs every stage of the pipeline with an HTTP client built from the config.
#[tracing::instrument(fields(config = %config_path.display()))]
async fn run(config_path: &Path) -> Result<AssembledReport, ReportError> {
    let config = ReportConfig::load(config_path)?;
    let client = BasicClient::with_timeouts(
        Duration::from_secs(config.fetch.timeout_secs),
        Duration::from_secs(config.fetch.connect_timeout_secs),
    )
    .map_err(|e| ReportError::Config(format!("cannot build HTTP client: {e}")))?;

    pipeline::run(&client, &config).await
}

/// Re-assembles the report from whatever pages are on disk.
#[tracing::instrument(fields(config = %config_path.display()))]
fn assemble(config_path: &Path) -> Result<AssembledReport, ReportError> {
    let config = ReportConfig::load(config_path)?;
    assemble_dir(
        &config.output.pages_dir,
        &config.report_name,
        &config.report_path(),
    )
}
