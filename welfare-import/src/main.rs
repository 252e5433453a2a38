//! Bulk import CLI (welfare-import) - Main entry point
//!
//! Uploads a beneficiary spreadsheet to the Bulk Import Service and drives
//! the chunked import to completion, printing progress to stdout.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use welfare_common::config::{
    load_toml_config, resolve_config_path, write_toml_config, ServiceConfig, TomlConfig,
};
use welfare_common::events::EventBus;
use welfare_import::config::{resolve_service_url, ImportSettings, MODULE_NAME};
use welfare_import::logging::init_tracing;
use welfare_import::models::selected_file::format_bytes;
use welfare_import::models::SelectedFile;
use welfare_import::render::spawn_renderer;
use welfare_import::{HttpBulkImportClient, ImportCoordinator};

/// Exit code used when the run is interrupted by Ctrl-C
const EXIT_INTERRUPTED: u8 = 130;

/// Command-line arguments for welfare-import
#[derive(Parser, Debug)]
#[command(name = "welfare-import")]
#[command(about = "Chunked bulk import of family-head spreadsheets")]
#[command(version)]
struct Args {
    /// Path to TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Bulk Import Service base URL (overrides WELFARE_SERVICE_URL and TOML)
    #[arg(long, global = true)]
    service_url: Option<String>,

    /// Log filter directive (e.g. "debug", "welfare_import=trace")
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a spreadsheet
    Run {
        /// .xlsx or .xls file to import
        file: PathBuf,

        /// Records per chunk request
        #[arg(long)]
        chunk_size: Option<u32>,

        /// Write the final import result as JSON to this path
        #[arg(long)]
        summary_json: Option<PathBuf>,
    },

    /// Validate a spreadsheet locally without contacting the service
    Check {
        file: PathBuf,
    },

    /// Write a default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let log_control = init_tracing(args.log_level.as_deref());

    let config_path = resolve_config_path(args.config.as_deref(), MODULE_NAME)
        .context("Failed to resolve config path")?;

    if let Command::InitConfig { force } = &args.command {
        return init_config(&config_path, args.service_url.as_deref(), *force);
    }

    let toml_config = load_toml_config(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    log_control.apply_config_level(&toml_config.logging.level);

    match args.command {
        Command::Run {
            file,
            chunk_size,
            summary_json,
        } => {
            run_import(
                &toml_config,
                args.service_url.as_deref(),
                &file,
                chunk_size,
                summary_json.as_deref(),
            )
            .await
        }
        Command::Check { file } => check_file(&toml_config, &file).await,
        Command::InitConfig { .. } => Ok(ExitCode::SUCCESS),
    }
}

async fn run_import(
    toml_config: &TomlConfig,
    cli_service_url: Option<&str>,
    file: &Path,
    chunk_size: Option<u32>,
    summary_json: Option<&Path>,
) -> Result<ExitCode> {
    let service_url = resolve_service_url(cli_service_url, toml_config)?;
    let settings = ImportSettings::resolve(toml_config, chunk_size)?;
    let timeout = toml_config
        .service
        .request_timeout_secs
        .map(Duration::from_secs);

    let client = HttpBulkImportClient::new(&service_url, timeout)
        .context("Failed to create Bulk Import Service client")?;

    info!(
        service_url = %client.base_url(),
        chunk_size = settings.chunk_size,
        "Starting import of {}",
        file.display()
    );

    let event_bus = EventBus::new(256);
    let render_cancel = CancellationToken::new();
    let renderer = spawn_renderer(&event_bus, render_cancel.clone());

    let mut coordinator = ImportCoordinator::new(Arc::new(client), settings, event_bus);

    let outcome = tokio::select! {
        result = coordinator.import_file(file) => Some(result),
        _ = shutdown_signal() => None,
    };

    let exit_code = match outcome {
        None => {
            coordinator.abandon()?;
            ExitCode::from(EXIT_INTERRUPTED)
        }
        Some(Ok(result)) => {
            if let Some(path) = summary_json {
                let json = serde_json::to_string_pretty(&result)
                    .context("Failed to serialize import result")?;
                tokio::fs::write(path, json)
                    .await
                    .with_context(|| format!("Failed to write summary to {}", path.display()))?;
                info!("Import summary written to {}", path.display());
            }
            ExitCode::SUCCESS
        }
        Some(Err(e)) => {
            error!(category = ?e.category(), "Import failed: {}", e);
            ExitCode::FAILURE
        }
    };

    render_cancel.cancel();
    if let Err(e) = renderer.await {
        warn!("Progress renderer ended abnormally: {}", e);
    }

    Ok(exit_code)
}

/// Pre-flight checks only: extension, readability, size
async fn check_file(toml_config: &TomlConfig, file: &Path) -> Result<ExitCode> {
    let settings = ImportSettings::resolve(toml_config, None)?;

    let selected = SelectedFile::inspect(file)
        .await
        .with_context(|| format!("Cannot read {}", file.display()))?;

    let Some(selected) = selected else {
        println!(
            "{}: unsupported file type, only .xlsx and .xls are accepted",
            file.display()
        );
        return Ok(ExitCode::FAILURE);
    };

    if !selected.within_size_limit(settings.max_file_size_bytes) {
        println!(
            "{}: {} exceeds the {} upload limit",
            selected.file_name,
            format_bytes(selected.size_bytes),
            format_bytes(settings.max_file_size_bytes)
        );
        return Ok(ExitCode::FAILURE);
    }

    println!(
        "{}: {} ({}), ready for import",
        selected.file_name,
        format_bytes(selected.size_bytes),
        selected.mime_type()
    );
    Ok(ExitCode::SUCCESS)
}

fn init_config(path: &Path, service_url: Option<&str>, force: bool) -> Result<ExitCode> {
    if path.exists() && !force {
        bail!(
            "Config file already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    let config = TomlConfig {
        service: ServiceConfig {
            base_url: service_url.map(str::to_string),
            request_timeout_secs: None,
        },
        ..Default::default()
    };

    write_toml_config(&config, path)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    println!("Wrote default config to {}", path.display());
    Ok(ExitCode::SUCCESS)
}

/// Resolves on Ctrl-C (or SIGTERM on Unix)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, abandoning import");
        },
        _ = terminate => {
            info!("Received terminate signal, abandoning import");
        },
    }
}
