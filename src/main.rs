//! CLI entry point for the release upload tool.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use appcenter_core::transport::{HttpTransport, ProxyConfig, TransportConfig};
use appcenter_core::validation::{self, Field, FieldError};
use appcenter_core::{UploadOrchestrator, UploadOutcome, UploadRequest};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

mod app_config;
mod cli;

use cli::Args;

/// Exit code for rejected input or configuration.
const EXIT_INVALID_INPUT: u8 = 2;

/// Exit code after an interrupt, as shells report SIGINT.
const EXIT_ABORTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let (orchestrator, request) = match prepare(&args) {
        Ok(prepared) => prepared,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::from(EXIT_INVALID_INPUT);
        }
    };

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling upload");
            signal_token.cancel();
        }
    });

    info!(
        owner = request.owner_name(),
        app = request.app_name(),
        path = %request.path_to_app().display(),
        "Release upload starting"
    );

    match orchestrator.run(&request, &cancel).await {
        UploadOutcome::Success { release_id } => {
            println!("{release_id}");
            ExitCode::SUCCESS
        }
        UploadOutcome::Failure(failure) => {
            eprintln!("error: {failure}");
            ExitCode::FAILURE
        }
        UploadOutcome::Aborted { stage } => {
            eprintln!("aborted during {stage}");
            ExitCode::from(EXIT_ABORTED)
        }
    }
}

/// Validates input, loads configuration and wires the orchestrator.
fn prepare(args: &Args) -> Result<(UploadOrchestrator, UploadRequest)> {
    let api_token = checked(Field::ApiToken, args.api_token.as_deref())?;
    let owner = checked(Field::OwnerName, args.owner.as_deref())?;
    let app = checked(Field::AppName, args.app.as_deref())?;
    let groups = checked(Field::DistributionGroups, args.groups.as_deref())?;
    let path = checked(Field::PathToApp, args.path.as_deref())?;

    let loaded = app_config::load_file_config(args.config.as_deref())?;
    if loaded.loaded_from_file {
        if let Some(path) = &loaded.path {
            debug!(path = %path.display(), "Loaded config file");
        }
    }
    let file_config = loaded.config;

    let mut transport_config = file_config.apply_timeouts(TransportConfig::new(api_token));
    if let Some(base_url) = args.base_url.as_deref().or(file_config.base_url.as_deref()) {
        transport_config = transport_config
            .with_base_url(base_url)
            .context("Invalid base URL")?;
    }
    transport_config = transport_config.with_proxy(proxy_config(args));
    debug!(
        base_url = %transport_config.base_url(),
        proxy = ?transport_config.proxy(),
        "Transport configured"
    );

    let transport = HttpTransport::new(transport_config).context("Failed to build HTTP client")?;
    let orchestrator = UploadOrchestrator::new(Arc::new(transport), file_config.upload_settings());

    let request = UploadRequest::new(owner, app, groups, path)
        .with_release_notes(args.release_notes.clone())
        .with_notify_testers(args.notify());

    Ok((orchestrator, request))
}

fn checked(field: Field, value: Option<&str>) -> Result<String, FieldError> {
    let value = value.unwrap_or_default();
    validation::check(field, value)?;
    Ok(value.to_string())
}

fn proxy_config(args: &Args) -> Option<ProxyConfig> {
    let host = args.proxy_host.as_deref()?;
    let proxy = ProxyConfig::new(host, args.proxy_port.unwrap_or(8080));
    Some(match args.proxy_user.as_deref() {
        Some(user) => proxy.with_credentials(user, args.proxy_password.clone()),
        None => proxy,
    })
}
