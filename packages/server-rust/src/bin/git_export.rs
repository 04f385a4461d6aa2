//! # git-export
//!
//! Receives export jobs from the background dispatcher, publishes each one
//! as a pull request and reports the outcome through the status callback.
//!
//! ```bash
//! GITHUB_TOKEN=... GITHUB_REPO_OWNER=acme GITHUB_REPO_NAME=decisions \
//! SUPABASE_URL=https://db.example.co SUPABASE_SERVICE_ROLE_KEY=... \
//! git-export --port 8080 --log-format json
//! ```

use anyhow::Result;
use clap::{Parser, ValueEnum};
use gitexport_server::export::{ExportPipeline, ExportWorker};
use gitexport_server::network::{NetworkConfig, NetworkModule};
use gitexport_server::ExportConfig;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum LogFormat {
    /// JSON structured logs.
    Json,
    /// Human-readable logs.
    #[default]
    Pretty,
}

/// Git export server.
#[derive(Parser)]
#[command(name = "git-export", version)]
#[command(about = "Publishes exported decision records as pull requests")]
struct Cli {
    /// Bind address.
    #[arg(long, env = "GIT_EXPORT_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Listen port.
    #[arg(long, env = "GIT_EXPORT_PORT", default_value_t = 8080)]
    port: u16,

    #[arg(long, env = "GIT_EXPORT_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(flatten)]
    export: ExportConfig,
}

fn init_logging(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    let missing = cli.export.missing_required();
    if !missing.is_empty() {
        // Keep serving: jobs fail at the call that needs the value and the
        // dispatcher still gets its acknowledgement.
        error!(missing = ?missing, "required configuration is missing");
    }

    let pipeline = ExportPipeline::from_config(&cli.export)?;
    let mut worker = ExportWorker::start(pipeline);

    let config = NetworkConfig {
        host: cli.host,
        port: cli.port,
        request_timeout: NetworkConfig::request_timeout_for(cli.export.call_timeout()),
        ..NetworkConfig::default()
    };
    let mut network = NetworkModule::new(config, worker.submitter(), missing.is_empty());
    let port = network.start().await?;
    info!(
        port,
        repo = %format!("{}/{}", cli.export.repo_owner, cli.export.repo_name),
        base = %cli.export.default_branch,
        "git export server started"
    );

    network.serve(shutdown_signal()).await?;

    worker.stop().await;
    info!("git export server stopped");
    Ok(())
}
