use argus::alerting::spawn_periodic_evaluation;
use argus::server::config::ServerConfig;
use argus::version::VERSION;
use argus::web::{create_axum_router, AppState};

use clap::Parser;
use dotenv::dotenv;
use std::sync::Arc;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Overrides `listen_address` from the config
    #[arg(short, long)]
    listen: Option<String>,
}

/// The returned guard flushes the file writer on drop; keep it alive in `main`.
fn init_logging(log_dir: &str) -> WorkerGuard {
    // JSON file, daily rotation
    let (file_writer, guard) = tracing_appender::non_blocking(rolling::daily(log_dir, "argus.log"));
    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .json();

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
    guard
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl-C handler.");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler.");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received, draining connections.");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();
    dotenv().ok();

    let mut config = ServerConfig::load(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        config.listen_address = listen;
    }

    let _log_guard = init_logging(&config.log_dir);
    info!(version = VERSION, "Starting Argus.");

    let listen_address = config.listen_address.clone();
    let evaluation_interval = config.alert_evaluation_interval_secs;
    let app_state = match AppState::new(config) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!(error = %e, "Failed to build HTTP client.");
            return Err(e.into());
        }
    };

    let evaluation_task = spawn_periodic_evaluation(
        app_state.alert_store.clone(),
        app_state.registry.clone(),
        app_state.notifier.clone(),
        evaluation_interval,
    );

    let app_router = create_axum_router(app_state);
    let listener = tokio::net::TcpListener::bind(&listen_address).await?;
    info!(address = %listen_address, "HTTP server listening.");
    axum::serve(listener, app_router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(task) = evaluation_task {
        task.abort();
    }
    info!("Argus stopped.");
    Ok(())
}
