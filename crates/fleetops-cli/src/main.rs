//! FleetOps daemon - wires the core engines behind the dashboard HTTP endpoint.

use clap::Parser;
use fleetops_alerts::AlertManager;
use fleetops_control::FleetOpsControlPlane;
use fleetops_ddos::{DdosConfig, DdosEngine};
use fleetops_deploy::adapters::NoOpDeployTarget;
use fleetops_deploy::DeploymentManager;
use fleetops_pipeline::PipelineEngine;
use fleetops_rollback::RollbackManager;
use fleetops_types::EnvironmentKind;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod handlers;
mod router;
mod state;

use config::DaemonConfig;
use error::DaemonResult;
use state::AppState;

/// FleetOps daemon CLI.
#[derive(Parser)]
#[command(name = "fleetwardd")]
#[command(about = "FleetOps daemon - orchestration control plane", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path.
    #[arg(short, long, env = "FLEETOPS_CONFIG")]
    config: Option<String>,

    /// Listen address.
    #[arg(short, long, env = "FLEETOPS_LISTEN_ADDR", default_value = "127.0.0.1:8090")]
    listen: String,

    /// Environment kind: development | staging | production | testing.
    #[arg(short, long, env = "FLEETOPS_ENVIRONMENT", default_value = "development")]
    environment: String,

    /// Log level.
    #[arg(long, env = "FLEETOPS_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging.
    #[arg(long, env = "FLEETOPS_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        tracing::error!(error = %err, "fleetwardd exiting");
        std::process::exit(err.exit_code() as i32);
    }
}

async fn run() -> DaemonResult<()> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let mut cfg = DaemonConfig::load(cli.config.as_deref())
        .map_err(|e| error::DaemonError::Config(e.to_string()))?;

    cfg.server.listen_addr = cli
        .listen
        .parse()
        .map_err(|e| error::DaemonError::Config(format!("invalid listen address: {e}")))?;

    cfg.environment = cli
        .environment
        .parse::<EnvironmentKind>()
        .map_err(error::DaemonError::Config)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?cfg.environment,
        listen = %cfg.server.listen_addr,
        "starting fleetwardd"
    );

    let control_plane = build_control_plane(&cfg);
    let state = AppState::new(control_plane);
    let app = router::create_router(state);

    let listener = tokio::net::TcpListener::bind(cfg.server.listen_addr)
        .await
        .map_err(|e| error::DaemonError::Server(e.to_string()))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| error::DaemonError::Server(e.to_string()))?;

    tracing::info!("fleetwardd shutting down");
    Ok(())
}

fn build_control_plane(cfg: &DaemonConfig) -> Arc<FleetOpsControlPlane> {
    let deployments = Arc::new(DeploymentManager::new(
        Arc::new(NoOpDeployTarget),
        Arc::new(NoOpDeployTarget),
        Arc::new(NoOpDeployTarget),
    ));
    let rollbacks = Arc::new(RollbackManager::new(cfg.rollback.max_history));
    let ddos = Arc::new(DdosEngine::new(DdosConfig {
        enabled: cfg.ddos.enabled,
        ban_duration: std::time::Duration::from_secs(cfg.ddos.ban_duration_secs),
        ring_capacity: cfg.ddos.ring_capacity,
        threat_score_ban_threshold: threat_score_ban_threshold_for(cfg.environment),
    }));

    Arc::new(FleetOpsControlPlane::new(
        Arc::new(PipelineEngine::new()),
        deployments,
        rollbacks,
        ddos,
        Arc::new(AlertManager::new()),
    ))
}

/// Production runs a stricter auto-ban threshold than lower environments,
/// where noisy local/CI traffic shouldn't trip the DDoS engine.
fn threat_score_ban_threshold_for(environment: EnvironmentKind) -> u64 {
    match environment {
        EnvironmentKind::Production => 50,
        EnvironmentKind::Staging => 75,
        EnvironmentKind::Development | EnvironmentKind::Testing => 100,
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
        _ = terminate => tracing::info!("received terminate signal, shutting down"),
    }
}
