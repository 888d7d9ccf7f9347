//! `mediaq-agent` -- worker node daemon.
//!
//! Registers this machine with the coordinator, pushes CPU, memory and
//! network metrics on an interval, and polls for jobs which it runs
//! through `JOB_COMMAND`. See [`AgentConfig::from_env`] for the
//! environment variables.

use std::sync::Arc;

use mediaq_agent::client::CoordinatorClient;
use mediaq_agent::collector::MetricsCollector;
use mediaq_agent::config::AgentConfig;
use mediaq_agent::executor::CommandExecutor;
use mediaq_agent::runner::Agent;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mediaq_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AgentConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid agent configuration");
        std::process::exit(1);
    });

    let executor = CommandExecutor::from_command_line(&config.job_command, config.job_timeout)
        .unwrap_or_else(|| {
            tracing::error!("JOB_COMMAND must not be blank");
            std::process::exit(1);
        });

    let client = CoordinatorClient::new(&config.coordinator_url).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to build HTTP client");
        std::process::exit(1);
    });

    tracing::info!(
        node_name = %config.node_name,
        coordinator_url = %config.coordinator_url,
        heartbeat_interval_secs = config.heartbeat_interval.as_secs(),
        "Starting mediaq-agent",
    );

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    let agent = Agent::new(&config, client, Arc::new(executor));
    agent.run(MetricsCollector::new(), cancel).await;

    tracing::info!("Agent stopped");
}

/// Cancel `token` on Ctrl+C or SIGTERM.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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

    tracing::info!("Shutdown signal received");
    token.cancel();
}
