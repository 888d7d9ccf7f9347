use std::time::Duration;

use crate::executor::DEFAULT_JOB_TIMEOUT;

/// Default seconds between heartbeats.
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 3;

/// Default seconds between claim attempts when there is nothing to do.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 1;

/// A missing or malformed environment variable.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{var} has an invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Agent configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Base URL of the coordinator, e.g. `http://coordinator:3000`.
    pub coordinator_url: String,
    /// Name this node registers under.
    pub node_name: String,
    /// Address advertised at registration.
    pub node_address: Option<String>,
    pub heartbeat_interval: Duration,
    pub poll_interval: Duration,
    /// Command run once per job.
    pub job_command: String,
    /// Wall-clock limit for a single job.
    pub job_timeout: Duration,
}

impl AgentConfig {
    /// Load configuration from the environment.
    ///
    /// | Env Var                   | Required | Default |
    /// |---------------------------|----------|---------|
    /// | `COORDINATOR_URL`         | yes      | --      |
    /// | `NODE_NAME`               | yes      | --      |
    /// | `JOB_COMMAND`             | yes      | --      |
    /// | `NODE_ADDRESS`            | no       | unset   |
    /// | `HEARTBEAT_INTERVAL_SECS` | no       | `3`     |
    /// | `POLL_INTERVAL_SECS`      | no       | `1`     |
    /// | `JOB_TIMEOUT_SECS`        | no       | `3600`  |
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            coordinator_url: required("COORDINATOR_URL")?,
            node_name: required("NODE_NAME")?,
            node_address: std::env::var("NODE_ADDRESS")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            heartbeat_interval: secs("HEARTBEAT_INTERVAL_SECS", DEFAULT_HEARTBEAT_INTERVAL_SECS)?,
            poll_interval: secs("POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?,
            job_command: required("JOB_COMMAND")?,
            job_timeout: secs("JOB_TIMEOUT_SECS", DEFAULT_JOB_TIMEOUT.as_secs())?,
        })
    }
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(var))
}

fn secs(var: &'static str, default: u64) -> Result<Duration, ConfigError> {
    match std::env::var(var) {
        Ok(value) => match value.trim().parse::<u64>() {
            Ok(n) if n > 0 => Ok(Duration::from_secs(n)),
            _ => Err(ConfigError::Invalid { var, value }),
        },
        Err(_) => Ok(Duration::from_secs(default)),
    }
}
