//! Job execution.
//!
//! The coordinator treats `job_type` and `payload` as opaque; what a job
//! actually does is decided here. [`CommandExecutor`] runs a configured
//! program once per job and hands it the job through environment
//! variables:
//!
//! | Variable             | Value                          |
//! |----------------------|--------------------------------|
//! | `MEDIAQ_JOB_ID`      | Job id                         |
//! | `MEDIAQ_JOB_TYPE`    | Job type                       |
//! | `MEDIAQ_JOB_PAYLOAD` | Payload as compact JSON        |
//!
//! A line `progress <0-100>` on the program's stdout is forwarded to the
//! coordinator as a progress report.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use crate::client::AssignedJob;

/// Progress reported as soon as a job starts executing.
pub const STARTED_PROGRESS: f64 = 1.0;

/// Default wall-clock limit for a single job.
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(3600);

/// Longest stderr tail kept in a failure message.
const MAX_STDERR_CHARS: usize = 4000;

/// Receives progress updates while a job runs.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(&self, progress: f64);
}

/// Runs one claimed job to completion.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    async fn execute(
        &self,
        job: &AssignedJob,
        progress: &dyn ProgressSink,
    ) -> Result<(), ExecutionError>;
}

/// Why a job did not succeed. The `Display` text is what gets reported as
/// the job's error.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("Job command I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Job command exited with code {code}: {stderr}")]
    Exited { code: i32, stderr: String },

    #[error("Job timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    #[error("Agent shut down while the job was running")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

/// Parse a `progress <value>` line written by a job command.
pub fn parse_progress_line(line: &str) -> Option<f64> {
    let mut parts = line.split_whitespace();
    if !parts.next()?.eq_ignore_ascii_case("progress") {
        return None;
    }
    let value: f64 = parts.next()?.trim_end_matches('%').parse().ok()?;
    value.is_finite().then_some(value)
}

/// Executes every job by spawning `program args..`.
///
/// No shell is involved, so payload contents never reach a command line.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandExecutor {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Split a whitespace-separated command line into program and
    /// arguments. Returns `None` for a blank line.
    pub fn from_command_line(command: &str, timeout: Duration) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect(), timeout))
    }
}

#[async_trait]
impl JobExecutor for CommandExecutor {
    async fn execute(
        &self,
        job: &AssignedJob,
        progress: &dyn ProgressSink,
    ) -> Result<(), ExecutionError> {
        let start = Instant::now();
        let payload = serde_json::to_string(&job.payload)
            .map_err(|e| ExecutionError::Other(format!("Unserialisable payload: {e}")))?;

        tracing::info!(
            job_id = job.id,
            job_type = %job.job_type,
            program = %self.program,
            "Executing job command",
        );

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env("MEDIAQ_JOB_ID", job.id.to_string())
            .env("MEDIAQ_JOB_TYPE", &job.job_type)
            .env("MEDIAQ_JOB_PAYLOAD", payload)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        progress.report(STARTED_PROGRESS).await;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut buf).await;
            }
            buf
        });

        let run = async {
            if let Some(stdout) = stdout {
                let mut lines = BufReader::new(stdout).lines();
                while let Some(line) = lines.next_line().await? {
                    if let Some(value) = parse_progress_line(&line) {
                        progress.report(value).await;
                    }
                }
            }
            child.wait().await
        };

        let result = tokio::time::timeout(self.timeout, run).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let status = match result {
            Ok(status) => status?,
            Err(_) => {
                let _ = child.start_kill();
                stderr_task.abort();
                tracing::error!(job_id = job.id, elapsed_ms, "Job command timed out");
                return Err(ExecutionError::TimedOut(self.timeout));
            }
        };

        let stderr = stderr_task.await.unwrap_or_default();
        if status.success() {
            tracing::info!(job_id = job.id, elapsed_ms, "Job command succeeded");
            return Ok(());
        }

        let stderr = tail(stderr.trim(), MAX_STDERR_CHARS);
        tracing::error!(job_id = job.id, elapsed_ms, stderr = %stderr, "Job command failed");
        Err(ExecutionError::Exited {
            code: status.code().unwrap_or(-1),
            stderr,
        })
    }
}

/// The last `max` characters of `text`.
fn tail(text: &str, max: usize) -> String {
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(max)).collect()
}
