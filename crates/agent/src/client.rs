//! HTTP client for the coordinator's agent endpoints.
//!
//! Wraps `/api/v1/nodes/*` and `/api/v1/worker/*` using [`reqwest`].
//! Every success body is the coordinator's `{ "data": ... }` envelope;
//! every failure body is `{ "error": msg, "code": CODE }`.

use std::time::Duration;

use mediaq_core::validation::truncate_error;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::collector::HostSample;

/// Per-request timeout applied to every coordinator call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Error code the coordinator uses for a node name it does not know.
pub const NODE_NOT_REGISTERED: &str = "NODE_NOT_REGISTERED";

/// Errors from the coordinator client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request itself failed (network, DNS, timeout, decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The coordinator answered with a non-2xx status.
    #[error("Coordinator error ({status}): {message}")]
    Api {
        status: u16,
        /// Machine-readable code from the error body, when present.
        code: Option<String>,
        message: String,
    },
}

impl ClientError {
    /// True when the coordinator no longer knows this node.
    pub fn is_node_not_registered(&self) -> bool {
        matches!(self, ClientError::Api { code: Some(code), .. } if code == NODE_NOT_REGISTERED)
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    code: Option<String>,
}

#[derive(Debug, Serialize)]
struct HeartbeatBody<'a> {
    name: &'a str,
    #[serde(flatten)]
    sample: &'a HostSample,
}

/// The subset of a node record the agent cares about.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisteredNode {
    pub id: i64,
    pub name: String,
    pub is_active: bool,
}

/// A job handed to this node by a successful claim.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssignedJob {
    pub id: i64,
    #[serde(rename = "type")]
    pub job_type: String,
    pub payload: serde_json::Value,
}

/// Answer to a claim attempt. `job` is `None` both when the queue is empty
/// and when admission turned the node away; `reason` tells them apart.
#[derive(Debug, Clone, Deserialize)]
pub struct NextJob {
    pub job: Option<AssignedJob>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub min_score: Option<f64>,
}

/// The job state the coordinator reports back after an update.
#[derive(Debug, Clone, Deserialize)]
pub struct JobAck {
    pub id: i64,
    pub status: String,
    pub progress: f64,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for a single coordinator.
#[derive(Clone)]
pub struct CoordinatorClient {
    client: reqwest::Client,
    base_url: String,
}

impl CoordinatorClient {
    /// Create a client for a coordinator at `base_url`, e.g.
    /// `http://coordinator:3000`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `POST /api/v1/nodes/register`. Idempotent.
    pub async fn register(
        &self,
        name: &str,
        address: Option<&str>,
    ) -> Result<RegisteredNode, ClientError> {
        self.post("/nodes/register", &json!({ "name": name, "address": address }))
            .await
    }

    /// `POST /api/v1/nodes/heartbeat`.
    pub async fn heartbeat(&self, name: &str, sample: &HostSample) -> Result<(), ClientError> {
        let _: serde_json::Value = self
            .post("/nodes/heartbeat", &HeartbeatBody { name, sample })
            .await?;
        Ok(())
    }

    /// `POST /api/v1/worker/next-job`.
    pub async fn next_job(&self, node_name: &str) -> Result<NextJob, ClientError> {
        self.post("/worker/next-job", &json!({ "node_name": node_name }))
            .await
    }

    /// `POST /api/v1/worker/jobs/{id}/progress`.
    pub async fn report_progress(&self, job_id: i64, progress: f64) -> Result<JobAck, ClientError> {
        self.post(
            &format!("/worker/jobs/{job_id}/progress"),
            &json!({ "progress": progress }),
        )
        .await
    }

    /// `POST /api/v1/worker/jobs/{id}/done`.
    pub async fn report_done(&self, job_id: i64) -> Result<JobAck, ClientError> {
        self.post(&format!("/worker/jobs/{job_id}/done"), &json!({}))
            .await
    }

    /// `POST /api/v1/worker/jobs/{id}/fail`. The message is cut to the
    /// length the coordinator stores before it is sent.
    pub async fn report_fail(&self, job_id: i64, error: &str) -> Result<JobAck, ClientError> {
        self.post(
            &format!("/worker/jobs/{job_id}/fail"),
            &json!({ "error": truncate_error(error) }),
        )
        .await
    }

    // ---- private helpers ----

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}/api/v1{}", self.base_url, path))
            .json(body)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        let envelope: Envelope<T> = response.json().await?;
        Ok(envelope.data)
    }

    /// Turn a non-2xx response into [`ClientError::Api`], decoding the
    /// coordinator's error body when it has one.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let raw = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        let (code, message) = match serde_json::from_str::<ErrorBody>(&raw) {
            Ok(body) => (body.code, body.error),
            Err(_) => (None, raw),
        };

        Err(ClientError::Api {
            status: status.as_u16(),
            code,
            message,
        })
    }
}
