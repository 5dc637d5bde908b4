//! Wire models for the external GRC platform and the submission gateway.
//!
//! The platform API is only partially documented: several association
//! fields (`tags`, `assignees`, `controls`) arrive either as bare strings
//! or as embedded objects depending on the requested embeds, so those are
//! kept as raw JSON values and decoded by the adapter. The nested
//! `master_content` object carries the audit-relevant guidance text.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::runtime::Runtime;

/// Nested free-text content block served for tasks and controls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMasterContent {
    #[serde(default)]
    pub guidance: String,
    #[serde(default)]
    pub help: String,
    #[serde(default)]
    pub description: String,
}

/// Evidence task as served by the platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiEvidenceTask {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub collection_interval: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub framework: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub last_collected: Option<String>,
    #[serde(default)]
    pub next_due: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub controls: Option<Value>,
    #[serde(default)]
    pub tags: Option<Value>,
    #[serde(default)]
    pub assignees: Option<Value>,
    #[serde(default)]
    pub master_content: Option<ApiMasterContent>,
}

/// Control as served by the platform. The description text lives in `body`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiControl {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub framework: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub help: String,
    #[serde(default)]
    pub tags: Option<Value>,
    #[serde(default)]
    pub assignees: Option<Value>,
    #[serde(default)]
    pub master_content: Option<ApiMasterContent>,
}

/// Policy as served by the platform. `id` arrives as either a number or a
/// string depending on the endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiPolicy {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub framework: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub tags: Option<Value>,
    #[serde(default)]
    pub assignees: Option<Value>,
    #[serde(default)]
    pub current_version: Option<ApiPolicyVersion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiPolicyVersion {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub content: String,
}

/// Payload transmitted when submitting evidence for a collection window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidencePayload {
    pub task_id: u64,
    pub content: String,
    pub content_type: String,
    pub collection_window: String,
    pub collection_date: String,
    pub sources: Vec<EvidenceSourceRef>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
    pub controls_covered: Vec<String>,
}

/// One originating source of transmitted evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceSourceRef {
    #[serde(rename = "type")]
    pub source_type: String,
    pub tool: String,
    pub timestamp: String,
}

/// Platform acknowledgement of a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformReceipt {
    pub submission_id: String,
    pub status: String,
    #[serde(default)]
    pub message: String,
    pub received_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

/// Remote view of a previously transmitted submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteSubmissionStatus {
    pub status: String,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("platform transport failed: {0}")]
    Transport(String),
    #[error("platform rejected request ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("platform response malformed: {0}")]
    Malformed(String),
    #[error("platform runtime unavailable: {0}")]
    Runtime(String),
}

/// Outbound gateway to the GRC platform. Calls block until the platform
/// answers; deadlines and cancellation are the caller's responsibility.
pub trait PlatformGateway: Send + Sync {
    fn submit_evidence(
        &self,
        org_id: &str,
        task_id: u64,
        payload: &EvidencePayload,
    ) -> Result<PlatformReceipt, PlatformError>;

    fn submission_status(
        &self,
        org_id: &str,
        task_id: u64,
        submission_id: &str,
    ) -> Result<RemoteSubmissionStatus, PlatformError>;
}

/// Thin wrapper around an async HTTP client allowing synchronous workflows
/// to talk to the platform without exposing async details.
pub struct HttpPlatformClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    runtime: Runtime,
}

impl HttpPlatformClient {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        runtime: Runtime,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            runtime,
        }
    }

    pub fn with_runtime(
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, PlatformError> {
        let runtime = Runtime::new().map_err(|err| PlatformError::Runtime(err.to_string()))?;
        Ok(Self::new(base_url, token, runtime))
    }

    fn map_error<E: std::fmt::Display>(err: E) -> PlatformError {
        PlatformError::Transport(err.to_string())
    }
}

impl std::fmt::Debug for HttpPlatformClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPlatformClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl PlatformGateway for HttpPlatformClient {
    fn submit_evidence(
        &self,
        org_id: &str,
        task_id: u64,
        payload: &EvidencePayload,
    ) -> Result<PlatformReceipt, PlatformError> {
        let url = format!(
            "{}/api/v1/{org_id}/evidence_tasks/{task_id}/submissions",
            self.base_url
        );

        self.runtime.block_on(async {
            let response = self
                .http
                .post(&url)
                .bearer_auth(&self.token)
                .json(payload)
                .send()
                .await
                .map_err(Self::map_error)?;

            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(PlatformError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            response
                .json::<PlatformReceipt>()
                .await
                .map_err(|err| PlatformError::Malformed(err.to_string()))
        })
    }

    fn submission_status(
        &self,
        org_id: &str,
        task_id: u64,
        submission_id: &str,
    ) -> Result<RemoteSubmissionStatus, PlatformError> {
        let url = format!(
            "{}/api/v1/{org_id}/evidence_tasks/{task_id}/submissions/{submission_id}",
            self.base_url
        );

        self.runtime.block_on(async {
            let response = self
                .http
                .get(&url)
                .bearer_auth(&self.token)
                .send()
                .await
                .map_err(Self::map_error)?;

            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(PlatformError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            response
                .json::<RemoteSubmissionStatus>()
                .await
                .map_err(|err| PlatformError::Malformed(err.to_string()))
        })
    }
}
