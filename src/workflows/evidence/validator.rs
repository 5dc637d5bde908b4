use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate verdict for one (task, window) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Passed,
    Warning,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingSeverity {
    Error,
    Warning,
    Info,
}

/// One concrete problem or observation raised while checking evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFinding {
    pub code: String,
    pub severity: FindingSeverity,
    pub message: String,
    #[serde(default)]
    pub suggestion: Option<String>,
}

/// Result of checking the collected evidence for a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub task_ref: String,
    pub window: String,
    pub status: ValidationStatus,
    pub completeness_score: f64,
    pub total_checks: usize,
    pub passed_checks: usize,
    pub failed_checks: usize,
    pub errors: Vec<ValidationFinding>,
    pub warnings: Vec<ValidationFinding>,
    pub ready_for_submission: bool,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("validator unavailable: {0}")]
    Unavailable(String),
    #[error("evidence unreadable for {task_ref} {window}: {detail}")]
    EvidenceUnreadable {
        task_ref: String,
        window: String,
        detail: String,
    },
}

/// Checks collected evidence before submission. Consumed by the workflow;
/// implementations decide what completeness means for their evidence kinds.
pub trait EvidenceValidator: Send + Sync {
    fn validate(&self, task_ref: &str, window: &str) -> Result<ValidationReport, ValidationError>;
}
