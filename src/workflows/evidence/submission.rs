use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::EvidenceTask;
use super::platform::{EvidencePayload, EvidenceSourceRef, PlatformError, PlatformGateway, PlatformReceipt};
use super::storage::{EvidenceStore, StoreError};
use super::validator::{EvidenceValidator, ValidationError, ValidationReport, ValidationStatus};

/// Lifecycle position of one submission attempt. Advancement is forward
/// only; a later attempt for the same window supersedes the record instead
/// of rewinding it. `draft` is terminal in local-only mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Draft,
    Validating,
    ValidationFailed,
    Validated,
    SubmissionFailed,
    Submitted,
    Accepted,
}

impl SubmissionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SubmissionStatus::Draft => "draft",
            SubmissionStatus::Validating => "validating",
            SubmissionStatus::ValidationFailed => "validation_failed",
            SubmissionStatus::Validated => "validated",
            SubmissionStatus::SubmissionFailed => "submission_failed",
            SubmissionStatus::Submitted => "submitted",
            SubmissionStatus::Accepted => "accepted",
        }
    }

    pub fn can_advance_to(self, next: SubmissionStatus) -> bool {
        use SubmissionStatus::*;
        matches!(
            (self, next),
            (Draft, Validating)
                | (Draft, Validated)
                | (Draft, SubmissionFailed)
                | (Draft, Submitted)
                | (Validating, ValidationFailed)
                | (Validating, Validated)
                | (Validated, SubmissionFailed)
                | (Validated, Submitted)
                | (Submitted, Accepted)
        )
    }
}

/// Descriptor of one collected evidence file attached to a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceFileRef {
    pub filename: String,
    pub relative_path: String,
    #[serde(default)]
    pub title: String,
    /// Originating tool label; empty means manually collected.
    #[serde(default)]
    pub source: String,
    pub size_bytes: u64,
    #[serde(default)]
    pub checksum_sha256: String,
    #[serde(default)]
    pub controls_satisfied: Vec<String>,
}

/// Snapshot of the validation verdict carried on the submission record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSnapshot {
    pub status: ValidationStatus,
    pub completeness_score: f64,
    pub errors: usize,
    pub warnings: usize,
}

/// One attempt to deliver evidence for a (task, window) pair.
///
/// Once `submitted`, the attached file set is immutable; a retry creates a
/// fresh record for the window rather than mutating this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSubmission {
    pub task_id: u64,
    pub task_ref: String,
    pub window: String,
    pub status: SubmissionStatus,
    #[serde(default)]
    pub submission_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub validated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub accepted_at: Option<DateTime<Utc>>,
    pub evidence_files: Vec<EvidenceFileRef>,
    pub total_file_count: usize,
    pub total_size_bytes: u64,
    pub submitted_by: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub validation: Option<ValidationSnapshot>,
    #[serde(default)]
    pub platform_response: Option<PlatformReceipt>,
}

impl EvidenceSubmission {
    fn start(task: &EvidenceTask, request: &SubmitRequest, files: Vec<EvidenceFileRef>) -> Self {
        let total_size_bytes = files.iter().map(|file| file.size_bytes).sum();
        Self {
            task_id: task.id,
            task_ref: request.task_ref.clone(),
            window: request.window.clone(),
            status: SubmissionStatus::Draft,
            submission_id: None,
            created_at: Utc::now(),
            validated_at: None,
            submitted_at: None,
            accepted_at: None,
            total_file_count: files.len(),
            total_size_bytes,
            evidence_files: files,
            submitted_by: request.submitted_by.clone(),
            notes: request.notes.clone(),
            validation: None,
            platform_response: None,
        }
    }

    fn record_validation(&mut self, report: &ValidationReport) {
        self.validation = Some(ValidationSnapshot {
            status: report.status,
            completeness_score: report.completeness_score,
            errors: report.errors.len(),
            warnings: report.warnings.len(),
        });
        self.validated_at = Some(Utc::now());
    }

    fn advance(&mut self, next: SubmissionStatus) {
        debug_assert!(
            self.status.can_advance_to(next),
            "illegal submission transition {:?} -> {:?}",
            self.status,
            next
        );
        self.status = next;
    }
}

/// An immutable audit record of one submission attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionHistoryEntry {
    pub submission_id: String,
    pub submitted_at: DateTime<Utc>,
    pub submitted_by: String,
    pub status: SubmissionStatus,
    pub file_count: usize,
    #[serde(default)]
    pub notes: String,
}

/// Caller's request to submit evidence for a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub task_ref: String,
    pub window: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub skip_validation: bool,
    pub submitted_by: String,
}

/// Structured outcome distinguishing "not ready" from "kept local" from
/// "delivered", so retries can be driven without re-validating blindly.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Validation reported the evidence incomplete; nothing was persisted
    /// and the platform was not contacted.
    NotReady(ValidationReport),
    /// No platform client configured; the submission was stored locally
    /// with a synthesized id.
    Draft(EvidenceSubmission),
    /// The platform acknowledged the submission.
    Submitted(EvidenceSubmission),
}

/// Error raised by the submission workflow.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Validator(#[from] ValidationError),
    #[error("evidence task {0} not found")]
    TaskNotFound(String),
    #[error("no submission recorded for {task_ref} {window}")]
    SubmissionNotFound { task_ref: String, window: String },
    #[error("no submission history for {task_ref} {window}")]
    HistoryNotFound { task_ref: String, window: String },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("platform submission failed: {0}")]
    Platform(#[source] PlatformError),
}

/// Orchestrates validate → package → transmit → persist for evidence
/// submissions. Without a platform gateway the workflow runs in local-only
/// mode and keeps submissions addressable as drafts.
///
/// Operations run to completion synchronously; a given (task, window) pair
/// must not be driven from multiple threads concurrently.
pub struct SubmissionWorkflow<S, P, V> {
    store: Arc<S>,
    platform: Option<Arc<P>>,
    validator: Arc<V>,
    org_id: String,
}

impl<S, P, V> SubmissionWorkflow<S, P, V>
where
    S: EvidenceStore + 'static,
    P: PlatformGateway + 'static,
    V: EvidenceValidator + 'static,
{
    pub fn new(
        store: Arc<S>,
        platform: Option<Arc<P>>,
        validator: Arc<V>,
        org_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            platform,
            validator,
            org_id: org_id.into(),
        }
    }

    /// Submit evidence for a window.
    ///
    /// Validation failure halts before any persistence or platform call.
    /// A platform failure persists the attempt as `submission_failed` with
    /// the error captured, then surfaces it; local state is never lost.
    pub fn submit(&self, request: SubmitRequest) -> Result<SubmitOutcome, SubmissionError> {
        let report = if request.skip_validation {
            None
        } else {
            let report = self.validator.validate(&request.task_ref, &request.window)?;
            if !report.ready_for_submission {
                tracing::info!(
                    task_ref = %request.task_ref,
                    window = %request.window,
                    failed_checks = report.failed_checks,
                    "evidence not ready for submission"
                );
                return Ok(SubmitOutcome::NotReady(report));
            }
            Some(report)
        };

        let task = self
            .store
            .evidence_task(&request.task_ref)?
            .ok_or_else(|| SubmissionError::TaskNotFound(request.task_ref.clone()))?;
        let files = self
            .store
            .evidence_files(&request.task_ref, &request.window)?;

        let mut submission = EvidenceSubmission::start(&task, &request, files);
        if let Some(report) = &report {
            submission.record_validation(report);
        }

        match self.platform.as_deref() {
            Some(platform) => {
                if submission.validation.is_some() {
                    submission.advance(SubmissionStatus::Validated);
                }
                let payload = build_payload(&task, &request, &submission);
                match platform.submit_evidence(&self.org_id, task.id, &payload) {
                    Ok(receipt) => {
                        submission.advance(SubmissionStatus::Submitted);
                        submission.submission_id = Some(receipt.submission_id.clone());
                        submission.submitted_at = Some(Utc::now());
                        submission.platform_response = Some(receipt);
                    }
                    Err(err) => {
                        submission.advance(SubmissionStatus::SubmissionFailed);
                        submission.platform_response = Some(failure_receipt(&err));
                        self.store.save_submission(&submission)?;
                        tracing::warn!(
                            task_ref = %request.task_ref,
                            window = %request.window,
                            error = %err,
                            "platform rejected evidence; failed attempt retained locally"
                        );
                        return Err(SubmissionError::Platform(err));
                    }
                }
            }
            None => {
                submission.submission_id = Some(format!("local-{}", Utc::now().timestamp()));
                tracing::info!(
                    task_ref = %request.task_ref,
                    window = %request.window,
                    "no platform client configured; submission kept as local draft"
                );
            }
        }

        self.store.save_submission(&submission)?;
        self.record_history(&request, &submission);

        if submission.status == SubmissionStatus::Draft {
            Ok(SubmitOutcome::Draft(submission))
        } else {
            Ok(SubmitOutcome::Submitted(submission))
        }
    }

    /// Last-known submission for a window, reconciled against the platform
    /// when a remote id exists. A polling failure is logged and swallowed;
    /// the caller always gets the best locally known answer.
    pub fn submission_status(
        &self,
        task_ref: &str,
        window: &str,
    ) -> Result<EvidenceSubmission, SubmissionError> {
        let mut submission = self.store.load_submission(task_ref, window)?.ok_or_else(|| {
            SubmissionError::SubmissionNotFound {
                task_ref: task_ref.to_string(),
                window: window.to_string(),
            }
        })?;

        if submission.status == SubmissionStatus::Submitted {
            if let (Some(platform), Some(remote_id)) =
                (self.platform.as_deref(), submission.submission_id.clone())
            {
                match platform.submission_status(&self.org_id, submission.task_id, &remote_id) {
                    Ok(remote) => {
                        if remote.status == "accepted" {
                            submission.advance(SubmissionStatus::Accepted);
                            submission.accepted_at = remote.reviewed_at.or_else(|| Some(Utc::now()));
                            self.store.save_submission(&submission)?;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(
                            task_ref,
                            window,
                            error = %err,
                            "platform status poll failed; returning last known state"
                        );
                    }
                }
            }
        }

        Ok(submission)
    }

    /// The ordered audit log for a window.
    pub fn submission_history(
        &self,
        task_ref: &str,
        window: &str,
    ) -> Result<Vec<SubmissionHistoryEntry>, SubmissionError> {
        let entries = self.store.load_history(task_ref, window)?;
        if entries.is_empty() {
            return Err(SubmissionError::HistoryNotFound {
                task_ref: task_ref.to_string(),
                window: window.to_string(),
            });
        }
        Ok(entries)
    }

    // History is best-effort relative to the authoritative submission
    // record; an append failure must not roll the submission back.
    fn record_history(&self, request: &SubmitRequest, submission: &EvidenceSubmission) {
        let entry = SubmissionHistoryEntry {
            submission_id: submission.submission_id.clone().unwrap_or_default(),
            submitted_at: submission.submitted_at.unwrap_or(submission.created_at),
            submitted_by: request.submitted_by.clone(),
            status: submission.status,
            file_count: submission.total_file_count,
            notes: request.notes.clone(),
        };

        if let Err(err) = self
            .store
            .append_history(&request.task_ref, &request.window, entry)
        {
            tracing::warn!(
                task_ref = %request.task_ref,
                window = %request.window,
                error = %err,
                "failed to append submission history"
            );
        }
    }
}

fn failure_receipt(err: &PlatformError) -> PlatformReceipt {
    PlatformReceipt {
        submission_id: String::new(),
        status: "failed".to_string(),
        message: err.to_string(),
        received_at: Utc::now(),
        metadata: Default::default(),
    }
}

fn build_payload(
    task: &EvidenceTask,
    request: &SubmitRequest,
    submission: &EvidenceSubmission,
) -> EvidencePayload {
    EvidencePayload {
        task_id: task.id,
        content: build_evidence_content(submission),
        content_type: "markdown".to_string(),
        collection_window: request.window.clone(),
        collection_date: Utc::now().to_rfc3339(),
        sources: build_evidence_sources(&submission.evidence_files),
        notes: request.notes.clone(),
        controls_covered: controls_covered(&submission.evidence_files),
    }
}

/// Markdown summary transmitted as the submission body.
fn build_evidence_content(submission: &EvidenceSubmission) -> String {
    let mut content = String::new();
    let _ = writeln!(content, "# Evidence Submission: {}", submission.task_ref);
    let _ = writeln!(content);
    let _ = writeln!(content, "**Collection Window:** {}", submission.window);
    let _ = writeln!(
        content,
        "**Evidence Files:** {} ({} bytes)",
        submission.total_file_count, submission.total_size_bytes
    );

    if !submission.evidence_files.is_empty() {
        let _ = writeln!(content);
        let _ = writeln!(content, "## Files");
        let _ = writeln!(content);
        for file in &submission.evidence_files {
            let title = if file.title.is_empty() {
                file.filename.as_str()
            } else {
                file.title.as_str()
            };
            let _ = writeln!(
                content,
                "- `{}` ({} bytes): {}",
                file.filename, file.size_bytes, title
            );
        }
    }

    if !submission.notes.is_empty() {
        let _ = writeln!(content);
        let _ = writeln!(content, "## Notes");
        let _ = writeln!(content);
        let _ = writeln!(content, "{}", submission.notes);
    }

    content
}

fn build_evidence_sources(files: &[EvidenceFileRef]) -> Vec<EvidenceSourceRef> {
    let mut tools = BTreeSet::new();
    for file in files {
        let tool = if file.source.is_empty() {
            "manual"
        } else {
            file.source.as_str()
        };
        tools.insert(tool.to_string());
    }

    let timestamp = Utc::now().to_rfc3339();
    tools
        .into_iter()
        .map(|tool| EvidenceSourceRef {
            source_type: "file".to_string(),
            tool,
            timestamp: timestamp.clone(),
        })
        .collect()
}

/// Control IDs satisfied across all files, deduplicated and sorted.
fn controls_covered(files: &[EvidenceFileRef]) -> Vec<String> {
    let mut controls = BTreeSet::new();
    for file in files {
        for control in &file.controls_satisfied {
            controls.insert(control.clone());
        }
    }
    controls.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, size: u64, source: &str, controls: &[&str]) -> EvidenceFileRef {
        EvidenceFileRef {
            filename: name.to_string(),
            relative_path: format!("evidence/{name}"),
            title: String::new(),
            source: source.to_string(),
            size_bytes: size,
            checksum_sha256: String::new(),
            controls_satisfied: controls.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn status_machine_only_advances_forward() {
        use SubmissionStatus::*;

        assert!(Draft.can_advance_to(Validated));
        assert!(Draft.can_advance_to(Submitted));
        assert!(Validating.can_advance_to(ValidationFailed));
        assert!(Validated.can_advance_to(SubmissionFailed));
        assert!(Submitted.can_advance_to(Accepted));

        assert!(!Submitted.can_advance_to(Draft));
        assert!(!Accepted.can_advance_to(Submitted));
        assert!(!ValidationFailed.can_advance_to(Validated));
        assert!(!SubmissionFailed.can_advance_to(Submitted));
    }

    #[test]
    fn status_labels_are_wire_stable() {
        assert_eq!(SubmissionStatus::SubmissionFailed.label(), "submission_failed");
        let json = serde_json::to_string(&SubmissionStatus::Submitted).expect("serialize");
        assert_eq!(json, "\"submitted\"");
    }

    #[test]
    fn content_summarizes_files_and_notes() {
        let submission = EvidenceSubmission {
            task_id: 8,
            task_ref: "ET-0008".to_string(),
            window: "2025-Q4".to_string(),
            status: SubmissionStatus::Draft,
            submission_id: None,
            created_at: Utc::now(),
            validated_at: None,
            submitted_at: None,
            accepted_at: None,
            evidence_files: vec![
                file("access_review.csv", 1024, "okta", &["AC-2"]),
                file("policy.pdf", 3072, "", &[]),
            ],
            total_file_count: 2,
            total_size_bytes: 4096,
            submitted_by: "auditor".to_string(),
            notes: "Q4 export attached.".to_string(),
            validation: None,
            platform_response: None,
        };

        let content = build_evidence_content(&submission);
        assert!(content.starts_with("# Evidence Submission: ET-0008"));
        assert!(content.contains("**Collection Window:** 2025-Q4"));
        assert!(content.contains("**Evidence Files:** 2 (4096 bytes)"));
        assert!(content.contains("- `access_review.csv` (1024 bytes)"));
        assert!(content.contains("## Notes"));
        assert!(content.contains("Q4 export attached."));
    }

    #[test]
    fn controls_are_deduplicated_across_files() {
        let files = vec![
            file("a.csv", 1, "okta", &["AC-2", "AC-6"]),
            file("b.csv", 1, "okta", &["AC-2", "CM-3"]),
        ];
        assert_eq!(controls_covered(&files), vec!["AC-2", "AC-6", "CM-3"]);
    }

    #[test]
    fn sources_collapse_to_distinct_tools() {
        let files = vec![
            file("a.csv", 1, "okta", &[]),
            file("b.csv", 1, "okta", &[]),
            file("c.pdf", 1, "", &[]),
        ];
        let sources = build_evidence_sources(&files);
        let tools: Vec<&str> = sources.iter().map(|s| s.tool.as_str()).collect();
        assert_eq!(tools, vec!["manual", "okta"]);
        assert!(sources.iter().all(|s| s.source_type == "file"));
    }
}
