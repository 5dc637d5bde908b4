use super::domain::EvidenceTask;
use super::submission::{EvidenceFileRef, EvidenceSubmission, SubmissionHistoryEntry};

/// Error enumeration for storage failures. Any write error is fatal to the
/// operation in progress; durability is never silently degraded.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("stored record malformed: {0}")]
    Serialization(String),
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),
}

/// File-backed persistence for evidence artifacts, keyed by task reference
/// and collection window. Consumed so the workflow can be exercised in
/// isolation.
pub trait EvidenceStore: Send + Sync {
    fn save_submission(&self, submission: &EvidenceSubmission) -> Result<(), StoreError>;

    fn load_submission(
        &self,
        task_ref: &str,
        window: &str,
    ) -> Result<Option<EvidenceSubmission>, StoreError>;

    /// Appends to the ordered audit log for the window. Entries are never
    /// mutated or reordered once written.
    fn append_history(
        &self,
        task_ref: &str,
        window: &str,
        entry: SubmissionHistoryEntry,
    ) -> Result<(), StoreError>;

    fn load_history(
        &self,
        task_ref: &str,
        window: &str,
    ) -> Result<Vec<SubmissionHistoryEntry>, StoreError>;

    fn evidence_files(
        &self,
        task_ref: &str,
        window: &str,
    ) -> Result<Vec<EvidenceFileRef>, StoreError>;

    fn evidence_task(&self, task_ref: &str) -> Result<Option<EvidenceTask>, StoreError>;
}
