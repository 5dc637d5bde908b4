pub mod adapter;
pub mod domain;
pub mod platform;
pub mod registry;
pub mod storage;
pub mod submission;
pub mod validator;

pub use registry::ReferenceRegistry;
pub use submission::{SubmissionWorkflow, SubmitOutcome, SubmitRequest};
