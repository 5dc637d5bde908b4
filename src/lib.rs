//! Evidence record lifecycle services for a compliance-evidence workflow:
//! stable local references for externally-numbered tasks, adaptation of
//! heterogeneous GRC platform payloads into the domain model, and the
//! submission workflow that carries evidence from draft to acceptance.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
