//! Contract tests for the platform-to-domain conversions, driven from
//! JSON fixtures shaped like recorded platform payloads. The assertions
//! check presence, not absence: nested guidance must survive, and
//! tag/assignee counts must match the payload exactly in both wire
//! encodings the platform uses.

use grc_evidence::workflows::evidence::adapter::{
    control_from_api, policy_from_api, task_from_api,
};
use grc_evidence::workflows::evidence::platform::{ApiControl, ApiEvidenceTask, ApiPolicy};
use serde_json::json;

fn task_fixture() -> ApiEvidenceTask {
    serde_json::from_value(json!({
        "id": 8,
        "name": "Quarterly access review",
        "description": "Export and review access grants",
        "collection_interval": "quarter",
        "completed": false,
        "framework": "SOC 2",
        "last_collected": "2025-07-01T00:00:00Z",
        "controls": [{"id": "AC-2"}, {"id": "AC-6"}],
        "tags": [
            {"id": "17", "name": "access", "color": "#ff8800"},
            {"id": "18", "name": "quarterly", "color": "#0088ff"}
        ],
        "assignees": [
            {"id": 301, "name": "Dana Reyes", "email": "dana@example.com", "role": "owner"}
        ],
        "master_content": {
            "guidance": "Pull the export from the IdP and attach approvals.",
            "help": "See the access review runbook."
        }
    }))
    .expect("task fixture deserializes")
}

#[test]
fn nested_guidance_survives_conversion() {
    let task = task_from_api(&task_fixture());
    assert_eq!(
        task.guidance,
        "Pull the export from the IdP and attach approvals."
    );
}

#[test]
fn whole_master_content_block_survives_conversion() {
    let api: ApiEvidenceTask = serde_json::from_value(json!({
        "id": 11,
        "name": "Full content block",
        "master_content": {
            "guidance": "Collect the export.",
            "help": "Escalate to the IdP admin if the export stalls.",
            "description": "Quarterly IdP account inventory."
        }
    }))
    .expect("fixture deserializes");

    let task = task_from_api(&api);
    assert_eq!(task.help, "Escalate to the IdP admin if the export stalls.");
    assert_eq!(task.description, "Quarterly IdP account inventory.");

    let serialized = serde_json::to_string(&task).expect("serialize");
    assert!(serialized.contains("Escalate to the IdP admin if the export stalls."));

    // An explicit top-level description still wins over the nested one.
    let mut explicit = api;
    explicit.description = "Top-level description".to_string();
    let converted = task_from_api(&explicit);
    assert_eq!(converted.description, "Top-level description");
    assert_eq!(converted.help, "Escalate to the IdP admin if the export stalls.");
}

#[test]
fn absent_master_content_maps_to_empty_guidance() {
    let api: ApiEvidenceTask =
        serde_json::from_value(json!({ "id": 9, "name": "Minimal task" }))
            .expect("minimal fixture deserializes");
    let task = task_from_api(&api);
    assert_eq!(task.guidance, "");
    assert_eq!(task.help, "");
    assert!(task.tags.is_empty());
    assert!(task.assignees.is_empty());
    assert!(task.controls.is_empty());
}

#[test]
fn object_encoded_associations_keep_exact_counts() {
    let task = task_from_api(&task_fixture());

    assert_eq!(task.tags.len(), 2);
    assert_eq!(task.tags[0].name, "access");
    assert_eq!(task.tags[0].id, "17");
    assert_eq!(task.tags[0].color, "#ff8800");

    assert_eq!(task.assignees.len(), 1);
    assert_eq!(task.assignees[0].name, "Dana Reyes");
    assert_eq!(task.assignees[0].id, "301");
    assert_eq!(task.assignees[0].email, "dana@example.com");

    assert_eq!(task.controls, vec!["AC-2", "AC-6"]);
}

#[test]
fn string_encoded_associations_convert_too() {
    let api: ApiEvidenceTask = serde_json::from_value(json!({
        "id": 10,
        "name": "String associations",
        "tags": ["access", "quarterly"],
        "assignees": ["Dana Reyes"],
        "controls": ["AC-2", 99]
    }))
    .expect("fixture deserializes");

    let task = task_from_api(&api);
    assert_eq!(task.tags.len(), 2);
    assert_eq!(task.tags[1].name, "quarterly");
    assert_eq!(task.assignees.len(), 1);
    assert_eq!(task.assignees[0].name, "Dana Reyes");
    assert_eq!(task.controls, vec!["AC-2", "99"]);
}

#[test]
fn derived_fields_fill_gaps_in_the_payload() {
    let task = task_from_api(&task_fixture());

    // Status from the completed flag, priority from cadence, next_due from
    // last_collected + cadence.
    assert_eq!(task.status, "pending");
    assert_eq!(task.priority, "medium");
    let next_due = task.next_due.expect("derived due date");
    assert_eq!(next_due.to_rfc3339(), "2025-10-01T00:00:00+00:00");

    let mut completed = task_fixture();
    completed.completed = true;
    assert_eq!(task_from_api(&completed).status, "completed");

    let mut explicit = task_fixture();
    explicit.status = "in_review".to_string();
    explicit.priority = "critical".to_string();
    let converted = task_from_api(&explicit);
    assert_eq!(converted.status, "in_review");
    assert_eq!(converted.priority, "critical");
}

#[test]
fn conversion_is_deterministic() {
    let fixture = task_fixture();
    assert_eq!(task_from_api(&fixture), task_from_api(&fixture));
}

#[test]
fn control_help_prefers_master_content_with_fallback() {
    let nested: ApiControl = serde_json::from_value(json!({
        "id": 2,
        "name": "Access provisioning",
        "body": "Provisioning requires approval.",
        "help": "top-level help",
        "master_content": { "guidance": "Review joiner tickets.", "help": "nested help" }
    }))
    .expect("fixture deserializes");

    let control = control_from_api(&nested);
    assert_eq!(control.description, "Provisioning requires approval.");
    assert_eq!(control.guidance, "Review joiner tickets.");
    assert_eq!(control.help, "nested help");

    let flat: ApiControl = serde_json::from_value(json!({
        "id": 3,
        "name": "Change management",
        "help": "top-level help"
    }))
    .expect("fixture deserializes");
    assert_eq!(control_from_api(&flat).help, "top-level help");
}

#[test]
fn policy_content_falls_back_to_current_version() {
    let api: ApiPolicy = serde_json::from_value(json!({
        "id": 7,
        "name": "Data retention policy",
        "summary": "Retention windows per data class",
        "current_version": { "version": 3, "content": "Retain audit logs for 365 days." },
        "tags": ["policy"],
        "assignees": [{"id": "u-1", "name": "Sam Ortiz"}]
    }))
    .expect("fixture deserializes");

    let policy = policy_from_api(&api);
    assert_eq!(policy.id, "7");
    assert_eq!(policy.description, "Retention windows per data class");
    assert_eq!(policy.content, "Retain audit logs for 365 days.");
    assert_eq!(policy.tags.len(), 1);
    assert_eq!(policy.assignees.len(), 1);
}
