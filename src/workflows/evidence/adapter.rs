//! Conversions from platform wire models into the domain model.
//!
//! Every conversion is pure and total: unknown or absent nested objects map
//! to the domain zero value, never an error, while anything present in the
//! payload lands somewhere on the domain record. In particular the nested
//! `master_content` guidance text and the tag/assignee associations survive
//! both wire encodings the platform uses.

use chrono::{DateTime, Duration, Months, Utc};
use serde_json::Value;

use super::domain::{Control, EvidenceTask, Person, Policy, Tag};
use super::platform::{ApiControl, ApiEvidenceTask, ApiPolicy};

pub fn task_from_api(api: &ApiEvidenceTask) -> EvidenceTask {
    let last_collected = parse_timestamp(api.last_collected.as_deref());
    let next_due = parse_timestamp(api.next_due.as_deref())
        .or_else(|| compute_next_due(last_collected, &api.collection_interval));

    let status = if !api.status.is_empty() {
        api.status.clone()
    } else if api.completed {
        "completed".to_string()
    } else {
        "pending".to_string()
    };

    let priority = if api.priority.is_empty() {
        derive_priority(&api.collection_interval)
    } else {
        api.priority.clone()
    };

    let (guidance, help, nested_description) = match api.master_content.as_ref() {
        Some(content) => (
            content.guidance.clone(),
            content.help.clone(),
            content.description.clone(),
        ),
        None => (String::new(), String::new(), String::new()),
    };
    let description = if api.description.is_empty() {
        nested_description
    } else {
        api.description.clone()
    };

    EvidenceTask {
        id: api.id,
        reference: String::new(),
        name: api.name.clone(),
        description,
        guidance,
        help,
        collection_interval: api.collection_interval.clone(),
        priority,
        framework: api.framework.clone(),
        status,
        completed: api.completed,
        controls: id_list(api.controls.as_ref()),
        tags: tags_from_value(api.tags.as_ref()),
        assignees: assignees_from_value(api.assignees.as_ref()),
        last_collected,
        next_due,
        created_at: parse_timestamp(api.created_at.as_deref()),
        updated_at: parse_timestamp(api.updated_at.as_deref()),
    }
}

pub fn control_from_api(api: &ApiControl) -> Control {
    let (guidance, help) = match api.master_content.as_ref() {
        Some(content) => {
            let help = if content.help.is_empty() {
                api.help.clone()
            } else {
                content.help.clone()
            };
            (content.guidance.clone(), help)
        }
        None => (String::new(), api.help.clone()),
    };

    Control {
        id: api.id,
        name: api.name.clone(),
        description: api.body.clone(),
        category: api.category.clone(),
        framework: api.framework.clone(),
        status: api.status.clone(),
        help,
        guidance,
        tags: tags_from_value(api.tags.as_ref()),
        assignees: assignees_from_value(api.assignees.as_ref()),
    }
}

pub fn policy_from_api(api: &ApiPolicy) -> Policy {
    let description = if api.description.is_empty() {
        api.summary.clone()
    } else {
        api.description.clone()
    };

    let content = if api.details.is_empty() {
        api.current_version
            .as_ref()
            .map(|version| version.content.clone())
            .unwrap_or_default()
    } else {
        api.details.clone()
    };

    Policy {
        id: scalar_to_string(&api.id),
        name: api.name.clone(),
        description,
        summary: api.summary.clone(),
        content,
        framework: api.framework.clone(),
        status: api.status.clone(),
        tags: tags_from_value(api.tags.as_ref()),
        assignees: assignees_from_value(api.assignees.as_ref()),
        created_at: parse_timestamp(api.created_at.as_deref()),
        updated_at: parse_timestamp(api.updated_at.as_deref()),
    }
}

/// Tags arrive either as bare name strings or as embedded objects.
fn tags_from_value(value: Option<&Value>) -> Vec<Tag> {
    array_items(value)
        .filter_map(|item| match item {
            Value::String(name) => Some(Tag {
                id: String::new(),
                name: name.clone(),
                color: String::new(),
            }),
            Value::Object(fields) => Some(Tag {
                id: scalar_field(fields, "id"),
                name: scalar_field(fields, "name"),
                color: scalar_field(fields, "color"),
            }),
            _ => None,
        })
        .collect()
}

/// Assignees arrive either as bare name strings or as embedded objects.
fn assignees_from_value(value: Option<&Value>) -> Vec<Person> {
    array_items(value)
        .filter_map(|item| match item {
            Value::String(name) => Some(Person {
                id: String::new(),
                name: name.clone(),
                email: String::new(),
                role: String::new(),
            }),
            Value::Object(fields) => Some(Person {
                id: scalar_field(fields, "id"),
                name: scalar_field(fields, "name"),
                email: scalar_field(fields, "email"),
                role: scalar_field(fields, "role"),
            }),
            _ => None,
        })
        .collect()
}

/// Associated control references: strings, numbers, or embedded objects.
fn id_list(value: Option<&Value>) -> Vec<String> {
    array_items(value)
        .filter_map(|item| match item {
            Value::String(id) => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            Value::Object(fields) => {
                let id = scalar_field(fields, "id");
                (!id.is_empty()).then_some(id)
            }
            _ => None,
        })
        .collect()
}

fn array_items<'a>(value: Option<&'a Value>) -> impl Iterator<Item = &'a Value> + 'a {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter())
        .unwrap_or_default()
}

fn scalar_field(fields: &serde_json::Map<String, Value>, key: &str) -> String {
    fields.get(key).map(scalar_to_string).unwrap_or_default()
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(num) => num.to_string(),
        _ => String::new(),
    }
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

fn derive_priority(interval: &str) -> String {
    match interval {
        "year" => "low",
        "month" | "week" => "high",
        _ => "medium",
    }
    .to_string()
}

fn compute_next_due(
    last_collected: Option<DateTime<Utc>>,
    interval: &str,
) -> Option<DateTime<Utc>> {
    let last = last_collected?;
    match interval {
        "year" => last.checked_add_months(Months::new(12)),
        "quarter" => last.checked_add_months(Months::new(3)),
        "month" => last.checked_add_months(Months::new(1)),
        "week" => last.checked_add_signed(Duration::days(7)),
        "day" => last.checked_add_signed(Duration::days(1)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn priority_follows_collection_cadence() {
        assert_eq!(derive_priority("year"), "low");
        assert_eq!(derive_priority("quarter"), "medium");
        assert_eq!(derive_priority("month"), "high");
        assert_eq!(derive_priority("week"), "high");
        assert_eq!(derive_priority("fortnight"), "medium");
    }

    #[test]
    fn timestamps_parse_leniently() {
        assert!(parse_timestamp(Some("2025-10-01T09:30:00Z")).is_some());
        assert!(parse_timestamp(Some("2025-10-01T09:30:00+02:00")).is_some());
        assert_eq!(parse_timestamp(Some("next tuesday")), None);
        assert_eq!(parse_timestamp(Some("   ")), None);
        assert_eq!(parse_timestamp(None), None);
    }

    #[test]
    fn next_due_derives_from_cadence() {
        let last = Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).single();
        let due = compute_next_due(last, "quarter").expect("due date");
        assert_eq!(due, Utc.with_ymd_and_hms(2025, 4, 15, 0, 0, 0).unwrap());

        let weekly = compute_next_due(last, "week").expect("due date");
        assert_eq!(weekly, Utc.with_ymd_and_hms(2025, 1, 22, 0, 0, 0).unwrap());

        assert_eq!(compute_next_due(None, "quarter"), None);
        assert_eq!(compute_next_due(last, "whenever"), None);
    }

    #[test]
    fn scalar_ids_stringify() {
        assert_eq!(scalar_to_string(&serde_json::json!("pol-9")), "pol-9");
        assert_eq!(scalar_to_string(&serde_json::json!(42)), "42");
        assert_eq!(scalar_to_string(&serde_json::json!({"nested": true})), "");
    }
}
