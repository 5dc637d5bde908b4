use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One unit of required compliance evidence, synchronized from the external
/// GRC platform.
///
/// `id` is assigned by the platform and immutable. `reference` is the stable
/// local identifier ("ET-0001") and stays empty until the registry assigns
/// one; once assigned it never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceTask {
    pub id: u64,
    #[serde(default)]
    pub reference: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub guidance: String,
    #[serde(default)]
    pub help: String,
    /// Cadence label for the collection window: `year`, `quarter`, `month`,
    /// `week`, or `day`.
    #[serde(default)]
    pub collection_interval: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub framework: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub controls: Vec<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub assignees: Vec<Person>,
    #[serde(default)]
    pub last_collected: Option<DateTime<Utc>>,
    #[serde(default)]
    pub next_due: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A compliance control satisfied by one or more evidence tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Control {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub framework: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub help: String,
    #[serde(default)]
    pub guidance: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub assignees: Vec<Person>,
}

/// A governance policy document tracked alongside controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub framework: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub assignees: Vec<Person>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Label attached to tasks, controls, and policies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: String,
}

/// A person responsible for collecting or reviewing evidence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
}
