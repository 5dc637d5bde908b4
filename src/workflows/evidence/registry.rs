use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::domain::EvidenceTask;

/// One persisted row of the reference registry backing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub task_id: u64,
    pub reference: String,
    pub name: String,
    pub framework: String,
    pub status: String,
}

/// Error enumeration for registry persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("unable to read registry at {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("unable to write registry at {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("registry table malformed: {0}")]
    Table(#[from] csv::Error),
}

/// Assigns stable, human-readable references ("ET-0001") to externally
/// numbered evidence tasks and persists the mapping as a CSV table.
///
/// Allocation is idempotent per external ID and monotonic for the lifetime
/// of the backing file; references are never reassigned or reused. The
/// registry keeps plain in-memory maps without locking, so a single writer
/// at a time is a hard precondition for callers.
#[derive(Debug)]
pub struct ReferenceRegistry {
    path: PathBuf,
    entries: HashMap<u64, RegistryEntry>,
    references: HashMap<String, u64>,
    next_ref_num: u32,
}

impl ReferenceRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: HashMap::new(),
            references: HashMap::new(),
            next_ref_num: 1,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the backing table. A missing file yields an empty registry.
    /// Rows with the wrong column count or a non-numeric task id are
    /// skipped; the next reference number is rebuilt as max(existing) + 1.
    pub fn load(&mut self) -> Result<(), RegistryError> {
        if !self.path.exists() {
            return Ok(());
        }

        let file = fs::File::open(&self.path).map_err(|source| RegistryError::Read {
            path: self.path.clone(),
            source,
        })?;
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(file);

        self.entries.clear();
        self.references.clear();
        self.next_ref_num = 1;

        for record in reader.records() {
            let row = record?;

            // Any reference observed on disk retires its number, even when
            // the rest of the row is unusable; references are never reused.
            if let Some(num) = row.get(1).and_then(parse_reference_number) {
                if num >= self.next_ref_num {
                    self.next_ref_num = num + 1;
                }
            }

            if row.len() != 5 {
                tracing::debug!(columns = row.len(), "skipping malformed registry row");
                continue;
            }
            let task_id = match row[0].parse::<u64>() {
                Ok(id) => id,
                Err(_) => {
                    tracing::debug!(raw = &row[0], "skipping registry row with non-numeric id");
                    continue;
                }
            };

            let entry = RegistryEntry {
                task_id,
                reference: row[1].to_string(),
                name: row[2].to_string(),
                framework: row[3].to_string(),
                status: row[4].to_string(),
            };

            self.references.insert(entry.reference.clone(), task_id);
            self.entries.insert(task_id, entry);
        }

        Ok(())
    }

    /// Serializes all entries, sorted by reference number, back to the
    /// backing table. The parent directory is created if missing.
    pub fn save(&self) -> Result<(), RegistryError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| RegistryError::Write {
                    path: self.path.clone(),
                    source,
                })?;
            }
        }

        let file = fs::File::create(&self.path).map_err(|source| RegistryError::Write {
            path: self.path.clone(),
            source,
        })?;
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(["task_id", "reference", "name", "framework", "status"])?;

        for entry in self.entries_by_reference() {
            writer.write_record([
                entry.task_id.to_string().as_str(),
                entry.reference.as_str(),
                entry.name.as_str(),
                entry.framework.as_str(),
                entry.status.as_str(),
            ])?;
        }

        writer.flush().map_err(|source| RegistryError::Write {
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }

    /// Registers a task, returning its reference. An already-registered
    /// external ID keeps its existing reference; only the mutable entry
    /// fields (name, framework, status) are refreshed.
    pub fn register_task(&mut self, task: &EvidenceTask) -> String {
        if let Some(entry) = self.entries.get_mut(&task.id) {
            entry.name = task.name.clone();
            entry.framework = task.framework.clone();
            entry.status = task.status.clone();
            return entry.reference.clone();
        }

        let reference = format!("ET-{:04}", self.next_ref_num);
        self.next_ref_num += 1;

        let entry = RegistryEntry {
            task_id: task.id,
            reference: reference.clone(),
            name: task.name.clone(),
            framework: task.framework.clone(),
            status: task.status.clone(),
        };
        self.references.insert(reference.clone(), task.id);
        self.entries.insert(task.id, entry);

        reference
    }

    /// Bulk bootstrap. Input is sorted by external ID ascending first so
    /// reference numbers come out deterministic regardless of API ordering.
    pub fn initialize_from_tasks(&mut self, tasks: &[EvidenceTask]) {
        let mut ordered: Vec<&EvidenceTask> = tasks.iter().collect();
        ordered.sort_by_key(|task| task.id);
        for task in ordered {
            self.register_task(task);
        }
    }

    pub fn get_reference(&self, task_id: u64) -> Option<&str> {
        self.entries
            .get(&task_id)
            .map(|entry| entry.reference.as_str())
    }

    pub fn get_task_id(&self, reference: &str) -> Option<u64> {
        self.references.get(reference).copied()
    }

    pub fn entry(&self, task_id: u64) -> Option<&RegistryEntry> {
        self.entries.get(&task_id)
    }

    /// Refreshes the mutable fields of an existing entry. Unregistered
    /// tasks are ignored; registration stays explicit.
    pub fn update_task_info(&mut self, task: &EvidenceTask) {
        if let Some(entry) = self.entries.get_mut(&task.id) {
            entry.name = task.name.clone();
            entry.framework = task.framework.clone();
            entry.status = task.status.clone();
        }
    }

    /// Administrative removal. The reference number is retired, never
    /// reused for another task.
    pub fn remove_task(&mut self, task_id: u64) -> bool {
        match self.entries.remove(&task_id) {
            Some(entry) => {
                self.references.remove(&entry.reference);
                true
            }
            None => false,
        }
    }

    /// All entries ordered by reference number.
    pub fn entries(&self) -> Vec<&RegistryEntry> {
        self.entries_by_reference()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entries_by_reference(&self) -> Vec<&RegistryEntry> {
        let mut ordered: Vec<&RegistryEntry> = self.entries.values().collect();
        ordered.sort_by_key(|entry| parse_reference_number(&entry.reference).unwrap_or(u32::MAX));
        ordered
    }
}

/// Accepts both the current "ET-0123" format and the legacy "ET123" form.
/// The legacy form is read-compatible only; writes always hyphenate.
fn parse_reference_number(reference: &str) -> Option<u32> {
    let rest = reference.strip_prefix("ET")?;
    let digits = rest.strip_prefix('-').unwrap_or(rest);
    digits.parse::<u32>().ok()
}
