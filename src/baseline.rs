//! Persisted baseline: the full record set of the last successful harvest

use crate::error::{MonitorError, Result};
use crate::record::Record;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

/// Snapshot of the most recent successful harvest
///
/// Files written by the earlier notifier service load too: their records sit
/// under `companies` and the check time is a local timestamp without offset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    #[serde(default, alias = "companies")]
    pub records: Vec<Record>,

    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_check: Option<DateTime<Utc>>,
}

/// Accept RFC 3339 or a naive local timestamp; anything else reads as unknown
fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(text) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };

    if let Ok(at) = DateTime::parse_from_rfc3339(&text) {
        return Ok(Some(at.with_timezone(&Utc)));
    }

    let parsed = NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f").ok().map(|naive| {
        match Local.from_local_datetime(&naive).earliest() {
            Some(at) => at.with_timezone(&Utc),
            None => naive.and_utc(),
        }
    });
    if parsed.is_none() {
        log::warn!("Ignoring unreadable last check time '{}'", text);
    }
    Ok(parsed)
}

impl Baseline {
    pub fn from_records(records: Vec<Record>) -> Self {
        Self { records, last_check: None }
    }

    /// Builder method: set the time of the check that produced this snapshot
    pub fn checked_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_check = Some(at);
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Storage for the baseline between cycles
pub trait BaselineStore {
    /// Load the last saved baseline. Missing or unreadable state loads as empty.
    fn load(&self) -> Baseline;

    /// Replace the stored baseline as a whole
    fn save(&self, baseline: &Baseline) -> Result<()>;
}

/// Baseline kept as pretty-printed JSON on disk
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl BaselineStore for JsonFileStore {
    fn load(&self) -> Baseline {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No baseline at {}, starting empty", self.path.display());
                return Baseline::default();
            }
            Err(e) => {
                log::error!("Error loading baseline from {}: {}", self.path.display(), e);
                return Baseline::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(baseline) => baseline,
            Err(e) => {
                log::warn!("Baseline at {} is corrupt ({}), starting empty", self.path.display(), e);
                Baseline::default()
            }
        }
    }

    fn save(&self, baseline: &Baseline) -> Result<()> {
        let json = serde_json::to_string_pretty(baseline)
            .map_err(|e| MonitorError::Storage(format!("Failed to serialize baseline: {}", e)))?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|e| MonitorError::Storage(format!("Failed to create {}: {}", dir.display(), e)))?;
        }

        // Write beside the target and rename over it so readers never see a partial file
        let tmp_path = self.temp_path();
        std::fs::write(&tmp_path, json)
            .map_err(|e| MonitorError::Storage(format!("Failed to write {}: {}", tmp_path.display(), e)))?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp_path);
            MonitorError::Storage(format!("Failed to replace {}: {}", self.path.display(), e))
        })?;

        log::info!("Saved {} records to {}", baseline.len(), self.path.display());
        Ok(())
    }
}

/// In-memory store, for embedding and tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    baseline: RefCell<Baseline>,
    saves: Cell<usize>,
}

impl MemoryStore {
    pub fn new(baseline: Baseline) -> Self {
        Self { baseline: RefCell::new(baseline), saves: Cell::new(0) }
    }

    /// Number of successful `save` calls
    pub fn save_count(&self) -> usize {
        self.saves.get()
    }
}

impl BaselineStore for MemoryStore {
    fn load(&self) -> Baseline {
        self.baseline.borrow().clone()
    }

    fn save(&self, baseline: &Baseline) -> Result<()> {
        *self.baseline.borrow_mut() = baseline.clone();
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Baseline {
        let mut acme = Record::new("Acme", "2024-01-01");
        acme.location = Some("Pune".to_string());
        Baseline::from_records(vec![acme, Record::new("Globex", "2024-02-01")])
            .checked_at(Utc.with_ymd_and_hms(2024, 2, 3, 10, 30, 0).unwrap())
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("absent.json"));

        assert_eq!(store.load(), Baseline::default());
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("known.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert_eq!(JsonFileStore::new(&path).load(), Baseline::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state").join("known.json"));

        store.save(&sample()).unwrap();

        assert_eq!(store.load(), sample());
        assert!(!dir.path().join("state").join("known.json.tmp").exists());
    }

    #[test]
    fn test_save_replaces_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("known.json"));

        store.save(&sample()).unwrap();
        store.save(&Baseline::from_records(vec![Record::new("Initech", "2024-03-01")])).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.records[0].name, "Initech");
        assert_eq!(loaded.last_check, None);
    }

    #[test]
    fn test_memory_store_counts_saves() {
        let store = MemoryStore::new(sample());
        assert_eq!(store.load(), sample());

        store.save(&Baseline::default()).unwrap();
        assert_eq!(store.save_count(), 1);
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_loads_file_from_earlier_notifier() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("known_companies.json");
        std::fs::write(
            &path,
            r#"{
  "companies": [
    {
      "Company": "Acme",
      "Registration Start": "01-Jan-2024",
      "Registration End": "05-Jan-2024",
      "Max Package (LPA)": "12",
      "Min Package (LPA)": "6",
      "Placement Type": "Full Time",
      "Academic Year": "2024-25",
      "Max Stipend": "",
      "Min Stipend": "",
      "Job Locations": "Pune"
    }
  ],
  "last_check": "2024-02-03T10:30:00.123456"
}"#,
        )
        .unwrap();

        let loaded = JsonFileStore::new(&path).load();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.records[0].fingerprint(), Record::new("Acme", "01-Jan-2024").fingerprint());
        assert_eq!(loaded.records[0].location.as_deref(), Some("Pune"));
        assert!(loaded.last_check.is_some());
    }

    #[test]
    fn test_unreadable_check_time_keeps_records() {
        let json = r#"{"records": [{"name": "Acme", "registration_open": "2024-01-01"}], "last_check": "yesterday"}"#;

        let baseline: Baseline = serde_json::from_str(json).unwrap();

        assert_eq!(baseline.len(), 1);
        assert_eq!(baseline.last_check, None);
    }
}
