use serde::{Deserialize, Serialize};
use std::fmt;

/// A min/max pair as shown by the portal. Values are free text, not numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<String>,
}

impl ValueRange {
    /// Build a range from raw cell text; blank values become `None`
    pub fn from_text(min: &str, max: &str) -> Self {
        Self { min: non_empty(min), max: non_empty(max) }
    }

    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// One listing published on the portal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredRecord")]
pub struct Record {
    /// Listing name; together with `registration_open` it identifies the record
    pub name: String,

    pub registration_open: String,
    pub registration_close: String,

    /// Package range (LPA)
    pub package: ValueRange,

    /// Filled in from the detail view when it can be read
    #[serde(default)]
    pub stipend: ValueRange,

    pub placement_type: String,
    pub academic_year: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Record {
    /// Create a record with the identity fields set and everything else blank
    pub fn new(name: impl Into<String>, registration_open: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registration_open: registration_open.into(),
            registration_close: String::new(),
            package: ValueRange::default(),
            stipend: ValueRange::default(),
            placement_type: String::new(),
            academic_year: String::new(),
            location: None,
        }
    }

    /// Deduplication key of this record
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.name, &self.registration_open)
    }
}

/// Record as found on disk: the current layout, or the flat, title-cased
/// keys written by the earlier notifier service (`"Company"`,
/// `"Registration Start"`, `"Max Package (LPA)"` and so on)
#[derive(Deserialize)]
struct StoredRecord {
    #[serde(alias = "Company")]
    name: String,

    #[serde(default, alias = "Registration Start")]
    registration_open: String,

    #[serde(default, alias = "Registration End")]
    registration_close: String,

    #[serde(default)]
    package: ValueRange,

    #[serde(default)]
    stipend: ValueRange,

    #[serde(default, rename = "Min Package (LPA)")]
    flat_package_min: Option<String>,

    #[serde(default, rename = "Max Package (LPA)")]
    flat_package_max: Option<String>,

    #[serde(default, rename = "Min Stipend")]
    flat_stipend_min: Option<String>,

    #[serde(default, rename = "Max Stipend")]
    flat_stipend_max: Option<String>,

    #[serde(default, alias = "Placement Type")]
    placement_type: String,

    #[serde(default, alias = "Academic Year")]
    academic_year: String,

    #[serde(default, alias = "Job Locations")]
    location: Option<String>,
}

impl From<StoredRecord> for Record {
    fn from(stored: StoredRecord) -> Self {
        let merge = |nested: ValueRange, min: Option<String>, max: Option<String>| ValueRange {
            min: nested.min.or_else(|| min.as_deref().and_then(non_empty)),
            max: nested.max.or_else(|| max.as_deref().and_then(non_empty)),
        };

        Record {
            name: stored.name,
            registration_open: stored.registration_open,
            registration_close: stored.registration_close,
            package: merge(stored.package, stored.flat_package_min, stored.flat_package_max),
            stipend: merge(stored.stipend, stored.flat_stipend_min, stored.flat_stipend_max),
            placement_type: stored.placement_type,
            academic_year: stored.academic_year,
            location: stored.location.as_deref().and_then(non_empty),
        }
    }
}

/// Digest of a record's identity: name and registration-open text only.
///
/// A record whose other fields change while `registration_open` stays the same
/// keeps its fingerprint and is not reported again.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(name: &str, registration_open: &str) -> Self {
        let key = format!("{}-{}", name, registration_open);
        Fingerprint(format!("{:x}", md5::compute(key.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trim `value`, mapping blank text to `None`
pub(crate) fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
