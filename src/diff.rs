//! Change detection against the persisted baseline

use crate::baseline::Baseline;
use crate::record::{Fingerprint, Record};
use std::collections::HashSet;

/// Result of comparing a harvest with the baseline
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSet {
    /// Records whose fingerprint was not seen before, in harvest order
    pub new_records: Vec<Record>,

    /// The harvest itself, replacing the old baseline wholesale
    pub baseline: Baseline,
}

/// Find the records of `harvest` that are new relative to `baseline`.
///
/// Each fingerprint is reported at most once, even when the harvest repeats it.
/// Removed records produce no event; they simply drop out of the next baseline.
pub fn diff(baseline: &Baseline, harvest: Vec<Record>) -> ChangeSet {
    let mut seen: HashSet<Fingerprint> = baseline.records.iter().map(Record::fingerprint).collect();

    let new_records = harvest
        .iter()
        .filter(|record| seen.insert(record.fingerprint()))
        .cloned()
        .collect();

    ChangeSet { new_records, baseline: Baseline::from_records(harvest) }
}
