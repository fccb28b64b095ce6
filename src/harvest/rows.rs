//! Positional mapping of listing table cells onto records
//!
//! The dashboard table has no usable headers or ids, so fields are read by
//! column position. The positions are a contract with the portal's current
//! layout: stable in practice, but a reordered table breaks them silently.

use crate::record::{Record, ValueRange, non_empty};

/// Rows of the listing table
pub const ROW_SELECTOR: &str = "table tbody tr";

/// Cells within a row
pub const CELL_SELECTOR: &str = "td";

/// Column positions of the listing table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub name: usize,

    /// Cell holding the control that opens the detail view
    pub detail: usize,

    pub registration_open: usize,
    pub registration_close: usize,
    pub package_max: usize,
    pub package_min: usize,
    pub placement_type: usize,
    pub academic_year: usize,

    /// Rows with fewer cells are not data rows
    pub min_cells: usize,
}

/// Layout of the portal's company dashboard
pub const DASHBOARD_COLUMNS: ColumnLayout = ColumnLayout {
    name: 0,
    detail: 1,
    registration_open: 4,
    registration_close: 5,
    package_max: 6,
    package_min: 7,
    placement_type: 8,
    academic_year: 9,
    min_cells: 10,
};

impl ColumnLayout {
    /// Map the cell texts of one row onto a basic record.
    ///
    /// Returns `None` for short rows and rows without a name (loading
    /// placeholders, spacer rows).
    pub fn record_from(&self, cells: &[String]) -> Option<Record> {
        if cells.len() < self.min_cells {
            return None;
        }

        let cell = |index: usize| cells[index].trim().to_string();
        let name = non_empty(&cells[self.name])?;

        let mut record = Record::new(name, cell(self.registration_open));
        record.registration_close = cell(self.registration_close);
        record.package = ValueRange::from_text(&cells[self.package_min], &cells[self.package_max]);
        record.placement_type = cell(self.placement_type);
        record.academic_year = cell(self.academic_year);
        Some(record)
    }
}
