//! Listing table and detail harvester
//!
//! Three phases over one exclusively owned session:
//! - scroll until every lazily loaded row is rendered
//! - map each table row positionally onto a basic [`Record`]
//! - revisit each record's detail view, one at a time, for stipend and location
//!
//! Detail enrichment never drops a record: if it fails, the basic record is kept.

pub mod detail;
pub mod rows;
pub mod scroll;

pub use rows::{ColumnLayout, DASHBOARD_COLUMNS};
pub use scroll::{ScrollReport, scroll_to_end};

use crate::browser::{NodeRef, Query, RemoteDom};
use crate::config::{HarvestConfig, Timings};
use crate::error::{MonitorError, Result};
use crate::record::Record;
use rows::{CELL_SELECTOR, ROW_SELECTOR};

/// Descendants of the detail cell that are likely to carry the click handler
const DETAIL_CONTROL_SELECTOR: &str = "svg, button, span, div";

/// Harvests the listing page through a borrowed session
pub struct Harvester<'a, D: RemoteDom + ?Sized> {
    dom: &'a D,
    listing_url: &'a str,
    timings: &'a Timings,
    config: &'a HarvestConfig,
    columns: ColumnLayout,
}

impl<'a, D: RemoteDom + ?Sized> Harvester<'a, D> {
    pub fn new(dom: &'a D, listing_url: &'a str, timings: &'a Timings, config: &'a HarvestConfig) -> Self {
        Self { dom, listing_url, timings, config, columns: DASHBOARD_COLUMNS }
    }

    /// Builder method: use a different column layout
    pub fn with_columns(mut self, columns: ColumnLayout) -> Self {
        self.columns = columns;
        self
    }

    /// Collect every listing currently published, in table order.
    ///
    /// Fails with [`MonitorError::EmptyHarvest`] when the table has no data rows,
    /// which callers must not mistake for "all listings were removed".
    pub fn harvest(&self) -> Result<Vec<Record>> {
        self.open_listing()?;

        let scroll = scroll_to_end(self.dom, self.timings.scroll_pause, self.config.max_scroll_rounds)?;
        log::debug!("Scrolled {} times, page height {}", scroll.rounds, scroll.final_height);

        let records = self.collect_rows()?;
        if records.is_empty() {
            return Err(MonitorError::EmptyHarvest);
        }

        if !self.config.enrich_details {
            return Ok(records);
        }

        let total = records.len();
        let enriched: Vec<Record> = records
            .into_iter()
            .enumerate()
            .map(|(i, record)| {
                log::info!("Getting details for [{}/{}] {}", i + 1, total, record.name);
                match self.enrich(&record) {
                    Ok(enriched) => enriched,
                    Err(e) => {
                        log::error!("Error getting details for {}: {}", record.name, e);
                        record
                    }
                }
            })
            .collect();

        log::info!("Scraped {} listings with details", enriched.len());
        Ok(enriched)
    }

    fn open_listing(&self) -> Result<()> {
        self.dom.navigate(self.listing_url)?;
        std::thread::sleep(self.timings.listing_settle);
        Ok(())
    }

    /// Phase B: basic records from the table rows
    fn collect_rows(&self) -> Result<Vec<Record>> {
        let rows = self.dom.find(&Query::css(ROW_SELECTOR))?;
        log::info!("Found {} rows in table", rows.len());

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            match self.read_row(row) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => log::debug!("Skipping unreadable row {:?}: {}", row, e),
            }
        }
        Ok(records)
    }

    fn read_row(&self, row: NodeRef) -> Result<Option<Record>> {
        let cells = self.dom.find_in(row, CELL_SELECTOR)?;
        if cells.len() < self.columns.min_cells {
            return Ok(None);
        }

        let texts = cells.iter().map(|&cell| self.dom.text(cell)).collect::<Result<Vec<_>>>()?;
        Ok(self.columns.record_from(&texts))
    }

    /// Phase C: reopen the listing, open the record's detail view and read the optional fields
    fn enrich(&self, record: &Record) -> Result<Record> {
        self.open_listing()?;

        if !self.open_detail(&record.name)? {
            log::warn!("Row for {} not found on reload, keeping basic info", record.name);
            return Ok(record.clone());
        }
        std::thread::sleep(self.timings.detail_settle);

        let labels = &self.config.detail_labels;
        let mut enriched = record.clone();
        enriched.stipend.max = detail::labeled_value(self.dom, &labels.max_stipend);
        enriched.stipend.min = detail::labeled_value(self.dom, &labels.min_stipend);
        enriched.location = detail::labeled_value(self.dom, &labels.location);
        Ok(enriched)
    }

    /// Find the row named `name` and activate its detail control
    fn open_detail(&self, name: &str) -> Result<bool> {
        for row in self.dom.find(&Query::css(ROW_SELECTOR))? {
            let cells = self.dom.find_in(row, CELL_SELECTOR)?;
            if cells.len() <= self.columns.detail.max(self.columns.name) {
                continue;
            }
            if self.dom.text(cells[self.columns.name])?.trim() != name {
                continue;
            }

            let cell = cells[self.columns.detail];
            let clicked_control = match self.dom.find_in(cell, DETAIL_CONTROL_SELECTOR)?.first() {
                Some(&control) => self
                    .dom
                    .click(control)
                    .map_err(|e| log::debug!("Detail control click failed, clicking the cell: {}", e))
                    .is_ok(),
                None => false,
            };
            if !clicked_control {
                self.dom.click(cell)?;
            }
            return Ok(true);
        }
        Ok(false)
    }
}
