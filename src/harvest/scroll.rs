//! Exhaustive scrolling so lazily rendered rows exist before extraction

use crate::browser::RemoteDom;
use crate::error::{MonitorError, Result};
use std::time::Duration;

pub const PAGE_HEIGHT_JS: &str = "document.body.scrollHeight";
pub const SCROLL_TO_BOTTOM_JS: &str = "window.scrollTo(0, document.body.scrollHeight)";
pub const SCROLL_TO_TOP_JS: &str = "window.scrollTo(0, 0)";

/// What the scroll loop observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollReport {
    /// Scroll-to-bottom steps performed
    pub rounds: usize,

    pub final_height: u64,

    /// False when the round cap stopped the loop before the height settled
    pub stabilized: bool,
}

/// Scroll to the bottom until the page stops growing, then back to the top.
///
/// Stops at the first scroll that does not increase the page height, or after
/// `max_rounds` scrolls.
pub fn scroll_to_end<D: RemoteDom + ?Sized>(dom: &D, pause: Duration, max_rounds: usize) -> Result<ScrollReport> {
    let mut last_height = page_height(dom)?;
    let mut report = ScrollReport { rounds: 0, final_height: last_height, stabilized: false };

    while report.rounds < max_rounds {
        dom.execute(SCROLL_TO_BOTTOM_JS)?;
        report.rounds += 1;
        std::thread::sleep(pause);

        let height = page_height(dom)?;
        report.final_height = height;
        if height <= last_height {
            report.stabilized = true;
            break;
        }
        last_height = height;
    }

    if !report.stabilized {
        log::warn!("Page height still growing after {} scrolls, extracting what is loaded", max_rounds);
    }

    dom.execute(SCROLL_TO_TOP_JS)?;
    std::thread::sleep(pause);

    Ok(report)
}

fn page_height<D: RemoteDom + ?Sized>(dom: &D) -> Result<u64> {
    let value = dom.execute(PAGE_HEIGHT_JS)?;
    value
        .as_u64()
        .or_else(|| value.as_f64().map(|h| h.max(0.0) as u64))
        .ok_or_else(|| MonitorError::Transport(format!("Page height is not a number: {}", value)))
}
