//! Bounded waits for client-side rendering
//!
//! The portal renders everything from JavaScript after the load event fires,
//! so the only reliable signal is polling the DOM until something shows up.

use crate::browser::RemoteDom;
use crate::error::Result;
use std::time::{Duration, Instant};

const INITIAL_POLL: Duration = Duration::from_millis(100);
const MAX_POLL: Duration = Duration::from_secs(1);

/// Poll `condition` until it holds or `timeout` elapses.
///
/// Returns `Ok(false)` on timeout rather than an error; callers decide whether a
/// partially rendered page is good enough. Errors from the condition propagate.
///
/// Polling starts at 100ms and doubles each retry, capped at one second.
pub fn wait_until<D, F>(dom: &D, timeout: Duration, mut condition: F) -> Result<bool>
where
    D: RemoteDom + ?Sized,
    F: FnMut(&D) -> Result<bool>,
{
    let start = Instant::now();
    let mut poll_interval = INITIAL_POLL;

    loop {
        if condition(dom)? {
            return Ok(true);
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Ok(false);
        }

        std::thread::sleep(poll_interval.min(timeout - elapsed));
        poll_interval = (poll_interval * 2).min(MAX_POLL);
    }
}
