use thiserror::Error;

/// Errors raised while running a monitoring cycle
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The browser process could not be started or connected to
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    /// The DOM session is unreachable, or navigation / script execution failed
    #[error("Browser transport error: {0}")]
    Transport(String),

    /// A required field could not be located on the page
    #[error("Could not resolve {field} on the page")]
    Resolution { field: String },

    /// The listing table produced no data rows
    #[error("Listing table yielded no records")]
    EmptyHarvest,

    /// A notification sink rejected or failed to deliver a message
    #[error("Notification via {sink} failed: {reason}")]
    Notification { sink: String, reason: String },

    /// The baseline could not be persisted
    #[error("Baseline storage error: {0}")]
    Storage(String),

    /// The process configuration is unusable
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl MonitorError {
    /// Whether the failure is unexpected enough to announce on the notification sinks.
    ///
    /// Resolution failures and empty harvests are routine skips, and a failed
    /// notification is never reported through the notification path.
    pub fn is_reportable(&self) -> bool {
        matches!(
            self,
            MonitorError::LaunchFailed(_)
                | MonitorError::Transport(_)
                | MonitorError::Storage(_)
                | MonitorError::Config(_)
        )
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, MonitorError>;
