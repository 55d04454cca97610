use thiserror::Error;

/// Failure inside one listing source. Never leaves the aggregator.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{source_name} API error: {message}")]
    Api { source_name: String, message: String },

    #[error("Max retries exceeded for {url}")]
    RetriesExhausted { url: String },
}

/// Snapshot read/write failure.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// Delivery failure for a single message.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Telegram API error: {description}")]
    Api { description: String },

    #[error("No chat id configured and none could be discovered")]
    MissingChat,
}

/// Anything that aborts a whole polling cycle.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Notify(#[from] NotifyError),

    #[error("Cycle panicked: {0}")]
    Panicked(String),
}
