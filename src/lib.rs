// src/lib.rs

pub mod config;
pub mod error;
pub mod models;
pub mod scrapers;

pub mod services {
    pub mod aggregator;
    pub mod notifier;
    pub mod snapshot;
    pub mod tracker;
}

pub mod jobs {
    pub mod listing_monitor;
}

pub use config::MonitorConfig;
pub use error::{MonitorError, NotifyError, ScrapeError, SnapshotError};
pub use models::{IdentityKey, Listing, ListingStatus};
