#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use listing_radar::MonitorConfig;
use listing_radar::error::{NotifyError, ScrapeError};
use listing_radar::models::Listing;
use listing_radar::scrapers::ListingSource;
use listing_radar::services::notifier::Notifier;

/// Fixed reference instant used as "now" by the tests
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

pub fn at(offset_secs: i64) -> DateTime<Utc> {
    t0() + chrono::Duration::seconds(offset_secs)
}

pub fn listing(exchange: &str, symbol: &str, offset_secs: i64) -> Listing {
    Listing::upcoming(exchange, symbol, at(offset_secs), None)
}

/// Unique scratch directory under the system temp dir
pub fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("listing-radar-it-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn test_config(snapshot_path: PathBuf) -> MonitorConfig {
    MonitorConfig {
        alert_count: 3,
        alert_interval: Duration::from_secs(60),
        report_interval: Duration::from_secs(300),
        report_size: 5,
        snapshot_path,
        ..MonitorConfig::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Report(Vec<String>),
    Upcoming(String),
    Started(String),
    Startup(usize),
}

/// Records what would have been sent. Symbols listed in `fail_for` fail
/// delivery; symbols in `panic_for` panic.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Sent>>,
    /// Clock reading at each successful alert delivery
    pub sent_at: Mutex<Vec<tokio::time::Instant>>,
    pub fail_for: Vec<String>,
    pub panic_for: Vec<String>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_at(&self) -> Vec<tokio::time::Instant> {
        self.sent_at.lock().unwrap().clone()
    }

    fn record(&self, symbol: &str, sent: Sent) -> Result<(), NotifyError> {
        if self.panic_for.iter().any(|s| s == symbol) {
            panic!("notifier exploded on {}", symbol);
        }
        if self.fail_for.iter().any(|s| s == symbol) {
            return Err(NotifyError::Api {
                description: format!("refused {}", symbol),
            });
        }
        self.sent.lock().unwrap().push(sent);
        self.sent_at.lock().unwrap().push(tokio::time::Instant::now());
        Ok(())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_html(&self, _html: &str) -> Result<(), NotifyError> {
        Ok(())
    }

    async fn send_upcoming_report(
        &self,
        listings: &[Listing],
        _now: DateTime<Utc>,
    ) -> Result<(), NotifyError> {
        let symbols = listings.iter().map(|l| l.symbol.clone()).collect();
        self.sent.lock().unwrap().push(Sent::Report(symbols));
        Ok(())
    }

    async fn send_upcoming_alert(
        &self,
        listing: &Listing,
        _now: DateTime<Utc>,
    ) -> Result<(), NotifyError> {
        self.record(&listing.symbol, Sent::Upcoming(listing.symbol.clone()))
    }

    async fn send_started_alert(&self, listing: &Listing) -> Result<(), NotifyError> {
        self.record(&listing.symbol, Sent::Started(listing.symbol.clone()))
    }

    async fn send_startup_message(&self, source_names: &[String]) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(Sent::Startup(source_names.len()));
        Ok(())
    }
}

/// Source whose candidate list can be swapped between cycles
pub struct StaticSource {
    pub name: &'static str,
    pub candidates: Mutex<Vec<Listing>>,
}

impl StaticSource {
    pub fn new(name: &'static str, candidates: Vec<Listing>) -> Arc<Self> {
        Arc::new(Self {
            name,
            candidates: Mutex::new(candidates),
        })
    }

    pub fn set(&self, candidates: Vec<Listing>) {
        *self.candidates.lock().unwrap() = candidates;
    }
}

#[async_trait]
impl ListingSource for StaticSource {
    fn name(&self) -> &str {
        self.name
    }

    async fn fetch_candidates(&self) -> Result<Vec<Listing>, ScrapeError> {
        Ok(self.candidates.lock().unwrap().clone())
    }
}

/// Source that always fails
pub struct BrokenSource;

#[async_trait]
impl ListingSource for BrokenSource {
    fn name(&self) -> &str {
        "broken"
    }

    async fn fetch_candidates(&self) -> Result<Vec<Listing>, ScrapeError> {
        Err(ScrapeError::Status {
            url: "https://example.invalid".to_string(),
            status: 503,
        })
    }
}
