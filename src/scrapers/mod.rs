pub mod binance;
pub mod bybit;
pub mod calendar;
pub mod http;
pub mod kucoin;
pub mod okx;
pub mod pages;
pub mod parser;
pub mod registry;
pub mod social;
pub mod time_extractor;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::time::Duration as StdDuration;

use crate::error::ScrapeError;
use time_extractor::Extracted;
use crate::models::Listing;

/// One pollable source of listing candidates.
///
/// Implementations return every candidate they can recover from one poll.
/// Errors are reported to the aggregator, which logs them and carries on
/// with the other sources.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Stable name, used in logs and in `DISABLED_SOURCES`.
    fn name(&self) -> &str;

    async fn fetch_candidates(&self) -> Result<Vec<Listing>, ScrapeError>;
}

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub retry_max: u32,
    pub retry_delay_ms: u64,
    pub timeout: StdDuration,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            retry_max: 3,
            retry_delay_ms: 1000,
            timeout: StdDuration::from_secs(30),
        }
    }
}

/// What a source assumes when no time can be extracted from the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFallback {
    /// Drop the candidate.
    Skip,
    /// Tomorrow (UTC) at the given hour.
    TomorrowAt(u32),
    /// The item's publication time plus the given number of hours.
    AfterPublished(i64),
}

impl TimeFallback {
    pub fn resolve(
        &self,
        now: DateTime<Utc>,
        published: Option<DateTime<Utc>>,
    ) -> Option<DateTime<Utc>> {
        match *self {
            TimeFallback::Skip => None,
            TimeFallback::TomorrowAt(hour) => now
                .date_naive()
                .succ_opt()?
                .and_hms_opt(hour, 0, 0)
                .map(|t| t.and_utc()),
            TimeFallback::AfterPublished(hours) => {
                published?.checked_add_signed(Duration::try_hours(hours)?)
            }
        }
    }
}

/// Extract a listing time from `text`, applying `fallback` only when
/// nothing matched. A text whose times have all passed yields `None`.
pub fn listing_time_or(
    text: &str,
    fallback: TimeFallback,
    now: DateTime<Utc>,
    published: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    match time_extractor::scan_listing_time(text, now) {
        Extracted::Future(t) => Some(t),
        Extracted::PastOnly => None,
        Extracted::NoMatch => fallback.resolve(now, published),
    }
}

/// Candidate from one JSON announcement (Bybit/KuCoin style feeds).
///
/// The title must classify as a listing and carry a symbol; the time comes
/// from `content + title`, else from the publication timestamp.
pub(crate) fn announcement_candidate(
    exchange: &str,
    title: &str,
    content: &str,
    url: Option<String>,
    published_ms: Option<i64>,
    now: DateTime<Utc>,
) -> Option<Listing> {
    if !parser::is_listing_announcement_with(title, &["coming soon"]) {
        return None;
    }
    let symbol = parser::extract_symbol(title)?;

    let published = published_ms.and_then(DateTime::from_timestamp_millis);
    let text = format!("{} {}", content, title);
    let listing_time = listing_time_or(&text, TimeFallback::AfterPublished(0), now, published)?;
    if listing_time <= now {
        return None;
    }

    Some(Listing::upcoming(
        exchange,
        symbol,
        listing_time,
        url.filter(|u| !u.is_empty()),
    ))
}
