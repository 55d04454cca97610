use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of one listing event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    #[default]
    Upcoming,
    Active,
    Completed,
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingStatus::Upcoming => write!(f, "upcoming"),
            ListingStatus::Active => write!(f, "active"),
            ListingStatus::Completed => write!(f, "completed"),
        }
    }
}

/// One exchange/symbol listing event.
///
/// This is also the snapshot wire form: `listing_time` serializes as an
/// RFC 3339 timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Listing {
    pub exchange: String,
    pub symbol: String,
    pub listing_time: DateTime<Utc>,
    #[serde(default)]
    pub announcement_url: Option<String>,
    #[serde(default)]
    pub status: ListingStatus,
}

/// Tracker identity: exchange compared case-insensitively, symbol as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey {
    pub exchange: String,
    pub symbol: String,
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.exchange, self.symbol)
    }
}

impl Listing {
    pub fn upcoming(
        exchange: impl Into<String>,
        symbol: impl Into<String>,
        listing_time: DateTime<Utc>,
        announcement_url: Option<String>,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            symbol: symbol.into(),
            listing_time,
            announcement_url,
            status: ListingStatus::Upcoming,
        }
    }

    pub fn identity(&self) -> IdentityKey {
        IdentityKey {
            exchange: self.exchange.to_lowercase(),
            symbol: self.symbol.clone(),
        }
    }

    pub fn is_upcoming_at(&self, now: DateTime<Utc>) -> bool {
        self.status == ListingStatus::Upcoming && self.listing_time > now
    }

    /// Whole seconds until the listing starts (negative once started).
    pub fn seconds_until(&self, now: DateTime<Utc>) -> i64 {
        (self.listing_time - now).num_seconds()
    }
}
