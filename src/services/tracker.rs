//! Listing lifecycle tracker
//!
//! Owns the live set of upcoming listings and the threshold ledger. Each
//! polling cycle runs admission, the expiry sweep and the threshold sweep
//! in that order and returns the alert events that became due.

use std::collections::HashSet;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::models::{IdentityKey, Listing};

/// Pre-listing alert points, in seconds before the listing time
pub const ALERT_THRESHOLDS_SECS: [i64; 4] = [3600, 1800, 900, 300];

/// A threshold fires while `|seconds_left - threshold| < tolerance`
pub const THRESHOLD_TOLERANCE_SECS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    /// The listing is `threshold_secs` (give or take the tolerance) away.
    Upcoming { threshold_secs: i64, seconds_left: i64 },
    /// The listing has started; `repeat` counts from 1 up to `of`.
    Started { repeat: u32, of: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertEvent {
    pub listing: Listing,
    pub kind: AlertKind,
    /// Earliest moment the event may be delivered
    pub due_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct CycleOutcome {
    pub admitted: Vec<Listing>,
    /// Ordered by `due_at`; events due at the same instant keep sweep order
    pub events: Vec<AlertEvent>,
}

pub struct ListingTracker {
    upcoming: Vec<Listing>,
    ledger: HashSet<(IdentityKey, i64)>,
    alert_count: u32,
    alert_interval: Duration,
}

impl ListingTracker {
    pub fn new(alert_count: u32, alert_interval: StdDuration) -> Self {
        Self {
            upcoming: Vec::new(),
            ledger: HashSet::new(),
            alert_count,
            alert_interval: Duration::from_std(alert_interval).unwrap_or(Duration::seconds(60)),
        }
    }

    /// Restore the live set from a snapshot. The ledger always starts empty.
    pub fn from_snapshot(listings: Vec<Listing>, alert_count: u32, alert_interval: StdDuration) -> Self {
        let mut tracker = Self::new(alert_count, alert_interval);
        for listing in listings {
            if !tracker.is_tracked(&listing.identity()) {
                tracker.upcoming.push(listing);
            }
        }
        tracker
    }

    pub fn process_cycle(&mut self, candidates: Vec<Listing>, now: DateTime<Utc>) -> CycleOutcome {
        let admitted = self.admit(candidates, now);

        let mut events = self.sweep_expired(now);
        events.extend(self.sweep_thresholds(now));
        events.sort_by_key(|event| event.due_at);

        CycleOutcome { admitted, events }
    }

    /// Admit unknown upcoming candidates; known identities keep their first-seen record.
    fn admit(&mut self, candidates: Vec<Listing>, now: DateTime<Utc>) -> Vec<Listing> {
        let mut admitted = Vec::new();

        for candidate in candidates {
            if !candidate.is_upcoming_at(now) || self.is_tracked(&candidate.identity()) {
                continue;
            }

            info!(
                exchange = %candidate.exchange,
                symbol = %candidate.symbol,
                listing_time = %candidate.listing_time,
                "New listing admitted"
            );
            self.upcoming.push(candidate.clone());
            admitted.push(candidate);
        }

        admitted
    }

    /// Remove started listings and schedule their repeated "started" alerts.
    fn sweep_expired(&mut self, now: DateTime<Utc>) -> Vec<AlertEvent> {
        let (started, live): (Vec<Listing>, Vec<Listing>) = std::mem::take(&mut self.upcoming)
            .into_iter()
            .partition(|listing| listing.listing_time <= now);
        self.upcoming = live;

        let mut events = Vec::new();
        for listing in started {
            let identity = listing.identity();
            self.ledger.retain(|(key, _)| *key != identity);

            info!(
                exchange = %listing.exchange,
                symbol = %listing.symbol,
                "Listing started, scheduling {} alerts",
                self.alert_count
            );

            for k in 0..self.alert_count {
                let Some(due_at) = i32::try_from(k)
                    .ok()
                    .and_then(|k| self.alert_interval.checked_mul(k))
                    .and_then(|offset| now.checked_add_signed(offset))
                else {
                    warn!(
                        exchange = %listing.exchange,
                        symbol = %listing.symbol,
                        repeat = k + 1,
                        "Started alert falls outside the representable time range, dropping the rest"
                    );
                    break;
                };

                events.push(AlertEvent {
                    listing: listing.clone(),
                    kind: AlertKind::Started {
                        repeat: k + 1,
                        of: self.alert_count,
                    },
                    due_at,
                });
            }
        }

        events
    }

    fn sweep_thresholds(&mut self, now: DateTime<Utc>) -> Vec<AlertEvent> {
        let mut events = Vec::new();

        for listing in &self.upcoming {
            let seconds_left = listing.seconds_until(now);

            for threshold in ALERT_THRESHOLDS_SECS {
                if (seconds_left - threshold).abs() >= THRESHOLD_TOLERANCE_SECS {
                    continue;
                }
                if !self.ledger.insert((listing.identity(), threshold)) {
                    continue;
                }

                debug!(
                    exchange = %listing.exchange,
                    symbol = %listing.symbol,
                    threshold,
                    seconds_left,
                    "Threshold alert due"
                );
                events.push(AlertEvent {
                    listing: listing.clone(),
                    kind: AlertKind::Upcoming {
                        threshold_secs: threshold,
                        seconds_left,
                    },
                    due_at: now,
                });
            }
        }

        events
    }

    pub fn is_tracked(&self, identity: &IdentityKey) -> bool {
        self.upcoming.iter().any(|l| l.identity() == *identity)
    }

    /// The `limit` soonest listings still in the future, ascending by time.
    pub fn upcoming_report(&self, now: DateTime<Utc>, limit: usize) -> Vec<Listing> {
        let mut soonest: Vec<Listing> = self
            .upcoming
            .iter()
            .filter(|l| l.listing_time > now)
            .cloned()
            .collect();
        soonest.sort_by_key(|l| l.listing_time);
        soonest.truncate(limit);
        soonest
    }

    /// The live set, in admission order; this is what gets persisted.
    pub fn snapshot(&self) -> &[Listing] {
        &self.upcoming
    }

    pub fn len(&self) -> usize {
        self.upcoming.len()
    }

    pub fn is_empty(&self) -> bool {
        self.upcoming.is_empty()
    }
}
