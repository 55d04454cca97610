//! Listing Aggregator
//!
//! Polls every registered source concurrently, keeps whatever succeeded and
//! merges the results into one candidate list.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tracing::{debug, error, info, warn};

use crate::models::Listing;
use crate::scrapers::ListingSource;

pub struct ListingAggregator {
    sources: Vec<Arc<dyn ListingSource>>,
}

impl ListingAggregator {
    pub fn new(sources: Vec<Arc<dyn ListingSource>>) -> Self {
        Self { sources }
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Fan out to all sources and wait for every one of them.
    ///
    /// A failing or panicking source contributes nothing; the others are
    /// unaffected. Results are merged in registration order.
    pub async fn gather(&self) -> Vec<Listing> {
        let handles: Vec<_> = self
            .sources
            .iter()
            .map(|source| {
                let source = Arc::clone(source);
                tokio::spawn(async move { source.fetch_candidates().await })
            })
            .collect();

        let results = join_all(handles).await;

        let mut candidates = Vec::new();
        for (source, result) in self.sources.iter().zip(results) {
            match result {
                Ok(Ok(listings)) => {
                    debug!(source = source.name(), count = listings.len(), "Source returned candidates");
                    candidates.extend(listings);
                }
                Ok(Err(e)) => {
                    warn!(source = source.name(), "Source fetch failed: {}", e);
                }
                Err(e) => {
                    error!(source = source.name(), "Source task failed: {}", e);
                }
            }
        }

        let merged = dedup_candidates(candidates);
        info!(
            "Gathered {} candidates from {} sources",
            merged.len(),
            self.sources.len()
        );
        merged
    }
}

/// Drop exact (exchange, symbol, listing_time) repeats, keeping first-seen order.
///
/// Same identity with a different time is kept; the tracker decides which
/// one wins.
pub fn dedup_candidates(candidates: Vec<Listing>) -> Vec<Listing> {
    let mut seen: HashSet<(String, String, DateTime<Utc>)> = HashSet::new();
    candidates
        .into_iter()
        .filter(|l| seen.insert((l.exchange.clone(), l.symbol.clone(), l.listing_time)))
        .collect()
}
