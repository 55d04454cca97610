//! Listing Monitor Job
//!
//! One polling cycle after another: gather candidates from every source,
//! run them through the tracker, deliver the alerts that became due and
//! persist the live set. The upcoming report is sent every
//! `REPORT_INTERVAL_SECS`. Supports graceful shutdown via Ctrl-C.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures_util::FutureExt;
use tokio::time::{Instant, MissedTickBehavior, interval, sleep, sleep_until};
use tracing::{debug, error, info, warn};

use crate::config::MonitorConfig;
use crate::error::MonitorError;
use crate::scrapers::http::HttpFetcher;
use crate::scrapers::registry::build_sources;
use crate::services::aggregator::ListingAggregator;
use crate::services::notifier::{LogNotifier, Notifier, TelegramNotifier};
use crate::services::snapshot::SnapshotStore;
use crate::services::tracker::{AlertEvent, AlertKind, ListingTracker};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
    pub candidates: usize,
    pub admitted: usize,
    pub alerts_sent: usize,
    pub alerts_failed: usize,
    pub tracked: usize,
}

pub struct ListingMonitor {
    aggregator: ListingAggregator,
    tracker: ListingTracker,
    store: SnapshotStore,
    notifier: Arc<dyn Notifier>,
    report_interval: Duration,
    report_size: usize,
    last_report: DateTime<Utc>,
}

impl ListingMonitor {
    /// Restore tracked listings from the snapshot and set up the report timer.
    pub async fn new(
        config: &MonitorConfig,
        aggregator: ListingAggregator,
        store: SnapshotStore,
        notifier: Arc<dyn Notifier>,
        now: DateTime<Utc>,
    ) -> Self {
        let restored = store.load().await;
        let tracker =
            ListingTracker::from_snapshot(restored, config.alert_count, config.alert_interval);

        Self {
            aggregator,
            tracker,
            store,
            notifier,
            report_interval: Duration::from_std(config.report_interval)
                .unwrap_or(Duration::minutes(5)),
            report_size: config.report_size,
            last_report: now,
        }
    }

    pub fn tracker(&self) -> &ListingTracker {
        &self.tracker
    }

    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    /// One full polling cycle. Returns once every due alert has been sent.
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> CycleSummary {
        let candidates = self.aggregator.gather().await;
        let candidate_count = candidates.len();

        let outcome = self.tracker.process_cycle(candidates, now);
        let (alerts_sent, alerts_failed) =
            dispatch_events(self.notifier.as_ref(), &outcome.events, now).await;

        if let Err(e) = self.store.save(self.tracker.snapshot()).await {
            warn!(
                path = %self.store.path().display(),
                "Failed to save snapshot, will retry next cycle: {}",
                e
            );
        }

        CycleSummary {
            candidates: candidate_count,
            admitted: outcome.admitted.len(),
            alerts_sent,
            alerts_failed,
            tracked: self.tracker.len(),
        }
    }

    /// Run a cycle, turning a panic anywhere inside it into an error.
    pub async fn supervised_cycle(&mut self, now: DateTime<Utc>) -> Result<CycleSummary, MonitorError> {
        AssertUnwindSafe(self.run_cycle(now))
            .catch_unwind()
            .await
            .map_err(|panic| MonitorError::Panicked(panic_message(panic.as_ref())))
    }

    /// Send the upcoming report when its interval has elapsed.
    pub async fn maybe_send_report(&mut self, now: DateTime<Utc>) -> bool {
        if now - self.last_report < self.report_interval {
            return false;
        }
        self.last_report = now;

        let listings = self.tracker.upcoming_report(now, self.report_size);
        match self.notifier.send_upcoming_report(&listings, now).await {
            Ok(()) => info!("Sent upcoming report with {} listings", listings.len()),
            Err(e) => error!("Failed to send upcoming report: {}", e),
        }
        true
    }
}

/// Deliver events in order, waiting for each one's `due_at`.
///
/// `now` is the cycle's clock reading; waits are measured from the moment
/// dispatch starts. A failed delivery is logged and skipped. Returns
/// (sent, failed).
pub async fn dispatch_events(
    notifier: &dyn Notifier,
    events: &[AlertEvent],
    now: DateTime<Utc>,
) -> (usize, usize) {
    let started = Instant::now();
    let mut sent = 0;
    let mut failed = 0;

    for event in events {
        if let Ok(offset) = (event.due_at - now).to_std() {
            if let Some(deadline) = started.checked_add(offset) {
                if deadline > Instant::now() {
                    debug!("Waiting until {} before next alert", event.due_at);
                    sleep_until(deadline).await;
                }
            }
        }

        let listing = &event.listing;
        let result = match event.kind {
            AlertKind::Upcoming { threshold_secs, .. } => {
                info!(
                    exchange = %listing.exchange,
                    symbol = %listing.symbol,
                    minutes = threshold_secs / 60,
                    "Sending upcoming alert"
                );
                notifier.send_upcoming_alert(listing, event.due_at).await
            }
            AlertKind::Started { repeat, of } => {
                info!(
                    exchange = %listing.exchange,
                    symbol = %listing.symbol,
                    "Sending started alert ({}/{})",
                    repeat,
                    of
                );
                notifier.send_started_alert(listing).await
            }
        };

        match result {
            Ok(()) => sent += 1,
            Err(e) => {
                failed += 1;
                error!(
                    exchange = %listing.exchange,
                    symbol = %listing.symbol,
                    "Failed to deliver alert: {}",
                    e
                );
            }
        }
    }

    (sent, failed)
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Build the notifier the configuration asks for.
pub fn build_notifier(config: &MonitorConfig) -> Result<Arc<dyn Notifier>, MonitorError> {
    match &config.bot_token {
        Some(token) => {
            let notifier =
                TelegramNotifier::new(token, config.chat_id.clone(), config.scraper.timeout)?;
            Ok(Arc::new(notifier))
        }
        None => {
            warn!("TELEGRAM_BOT_TOKEN not set - notifications will only be logged");
            Ok(Arc::new(LogNotifier))
        }
    }
}

/// Run the listing monitor until Ctrl-C.
///
/// Loads the snapshot, announces itself, then polls every
/// `POLL_INTERVAL_SECS` starting immediately. A failed cycle is logged and
/// followed by `ERROR_COOLDOWN_SECS` of rest; the process keeps running.
pub async fn run_listing_monitor(config: MonitorConfig) -> Result<(), MonitorError> {
    let http = HttpFetcher::new(config.scraper.clone())?;
    let sources = build_sources(&config, &http);
    let source_names: Vec<String> = sources.iter().map(|s| s.name().to_string()).collect();
    let notifier = build_notifier(&config)?;

    info!(
        sources = sources.len(),
        poll_interval_secs = config.poll_interval.as_secs(),
        report_interval_secs = config.report_interval.as_secs(),
        snapshot = %config.snapshot_path.display(),
        "Initializing listing monitor"
    );

    let mut monitor = ListingMonitor::new(
        &config,
        ListingAggregator::new(sources),
        SnapshotStore::new(config.snapshot_path.clone()),
        notifier,
        Utc::now(),
    )
    .await;

    if let Err(e) = monitor.notifier().send_startup_message(&source_names).await {
        error!("Failed to send startup message: {}", e);
    }

    let mut ticker = interval(config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received, stopping listing monitor");
                break;
            }
            _ = ticker.tick() => {
                match monitor.supervised_cycle(Utc::now()).await {
                    Ok(summary) => {
                        info!(
                            candidates = summary.candidates,
                            admitted = summary.admitted,
                            alerts_sent = summary.alerts_sent,
                            alerts_failed = summary.alerts_failed,
                            tracked = summary.tracked,
                            "Polling cycle completed"
                        );
                        monitor.maybe_send_report(Utc::now()).await;
                    }
                    Err(e) => {
                        error!(error = %e, "Polling cycle failed, cooling down for {:?}", config.error_cooldown);
                        tokio::select! {
                            _ = tokio::signal::ctrl_c() => {
                                info!("Shutdown signal received during cooldown");
                                break;
                            }
                            _ = sleep(config.error_cooldown) => {}
                        }
                        ticker.reset();
                    }
                }
            }
        }
    }

    info!("Listing monitor stopped");
    Ok(())
}
