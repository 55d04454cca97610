//! Runtime configuration
//!
//! Every value comes from the environment (a `.env` file is honoured by
//! `main`), falling back to the defaults below.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::scrapers::ScraperConfig;

const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
const DEFAULT_REPORT_INTERVAL_SECS: u64 = 300;
const DEFAULT_REPORT_SIZE: usize = 5;
const DEFAULT_ALERT_COUNT: u32 = 3;
const DEFAULT_ALERT_INTERVAL_SECS: u64 = 60;
const DEFAULT_ERROR_COOLDOWN_SECS: u64 = 60;
const DEFAULT_SNAPSHOT_PATH: &str = "listings_data.json";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

const MAX_ALERT_COUNT: u32 = 10;
const MAX_ALERT_INTERVAL_SECS: u64 = 3600;
const MAX_RETRY_MAX: u32 = 10;
const MAX_RETRY_DELAY_MS: u64 = 60_000;

const ENV_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
const ENV_CHAT_ID: &str = "TELEGRAM_CHAT_ID";
const ENV_POLL_INTERVAL: &str = "POLL_INTERVAL_SECS";
const ENV_REPORT_INTERVAL: &str = "REPORT_INTERVAL_SECS";
const ENV_REPORT_SIZE: &str = "REPORT_SIZE";
const ENV_ALERT_COUNT: &str = "LISTING_ALERT_COUNT";
const ENV_ALERT_INTERVAL: &str = "LISTING_ALERT_INTERVAL_SECS";
const ENV_ERROR_COOLDOWN: &str = "ERROR_COOLDOWN_SECS";
const ENV_SNAPSHOT_PATH: &str = "SNAPSHOT_PATH";
const ENV_HTTP_TIMEOUT: &str = "HTTP_TIMEOUT_SECS";
const ENV_RETRY_MAX: &str = "HTTP_RETRY_MAX";
const ENV_RETRY_DELAY: &str = "HTTP_RETRY_DELAY_MS";
const ENV_DISABLED_SOURCES: &str = "DISABLED_SOURCES";

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub poll_interval: Duration,
    pub report_interval: Duration,
    pub report_size: usize,
    /// How many times the "listing started" alert is sent.
    pub alert_count: u32,
    /// Spacing between repeated "listing started" alerts.
    pub alert_interval: Duration,
    pub error_cooldown: Duration,
    pub snapshot_path: PathBuf,
    pub scraper: ScraperConfig,
    /// Source names (see `scrapers::registry`) that must not be polled.
    pub disabled_sources: Vec<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            report_interval: Duration::from_secs(DEFAULT_REPORT_INTERVAL_SECS),
            report_size: DEFAULT_REPORT_SIZE,
            alert_count: DEFAULT_ALERT_COUNT,
            alert_interval: Duration::from_secs(DEFAULT_ALERT_INTERVAL_SECS),
            error_cooldown: Duration::from_secs(DEFAULT_ERROR_COOLDOWN_SECS),
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
            scraper: ScraperConfig::default(),
            disabled_sources: Vec::new(),
        }
    }
}

impl MonitorConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let scraper = ScraperConfig {
            retry_max: bounded(
                ENV_RETRY_MAX,
                parse_or(&lookup, ENV_RETRY_MAX, defaults.scraper.retry_max),
                1,
                MAX_RETRY_MAX,
            ),
            retry_delay_ms: bounded(
                ENV_RETRY_DELAY,
                parse_or(&lookup, ENV_RETRY_DELAY, defaults.scraper.retry_delay_ms),
                0,
                MAX_RETRY_DELAY_MS,
            ),
            timeout: Duration::from_secs(bounded(
                ENV_HTTP_TIMEOUT,
                parse_or(&lookup, ENV_HTTP_TIMEOUT, DEFAULT_HTTP_TIMEOUT_SECS),
                1,
                u64::MAX,
            )),
        };

        Self {
            bot_token: non_empty(ENV_BOT_TOKEN),
            chat_id: non_empty(ENV_CHAT_ID),
            // tokio intervals reject a zero period
            poll_interval: Duration::from_secs(bounded(
                ENV_POLL_INTERVAL,
                parse_or(&lookup, ENV_POLL_INTERVAL, DEFAULT_POLL_INTERVAL_SECS),
                1,
                u64::MAX,
            )),
            report_interval: Duration::from_secs(bounded(
                ENV_REPORT_INTERVAL,
                parse_or(&lookup, ENV_REPORT_INTERVAL, DEFAULT_REPORT_INTERVAL_SECS),
                1,
                u64::MAX,
            )),
            report_size: parse_or(&lookup, ENV_REPORT_SIZE, defaults.report_size),
            alert_count: bounded(
                ENV_ALERT_COUNT,
                parse_or(&lookup, ENV_ALERT_COUNT, defaults.alert_count),
                0,
                MAX_ALERT_COUNT,
            ),
            alert_interval: Duration::from_secs(bounded(
                ENV_ALERT_INTERVAL,
                parse_or(&lookup, ENV_ALERT_INTERVAL, DEFAULT_ALERT_INTERVAL_SECS),
                0,
                MAX_ALERT_INTERVAL_SECS,
            )),
            error_cooldown: Duration::from_secs(parse_or(
                &lookup,
                ENV_ERROR_COOLDOWN,
                DEFAULT_ERROR_COOLDOWN_SECS,
            )),
            snapshot_path: non_empty(ENV_SNAPSHOT_PATH)
                .map(PathBuf::from)
                .unwrap_or(defaults.snapshot_path),
            scraper,
            disabled_sources: lookup(ENV_DISABLED_SOURCES)
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_lowercase())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    pub fn is_source_enabled(&self, name: &str) -> bool {
        !self
            .disabled_sources
            .iter()
            .any(|disabled| disabled.eq_ignore_ascii_case(name))
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(key = key, value = %raw, default = %default, "Invalid config value, using default");
                default
            }
        },
        None => default,
    }
}

/// Clamp `value` into `[min, max]`, warning when it had to move.
fn bounded<T>(key: &str, value: T, min: T, max: T) -> T
where
    T: Ord + Copy + std::fmt::Display,
{
    let clamped = value.clamp(min, max);
    if clamped != value {
        warn!(key = key, value = %value, used = %clamped, "Config value out of range, clamped");
    }
    clamped
}
