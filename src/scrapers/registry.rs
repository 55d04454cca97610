use std::sync::Arc;

use super::ListingSource;
use super::binance::BinanceAnnouncements;
use super::bybit::BybitAnnouncements;
use super::calendar::{CoinLaunchCalendar, CoinMarketCalCalendar};
use super::http::HttpFetcher;
use super::kucoin::KucoinAnnouncements;
use super::okx::OkxInstruments;
use super::pages::AnnouncementPageSource;
use super::social::{NewsRss, NitterFeed, TelegramChannel};
use crate::config::MonitorConfig;

/// Every known source, in registration order.
///
/// Registration order is also the aggregator's merge order, so a
/// candidate seen by several sources keeps the earliest source's record.
pub fn all_sources(http: &HttpFetcher) -> Vec<Arc<dyn ListingSource>> {
    vec![
        Arc::new(BinanceAnnouncements::new(http.clone())),
        Arc::new(BybitAnnouncements::new(http.clone())),
        Arc::new(KucoinAnnouncements::new(http.clone())),
        Arc::new(OkxInstruments::new(http.clone())),
        Arc::new(AnnouncementPageSource::mexc(http.clone())),
        Arc::new(AnnouncementPageSource::okx(http.clone())),
        Arc::new(NitterFeed::new(
            "binance",
            "Binance",
            &["will list", "new token", "trading starts"],
            http.clone(),
        )),
        Arc::new(NitterFeed::new(
            "Bybit_Official",
            "Bybit",
            &["spot trading", "new coin", "launch"],
            http.clone(),
        )),
        Arc::new(NitterFeed::new(
            "kucoincom",
            "KuCoin",
            &["new trading", "spot market"],
            http.clone(),
        )),
        Arc::new(TelegramChannel::new(
            "binance_announcements",
            "Binance",
            &["will list", "trading will start"],
            http.clone(),
        )),
        Arc::new(TelegramChannel::new(
            "Bybit_Announcements",
            "Bybit",
            &["spot trading", "new token"],
            http.clone(),
        )),
        Arc::new(NewsRss::new(
            "coindesk",
            "https://www.coindesk.com/arc/outboundfeeds/rss/",
            &["trading launch"],
            http.clone(),
        )),
        Arc::new(NewsRss::new(
            "cointelegraph",
            "https://cointelegraph.com/rss",
            &["listing announcement", "trading begins"],
            http.clone(),
        )),
        Arc::new(CoinLaunchCalendar::new(http.clone())),
        Arc::new(CoinMarketCalCalendar::new(http.clone())),
    ]
}

/// The sources the monitor polls: everything not disabled in `config`.
pub fn build_sources(config: &MonitorConfig, http: &HttpFetcher) -> Vec<Arc<dyn ListingSource>> {
    let (enabled, disabled): (Vec<_>, Vec<_>) = all_sources(http)
        .into_iter()
        .partition(|source| config.is_source_enabled(source.name()));

    for source in &disabled {
        tracing::info!(source = source.name(), "Source disabled by configuration");
    }

    enabled
}
