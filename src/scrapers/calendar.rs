use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;

use super::ListingSource;
use super::http::HttpFetcher;
use super::parser::{detect_exchange, extract_symbol, is_valid_symbol, normalize_exchange};
use crate::error::ScrapeError;
use crate::models::Listing;

const COINLAUNCH_URL: &str = "https://coinlaunch.space/api/listings";
const COINMARKETCAL_URL: &str = "https://coinmarketcal.com/api/v1/events";

#[derive(Debug, Deserialize)]
struct CoinLaunchResponse {
    #[serde(default)]
    listings: Vec<CoinLaunchListing>,
}

#[derive(Debug, Deserialize)]
struct CoinLaunchListing {
    #[serde(default)]
    exchange: String,
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    listing_date: String,
    #[serde(default)]
    announcement_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CoinMarketCalResponse {
    #[serde(default)]
    events: Vec<CoinMarketCalEvent>,
}

#[derive(Debug, Deserialize)]
struct CoinMarketCalEvent {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    date_event: String,
    #[serde(default)]
    source: Option<String>,
}

/// CoinLaunch listing calendar
pub struct CoinLaunchCalendar {
    http: HttpFetcher,
}

impl CoinLaunchCalendar {
    pub const NAME: &'static str = "calendar-coinlaunch";

    pub fn new(http: HttpFetcher) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ListingSource for CoinLaunchCalendar {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn fetch_candidates(&self) -> Result<Vec<Listing>, ScrapeError> {
        let response: CoinLaunchResponse = self.http.get_json(COINLAUNCH_URL).await?;
        Ok(parse_coinlaunch(response, Utc::now()))
    }
}

/// CoinMarketCal event calendar, listing events only
pub struct CoinMarketCalCalendar {
    http: HttpFetcher,
}

impl CoinMarketCalCalendar {
    pub const NAME: &'static str = "calendar-coinmarketcal";

    pub fn new(http: HttpFetcher) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ListingSource for CoinMarketCalCalendar {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn fetch_candidates(&self) -> Result<Vec<Listing>, ScrapeError> {
        let response: CoinMarketCalResponse = self.http.get_json(COINMARKETCAL_URL).await?;
        Ok(parse_coinmarketcal(response, Utc::now()))
    }
}

fn parse_coinlaunch(response: CoinLaunchResponse, now: DateTime<Utc>) -> Vec<Listing> {
    response
        .listings
        .into_iter()
        .filter_map(|item| {
            let exchange = normalize_exchange(&item.exchange)?;
            let symbol = item.symbol.trim().to_uppercase();
            if !is_valid_symbol(&symbol) {
                return None;
            }
            let listing_time = parse_calendar_date(&item.listing_date)?;
            (listing_time > now).then(|| {
                Listing::upcoming(
                    exchange,
                    symbol,
                    listing_time,
                    item.announcement_url.filter(|u| !u.is_empty()),
                )
            })
        })
        .collect()
}

fn parse_coinmarketcal(response: CoinMarketCalResponse, now: DateTime<Utc>) -> Vec<Listing> {
    response
        .events
        .into_iter()
        .filter(|event| event.title.to_lowercase().contains("listing"))
        .filter_map(|event| {
            let listing_time = parse_calendar_date(&event.date_event)?;
            if listing_time <= now {
                return None;
            }
            let symbol = extract_symbol(&event.title)?;
            let exchange = detect_exchange(&event.description)?;
            Some(Listing::upcoming(
                exchange,
                symbol,
                listing_time,
                event.source.filter(|u| !u.is_empty()),
            ))
        })
        .collect()
}

/// ISO-8601 date or date-time; values without an offset are UTC.
fn parse_calendar_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_calendar_date() {
        let expected = Utc.with_ymd_and_hms(2025, 6, 5, 10, 0, 0).unwrap();
        assert_eq!(parse_calendar_date("2025-06-05T10:00:00"), Some(expected));
        assert_eq!(parse_calendar_date("2025-06-05T12:00:00+02:00"), Some(expected));
        assert_eq!(parse_calendar_date("2025-06-05 10:00"), Some(expected));
        assert_eq!(
            parse_calendar_date("2025-06-05"),
            Some(Utc.with_ymd_and_hms(2025, 6, 5, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_calendar_date("next week"), None);
    }

    #[test]
    fn test_parse_coinlaunch() {
        let json = r#"{"listings": [
            {"exchange": "bybit", "symbol": "abc", "listing_date": "2025-06-05T10:00:00", "announcement_url": "https://coinlaunch.space/abc"},
            {"exchange": "gate", "symbol": "DEF", "listing_date": "2025-06-05T10:00:00"},
            {"exchange": "okx", "symbol": "OLD", "listing_date": "2025-05-01T10:00:00"},
            {"exchange": "mexc", "symbol": "BAD", "listing_date": "soon"}
        ]}"#;
        let response: CoinLaunchResponse = serde_json::from_str(json).unwrap();
        let listings = parse_coinlaunch(response, now());

        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].exchange, "Bybit");
        assert_eq!(listings[0].symbol, "ABC");
        assert_eq!(
            listings[0].announcement_url.as_deref(),
            Some("https://coinlaunch.space/abc")
        );
    }

    #[test]
    fn test_parse_coinmarketcal() {
        let json = r#"{"events": [
            {"title": "MOVE Listing", "description": "Will be listed on KuCoin", "date_event": "2025-06-07T00:00:00", "source": "https://coinmarketcal.com/event/move"},
            {"title": "ABC Mainnet", "description": "Upgrade on binance", "date_event": "2025-06-07T00:00:00"},
            {"title": "XYZ Listing", "description": "Somewhere else", "date_event": "2025-06-07T00:00:00"}
        ]}"#;
        let response: CoinMarketCalResponse = serde_json::from_str(json).unwrap();
        let listings = parse_coinmarketcal(response, now());

        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].exchange, "KuCoin");
        assert_eq!(listings[0].symbol, "MOVE");
        assert_eq!(
            listings[0].listing_time,
            Utc.with_ymd_and_hms(2025, 6, 7, 0, 0, 0).unwrap()
        );
    }
}
