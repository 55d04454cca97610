use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use super::ListingSource;
use super::http::HttpFetcher;
use super::parser::is_valid_symbol;
use crate::error::ScrapeError;
use crate::models::{Listing, ListingStatus};

const INSTRUMENTS_URL: &str = "https://www.okx.com/api/v5/public/instruments?instType=SPOT";
const TRADE_URL: &str = "https://www.okx.com/trade-spot/";

/// Newest instruments considered per poll
const MAX_INSTRUMENTS: usize = 20;
/// Instruments listed within this window still count as fresh
const ACTIVE_WINDOW_HOURS: i64 = 48;

#[derive(Debug, Deserialize)]
struct OkxResponse {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Vec<OkxInstrument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OkxInstrument {
    inst_id: String,
    /// Millisecond epoch as a string, empty when unknown
    #[serde(default)]
    list_time: String,
}

/// Spot instrument list of the OKX public API
pub struct OkxInstruments {
    http: HttpFetcher,
}

impl OkxInstruments {
    pub const NAME: &'static str = "okx-instruments";

    pub fn new(http: HttpFetcher) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ListingSource for OkxInstruments {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn fetch_candidates(&self) -> Result<Vec<Listing>, ScrapeError> {
        let response: OkxResponse = self.http.get_json(INSTRUMENTS_URL).await?;
        if response.code != "0" {
            return Err(ScrapeError::Api {
                source_name: Self::NAME.to_string(),
                message: response.msg,
            });
        }
        Ok(parse_instruments(response.data, Utc::now()))
    }
}

/// Newest instruments first; upcoming ones and those listed in the last
/// 48 hours become candidates, older ones are dropped.
fn parse_instruments(instruments: Vec<OkxInstrument>, now: DateTime<Utc>) -> Vec<Listing> {
    let mut timed: Vec<(OkxInstrument, DateTime<Utc>)> = instruments
        .into_iter()
        .filter_map(|inst| {
            let millis = inst.list_time.trim().parse::<i64>().ok()?;
            let time = DateTime::from_timestamp_millis(millis)?;
            Some((inst, time))
        })
        .collect();
    timed.sort_by(|a, b| b.1.cmp(&a.1));

    timed
        .into_iter()
        .take(MAX_INSTRUMENTS)
        .filter_map(|(inst, list_time)| {
            let status = if list_time > now {
                ListingStatus::Upcoming
            } else if now - list_time < Duration::hours(ACTIVE_WINDOW_HOURS) {
                ListingStatus::Active
            } else {
                return None;
            };

            let symbol = inst
                .inst_id
                .split('-')
                .next()
                .unwrap_or_default()
                .to_string();
            if !is_valid_symbol(&symbol) {
                return None;
            }

            Some(Listing {
                exchange: "OKX".to_string(),
                symbol,
                listing_time: list_time,
                announcement_url: Some(format!("{}{}", TRADE_URL, inst.inst_id.to_lowercase())),
                status,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn instrument(inst_id: &str, list_time: Option<DateTime<Utc>>) -> OkxInstrument {
        OkxInstrument {
            inst_id: inst_id.to_string(),
            list_time: list_time
                .map(|t| t.timestamp_millis().to_string())
                .unwrap_or_default(),
        }
    }

    #[test]
    fn test_parse_instruments_statuses() {
        let instruments = vec![
            instrument("OLD-USDT", Some(now() - Duration::days(30))),
            instrument("FRESH-USDT", Some(now() + Duration::hours(5))),
            instrument("HOT-USDC", Some(now() - Duration::hours(47))),
            instrument("NOTIME-USDT", None),
        ];

        let listings = parse_instruments(instruments, now());
        assert_eq!(listings.len(), 2);

        assert_eq!(listings[0].symbol, "FRESH");
        assert_eq!(listings[0].status, ListingStatus::Upcoming);
        assert_eq!(
            listings[0].announcement_url.as_deref(),
            Some("https://www.okx.com/trade-spot/fresh-usdt")
        );

        assert_eq!(listings[1].symbol, "HOT");
        assert_eq!(listings[1].status, ListingStatus::Active);
    }

    #[test]
    fn test_only_newest_twenty_considered() {
        // 25 future instruments: only the 20 latest survive
        let instruments = (1..=25)
            .map(|i| {
                let symbol = format!("T{}", char::from(b'A' + i as u8));
                instrument(&format!("{}-USDT", symbol), Some(now() + Duration::hours(i)))
            })
            .collect();

        let listings = parse_instruments(instruments, now());
        assert_eq!(listings.len(), 20);
        assert_eq!(listings[0].symbol, "TZ");
        assert!(listings.iter().all(|l| l.symbol != "TB"));
    }

    #[test]
    fn test_invalid_base_symbols_are_dropped() {
        let instruments = vec![
            instrument("1INCH-EUR", Some(now() + Duration::hours(5))),
            instrument("USDT-EUR", Some(now() + Duration::hours(5))),
            instrument("SUI-EUR", Some(now() + Duration::hours(4))),
        ];

        let listings = parse_instruments(instruments, now());
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].symbol, "SUI");
    }

    #[test]
    fn test_deserialize_response() {
        let json = r#"{"code":"0","msg":"","data":[
            {"instId":"ABC-USDT","instType":"SPOT","listTime":"1748822400000","state":"live"},
            {"instId":"XYZ-USDT","instType":"SPOT","listTime":"","state":"live"}
        ]}"#;
        let response: OkxResponse = serde_json::from_str(json).unwrap();
        let listings = parse_instruments(response.data, now());
        assert_eq!(listings.len(), 1);
        assert_eq!(
            listings[0].listing_time,
            Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap()
        );
    }
}
