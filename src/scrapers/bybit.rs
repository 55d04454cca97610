use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::http::HttpFetcher;
use super::{ListingSource, announcement_candidate};
use crate::error::ScrapeError;
use crate::models::Listing;

const ANNOUNCEMENTS_URL: &str =
    "https://api.bybit.com/v5/announcements/index?locale=en-US&type=new_crypto&limit=20";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BybitResponse {
    ret_code: i64,
    ret_msg: String,
    result: Option<BybitResult>,
}

#[derive(Debug, Deserialize)]
struct BybitResult {
    #[serde(default)]
    list: Vec<BybitAnnouncement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BybitAnnouncement {
    title: String,
    #[serde(default, alias = "content")]
    description: String,
    #[serde(default)]
    url: Option<String>,
    publish_time: Option<i64>, // milliseconds
}

/// Bybit "new crypto" announcement feed
pub struct BybitAnnouncements {
    http: HttpFetcher,
}

impl BybitAnnouncements {
    pub const NAME: &'static str = "bybit-announcements";

    pub fn new(http: HttpFetcher) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ListingSource for BybitAnnouncements {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn fetch_candidates(&self) -> Result<Vec<Listing>, ScrapeError> {
        let response: BybitResponse = self.http.get_json(ANNOUNCEMENTS_URL).await?;
        parse_announcements(response, Utc::now())
    }
}

fn parse_announcements(
    response: BybitResponse,
    now: DateTime<Utc>,
) -> Result<Vec<Listing>, ScrapeError> {
    if response.ret_code != 0 {
        return Err(ScrapeError::Api {
            source_name: BybitAnnouncements::NAME.to_string(),
            message: response.ret_msg,
        });
    }

    let announcements = response.result.map(|r| r.list).unwrap_or_default();
    Ok(announcements
        .into_iter()
        .filter_map(|a| {
            announcement_candidate(
                "Bybit",
                &a.title,
                &a.description,
                a.url,
                a.publish_time,
                now,
            )
        })
        .collect())
}
