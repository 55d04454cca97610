use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::http::HttpFetcher;
use super::{ListingSource, announcement_candidate};
use crate::error::ScrapeError;
use crate::models::Listing;

const ANNOUNCEMENTS_URL: &str =
    "https://api.kucoin.com/api/v3/announcements?annType=new-listings&currentPage=1&pageSize=20&lang=en_US";

#[derive(Debug, Deserialize)]
struct KucoinResponse {
    code: String,
    #[serde(default)]
    msg: Option<String>,
    data: Option<KucoinData>,
}

#[derive(Debug, Deserialize)]
struct KucoinData {
    #[serde(default)]
    items: Vec<KucoinAnnouncement>,
}

#[derive(Debug, Deserialize)]
struct KucoinAnnouncement {
    #[serde(rename = "annTitle", alias = "title")]
    title: String,
    #[serde(default, rename = "annDesc", alias = "content")]
    content: String,
    #[serde(default, rename = "annUrl", alias = "url")]
    url: Option<String>,
    #[serde(default, rename = "cTime", alias = "publishTime")]
    publish_time: Option<i64>, // milliseconds
}

/// KuCoin new-listings announcement feed
pub struct KucoinAnnouncements {
    http: HttpFetcher,
}

impl KucoinAnnouncements {
    pub const NAME: &'static str = "kucoin-announcements";

    pub fn new(http: HttpFetcher) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ListingSource for KucoinAnnouncements {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn fetch_candidates(&self) -> Result<Vec<Listing>, ScrapeError> {
        let response: KucoinResponse = self.http.get_json(ANNOUNCEMENTS_URL).await?;
        parse_announcements(response, Utc::now())
    }
}

fn parse_announcements(
    response: KucoinResponse,
    now: DateTime<Utc>,
) -> Result<Vec<Listing>, ScrapeError> {
    if response.code != "200000" {
        return Err(ScrapeError::Api {
            source_name: KucoinAnnouncements::NAME.to_string(),
            message: response.msg.unwrap_or(response.code),
        });
    }

    let items = response.data.map(|d| d.items).unwrap_or_default();
    Ok(items
        .into_iter()
        .filter_map(|a| {
            announcement_candidate("KuCoin", &a.title, &a.content, a.url, a.publish_time, now)
        })
        .collect())
}
