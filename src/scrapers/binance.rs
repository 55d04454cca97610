use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::http::HttpFetcher;
use super::parser::{extract_symbol, html_to_text, is_listing_announcement};
use super::{ListingSource, TimeFallback, listing_time_or};
use crate::error::ScrapeError;
use crate::models::Listing;

const LIST_URL: &str = "https://www.binance.com/bapi/apex/v1/public/apex/cms/article/list/query?type=1&pageNo=1&pageSize=20&catalogId=48";
const DETAIL_URL: &str =
    "https://www.binance.com/bapi/apex/v1/public/cms/article/detail/query?articleCode=";
const ARTICLE_URL: &str = "https://www.binance.com/en/support/announcement/";

#[derive(Debug, Deserialize)]
struct BinanceApiResponse {
    code: String,
    message: Option<String>,
    data: Option<BinanceData>,
    success: bool,
}

#[derive(Debug, Deserialize)]
struct BinanceData {
    #[serde(default)]
    catalogs: Vec<BinanceCatalog>,
}

#[derive(Debug, Deserialize)]
struct BinanceCatalog {
    #[serde(default)]
    articles: Vec<BinanceArticle>,
}

#[derive(Debug, Clone, Deserialize)]
struct BinanceArticle {
    code: String,
    title: String,
}

#[derive(Debug, Deserialize)]
struct BinanceArticleDetail {
    data: Option<BinanceArticleDetailData>,
}

#[derive(Debug, Deserialize)]
struct BinanceArticleDetailData {
    body: Option<String>,
}

/// New-listing catalog of the Binance announcement CMS
pub struct BinanceAnnouncements {
    http: HttpFetcher,
}

impl BinanceAnnouncements {
    pub const NAME: &'static str = "binance-announcements";

    pub fn new(http: HttpFetcher) -> Self {
        Self { http }
    }

    async fn fetch_body_text(&self, code: &str) -> Result<String, ScrapeError> {
        let detail: BinanceArticleDetail = self
            .http
            .get_json(&format!("{}{}", DETAIL_URL, code))
            .await?;
        let body = detail.data.and_then(|d| d.body).unwrap_or_default();
        Ok(html_to_text(&body))
    }
}

#[async_trait]
impl ListingSource for BinanceAnnouncements {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn fetch_candidates(&self) -> Result<Vec<Listing>, ScrapeError> {
        let response: BinanceApiResponse = self.http.get_json(LIST_URL).await?;
        let articles = articles_from_response(response)?;

        let mut listings = Vec::new();
        for article in articles.iter().filter(|a| is_candidate_title(&a.title)) {
            // The body carries the actual trading time; the title alone rarely does
            let body = match self.fetch_body_text(&article.code).await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(
                        "Failed to fetch detail for Binance article {}: {}",
                        article.code,
                        e
                    );
                    String::new()
                }
            };

            if let Some(listing) = listing_from_article(article, &body, Utc::now()) {
                listings.push(listing);
            }
        }

        Ok(listings)
    }
}

fn articles_from_response(response: BinanceApiResponse) -> Result<Vec<BinanceArticle>, ScrapeError> {
    if response.code != "000000" || !response.success {
        return Err(ScrapeError::Api {
            source_name: BinanceAnnouncements::NAME.to_string(),
            message: response
                .message
                .unwrap_or_else(|| format!("code {}", response.code)),
        });
    }

    Ok(response
        .data
        .and_then(|d| d.catalogs.into_iter().next())
        .map(|c| c.articles)
        .unwrap_or_default())
}

fn is_candidate_title(title: &str) -> bool {
    is_listing_announcement(title) && extract_symbol(title).is_some()
}

/// Build a candidate from one article; `body_text` may be empty.
fn listing_from_article(
    article: &BinanceArticle,
    body_text: &str,
    now: DateTime<Utc>,
) -> Option<Listing> {
    if !is_listing_announcement(&article.title) {
        return None;
    }
    let symbol = extract_symbol(&article.title)?;

    let text = format!("{} {}", body_text, article.title);
    let listing_time = listing_time_or(&text, TimeFallback::Skip, now, None)?;
    if listing_time <= now {
        return None;
    }

    Some(Listing::upcoming(
        "Binance",
        symbol,
        listing_time,
        Some(format!("{}{}", ARTICLE_URL, article.code)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const LIST_FIXTURE: &str = r#"{
        "code": "000000",
        "message": null,
        "messageDetail": null,
        "data": {
            "catalogs": [{
                "catalogId": 48,
                "catalogName": "New Cryptocurrency Listing",
                "articles": [
                    {"id": 1, "code": "abc123", "title": "Binance Will List Pepe (PEPE)", "type": 1, "releaseDate": 1748772000000},
                    {"id": 2, "code": "def456", "title": "Notice on Wallet Maintenance", "type": 1, "releaseDate": 1748772000000}
                ]
            }]
        },
        "success": true
    }"#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_articles_from_response() {
        let response: BinanceApiResponse = serde_json::from_str(LIST_FIXTURE).unwrap();
        let articles = articles_from_response(response).unwrap();
        assert_eq!(articles.len(), 2);
        assert!(is_candidate_title(&articles[0].title));
        assert!(!is_candidate_title(&articles[1].title));
    }

    #[test]
    fn test_api_error_code() {
        let response: BinanceApiResponse = serde_json::from_str(
            r#"{"code":"100001","message":"rate limited","data":null,"success":false}"#,
        )
        .unwrap();
        let err = articles_from_response(response).unwrap_err();
        assert!(err.to_string().contains("rate limited"));
    }

    #[test]
    fn test_listing_from_article_uses_body_time() {
        let response: BinanceApiResponse = serde_json::from_str(LIST_FIXTURE).unwrap();
        let articles = articles_from_response(response).unwrap();

        let body = "Binance will open trading for PEPE/USDT at 2025-06-02 08:00 (UTC).";
        let listing = listing_from_article(&articles[0], body, now()).unwrap();
        assert_eq!(listing.exchange, "Binance");
        assert_eq!(listing.symbol, "PEPE");
        assert_eq!(
            listing.listing_time,
            Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap()
        );
        assert_eq!(
            listing.announcement_url.as_deref(),
            Some("https://www.binance.com/en/support/announcement/abc123")
        );
    }

    #[test]
    fn test_listing_from_article_without_time_is_skipped() {
        let response: BinanceApiResponse = serde_json::from_str(LIST_FIXTURE).unwrap();
        let articles = articles_from_response(response).unwrap();
        assert!(listing_from_article(&articles[0], "", now()).is_none());
    }
}
