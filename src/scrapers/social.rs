//! Social and news feeds: Nitter (Twitter mirror) RSS, public Telegram
//! channel previews and news-site RSS.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scraper::{Html, Selector};

use super::http::HttpFetcher;
use super::parser::{
    RssItem, detect_exchange, element_text, extract_symbol, is_listing_announcement_with,
    parse_rss_items,
};
use super::{ListingSource, TimeFallback, listing_time_or};
use crate::error::ScrapeError;
use crate::models::Listing;

const NITTER_BASE: &str = "https://nitter.net";
const TWITTER_BASE: &str = "https://twitter.com";
const TELEGRAM_PREVIEW_BASE: &str = "https://t.me/s";

const NITTER_ITEMS: usize = 10;
const TELEGRAM_MESSAGES: usize = 20;
const NEWS_ITEMS: usize = 20;

/// Posts without an explicit time are assumed to list a day after publication
const SOCIAL_FALLBACK: TimeFallback = TimeFallback::AfterPublished(24);

/// Timeline of one exchange account through a Nitter RSS mirror
pub struct NitterFeed {
    name: String,
    account: String,
    exchange: &'static str,
    keywords: &'static [&'static str],
    http: HttpFetcher,
}

impl NitterFeed {
    pub fn new(
        account: &str,
        exchange: &'static str,
        keywords: &'static [&'static str],
        http: HttpFetcher,
    ) -> Self {
        Self {
            name: format!("nitter-{}", account.to_lowercase()),
            account: account.to_string(),
            exchange,
            keywords,
            http,
        }
    }
}

#[async_trait]
impl ListingSource for NitterFeed {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_candidates(&self) -> Result<Vec<Listing>, ScrapeError> {
        let url = format!("{}/{}/rss", NITTER_BASE, self.account);
        let xml = self.http.get_text(&url).await?;
        Ok(parse_nitter_feed(
            &xml,
            &self.account,
            self.exchange,
            self.keywords,
            Utc::now(),
        ))
    }
}

pub fn parse_nitter_feed(
    xml: &str,
    account: &str,
    exchange: &str,
    keywords: &[&str],
    now: DateTime<Utc>,
) -> Vec<Listing> {
    let profile_url = format!("{}/{}", TWITTER_BASE, account);

    parse_rss_items(xml, NITTER_ITEMS)
        .iter()
        .filter_map(|item| {
            let (symbol, listing_time) = feed_item_candidate(item, keywords, now)?;
            Some(Listing::upcoming(
                exchange,
                symbol,
                listing_time,
                Some(profile_url.clone()),
            ))
        })
        .collect()
}

/// Web preview of a public Telegram channel
pub struct TelegramChannel {
    name: String,
    channel: String,
    exchange: &'static str,
    keywords: &'static [&'static str],
    http: HttpFetcher,
}

impl TelegramChannel {
    pub fn new(
        channel: &str,
        exchange: &'static str,
        keywords: &'static [&'static str],
        http: HttpFetcher,
    ) -> Self {
        Self {
            name: format!("telegram-{}", channel.to_lowercase()),
            channel: channel.to_string(),
            exchange,
            keywords,
            http,
        }
    }

    fn channel_url(&self) -> String {
        format!("{}/{}", TELEGRAM_PREVIEW_BASE, self.channel)
    }
}

#[async_trait]
impl ListingSource for TelegramChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_candidates(&self) -> Result<Vec<Listing>, ScrapeError> {
        let url = self.channel_url();
        let html = self.http.get_text(&url).await?;
        Ok(parse_telegram_channel(
            &html,
            &url,
            self.exchange,
            self.keywords,
            Utc::now(),
        ))
    }
}

/// Candidates from the newest messages of a channel preview page.
///
/// Messages carry no usable publication time, so only an explicit time in
/// the text counts.
pub fn parse_telegram_channel(
    html: &str,
    channel_url: &str,
    exchange: &str,
    keywords: &[&str],
    now: DateTime<Utc>,
) -> Vec<Listing> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("div.tgme_widget_message_text") else {
        return Vec::new();
    };

    // The preview lists messages oldest first
    let messages: Vec<String> = document.select(&selector).map(element_text).collect();
    let newest = &messages[messages.len().saturating_sub(TELEGRAM_MESSAGES)..];

    newest
        .iter()
        .filter(|text| is_listing_announcement_with(text, keywords))
        .filter_map(|text| {
            let symbol = extract_symbol(text)?;
            let listing_time = listing_time_or(text, TimeFallback::Skip, now, None)?;
            (listing_time > now).then(|| {
                Listing::upcoming(exchange, symbol, listing_time, Some(channel_url.to_string()))
            })
        })
        .collect()
}

/// General crypto news RSS; the exchange is recognized from the item text
pub struct NewsRss {
    name: String,
    url: &'static str,
    keywords: &'static [&'static str],
    http: HttpFetcher,
}

impl NewsRss {
    pub fn new(
        name: &str,
        url: &'static str,
        keywords: &'static [&'static str],
        http: HttpFetcher,
    ) -> Self {
        Self {
            name: format!("news-{}", name.to_lowercase()),
            url,
            keywords,
            http,
        }
    }
}

#[async_trait]
impl ListingSource for NewsRss {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_candidates(&self) -> Result<Vec<Listing>, ScrapeError> {
        let xml = self.http.get_text(self.url).await?;
        Ok(parse_news_feed(&xml, self.keywords, Utc::now()))
    }
}

pub fn parse_news_feed(xml: &str, keywords: &[&str], now: DateTime<Utc>) -> Vec<Listing> {
    parse_rss_items(xml, NEWS_ITEMS)
        .iter()
        .filter_map(|item| {
            let exchange = detect_exchange(&item.full_text())?;
            let (symbol, listing_time) = feed_item_candidate(item, keywords, now)?;
            Some(Listing::upcoming(
                exchange,
                symbol,
                listing_time,
                item.link.clone(),
            ))
        })
        .collect()
}

/// Shared RSS item rule: classified text, a symbol, and a future time
fn feed_item_candidate(
    item: &RssItem,
    keywords: &[&str],
    now: DateTime<Utc>,
) -> Option<(String, DateTime<Utc>)> {
    let text = item.full_text();
    if !is_listing_announcement_with(&text, keywords) {
        return None;
    }
    let symbol = extract_symbol(&text)?;
    let listing_time = listing_time_or(&text, SOCIAL_FALLBACK, now, item.published)?;
    (listing_time > now).then_some((symbol, listing_time))
}
