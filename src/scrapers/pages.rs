use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};

use super::http::HttpFetcher;
use super::parser::{build_full_url, element_text, extract_symbol, is_listing_announcement};
use super::{ListingSource, TimeFallback, listing_time_or};
use crate::error::ScrapeError;
use crate::models::Listing;

/// Where to find announcement entries on one kind of page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLayout {
    /// One match per announcement entry
    pub item: &'static str,
    /// First descendant carrying the title
    pub title: &'static str,
    /// Use the entry's own text when no title element exists
    pub title_from_item: bool,
}

impl PageLayout {
    /// Help-center style section listing (Zendesk-like)
    pub const MEXC_SUPPORT: PageLayout = PageLayout {
        item: "a.article-list-link, a.article-title, a.support-article, \
               div.article-list-link, div.article-title, div.support-article",
        title: "h3, h4, span, div",
        title_from_item: true,
    };

    pub const OKX_SUPPORT: PageLayout = PageLayout {
        item: "a[href], div[href], div.article, div.support-article, \
               article.article, article.support-article",
        title: "h1, h2, h3, h4, span",
        title_from_item: true,
    };

    /// Blog/academy post lists: link lives on the title
    pub const MEXC_BLOG: PageLayout = PageLayout {
        item: "article.post, article.blog-post, article.entry, div.post, div.blog-post, div.entry",
        title: "h1, h2, h3, a",
        title_from_item: false,
    };

    pub const OKX_ACADEMY: PageLayout = PageLayout {
        item: "article.article, article.post, article.academy-post, \
               div.article, div.post, div.academy-post",
        title: "h1, h2, h3, a",
        title_from_item: false,
    };
}

#[derive(Debug, Clone, Copy)]
pub struct PageSpec {
    pub url: &'static str,
    pub layout: PageLayout,
}

/// Exchange announcement pages scraped as HTML.
///
/// Pages are fetched one after another; a failing page is logged and the
/// rest still contribute candidates.
pub struct AnnouncementPageSource {
    name: &'static str,
    exchange: &'static str,
    pages: Vec<PageSpec>,
    fallback: TimeFallback,
    http: HttpFetcher,
}

impl AnnouncementPageSource {
    pub const MEXC_NAME: &'static str = "mexc-pages";
    pub const OKX_NAME: &'static str = "okx-pages";

    pub fn mexc(http: HttpFetcher) -> Self {
        Self {
            name: Self::MEXC_NAME,
            exchange: "MEXC",
            pages: vec![
                PageSpec {
                    url: "https://support.mexc.com/hc/en-us/sections/360000258333-New-Listings",
                    layout: PageLayout::MEXC_SUPPORT,
                },
                PageSpec {
                    url: "https://www.mexc.com/support/articles/360035513073",
                    layout: PageLayout::MEXC_SUPPORT,
                },
                PageSpec {
                    url: "https://blog.mexc.com/category/listing/",
                    layout: PageLayout::MEXC_BLOG,
                },
            ],
            fallback: TimeFallback::TomorrowAt(10),
            http,
        }
    }

    pub fn okx(http: HttpFetcher) -> Self {
        Self {
            name: Self::OKX_NAME,
            exchange: "OKX",
            pages: vec![
                PageSpec {
                    url: "https://www.okx.com/support/hc/en-us/sections/115000275131-New-Crypto-Listings",
                    layout: PageLayout::OKX_SUPPORT,
                },
                PageSpec {
                    url: "https://www.okx.com/academy/en/category/announcements",
                    layout: PageLayout::OKX_ACADEMY,
                },
                PageSpec {
                    url: "https://www.okx.com/help/new-listings",
                    layout: PageLayout::OKX_SUPPORT,
                },
            ],
            fallback: TimeFallback::TomorrowAt(12),
            http,
        }
    }
}

#[async_trait]
impl ListingSource for AnnouncementPageSource {
    fn name(&self) -> &str {
        self.name
    }

    async fn fetch_candidates(&self) -> Result<Vec<Listing>, ScrapeError> {
        let mut listings = Vec::new();

        for page in &self.pages {
            match self.http.get_text(page.url).await {
                Ok(html) => {
                    let found = parse_page(&html, page, self.exchange, self.fallback, Utc::now());
                    tracing::debug!(source = self.name, url = page.url, count = found.len(), "Parsed page");
                    listings.extend(found);
                }
                Err(e) => {
                    tracing::warn!(source = self.name, url = page.url, "Failed to fetch page: {}", e);
                }
            }
        }

        Ok(listings)
    }
}

/// Extract future listings from one announcement page.
pub fn parse_page(
    html: &str,
    page: &PageSpec,
    exchange: &str,
    fallback: TimeFallback,
    now: DateTime<Utc>,
) -> Vec<Listing> {
    let document = Html::parse_document(html);
    let (Ok(item_selector), Ok(title_selector)) = (
        Selector::parse(page.layout.item),
        Selector::parse(page.layout.title),
    ) else {
        tracing::error!(url = page.url, "Invalid selector in page layout");
        return Vec::new();
    };

    let mut listings = Vec::new();
    for item in document.select(&item_selector) {
        let title_element = match item.select(&title_selector).next() {
            Some(element) => Some(element),
            None if page.layout.title_from_item => Some(item),
            None => None,
        };
        let Some(title_element) = title_element else {
            continue;
        };

        let title = element_text(title_element);
        if !is_listing_announcement(&title) {
            continue;
        }
        let Some(symbol) = extract_symbol(&title) else {
            continue;
        };

        let Some(listing_time) = listing_time_or(&title, fallback, now, None) else {
            continue;
        };
        if listing_time <= now {
            continue;
        }

        let link = anchor_href(item)
            .or_else(|| anchor_href(title_element))
            .unwrap_or_default();

        listings.push(Listing::upcoming(
            exchange,
            symbol,
            listing_time,
            Some(build_full_url(link, page.url)),
        ));
    }

    listings
}

fn anchor_href(element: ElementRef<'_>) -> Option<&str> {
    if element.value().name() == "a" {
        element.value().attr("href")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    const SUPPORT_URL: &str = "https://support.mexc.com/hc/en-us/sections/360000258333-New-Listings";

    fn support_page() -> PageSpec {
        PageSpec {
            url: SUPPORT_URL,
            layout: PageLayout::MEXC_SUPPORT,
        }
    }

    #[test]
    fn test_support_page_with_date_in_title() {
        let html = r#"<html><body><ul>
            <li><a class="article-list-link" href="/hc/en-us/articles/101">
                MEXC Will List Sophon (SOPH) on June 10, 2025
            </a></li>
            <li><a class="article-list-link" href="/hc/en-us/articles/102">
                Maintenance notice
            </a></li>
        </ul></body></html>"#;

        let listings = parse_page(html, &support_page(), "MEXC", TimeFallback::TomorrowAt(10), now());
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].exchange, "MEXC");
        assert_eq!(listings[0].symbol, "SOPH");
        assert_eq!(
            listings[0].listing_time,
            Utc.with_ymd_and_hms(2025, 6, 10, 0, 0, 0).unwrap()
        );
        assert_eq!(
            listings[0].announcement_url.as_deref(),
            Some("https://support.mexc.com/hc/en-us/articles/101")
        );
    }

    #[test]
    fn test_support_page_fallback_time() {
        let html = r#"<div class="support-article"><h3>New Listing: ABC Token</h3></div>"#;

        let listings = parse_page(html, &support_page(), "MEXC", TimeFallback::TomorrowAt(10), now());
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].symbol, "ABC");
        assert_eq!(
            listings[0].listing_time,
            Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap()
        );
        // Not an anchor: the page itself is the link
        assert_eq!(listings[0].announcement_url.as_deref(), Some(SUPPORT_URL));
    }

    #[test]
    fn test_blog_layout_link_on_title() {
        let page = PageSpec {
            url: "https://blog.mexc.com/category/listing/",
            layout: PageLayout::MEXC_BLOG,
        };
        let html = r#"<main>
            <article class="post">
                <h2><a href="https://blog.mexc.com/xyz-listing/">XYZ listing goes live</a></h2>
            </article>
            <article class="post"><p>No heading here about a listing of QQQ</p></article>
        </main>"#;

        let listings = parse_page(html, &page, "MEXC", TimeFallback::TomorrowAt(10), now());
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].symbol, "XYZ");
        // h2 is the title element, it is not an anchor
        assert_eq!(
            listings[0].announcement_url.as_deref(),
            Some("https://blog.mexc.com/category/listing/")
        );
    }

    #[test]
    fn test_past_dates_are_dropped() {
        let html = r#"<a class="article-title" href="/a/1">Listing of OLD on May 1, 2025</a>"#;
        let listings = parse_page(html, &support_page(), "MEXC", TimeFallback::TomorrowAt(10), now());
        assert!(listings.is_empty());
    }

    #[test]
    fn test_okx_support_layout() {
        let page = PageSpec {
            url: "https://www.okx.com/help/new-listings",
            layout: PageLayout::OKX_SUPPORT,
        };
        let html = r#"<ul>
            <li><a href="/help/okx-to-list-zeta"><span>OKX to list Zeta (ZETA) for spot trading at 10:00 UTC on June 5</span></a></li>
            <li><a href="/help/other"><span>Fee schedule update</span></a></li>
        </ul>"#;

        let listings = parse_page(html, &page, "OKX", TimeFallback::TomorrowAt(12), now());
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].symbol, "ZETA");
        assert_eq!(
            listings[0].listing_time,
            Utc.with_ymd_and_hms(2025, 6, 5, 10, 0, 0).unwrap()
        );
        assert_eq!(
            listings[0].announcement_url.as_deref(),
            Some("https://www.okx.com/help/okx-to-list-zeta")
        );
    }
}
