use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html};
use url::Url;

/// Phrases that mark a title/snippet as a listing announcement
pub const LISTING_KEYWORDS: &[&str] = &[
    "listing",
    "will list",
    "new token",
    "new coin",
    "trading launch",
    "spot trading",
    "trading starts",
    "now available",
    "added to",
    "launch",
];

/// Uppercase runs that look like tickers but never are the listed token
pub const SYMBOL_STOPLIST: &[&str] = &[
    "USD", "USDT", "USDC", "BUSD", "EUR", "BTC", "ETH", "THE", "NEW", "AND", "FOR", "YOU", "ALL",
    // venues
    "BINANCE", "BYBIT", "KUCOIN", "MEXC", "OKX",
    // clock and zone words
    "UTC", "GMT", "AM", "PM", "CET", "CEST", "EST", "EDT", "PST", "PDT", "SGT", "HKT",
];

/// Keyword -> display name for venues recognized in free text
pub const EXCHANGE_VOCABULARY: &[(&str, &str)] = &[
    ("binance", "Binance"),
    ("bybit", "Bybit"),
    ("kucoin", "KuCoin"),
    ("mexc", "MEXC"),
    ("okx", "OKX"),
];

lazy_static! {
    // In preference order: "(ABC)", "ABC token", bare "ABC"
    static ref SYMBOL_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"\(([A-Z]{2,10})\)").unwrap(),
        Regex::new(r"\b([A-Z]{2,10})\s+(?:[Tt]oken|[Cc]oin)\b").unwrap(),
        Regex::new(r"\b([A-Z]{2,10})\b").unwrap(),
    ];

    static ref RSS_ITEM: Regex = Regex::new(r"(?is)<item\b[^>]*>(.*?)</item>").unwrap();
    static ref RSS_TITLE: Regex = Regex::new(r"(?is)<title\b[^>]*>(.*?)</title>").unwrap();
    static ref RSS_DESCRIPTION: Regex = Regex::new(r"(?is)<description\b[^>]*>(.*?)</description>").unwrap();
    static ref RSS_LINK: Regex = Regex::new(r"(?is)<link\b[^>]*>(.*?)</link>").unwrap();
    static ref RSS_PUB_DATE: Regex = Regex::new(r"(?is)<pubDate\b[^>]*>(.*?)</pubDate>").unwrap();
    static ref CDATA: Regex = Regex::new(r"(?s)^\s*<!\[CDATA\[(.*)\]\]>\s*$").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Keyword classifier for announcement titles and snippets
pub fn is_listing_announcement(text: &str) -> bool {
    is_listing_announcement_with(text, &[])
}

/// Same as [`is_listing_announcement`], with source-specific extra phrases
pub fn is_listing_announcement_with(text: &str, extra_keywords: &[&str]) -> bool {
    let lower = text.to_lowercase();
    LISTING_KEYWORDS
        .iter()
        .chain(extra_keywords.iter())
        .any(|keyword| lower.contains(&keyword.to_lowercase()))
}

pub fn is_stoplisted(symbol: &str) -> bool {
    SYMBOL_STOPLIST.contains(&symbol)
}

/// 2-10 uppercase ASCII letters, not stoplisted
pub fn is_valid_symbol(symbol: &str) -> bool {
    (2..=10).contains(&symbol.len())
        && symbol.chars().all(|c| c.is_ascii_uppercase())
        && !is_stoplisted(symbol)
}

/// Extract the token ticker from a title, skipping stoplisted runs
pub fn extract_symbol(text: &str) -> Option<String> {
    SYMBOL_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures_iter(text)
            .map(|cap| cap[1].to_string())
            .find(|symbol| is_valid_symbol(symbol))
    })
}

/// First exchange from the vocabulary mentioned in `text` (earliest mention wins)
pub fn detect_exchange(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    EXCHANGE_VOCABULARY
        .iter()
        .filter_map(|(keyword, display)| lower.find(keyword).map(|pos| (pos, *display)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, display)| display)
}

/// Exact (case-insensitive) vocabulary lookup, e.g. for an `exchange` JSON field
pub fn normalize_exchange(name: &str) -> Option<&'static str> {
    let lower = name.trim().to_lowercase();
    EXCHANGE_VOCABULARY
        .iter()
        .find(|(keyword, _)| *keyword == lower)
        .map(|(_, display)| *display)
}

/// Resolve `link` against the page it was found on.
///
/// An empty or unresolvable link yields the page URL itself.
pub fn build_full_url(link: &str, base_url: &str) -> String {
    let link = link.trim();
    if link.is_empty() {
        return base_url.to_string();
    }

    match Url::parse(base_url).and_then(|base| base.join(link)) {
        Ok(url) => url.to_string(),
        Err(_) => base_url.to_string(),
    }
}

/// Visible text of an element, whitespace collapsed
pub fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Strip markup and decode entities from an HTML fragment
pub fn html_to_text(fragment: &str) -> String {
    let parsed = Html::parse_fragment(fragment);
    collapse_whitespace(&parsed.root_element().text().collect::<String>())
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RssItem {
    pub title: String,
    pub description: String,
    pub link: Option<String>,
    pub published: Option<DateTime<Utc>>,
}

impl RssItem {
    /// Title and description joined, the text listing heuristics run on
    pub fn full_text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }
}

/// Parse up to `limit` `<item>` entries of an RSS 2.0 feed.
///
/// Tolerant of CDATA sections and entity-escaped HTML in descriptions.
pub fn parse_rss_items(xml: &str, limit: usize) -> Vec<RssItem> {
    RSS_ITEM
        .captures_iter(xml)
        .take(limit)
        .map(|cap| {
            let block = &cap[1];
            let link = rss_field(block, &RSS_LINK).filter(|l| !l.is_empty());
            let published = rss_field(block, &RSS_PUB_DATE).and_then(|raw| {
                DateTime::parse_from_rfc2822(&raw)
                    .ok()
                    .map(|d| d.with_timezone(&Utc))
            });

            RssItem {
                title: rss_field(block, &RSS_TITLE).unwrap_or_default(),
                description: rss_field(block, &RSS_DESCRIPTION).unwrap_or_default(),
                link,
                published,
            }
        })
        .collect()
}

fn rss_field(block: &str, tag: &Regex) -> Option<String> {
    let raw = tag.captures(block)?.get(1)?.as_str();
    let inner = match CDATA.captures(raw) {
        Some(cdata) => cdata[1].to_string(),
        None => raw.to_string(),
    };

    // Entity-escaped HTML decodes to markup on the first pass
    let mut text = html_to_text(&inner);
    if text.contains('<') {
        text = html_to_text(&text);
    }
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_is_listing_announcement() {
        assert!(is_listing_announcement("Binance Will List Pepe (PEPE)"));
        assert!(is_listing_announcement("NEW TOKEN alert"));
        assert!(is_listing_announcement("Spot trading for XYZ is now available"));
        assert!(!is_listing_announcement("Scheduled system maintenance"));
        assert!(is_listing_announcement_with(
            "Trading will start soon",
            &["trading will start"]
        ));
    }

    #[test]
    fn test_extract_symbol_prefers_parenthesized() {
        assert_eq!(
            extract_symbol("NEW listing: Binance Will List Pepe (PEPE)"),
            Some("PEPE".to_string())
        );
    }

    #[test]
    fn test_extract_symbol_skips_stoplisted() {
        assert_eq!(extract_symbol("THE USD pair for ABC"), Some("ABC".to_string()));
        assert_eq!(extract_symbol("(USDT) margin for (ZRO)"), Some("ZRO".to_string()));
        assert_eq!(extract_symbol("USD and THE"), None);
        assert_eq!(extract_symbol("BTC ETH USDT"), None);
    }

    #[test]
    fn test_extract_symbol_before_token_word() {
        assert_eq!(extract_symbol("the XYZ token arrives"), Some("XYZ".to_string()));
    }

    #[test]
    fn test_token_word_beats_bare_run() {
        assert_eq!(
            extract_symbol("HOT PICK: the MOODENG token goes live"),
            Some("MOODENG".to_string())
        );
    }

    #[test]
    fn test_extract_symbol_skips_venues_and_clock_words() {
        assert_eq!(extract_symbol("MEXC Will List Sophon on June 10, 2025"), None);
        assert_eq!(extract_symbol("OKX to list Zeta for spot trading"), None);
        assert_eq!(extract_symbol("Listing: trading starts 10:00 AM UTC"), None);
        assert_eq!(
            extract_symbol("MEXC Will List Sophon SOPH at 10:00 PM"),
            Some("SOPH".to_string())
        );
    }

    #[test]
    fn test_extract_symbol_bounds() {
        assert_eq!(extract_symbol("A is not a ticker"), None);
        assert_eq!(extract_symbol("ABCDEFGHIJK is too long"), None);
        assert_eq!(extract_symbol("lowercase only"), None);
    }

    #[test]
    fn test_is_valid_symbol() {
        assert!(is_valid_symbol("PEPE"));
        assert!(!is_valid_symbol("USDT"));
        assert!(!is_valid_symbol("Pepe"));
        assert!(!is_valid_symbol("P3PE"));
        assert!(!is_valid_symbol("X"));
    }

    #[test]
    fn test_detect_exchange() {
        assert_eq!(
            detect_exchange("Cointelegraph: OKX and Binance to list ABC"),
            Some("OKX")
        );
        assert_eq!(detect_exchange("listed on KUCOIN today"), Some("KuCoin"));
        assert_eq!(detect_exchange("listed on Coinbase"), None);
    }

    #[test]
    fn test_normalize_exchange() {
        assert_eq!(normalize_exchange("mexc"), Some("MEXC"));
        assert_eq!(normalize_exchange(" Bybit "), Some("Bybit"));
        assert_eq!(normalize_exchange("gate"), None);
    }

    #[test]
    fn test_build_full_url() {
        let base = "https://support.mexc.com/hc/en-us/sections/360000258333-New-Listings";
        assert_eq!(
            build_full_url("/hc/en-us/articles/1", base),
            "https://support.mexc.com/hc/en-us/articles/1"
        );
        assert_eq!(
            build_full_url("https://www.mexc.com/x", base),
            "https://www.mexc.com/x"
        );
        assert_eq!(build_full_url("", base), base);
        assert_eq!(
            build_full_url("articles/2", "https://blog.mexc.com/category/listing/"),
            "https://blog.mexc.com/category/listing/articles/2"
        );
    }

    #[test]
    fn test_html_to_text() {
        assert_eq!(
            html_to_text("<p>Trading   starts <b>2025-07-01 10:00</b> &amp; more</p>"),
            "Trading starts 2025-07-01 10:00 & more"
        );
    }

    #[test]
    fn test_parse_rss_items() {
        let xml = r#"<?xml version="1.0"?>
<rss><channel><title>feed</title>
<item>
  <title><![CDATA[Bybit Will List ABC (ABC)]]></title>
  <description>&lt;p&gt;Spot trading starts in 3 hours&lt;/p&gt;</description>
  <link>https://example.com/abc</link>
  <pubDate>Sun, 01 Jun 2025 10:00:00 GMT</pubDate>
</item>
<item><title>Second</title></item>
<item><title>Third</title></item>
</channel></rss>"#;

        let items = parse_rss_items(xml, 2);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Bybit Will List ABC (ABC)");
        assert_eq!(items[0].description, "Spot trading starts in 3 hours");
        assert_eq!(items[0].link.as_deref(), Some("https://example.com/abc"));
        assert_eq!(
            items[0].published,
            Some(Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap())
        );
        assert_eq!(items[1].title, "Second");
        assert_eq!(items[1].description, "");
        assert_eq!(items[1].link, None);
    }
}
