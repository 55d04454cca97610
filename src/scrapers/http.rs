use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;

use super::ScraperConfig;
use crate::error::ScrapeError;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// HTTP client shared by all sources: browser-like headers, timeout and
/// exponential-backoff retries.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    config: ScraperConfig,
}

impl HttpFetcher {
    pub fn new(config: ScraperConfig) -> Result<Self, ScrapeError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,application/json;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()?;

        Ok(Self { client, config })
    }

    pub async fn get_text(&self, url: &str) -> Result<String, ScrapeError> {
        let response = self.fetch_with_retry(url).await?;
        Ok(response.text().await?)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ScrapeError> {
        let body = self.get_text(url).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn fetch_with_retry(&self, url: &str) -> Result<reqwest::Response, ScrapeError> {
        let mut delay = tokio::time::Duration::from_millis(self.config.retry_delay_ms);

        for attempt in 0..self.config.retry_max {
            let last_attempt = attempt + 1 == self.config.retry_max;

            match self.client.get(url).send().await {
                Ok(response) => {
                    if response.status().is_success() {
                        return Ok(response);
                    }

                    if last_attempt {
                        return Err(ScrapeError::Status {
                            url: url.to_string(),
                            status: response.status().as_u16(),
                        });
                    }
                }
                Err(e) => {
                    if last_attempt {
                        return Err(e.into());
                    }
                }
            }

            tracing::warn!(
                "Retry {}/{} for {}. Waiting {:?}",
                attempt + 1,
                self.config.retry_max,
                url,
                delay
            );
            tokio::time::sleep(delay).await;
            delay *= 2;
        }

        Err(ScrapeError::RetriesExhausted {
            url: url.to_string(),
        })
    }
}
