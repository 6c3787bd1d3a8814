mod html;

pub use html::{extract_update_text, FALLBACK_SELECTORS, PRIMARY_SELECTOR};

use crate::config::Config;
use crate::error::{network_error, SyncResult};
use crate::utils::RetryPolicy;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{error, info};

/// Browser-like user agent; the updates page rejects obvious bots
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Source of the latest announcement text
#[async_trait]
pub trait TextSource: Send + Sync {
    /// Fetch the current update text, `None` when nothing usable was retrieved
    async fn fetch(&self, url: &str) -> Option<String>;
}

/// Scrapes the FTMO trading updates page
pub struct FtmoScraper {
    client: Client,
    retry: RetryPolicy,
}

impl FtmoScraper {
    /// Create a scraper from the run configuration
    pub fn new(config: &Config) -> SyncResult<Self> {
        Self::with_policy(
            config.fetch_timeout,
            RetryPolicy::new(config.fetch_max_attempts, config.fetch_retry_delay),
        )
    }

    /// Create a scraper with an explicit timeout and retry policy
    pub fn with_policy(timeout: Duration, retry: RetryPolicy) -> SyncResult<Self> {
        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, retry })
    }

    /// One GET of the page body; non-2xx statuses count as failures
    async fn fetch_page(&self, url: &str) -> SyncResult<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| network_error(&format!("Failed to fetch {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(network_error(&format!("Failed to fetch {}: HTTP {}", url, status)));
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl TextSource for FtmoScraper {
    async fn fetch(&self, url: &str) -> Option<String> {
        info!("Fetching trading updates from {}", url);

        let page = match self
            .retry
            .run("Trading updates fetch", move || self.fetch_page(url))
            .await
        {
            Ok(page) => page,
            Err(e) => {
                error!("Giving up on {}: {}", url, e);
                return None;
            }
        };

        match extract_update_text(&page) {
            Ok(text) => {
                info!("Retrieved update text ({} chars)", text.len());
                Some(text)
            }
            Err(e) => {
                error!("{}", e);
                None
            }
        }
    }
}
