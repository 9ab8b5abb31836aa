use crate::error::{Result, VersionsError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// Retrieves a knowledge-base page as text.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// HTTP(S) fetcher. `file://` URLs are read from disk, which lets offline
/// deployments point at a saved copy of the page.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("fleet-reports/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        if let Some(path) = url.strip_prefix("file://") {
            log::debug!("Reading knowledge-base page from {path}");
            return Ok(tokio::fs::read_to_string(path).await?);
        }
        log::debug!("GET {url}");
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}

/// Serves canned pages; unknown URLs fail like an unreachable host.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    pages: HashMap<String, String>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| VersionsError::Other(format!("no page registered for {url}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_urls_read_local_pages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kb.html");
        std::fs::write(&path, "<table></table>").unwrap();

        let fetcher = HttpFetcher::new(Duration::from_secs(1)).unwrap();
        let body = fetcher
            .fetch(&format!("file://{}", path.display()))
            .await
            .unwrap();
        assert_eq!(body, "<table></table>");
    }

    #[tokio::test]
    async fn static_fetcher_rejects_unknown_urls() {
        let fetcher = StaticFetcher::new().with_page("http://kb/esxi", "x");
        assert_eq!(fetcher.fetch("http://kb/esxi").await.unwrap(), "x");
        assert!(fetcher.fetch("http://kb/other").await.is_err());
    }
}
