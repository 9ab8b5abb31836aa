use crate::cache::ReportCache;
use crate::config::ReportsConfig;
use anyhow::{Context as AnyhowContext, Result};
use reports_source::{SqliteSource, TabularSource};
use reports_versions::{HttpFetcher, PageFetcher};
use std::sync::Arc;

/// Everything a command needs, opened once per process and shared by all
/// requests. Nothing in here is global; tests build their own.
pub struct CommandContext {
    config: ReportsConfig,
    primary: Arc<dyn TabularSource>,
    mirror: Option<Arc<SqliteSource>>,
    cache: ReportCache,
    fetcher: Arc<dyn PageFetcher>,
}

impl CommandContext {
    pub fn open(config: ReportsConfig) -> Result<Self> {
        let primary = config.open_primary()?;
        let mirror = config.open_mirror()?;
        let fetcher = HttpFetcher::new(config.http_timeout())
            .context("Failed to build knowledge-base HTTP client")?;
        Ok(Self::new(config, primary, mirror, Arc::new(fetcher)))
    }

    pub fn new(
        config: ReportsConfig,
        primary: Arc<dyn TabularSource>,
        mirror: Option<Arc<SqliteSource>>,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Self {
        let cache = ReportCache::new(config.cache_config());
        Self {
            config,
            primary,
            mirror,
            cache,
            fetcher,
        }
    }

    pub fn config(&self) -> &ReportsConfig {
        &self.config
    }

    pub fn config_path(&self) -> Option<String> {
        self.config.path.as_ref().map(|p| p.display().to_string())
    }

    pub fn primary(&self) -> &Arc<dyn TabularSource> {
        &self.primary
    }

    pub fn mirror(&self) -> Option<&Arc<SqliteSource>> {
        self.mirror.as_ref()
    }

    /// Where reports are assembled from: the mirror when it is configured to
    /// serve reads, the primary source otherwise.
    pub fn read_source(&self) -> Arc<dyn TabularSource> {
        match &self.mirror {
            Some(mirror) if self.config.mirror.serve_reads => {
                Arc::clone(mirror) as Arc<dyn TabularSource>
            }
            _ => Arc::clone(&self.primary),
        }
    }

    pub fn cache(&self) -> &ReportCache {
        &self.cache
    }

    pub fn fetcher(&self) -> Arc<dyn PageFetcher> {
        Arc::clone(&self.fetcher)
    }
}
