use crate::cache::{parse_cache_backend, CacheBackend, CacheConfig};
use anyhow::{Context as AnyhowContext, Result};
use clap::ValueEnum;
use reports_assembler::{catalogue_datasets, KnowledgeBaseUrls, ESXI_KB_URL, VCENTER_KB_URL};
use reports_source::{ObjectStoreSource, SqliteSource, TabularSource};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const CONFIG_ENV: &str = "REPORTS_CONFIG";
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_CACHE_DIR: &str = ".reports/cache";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;
pub const MONTHLY_CACHE_TTL_SECS: u64 = 1800;
pub const DEFAULT_CACHE_CAPACITY: usize = 32;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// `<name>.csv` files under a local directory
    #[default]
    Local,
    /// Process-local object store, empty at start
    Memory,
    /// `<name>.csv` objects in an S3 bucket
    S3,
}

impl SourceKind {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" | "file" => Ok(SourceKind::Local),
            "memory" => Ok(SourceKind::Memory),
            "s3" => Ok(SourceKind::S3),
            other => anyhow::bail!("Unsupported source kind: {other}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub data_dir: PathBuf,
    pub bucket: Option<String>,
    pub region: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Local,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            bucket: None,
            region: None,
        }
    }
}

/// Relational read mirror. Reports are assembled from the mirror only when
/// `serve_reads` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MirrorConfig {
    pub sqlite_path: Option<PathBuf>,
    pub serve_reads: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSection {
    pub backend: CacheBackend,
    pub dir: PathBuf,
    pub ttl_seconds: u64,
    pub monthly_ttl_seconds: u64,
    pub capacity: usize,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            dir: PathBuf::from(DEFAULT_CACHE_DIR),
            ttl_seconds: DEFAULT_CACHE_TTL_SECS,
            monthly_ttl_seconds: MONTHLY_CACHE_TTL_SECS,
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KnowledgeBaseConfig {
    pub esxi_url: String,
    pub vcenter_url: String,
    pub timeout_seconds: u64,
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            esxi_url: ESXI_KB_URL.to_string(),
            vcenter_url: VCENTER_KB_URL.to_string(),
            timeout_seconds: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResyncConfig {
    pub tables: Vec<String>,
}

impl Default for ResyncConfig {
    fn default() -> Self {
        Self {
            tables: catalogue_datasets()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportsConfig {
    pub source: SourceConfig,
    pub mirror: MirrorConfig,
    pub cache: CacheSection,
    pub knowledge_base: KnowledgeBaseConfig,
    pub resync: ResyncConfig,
    #[serde(skip)]
    pub path: Option<PathBuf>,
}

/// Command line values that win over the file and the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub source: Option<SourceKind>,
    pub data_dir: Option<PathBuf>,
    pub sqlite: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub cache_ttl_seconds: Option<u64>,
    pub cache_backend: Option<String>,
}

impl ReportsConfig {
    /// File (explicit path, else `REPORTS_CONFIG`), then environment, then
    /// command line.
    pub fn resolve(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        let from_env = env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| env::var(key).ok())?;
        config.apply_overrides(overrides)?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let mut config = Self::from_toml(&text)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        config.path = Some(path.to_path_buf());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(Into::into)
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(kind) = lookup("REPORTS_SOURCE") {
            self.source.kind = SourceKind::parse(&kind).context("REPORTS_SOURCE")?;
        }
        if let Some(dir) = lookup("REPORTS_DATA_DIR") {
            self.source.data_dir = PathBuf::from(dir);
        }
        if let Some(bucket) = lookup("REPORTS_S3_BUCKET") {
            self.source.bucket = Some(bucket);
        }
        if let Some(region) = lookup("REPORTS_S3_REGION") {
            self.source.region = Some(region);
        }
        if let Some(path) = lookup("REPORTS_SQLITE_PATH") {
            self.mirror.sqlite_path = Some(PathBuf::from(path));
        }
        if let Some(ttl) = lookup("REPORTS_CACHE_TTL") {
            self.cache.ttl_seconds = parse_secs("REPORTS_CACHE_TTL", &ttl)?;
        }
        if let Some(backend) = lookup("REPORTS_CACHE_BACKEND") {
            self.cache.backend = parse_cache_backend(&backend).context("REPORTS_CACHE_BACKEND")?;
        }
        if let Some(dir) = lookup("REPORTS_CACHE_DIR") {
            self.cache.dir = PathBuf::from(dir);
        }
        if let Some(timeout) = lookup("REPORTS_HTTP_TIMEOUT_SECS") {
            self.knowledge_base.timeout_seconds = parse_secs("REPORTS_HTTP_TIMEOUT_SECS", &timeout)?;
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) -> Result<()> {
        if let Some(kind) = overrides.source {
            self.source.kind = kind;
        }
        if let Some(dir) = &overrides.data_dir {
            self.source.data_dir = dir.clone();
        }
        if let Some(path) = &overrides.sqlite {
            self.mirror.sqlite_path = Some(path.clone());
        }
        if let Some(dir) = &overrides.cache_dir {
            self.cache.dir = dir.clone();
        }
        if let Some(ttl) = overrides.cache_ttl_seconds {
            self.cache.ttl_seconds = ttl;
        }
        if let Some(backend) = &overrides.cache_backend {
            self.cache.backend = parse_cache_backend(backend)?;
        }
        Ok(())
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            dir: self.cache.dir.clone(),
            ttl: Duration::from_secs(self.cache.ttl_seconds),
            backend: self.cache.backend,
            capacity: self.cache.capacity,
        }
    }

    pub fn monthly_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.monthly_ttl_seconds)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.knowledge_base.timeout_seconds)
    }

    pub fn knowledge_base_urls(&self) -> KnowledgeBaseUrls {
        KnowledgeBaseUrls {
            esxi: self.knowledge_base.esxi_url.clone(),
            vcenter: self.knowledge_base.vcenter_url.clone(),
        }
    }

    pub fn open_primary(&self) -> Result<Arc<dyn TabularSource>> {
        let source: Arc<dyn TabularSource> = match self.source.kind {
            SourceKind::Local => Arc::new(
                ObjectStoreSource::local(&self.source.data_dir).with_context(|| {
                    format!("Failed to open data dir {}", self.source.data_dir.display())
                })?,
            ),
            SourceKind::Memory => Arc::new(ObjectStoreSource::in_memory()),
            SourceKind::S3 => {
                let bucket = self
                    .source
                    .bucket
                    .as_deref()
                    .context("S3 source requires [source] bucket or REPORTS_S3_BUCKET")?;
                Arc::new(
                    ObjectStoreSource::s3(bucket, self.source.region.as_deref())
                        .with_context(|| format!("Failed to open S3 bucket {bucket}"))?,
                )
            }
        };
        log::debug!("Primary source: {}", source.describe());
        Ok(source)
    }

    pub fn open_mirror(&self) -> Result<Option<Arc<SqliteSource>>> {
        let Some(path) = &self.mirror.sqlite_path else {
            return Ok(None);
        };
        let mirror = SqliteSource::open(path)
            .with_context(|| format!("Failed to open SQLite mirror {}", path.display()))?;
        Ok(Some(Arc::new(mirror)))
    }
}

fn parse_secs(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a number of seconds, got {value:?}"))
}
