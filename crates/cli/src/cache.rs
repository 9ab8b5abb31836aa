use anyhow::{Context, Result};
use blake3::Hasher;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::fs;

const FILE_PREFIX: &str = "report_";

#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub dir: PathBuf,
    pub ttl: Duration,
    pub backend: CacheBackend,
    pub capacity: usize,
}

#[derive(Clone, Debug, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    File,
    Memory,
}

pub fn parse_cache_backend(value: &str) -> Result<CacheBackend> {
    match value.trim().to_lowercase().as_str() {
        "file" => Ok(CacheBackend::File),
        "memory" => Ok(CacheBackend::Memory),
        other => anyhow::bail!("Unsupported cache backend: {other}"),
    }
}

impl CacheConfig {
    pub fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create cache dir {}", self.dir.display()))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct CacheEnvelope {
    created_ms: u64,
    function: String,
    data: Value,
}

impl CacheEnvelope {
    fn is_fresh(&self, ttl: Duration) -> bool {
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        unix_ms_now().saturating_sub(self.created_ms) <= ttl_ms
    }
}

/// Memoizes report computations by function name and arguments.
///
/// There is no single-flight: two concurrent misses on the same key both
/// compute, and the later store wins. Cache faults never fail a request; they
/// are logged and the computation runs uncached.
pub struct ReportCache {
    cfg: CacheConfig,
    mem: Mutex<MemCache>,
}

/// Value served by [`ReportCache::get_or_compute`].
#[derive(Debug)]
pub struct Cached {
    pub data: Value,
    pub hit: bool,
}

impl ReportCache {
    pub fn new(cfg: CacheConfig) -> Self {
        Self {
            cfg,
            mem: Mutex::new(MemCache::new()),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.cfg
    }

    /// Serves `function(args)` from the cache when an entry younger than `ttl`
    /// exists, else runs `compute` and stores its result. A zero `ttl` disables
    /// caching for the call.
    pub async fn get_or_compute<F, Fut>(
        &self,
        function: &str,
        args: &Value,
        ttl: Duration,
        compute: F,
    ) -> Result<Cached>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        if ttl.is_zero() {
            return Ok(Cached {
                data: compute().await?,
                hit: false,
            });
        }
        let key = cache_key(function, args);
        match self.load(&key, ttl).await {
            Ok(Some(data)) => {
                log::debug!("Cache hit for {function} ({key})");
                return Ok(Cached { data, hit: true });
            }
            Ok(None) => {}
            Err(err) => log::warn!("Cache read failed for {function}: {err:#}"),
        }

        let data = compute().await?;
        if let Err(err) = self.store(&key, function, &data).await {
            log::warn!("Cache write failed for {function}: {err:#}");
        }
        Ok(Cached { data, hit: false })
    }

    /// Drops every entry.
    pub async fn invalidate(&self) -> Result<()> {
        self.mem
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        if self.cfg.backend == CacheBackend::Memory {
            return Ok(());
        }

        let mut entries = match fs::read_dir(&self.cfg.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        let mut removed = 0usize;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(FILE_PREFIX) && name.ends_with(".json") {
                fs::remove_file(entry.path()).await?;
                removed += 1;
            }
        }
        log::info!("Cache invalidated ({removed} files)");
        Ok(())
    }

    async fn load(&self, key: &str, ttl: Duration) -> Result<Option<Value>> {
        if self.cfg.backend == CacheBackend::Memory {
            return Ok(self
                .mem
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(key, ttl));
        }

        let path = self.entry_path(key);
        let Ok(bytes) = fs::read(&path).await else {
            return Ok(None);
        };
        let envelope: CacheEnvelope = match serde_json::from_slice(&bytes) {
            Ok(val) => val,
            Err(err) => {
                log::warn!("Report cache corrupted {}: {err}", path.display());
                return Ok(None);
            }
        };
        if !envelope.is_fresh(ttl) {
            return Ok(None);
        }
        Ok(Some(envelope.data))
    }

    async fn store(&self, key: &str, function: &str, data: &Value) -> Result<()> {
        let envelope = CacheEnvelope {
            created_ms: unix_ms_now(),
            function: function.to_string(),
            data: data.clone(),
        };
        if self.cfg.backend == CacheBackend::Memory {
            self.mem
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(key, envelope, self.cfg.capacity);
            return Ok(());
        }

        self.cfg.ensure_dir()?;
        let bytes = serde_json::to_vec_pretty(&envelope)?;
        fs::write(self.entry_path(key), bytes).await?;
        Ok(())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.cfg.dir.join(format!("{FILE_PREFIX}{key}.json"))
    }
}

pub fn cache_key(function: &str, args: &Value) -> String {
    let mut hasher = Hasher::new();
    hasher.update(function.as_bytes());
    hasher.update(b"|");
    hasher.update(args.to_string().as_bytes());
    hasher.finalize().to_hex().to_string()
}

fn unix_ms_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

struct MemCache {
    map: HashMap<String, CacheEnvelope>,
    order: VecDeque<String>,
}

impl MemCache {
    fn new() -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.order.push_front(key.to_string());
    }

    fn insert(&mut self, key: &str, envelope: CacheEnvelope, capacity: usize) {
        self.map.insert(key.to_string(), envelope);
        self.touch(key);
        while self.order.len() > capacity {
            if let Some(old) = self.order.pop_back() {
                self.map.remove(&old);
            }
        }
    }

    fn get(&mut self, key: &str, ttl: Duration) -> Option<Value> {
        let envelope = self.map.get(key)?;
        if !envelope.is_fresh(ttl) {
            self.map.remove(key);
            if let Some(pos) = self.order.iter().position(|k| k == key) {
                self.order.remove(pos);
            }
            return None;
        }
        let data = envelope.data.clone();
        self.touch(key);
        Some(data)
    }

    fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
    }
}
