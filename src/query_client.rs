//! Query cache in front of the procedure router.
//!
//! Results are cached per (procedure, input, user) for `stale_time`. Failed
//! fetches are retried `retry` times when the failure is server-side.
//! Mutations call [`QueryClient::invalidate`] so the next read is fresh.
//! Entries nobody read recently, or whose session has expired, are evicted,
//! and the map never holds more than [`MAX_ENTRIES`].
//! The client is built once per application and shared through the app state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::QueryConfig;
use crate::rpc::{Context, ProcedureKind, RpcError, RpcRouter};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub path: String,
    pub input: String,
    pub user: Option<String>,
}

impl QueryKey {
    pub fn new(path: &str, input: &Value, ctx: &Context) -> Self {
        Self {
            path: path.to_string(),
            // serde_json maps are ordered, so equal inputs serialize equally
            input: input.to_string(),
            user: ctx.session.session().map(|s| s.user.id.clone()),
        }
    }
}

/// Upper bound on cached queries; the least recently used entry goes first
pub const MAX_ENTRIES: usize = 512;

struct CacheEntry {
    data: Value,
    fetched_at: Instant,
    last_used: Instant,
    input: Value,
    ctx: Context,
}

impl CacheEntry {
    fn session_expired(&self, now: DateTime<Utc>) -> bool {
        self.ctx.session.session().is_some_and(|s| s.expires <= now)
    }
}

pub struct QueryClient {
    router: Arc<RpcRouter>,
    cache: RwLock<HashMap<QueryKey, CacheEntry>>,
    stale_time: Duration,
    retry: u32,
    refetch_interval: Option<Duration>,
}

impl QueryClient {
    pub fn new(router: Arc<RpcRouter>, config: &QueryConfig) -> Self {
        Self {
            router,
            cache: RwLock::new(HashMap::new()),
            stale_time: config.stale_time(),
            retry: config.retry,
            refetch_interval: config.refetch_interval(),
        }
    }

    pub fn stale_time(&self) -> Duration {
        self.stale_time
    }

    pub async fn cached_queries(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Cached data when still fresh, otherwise a fetch through the router
    pub async fn fetch(&self, path: &str, input: Value, ctx: Context) -> Result<Value, RpcError> {
        let key = QueryKey::new(path, &input, &ctx);

        if let Some(entry) = self.cache.write().await.get_mut(&key) {
            if entry.fetched_at.elapsed() < self.stale_time {
                debug!("Query cache hit for {}", path);
                entry.last_used = Instant::now();
                return Ok(entry.data.clone());
            }
        }

        let data = self.fetch_with_retry(path, &input, &ctx).await?;
        let mut cache = self.cache.write().await;
        self.prune(&mut cache, MAX_ENTRIES - 1);
        let now = Instant::now();
        cache.insert(
            key,
            CacheEntry {
                data: data.clone(),
                fetched_at: now,
                last_used: now,
                input,
                ctx,
            },
        );
        Ok(data)
    }

    /// How long an unread entry is kept. Without background refresh an entry
    /// is useless once stale; with it, one refresh period of grace is allowed.
    fn retention(&self) -> Duration {
        self.stale_time + self.refetch_interval.unwrap_or(Duration::ZERO)
    }

    /// Drop unread and expired-session entries, then the least recently used
    /// ones until at most `capacity` remain
    fn prune(&self, cache: &mut HashMap<QueryKey, CacheEntry>, capacity: usize) {
        let retention = self.retention();
        let now = Utc::now();
        let before = cache.len();
        cache.retain(|_, entry| entry.last_used.elapsed() < retention && !entry.session_expired(now));

        while cache.len() > capacity {
            let oldest = cache
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => cache.remove(&key),
                None => break,
            };
        }

        let removed = before - cache.len();
        if removed > 0 {
            debug!("Evicted {} cached queries", removed);
        }
    }

    async fn fetch_with_retry(
        &self,
        path: &str,
        input: &Value,
        ctx: &Context,
    ) -> Result<Value, RpcError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self
                .router
                .call(path, ProcedureKind::Query, ctx.clone(), input.clone())
                .await;
            match result {
                Err(e) if e.is_retryable() && attempt <= self.retry => {
                    warn!("Query {} failed (attempt {}), retrying: {}", path, attempt, e);
                }
                other => return other,
            }
        }
    }

    /// Drop cached entries whose procedure path starts with `prefix`;
    /// an empty prefix clears everything. Returns the number removed.
    pub async fn invalidate(&self, prefix: &str) -> usize {
        let mut cache = self.cache.write().await;
        let before = cache.len();
        cache.retain(|key, _| !key.path.starts_with(prefix));
        let removed = before - cache.len();
        if removed > 0 {
            debug!("Invalidated {} cached queries under '{}'", removed, prefix);
        }
        removed
    }

    /// Re-run every recently read query whose session is still valid.
    /// Failures drop the entry.
    pub async fn refetch_all(&self) {
        let snapshot: Vec<(QueryKey, Value, Context)> = {
            let mut cache = self.cache.write().await;
            self.prune(&mut cache, MAX_ENTRIES);
            cache
                .iter()
                .map(|(key, entry)| (key.clone(), entry.input.clone(), entry.ctx.clone()))
                .collect()
        };

        for (key, input, mut ctx) in snapshot {
            ctx.now = Utc::now();
            let result = self.fetch_with_retry(&key.path, &input, &ctx).await;
            let mut cache = self.cache.write().await;
            match result {
                // Entries invalidated meanwhile stay gone
                Ok(data) => {
                    if let Some(entry) = cache.get_mut(&key) {
                        entry.data = data;
                        entry.fetched_at = Instant::now();
                        entry.ctx = ctx;
                    }
                }
                Err(e) => {
                    warn!("Background refetch of {} failed: {}", key.path, e);
                    cache.remove(&key);
                }
            }
        }
    }

    /// Periodic background refresh, when a refetch interval is configured
    pub fn spawn_refetch(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let period = self.refetch_interval?;
        let client = Arc::clone(self);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                client.refetch_all().await;
            }
        }))
    }
}
