//! Client-side proxy layer: an in-memory TTL response cache and a per-client
//! token bucket in front of another [`Transport`].

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use foldhash::HashMap;
use serde_json::Value;
use tracing::debug;

use super::{CatalogRequest, Transport};
use crate::catalog::CatalogError;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Responses keyed by [`CatalogRequest::cache_key`], valid for `ttl`.
pub struct ResponseCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, Value)>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::default()),
        }
    }

    pub fn get(&self, key: &str, now: Instant) -> Option<Value> {
        let mut entries = lock(&self.entries);
        match entries.get(key) {
            Some((stored, value)) if now.saturating_duration_since(*stored) < self.ttl => {
                Some(value.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: String, value: Value, now: Instant) {
        let mut entries = lock(&self.entries);
        entries.retain(|_, (stored, _)| now.saturating_duration_since(*stored) < self.ttl);
        entries.insert(key, (now, value));
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Classic token bucket: `capacity` tokens, refilled continuously at
/// `refill_per_sec`.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: f64,
    refill_per_sec: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(capacity: u32, refill_per_sec: f64, now: Instant) -> Self {
        let capacity = f64::from(capacity.max(1));
        Self {
            capacity,
            refill_per_sec: refill_per_sec.max(0.0),
            tokens: capacity,
            last_refill: now,
        }
    }

    /// Takes one token, or reports how long until one is available.
    pub fn try_take(&mut self, now: Instant) -> Result<(), Duration> {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            return Ok(());
        }
        if self.refill_per_sec <= 0.0 {
            return Err(Duration::MAX);
        }
        let missing = 1.0 - self.tokens;
        Err(Duration::from_secs_f64(missing / self.refill_per_sec))
    }
}

/// One [`TokenBucket`] per client identifier.
pub struct RateLimiter {
    capacity: u32,
    refill_per_sec: f64,
    buckets: Mutex<HashMap<String, TokenBucket>>,
}

impl RateLimiter {
    pub fn new(capacity: u32, refill_per_sec: f64) -> Self {
        Self {
            capacity,
            refill_per_sec,
            buckets: Mutex::new(HashMap::default()),
        }
    }

    /// Rejects immediately when the client's bucket is empty; nothing is queued.
    pub fn check(&self, client_id: &str, now: Instant) -> Result<(), CatalogError> {
        let mut buckets = lock(&self.buckets);
        let bucket = buckets
            .entry(client_id.to_string())
            .or_insert_with(|| TokenBucket::new(self.capacity, self.refill_per_sec, now));
        bucket
            .try_take(now)
            .map_err(|retry_after| CatalogError::RateLimited { retry_after })
    }
}

/// Cache, then rate limit, then the wrapped transport.
pub struct ProxyTransport<T> {
    inner: T,
    cache: Option<ResponseCache>,
    limiter: RateLimiter,
    client_id: String,
}

impl<T: Transport> ProxyTransport<T> {
    pub fn new(inner: T, cache: Option<ResponseCache>, limiter: RateLimiter, client_id: &str) -> Self {
        Self {
            inner,
            cache,
            limiter,
            client_id: client_id.to_string(),
        }
    }
}

impl<T: Transport> Transport for ProxyTransport<T> {
    fn get_json(&self, request: &CatalogRequest) -> Result<Value, CatalogError> {
        let key = request.cache_key();
        let now = Instant::now();

        if let Some(cache) = &self.cache
            && let Some(hit) = cache.get(&key, now)
        {
            debug!(%key, "proxy cache hit");
            return Ok(hit);
        }

        self.limiter.check(&self.client_id, now)?;
        let value = self.inner.get_json(request)?;

        if let Some(cache) = &self.cache {
            cache.put(key, value.clone(), Instant::now());
        }
        Ok(value)
    }
}
