//! Response cache and rate-limit retry for model calls.
//!
//! The cache is an explicit service: construct one, share it through an `Arc`
//! across every gateway and session in the process, and swap it in tests.
//! Keys are derived from content, so sessions cannot see each other's results
//! unless their inputs mean the same thing.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::error::{InferenceError, InferenceResult};

/// Default freshness window for cached responses.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// SHA-256 hex digest of `text`.
pub fn fingerprint(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

// =========================================================================
// Cache keys
// =========================================================================

/// A content-derived cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn builder(operation: &str) -> CacheKeyBuilder {
        CacheKeyBuilder {
            operation: operation.to_string(),
            parts: Vec::new(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Operation prefix, safe to log.
    pub fn operation(&self) -> &str {
        self.0.split(':').next().unwrap_or_default()
    }
}

/// Builds a [`CacheKey`] from named parts.
///
/// - `set`: order and duplicates are irrelevant (trimmed, sorted, deduplicated)
/// - `list`: order is meaningful
/// - `text`: free text, reduced to a full-content fingerprint
/// - `value`: a single scalar
pub struct CacheKeyBuilder {
    operation: String,
    parts: Vec<(String, Vec<String>)>,
}

impl CacheKeyBuilder {
    pub fn set<S: AsRef<str>>(mut self, name: &str, items: &[S]) -> Self {
        let mut values: Vec<String> = items
            .iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        values.sort();
        values.dedup();
        self.parts.push((name.to_string(), values));
        self
    }

    pub fn list<S: AsRef<str>>(mut self, name: &str, items: &[S]) -> Self {
        let values = items.iter().map(|s| s.as_ref().trim().to_string()).collect();
        self.parts.push((name.to_string(), values));
        self
    }

    pub fn text(mut self, name: &str, text: &str) -> Self {
        self.parts.push((name.to_string(), vec![fingerprint(text)]));
        self
    }

    pub fn value(mut self, name: &str, value: &str) -> Self {
        self.parts.push((name.to_string(), vec![value.to_string()]));
        self
    }

    pub fn build(self) -> CacheKey {
        // JSON keeps part boundaries unambiguous ("a,b" vs ["a","b"]).
        let canonical = serde_json::to_string(&self.parts).unwrap_or_default();
        CacheKey(format!("{}:{}", self.operation, fingerprint(&canonical)))
    }
}

// =========================================================================
// Cache
// =========================================================================

struct CacheEntry {
    value: Value,
    stored_at: Instant,
}

/// TTL cache of decoded model responses.
pub struct ResponseCache {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh value for `key`, evicting it if it has expired.
    pub fn get(&self, key: &CacheKey) -> Option<Value> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let fresh = match entries.get(key) {
            Some(entry) => entry.stored_at.elapsed() < self.ttl,
            None => return None,
        };
        if fresh {
            entries.get(key).map(|entry| entry.value.clone())
        } else {
            entries.remove(key);
            None
        }
    }

    /// Store `value` under `key`. Expired entries are dropped first, so the
    /// cache never holds more than one TTL window of keys.
    pub fn insert(&self, key: &CacheKey, value: Value) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let purged = Self::retain_fresh(&mut entries, self.ttl);
        if purged > 0 {
            debug!("Cache purged {} expired entries", purged);
        }
        entries.insert(
            key.clone(),
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Self::retain_fresh(&mut entries, self.ttl)
    }

    fn retain_fresh(entries: &mut HashMap<CacheKey, CacheEntry>, ttl: Duration) -> usize {
        let before = entries.len();
        entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

// =========================================================================
// Retry
// =========================================================================

/// Exponential backoff for rate-limited calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Upper bound of the random jitter added to every delay
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            max_jitter: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based), without jitter.
    pub fn base_backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Delay before retry number `attempt` (0-based), with jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };
        self.base_backoff(attempt) + Duration::from_millis(jitter)
    }

    pub fn total_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// Run `op` with caching and rate-limit retry.
///
/// With a key, a fresh cached value is returned without invoking `op`, and a
/// success is cached. Only `RateLimited` errors are retried; once the budget
/// is spent the call fails with `Unavailable`. Other errors fail at once.
pub async fn call_with_retry<T, F, Fut>(
    cache: &ResponseCache,
    key: Option<&CacheKey>,
    policy: &RetryPolicy,
    mut op: F,
) -> InferenceResult<T>
where
    T: Serialize + DeserializeOwned,
    F: FnMut() -> Fut,
    Fut: Future<Output = InferenceResult<T>>,
{
    if let Some(key) = key {
        if let Some(value) = cache.get(key) {
            match serde_json::from_value::<T>(value) {
                Ok(hit) => {
                    debug!("Cache hit for {}", key.operation());
                    return Ok(hit);
                }
                Err(e) => warn!("Discarding undecodable cache entry for {}: {}", key.operation(), e),
            }
        }
    }

    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(result) => {
                if let Some(key) = key {
                    match serde_json::to_value(&result) {
                        Ok(value) => cache.insert(key, value),
                        Err(e) => warn!("Failed to cache result for {}: {}", key.operation(), e),
                    }
                }
                return Ok(result);
            }
            Err(InferenceError::RateLimited(reason)) => {
                if attempt >= policy.max_retries {
                    error!(
                        "Model call failed after {} attempts: {}",
                        attempt + 1,
                        reason
                    );
                    return Err(InferenceError::Unavailable(format!(
                        "rate limited after {} attempts: {}",
                        attempt + 1,
                        reason
                    )));
                }
                let delay = policy.backoff(attempt);
                warn!(
                    "Model call attempt {} rate limited, retrying in {:?}",
                    attempt + 1,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn key(symptoms: &[&str]) -> CacheKey {
        CacheKey::builder("clinical_context").set("symptoms", symptoms).build()
    }

    #[test]
    fn test_set_parts_ignore_order_and_duplicates() {
        assert_eq!(key(&["A", "B"]), key(&["B", "A"]));
        assert_eq!(key(&["A", "B", "A"]), key(&[" B", "A "]));
        assert_ne!(key(&["A"]), key(&["A", "B"]));
    }

    #[test]
    fn test_list_parts_keep_order() {
        let ab = CacheKey::builder("op").list("dx", &["A", "B"]).build();
        let ba = CacheKey::builder("op").list("dx", &["B", "A"]).build();
        assert_ne!(ab, ba);
    }

    #[test]
    fn test_text_parts_fingerprint_full_content() {
        let long = "x".repeat(500);
        let mut changed = long.clone();
        changed.push('y');
        let a = CacheKey::builder("op").text("notes", &long).build();
        let b = CacheKey::builder("op").text("notes", &changed).build();
        assert_ne!(a, b);
    }

    #[test]
    fn test_part_boundaries_are_unambiguous() {
        let a = CacheKey::builder("op").set("s", &["a,b"]).build();
        let b = CacheKey::builder("op").set("s", &["a", "b"]).build();
        assert_ne!(a, b);
    }

    #[test]
    fn test_operation_prefix() {
        assert_eq!(key(&["Cough"]).operation(), "clinical_context");
    }

    #[test]
    fn test_base_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.base_backoff(0), Duration::from_millis(500));
        assert_eq!(policy.base_backoff(1), Duration::from_millis(1000));
        assert_eq!(policy.base_backoff(2), Duration::from_millis(2000));
        assert_eq!(policy.base_backoff(10), Duration::from_secs(5));
    }

    #[test]
    fn test_backoff_jitter_bounded() {
        let policy = RetryPolicy::default();
        for _ in 0..50 {
            let delay = policy.backoff(1);
            assert!(delay >= Duration::from_millis(1000));
            assert!(delay <= Duration::from_millis(1100));
        }
    }

    proptest! {
        #[test]
        fn prop_set_key_order_independent(mut items in proptest::collection::vec("[a-z]{1,8}", 0..8)) {
            let forward = CacheKey::builder("op").set("s", &items).build();
            items.reverse();
            let reversed = CacheKey::builder("op").set("s", &items).build();
            prop_assert_eq!(forward, reversed);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_hit_skips_call() {
        let cache = ResponseCache::default();
        let calls = AtomicU32::new(0);
        let k = key(&["Cough"]);
        for _ in 0..3 {
            let out: Vec<String> = call_with_retry(&cache, Some(&k), &RetryPolicy::default(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec!["Wheezing".to_string()])
            })
            .await
            .unwrap();
            assert_eq!(out, vec!["Wheezing"]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_entry_is_a_miss() {
        let ttl = Duration::from_secs(300);
        let cache = ResponseCache::new(ttl);
        let calls = AtomicU32::new(0);
        let k = key(&["Fever"]);
        let op = || async {
            Ok::<_, InferenceError>(calls.fetch_add(1, Ordering::SeqCst))
        };

        let first = call_with_retry(&cache, Some(&k), &RetryPolicy::default(), op).await.unwrap();
        tokio::time::advance(ttl + Duration::from_secs(1)).await;
        let second = call_with_retry(&cache, Some(&k), &RetryPolicy::default(), op).await.unwrap();

        assert_eq!(first, 0);
        assert_eq!(second, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_fresh_just_before_ttl() {
        let ttl = Duration::from_secs(300);
        let cache = ResponseCache::new(ttl);
        let k = key(&["Fever"]);
        cache.insert(&k, serde_json::json!(7));
        tokio::time::advance(ttl - Duration::from_secs(1)).await;
        assert_eq!(cache.get(&k), Some(serde_json::json!(7)));
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get(&k), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_attempts_exactly_retries_plus_one() {
        let cache = ResponseCache::default();
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);

        let result: InferenceResult<String> = call_with_retry(&cache, None, &policy, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(InferenceError::RateLimited("429".into()))
        })
        .await;

        assert!(matches!(result, Err(InferenceError::Unavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), policy.total_attempts());
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_transient_error_is_not_retried() {
        let cache = ResponseCache::default();
        let calls = AtomicU32::new(0);

        let result: InferenceResult<String> =
            call_with_retry(&cache, None, &RetryPolicy::default(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(InferenceError::Unavailable("400".into()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_rate_limit_and_caches() {
        let cache = ResponseCache::default();
        let calls = AtomicU32::new(0);
        let k = key(&["Nausea"]);
        let started = Instant::now();

        let out: String = call_with_retry(&cache, Some(&k), &RetryPolicy::default(), || async {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(InferenceError::RateLimited("429".into()))
            } else {
                Ok("ok".to_string())
            }
        })
        .await
        .unwrap();

        assert_eq!(out, "ok");
        assert!(started.elapsed() >= Duration::from_millis(500));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_not_cached() {
        let cache = ResponseCache::default();
        let k = key(&["Headache"]);
        let _: InferenceResult<String> = call_with_retry(&cache, Some(&k), &RetryPolicy::default(), || async {
            Err(InferenceError::Unavailable("down".into()))
        })
        .await;
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = ResponseCache::new(Duration::from_secs(10));
        cache.insert(&key(&["A"]), serde_json::json!(1));
        tokio::time::advance(Duration::from_secs(5)).await;
        cache.insert(&key(&["B"]), serde_json::json!(2));
        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_evicts_expired_keys() {
        let cache = ResponseCache::default();
        for i in 0..1000 {
            let notes = format!("note {}", i);
            let k = CacheKey::builder("clinical_context").text("notes", &notes).build();
            cache.insert(&k, serde_json::json!(i));
        }
        assert_eq!(cache.len(), 1000);

        tokio::time::advance(Duration::from_secs(3600)).await;
        let out: u32 = call_with_retry(&cache, Some(&key(&["Fever"])), &RetryPolicy::default(), || async {
            Ok::<_, InferenceError>(1)
        })
        .await
        .unwrap();

        assert_eq!(out, 1);
        assert_eq!(cache.len(), 1);
    }
}
