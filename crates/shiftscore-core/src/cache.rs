//! # Computed Metric Cache
//!
//! Memoization of metric results keyed by their input.
//!
//! The same trace is routinely handed to a metric more than once in a run
//! (several audits read CLS, and the service sees resubmissions). Results
//! are kept in an LRU cache keyed by the canonical encoding of the input.
//!
//! ## Design Principles
//!
//! - `BTreeMap` storage for deterministic ordering
//! - Integer-only bookkeeping (logical clock, not wall clock)
//! - Only successful results are cached; errors are recomputed

use crate::metric::{AuditContext, Metric, Settings};
use crate::trace::MetricComputationData;
use crate::{MetricError, MetricResult};
use serde::Serialize;
use std::collections::BTreeMap;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Default maximum number of cached results.
///
/// Each entry keeps its key alive. Without the `crypto-hash` feature a key is
/// the full postcard encoding of the request, so a full cache holds roughly
/// this many encoded traces. With the feature a key is a 32-byte digest.
pub const DEFAULT_CACHE_SIZE: usize = 64;

/// Default number of entries evicted at once when the cache is full.
pub const DEFAULT_EVICTION_BATCH: usize = 8;

// =============================================================================
// CACHE KEY
// =============================================================================

/// Canonical identity of a metric input.
///
/// The postcard encoding of the input, or its BLAKE3 digest when the
/// `crypto-hash` feature is enabled.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArtifactKey(Vec<u8>);

impl ArtifactKey {
    /// Derive the key for any serializable input.
    pub fn of<T: Serialize + ?Sized>(value: &T) -> Result<Self, MetricError> {
        let encoded = postcard::to_allocvec(value)?;
        Ok(Self::from_encoded(encoded))
    }

    /// Key for a metric request: the events plus the settings that select
    /// the computation path.
    pub fn for_request(
        data: &MetricComputationData,
        settings: &Settings,
    ) -> Result<Self, MetricError> {
        Self::of(&(data, settings))
    }

    #[cfg(feature = "crypto-hash")]
    fn from_encoded(encoded: Vec<u8>) -> Self {
        Self(blake3::hash(&encoded).as_bytes().to_vec())
    }

    #[cfg(not(feature = "crypto-hash"))]
    fn from_encoded(encoded: Vec<u8>) -> Self {
        Self(encoded)
    }

    /// Raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

// =============================================================================
// LRU CACHE
// =============================================================================

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    /// Logical time of the last read or write.
    last_access: u64,
}

/// Least-recently-used cache with a logical clock.
#[derive(Debug)]
pub struct LruCache<K: Ord + Clone, V: Clone> {
    entries: BTreeMap<K, CacheEntry<V>>,
    max_size: usize,
    eviction_batch: usize,
    clock: u64,
    hits: u64,
    misses: u64,
}

impl<K: Ord + Clone, V: Clone> Default for LruCache<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }
}

impl<K: Ord + Clone, V: Clone> LruCache<K, V> {
    /// Create a cache holding at most `max_size` entries (minimum 1).
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            max_size: max_size.max(1),
            eviction_batch: DEFAULT_EVICTION_BATCH,
            clock: 0,
            hits: 0,
            misses: 0,
        }
    }

    /// Set how many entries are dropped when the cache is full (minimum 1).
    #[must_use]
    pub fn with_eviction_batch(mut self, batch_size: usize) -> Self {
        self.eviction_batch = batch_size.max(1);
        self
    }

    fn tick(&mut self) -> u64 {
        self.clock = self.clock.saturating_add(1);
        self.clock
    }

    /// Look up a value, refreshing its recency. Counts a hit or a miss.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let now = self.tick();
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.last_access = now;
                self.hits = self.hits.saturating_add(1);
                Some(&entry.value)
            }
            None => {
                self.misses = self.misses.saturating_add(1);
                None
            }
        }
    }

    /// Look up a value without touching recency or statistics.
    #[must_use]
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|entry| &entry.value)
    }

    /// Insert or replace a value, evicting old entries when full.
    pub fn insert(&mut self, key: K, value: V) {
        let now = self.tick();

        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_size {
            self.evict();
        }

        self.entries.insert(
            key,
            CacheEntry {
                value,
                last_access: now,
            },
        );
    }

    /// Remove a key.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|entry| entry.value)
    }

    /// Drop all entries. Statistics are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a key is cached.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Current statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let lookups = self.hits.saturating_add(self.misses);
        let hit_rate_percent = if lookups == 0 {
            0
        } else {
            (self.hits.saturating_mul(100) / lookups) as u8
        };

        CacheStats {
            size: self.entries.len(),
            max_size: self.max_size,
            hits: self.hits,
            misses: self.misses,
            hit_rate_percent,
        }
    }

    /// Drop the `eviction_batch` least recently used entries.
    fn evict(&mut self) {
        // Ties on last_access cannot happen: every access ticks the clock.
        let mut by_age: Vec<(u64, K)> = self
            .entries
            .iter()
            .map(|(key, entry)| (entry.last_access, key.clone()))
            .collect();
        by_age.sort_by_key(|(last_access, _)| *last_access);

        for (_, key) in by_age.into_iter().take(self.eviction_batch) {
            self.entries.remove(&key);
        }
    }
}

/// Cache performance counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Entries currently cached.
    pub size: usize,
    /// Capacity.
    pub max_size: usize,
    /// Lookups that found a value.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Hits as an integer percentage of all lookups (0-100).
    pub hit_rate_percent: u8,
}

// =============================================================================
// COMPUTED METRIC
// =============================================================================

/// A metric together with a cache of its results.
///
/// The wrapped metric stays pure; the cache only short-circuits repeated
/// requests for identical input and settings.
#[derive(Debug)]
pub struct ComputedMetric<M: Metric> {
    metric: M,
    cache: LruCache<ArtifactKey, MetricResult>,
}

impl<M: Metric> ComputedMetric<M> {
    /// Wrap `metric` with a cache of `DEFAULT_CACHE_SIZE` entries.
    #[must_use]
    pub fn new(metric: M) -> Self {
        Self::with_capacity(metric, DEFAULT_CACHE_SIZE)
    }

    /// Wrap `metric` with a cache of `capacity` entries.
    #[must_use]
    pub fn with_capacity(metric: M, capacity: usize) -> Self {
        Self {
            metric,
            cache: LruCache::new(capacity),
        }
    }

    /// The wrapped metric.
    pub fn metric(&self) -> &M {
        &self.metric
    }

    /// Compute through [`Metric::compute`], reusing a cached result for an
    /// identical request.
    pub fn request(
        &mut self,
        data: &MetricComputationData,
        context: &AuditContext,
    ) -> Result<MetricResult, MetricError> {
        let key = ArtifactKey::for_request(data, &context.settings)?;
        if let Some(cached) = self.lookup(&key) {
            return Ok(cached);
        }

        let result = self.metric.compute(data, context)?;
        self.remember(key, result);
        Ok(result)
    }

    /// Cached result for `key`, counted as a hit or a miss.
    ///
    /// Together with [`remember`](Self::remember) this lets callers that
    /// share the cache behind a lock derive keys and compute unlocked.
    pub fn lookup(&mut self, key: &ArtifactKey) -> Option<MetricResult> {
        self.cache.get(key).copied()
    }

    /// Store a successful result under `key`.
    pub fn remember(&mut self, key: ArtifactKey, result: MetricResult) {
        self.cache.insert(key, result);
    }

    /// Cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Forget every cached result.
    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::layout_shift::{CumulativeLayoutShift, LAYOUT_SHIFT_EVENT};
    use crate::metric::ThrottlingMethod;
    use crate::trace::{EventData, TraceEvent};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn trace(scores: &[f64]) -> MetricComputationData {
        MetricComputationData::new(
            scores
                .iter()
                .map(|s| TraceEvent::named(LAYOUT_SHIFT_EVENT).with_data(EventData::main_frame(*s)))
                .collect(),
        )
    }

    /// Counts how often it is actually computed.
    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    impl Metric for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn compute_simulated(
            &self,
            data: &MetricComputationData,
            _context: &AuditContext,
        ) -> Result<MetricResult, MetricError> {
            self.compute_observed(data)
        }

        fn compute_observed(
            &self,
            data: &MetricComputationData,
        ) -> Result<MetricResult, MetricError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            CumulativeLayoutShift.compute_observed(data)
        }
    }

    #[test]
    fn cache_insert_and_get() {
        let mut cache = LruCache::new(10);
        cache.insert(1u64, "a");
        cache.insert(2u64, "b");

        assert_eq!(cache.get(&1), Some(&"a"));
        assert_eq!(cache.get(&2), Some(&"b"));
        assert_eq!(cache.get(&3), None);
    }

    #[test]
    fn cache_evicts_least_recently_used() {
        let mut cache = LruCache::new(3).with_eviction_batch(1);
        cache.insert(1u64, "a");
        cache.insert(2u64, "b");
        cache.insert(3u64, "c");

        let _ = cache.get(&1);
        let _ = cache.get(&3);
        cache.insert(4u64, "d");

        assert!(cache.contains(&1));
        assert!(!cache.contains(&2));
        assert!(cache.contains(&3));
        assert!(cache.contains(&4));
    }

    #[test]
    fn replacing_a_key_does_not_evict() {
        let mut cache = LruCache::new(2).with_eviction_batch(1);
        cache.insert(1u64, "old");
        cache.insert(2u64, "b");
        cache.insert(1u64, "new");

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.peek(&1), Some(&"new"));
    }

    #[test]
    fn cache_stats_and_peek() {
        let mut cache = LruCache::<u64, &str>::new(10);
        cache.insert(1, "a");
        let _ = cache.get(&1);
        let _ = cache.get(&2);
        let _ = cache.peek(&3);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate_percent, 50);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.remove(&1), None);
    }

    #[test]
    fn keys_distinguish_inputs_and_settings() {
        let simulate = Settings::with_method(ThrottlingMethod::Simulate);
        let devtools = Settings::with_method(ThrottlingMethod::Devtools);

        let a = ArtifactKey::for_request(&trace(&[0.1]), &simulate).unwrap();
        let b = ArtifactKey::for_request(&trace(&[0.1]), &simulate).unwrap();
        let c = ArtifactKey::for_request(&trace(&[0.2]), &simulate).unwrap();
        let d = ArtifactKey::for_request(&trace(&[0.1]), &devtools).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert!(!a.as_bytes().is_empty());
    }

    #[cfg(feature = "crypto-hash")]
    #[test]
    fn keys_are_fixed_size_digests() {
        let small = ArtifactKey::for_request(&trace(&[0.1]), &Settings::default()).unwrap();
        let large =
            ArtifactKey::for_request(&trace(&[0.1; 500]), &Settings::default()).unwrap();
        assert_eq!(small.as_bytes().len(), 32);
        assert_eq!(large.as_bytes().len(), 32);
    }

    #[cfg(not(feature = "crypto-hash"))]
    #[test]
    fn keys_are_the_postcard_encoding() {
        let data = trace(&[0.1]);
        let settings = Settings::default();
        let key = ArtifactKey::for_request(&data, &settings).unwrap();
        let encoded = postcard::to_allocvec(&(&data, &settings)).unwrap();
        assert_eq!(key.as_bytes(), encoded.as_slice());
    }

    #[test]
    fn lookup_and_remember_share_the_request_cache() {
        let mut computed = ComputedMetric::new(Counting::default());
        let context = AuditContext::default();
        let data = trace(&[0.4]);
        let key = ArtifactKey::for_request(&data, &context.settings).unwrap();

        assert_eq!(computed.lookup(&key), None);
        computed.remember(key.clone(), MetricResult::new(0.4));
        assert_eq!(computed.lookup(&key), Some(MetricResult::new(0.4)));

        // request() finds the remembered result without computing.
        assert_eq!(computed.request(&data, &context).unwrap().timing, 0.4);
        assert_eq!(computed.metric().calls.load(Ordering::SeqCst), 0);
        assert_eq!(computed.stats().hits, 2);
        assert_eq!(computed.stats().misses, 1);
    }

    #[test]
    fn repeated_requests_hit_the_cache() {
        let mut computed = ComputedMetric::new(Counting::default());
        let context = AuditContext::default();
        let data = trace(&[0.05, 0.2]);

        let first = computed.request(&data, &context).unwrap();
        let second = computed.request(&data, &context).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.timing, 0.2);
        assert_eq!(computed.metric().calls.load(Ordering::SeqCst), 1);
        assert_eq!(computed.stats().hits, 1);
    }

    #[test]
    fn errors_are_not_cached() {
        let mut computed = ComputedMetric::new(Counting::default());
        let context = AuditContext::default();
        let data = MetricComputationData::new(vec![TraceEvent::named(LAYOUT_SHIFT_EVENT).with_data(
            EventData {
                is_main_frame: Some(true),
                cumulative_score: None,
            },
        )]);

        assert!(computed.request(&data, &context).is_err());
        assert!(computed.request(&data, &context).is_err());
        assert_eq!(computed.metric().calls.load(Ordering::SeqCst), 2);
        assert_eq!(computed.stats().size, 0);
    }

    #[test]
    fn clear_forces_recompute() {
        let mut computed = ComputedMetric::with_capacity(Counting::default(), 4);
        let context = AuditContext::default();
        let data = trace(&[0.3]);

        computed.request(&data, &context).unwrap();
        computed.clear();
        computed.request(&data, &context).unwrap();

        assert_eq!(computed.metric().calls.load(Ordering::SeqCst), 2);
    }
}
