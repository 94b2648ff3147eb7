//! In-memory cache of conformity results
//!
//! Results are keyed by a SHA-256 digest of the extraction document and
//! the reference text. Lookups hand out clones, so a cached result can be
//! shared by parallel batch workers without aliasing. A cache built with a
//! capacity evicts its oldest entries first.
//!
//! # Example
//!
//! ```rust,ignore
//! use vnexsus::cache::ResultCache;
//!
//! let cache = ResultCache::new();
//! let result = cache.get_or_evaluate(&engine, &doc, &reference)?;
//! assert_eq!(cache.stats().misses, 1);
//! ```

use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::conformity::{ConformityEngine, ConformityResult};
use crate::error::Result;
use crate::models::{ExtractionDocument, ReferenceDocument};

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Total cache hits
    pub hits: u64,
    /// Total cache misses
    pub misses: u64,
    /// Entries currently stored
    pub entries: usize,
}

impl CacheStats {
    /// Calculate hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct Entries {
    results: HashMap<String, ConformityResult>,
    /// Keys in insertion order, oldest first
    order: VecDeque<String>,
}

/// Concurrency-safe result cache with copy-on-read semantics
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: RwLock<Entries>,
    /// Maximum entries; unbounded when `None`
    capacity: Option<usize>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    /// Unbounded cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache holding at most `capacity` results (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity.max(1)),
            ..Self::default()
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Cache key of one case
    pub fn key(doc: &ExtractionDocument, reference: &ReferenceDocument) -> Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(serde_json::to_vec(doc)?);
        hasher.update([0u8]);
        hasher.update(reference.text.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Cached result for `key`, cloned
    pub fn get(&self, key: &str) -> Option<ConformityResult> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let found = entries.results.get(key).cloned();
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Store a result, evicting the oldest entries beyond the capacity
    pub fn insert(&self, key: String, result: ConformityResult) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.results.insert(key.clone(), result).is_none() {
            entries.order.push_back(key);
        }
        let Some(capacity) = self.capacity else { return };
        while entries.results.len() > capacity {
            let Some(oldest) = entries.order.pop_front() else { break };
            entries.results.remove(&oldest);
            tracing::trace!(entries = entries.results.len(), "cache eviction");
        }
    }

    /// Cached result of the case, evaluating and storing it on a miss
    pub fn get_or_evaluate(
        &self,
        engine: &ConformityEngine,
        doc: &ExtractionDocument,
        reference: &ReferenceDocument,
    ) -> Result<ConformityResult> {
        let key = Self::key(doc, reference)?;
        if let Some(hit) = self.get(&key) {
            tracing::trace!(key = %&key[..12], "cache hit");
            return Ok(hit);
        }
        let result = engine.evaluate(doc, reference);
        self.insert(key, result.clone());
        Ok(result)
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .results
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.results.clear();
        entries.order.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_depends_on_both_inputs() {
        let doc = ExtractionDocument::from_text("2024.01.15 내원");
        let a = ResultCache::key(&doc, &ReferenceDocument::new("2024-01-15")).unwrap();
        let b = ResultCache::key(&doc, &ReferenceDocument::new("2024-01-16")).unwrap();
        let c = ResultCache::key(&doc, &ReferenceDocument::new("2024-01-15")).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_get_or_evaluate_counts_hits() {
        let engine = ConformityEngine::default();
        let cache = ResultCache::new();
        let doc = ExtractionDocument::from_text("2024.01.15 내원");
        let reference = ReferenceDocument::new("2024-01-15 외래");

        let first = cache.get_or_evaluate(&engine, &doc, &reference).unwrap();
        let second = cache.get_or_evaluate(&engine, &doc, &reference).unwrap();
        assert_eq!(first, second);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_reads_are_copies() {
        let engine = ConformityEngine::default();
        let cache = ResultCache::new();
        let doc = ExtractionDocument::from_text("2024.01.15");
        let reference = ReferenceDocument::new("2024-01-15");
        let mut result = cache.get_or_evaluate(&engine, &doc, &reference).unwrap();
        result.combined_score = -1.0;

        let key = ResultCache::key(&doc, &reference).unwrap();
        assert_ne!(cache.get(&key).unwrap().combined_score, -1.0);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let engine = ConformityEngine::default();
        let cache = ResultCache::with_capacity(2);
        let reference = ReferenceDocument::new("2024-01-15");
        let docs: Vec<ExtractionDocument> = ["2024.01.15", "2024.01.16", "2024.01.17"]
            .into_iter()
            .map(ExtractionDocument::from_text)
            .collect();

        for doc in &docs {
            cache.get_or_evaluate(&engine, doc, &reference).unwrap();
        }
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.capacity(), Some(2));

        let oldest = ResultCache::key(&docs[0], &reference).unwrap();
        let newest = ResultCache::key(&docs[2], &reference).unwrap();
        assert!(cache.get(&oldest).is_none());
        assert!(cache.get(&newest).is_some());
    }

    #[test]
    fn test_reinsert_does_not_grow() {
        let engine = ConformityEngine::default();
        let cache = ResultCache::with_capacity(1);
        let doc = ExtractionDocument::from_text("2024.01.15");
        let reference = ReferenceDocument::new("2024-01-15");
        let result = engine.evaluate(&doc, &reference);
        let key = ResultCache::key(&doc, &reference).unwrap();

        cache.insert(key.clone(), result.clone());
        cache.insert(key.clone(), result);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&key).is_some());
    }
}
