//! Memoization of ingestion and export results
//!
//! Entries are keyed by the SHA-256 of the uploaded bytes plus the serialized
//! configuration that produced them. The cache is only ever a shortcut: a
//! miss recomputes the same value.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Compute SHA-256 hash of upload bytes
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// (input hash, configuration) pair, hashed down to one hex string
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new<C: Serialize + ?Sized>(input_hash: &str, config: &C) -> Result<Self, serde_json::Error> {
        let config = serde_json::to_vec(config)?;
        let mut hasher = Sha256::new();
        hasher.update(input_hash.as_bytes());
        hasher.update([0u8]);
        hasher.update(&config);
        Ok(Self(hex::encode(hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Keyed results, optionally bounded. A bounded memo evicts its oldest
/// entry once full.
#[derive(Debug)]
pub struct Memo<V> {
    entries: HashMap<CacheKey, V>,
    order: VecDeque<CacheKey>,
    capacity: Option<usize>,
    hits: usize,
    misses: usize,
}

impl<V> Default for Memo<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: None,
            hits: 0,
            misses: 0,
        }
    }
}

impl<V: Clone> Memo<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A memo holding at most `capacity` entries (at least one)
    pub fn bounded(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity.max(1)),
            ..Self::default()
        }
    }

    /// Cached value for `key`, or the result of `compute`. Errors are not
    /// cached.
    pub fn get_or_try_insert_with<E>(
        &mut self,
        key: CacheKey,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(value) = self.entries.get(&key) {
            self.hits += 1;
            debug!(key = key.as_str(), "Cache hit");
            return Ok(value.clone());
        }
        self.misses += 1;
        let value = compute()?;
        if let Some(capacity) = self.capacity {
            while self.entries.len() >= capacity {
                let Some(oldest) = self.order.pop_front() else {
                    break;
                };
                self.entries.remove(&oldest);
                debug!(key = oldest.as_str(), "Cache entry evicted");
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, value.clone());
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}
