// Result Cache
// Content-addressed LRU cache for downstream artifacts (summaries, keywords).
//
// HashMap<key, slot> plus an index-linked recency list in a slab: get, put and
// eviction are O(1). One mutex serializes every operation.

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::models::{CacheStats, CachedAnalysis, KeywordLocation, Segment};

pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// SHA-256 hex digest of raw content
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Hash of segment contents joined with '\n'
pub fn document_hash(segments: &[Segment]) -> String {
    let joined = segments
        .iter()
        .map(|s| s.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    hash_content(&joined)
}

fn short_hash(hash: &str) -> &str {
    hash.get(..8).unwrap_or(hash)
}

struct Node {
    key: String,
    value: CachedAnalysis,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Unsynchronized LRU core. `head` is most recent, `tail` least recent.
/// Once full, the tail slot is recycled in place for the incoming entry.
struct LruState {
    capacity: usize,
    map: HashMap<String, usize>,
    slots: Vec<Node>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl LruState {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            map: HashMap::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            head: None,
            tail: None,
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.slots[idx].prev, self.slots[idx].next);
        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].prev = prev,
            None => self.tail = prev,
        }
        self.slots[idx].prev = None;
        self.slots[idx].next = None;
    }

    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        self.slots[idx].prev = None;
        self.slots[idx].next = old_head;
        if let Some(h) = old_head {
            self.slots[h].prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn touch(&mut self, idx: usize) {
        if self.head != Some(idx) {
            self.unlink(idx);
            self.push_front(idx);
        }
    }

    fn get(&mut self, key: &str) -> Option<CachedAnalysis> {
        let idx = *self.map.get(key)?;
        self.touch(idx);
        let node = &mut self.slots[idx];
        node.value.hits += 1;
        Some(node.value.clone())
    }

    /// Insert or overwrite; returns the evicted key, if any
    fn put(&mut self, key: String, value: CachedAnalysis) -> Option<String> {
        if let Some(&idx) = self.map.get(&key) {
            self.slots[idx].value = value;
            self.touch(idx);
            return None;
        }

        if self.slots.len() < self.capacity {
            let idx = self.slots.len();
            self.slots.push(Node {
                key: key.clone(),
                value,
                prev: None,
                next: None,
            });
            self.map.insert(key, idx);
            self.push_front(idx);
            return None;
        }

        let idx = self.tail?;
        self.unlink(idx);
        let evicted = std::mem::replace(&mut self.slots[idx].key, key.clone());
        self.slots[idx].value = value;
        self.map.remove(&evicted);
        self.map.insert(key, idx);
        self.push_front(idx);
        Some(evicted)
    }

    fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    fn total_hits(&self) -> u64 {
        self.slots.iter().map(|n| n.value.hits).sum()
    }

    fn clear(&mut self) {
        self.map.clear();
        self.slots.clear();
        self.head = None;
        self.tail = None;
    }
}

pub struct ResultCache {
    state: Mutex<LruState>,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl ResultCache {
    /// A capacity of zero is raised to one
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(LruState::new(capacity.max(1))),
        }
    }

    /// Look up an entry, bumping its hit counter and recency
    pub fn get(&self, document_hash: &str) -> Option<CachedAnalysis> {
        let hit = self.state.lock().get(document_hash);
        if hit.is_some() {
            info!("[RESULT_CACHE] hit: {}...", short_hash(document_hash));
        }
        hit
    }

    pub fn put(&self, document_hash: &str, entry: CachedAnalysis) {
        let (evicted, size) = {
            let mut state = self.state.lock();
            let evicted = state.put(document_hash.to_string(), entry);
            (evicted, state.map.len())
        };
        if let Some(evicted) = evicted {
            debug!("[RESULT_CACHE] evicted {}...", short_hash(&evicted));
        }
        info!("[RESULT_CACHE] stored {}... (size {})", short_hash(document_hash), size);
    }

    /// Convenience wrapper building the payload and timestamp
    pub fn put_analysis(
        &self,
        document_hash: &str,
        summary: String,
        keywords: Vec<String>,
        keyword_locations: HashMap<String, Vec<KeywordLocation>>,
    ) {
        self.put(document_hash, CachedAnalysis::new(summary, keywords, keyword_locations));
    }

    /// Presence check that leaves hits and recency untouched
    pub fn contains(&self, document_hash: &str) -> bool {
        self.state.lock().contains(document_hash)
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            size: state.map.len(),
            capacity: state.capacity,
            total_hits: state.total_hits(),
        }
    }

    pub fn clear(&self) {
        self.state.lock().clear();
        info!("[RESULT_CACHE] cleared");
    }
}
