//! Size-bounded, TTL-expiring dedup window keyed on mint address.
//!
//! Same eviction shape as [`crate::filter::cache::FilterCache`]'s wallet
//! cache: a `DashMap` plus a capacity-triggered sweep that removes the
//! oldest ~10% rather than maintaining a strict LRU ordering.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

struct DedupEntry {
    first_seen: Instant,
    observation_count: u32,
}

pub struct DedupLru {
    entries: Arc<DashMap<String, DedupEntry>>,
    capacity: usize,
    window: Duration,
}

impl DedupLru {
    pub fn new(capacity: usize, window: Duration) -> Self {
        Self { entries: Arc::new(DashMap::with_capacity(capacity.min(4096))), capacity, window }
    }

    /// Record an observation of `mint`. Returns `true` if this is the first
    /// observation within the window (the caller should propagate it),
    /// `false` if it's a duplicate (the caller should only bump the
    /// cross-source confirmation counter, which this call already does).
    pub fn observe(&self, mint: &str) -> bool {
        if let Some(mut entry) = self.entries.get_mut(mint) {
            if entry.first_seen.elapsed() < self.window {
                entry.observation_count += 1;
                return false;
            }
            // Window expired; treat as a fresh observation.
            entry.first_seen = Instant::now();
            entry.observation_count = 1;
            return true;
        }

        if self.entries.len() >= self.capacity {
            self.evict_oldest_tenth();
        }

        self.entries.insert(mint.to_string(), DedupEntry { first_seen: Instant::now(), observation_count: 1 });
        true
    }

    pub fn observation_count(&self, mint: &str) -> u32 {
        self.entries.get(mint).map(|e| e.observation_count).unwrap_or(0)
    }

    fn evict_oldest_tenth(&self) {
        let to_remove = (self.capacity / 10).max(1);
        let mut candidates: Vec<(String, Instant)> =
            self.entries.iter().map(|r| (r.key().clone(), r.first_seen)).collect();
        candidates.sort_by_key(|(_, first_seen)| *first_seen);
        for (key, _) in candidates.into_iter().take(to_remove) {
            self.entries.remove(&key);
        }
    }

    /// Drop entries whose window has elapsed. Intended to be called
    /// periodically rather than on every `observe`, so it stays cheap.
    pub fn prune_expired(&self) {
        let window = self.window;
        self.entries.retain(|_, entry| entry.first_seen.elapsed() < window);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_is_fresh() {
        let dedup = DedupLru::new(16, Duration::from_secs(60));
        assert!(dedup.observe("M1"));
        assert_eq!(dedup.observation_count("M1"), 1);
    }

    #[test]
    fn repeated_observation_within_window_is_duplicate() {
        let dedup = DedupLru::new(16, Duration::from_secs(60));
        assert!(dedup.observe("M1"));
        assert!(!dedup.observe("M1"));
        assert!(!dedup.observe("M1"));
        assert_eq!(dedup.observation_count("M1"), 3);
    }

    #[test]
    fn capacity_eviction_keeps_len_bounded() {
        let dedup = DedupLru::new(10, Duration::from_secs(60));
        for i in 0..20 {
            dedup.observe(&format!("M{}", i));
        }
        assert!(dedup.len() <= 10);
    }

    #[test]
    fn prune_expired_removes_stale_entries() {
        let dedup = DedupLru::new(16, Duration::from_millis(1));
        dedup.observe("M1");
        std::thread::sleep(Duration::from_millis(5));
        dedup.prune_expired();
        assert!(dedup.is_empty());
    }
}
