//! TTL cache
//!
//! Tracks which keys are ephemeral and when they expire.
//!
//! ## Responsibilities
//! - One expiry entry per key, replaced on re-add
//! - Answer expiry checks against an injectable clock
//! - Report the full set of tracked keys (the persistence exclusion set)
//!
//! ## Expiry Model
//! Expiry is lazy: there is no background timer. An entry only leaves the
//! cache through an explicit `remove`, which the store issues when a sweep
//! observes the expiry or when the key is deleted. Until then the key stays
//! tracked — and therefore excluded from persistence — even past its
//! nominal expiry.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Time source for expiry checks
///
/// Injectable so tests can drive expiry without sleeping.
pub trait Clock: Send + Sync {
    /// The current instant
    fn now(&self) -> Instant;
}

/// Default clock backed by `Instant::now`
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Expiry tracking for ephemeral keys
pub struct TtlCache {
    /// Key -> expiry instant, at most one entry per key
    entries: HashMap<String, Instant>,

    /// Time source for `add` and `is_expired`
    clock: Arc<dyn Clock>,
}

impl TtlCache {
    /// Create an empty cache using the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty cache with a custom time source
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            clock,
        }
    }

    /// Track `key` as ephemeral, expiring `max_age` from now
    ///
    /// Replaces any existing entry for the key.
    pub fn add(&mut self, key: impl Into<String>, max_age: Duration) {
        let expiry = self.clock.now() + max_age;
        self.entries.insert(key.into(), expiry);
    }

    /// Whether `key` has an entry that is past its expiry
    ///
    /// Untracked keys are never expired.
    pub fn is_expired(&self, key: &str) -> bool {
        match self.entries.get(key) {
            Some(expiry) => self.clock.now() > *expiry,
            None => false,
        }
    }

    /// Stop tracking `key`; idempotent
    pub fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    /// Whether `key` has an entry, expired or not
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// All tracked keys, expired or not
    ///
    /// This is the codec exclusion set: a key is kept out of the persisted
    /// snapshot as long as it has any entry here, until a sweep removes it.
    pub fn cached_keys(&self) -> HashSet<String> {
        self.entries.keys().cloned().collect()
    }

    /// Drop every entry (used when the whole store is cleared)
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of tracked keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no keys are tracked
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Clock whose current instant is advanced by hand
    struct ManualClock {
        now: Mutex<Instant>,
    }

    impl ManualClock {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                now: Mutex::new(Instant::now()),
            })
        }

        fn advance(&self, by: Duration) {
            *self.now.lock() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.now.lock()
        }
    }

    #[test]
    fn test_untracked_key_is_never_expired() {
        let cache = TtlCache::new();
        assert!(!cache.is_expired("missing"));
    }

    #[test]
    fn test_entry_expires_after_max_age() {
        let clock = ManualClock::new();
        let mut cache = TtlCache::with_clock(clock.clone());

        cache.add("k", Duration::from_secs(10));
        assert!(!cache.is_expired("k"));

        clock.advance(Duration::from_secs(11));
        assert!(cache.is_expired("k"));
    }

    #[test]
    fn test_re_add_replaces_expiry() {
        let clock = ManualClock::new();
        let mut cache = TtlCache::with_clock(clock.clone());

        cache.add("k", Duration::from_secs(5));
        clock.advance(Duration::from_secs(4));

        // Refresh pushes the deadline out again
        cache.add("k", Duration::from_secs(5));
        clock.advance(Duration::from_secs(4));
        assert!(!cache.is_expired("k"));

        clock.advance(Duration::from_secs(2));
        assert!(cache.is_expired("k"));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut cache = TtlCache::new();
        cache.add("k", Duration::from_secs(10));

        cache.remove("k");
        assert!(!cache.contains("k"));

        // Second remove is a no-op
        cache.remove("k");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cached_keys_includes_expired_entries() {
        let clock = ManualClock::new();
        let mut cache = TtlCache::with_clock(clock.clone());

        cache.add("live", Duration::from_secs(100));
        cache.add("stale", Duration::from_secs(1));
        clock.advance(Duration::from_secs(2));

        // An expired-but-unswept entry still excludes its key
        let keys = cache.cached_keys();
        assert!(keys.contains("live"));
        assert!(keys.contains("stale"));
        assert_eq!(cache.len(), 2);
    }
}
