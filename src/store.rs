//! Store Module
//!
//! The core store that coordinates all components.
//!
//! ## Responsibilities
//! - Own the in-memory map and the TTL cache
//! - Apply mutations and run the lazy-expiry sweeps
//! - Trigger dumps through the dump scheduler
//! - Load the persisted snapshot on startup
//!
//! ## Concurrency Model
//!
//! - **Map access**: every public method serializes map+cache access
//!   through one internal mutex, so the store is safe to share across
//!   threads behind an `Arc`.
//! - **Dumps**: the dump scheduler holds its own lock covering the
//!   encode+write critical section. A mutating call releases the map lock
//!   before requesting a dump; the dump's encode step re-acquires it
//!   briefly, so the frame reflects the map state current when the dump
//!   starts. Auto-dump is synchronous: a slow disk slows down every
//!   mutating call rather than losing writes.
//!
//! ## Absent Keys
//! Missing keys are results, not errors: lookups return `Option`/`bool`.
//! `Err` is reserved for wrong value kinds and persistence failures.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::cache::{Clock, TtlCache};
use crate::codec;
use crate::config::Config;
use crate::dump::DumpScheduler;
use crate::error::{EmberError, Result};
use crate::value::{Kind, Scalar, Value};

/// Map and TTL cache behind the store's internal lock
struct State {
    map: HashMap<String, Value>,
    ttl: TtlCache,
}

impl State {
    /// Purge `key` from both map and cache if its TTL entry has expired
    fn sweep_key(&mut self, key: &str) {
        if self.ttl.is_expired(key) {
            self.ttl.remove(key);
            self.map.remove(key);
            tracing::trace!(key, "swept expired key");
        }
    }

    /// Purge every key whose TTL entry has expired
    fn sweep_all(&mut self) {
        let expired: Vec<String> = self
            .ttl
            .cached_keys()
            .into_iter()
            .filter(|key| self.ttl.is_expired(key))
            .collect();

        for key in expired {
            self.ttl.remove(&key);
            self.map.remove(&key);
            tracing::trace!(key = %key, "swept expired key");
        }
    }
}

/// The embedded key-value store
///
/// Loads a single data file into memory, mutates the in-memory map, and
/// persists back to disk eagerly (auto-dump) or on explicit `commit`.
pub struct Store {
    /// Store configuration
    config: Config,

    /// In-memory map and TTL cache (internal mutex)
    state: Mutex<State>,

    /// Serialized, atomic persistence to the destination path
    dumper: DumpScheduler,

    /// Set by `close`; suppresses the best-effort flush on drop
    closed: AtomicBool,
}

impl Store {
    /// Open or create a store with the given config
    ///
    /// Loading rules:
    /// - missing file → empty store
    /// - zero-length file → empty store
    /// - anything else must decode as a complete, checksum-valid snapshot,
    ///   or the load fails (a corrupt file is never treated as empty)
    pub fn open(config: Config) -> Result<Self> {
        Self::open_inner(config, TtlCache::new())
    }

    /// Open with a custom TTL clock
    ///
    /// Primarily for tests that need deterministic expiry.
    pub fn open_with_clock(config: Config, clock: Arc<dyn Clock>) -> Result<Self> {
        Self::open_inner(config, TtlCache::with_clock(clock))
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified destination file.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(Config::new(path, true))
    }

    fn open_inner(config: Config, ttl: TtlCache) -> Result<Self> {
        let map = if config.path.exists() {
            let bytes = fs::read(&config.path)?;
            if bytes.is_empty() {
                HashMap::new()
            } else {
                codec::decode(&bytes)?
            }
        } else {
            HashMap::new()
        };

        tracing::debug!(
            path = %config.path.display(),
            keys = map.len(),
            auto_dump = config.auto_dump,
            "opened store"
        );

        Ok(Self {
            dumper: DumpScheduler::new(&config.path),
            config,
            state: Mutex::new(State { map, ttl }),
            closed: AtomicBool::new(false),
        })
    }

    // =========================================================================
    // Scalar Operations
    // =========================================================================

    /// Set the value of a key
    ///
    /// Drops any TTL entry for the key (a plain set makes the key durable
    /// again) and auto-dumps if enabled.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        {
            let mut state = self.state.lock();
            state.ttl.remove(&key);
            state.map.insert(key, value.into());
        }
        self.autodump()
    }

    /// Set the value of a key with a time-to-live
    ///
    /// The key becomes ephemeral: it is excluded from every persisted
    /// snapshot and lazily evicted once `max_age` has passed. Ephemeral
    /// writes skip eager persistence, so this never dumps. A zero
    /// `max_age` is treated as no TTL at all and behaves like `set`.
    pub fn set_expiring(
        &self,
        key: impl Into<String>,
        value: impl Into<Value>,
        max_age: Duration,
    ) -> Result<()> {
        if max_age.is_zero() {
            return self.set(key, value);
        }

        let key = key.into();
        let mut state = self.state.lock();
        state.map.insert(key.clone(), value.into());
        state.ttl.add(key, max_age);
        Ok(())
    }

    /// Get the value of a key
    ///
    /// Sweeps the key's TTL state first: an expired key is removed from
    /// both map and cache before the lookup answers.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut state = self.state.lock();
        state.sweep_key(key);
        state.map.get(key).cloned()
    }

    /// All keys currently in the store
    ///
    /// Runs a full sweep first so stale expired keys never appear.
    pub fn get_all(&self) -> Vec<String> {
        let mut state = self.state.lock();
        state.sweep_all();
        state.map.keys().cloned().collect()
    }

    /// Whether a key exists
    pub fn exists(&self, key: &str) -> bool {
        let mut state = self.state.lock();
        state.sweep_all();
        state.map.contains_key(key)
    }

    /// Total number of keys in the store
    pub fn total_keys(&self) -> usize {
        let mut state = self.state.lock();
        state.sweep_all();
        state.map.len()
    }

    /// Delete a key
    ///
    /// Returns `false` if the key was absent. Removes any TTL entry either
    /// way; auto-dumps only when a key was actually removed.
    pub fn rem(&self, key: &str) -> Result<bool> {
        let removed = {
            let mut state = self.state.lock();
            state.ttl.remove(key);
            state.map.remove(key).is_some()
        };

        if removed {
            self.autodump()?;
        }
        Ok(removed)
    }

    /// Append to a string value
    ///
    /// Returns `false` if the key is absent; fails with a kind error if the
    /// stored value is not a string.
    pub fn append(&self, key: &str, tail: &str) -> Result<bool> {
        {
            let mut state = self.state.lock();
            state.sweep_key(key);

            match state.map.get_mut(key) {
                None => return Ok(false),
                Some(Value::Str(s)) => s.push_str(tail),
                Some(other) => return Err(EmberError::kind(Kind::Str, other.kind())),
            }
        }
        self.autodump()?;
        Ok(true)
    }

    /// Delete everything from the store
    pub fn del_db(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            state.map.clear();
            state.ttl.clear();
        }
        self.autodump()
    }

    // =========================================================================
    // List Operations
    // =========================================================================

    /// Create an empty list under `name`, replacing any existing value
    pub fn lcreate(&self, name: impl Into<String>) -> Result<()> {
        self.set(name, Value::List(Vec::new()))
    }

    /// Push a scalar onto a list
    ///
    /// Returns `false` if the list does not exist.
    pub fn ladd(&self, name: &str, value: impl Into<Scalar>) -> Result<bool> {
        self.with_list_mut(name, |items| {
            items.push(value.into());
        })
    }

    /// Extend a list with a sequence of scalars
    pub fn lextend(&self, name: &str, values: impl IntoIterator<Item = Scalar>) -> Result<bool> {
        self.with_list_mut(name, |items| {
            items.extend(values);
        })
    }

    /// All values in a list, or `None` if the key is absent
    pub fn lget_all(&self, name: &str) -> Result<Option<Vec<Scalar>>> {
        let mut state = self.state.lock();
        state.sweep_key(name);

        match state.map.get(name) {
            None => Ok(None),
            Some(Value::List(items)) => Ok(Some(items.clone())),
            Some(other) => Err(EmberError::kind(Kind::List, other.kind())),
        }
    }

    /// One value in a list, or `None` if the key or index is absent
    pub fn lget(&self, name: &str, index: usize) -> Result<Option<Scalar>> {
        let mut state = self.state.lock();
        state.sweep_key(name);

        match state.map.get(name) {
            None => Ok(None),
            Some(Value::List(items)) => Ok(items.get(index).cloned()),
            Some(other) => Err(EmberError::kind(Kind::List, other.kind())),
        }
    }

    /// A range of values in a list (slice semantics)
    ///
    /// `None` bounds default to the ends; bounds are clamped to the list
    /// length and an inverted range yields an empty slice.
    pub fn lrange(
        &self,
        name: &str,
        start: Option<usize>,
        end: Option<usize>,
    ) -> Result<Option<Vec<Scalar>>> {
        let mut state = self.state.lock();
        state.sweep_key(name);

        match state.map.get(name) {
            None => Ok(None),
            Some(Value::List(items)) => {
                let start = start.unwrap_or(0).min(items.len());
                let end = end.unwrap_or(items.len()).min(items.len());
                if start >= end {
                    return Ok(Some(Vec::new()));
                }
                Ok(Some(items[start..end].to_vec()))
            }
            Some(other) => Err(EmberError::kind(Kind::List, other.kind())),
        }
    }

    /// Remove a list and all of its values, returning how many it held
    ///
    /// Returns `0` if the key was absent.
    pub fn lrem_list(&self, name: &str) -> Result<usize> {
        let count = {
            let mut state = self.state.lock();
            state.sweep_key(name);

            match state.map.get(name) {
                None => return Ok(0),
                Some(Value::List(items)) => items.len(),
                Some(other) => return Err(EmberError::kind(Kind::List, other.kind())),
            }
        };

        // Kind already verified; rem handles the delete + dump
        self.rem(name)?;
        Ok(count)
    }

    /// Remove the first occurrence of a value from a list
    ///
    /// Returns `false` if the key or the value is absent.
    pub fn lrem_value(&self, name: &str, value: &Scalar) -> Result<bool> {
        let removed = {
            let mut state = self.state.lock();
            state.sweep_key(name);

            match state.map.get_mut(name) {
                None => return Ok(false),
                Some(Value::List(items)) => match items.iter().position(|item| item == value) {
                    Some(index) => {
                        items.remove(index);
                        true
                    }
                    None => false,
                },
                Some(other) => return Err(EmberError::kind(Kind::List, other.kind())),
            }
        };

        if removed {
            self.autodump()?;
        }
        Ok(removed)
    }

    /// Remove and return one value in a list
    ///
    /// Returns `None` if the key or index is absent.
    pub fn lpop(&self, name: &str, index: usize) -> Result<Option<Scalar>> {
        let popped = {
            let mut state = self.state.lock();
            state.sweep_key(name);

            match state.map.get_mut(name) {
                None => return Ok(None),
                Some(Value::List(items)) => {
                    if index >= items.len() {
                        return Ok(None);
                    }
                    items.remove(index)
                }
                Some(other) => return Err(EmberError::kind(Kind::List, other.kind())),
            }
        };

        self.autodump()?;
        Ok(Some(popped))
    }

    /// Length of a list, or `None` if the key is absent
    pub fn llen(&self, name: &str) -> Result<Option<usize>> {
        let mut state = self.state.lock();
        state.sweep_key(name);

        match state.map.get(name) {
            None => Ok(None),
            Some(Value::List(items)) => Ok(Some(items.len())),
            Some(other) => Err(EmberError::kind(Kind::List, other.kind())),
        }
    }

    /// Whether a value exists in a list
    pub fn lexists(&self, name: &str, value: &Scalar) -> Result<bool> {
        let mut state = self.state.lock();
        state.sweep_key(name);

        match state.map.get(name) {
            None => Ok(false),
            Some(Value::List(items)) => Ok(items.contains(value)),
            Some(other) => Err(EmberError::kind(Kind::List, other.kind())),
        }
    }

    /// Append to a string element inside a list
    ///
    /// Returns `false` if the key or index is absent; fails with a kind
    /// error if the list element is not a string.
    pub fn lappend(&self, name: &str, index: usize, tail: &str) -> Result<bool> {
        {
            let mut state = self.state.lock();
            state.sweep_key(name);

            match state.map.get_mut(name) {
                None => return Ok(false),
                Some(Value::List(items)) => match items.get_mut(index) {
                    None => return Ok(false),
                    Some(Scalar::Str(s)) => s.push_str(tail),
                    Some(other) => return Err(EmberError::kind(Kind::Str, other.kind())),
                },
                Some(other) => return Err(EmberError::kind(Kind::List, other.kind())),
            }
        }
        self.autodump()?;
        Ok(true)
    }

    // =========================================================================
    // Dict Operations
    // =========================================================================

    /// Create an empty dict under `name`, replacing any existing value
    pub fn dcreate(&self, name: impl Into<String>) -> Result<()> {
        self.set(name, Value::Dict(HashMap::new()))
    }

    /// Add a key-value pair to a dict
    ///
    /// Returns `false` if the dict does not exist.
    pub fn dadd(&self, name: &str, key: impl Into<String>, value: impl Into<Scalar>) -> Result<bool> {
        self.with_dict_mut(name, |entries| {
            entries.insert(key.into(), value.into());
        })
    }

    /// The value for a key in a dict, or `None` if either is absent
    pub fn dget(&self, name: &str, key: &str) -> Result<Option<Scalar>> {
        let mut state = self.state.lock();
        state.sweep_key(name);

        match state.map.get(name) {
            None => Ok(None),
            Some(Value::Dict(entries)) => Ok(entries.get(key).cloned()),
            Some(other) => Err(EmberError::kind(Kind::Dict, other.kind())),
        }
    }

    /// All key-value pairs in a dict, or `None` if the key is absent
    pub fn dget_all(&self, name: &str) -> Result<Option<HashMap<String, Scalar>>> {
        let mut state = self.state.lock();
        state.sweep_key(name);

        match state.map.get(name) {
            None => Ok(None),
            Some(Value::Dict(entries)) => Ok(Some(entries.clone())),
            Some(other) => Err(EmberError::kind(Kind::Dict, other.kind())),
        }
    }

    /// Remove a dict and all of its pairs
    ///
    /// Returns `false` if the key was absent.
    pub fn drem(&self, name: &str) -> Result<bool> {
        {
            let mut state = self.state.lock();
            state.sweep_key(name);

            match state.map.get(name) {
                None => return Ok(false),
                Some(Value::Dict(_)) => {}
                Some(other) => return Err(EmberError::kind(Kind::Dict, other.kind())),
            }
        }

        self.rem(name)
    }

    /// Remove and return one key-value pair from a dict
    ///
    /// Returns `None` if the dict or the key is absent.
    pub fn dpop(&self, name: &str, key: &str) -> Result<Option<Scalar>> {
        let popped = {
            let mut state = self.state.lock();
            state.sweep_key(name);

            match state.map.get_mut(name) {
                None => return Ok(None),
                Some(Value::Dict(entries)) => match entries.remove(key) {
                    None => return Ok(None),
                    Some(value) => value,
                },
                Some(other) => return Err(EmberError::kind(Kind::Dict, other.kind())),
            }
        };

        self.autodump()?;
        Ok(Some(popped))
    }

    /// All keys of a dict, or `None` if the key is absent
    pub fn dkeys(&self, name: &str) -> Result<Option<Vec<String>>> {
        let mut state = self.state.lock();
        state.sweep_key(name);

        match state.map.get(name) {
            None => Ok(None),
            Some(Value::Dict(entries)) => Ok(Some(entries.keys().cloned().collect())),
            Some(other) => Err(EmberError::kind(Kind::Dict, other.kind())),
        }
    }

    /// All values of a dict, or `None` if the key is absent
    pub fn dvals(&self, name: &str) -> Result<Option<Vec<Scalar>>> {
        let mut state = self.state.lock();
        state.sweep_key(name);

        match state.map.get(name) {
            None => Ok(None),
            Some(Value::Dict(entries)) => Ok(Some(entries.values().cloned().collect())),
            Some(other) => Err(EmberError::kind(Kind::Dict, other.kind())),
        }
    }

    /// Whether a key exists in a dict
    pub fn dexists(&self, name: &str, key: &str) -> Result<bool> {
        let mut state = self.state.lock();
        state.sweep_key(name);

        match state.map.get(name) {
            None => Ok(false),
            Some(Value::Dict(entries)) => Ok(entries.contains_key(key)),
            Some(other) => Err(EmberError::kind(Kind::Dict, other.kind())),
        }
    }

    /// Merge the pairs of `src` into `dest` (src wins on collisions)
    ///
    /// Returns `false` if either dict is absent; `src` is left intact.
    pub fn dmerge(&self, dest: &str, src: &str) -> Result<bool> {
        {
            let mut state = self.state.lock();
            state.sweep_key(dest);
            state.sweep_key(src);

            let src_entries = match state.map.get(src) {
                None => return Ok(false),
                Some(Value::Dict(entries)) => entries.clone(),
                Some(other) => return Err(EmberError::kind(Kind::Dict, other.kind())),
            };

            match state.map.get_mut(dest) {
                None => return Ok(false),
                Some(Value::Dict(entries)) => entries.extend(src_entries),
                Some(other) => return Err(EmberError::kind(Kind::Dict, other.kind())),
            }
        }

        self.autodump()?;
        Ok(true)
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Dump the current snapshot to disk, waiting for any in-flight dump
    pub fn commit(&self) -> Result<()> {
        self.dump_now()
    }

    /// Close the store gracefully
    ///
    /// Runs a final dump (regardless of the auto-dump flag) and suppresses
    /// the best-effort flush on drop.
    pub fn close(self) -> Result<()> {
        self.dump_now()?;
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Dump if auto-dump is enabled
    fn autodump(&self) -> Result<()> {
        if self.config.auto_dump {
            self.dump_now()?;
        }
        Ok(())
    }

    /// Encode and write one snapshot, serialized with other dumps
    ///
    /// The encode step runs under the dump lock and re-acquires the state
    /// lock briefly, so the frame reflects the map as of dump start and
    /// excludes every key with a TTL entry.
    fn dump_now(&self) -> Result<()> {
        self.dumper.request_dump(|| {
            let state = self.state.lock();
            let excluded = state.ttl.cached_keys();
            codec::encode(&state.map, &excluded)
        })
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// The destination file path
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// The configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Run a mutation against an existing list, then auto-dump
    ///
    /// Returns `Ok(false)` when the key is absent, a kind error when the
    /// stored value is not a list.
    fn with_list_mut(&self, name: &str, mutate: impl FnOnce(&mut Vec<Scalar>)) -> Result<bool> {
        {
            let mut state = self.state.lock();
            state.sweep_key(name);

            match state.map.get_mut(name) {
                None => return Ok(false),
                Some(Value::List(items)) => mutate(items),
                Some(other) => return Err(EmberError::kind(Kind::List, other.kind())),
            }
        }
        self.autodump()?;
        Ok(true)
    }

    /// Run a mutation against an existing dict, then auto-dump
    fn with_dict_mut(
        &self,
        name: &str,
        mutate: impl FnOnce(&mut HashMap<String, Scalar>),
    ) -> Result<bool> {
        {
            let mut state = self.state.lock();
            state.sweep_key(name);

            match state.map.get_mut(name) {
                None => return Ok(false),
                Some(Value::Dict(entries)) => mutate(entries),
                Some(other) => return Err(EmberError::kind(Kind::Dict, other.kind())),
            }
        }
        self.autodump()?;
        Ok(true)
    }
}

impl Drop for Store {
    /// Best-effort final flush, mirroring the explicit `close` teardown
    ///
    /// Skipped when auto-dump is off or `close` already ran. Failures are
    /// logged, not raised: there is no caller left to handle them.
    fn drop(&mut self) {
        if self.closed.load(Ordering::SeqCst) || !self.config.auto_dump {
            return;
        }

        if let Err(e) = self.dump_now() {
            tracing::warn!(
                path = %self.config.path.display(),
                error = %e,
                "final flush failed"
            );
        }
    }
}

/// Open or create a store at `path`
///
/// Convenience factory matching `Store::open(Config::new(path, auto_dump))`.
pub fn load(path: impl AsRef<Path>, auto_dump: bool) -> Result<Store> {
    Store::open(Config::new(path, auto_dump))
}
