//! Concurrent Map Implementation
//!
//! This module implements a hash map guarded by a single reader/writer lock. Readers run
//! concurrently with each other, writers are exclusive, and every public operation holds the
//! lock only for the duration of the underlying `HashMap` access.
//!
//! ## Design
//!
//! The map uses:
//! - One `parking_lot::RwLock` that owns the `HashMap`, so the data is unreachable without a guard
//! - Recursive shared acquisition, so a thread already holding a shared guard (e.g. inside a
//!   [`filter`](ConcurrentMap::filter) predicate) never queues behind a waiting writer
//! - Snapshot-returning bulk reads ([`keys`](ConcurrentMap::keys),
//!   [`values`](ConcurrentMap::values), [`as_map`](ConcurrentMap::as_map)); nothing returns a
//!   live view into the map
//! - Two-phase iteration in [`for_each`](ConcurrentMap::for_each) so callbacks run with no lock held
//!
//! ## Callbacks and the lock
//!
//! | Method | Lock held while the closure runs |
//! |--------|----------------------------------|
//! | `for_each` | none |
//! | `filter` | shared |
//! | `update` | exclusive |
//!
//! A closure that runs under a lock must not take a conflicting lock on the same map: an
//! `update` transform must not touch the map at all, and a `filter` predicate must not write
//! to it. Either mistake deadlocks.
//!
//! ## Example
//!
//! ```rust
//! use cmapkit::map::ConcurrentMap;
//! use std::thread;
//!
//! let map: ConcurrentMap<u32, u32> = ConcurrentMap::new();
//!
//! thread::scope(|s| {
//!     s.spawn(|| {
//!         for i in 0..1000 {
//!             map.set(i, i * 2);
//!         }
//!     });
//!     s.spawn(|| {
//!         for i in 1000..2000 {
//!             map.set(i, i * 2);
//!         }
//!     });
//! });
//!
//! assert_eq!(map.len(), 2000);
//! assert_eq!(map.get(&1999), 3998);
//! ```

use crate::metrics::{AtomicMetrics, MapMetrics, MetricsCollector};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::sync::atomic::{AtomicBool, Ordering};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::time::Instant;
use tracing::trace;

/// A hash map guarded by a single reader/writer lock
///
/// # Type Parameters
///
/// * `K` - The key type, must implement `Hash + Eq`
/// * `V` - The value type; individual methods add `Clone`/`Default` where they copy values out
/// * `S` - The hasher builder, `RandomState` by default
///
/// # Thread Safety
///
/// The map is `Send + Sync` whenever `K`, `V` and `S` are. Each operation is linearizable on
/// its own; no ordering is promised between separate operations issued by different threads.
///
/// Shared acquisitions are recursive: a reader never waits behind a queued writer. This keeps
/// nested reads (e.g. from a `filter` predicate) deadlock-free, but under a steady stream of
/// overlapping readers a writer can be held off indefinitely.
///
/// # Examples
///
/// ```rust
/// use cmapkit::map::ConcurrentMap;
///
/// let map: ConcurrentMap<String, i32> = ConcurrentMap::new();
/// map.set("a".to_string(), 1);
/// map.set("b".to_string(), 2);
/// assert_eq!(map.len(), 2);
///
/// map.delete("a");
/// assert!(!map.has_key("a"));
/// assert_eq!(map.get("a"), 0);
/// assert_eq!(map.get_with_test("a"), (0, false));
/// ```
pub struct ConcurrentMap<K, V, S = RandomState> {
    data: RwLock<HashMap<K, V, S>>,
    metrics: AtomicMetrics,
    metrics_enabled: AtomicBool,
}

/// A [`ConcurrentMap`] hashing with `FxHash`
///
/// Faster for small keys such as integers; not resistant to adversarial keys.
pub type FxConcurrentMap<K, V> = ConcurrentMap<K, V, fxhash::FxBuildHasher>;

impl<K, V> ConcurrentMap<K, V, RandomState> {
    /// Create an empty map
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cmapkit::map::ConcurrentMap;
    ///
    /// let map: ConcurrentMap<i32, String> = ConcurrentMap::new();
    /// assert!(map.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::from_map(HashMap::new())
    }

    /// Create an empty map with room for at least `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_map(HashMap::with_capacity(capacity))
    }
}

impl<K, V, S> ConcurrentMap<K, V, S> {
    /// Create an empty map using `hasher` to hash keys
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cmapkit::map::FxConcurrentMap;
    ///
    /// let map: FxConcurrentMap<u64, u64> = FxConcurrentMap::with_hasher(Default::default());
    /// map.set(7, 49);
    /// assert_eq!(map.get(&7), 49);
    /// ```
    pub fn with_hasher(hasher: S) -> Self {
        Self::from_map(HashMap::with_hasher(hasher))
    }

    /// Create an empty map with the given capacity and hasher
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self::from_map(HashMap::with_capacity_and_hasher(capacity, hasher))
    }

    /// Wrap an existing map
    ///
    /// Ownership of `data` moves into the container; nothing is copied and no alias to it
    /// remains with the caller.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cmapkit::map::ConcurrentMap;
    /// use std::collections::HashMap;
    ///
    /// let mut data = HashMap::new();
    /// data.insert("x", 10);
    /// let map = ConcurrentMap::from_map(data);
    /// assert_eq!(map.get("x"), 10);
    /// ```
    pub fn from_map(data: HashMap<K, V, S>) -> Self {
        Self {
            data: RwLock::new(data),
            metrics: AtomicMetrics::default(),
            metrics_enabled: AtomicBool::new(true),
        }
    }

    /// Consume the container and return the map it owns
    pub fn into_inner(self) -> HashMap<K, V, S> {
        self.data.into_inner()
    }

    // Lock helpers. Every `&self` access to `data` goes through one of these two.

    fn read(&self) -> RwLockReadGuard<'_, HashMap<K, V, S>> {
        if self.is_metrics_enabled() {
            if let Some(guard) = self.data.try_read_recursive() {
                return guard;
            }
            self.metrics.record_contention();
        }
        self.data.read_recursive()
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<K, V, S>> {
        if self.is_metrics_enabled() {
            if let Some(guard) = self.data.try_write() {
                return guard;
            }
            self.metrics.record_contention();
        }
        self.data.write()
    }

    fn timer(&self) -> Option<Instant> {
        self.is_metrics_enabled().then(Instant::now)
    }

    fn finish_read(&self, start: Option<Instant>, hit: bool) {
        if let Some(start) = start {
            self.metrics.record_read(start.elapsed());
            if !hit {
                self.metrics.record_miss();
            }
        }
    }

    fn finish_write(&self, start: Option<Instant>) {
        if let Some(start) = start {
            self.metrics.record_write(start.elapsed());
        }
    }
}

impl<K, V, S> ConcurrentMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Get a copy of the value for `key`, or `V::default()` if the key is absent
    ///
    /// An absent key and a stored default value are indistinguishable here; use
    /// [`get_with_test`](Self::get_with_test) or [`get_opt`](Self::get_opt) when that matters.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cmapkit::map::ConcurrentMap;
    ///
    /// let map: ConcurrentMap<&str, i32> = ConcurrentMap::new();
    /// map.set("zero", 0);
    /// assert_eq!(map.get("zero"), 0);
    /// assert_eq!(map.get("missing"), 0);
    /// ```
    pub fn get<Q>(&self, key: &Q) -> V
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone + Default,
    {
        self.get_opt(key).unwrap_or_default()
    }

    /// Get a copy of the value for `key` together with a presence flag
    ///
    /// Returns `(value, true)` when the key is present and `(V::default(), false)` otherwise.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cmapkit::map::ConcurrentMap;
    ///
    /// let map: ConcurrentMap<&str, i32> = ConcurrentMap::new();
    /// map.set("zero", 0);
    /// assert_eq!(map.get_with_test("zero"), (0, true));
    /// assert_eq!(map.get_with_test("missing"), (0, false));
    /// ```
    pub fn get_with_test<Q>(&self, key: &Q) -> (V, bool)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone + Default,
    {
        match self.get_opt(key) {
            Some(value) => (value, true),
            None => (V::default(), false),
        }
    }

    /// Get a copy of the value for `key`, or `None` if the key is absent
    pub fn get_opt<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let start = self.timer();
        let value = self.read().get(key).cloned();
        self.finish_read(start, value.is_some());
        value
    }

    /// Check whether `key` is present
    pub fn has_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let start = self.timer();
        let present = self.read().contains_key(key);
        self.finish_read(start, present);
        present
    }

    /// Insert `value` under `key`, replacing any previous value
    pub fn set(&self, key: K, value: V) {
        let start = self.timer();
        self.write().insert(key, value);
        self.finish_write(start);
    }

    /// Remove `key` and its value; does nothing if the key is absent
    pub fn delete<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let start = self.timer();
        self.write().remove(key);
        self.finish_write(start);
    }

    /// Remove every entry
    pub fn clear(&self) {
        let start = self.timer();
        self.write().clear();
        self.finish_write(start);
    }

    /// Snapshot of all keys, in no particular order
    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        let start = self.timer();
        let keys = self.read().keys().cloned().collect();
        self.finish_read(start, true);
        keys
    }

    /// Snapshot of all values, in no particular order
    pub fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        let start = self.timer();
        let values = self.read().values().cloned().collect();
        self.finish_read(start, true);
        values
    }

    /// Shallow copy of the whole map
    ///
    /// The copy is independent of the container: mutating one never affects the other.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cmapkit::map::ConcurrentMap;
    ///
    /// let map: ConcurrentMap<&str, i32> = ConcurrentMap::new();
    /// map.set("a", 1);
    ///
    /// let mut copy = map.as_map();
    /// copy.insert("a", 100);
    /// assert_eq!(map.get("a"), 1);
    /// ```
    pub fn as_map(&self) -> HashMap<K, V, S>
    where
        K: Clone,
        V: Clone,
        S: Clone,
    {
        let start = self.timer();
        let copy = self.read().clone();
        self.finish_read(start, true);
        copy
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        let start = self.timer();
        let len = self.read().len();
        self.finish_read(start, true);
        len
    }

    /// Check if the map is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build a new map from the entries for which `predicate` returns `true`
    ///
    /// The predicate runs while the shared lock is held. It may call other read methods on
    /// this map, but calling a write method (`set`, `delete`, `update`, `clear`) on it from
    /// inside the predicate deadlocks.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cmapkit::map::ConcurrentMap;
    ///
    /// let map: ConcurrentMap<u32, u32> = (0..10).map(|i| (i, i * i)).collect();
    /// let even = map.filter(|k, _| k % 2 == 0);
    /// assert_eq!(even.len(), 5);
    /// assert_eq!(even.get(&4), 16);
    /// ```
    pub fn filter<F>(&self, mut predicate: F) -> Self
    where
        K: Clone,
        V: Clone,
        S: Clone,
        F: FnMut(&K, &V) -> bool,
    {
        let start = self.timer();
        let guard = self.read();
        let mut selected = HashMap::with_hasher(guard.hasher().clone());
        for (key, value) in guard.iter() {
            if predicate(key, value) {
                selected.insert(key.clone(), value.clone());
            }
        }
        drop(guard);
        self.finish_read(start, true);
        Self::from_map(selected)
    }

    /// Visit every key present when the call starts, without holding the lock during `f`
    ///
    /// The key set is copied first; each value is then fetched under its own short shared
    /// lock and `f(key, value, present)` is invoked with no lock held. Consequently:
    ///
    /// - `f` may call any method on this map, writes included
    /// - a key removed after the key set was copied is still visited, with `V::default()` and
    ///   `present == false`
    /// - keys inserted after the key set was copied are not visited
    /// - the traversal is a sequence of independent reads, not one consistent snapshot
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cmapkit::map::ConcurrentMap;
    ///
    /// let map: ConcurrentMap<u32, u32> = (0..4).map(|i| (i, i)).collect();
    /// let mut seen = 0;
    /// map.for_each(|key, _value, present| {
    ///     assert!(present);
    ///     map.delete(key);
    ///     seen += 1;
    /// });
    /// assert_eq!(seen, 4);
    /// assert!(map.is_empty());
    /// ```
    pub fn for_each<F>(&self, mut f: F)
    where
        K: Clone,
        V: Clone + Default,
        F: FnMut(&K, V, bool),
    {
        let keys = self.keys();
        for key in keys {
            let (value, present) = self.get_with_test(&key);
            if !present {
                trace!("for_each: key removed after the key set was captured");
            }
            f(&key, value, present);
        }
    }

    /// Replace every value with `transform(key, value)`
    ///
    /// The whole pass runs under the exclusive lock, so other threads observe either no
    /// transformed values or all of them. New values are computed before any is stored, so a
    /// panicking `transform` leaves the map unchanged. `transform` must not call any method on
    /// this map; doing so deadlocks.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cmapkit::map::ConcurrentMap;
    ///
    /// let map: ConcurrentMap<i64, i64> = (1..=3).map(|i| (i, 10)).collect();
    /// map.update(|k, v| v + k);
    /// assert_eq!(map.get(&3), 13);
    /// ```
    pub fn update<F>(&self, mut transform: F)
    where
        F: FnMut(&K, &V) -> V,
    {
        let start = self.timer();
        let mut guard = self.write();
        let next: Vec<V> = guard.iter().map(|(key, value)| transform(key, value)).collect();
        // No insert or remove in between, so `values_mut` walks the same order as `iter`.
        for (value, replacement) in guard.values_mut().zip(next) {
            *value = replacement;
        }
        drop(guard);
        self.finish_write(start);
    }
}

impl<K, V, S> MetricsCollector for ConcurrentMap<K, V, S> {
    fn metrics(&self) -> MapMetrics {
        self.metrics.snapshot()
    }

    fn reset_metrics(&self) {
        self.metrics.reset();
    }

    fn set_metrics_enabled(&self, enabled: bool) {
        self.metrics_enabled.store(enabled, Ordering::Relaxed);
    }

    fn is_metrics_enabled(&self) -> bool {
        cfg!(feature = "metrics") && self.metrics_enabled.load(Ordering::Relaxed)
    }
}

impl<K, V, S: Default> Default for ConcurrentMap<K, V, S> {
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S> From<HashMap<K, V, S>> for ConcurrentMap<K, V, S> {
    fn from(data: HashMap<K, V, S>) -> Self {
        Self::from_map(data)
    }
}

impl<K, V, S> FromIterator<(K, V)> for ConcurrentMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_map(iter.into_iter().collect())
    }
}

impl<K, V, S> Extend<(K, V)> for ConcurrentMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        // `&mut self` already rules out other users, no need to lock.
        self.data.get_mut().extend(iter);
    }
}

impl<K, V, S> Clone for ConcurrentMap<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BuildHasher + Clone,
{
    fn clone(&self) -> Self {
        Self::from_map(self.as_map())
    }
}

impl<K, V, S> fmt::Debug for ConcurrentMap<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.read().iter()).finish()
    }
}
