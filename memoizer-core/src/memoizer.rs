use crate::singleflight::Group;
use crate::CacheableKey;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use tracing::trace;

#[cfg(feature = "stats")]
use crate::singleflight::Role;
#[cfg(feature = "stats")]
use crate::CacheStats;

/// A thread-safe memoizer that runs each keyed computation at most once.
///
/// `Memoizer` is meant to live for a short, well-defined scope such as one
/// HTTP request: create it at the start, share it by reference (or `Arc`)
/// with every worker of that scope, and drop it at the end. Entries never
/// expire and are never evicted; every distinct key seen stays stored until
/// the memoizer is dropped.
///
/// # Type Parameters
///
/// * `V` - The success type produced by computations
/// * `E` - The error type produced by computations
///
/// Both are handed out by `Clone`; wrap large values in `Arc` to keep
/// replays cheap.
///
/// # Semantics
///
/// - **Memoization**: once a key resolves, its outcome is returned verbatim
///   on every later call and the computation is not invoked again
/// - **Error caching**: `Err` outcomes are stored and replayed exactly like
///   `Ok` outcomes; there is no automatic retry
/// - **Coalescing**: concurrent first calls for a key share one execution
///   through a [`Group`]; all of them receive the same outcome
/// - **Isolation**: each instance is its own namespace of keys
///
/// Callers cannot tell a fresh outcome from a replayed one.
///
/// # Thread Safety
///
/// Stored outcomes live behind a `parking_lot::RwLock`. Cache hits take the
/// read lock only, so concurrent hits never block each other. The write lock
/// is taken by the leader of a coalesced call after its computation returned,
/// never while the group's registry lock is held.
///
/// # Examples
///
/// ```
/// use memoizer_core::Memoizer;
/// use std::cell::Cell;
///
/// let memo: Memoizer<u64, String> = Memoizer::new();
/// let calls = Cell::new(0);
///
/// let first = memo.compute("user:42", || {
///     calls.set(calls.get() + 1);
///     Ok(42)
/// });
/// let second = memo.compute("user:42", || {
///     calls.set(calls.get() + 1);
///     Ok(0)
/// });
///
/// assert_eq!(first, Ok(42));
/// assert_eq!(second, Ok(42));
/// assert_eq!(calls.get(), 1);
/// ```
///
/// Multi-value keys are joined with `|`:
///
/// ```
/// use memoizer_core::Memoizer;
///
/// let memo: Memoizer<String, ()> = Memoizer::new();
/// let page = memo.compute(&("orders", 7, 2), || Ok("page two".to_string()));
/// assert_eq!(page, Ok("page two".to_string()));
/// assert!(memo.contains_key("orders|7|2"));
/// ```
pub struct Memoizer<V, E> {
    entries: RwLock<HashMap<String, Result<V, E>>>,
    group: Group<Result<V, E>>,
    #[cfg(feature = "stats")]
    stats: CacheStats,
}

impl<V: Clone, E: Clone> Memoizer<V, E> {
    /// Creates an empty memoizer.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty memoizer with room for `capacity` outcomes before the
    /// entry map reallocates.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::with_capacity(capacity)),
            group: Group::new(),
            #[cfg(feature = "stats")]
            stats: CacheStats::new(),
        }
    }

    /// Returns the outcome stored for `key`, computing it with `f` first if
    /// the key has not been resolved yet.
    ///
    /// # Parameters
    ///
    /// * `key` - Anything implementing [`CacheableKey`]: a `&str`, a
    ///   primitive, a tuple of values, or a custom key type
    /// * `f` - The computation. It is invoked at most once per key for the
    ///   lifetime of this memoizer, and only by the caller that leads the
    ///   coalesced call
    ///
    /// # Returns
    ///
    /// A clone of the stored outcome, `Ok` or `Err`.
    ///
    /// # Algorithm
    ///
    /// 1. **Fast path**: read lock over the entry map; a stored outcome is
    ///    returned immediately
    /// 2. **Slow path**: the key goes through the coalescing group. A caller
    ///    arriving while another computation for the key runs waits for it
    /// 3. **Leader body**: the map is checked again (another leader may have
    ///    stored the key in the meantime), then `f` runs and its outcome is
    ///    stored under the write lock before it is fanned out to waiters
    ///
    /// # Deadlocks
    ///
    /// `f` must not call `compute` on this memoizer with the same key. Using
    /// other keys from inside `f` is fine.
    pub fn compute<K, F>(&self, key: &K, f: F) -> Result<V, E>
    where
        K: CacheableKey + ?Sized,
        F: FnOnce() -> Result<V, E>,
    {
        let key = key.to_cache_key();

        if let Some(outcome) = self.lookup(&key) {
            trace!(key = %key, "memoized outcome");
            #[cfg(feature = "stats")]
            self.stats.record_hit();
            return outcome;
        }

        let mut executed = false;
        let (outcome, role) = self.group.call(&key, || {
            if let Some(outcome) = self.lookup(&key) {
                return outcome;
            }
            executed = true;
            let outcome = f();
            self.entries.write().insert(key.clone(), outcome.clone());
            trace!(key = %key, ok = outcome.is_ok(), "stored outcome");
            outcome
        });

        #[cfg(feature = "stats")]
        {
            match role {
                Role::Leader if executed => self.stats.record_miss(),
                Role::Leader => self.stats.record_hit(),
                Role::Follower => self.stats.record_coalesced(),
            }
        }
        #[cfg(not(feature = "stats"))]
        let _ = (role, executed);

        outcome
    }

    /// Returns the stored outcome for `key` without computing anything.
    pub fn get<K>(&self, key: &K) -> Option<Result<V, E>>
    where
        K: CacheableKey + ?Sized,
    {
        self.lookup(&key.to_cache_key())
    }

    /// Returns `true` if an outcome is stored for `key`.
    pub fn contains_key<K>(&self, key: &K) -> bool
    where
        K: CacheableKey + ?Sized,
    {
        self.entries.read().contains_key(&key.to_cache_key())
    }

    /// Number of resolved keys.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if no key has been resolved yet.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn lookup(&self, key: &str) -> Option<Result<V, E>> {
        self.entries.read().get(key).cloned()
    }

    /// Returns this memoizer's statistics.
    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

impl<V: Clone, E: Clone> Default for Memoizer<V, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, E> fmt::Debug for Memoizer<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoizer")
            .field("entries", &self.entries.read().len())
            .finish_non_exhaustive()
    }
}
