use dashmap::DashMap;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use memoizer_core::CacheableKey;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

#[cfg(feature = "stats")]
use memoizer_core::CacheStats;

/// `None` means the computation panicked.
type SharedOutcome<V, E> = Shared<BoxFuture<'static, Option<Result<V, E>>>>;

struct InFlight<V, E> {
    id: u64,
    future: SharedOutcome<V, E>,
}

/// An async memoizer that runs each keyed computation at most once.
///
/// The async counterpart of [`memoizer_core::Memoizer`]: resolved outcomes,
/// `Ok` or `Err`, are stored for the lifetime of the instance and concurrent
/// first calls for a key await one shared execution.
///
/// # Storage
///
/// - Resolved outcomes live in a `DashMap`, so lookups from many tasks do not
///   contend on a single lock
/// - In-flight computations live in a `parking_lot::Mutex`-protected registry
///   as `futures::future::Shared` futures. The registry lock is never held
///   across an `.await`
///
/// # Cancellation
///
/// Dropping a `compute` future only detaches that caller. The shared
/// computation keeps running for the remaining waiters. If every waiter is
/// dropped, the computation stays parked in the registry and the next caller
/// for the key resumes it instead of starting over. Deadlines are the
/// computation's business: an error it returns because a deadline passed is
/// stored like any other error.
///
/// # Panics
///
/// A panicking computation is caught. Nothing is stored for the key, the
/// caller that registered the computation panics with a message naming the
/// key, and other waiters retry with their own computations.
///
/// # Examples
///
/// ```
/// use memoizer_async::AsyncMemoizer;
///
/// # futures::executor::block_on(async {
/// let memo: AsyncMemoizer<u64, String> = AsyncMemoizer::new();
///
/// let first = memo.compute("user:42", || async { Ok(42) }).await;
/// let second = memo.compute("user:42", || async { Ok(0) }).await;
///
/// assert_eq!(first, Ok(42));
/// assert_eq!(second, Ok(42));
/// # });
/// ```
pub struct AsyncMemoizer<V, E> {
    entries: DashMap<String, Result<V, E>>,
    in_flight: Mutex<HashMap<String, InFlight<V, E>>>,
    next_id: AtomicU64,
    #[cfg(feature = "stats")]
    stats: CacheStats,
}

impl<V, E> AsyncMemoizer<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Creates an empty async memoizer.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty async memoizer pre-sized for `capacity` outcomes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: DashMap::with_capacity(capacity),
            in_flight: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            #[cfg(feature = "stats")]
            stats: CacheStats::new(),
        }
    }

    /// Returns the outcome stored for `key`, computing it with `f` first if
    /// the key has not been resolved yet.
    ///
    /// # Parameters
    ///
    /// * `key` - Anything implementing [`CacheableKey`]
    /// * `f` - Produces the computation's future. It is called lazily, on the
    ///   first poll of the shared future and outside every lock, and only
    ///   for the caller that registers the computation
    ///
    /// # Deadlocks
    ///
    /// The computation must not await `compute` on this memoizer with the
    /// same key.
    ///
    /// # Panics
    ///
    /// Panics if the computation registered by this call panicked.
    pub async fn compute<K, F, Fut>(&self, key: &K, f: F) -> Result<V, E>
    where
        K: CacheableKey + ?Sized,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let key = key.to_cache_key();

        if let Some(outcome) = self.lookup(&key) {
            trace!(key = %key, "memoized outcome");
            #[cfg(feature = "stats")]
            self.stats.record_hit();
            return outcome;
        }

        let (id, future) = loop {
            let (id, future) = {
                let mut in_flight = self.in_flight.lock();
                // Outcomes are stored before their registration is removed, so
                // checking again under the registry lock cannot miss both.
                if let Some(outcome) = self.lookup(&key) {
                    #[cfg(feature = "stats")]
                    self.stats.record_hit();
                    return outcome;
                }
                match in_flight.get(&key) {
                    Some(call) => (call.id, call.future.clone()),
                    None => {
                        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                        let future = Self::share(f);
                        in_flight.insert(
                            key.clone(),
                            InFlight {
                                id,
                                future: future.clone(),
                            },
                        );
                        debug!(key = %key, id, "leading computation");
                        break (id, future);
                    }
                }
            };

            trace!(key = %key, id, "awaiting in-flight computation");
            match future.await {
                Some(outcome) => {
                    self.settle(&key, id, &outcome);
                    #[cfg(feature = "stats")]
                    self.stats.record_coalesced();
                    return outcome;
                }
                None => {
                    self.deregister(&key, id);
                    debug!(key = %key, id, "in-flight computation panicked, retrying");
                }
            }
        };

        match future.await {
            Some(outcome) => {
                self.settle(&key, id, &outcome);
                #[cfg(feature = "stats")]
                self.stats.record_miss();
                outcome
            }
            None => {
                self.deregister(&key, id);
                panic!("memoized computation for key `{key}` panicked");
            }
        }
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
        self.entries.contains_key(&key.to_cache_key())
    }

    /// Number of resolved keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no key has been resolved yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of computations registered but not yet settled.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Returns this memoizer's statistics.
    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    fn share<F, Fut>(f: F) -> SharedOutcome<V, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        AssertUnwindSafe(async move { f().await })
            .catch_unwind()
            .map(Result::ok)
            .boxed()
            .shared()
    }

    fn lookup(&self, key: &str) -> Option<Result<V, E>> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Stores the outcome, then drops the registration it came from.
    ///
    /// Every waiter of a computation calls this; only the first store wins.
    fn settle(&self, key: &str, id: u64, outcome: &Result<V, E>) {
        self.entries
            .entry(key.to_owned())
            .or_insert_with(|| outcome.clone());
        self.deregister(key, id);
    }

    fn deregister(&self, key: &str, id: u64) {
        let mut in_flight = self.in_flight.lock();
        if in_flight.get(key).is_some_and(|call| call.id == id) {
            in_flight.remove(key);
        }
    }
}

impl<V, E> Default for AsyncMemoizer<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V, E> fmt::Debug for AsyncMemoizer<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncMemoizer")
            .field("entries", &self.entries.len())
            .field("in_flight", &self.in_flight.lock().len())
            .finish_non_exhaustive()
    }
}
