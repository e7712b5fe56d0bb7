use std::sync::atomic::{AtomicU64, Ordering};

/// Per-memoizer statistics for monitoring how often computations actually run.
///
/// Every call to `compute` is counted exactly once, in one of three buckets:
///
/// - **hits**: the outcome was already stored and no computation was involved
/// - **misses**: the supplied computation was executed for this call
/// - **coalesced**: the call attached to another caller's in-flight
///   computation and received its outcome
///
/// # Thread Safety
///
/// All operations use atomic operations with `Relaxed` ordering. Counters are
/// observational only and never influence caching decisions.
///
/// # Examples
///
/// ```
/// use memoizer_core::CacheStats;
///
/// let stats = CacheStats::new();
///
/// stats.record_hit();
/// stats.record_hit();
/// stats.record_miss();
/// stats.record_coalesced();
///
/// assert_eq!(stats.hits(), 2);
/// assert_eq!(stats.misses(), 1);
/// assert_eq!(stats.coalesced(), 1);
/// assert_eq!(stats.total_accesses(), 4);
/// assert!((stats.hit_rate() - 0.5).abs() < 0.001);
/// ```
#[derive(Debug)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
}

impl CacheStats {
    /// Creates a new `CacheStats` instance with zero counters.
    pub fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            coalesced: AtomicU64::new(0),
        }
    }

    /// Records a lookup answered from the stored outcomes.
    #[inline]
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an execution of the supplied computation.
    #[inline]
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a caller that waited on another caller's computation.
    #[inline]
    pub fn record_coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the total number of hits.
    #[inline]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Returns the total number of misses, i.e. computations executed.
    #[inline]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Returns the total number of coalesced calls.
    #[inline]
    pub fn coalesced(&self) -> u64 {
        self.coalesced.load(Ordering::Relaxed)
    }

    /// Returns the total number of recorded calls (hits + misses + coalesced).
    #[inline]
    pub fn total_accesses(&self) -> u64 {
        self.hits() + self.misses() + self.coalesced()
    }

    /// Fraction of calls answered without running or waiting on a computation.
    ///
    /// Returns 0.0 if there have been no accesses.
    ///
    /// # Examples
    ///
    /// ```
    /// use memoizer_core::CacheStats;
    ///
    /// let stats = CacheStats::new();
    /// assert_eq!(stats.hit_rate(), 0.0);
    ///
    /// stats.record_hit();
    /// stats.record_miss();
    /// stats.record_miss();
    /// assert!((stats.hit_rate() - 0.3333).abs() < 0.001);
    /// ```
    #[inline]
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_accesses();
        if total == 0 {
            0.0
        } else {
            self.hits() as f64 / total as f64
        }
    }

    /// Complement of [`hit_rate`](Self::hit_rate).
    #[inline]
    pub fn miss_rate(&self) -> f64 {
        1.0 - self.hit_rate()
    }

    /// Resets all counters to zero.
    ///
    /// Only the counters are cleared; stored outcomes are untouched.
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.coalesced.store(0, Ordering::Relaxed);
    }
}

impl Default for CacheStats {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for CacheStats {
    fn clone(&self) -> Self {
        Self {
            hits: AtomicU64::new(self.hits()),
            misses: AtomicU64::new(self.misses()),
            coalesced: AtomicU64::new(self.coalesced()),
        }
    }
}
