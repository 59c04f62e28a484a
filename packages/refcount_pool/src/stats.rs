use std::fmt;

/// A point-in-time snapshot of the lifetime statistics of a [`RefCountedPool`][crate::RefCountedPool].
///
/// All three counters only ever increase. The snapshot is intended for observability, not for
/// making correctness decisions: by the time you look at it, other threads may have moved on.
///
/// # Example
///
/// ```
/// use refcount_pool::{PooledEntry, RefCountable};
///
/// let pool = PooledEntry::<u32>::pool();
///
/// let entry = PooledEntry::new(&pool, "answer", 42);
/// entry.decrement_reference_count();
///
/// let stats = pool.stats();
/// assert_eq!(stats.allocated(), 1);
/// assert_eq!(stats.referenced(), 1);
/// assert_eq!(stats.returned(), 1);
/// assert_eq!(stats.in_use(), 0);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct PoolStats {
    allocated: u64,
    referenced: u64,
    returned: u64,
}

impl PoolStats {
    pub(crate) fn new(allocated: u64, referenced: u64, returned: u64) -> Self {
        Self {
            allocated,
            referenced,
            returned,
        }
    }

    /// Number of instances ever constructed by the pool's factory.
    #[must_use]
    pub fn allocated(&self) -> u64 {
        self.allocated
    }

    /// Number of times an instance was handed out by `get()`.
    #[must_use]
    pub fn referenced(&self) -> u64 {
        self.referenced
    }

    /// Number of times a reference count reached zero and the instance was released.
    ///
    /// This is never greater than [`referenced()`][Self::referenced].
    #[must_use]
    pub fn returned(&self) -> u64 {
        self.returned
    }

    /// Number of instances handed out that have not yet been released.
    #[must_use]
    pub fn in_use(&self) -> u64 {
        self.referenced.saturating_sub(self.returned)
    }
}

impl fmt::Display for PoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "allocated={} referenced={} returned={}",
            self.allocated, self.referenced, self.returned
        )
    }
}
