use std::any::type_name;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use scc::Bag;
use tracing::{debug, trace};

use crate::{
    DropPolicy, PoolStats, RefCountable, RefCountedPoolBuilder, RefCounter, ResetError, metrics,
};

pub(crate) type Factory<T> = dyn Fn(RefCounter<T>) -> T + Send + Sync;
pub(crate) type Reset<T> = dyn Fn(&T) -> Result<(), ResetError> + Send + Sync;

/// A thread-safe pool of reference-counted instances of `T`.
///
/// [`get()`][Self::get] hands out an instance with a reference count of one. Holders share the
/// instance by calling [`increment_reference_count()`][RefCountable::increment_reference_count]
/// and release it with [`decrement_reference_count()`][RefCountable::decrement_reference_count].
/// When the count reaches zero, the pool's reset callback scrubs the instance and it goes back
/// into the pool, ready to be handed out again without a new allocation.
///
/// The pool grows by calling its factory whenever no recycled instance is available and never
/// shrinks while it exists. No guarantee is made about which recycled instance `get()` returns.
///
/// This type acts as a cloneable handle to a shared pool instance. Instances hold only a weak
/// reference to the pool, so the pool is dropped together with its last handle.
///
/// A checked-out instance is kept alive by its own counter until its last reference is released.
/// Dropping every `Arc` to an instance without calling
/// [`decrement_reference_count()`][RefCountable::decrement_reference_count] leaks that instance.
///
/// # Thread safety
///
/// This type is thread-safe and can be shared across threads. All operations are non-blocking.
///
/// # Example
///
/// ```rust
/// use std::thread;
///
/// use refcount_pool::{PooledEntry, RefCountable};
///
/// let pool = PooledEntry::<u64>::pool();
///
/// let entry = PooledEntry::new(&pool, "requests", 1);
///
/// // Share the entry with another thread, which releases its reference when done.
/// entry.increment_reference_count();
/// let shared = entry.clone();
/// thread::spawn(move || {
///     assert_eq!(shared.value(), Some(1));
///     shared.decrement_reference_count();
/// })
/// .join()
/// .unwrap();
///
/// entry.decrement_reference_count();
///
/// // The next request reuses the same instance.
/// let reused = pool.get();
/// assert_eq!(pool.stats().allocated(), 1);
/// assert_eq!(reused.field(), "");
/// ```
pub struct RefCountedPool<T: RefCountable> {
    shared: Arc<PoolShared<T>>,
}

impl<T: RefCountable> RefCountedPool<T> {
    /// Creates a pool with the default configuration.
    ///
    /// * `factory` constructs a new instance around the counter it is given. The counter must be
    ///   embedded in the instance and returned from [`RefCountable::ref_counter()`].
    /// * `reset` scrubs an instance whose reference count has reached zero. An instance is only
    ///   recycled if this returns `Ok`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use refcount_pool::{PooledEntry, RefCountedPool};
    ///
    /// let pool = RefCountedPool::new(PooledEntry::<String>::wrap, PooledEntry::try_reset);
    /// ```
    #[must_use]
    pub fn new<F, R>(factory: F, reset: R) -> Self
    where
        F: Fn(RefCounter<T>) -> T + Send + Sync + 'static,
        R: Fn(&T) -> Result<(), ResetError> + Send + Sync + 'static,
    {
        Self::builder().factory(factory).reset(reset).build()
    }

    /// Returns a builder for creating a pool with custom configuration.
    ///
    /// # Example
    ///
    /// ```rust
    /// use refcount_pool::{DropPolicy, PooledEntry, RefCountedPool};
    ///
    /// let pool = RefCountedPool::builder()
    ///     .name("entries")
    ///     .factory(PooledEntry::<u8>::wrap)
    ///     .reset(PooledEntry::try_reset)
    ///     .drop_policy(DropPolicy::MustNotDropItems)
    ///     .build();
    /// ```
    pub fn builder() -> RefCountedPoolBuilder<T> {
        RefCountedPoolBuilder::new()
    }

    pub(crate) fn from_parts(
        name: &'static str,
        factory: Box<Factory<T>>,
        reset: Box<Reset<T>>,
        drop_policy: DropPolicy,
    ) -> Self {
        Self {
            shared: Arc::new(PoolShared {
                name,
                storage: Bag::default(),
                factory,
                reset,
                drop_policy,
                allocated: AtomicU64::new(0),
                referenced: AtomicU64::new(0),
                returned: AtomicU64::new(0),
            }),
        }
    }

    /// Hands out an instance with a reference count of exactly one.
    ///
    /// A recycled instance is reused if one is available. Otherwise, the factory constructs a
    /// new instance around a fresh counter.
    ///
    /// The caller owns the single reference and is responsible for eventually releasing it via
    /// [`decrement_reference_count()`][RefCountable::decrement_reference_count].
    ///
    /// # Panics
    ///
    /// Panics if the factory does not embed the counter it was given.
    ///
    /// # Example
    ///
    /// ```rust
    /// use refcount_pool::{PooledEntry, RefCountable};
    ///
    /// let pool = PooledEntry::<u32>::pool();
    ///
    /// let entry = pool.get();
    /// assert_eq!(entry.ref_counter().count(), 1);
    /// ```
    #[must_use]
    pub fn get(&self) -> Arc<T> {
        let shared = &self.shared;

        let instance = if let Some(instance) = shared.storage.pop() {
            trace!(
                pool = shared.name,
                id = instance.ref_counter().id(),
                "reusing recycled instance"
            );
            instance
        } else {
            self.allocate()
        };

        instance.ref_counter().permit_binding();
        instance.set_instance();

        // Release pairs with the Acquire in `stats()`. Every `returned` increment for this
        // acquisition happens after this point, which keeps `returned <= referenced` in snapshots.
        shared.referenced.fetch_add(1, Ordering::Release);
        metrics::REFERENCED.with(|e| e.observe_once());

        instance.ref_counter().acquire();

        instance
    }

    /// Returns a snapshot of the pool's lifetime statistics.
    ///
    /// # Example
    ///
    /// ```rust
    /// use refcount_pool::PooledEntry;
    ///
    /// let pool = PooledEntry::<u32>::pool();
    /// let _entry = pool.get();
    ///
    /// let stats = pool.stats();
    /// assert_eq!(stats.allocated(), 1);
    /// assert_eq!(stats.referenced(), 1);
    /// assert_eq!(stats.returned(), 0);
    /// ```
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.shared.stats()
    }

    /// The name the pool was configured with, used to label log events.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.shared.name
    }

    fn allocate(&self) -> Arc<T> {
        let shared = &self.shared;

        // Identifiers start at 1 so that they match the allocation count after the increment.
        let id = shared
            .allocated
            .fetch_add(1, Ordering::Relaxed)
            .wrapping_add(1);
        metrics::ALLOCATED.with(|e| e.observe_once());

        let counter = RefCounter::new(id, Arc::downgrade(shared));
        let instance = Arc::new((shared.factory)(counter));

        let counter = instance.ref_counter();
        assert!(
            counter.id() == id && counter.belongs_to(shared),
            "the pool factory must embed the counter it was given"
        );

        debug!(pool = shared.name, id, "allocated new instance");

        instance
    }
}

impl<T: RefCountable> Clone for RefCountedPool<T> {
    /// Creates another handle to the same pool.
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: RefCountable> fmt::Debug for RefCountedPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("shared", &self.shared)
            .finish()
    }
}

/// State shared between all handles of one pool and, weakly, all counters it created.
pub(crate) struct PoolShared<T: RefCountable> {
    name: &'static str,

    /// Recycled instances, all reset and unbound, waiting to be handed out again.
    storage: Bag<Arc<T>>,

    factory: Box<Factory<T>>,
    reset: Box<Reset<T>>,
    drop_policy: DropPolicy,

    allocated: AtomicU64,
    referenced: AtomicU64,
    returned: AtomicU64,
}

impl<T: RefCountable> PoolShared<T> {
    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn record_returned(&self) {
        self.returned.fetch_add(1, Ordering::Release);
        metrics::RETURNED.with(|e| e.observe_once());
    }

    pub(crate) fn reset(&self, instance: &T) -> Result<(), ResetError> {
        let result = (self.reset)(instance);

        if result.is_err() {
            metrics::RESET_FAILED.with(|e| e.observe_once());
        }

        result
    }

    pub(crate) fn recycle(&self, instance: Arc<T>) {
        self.storage.push(instance);
    }

    fn stats(&self) -> PoolStats {
        // `returned` is loaded first. Any acquisition it accounts for has already been counted
        // in `referenced`, so the snapshot never shows more returns than references.
        let returned = self.returned.load(Ordering::Acquire);
        let referenced = self.referenced.load(Ordering::Acquire);
        let allocated = self.allocated.load(Ordering::Relaxed);

        PoolStats::new(allocated, referenced, returned)
    }
}

impl<T: RefCountable> fmt::Debug for PoolShared<T> {
    #[cfg_attr(test, mutants::skip)] // The length of a concurrent bag is only a diagnostic hint.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("name", &self.name)
            .field("stats", &self.stats())
            .field("recycled", &self.storage.len())
            .field("drop_policy", &self.drop_policy)
            .finish_non_exhaustive()
    }
}

impl<T: RefCountable> Drop for PoolShared<T> {
    fn drop(&mut self) {
        if self.drop_policy != DropPolicy::MustNotDropItems || thread::panicking() {
            return;
        }

        let in_use = self.stats().in_use();

        assert!(
            in_use == 0,
            "pool '{}' dropped with {in_use} instances still checked out, which is forbidden by DropPolicy::MustNotDropItems",
            self.name
        );
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::AtomicBool;

    use static_assertions::assert_impl_all;

    use super::*;
    use crate::{PooledEntry, ReleaseError};

    assert_impl_all!(RefCountedPool<PooledEntry<u32>>: Send, Sync, Clone);

    /// Payload whose reset can be told to fail.
    struct Fragile {
        counter: RefCounter<Self>,
        broken: AtomicBool,
    }

    impl RefCountable for Fragile {
        fn ref_counter(&self) -> &RefCounter<Self> {
            &self.counter
        }
    }

    fn fragile_pool() -> RefCountedPool<Fragile> {
        RefCountedPool::new(
            |counter| Fragile {
                counter,
                broken: AtomicBool::new(false),
            },
            |fragile: &Fragile| {
                if fragile.broken.load(Ordering::Relaxed) {
                    Err(ResetError::new("fragile instance is broken"))
                } else {
                    Ok(())
                }
            },
        )
    }

    #[test]
    fn get_from_empty_pool_allocates() {
        let pool = PooledEntry::<u32>::pool();

        let entry = pool.get();

        assert_eq!(entry.ref_counter().count(), 1);
        assert_eq!(pool.stats(), PoolStats::new(1, 1, 0));
    }

    #[test]
    fn released_instance_is_reused() {
        let pool = PooledEntry::<u32>::pool();

        let first = pool.get();
        first.decrement_reference_count();
        assert_eq!(pool.stats(), PoolStats::new(1, 1, 1));

        let second = pool.get();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.ref_counter().count(), 1);
        assert!(second.ref_counter().is_bound());
        assert_eq!(pool.stats(), PoolStats::new(1, 2, 1));
    }

    #[test]
    fn outstanding_instances_force_allocation() {
        let pool = PooledEntry::<u32>::pool();

        let entries = (0..5).map(|_| pool.get()).collect::<Vec<_>>();

        let ids = entries
            .iter()
            .map(|e| e.ref_counter().id())
            .collect::<HashSet<_>>();
        assert_eq!(ids, (1..=5).collect::<HashSet<_>>());
        assert_eq!(pool.stats().allocated(), 5);

        for entry in &entries {
            entry.decrement_reference_count();
        }

        // Five recycled instances cover the next five requests.
        let again = (0..5).map(|_| pool.get()).collect::<Vec<_>>();
        assert_eq!(pool.stats(), PoolStats::new(5, 10, 5));

        for entry in &again {
            entry.decrement_reference_count();
        }
    }

    #[test]
    fn clones_share_one_pool() {
        let pool = PooledEntry::<u32>::pool();
        let other = pool.clone();

        let entry = other.get();
        entry.decrement_reference_count();

        let reused = pool.get();

        assert!(Arc::ptr_eq(&entry, &reused));
        assert_eq!(pool.stats(), other.stats());
    }

    #[test]
    fn reset_failure_discards_instance() {
        let pool = fragile_pool();

        let fragile = pool.get();
        fragile.broken.store(true, Ordering::Relaxed);

        let result = fragile.ref_counter().try_decrement();
        assert!(matches!(
            result,
            Err(ReleaseError::ResetFailed { id: 1, .. })
        ));

        // The release was counted but the instance never went back into storage.
        assert_eq!(pool.stats(), PoolStats::new(1, 1, 1));
        assert!(!fragile.ref_counter().is_bound());

        let replacement = pool.get();
        assert!(!Arc::ptr_eq(&fragile, &replacement));
        assert_eq!(replacement.ref_counter().id(), 2);
        assert_eq!(pool.stats().allocated(), 2);
    }

    #[test]
    #[should_panic]
    fn reset_failure_panics_on_plain_decrement() {
        let pool = fragile_pool();

        let fragile = pool.get();
        fragile.broken.store(true, Ordering::Relaxed);

        fragile.decrement_reference_count();
    }

    #[test]
    fn drop_without_outstanding_instances_does_not_panic_if_policy_must_not_drop() {
        let pool = RefCountedPool::builder()
            .factory(PooledEntry::<u32>::wrap)
            .reset(PooledEntry::try_reset)
            .drop_policy(DropPolicy::MustNotDropItems)
            .build();

        let entry = pool.get();
        entry.decrement_reference_count();

        drop(pool);
    }

    #[test]
    #[should_panic]
    fn drop_with_outstanding_instances_panics_if_policy_must_not_drop() {
        let pool = RefCountedPool::builder()
            .factory(PooledEntry::<u32>::wrap)
            .reset(PooledEntry::try_reset)
            .drop_policy(DropPolicy::MustNotDropItems)
            .build();

        let _entry = pool.get();

        drop(pool);
    }

    #[test]
    fn drop_with_outstanding_instances_is_fine_by_default() {
        let pool = PooledEntry::<u32>::pool();

        let entry = pool.get();
        drop(pool);

        entry.decrement_reference_count();
    }

    #[test]
    fn debug_output_names_pool() {
        let pool = RefCountedPool::builder()
            .name("debuggable")
            .factory(PooledEntry::<u32>::wrap)
            .reset(PooledEntry::try_reset)
            .build();

        let debug = format!("{pool:?}");

        assert!(debug.contains("debuggable"));
        assert!(debug.contains("allocated: 0"));
    }
}
