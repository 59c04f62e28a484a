use std::fmt;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use arc_swap::ArcSwapOption;
use tracing::{trace, warn};

use crate::{PoolShared, RefCountable, ReleaseError};

/// The reference counter embedded in every instance managed by a
/// [`RefCountedPool`][crate::RefCountedPool].
///
/// A counter is created by the pool and handed to the pool's factory, which must embed it in the
/// instance it constructs. The counter stays with that instance for its whole life, across any
/// number of acquire/release cycles.
///
/// The counter holds:
///
/// * the atomic reference count,
/// * a weak back-reference to the pool that recycles the instance,
/// * the current instance, bound on every acquisition and cleared on release.
///
/// Clearing the current instance on release means that a holder that keeps using the instance
/// after releasing it can detect this via [`is_bound()`][Self::is_bound], and any further
/// increment or decrement through the stale handle panics instead of corrupting the pool.
/// Binding is only accepted while the pool is handing the instance out, so a stale holder cannot
/// bind an instance that sits in the pool. Once the pool hands the instance out again, the
/// counter is bound anew and a stale holder becomes indistinguishable from the new one.
pub struct RefCounter<T: RefCountable> {
    id: u64,
    count: AtomicUsize,
    pool: Weak<PoolShared<T>>,
    instance: ArcSwapOption<T>,

    // Set by the pool right before it binds the instance, consumed by the binding.
    binding: AtomicBool,
}

impl<T: RefCountable> RefCounter<T> {
    pub(crate) fn new(id: u64, pool: Weak<PoolShared<T>>) -> Self {
        Self {
            id,
            count: AtomicUsize::new(0),
            pool,
            instance: ArcSwapOption::const_empty(),
            binding: AtomicBool::new(false),
        }
    }

    /// Identifier of this counter, unique within the pool that allocated it.
    ///
    /// Identifiers are assigned in allocation order, starting from 1.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current reference count.
    ///
    /// This is zero while the instance sits in the pool waiting to be reused. The value may be
    /// outdated by the time it is observed if other threads hold references.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Whether the counter is currently bound to an instance, i.e. the instance is checked out.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.instance.load().is_some()
    }

    /// Returns the instance this counter is currently bound to, if any.
    #[must_use]
    pub fn instance(&self) -> Option<Arc<T>> {
        self.instance.load_full()
    }

    /// Binds `instance` as the current instance of this counter.
    ///
    /// This is the mechanism behind [`RefCountable::set_instance()`] and is driven by the pool.
    /// The pool permits exactly one binding each time it hands the instance out.
    ///
    /// # Panics
    ///
    /// Panics if `instance` does not embed this counter, if the pool is not currently handing the
    /// instance out or if the counter is already bound. The counter is not modified in any of
    /// these cases.
    pub fn set_instance(&self, instance: Arc<T>) {
        assert!(
            ptr::eq(instance.ref_counter(), self),
            "instance {} can only be bound to the counter embedded in it",
            self.id
        );

        assert!(
            self.binding
                .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
                .is_ok(),
            "instance {} can only be bound by its pool while being handed out",
            self.id
        );

        let previous = self.instance.swap(Some(instance));

        assert!(
            previous.is_none(),
            "instance {} was bound while it was already checked out",
            self.id
        );
    }

    /// Atomically adds one reference.
    ///
    /// # Panics
    ///
    /// Panics if the count is zero, which means the instance has already been released and the
    /// caller is using a stale handle. The count is not modified in that case.
    pub fn increment(&self) {
        // Relaxed is enough because a new reference can only be created from an existing one,
        // which already synchronizes with whoever handed it over.
        let result = self
            .count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |count| {
                if count == 0 {
                    None
                } else {
                    count.checked_add(1)
                }
            });

        match result {
            Ok(_) => {}
            Err(0) => panic!(
                "instance {} was referenced after it had been released to the pool",
                self.id
            ),
            Err(_) => panic!("reference count of instance {} overflowed", self.id),
        }
    }

    /// Atomically removes one reference. If this was the last reference, the instance is reset
    /// and returned to its pool.
    ///
    /// # Panics
    ///
    /// Panics if the count is already zero (double release) or if the pool's reset callback
    /// fails. In both cases the pool does not receive the instance.
    pub fn decrement(&self) {
        if let Err(error) = self.try_decrement() {
            panic!("{error}");
        }
    }

    /// Atomically removes one reference, reporting invariant violations as errors.
    ///
    /// If this was the last reference:
    ///
    /// 1. the pool's `returned` statistic is incremented,
    /// 2. the counter stops tracking its current instance,
    /// 3. the pool's reset callback scrubs the instance,
    /// 4. the clean instance is placed into the pool for reuse.
    ///
    /// If the pool no longer exists, the instance is simply dropped by the counter.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::DoubleRelease`] if the count is already zero. Nothing is modified
    /// in that case.
    ///
    /// Returns [`ReleaseError::ResetFailed`] if the reset callback fails. The count has reached
    /// zero but the instance is discarded instead of being placed into the pool.
    pub fn try_decrement(&self) -> Result<(), ReleaseError> {
        // Release publishes our writes to the instance to whoever performs the final release,
        // Acquire lets the final releaser observe all of them before resetting.
        let previous = self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                count.checked_sub(1)
            })
            .map_err(|_count| ReleaseError::DoubleRelease { id: self.id })?;

        if previous == 1 {
            self.release()
        } else {
            Ok(())
        }
    }

    /// Permits the next [`set_instance()`][Self::set_instance] call. Called by the pool right
    /// before it binds an instance it is handing out.
    pub(crate) fn permit_binding(&self) {
        let previous = self.binding.swap(true, Ordering::AcqRel);

        assert!(
            !previous,
            "instance {} was handed out while a binding was already pending",
            self.id
        );
    }

    /// Marks the counter as checked out with a single reference. Called by the pool after binding.
    pub(crate) fn acquire(&self) {
        let previous = self.count.swap(1, Ordering::Release);

        assert!(
            previous == 0,
            "instance {} was handed out while still referenced {previous} times",
            self.id
        );
    }

    /// Whether this counter was created by the given pool.
    pub(crate) fn belongs_to(&self, pool: &Arc<PoolShared<T>>) -> bool {
        ptr::eq(self.pool.as_ptr(), Arc::as_ptr(pool))
    }

    #[cfg(test)]
    pub(crate) fn force_count(&self, count: usize) {
        self.count.store(count, Ordering::Release);
    }

    fn release(&self) -> Result<(), ReleaseError> {
        // The binding must be cleared before the instance becomes visible in the pool, otherwise
        // the next `get()` could bind it while we still hold the old binding.
        let instance = self
            .instance
            .swap(None)
            .expect("a reference count can only reach zero on an instance that was checked out");

        let Some(pool) = self.pool.upgrade() else {
            warn!(id = self.id, "pool no longer exists, discarding released instance");
            return Ok(());
        };

        pool.record_returned();

        if let Err(source) = pool.reset(&instance) {
            warn!(
                pool = pool.name(),
                id = self.id,
                error = %source,
                "reset failed, discarding released instance"
            );
            return Err(ReleaseError::ResetFailed {
                id: self.id,
                source,
            });
        }

        trace!(pool = pool.name(), id = self.id, "instance recycled");
        pool.recycle(instance);

        Ok(())
    }
}

impl<T: RefCountable> fmt::Debug for RefCounter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefCounter")
            .field("id", &self.id)
            .field("count", &self.count.load(Ordering::Relaxed))
            .field("bound", &self.is_bound())
            .finish_non_exhaustive()
    }
}
