//! Process-wide metrics for reference-counted pools.
//!
//! These mirror the per-pool statistics returned by `RefCountedPool::stats()`, aggregated over
//! every pool in the process. The events are per-thread to minimize contention.

use nm::Event;

thread_local! {
    /// A new instance was constructed by a pool factory.
    pub(crate) static ALLOCATED: Event = Event::builder()
        .name("refcount_pool_allocated")
        .build();

    /// An instance was handed out by `get()`.
    pub(crate) static REFERENCED: Event = Event::builder()
        .name("refcount_pool_referenced")
        .build();

    /// A reference count reached zero and the instance was released to its pool.
    pub(crate) static RETURNED: Event = Event::builder()
        .name("refcount_pool_returned")
        .build();

    /// A reset callback failed and the released instance was discarded.
    pub(crate) static RESET_FAILED: Event = Event::builder()
        .name("refcount_pool_reset_failed")
        .build();
}
