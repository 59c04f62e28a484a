/// Determines what happens when the last handle to a pool is dropped while instances taken
/// from it are still checked out.
///
/// By default, the pool is simply dropped. Instances still in use stay alive as long as their
/// holders keep them and are discarded instead of recycled once released.
///
/// # Examples
///
/// ```
/// use refcount_pool::{DropPolicy, PooledEntry, RefCountedPool};
///
/// // The drop policy is set at pool creation time.
/// let pool = RefCountedPool::<PooledEntry<u32>>::builder()
///     .factory(PooledEntry::wrap)
///     .reset(PooledEntry::try_reset)
///     .drop_policy(DropPolicy::MustNotDropItems)
///     .build();
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DropPolicy {
    /// The pool may be dropped while instances are still checked out. This is the default.
    #[default]
    MayDropItems,

    /// The pool will panic if it is dropped while instances are still checked out.
    ///
    /// This acts as leak detection: every instance obtained via `get()` is expected to have its
    /// reference count brought back to zero before the pool goes away.
    MustNotDropItems,
}
