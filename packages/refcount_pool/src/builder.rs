use std::any::type_name;
use std::fmt;

use crate::pool::{Factory, Reset};
use crate::{DropPolicy, RefCountable, RefCountedPool, RefCounter, ResetError};

const DEFAULT_NAME: &str = "refcount_pool";

/// Builder for creating an instance of [`RefCountedPool`].
///
/// The factory and the reset callback are mandatory, whereas other settings are optional.
///
/// # Examples
///
/// ```
/// use refcount_pool::{DropPolicy, PooledEntry, RefCountedPool};
///
/// let pool = RefCountedPool::builder()
///     .name("sessions")
///     .factory(PooledEntry::<u64>::wrap)
///     .reset(PooledEntry::try_reset)
///     .drop_policy(DropPolicy::MustNotDropItems)
///     .build();
///
/// assert_eq!(pool.name(), "sessions");
/// ```
#[must_use]
pub struct RefCountedPoolBuilder<T: RefCountable> {
    name: &'static str,
    factory: Option<Box<Factory<T>>>,
    reset: Option<Box<Reset<T>>>,
    drop_policy: DropPolicy,
}

impl<T: RefCountable> RefCountedPoolBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            name: DEFAULT_NAME,
            factory: None,
            reset: None,
            drop_policy: DropPolicy::default(),
        }
    }

    /// Sets the name of the pool, used to label its log events.
    ///
    /// Defaults to `"refcount_pool"`.
    pub fn name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Sets the factory that constructs a new instance around a freshly created counter.
    ///
    /// The factory must embed the counter it receives in the instance it returns.
    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(RefCounter<T>) -> T + Send + Sync + 'static,
    {
        self.factory = Some(Box::new(factory));
        self
    }

    /// Sets the callback that scrubs an instance whose reference count has reached zero.
    ///
    /// The callback must restore every field to its baseline value. If it returns an error, the
    /// instance is discarded instead of recycled.
    pub fn reset<R>(mut self, reset: R) -> Self
    where
        R: Fn(&T) -> Result<(), ResetError> + Send + Sync + 'static,
    {
        self.reset = Some(Box::new(reset));
        self
    }

    /// Sets the [drop policy][DropPolicy] for the pool. This governs what happens when the pool
    /// is dropped while instances are still checked out.
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// Builds the pool with the specified configuration.
    ///
    /// # Panics
    ///
    /// Panics if no factory has been set using [`factory`](Self::factory) or no reset callback
    /// has been set using [`reset`](Self::reset).
    #[must_use]
    pub fn build(self) -> RefCountedPool<T> {
        let factory = self
            .factory
            .expect("a factory must be set before building a RefCountedPool");
        let reset = self
            .reset
            .expect("a reset callback must be set before building a RefCountedPool");

        RefCountedPool::from_parts(self.name, factory, reset, self.drop_policy)
    }
}

impl<T: RefCountable> fmt::Debug for RefCountedPoolBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("name", &self.name)
            .field("has_factory", &self.factory.is_some())
            .field("has_reset", &self.reset.is_some())
            .field("drop_policy", &self.drop_policy)
            .finish()
    }
}
