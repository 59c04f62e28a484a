use std::sync::Arc;

use crate::RefCounter;

/// A type whose instances can be recycled by a [`RefCountedPool`][crate::RefCountedPool].
///
/// Implementors embed the [`RefCounter`] that the pool's factory receives and expose it via
/// [`ref_counter()`][Self::ref_counter]. The remaining operations have default implementations
/// that delegate to the counter. They may be overridden (e.g. to add tracing) as long as the
/// override still delegates to the embedded counter.
///
/// All operations are safe to call concurrently from independent threads.
///
/// # Example
///
/// ```
/// use std::sync::Mutex;
///
/// use refcount_pool::{RefCountable, RefCountedPool, RefCounter};
///
/// struct Scratch {
///     counter: RefCounter<Self>,
///     bytes: Mutex<Vec<u8>>,
/// }
///
/// impl RefCountable for Scratch {
///     fn ref_counter(&self) -> &RefCounter<Self> {
///         &self.counter
///     }
/// }
///
/// let pool = RefCountedPool::new(
///     |counter| Scratch {
///         counter,
///         bytes: Mutex::new(Vec::new()),
///     },
///     |scratch: &Scratch| {
///         scratch.bytes.lock().unwrap().clear();
///         Ok(())
///     },
/// );
///
/// let scratch = pool.get();
/// scratch.bytes.lock().unwrap().extend_from_slice(b"hello");
///
/// // Share with another holder, then both release.
/// scratch.increment_reference_count();
/// scratch.decrement_reference_count();
/// scratch.decrement_reference_count();
///
/// // The instance was scrubbed before it went back into the pool.
/// assert!(scratch.bytes.lock().unwrap().is_empty());
/// ```
pub trait RefCountable: Sized + Send + Sync + 'static {
    /// Returns the counter embedded in this instance.
    ///
    /// This must be the counter that the pool's factory passed in when the instance was created.
    fn ref_counter(&self) -> &RefCounter<Self>;

    /// Binds this instance as the current instance of its own counter.
    ///
    /// The pool calls this exactly once per acquisition, before the instance is handed out.
    /// It establishes what gets returned to the pool when the count reaches zero.
    ///
    /// # Panics
    ///
    /// Panics if the pool is not currently handing this instance out, for example when a stale
    /// holder calls this after the instance was released. Also panics if the counter is already
    /// bound to an instance.
    fn set_instance(self: &Arc<Self>) {
        self.ref_counter().set_instance(Arc::clone(self));
    }

    /// Registers an additional holder of this instance.
    ///
    /// # Panics
    ///
    /// Panics if the instance has already been released back to its pool.
    fn increment_reference_count(&self) {
        self.ref_counter().increment();
    }

    /// Releases one holder of this instance. The last release resets the instance and recycles
    /// it into its pool.
    ///
    /// # Panics
    ///
    /// Panics if the reference count is already zero (double release) or if the pool's reset
    /// callback fails. Use [`RefCounter::try_decrement()`] to receive these as errors instead.
    fn decrement_reference_count(&self) {
        self.ref_counter().decrement();
    }
}
