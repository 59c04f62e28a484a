//! This package provides [`RefCountedPool`], a thread-safe object pool that recycles an instance
//! the moment the last holder of a reference to it lets go.
//!
//! Reusing instances instead of freeing and reallocating them keeps allocation churn down in
//! high-throughput systems where the same kind of object is created over and over.
//!
//! # How it works
//!
//! A poolable type implements [`RefCountable`] by embedding a [`RefCounter`]. The pool creates
//! the counter and hands it to a factory that builds the instance around it.
//!
//! 1. [`RefCountedPool::get()`] returns an instance with a reference count of one, reusing a
//!    recycled instance if one is available and calling the factory otherwise.
//! 2. Holders share the instance via
//!    [`increment_reference_count()`][RefCountable::increment_reference_count] and release it
//!    via [`decrement_reference_count()`][RefCountable::decrement_reference_count].
//! 3. When the count reaches zero, the pool's reset callback scrubs the instance and it is
//!    placed back into the pool for the next `get()`.
//!
//! # Features
//!
//! - **Explicit reference counting**: The count is separate from any `Arc` strong count, so
//!   ownership can be handed across threads and APIs that do not speak Rust lifetimes.
//! - **Mandatory reset**: No state leaks from one use of an instance into the next.
//! - **Misuse detection**: Releasing an instance twice or referencing an instance after it was
//!   released panics instead of corrupting the pool.
//! - **Statistics**: Every pool counts allocated, handed out and returned instances. The same
//!   numbers are published as `nm` events for process-wide reporting.
//! - **Optional leak detection**: A pool can be configured to panic on drop if instances are
//!   still checked out.
//!
//! # Example
//!
//! ```rust
//! use refcount_pool::{PooledEntry, RefCountable};
//!
//! // An explicit pool handle, passed to whoever needs entries.
//! let pool = PooledEntry::<u32>::pool();
//!
//! let entry = PooledEntry::new(&pool, "retries", 3);
//! assert_eq!(entry.ref_counter().count(), 1);
//!
//! // A second holder takes a reference and later releases it.
//! entry.increment_reference_count();
//! entry.decrement_reference_count();
//!
//! // The last release scrubs the entry and returns it to the pool.
//! entry.decrement_reference_count();
//! assert_eq!(entry.field(), "");
//!
//! // The next request is served without a new allocation.
//! let again = PooledEntry::new(&pool, "timeouts", 1);
//! assert_eq!(pool.stats().allocated(), 1);
//! assert_eq!(pool.stats().returned(), 1);
//! # again.decrement_reference_count();
//! ```
//!
//! # Panics
//!
//! Reference counting mistakes are bugs in the calling code and there is no way to continue
//! safely after one. Releasing more references than were taken, or failing to reset an instance,
//! panics. [`RefCounter::try_decrement()`] reports the same conditions as a [`ReleaseError`]
//! for callers that prefer to handle them.

mod builder;
mod constants;
mod contract;
mod counter;
mod drop_policy;
mod entry;
mod error;
mod metrics;
mod pool;
mod stats;

pub use builder::*;
pub use contract::*;
pub use counter::*;
pub use drop_policy::*;
pub use entry::*;
pub use error::*;
pub(crate) use pool::PoolShared;
pub use pool::RefCountedPool;
pub use stats::*;
