use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::constants::ERR_POISONED_LOCK;
use crate::{RefCountable, RefCountedPool, RefCounter, ResetError};

/// A pooled name/value pair.
///
/// This is a minimal payload type demonstrating how a domain type plugs into a
/// [`RefCountedPool`]: it embeds a [`RefCounter`], provides a factory ([`wrap()`][Self::wrap])
/// and a reset procedure ([`try_reset()`][Self::try_reset]) that clears both fields.
///
/// # Example
///
/// ```
/// use refcount_pool::{PooledEntry, RefCountable};
///
/// let pool = PooledEntry::<i64>::pool();
///
/// let entry = PooledEntry::new(&pool, "x", 5);
/// assert_eq!(entry.field(), "x");
/// assert_eq!(entry.value(), Some(5));
///
/// entry.decrement_reference_count();
///
/// // Released entries are scrubbed before anyone else can get them.
/// assert_eq!(entry.field(), "");
/// assert_eq!(entry.value(), None);
/// ```
pub struct PooledEntry<V: Send + 'static> {
    counter: RefCounter<Self>,
    data: Mutex<EntryData<V>>,
}

struct EntryData<V> {
    field: String,
    value: Option<V>,
}

impl<V: Send + 'static> PooledEntry<V> {
    /// Creates a pool of entries with the default configuration.
    #[must_use]
    pub fn pool() -> RefCountedPool<Self> {
        RefCountedPool::builder()
            .name("pooled_entry")
            .factory(Self::wrap)
            .reset(Self::try_reset)
            .build()
    }

    /// Takes an entry from `pool` and fills it with `field` and `value`.
    ///
    /// The returned entry has a reference count of one.
    #[must_use]
    pub fn new(pool: &RefCountedPool<Self>, field: impl Into<String>, value: V) -> Arc<Self> {
        let entry = pool.get();

        {
            let mut data = entry.lock();
            data.field = field.into();
            data.value = Some(value);
        }

        entry
    }

    /// Constructs an empty entry around `counter`. Used as the pool factory.
    #[must_use]
    pub fn wrap(counter: RefCounter<Self>) -> Self {
        Self {
            counter,
            data: Mutex::new(EntryData {
                field: String::new(),
                value: None,
            }),
        }
    }

    /// Clears the field name and the value. Used as the pool reset callback.
    ///
    /// # Errors
    ///
    /// Fails if a holder panicked while modifying the entry, in which case its contents cannot
    /// be trusted and it must not be reused.
    pub fn try_reset(&self) -> Result<(), ResetError> {
        let mut data = self
            .data
            .lock()
            .map_err(|_poisoned| ResetError::new("entry was poisoned by a panicking holder"))?;

        data.field.clear();
        data.value = None;

        Ok(())
    }

    /// The field name.
    #[must_use]
    pub fn field(&self) -> String {
        self.lock().field.clone()
    }

    /// Replaces the field name.
    pub fn set_field(&self, field: impl Into<String>) {
        self.lock().field = field.into();
    }

    /// Replaces the value, returning the previous one.
    pub fn set_value(&self, value: V) -> Option<V> {
        self.lock().value.replace(value)
    }

    /// Removes and returns the value.
    pub fn take_value(&self) -> Option<V> {
        self.lock().value.take()
    }

    fn lock(&self) -> MutexGuard<'_, EntryData<V>> {
        self.data.lock().expect(ERR_POISONED_LOCK)
    }
}

impl<V: Clone + Send + 'static> PooledEntry<V> {
    /// A copy of the value, if one is set.
    #[must_use]
    pub fn value(&self) -> Option<V> {
        self.lock().value.clone()
    }
}

impl<V: Send + 'static> RefCountable for PooledEntry<V> {
    fn ref_counter(&self) -> &RefCounter<Self> {
        &self.counter
    }
}

impl<V: fmt::Debug + Send + 'static> fmt::Debug for PooledEntry<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("PooledEntry");
        debug.field("counter", &self.counter);

        match self.data.lock() {
            Ok(data) => debug
                .field("field", &data.field)
                .field("value", &data.value)
                .finish(),
            Err(_poisoned) => debug.finish_non_exhaustive(),
        }
    }
}
