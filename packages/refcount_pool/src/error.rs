use std::error::Error as StdError;

use thiserror::Error;

/// Errors that can occur when releasing a reference to a pooled instance.
///
/// These are returned by [`RefCounter::try_decrement()`][crate::RefCounter::try_decrement].
/// The regular [`decrement_reference_count()`][crate::RefCountable::decrement_reference_count]
/// treats the same conditions as invariant violations and panics with the error text.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReleaseError {
    /// The reference count was already zero when a release was attempted.
    ///
    /// The count is left untouched and the pool is not modified.
    #[error("double release of pooled instance {id}: reference count is already zero")]
    DoubleRelease {
        /// Identifier of the counter that was released one time too many.
        id: u64,
    },

    /// The reset callback refused to scrub the instance, so it was not returned to the pool.
    #[error("failed to reset pooled instance {id} before recycling it: {source}")]
    ResetFailed {
        /// Identifier of the counter whose instance failed to reset.
        id: u64,

        /// The error reported by the reset callback.
        source: ResetError,
    },
}

/// Error reported by a pool's reset callback when an instance cannot be restored to a clean
/// state.
///
/// An instance whose reset fails is never placed back into the pool.
///
/// # Example
///
/// ```
/// use refcount_pool::ResetError;
///
/// let error = ResetError::new("buffer is still mapped");
/// assert_eq!(error.to_string(), "buffer is still mapped");
/// ```
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ResetError {
    message: String,

    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl ResetError {
    /// Creates a reset error with a description of what went wrong.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a reset error that wraps an underlying cause.
    #[must_use]
    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;
    use std::io;

    use super::*;

    #[test]
    fn reset_error_exposes_source() {
        let error = ResetError::with_source("scrub failed", io::Error::other("disk gone"));

        assert_eq!(error.to_string(), "scrub failed");
        assert_eq!(error.source().unwrap().to_string(), "disk gone");
    }

    #[test]
    fn reset_error_without_source() {
        let error = ResetError::new("scrub failed");

        assert!(error.source().is_none());
    }

    #[test]
    fn release_error_messages_name_the_counter() {
        let double = ReleaseError::DoubleRelease { id: 7 };
        assert_eq!(
            double.to_string(),
            "double release of pooled instance 7: reference count is already zero"
        );

        let failed = ReleaseError::ResetFailed {
            id: 3,
            source: ResetError::new("lock poisoned"),
        };
        assert_eq!(
            failed.to_string(),
            "failed to reset pooled instance 3 before recycling it: lock poisoned"
        );
        assert_eq!(failed.source().unwrap().to_string(), "lock poisoned");
    }
}
