//! Order validation for sorted record streams.
//!
//! Every stream entering a merge must be strictly increasing in
//! [`EntityKey`] order. Violations are fatal; nothing is skipped or
//! re-sorted.

use thiserror::Error;

use crate::{EntityKey, Keyed, RecordSource};

/// Fixed prefix of every ordering diagnostic.
pub const UNSORTED_INPUT_PREFIX: &str = "Pipeline entities are not sorted";

/// A stream delivered a key that does not follow its predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Pipeline entities are not sorted, previous entity {previous} is followed by {current}")]
pub struct UnsortedInputError {
    /// Last key accepted from the stream.
    pub previous: EntityKey,
    /// Offending key, equal to or lower than `previous`.
    pub current: EntityKey,
}

/// Tracks the last accepted key of a single stream.
///
/// # Examples
/// ```
/// use osmerge_core::{EntityKey, OrderValidator};
///
/// let mut validator = OrderValidator::new();
/// validator.check(EntityKey::node(5))?;
/// let err = validator.check(EntityKey::node(3)).expect_err("out of order");
/// assert!(err.to_string().starts_with("Pipeline entities are not sorted"));
/// # Ok::<(), osmerge_core::UnsortedInputError>(())
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderValidator {
    previous: Option<EntityKey>,
}

impl OrderValidator {
    /// Create a validator that has not yet seen a key.
    #[must_use]
    pub const fn new() -> Self {
        Self { previous: None }
    }

    /// Accept `key` if it is strictly greater than the last accepted key.
    ///
    /// A rejected key leaves the validator unchanged.
    ///
    /// # Errors
    /// Returns [`UnsortedInputError`] when `key <= previous`.
    pub fn check(&mut self, key: EntityKey) -> Result<(), UnsortedInputError> {
        if let Some(previous) = self.previous
            && key <= previous
        {
            return Err(UnsortedInputError {
                previous,
                current: key,
            });
        }
        self.previous = Some(key);
        Ok(())
    }

    /// Last key accepted, if any.
    #[must_use]
    pub const fn previous(&self) -> Option<EntityKey> {
        self.previous
    }
}

/// Failure pulling from a [`ValidatedSource`].
#[derive(Debug, Error)]
pub enum ReadError<E> {
    /// The wrapped source delivered records out of order.
    #[error(transparent)]
    Unsorted(#[from] UnsortedInputError),
    /// The wrapped source itself failed.
    #[error("record source failed")]
    Source(#[source] E),
}

/// A [`RecordSource`] whose records are checked against the stream order
/// as they are pulled.
#[derive(Debug)]
pub struct ValidatedSource<S> {
    inner: S,
    validator: OrderValidator,
}

impl<S> ValidatedSource<S>
where
    S: RecordSource,
    S::Record: Keyed,
{
    /// Wrap `inner`.
    pub const fn new(inner: S) -> Self {
        Self {
            inner,
            validator: OrderValidator::new(),
        }
    }

    /// Pull and validate the next record.
    ///
    /// # Errors
    /// Returns [`ReadError::Unsorted`] on an ordering violation and
    /// [`ReadError::Source`] when the wrapped source fails.
    pub fn next_record(&mut self) -> Result<Option<S::Record>, ReadError<S::Error>> {
        let Some(record) = self.inner.next_record().map_err(ReadError::Source)? else {
            return Ok(None);
        };
        self.validator.check(record.key())?;
        Ok(Some(record))
    }

    /// Return the wrapped source.
    pub fn into_inner(self) -> S {
        self.inner
    }
}
