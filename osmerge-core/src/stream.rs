//! Capability traits for stages that produce or consume records.
//!
//! A stage is "pollable" when it implements [`RecordSource`] and
//! "receivable" when it implements [`RecordSink`]. Merge engines consume two
//! sources; pipeline channels implement both ends.

use std::convert::Infallible;
use std::fmt;

/// Pull-based producer of records.
pub trait RecordSource {
    /// Record type produced.
    type Record;
    /// Failure type of the producer.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Pull the next record, or `None` once the stream has ended.
    ///
    /// # Errors
    /// Returns the producer's error when the record cannot be delivered.
    fn next_record(&mut self) -> Result<Option<Self::Record>, Self::Error>;
}

/// Push-based consumer of records.
pub trait RecordSink {
    /// Record type consumed.
    type Record;
    /// Failure type of the consumer.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Accept one record.
    ///
    /// # Errors
    /// Returns the consumer's error when the record cannot be accepted.
    fn receive(&mut self, record: Self::Record) -> Result<(), Self::Error>;

    /// Signal that no further records will arrive.
    ///
    /// # Errors
    /// Returns the consumer's error when the stream cannot be finalised.
    fn complete(&mut self) -> Result<(), Self::Error>;
}

impl<S: RecordSource + ?Sized> RecordSource for &mut S {
    type Record = S::Record;
    type Error = S::Error;

    fn next_record(&mut self) -> Result<Option<Self::Record>, Self::Error> {
        (**self).next_record()
    }
}

impl<S: RecordSink + ?Sized> RecordSink for &mut S {
    type Record = S::Record;
    type Error = S::Error;

    fn receive(&mut self, record: Self::Record) -> Result<(), Self::Error> {
        (**self).receive(record)
    }

    fn complete(&mut self) -> Result<(), Self::Error> {
        (**self).complete()
    }
}

/// In-memory source yielding records in insertion order.
///
/// # Examples
/// ```
/// use osmerge_core::{RecordSource, VecSource};
///
/// let mut source = VecSource::new([1, 2]);
/// assert_eq!(source.next_record(), Ok(Some(1)));
/// assert_eq!(source.next_record(), Ok(Some(2)));
/// assert_eq!(source.next_record(), Ok(None));
/// ```
pub struct VecSource<T> {
    records: std::vec::IntoIter<T>,
}

impl<T> VecSource<T> {
    /// Build a source over `records`.
    pub fn new(records: impl IntoIterator<Item = T>) -> Self {
        Self {
            records: records.into_iter().collect::<Vec<_>>().into_iter(),
        }
    }

    /// Number of records not yet pulled.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.records.len()
    }
}

impl<T> fmt::Debug for VecSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VecSource")
            .field("remaining", &self.remaining())
            .finish()
    }
}

impl<T> FromIterator<T> for VecSource<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl<T> RecordSource for VecSource<T> {
    type Record = T;
    type Error = Infallible;

    fn next_record(&mut self) -> Result<Option<T>, Infallible> {
        Ok(self.records.next())
    }
}

/// In-memory sink collecting every record it receives.
#[derive(Debug, Clone, PartialEq)]
pub struct VecSink<T> {
    records: Vec<T>,
    completed: bool,
}

impl<T> Default for VecSink<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> VecSink<T> {
    /// Create an empty sink.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
            completed: false,
        }
    }

    /// Records received so far.
    #[must_use]
    pub fn records(&self) -> &[T] {
        &self.records
    }

    /// Whether [`RecordSink::complete`] has been called.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.completed
    }

    /// Consume the sink and return its records.
    #[must_use]
    pub fn into_records(self) -> Vec<T> {
        self.records
    }
}

impl<T> RecordSink for VecSink<T> {
    type Record = T;
    type Error = Infallible;

    fn receive(&mut self, record: T) -> Result<(), Infallible> {
        self.records.push(record);
        Ok(())
    }

    fn complete(&mut self) -> Result<(), Infallible> {
        self.completed = true;
        Ok(())
    }
}
