//! Sorted merge-join over two validated record streams.
//!
//! [`MergeJoin`] walks two strictly increasing inputs in lock-step, holding
//! at most one pending record per input. Records unique to one side pass
//! through a [`MergePolicy`]; records sharing a key are handed to the
//! policy as a collision and exactly one record (or none) is emitted for
//! them. Output is strictly increasing because each input is validated and
//! the join never reorders records within a source.
//!
//! Two policies are provided: [`EntityMergePolicy`] for full snapshots and
//! [`ChangeMergePolicy`] for change streams.

mod change;
mod cursor;
mod entity;

use std::cmp::Ordering;
use std::fmt;

use log::info;
use thiserror::Error;

use crate::{
    ConflictResolutionError, Keyed, ReadError, RecordSink, RecordSource, UnsortedInputError, Winner,
};
use cursor::Cursor;

pub use change::{ChangeMergePolicy, ChangeMerger};
pub use entity::{BoundRemovedAction, EntityMergePolicy, EntityMerger, MergeOptions};

/// One of the two merge inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The first-declared input.
    Left,
    /// The second-declared input.
    Right,
}

impl Side {
    /// The other input.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Left => "left",
            Self::Right => "right",
        })
    }
}

impl From<Winner> for Side {
    fn from(winner: Winner) -> Self {
        match winner {
            Winner::Left => Self::Left,
            Winner::Right => Self::Right,
        }
    }
}

/// What the opposite input contributed when an unmatched record is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    /// The opposite input ended without producing any record.
    Empty,
    /// The opposite input produced, or is still producing, records.
    Contributing,
}

/// Outcome of a key collision.
#[derive(Debug, Clone, PartialEq)]
pub enum Collision<T> {
    /// One input's record was selected whole.
    Winner(Winner, T),
    /// Both records were combined into one; only used for bounds.
    Combined(T),
}

/// Failure raised by a [`MergePolicy`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// Resolution was asked to compare records of different identity.
    #[error(transparent)]
    ConflictResolution(#[from] ConflictResolutionError),
    /// A declared bound had to be dropped and the policy forbids it.
    #[error("the bound declared by the {side} input cannot be kept in the merged output")]
    BoundRemoved {
        /// Input that declared the bound.
        side: Side,
    },
}

/// Decides what a merge emits for collisions and unmatched records.
pub trait MergePolicy {
    /// Record type merged.
    type Record: Keyed;

    /// Handle two records with the same key.
    ///
    /// # Errors
    /// Returns a [`PolicyError`] when the records cannot be reconciled.
    fn collide(
        &mut self,
        left: Self::Record,
        right: Self::Record,
    ) -> Result<Collision<Self::Record>, PolicyError>;

    /// Handle a record present on one side only. `None` drops it.
    ///
    /// The default emits the record unchanged.
    ///
    /// # Errors
    /// Returns a [`PolicyError`] when the record may not be passed through.
    fn unmatched(
        &mut self,
        _side: Side,
        record: Self::Record,
        _peer: PeerState,
    ) -> Result<Option<Self::Record>, PolicyError> {
        Ok(Some(record))
    }
}

/// Progress of a [`MergeJoin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeState {
    /// Both inputs may still deliver records.
    BothActive,
    /// The left input has ended; the right is drained unchanged.
    LeftExhausted,
    /// The right input has ended; the left is drained unchanged.
    RightExhausted,
    /// Both inputs have ended, or the merge failed.
    Done,
}

/// Counters describing a finished or running merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Records present in the left input only.
    pub left_only: u64,
    /// Records present in the right input only.
    pub right_only: u64,
    /// Keys present in both inputs.
    pub conflicts: u64,
    /// Collisions won by the left record.
    pub left_wins: u64,
    /// Collisions won by the right record.
    pub right_wins: u64,
    /// Collisions resolved by combining both records.
    pub combined: u64,
    /// Unmatched records the policy dropped.
    pub dropped: u64,
    /// Records emitted.
    pub emitted: u64,
}

/// Failure of a merge run.
#[derive(Debug, Error)]
pub enum MergeError<E> {
    /// An input violated the stream order.
    #[error("{source} (in the {side} input)")]
    UnsortedInput {
        /// Input that delivered the offending record.
        side: Side,
        /// Ordering violation.
        #[source]
        source: UnsortedInputError,
    },
    /// Resolution was invoked on mismatched keys.
    #[error(transparent)]
    ConflictResolution(#[from] ConflictResolutionError),
    /// A declared bound was removed under [`BoundRemovedAction::Fail`].
    #[error("the bound declared by the {side} input cannot be kept in the merged output")]
    BoundRemoved {
        /// Input that declared the bound.
        side: Side,
    },
    /// An input failed to deliver a record.
    #[error("failed to read the {side} input")]
    Input {
        /// Failing input.
        side: Side,
        /// Input error.
        #[source]
        source: E,
    },
    /// The output rejected a record.
    #[error("failed to write the merge output")]
    Output {
        /// Output error.
        #[source]
        source: E,
    },
}

impl<E> From<PolicyError> for MergeError<E> {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::ConflictResolution(inner) => Self::ConflictResolution(inner),
            PolicyError::BoundRemoved { side } => Self::BoundRemoved { side },
        }
    }
}

impl<E> MergeError<E> {
    fn from_read(side: Side, err: ReadError<E>) -> Self {
        match err {
            ReadError::Unsorted(source) => Self::UnsortedInput { side, source },
            ReadError::Source(source) => Self::Input { side, source },
        }
    }
}

enum Step<T> {
    Emit(T),
    Skip,
    End,
}

/// Streaming merge of two sorted inputs under a [`MergePolicy`].
///
/// `MergeJoin` is itself a [`RecordSource`], so its output can feed
/// another merge or any sink.
///
/// # Examples
/// ```
/// use chrono::DateTime;
/// use geo::Coord;
/// use osmerge_core::{ChangeAction, ChangeMerger, ChangeRecord, ConflictResolutionMethod, Entity, VecSource};
///
/// let at = |secs| DateTime::from_timestamp(secs, 0).unwrap_or_default();
/// let node = |id, version| Entity::node(id, version, at(0), Coord { x: 0.0, y: 0.0 });
/// let left = VecSource::new([ChangeRecord::new(ChangeAction::Create, node(1, 1))]);
/// let right = VecSource::new([ChangeRecord::new(ChangeAction::Delete, node(1, 2))]);
///
/// let merged = ChangeMerger::new(left, right, ConflictResolutionMethod::Version).into_records()?;
/// assert_eq!(merged.len(), 1);
/// assert_eq!(merged[0].action, ChangeAction::Delete);
/// # Ok::<(), osmerge_core::MergeError<std::convert::Infallible>>(())
/// ```
pub struct MergeJoin<L, R, P>
where
    L: RecordSource,
    R: RecordSource,
{
    left: Cursor<L>,
    right: Cursor<R>,
    policy: P,
    state: MergeState,
    stats: MergeStats,
}

impl<L, R, P> MergeJoin<L, R, P>
where
    P: MergePolicy,
    L: RecordSource<Record = P::Record>,
    R: RecordSource<Record = P::Record, Error = L::Error>,
{
    /// Merge `left` and `right` under `policy`.
    pub const fn with_policy(left: L, right: R, policy: P) -> Self {
        Self {
            left: Cursor::new(left),
            right: Cursor::new(right),
            policy,
            state: MergeState::BothActive,
            stats: MergeStats {
                left_only: 0,
                right_only: 0,
                conflicts: 0,
                left_wins: 0,
                right_wins: 0,
                combined: 0,
                dropped: 0,
                emitted: 0,
            },
        }
    }

    /// Current state of the join.
    #[must_use]
    pub const fn state(&self) -> MergeState {
        self.state
    }

    /// Counters accumulated so far.
    #[must_use]
    pub const fn stats(&self) -> MergeStats {
        self.stats
    }

    /// Drive the merge to completion, pushing every record into `sink` and
    /// completing it.
    ///
    /// # Errors
    /// Returns the first [`MergeError`]; the sink is not completed then.
    pub fn run_into<K>(mut self, mut sink: K) -> Result<MergeStats, MergeError<L::Error>>
    where
        K: RecordSink<Record = P::Record, Error = L::Error>,
    {
        while let Some(record) = self.pull()? {
            sink.receive(record)
                .map_err(|source| MergeError::Output { source })?;
        }
        sink.complete().map_err(|source| MergeError::Output { source })?;
        Ok(self.stats)
    }

    /// Drive the merge to completion and collect its output.
    ///
    /// # Errors
    /// Returns the first [`MergeError`].
    pub fn into_records(mut self) -> Result<Vec<P::Record>, MergeError<L::Error>> {
        let mut records = Vec::new();
        while let Some(record) = self.pull()? {
            records.push(record);
        }
        Ok(records)
    }

    fn pull(&mut self) -> Result<Option<P::Record>, MergeError<L::Error>> {
        loop {
            match self.step() {
                Ok(Step::Emit(record)) => {
                    self.stats.emitted += 1;
                    return Ok(Some(record));
                }
                Ok(Step::Skip) => {}
                Ok(Step::End) => return Ok(None),
                Err(err) => {
                    self.state = MergeState::Done;
                    return Err(err);
                }
            }
        }
    }

    fn step(&mut self) -> Result<Step<P::Record>, MergeError<L::Error>> {
        match self.state {
            MergeState::Done => Ok(Step::End),
            MergeState::BothActive => {
                self.left
                    .fill()
                    .map_err(|err| MergeError::from_read(Side::Left, err))?;
                self.right
                    .fill()
                    .map_err(|err| MergeError::from_read(Side::Right, err))?;
                match (self.left.head_key(), self.right.head_key()) {
                    (Some(left), Some(right)) => match left.cmp(&right) {
                        Ordering::Less => self.emit_unmatched(Side::Left),
                        Ordering::Greater => self.emit_unmatched(Side::Right),
                        Ordering::Equal => self.emit_collision(),
                    },
                    (Some(_), None) => {
                        self.state = MergeState::RightExhausted;
                        Ok(Step::Skip)
                    }
                    (None, Some(_)) => {
                        self.state = MergeState::LeftExhausted;
                        Ok(Step::Skip)
                    }
                    (None, None) => Ok(self.finish()),
                }
            }
            MergeState::LeftExhausted => self.drain(Side::Right),
            MergeState::RightExhausted => self.drain(Side::Left),
        }
    }

    fn drain(&mut self, side: Side) -> Result<Step<P::Record>, MergeError<L::Error>> {
        let filled = match side {
            Side::Left => self.left.fill(),
            Side::Right => self.right.fill(),
        };
        filled.map_err(|err| MergeError::from_read(side, err))?;
        let has_head = match side {
            Side::Left => self.left.head_key().is_some(),
            Side::Right => self.right.head_key().is_some(),
        };
        if has_head {
            self.emit_unmatched(side)
        } else {
            Ok(self.finish())
        }
    }

    fn emit_unmatched(&mut self, side: Side) -> Result<Step<P::Record>, MergeError<L::Error>> {
        let (record, peer) = match side {
            Side::Left => (self.left.take(), self.right.peer_state()),
            Side::Right => (self.right.take(), self.left.peer_state()),
        };
        let Some(record) = record else {
            return Ok(Step::Skip);
        };
        match side {
            Side::Left => self.stats.left_only += 1,
            Side::Right => self.stats.right_only += 1,
        }
        match self.policy.unmatched(side, record, peer)? {
            Some(record) => Ok(Step::Emit(record)),
            None => {
                self.stats.dropped += 1;
                Ok(Step::Skip)
            }
        }
    }

    fn emit_collision(&mut self) -> Result<Step<P::Record>, MergeError<L::Error>> {
        let (Some(left), Some(right)) = (self.left.take(), self.right.take()) else {
            return Ok(Step::Skip);
        };
        self.stats.conflicts += 1;
        let record = match self.policy.collide(left, right)? {
            Collision::Winner(Winner::Left, record) => {
                self.stats.left_wins += 1;
                record
            }
            Collision::Winner(Winner::Right, record) => {
                self.stats.right_wins += 1;
                record
            }
            Collision::Combined(record) => {
                self.stats.combined += 1;
                record
            }
        };
        Ok(Step::Emit(record))
    }

    fn finish(&mut self) -> Step<P::Record> {
        if self.state != MergeState::Done {
            self.state = MergeState::Done;
            let MergeStats {
                left_only,
                right_only,
                conflicts,
                left_wins,
                right_wins,
                combined,
                dropped,
                emitted,
            } = self.stats;
            info!(
                "merge finished: {emitted} records emitted, {left_only} left only, \
                 {right_only} right only, {conflicts} conflicts ({left_wins} left wins, \
                 {right_wins} right wins, {combined} combined), {dropped} dropped"
            );
        }
        Step::End
    }
}

impl<L, R, P> RecordSource for MergeJoin<L, R, P>
where
    P: MergePolicy,
    L: RecordSource<Record = P::Record>,
    R: RecordSource<Record = P::Record, Error = L::Error>,
{
    type Record = P::Record;
    type Error = MergeError<L::Error>;

    fn next_record(&mut self) -> Result<Option<P::Record>, Self::Error> {
        self.pull()
    }
}

impl<L, R, P> fmt::Debug for MergeJoin<L, R, P>
where
    L: RecordSource,
    R: RecordSource,
    P: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergeJoin")
            .field("policy", &self.policy)
            .field("state", &self.state)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
