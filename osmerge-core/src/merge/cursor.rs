//! One-record lookahead over a validated input.

use crate::{EntityKey, Keyed, ReadError, RecordSource, ValidatedSource};

use super::PeerState;

pub(super) struct Cursor<S: RecordSource> {
    source: ValidatedSource<S>,
    head: Option<S::Record>,
    exhausted: bool,
    pulled: u64,
}

impl<S> Cursor<S>
where
    S: RecordSource,
    S::Record: Keyed,
{
    pub(super) const fn new(source: S) -> Self {
        Self {
            source: ValidatedSource::new(source),
            head: None,
            exhausted: false,
            pulled: 0,
        }
    }

    /// Pull a new head if the previous one was consumed.
    pub(super) fn fill(&mut self) -> Result<(), ReadError<S::Error>> {
        if self.head.is_some() || self.exhausted {
            return Ok(());
        }
        match self.source.next_record() {
            Ok(Some(record)) => {
                self.pulled += 1;
                self.head = Some(record);
                Ok(())
            }
            Ok(None) => {
                self.exhausted = true;
                Ok(())
            }
            Err(err) => {
                self.exhausted = true;
                Err(err)
            }
        }
    }

    pub(super) fn head_key(&self) -> Option<EntityKey> {
        self.head.as_ref().map(Keyed::key)
    }

    pub(super) const fn take(&mut self) -> Option<S::Record> {
        self.head.take()
    }

    pub(super) const fn peer_state(&self) -> PeerState {
        if self.exhausted && self.pulled == 0 {
            PeerState::Empty
        } else {
            PeerState::Contributing
        }
    }
}
