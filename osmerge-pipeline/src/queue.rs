//! Bounded blocking record streams between tasks.
//!
//! A stream has exactly one sender and one receiver. Ownership of a record
//! moves from the producing thread to the consuming thread when it is
//! handed over; the buffer never holds more than its capacity.

use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use parking_lot::{Condvar, Mutex};

use crate::PipelineContext;
use crate::PipelineError;
use crate::context::Interrupt;
use osmerge_core::{RecordSink, RecordSource};

struct State<T> {
    buffer: VecDeque<T>,
    finished: bool,
    sender_gone: bool,
    receiver_gone: bool,
    aborted: bool,
}

struct Shared<T> {
    capacity: usize,
    state: Mutex<State<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T: Send> Interrupt for Shared<T> {
    fn interrupt(&self) {
        let mut state = self.state.lock();
        state.aborted = true;
        state.buffer.clear();
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }
}

/// Producing end of a stream.
pub struct RecordSender<T> {
    shared: Arc<Shared<T>>,
}

/// Consuming end of a stream.
pub struct RecordReceiver<T> {
    shared: Arc<Shared<T>>,
}

/// Create a stream holding at most `capacity` records in flight.
///
/// The stream is registered with `context` and wakes up when it aborts.
///
/// # Errors
/// Returns [`PipelineError::InvalidCapacity`] when `capacity` is zero.
///
/// # Examples
/// ```
/// use osmerge_pipeline::{PipelineContext, channel};
///
/// let context = PipelineContext::new();
/// let (mut tx, mut rx) = channel(&context, 2)?;
/// tx.send(1)?;
/// tx.finish()?;
/// assert_eq!(rx.recv()?, Some(1));
/// assert_eq!(rx.recv()?, None);
/// # Ok::<(), osmerge_pipeline::PipelineError>(())
/// ```
pub fn channel<T: Send + 'static>(
    context: &PipelineContext,
    capacity: usize,
) -> Result<(RecordSender<T>, RecordReceiver<T>), PipelineError> {
    if capacity == 0 {
        return Err(PipelineError::InvalidCapacity);
    }
    let shared = Arc::new(Shared {
        capacity,
        state: Mutex::new(State {
            buffer: VecDeque::with_capacity(capacity),
            finished: false,
            sender_gone: false,
            receiver_gone: false,
            aborted: false,
        }),
        not_empty: Condvar::new(),
        not_full: Condvar::new(),
    });
    let weak: Weak<dyn Interrupt> = Arc::downgrade(&shared) as Weak<dyn Interrupt>;
    context.register(weak);
    Ok((
        RecordSender {
            shared: Arc::clone(&shared),
        },
        RecordReceiver { shared },
    ))
}

impl<T> RecordSender<T> {
    /// Hand `record` to the consumer, blocking while the buffer is full.
    ///
    /// # Errors
    /// Returns [`PipelineError::Aborted`] when the pipeline shuts down or
    /// the receiver is gone, and [`PipelineError::StreamFinished`] after
    /// [`Self::finish`].
    pub fn send(&mut self, record: T) -> Result<(), PipelineError> {
        let mut state = self.shared.state.lock();
        loop {
            if state.aborted || state.receiver_gone {
                return Err(PipelineError::Aborted);
            }
            if state.finished {
                return Err(PipelineError::StreamFinished);
            }
            if state.buffer.len() < self.shared.capacity {
                state.buffer.push_back(record);
                self.shared.not_empty.notify_one();
                return Ok(());
            }
            self.shared.not_full.wait(&mut state);
        }
    }

    /// Mark the end of the stream.
    ///
    /// Records already buffered are still delivered. Dropping a sender
    /// without finishing it makes the receiver fail instead.
    ///
    /// # Errors
    /// Returns [`PipelineError::Aborted`] when the pipeline has shut down.
    pub fn finish(&mut self) -> Result<(), PipelineError> {
        let mut state = self.shared.state.lock();
        if state.aborted {
            return Err(PipelineError::Aborted);
        }
        state.finished = true;
        self.shared.not_empty.notify_all();
        Ok(())
    }
}

impl<T> Drop for RecordSender<T> {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        state.sender_gone = true;
        self.shared.not_empty.notify_all();
    }
}

impl<T> RecordReceiver<T> {
    /// Take the next record, blocking while the buffer is empty.
    ///
    /// Returns `None` once the sender has finished and the buffer is
    /// drained.
    ///
    /// # Errors
    /// Returns [`PipelineError::Aborted`] when the pipeline shuts down or
    /// the sender disappeared without finishing.
    pub fn recv(&mut self) -> Result<Option<T>, PipelineError> {
        let mut state = self.shared.state.lock();
        loop {
            if state.aborted {
                return Err(PipelineError::Aborted);
            }
            if let Some(record) = state.buffer.pop_front() {
                self.shared.not_full.notify_one();
                return Ok(Some(record));
            }
            if state.finished {
                return Ok(None);
            }
            if state.sender_gone {
                return Err(PipelineError::Aborted);
            }
            self.shared.not_empty.wait(&mut state);
        }
    }
}

impl<T> Drop for RecordReceiver<T> {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        state.receiver_gone = true;
        state.buffer.clear();
        self.shared.not_full.notify_all();
    }
}

impl<T> std::fmt::Debug for RecordSender<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordSender")
            .field("capacity", &self.shared.capacity)
            .finish_non_exhaustive()
    }
}

impl<T> std::fmt::Debug for RecordReceiver<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordReceiver")
            .field("capacity", &self.shared.capacity)
            .finish_non_exhaustive()
    }
}

impl<T> RecordSource for RecordReceiver<T> {
    type Record = T;
    type Error = PipelineError;

    fn next_record(&mut self) -> Result<Option<T>, PipelineError> {
        self.recv()
    }
}

impl<T> RecordSink for RecordSender<T> {
    type Record = T;
    type Error = PipelineError;

    fn receive(&mut self, record: T) -> Result<(), PipelineError> {
        self.send(record)
    }

    fn complete(&mut self) -> Result<(), PipelineError> {
        self.finish()
    }
}
