//! JSON Lines reader and writer tasks.
//!
//! One serialised record per line. This is the minimal codec the command
//! uses to get sorted streams in and out of a merge; blank lines are
//! skipped.

use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::marker::PhantomData;

use osmerge_core::{RecordSink, RecordSource};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Failure reading or writing a JSON Lines stream.
#[derive(Debug, Error)]
pub enum JsonLinesError {
    /// The underlying reader failed.
    #[error("line {line}: {source}")]
    Read {
        /// One-based line number.
        line: u64,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A line did not hold a valid record.
    #[error("line {line}: {source}")]
    Decode {
        /// One-based line number.
        line: u64,
        /// Decoder diagnostic.
        #[source]
        source: serde_json::Error,
    },
    /// A record could not be serialised.
    #[error("failed to encode record {record}: {source}")]
    Encode {
        /// One-based record number.
        record: u64,
        /// Encoder diagnostic.
        #[source]
        source: serde_json::Error,
    },
    /// The underlying writer failed.
    #[error("failed to write output: {0}")]
    Write(#[source] io::Error),
}

/// [`RecordSource`] decoding one record per line.
#[derive(Debug)]
pub struct JsonLinesReader<R, T> {
    input: R,
    line: u64,
    buffer: String,
    record: PhantomData<fn() -> T>,
}

impl<R: Read, T> JsonLinesReader<BufReader<R>, T> {
    /// Wrap an unbuffered reader.
    #[must_use]
    pub fn new(input: R) -> Self {
        Self::from_buffered(BufReader::new(input))
    }
}

impl<R: BufRead, T> JsonLinesReader<R, T> {
    /// Wrap a buffered reader.
    #[must_use]
    pub const fn from_buffered(input: R) -> Self {
        Self {
            input,
            line: 0,
            buffer: String::new(),
            record: PhantomData,
        }
    }
}

impl<R, T> RecordSource for JsonLinesReader<R, T>
where
    R: BufRead,
    T: DeserializeOwned,
{
    type Record = T;
    type Error = JsonLinesError;

    fn next_record(&mut self) -> Result<Option<T>, JsonLinesError> {
        loop {
            self.buffer.clear();
            self.line += 1;
            let read = self
                .input
                .read_line(&mut self.buffer)
                .map_err(|source| JsonLinesError::Read {
                    line: self.line,
                    source,
                })?;
            if read == 0 {
                return Ok(None);
            }
            let text = self.buffer.trim();
            if text.is_empty() {
                continue;
            }
            return serde_json::from_str(text)
                .map(Some)
                .map_err(|source| JsonLinesError::Decode {
                    line: self.line,
                    source,
                });
        }
    }
}

/// [`RecordSink`] encoding one record per line.
#[derive(Debug)]
pub struct JsonLinesWriter<W: Write, T> {
    output: BufWriter<W>,
    written: u64,
    record: PhantomData<fn(T)>,
}

impl<W: Write, T> JsonLinesWriter<W, T> {
    /// Wrap `output`.
    #[must_use]
    pub fn new(output: W) -> Self {
        Self {
            output: BufWriter::new(output),
            written: 0,
            record: PhantomData,
        }
    }

    /// Number of records written.
    #[must_use]
    pub const fn written(&self) -> u64 {
        self.written
    }
}

impl<W, T> RecordSink for JsonLinesWriter<W, T>
where
    W: Write,
    T: Serialize,
{
    type Record = T;
    type Error = JsonLinesError;

    fn receive(&mut self, record: T) -> Result<(), JsonLinesError> {
        self.written += 1;
        serde_json::to_writer(&mut self.output, &record).map_err(|source| {
            JsonLinesError::Encode {
                record: self.written,
                source,
            }
        })?;
        self.output.write_all(b"\n").map_err(JsonLinesError::Write)
    }

    fn complete(&mut self) -> Result<(), JsonLinesError> {
        self.output.flush().map_err(JsonLinesError::Write)
    }
}
