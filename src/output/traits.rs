//! Record sink trait and output errors
//!
//! A sink receives every [`CharityRecord`] the crawl produces, in the order
//! the detail pages complete.

use crate::record::CharityRecord;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Trait for record sinks
///
/// The coordinator calls [`accept`](RecordSink::accept) once per successfully
/// parsed detail page and [`finish`](RecordSink::finish) once at the end of a
/// crawl, including a cancelled one. A write error aborts the crawl.
pub trait RecordSink {
    /// Takes ownership of one finished record
    fn accept(&mut self, record: CharityRecord) -> OutputResult<()>;

    /// Flushes anything buffered
    fn finish(&mut self) -> OutputResult<()>;
}

impl<S: RecordSink + ?Sized> RecordSink for Box<S> {
    fn accept(&mut self, record: CharityRecord) -> OutputResult<()> {
        (**self).accept(record)
    }

    fn finish(&mut self) -> OutputResult<()> {
        (**self).finish()
    }
}
