//! CSV dataset sink
//!
//! One header row, then one row per record in [`CharityRecord::csv_header`]
//! column order.

use crate::output::traits::{OutputResult, RecordSink};
use crate::record::CharityRecord;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes records as CSV rows
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    rows_written: u64,
}

impl<W: Write> CsvSink<W> {
    /// Wraps a writer and writes the header row immediately
    pub fn new(inner: W) -> OutputResult<Self> {
        let mut writer = csv::Writer::from_writer(inner);
        writer.write_record(CharityRecord::csv_header())?;
        Ok(Self {
            writer,
            rows_written: 0,
        })
    }

    /// Number of data rows written so far
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Flushes and returns the underlying writer
    pub fn into_inner(self) -> OutputResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| std::io::Error::new(e.error().kind(), e.error().to_string()).into())
    }
}

impl CsvSink<BufWriter<File>> {
    /// Creates (or truncates) the dataset file at `path`
    pub fn create(path: &Path) -> OutputResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        tracing::info!("Writing dataset to {}", path.display());
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write> RecordSink for CsvSink<W> {
    fn accept(&mut self, record: CharityRecord) -> OutputResult<()> {
        self.writer.write_record(record.to_csv_row())?;
        self.rows_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        self.writer.flush()?;
        tracing::debug!("CSV sink flushed after {} rows", self.rows_written);
        Ok(())
    }
}

/// CSV dataset written under a temporary name next to its target
///
/// The target path is only replaced by [`StagedCsvSink::commit`]; a crawl
/// that fails leaves any earlier dataset at that path untouched.
pub struct StagedCsvSink {
    sink: CsvSink<BufWriter<File>>,
    staging: PathBuf,
    target: PathBuf,
}

impl StagedCsvSink {
    /// Opens `<path>.partial` for writing
    pub fn create(path: &Path) -> OutputResult<Self> {
        let mut staging = path.as_os_str().to_owned();
        staging.push(".partial");
        let staging = PathBuf::from(staging);

        let sink = CsvSink::create(&staging)?;
        Ok(Self {
            sink,
            staging,
            target: path.to_path_buf(),
        })
    }

    /// Path rows are being written to until commit
    pub fn staging_path(&self) -> &Path {
        &self.staging
    }

    /// Flushes the staged file and moves it onto the target path
    ///
    /// Returns the number of data rows in the dataset.
    pub fn commit(self) -> OutputResult<u64> {
        let rows = self.sink.rows_written();
        let mut file = self.sink.into_inner()?;
        file.flush()?;
        drop(file);

        std::fs::rename(&self.staging, &self.target)?;
        tracing::info!("Dataset written to {} ({} rows)", self.target.display(), rows);
        Ok(rows)
    }

    /// Removes the staged file without touching the target path
    pub fn discard(self) {
        let Self { sink, staging, .. } = self;
        drop(sink);
        if let Err(e) = std::fs::remove_file(&staging) {
            tracing::warn!("Could not remove {}: {}", staging.display(), e);
        }
    }
}

impl RecordSink for StagedCsvSink {
    fn accept(&mut self, record: CharityRecord) -> OutputResult<()> {
        self.sink.accept(record)
    }

    fn finish(&mut self) -> OutputResult<()> {
        self.sink.finish()
    }
}

/// Collects records in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<CharityRecord>,
    pub finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordSink for MemorySink {
    fn accept(&mut self, record: CharityRecord) -> OutputResult<()> {
        self.records.push(record);
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        self.finished = true;
        Ok(())
    }
}
