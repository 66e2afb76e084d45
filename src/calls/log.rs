//! Persistent FIFO of missed calls, one record per line.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::{GateError, Result};
use crate::model::call::MissedCallRecord;

/// Missed-call queue mirrored to a text file.
///
/// The file is appended to on every new record and replaced on every pop,
/// always while the queue lock is held. A record whose write fails stays in
/// memory; the next write then replaces the whole file so it catches up.
pub struct CallLog {
    path: PathBuf,
    queue: Mutex<Queue>,
}

struct Queue {
    records: VecDeque<MissedCallRecord>,
    in_sync: bool,
}

impl CallLog {
    /// Load the log at `path`, creating an empty file when none exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records: VecDeque<MissedCallRecord> = if path.exists() {
            fs::read_to_string(&path)
                .map_err(|e| GateError::io(&path, e))?
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(MissedCallRecord::from_line)
                .collect()
        } else {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|e| GateError::io(parent, e))?;
            }
            File::create(&path).map_err(|e| GateError::io(&path, e))?;
            VecDeque::new()
        };
        info!(path = %path.display(), count = records.len(), "Loaded missed-call log");
        Ok(Self {
            path,
            queue: Mutex::new(Queue {
                records,
                in_sync: true,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the queue, oldest first.
    pub fn records(&self) -> Vec<MissedCallRecord> {
        self.queue.lock().records.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().records.is_empty()
    }

    /// Add a record at the tail and persist it.
    ///
    /// The record is queued even when the write fails; the error is returned
    /// so the caller can report it.
    pub fn append(&self, record: MissedCallRecord) -> Result<()> {
        let mut queue = self.queue.lock();
        debug!(record = %record, "Missed call logged");
        let line = record.to_line();
        queue.records.push_back(record);
        let written = if queue.in_sync {
            self.append_line(&line)
        } else {
            self.rewrite(queue.records.iter())
        };
        queue.in_sync = written.is_ok();
        written
    }

    /// Remove the oldest record and rewrite the file without it.
    ///
    /// Nothing is removed when the rewrite fails.
    pub fn pop_front(&self) -> Result<Option<MissedCallRecord>> {
        let mut queue = self.queue.lock();
        let Some(head) = queue.records.front().cloned() else {
            return Ok(None);
        };
        self.rewrite(queue.records.iter().skip(1))?;
        queue.records.pop_front();
        queue.in_sync = true;
        Ok(Some(head))
    }

    fn append_line(&self, line: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| GateError::io(&self.path, e))?;
        writeln!(file, "{line}").map_err(|e| GateError::io(&self.path, e))?;
        file.flush().map_err(|e| GateError::io(&self.path, e))
    }

    /// Write `records` to a sibling temp file, then rename it over the log.
    fn rewrite<'a>(&self, records: impl Iterator<Item = &'a MissedCallRecord>) -> Result<()> {
        let tmp = self.path.with_extension("tmp");
        let file = File::create(&tmp).map_err(|e| GateError::io(&tmp, e))?;
        let mut writer = BufWriter::new(file);
        for record in records {
            writeln!(writer, "{}", record.to_line()).map_err(|e| GateError::io(&tmp, e))?;
        }
        let file = writer
            .into_inner()
            .map_err(|e| GateError::io(&tmp, e.into_error()))?;
        file.sync_all().map_err(|e| GateError::io(&tmp, e))?;
        drop(file);
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(GateError::io(&self.path, e));
        }
        Ok(())
    }
}
