// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log.
//!
//! One JSON entry per line: `{"seq": N, "event": {...}}`. Appends are
//! buffered and made durable by [`Wal::flush`]; the store flushes every
//! batch before applying it to state, so a replayed WAL never lags what
//! callers observed. A torn trailing line (crash mid-write) is dropped
//! on open.

use relay_core::Event;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalError {
    #[error("WAL io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WAL encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One durable log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub seq: u64,
    pub event: Event,
}

/// Append-only event log backed by a single file.
pub struct Wal {
    writer: BufWriter<File>,
    write_seq: u64,
}

impl Wal {
    /// Open (creating if absent) and return the log plus every entry
    /// with `seq > processed_seq` for replay.
    pub fn open(path: &Path, processed_seq: u64) -> Result<(Self, Vec<Entry>), WalError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut entries = Vec::new();
        let mut last_seq = processed_seq;
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let entry: Entry = match serde_json::from_str(&line) {
                    Ok(e) => e,
                    Err(e) => {
                        // Torn tail from a crash mid-append; everything
                        // before it is intact.
                        tracing::warn!(error = %e, "dropping unreadable WAL tail");
                        break;
                    }
                };
                last_seq = last_seq.max(entry.seq);
                if entry.seq > processed_seq {
                    entries.push(entry);
                }
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok((
            Self {
                writer: BufWriter::new(file),
                write_seq: last_seq,
            },
            entries,
        ))
    }

    /// Append one event, returning its sequence number.
    pub fn append(&mut self, event: &Event) -> Result<u64, WalError> {
        self.write_seq += 1;
        let entry = Entry {
            seq: self.write_seq,
            event: event.clone(),
        };
        serde_json::to_writer(&mut self.writer, &entry)?;
        self.writer.write_all(b"\n")?;
        Ok(self.write_seq)
    }

    /// Flush buffered appends to the OS and sync file contents.
    pub fn flush(&mut self) -> Result<(), WalError> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        Ok(())
    }

    /// Highest sequence number written so far.
    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
