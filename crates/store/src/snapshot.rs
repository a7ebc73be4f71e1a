// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State snapshots.
//!
//! A snapshot is the zstd-compressed JSON of the materialized state plus
//! the WAL sequence it covers. On open, the store loads the snapshot and
//! replays only the WAL tail past `processed_seq`; compaction writes a
//! fresh snapshot and truncates the log.

use crate::state::MaterializedState;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

const ZSTD_LEVEL: i32 = 3;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    processed_seq: u64,
    state: MaterializedState,
}

/// Load a snapshot if one exists. Returns the state and the WAL sequence
/// it was taken at.
pub fn load(path: &Path) -> Result<Option<(MaterializedState, u64)>, SnapshotError> {
    if !path.exists() {
        return Ok(None);
    }
    let compressed = std::fs::read(path)?;
    let bytes = zstd::decode_all(compressed.as_slice())?;
    let file: SnapshotFile = serde_json::from_slice(&bytes)?;
    Ok(Some((file.state, file.processed_seq)))
}

/// Write a snapshot atomically (temp file + rename).
pub fn save(path: &Path, state: &MaterializedState, processed_seq: u64) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = SnapshotFile {
        processed_seq,
        state: state.clone(),
    };
    let bytes = serde_json::to_vec(&file)?;
    let compressed = zstd::encode_all(bytes.as_slice(), ZSTD_LEVEL)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, compressed)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
