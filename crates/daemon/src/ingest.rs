// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flow directory scanning.

use relay_core::SystemClock;
use relay_engine::Engine;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What a directory scan did.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub ingested: usize,
    pub skipped: usize,
}

/// Recursively ingest every flow file (`.yaml`, `.yml`, `.json`) under
/// `dir`. Files that fail to read, parse, or validate are skipped with a
/// warning so one broken flow never blocks the catalog.
pub fn ingest_dir(
    engine: &Arc<Engine<SystemClock>>,
    namespace: &str,
    dir: &Path,
) -> std::io::Result<IngestReport> {
    let mut report = IngestReport::default();
    if !dir.exists() {
        return Ok(report);
    }
    for path in collect_flow_files(dir)? {
        let source = match std::fs::read_to_string(&path) {
            Ok(source) => source,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable flow file");
                report.skipped += 1;
                continue;
            }
        };
        match engine.ingest_source(namespace, &path, &source) {
            Ok(outcome) => {
                tracing::debug!(path = %path.display(), ?outcome, "flow ingested");
                report.ingested += 1;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping invalid flow file");
                report.skipped += 1;
            }
        }
    }
    Ok(report)
}

/// Recursively collect flow source files under `dir`, sorted for
/// deterministic ingest order.
fn collect_flow_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in std::fs::read_dir(&current)?.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("yaml") | Some("yml") | Some("json")
            ) {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}
