// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flow source parsing and checksums.

use crate::model::Flow;
use relay_core::SourceFormat;
use sha2::{Digest, Sha256};
use std::path::Path;
use thiserror::Error;

/// Errors from decoding a flow document.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported flow file extension: {0}")]
    UnknownExtension(String),
}

/// Decode a flow document in the given format.
///
/// Parsing is purely syntactic; structural invariants are enforced by
/// [`crate::validate::validate_flow`] before a document is accepted.
pub fn parse_flow(content: &str, format: SourceFormat) -> Result<Flow, ParseError> {
    match format {
        SourceFormat::Yaml => Ok(serde_yaml::from_str(content)?),
        SourceFormat::Json => Ok(serde_json::from_str(content)?),
    }
}

/// Select the source format from a file extension.
pub fn format_for_path(path: &Path) -> Result<SourceFormat, ParseError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => Ok(SourceFormat::Yaml),
        Some("json") => Ok(SourceFormat::Json),
        other => Err(ParseError::UnknownExtension(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

/// Content hash of the canonical source bytes (SHA-256, lowercase hex).
///
/// This is the catalog cache key: ingest updates a flow row only when
/// the checksum changes, and executions pin the checksum as their
/// snapshot reference.
pub fn checksum(source: &str) -> String {
    use std::fmt::Write;

    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        // Writing to a String cannot fail
        let _ = write!(hex, "{:02x}", byte);
    }
    hex
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
