// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Action OUTPUT file format.
//!
//! Executors expose the path of a scratch file through the `OUTPUT` env
//! var; the script writes `KEY=VALUE` lines into it and the runner merges
//! the parsed map into the execution's action-output namespace.

use std::collections::HashMap;

/// Parse the line-oriented `KEY=VALUE` output format.
///
/// Rules: surrounding whitespace trimmed, blank lines and `#`-prefixed
/// comment lines ignored, lines without `=` ignored, later keys shadow
/// earlier ones within the same file. Values keep internal whitespace.
pub fn parse_output_env(content: &str) -> HashMap<String, String> {
    let mut env = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        env.insert(key.to_string(), value.trim().to_string());
    }
    env
}

#[cfg(test)]
#[path = "outputs_tests.rs"]
mod tests;
