// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flow catalog and schedule records.
//!
//! The catalog stores flow *source*, not parsed models: a snapshot keyed
//! by content checksum plus a per-slug record pointing at the current
//! checksum. Executions carry the checksum, so in-flight runs keep their
//! snapshot when the flow is edited.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Textual encoding of a flow source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Yaml,
    Json,
}

crate::simple_display! {
    SourceFormat {
        Yaml => "yaml",
        Json => "json",
    }
}

/// Catalog row for one flow slug within a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowRecord {
    pub slug: String,
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// SHA-256 hex of the canonical source bytes; the cache key that
    /// decides whether ingest updates this row.
    pub checksum: String,
    pub path: PathBuf,
    /// When false, user-created schedules for this flow are suppressed.
    #[serde(default = "default_true")]
    pub user_schedulable: bool,
    pub ingested_at_ms: u64,
}

fn default_true() -> bool {
    true
}

/// Immutable flow source snapshot, keyed by checksum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowSnapshot {
    pub checksum: String,
    pub format: SourceFormat,
    pub source: String,
}

crate::define_id! {
    /// Identifier for a cron schedule row.
    pub struct ScheduleId("schd-");
}

/// A timed trigger bound to a flow.
///
/// System schedules come from the flow document and are regenerated on
/// ingest; user schedules are created through the API and survive flow
/// updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRecord {
    pub id: ScheduleId,
    pub namespace: String,
    pub flow_slug: String,
    pub expression: String,
    /// IANA timezone name the expression is evaluated in.
    pub timezone: String,
    /// True for schedules declared in the flow document.
    pub system: bool,
    pub active: bool,
    #[serde(default)]
    pub inputs: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

impl ScheduleRecord {
    /// Identity for ingest diffing: two system schedules are the same
    /// trigger when expression, timezone, and inputs all match.
    pub fn trigger_key(&self) -> (String, String, Vec<(String, String)>) {
        let mut inputs: Vec<_> = self
            .inputs
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        inputs.sort();
        (self.expression.clone(), self.timezone.clone(), inputs)
    }
}

crate::builder! {
    pub struct ScheduleRecordBuilder => ScheduleRecord {
        into {
            id: ScheduleId = ScheduleId::from_string("schd-test0000000000000"),
            namespace: String = "",
            flow_slug: String = "test-flow",
            expression: String = "* * * * *",
            timezone: String = "UTC",
        }
        set {
            system: bool = true,
            active: bool = true,
            inputs: HashMap<String, String> = HashMap::new(),
        }
        option {
            created_by: String = None,
        }
    }
}
