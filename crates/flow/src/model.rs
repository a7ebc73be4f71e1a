// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flow document model.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root of a declarative flow document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub metadata: FlowMetadata,
    #[serde(default)]
    pub inputs: Vec<InputSpec>,
    pub actions: Vec<ActionSpec>,
    #[serde(default)]
    pub schedules: Vec<ScheduleSpec>,
}

impl Flow {
    /// Find an action spec by id.
    pub fn action(&self, id: &str) -> Option<&ActionSpec> {
        self.actions.iter().find(|a| a.id == id)
    }

    /// Find an input spec by name.
    pub fn input(&self, name: &str) -> Option<&InputSpec> {
        self.inputs.iter().find(|i| i.name == name)
    }
}

/// `metadata` block: identity and catalog presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowMetadata {
    /// Slug, unique within the namespace.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// When false, users cannot attach their own schedules to this flow.
    #[serde(default = "default_true")]
    pub user_schedulable: bool,
}

fn default_true() -> bool {
    true
}

/// Semantic type of a declared input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    #[default]
    String,
    Int,
    Bool,
    Enum,
    Email,
    Date,
    File,
}

relay_core::simple_display! {
    InputType {
        String => "string",
        Int => "int",
        Bool => "bool",
        Enum => "enum",
        Email => "email",
        Date => "date",
        File => "file",
    }
}

/// One declared input of a flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSpec {
    pub name: String,
    #[serde(rename = "type", default)]
    pub input_type: InputType,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<String>,
    /// Regex the (stringified) value must match.
    #[serde(default)]
    pub validation: Option<String>,
    /// Allowed values for `type: enum`.
    #[serde(default)]
    pub options: Vec<String>,
}

/// Declared artifact transfers for one action.
///
/// `push` entries are copied into the action's working context before it
/// runs; `pull` entries are collected afterwards. Paths are relative and
/// preserved on both ends.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArtifactSpec {
    #[serde(default)]
    pub push: Vec<String>,
    #[serde(default)]
    pub pull: Vec<String>,
}

impl ArtifactSpec {
    pub fn is_empty(&self) -> bool {
        self.push.is_empty() && self.pull.is_empty()
    }
}

/// One step of a flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSpec {
    /// Unique within the flow.
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Registered executor name.
    pub executor: String,
    /// Target node; absence means local execution.
    #[serde(default)]
    pub node: Option<String>,
    /// Variable bindings, name → template. Order preserved for
    /// deterministic resolution logs.
    #[serde(default)]
    pub variables: IndexMap<String, String>,
    /// Executor-specific configuration; opaque to the engine, validated
    /// against the executor's registered schema.
    #[serde(default)]
    pub with: serde_json::Value,
    #[serde(default)]
    pub artifacts: ArtifactSpec,
    /// True to gate this action on a human decision.
    #[serde(default)]
    pub approval: bool,
}

impl ActionSpec {
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// A cron trigger declared in the flow document (a system schedule).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSpec {
    pub expression: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub inputs: HashMap<String, String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_timezone() -> String {
    "UTC".to_string()
}
