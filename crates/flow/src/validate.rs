// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structural validation of flow documents.
//!
//! Every invariant is enforced before a document is accepted into the
//! catalog: ids unique and well-formed, template references bound,
//! action references strictly backward, cron expressions and timezones
//! parseable, and each action's `with` block conformant to its
//! executor's registered schema. The executor registry lives in a
//! downstream crate, so it participates through [`ExecutorCatalog`].

use crate::cron;
use crate::model::{ActionSpec, Flow, InputType};
use crate::slug::is_valid_slug;
use crate::template::{extract_refs, TemplateRef};
use std::collections::HashSet;
use thiserror::Error;

/// Seam through which the validator consults the executor registry.
pub trait ExecutorCatalog {
    fn has_executor(&self, name: &str) -> bool;

    /// Validate an action's `with` block against the executor's schema.
    fn validate_config(&self, executor: &str, with: &serde_json::Value) -> Result<(), String>;
}

#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("flow id '{0}' is not a valid slug")]
    InvalidFlowId(String),
    #[error("action id '{0}' is not a valid slug")]
    InvalidActionId(String),
    #[error("duplicate action id: {0}")]
    DuplicateActionId(String),
    #[error("duplicate input: {0}")]
    DuplicateInput(String),
    #[error("enum input '{0}' declares no options")]
    EnumWithoutOptions(String),
    #[error("action '{action}': unknown executor '{executor}'")]
    UnknownExecutor { action: String, executor: String },
    #[error("action '{action}': invalid config: {message}")]
    InvalidConfig { action: String, message: String },
    #[error("action '{action}': template references undeclared input '{input}'")]
    UnknownInputRef { action: String, input: String },
    #[error("action '{action}': template references '{target}', which does not run earlier")]
    ForwardActionRef { action: String, target: String },
    #[error("action '{action}': {message}")]
    BadTemplate { action: String, message: String },
    #[error(transparent)]
    Cron(#[from] cron::CronError),
}

/// Enforce all structural invariants on a parsed flow.
pub fn validate_flow(flow: &Flow, catalog: &dyn ExecutorCatalog) -> Result<(), ValidateError> {
    if !is_valid_slug(&flow.metadata.id) {
        return Err(ValidateError::InvalidFlowId(flow.metadata.id.clone()));
    }

    let mut input_names = HashSet::new();
    for input in &flow.inputs {
        if !input_names.insert(input.name.as_str()) {
            return Err(ValidateError::DuplicateInput(input.name.clone()));
        }
        if input.input_type == InputType::Enum && input.options.is_empty() {
            return Err(ValidateError::EnumWithoutOptions(input.name.clone()));
        }
    }

    let mut seen_actions: HashSet<&str> = HashSet::new();
    for action in &flow.actions {
        if !is_valid_slug(&action.id) {
            return Err(ValidateError::InvalidActionId(action.id.clone()));
        }
        if !seen_actions.insert(action.id.as_str()) {
            return Err(ValidateError::DuplicateActionId(action.id.clone()));
        }
        if !catalog.has_executor(&action.executor) {
            return Err(ValidateError::UnknownExecutor {
                action: action.id.clone(),
                executor: action.executor.clone(),
            });
        }
        catalog
            .validate_config(&action.executor, &action.with)
            .map_err(|message| ValidateError::InvalidConfig {
                action: action.id.clone(),
                message,
            })?;
        validate_action_templates(action, &input_names, &seen_actions)?;
    }

    for schedule in &flow.schedules {
        cron::parse_expression(&schedule.expression)?;
        cron::parse_timezone(&schedule.timezone)?;
    }

    Ok(())
}

/// Check template references in an action's variables and `with` strings.
///
/// `earlier` contains this action's own id as well, but self-references
/// still fail: an action's outputs do not exist while it runs, so the
/// check excludes the current id explicitly.
fn validate_action_templates(
    action: &ActionSpec,
    inputs: &HashSet<&str>,
    earlier: &HashSet<&str>,
) -> Result<(), ValidateError> {
    let mut templates: Vec<&str> = action.variables.values().map(String::as_str).collect();
    collect_strings(&action.with, &mut templates);

    for template in templates {
        let refs = extract_refs(template).map_err(|e| ValidateError::BadTemplate {
            action: action.id.clone(),
            message: e.to_string(),
        })?;
        for reference in refs {
            match reference {
                TemplateRef::Input(name) => {
                    if !inputs.contains(name.as_str()) {
                        return Err(ValidateError::UnknownInputRef {
                            action: action.id.clone(),
                            input: name,
                        });
                    }
                }
                TemplateRef::Action { action: target, .. } => {
                    if target == action.id || !earlier.contains(target.as_str()) {
                        return Err(ValidateError::ForwardActionRef {
                            action: action.id.clone(),
                            target,
                        });
                    }
                }
                // Secret existence is a runtime concern; the keystore
                // is not consulted during validation.
                TemplateRef::Secret(_) => {}
            }
        }
    }
    Ok(())
}

/// Collect every string scalar in a `with` subtree.
fn collect_strings<'a>(value: &'a serde_json::Value, out: &mut Vec<&'a str>) {
    match value {
        serde_json::Value::String(s) => out.push(s),
        serde_json::Value::Array(items) => {
            for item in items {
                collect_strings(item, out);
            }
        }
        serde_json::Value::Object(map) => {
            for item in map.values() {
                collect_strings(item, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
