// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed input validation at enqueue time.

use crate::model::{InputSpec, InputType};
use regex::Regex;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("missing required input: {0}")]
    MissingRequired(String),
    #[error("unknown input: {0}")]
    Unknown(String),
    #[error("input '{name}' is not a valid {expected}: {value}")]
    WrongType {
        name: String,
        expected: String,
        value: String,
    },
    #[error("input '{name}' is not one of the allowed options: {value}")]
    NotAnOption { name: String, value: String },
    #[error("input '{name}' fails validation '{pattern}': {value}")]
    FailsValidation {
        name: String,
        pattern: String,
        value: String,
    },
    #[error("input '{name}' has an invalid validation pattern: {pattern}")]
    BadPattern { name: String, pattern: String },
}

/// Validate provided values against the declared input specs.
///
/// Applies defaults, rejects undeclared names and missing required
/// inputs, and checks each value against its semantic type and optional
/// validation regex. Returns the effective input map (defaults filled
/// in) the execution will carry.
pub fn validate_inputs(
    specs: &[InputSpec],
    provided: &HashMap<String, String>,
) -> Result<HashMap<String, String>, InputError> {
    for name in provided.keys() {
        if !specs.iter().any(|s| &s.name == name) {
            return Err(InputError::Unknown(name.clone()));
        }
    }

    let mut effective = HashMap::new();
    for spec in specs {
        let value = match provided.get(&spec.name).or(spec.default.as_ref()) {
            Some(v) => v.clone(),
            None if spec.required => {
                return Err(InputError::MissingRequired(spec.name.clone()));
            }
            None => continue,
        };
        check_type(spec, &value)?;
        if let Some(pattern) = &spec.validation {
            let re = Regex::new(pattern).map_err(|_| InputError::BadPattern {
                name: spec.name.clone(),
                pattern: pattern.clone(),
            })?;
            if !re.is_match(&value) {
                return Err(InputError::FailsValidation {
                    name: spec.name.clone(),
                    pattern: pattern.clone(),
                    value,
                });
            }
        }
        effective.insert(spec.name.clone(), value);
    }
    Ok(effective)
}

fn check_type(spec: &InputSpec, value: &str) -> Result<(), InputError> {
    let wrong = |expected: &str| InputError::WrongType {
        name: spec.name.clone(),
        expected: expected.to_string(),
        value: value.to_string(),
    };
    match spec.input_type {
        InputType::String | InputType::File => Ok(()),
        InputType::Int => value.parse::<i64>().map(|_| ()).map_err(|_| wrong("int")),
        InputType::Bool => match value {
            "true" | "false" => Ok(()),
            _ => Err(wrong("bool")),
        },
        InputType::Enum => {
            if spec.options.iter().any(|o| o == value) {
                Ok(())
            } else {
                Err(InputError::NotAnOption {
                    name: spec.name.clone(),
                    value: value.to_string(),
                })
            }
        }
        InputType::Email => {
            // One '@' with non-empty local part and a dotted domain.
            let Some((local, domain)) = value.split_once('@') else {
                return Err(wrong("email"));
            };
            if local.is_empty() || domain.is_empty() || !domain.contains('.') {
                return Err(wrong("email"));
            }
            Ok(())
        }
        InputType::Date => chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(|_| ())
            .map_err(|_| wrong("date")),
    }
}

#[cfg(test)]
#[path = "inputs_tests.rs"]
mod tests;
