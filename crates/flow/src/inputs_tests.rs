// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::model::{InputSpec, InputType};
use std::collections::HashMap;
use yare::parameterized;

fn spec(name: &str, input_type: InputType) -> InputSpec {
    InputSpec {
        name: name.to_string(),
        input_type,
        label: String::new(),
        required: false,
        default: None,
        validation: None,
        options: Vec::new(),
    }
}

fn provided(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn applies_default_when_value_absent() {
    let mut s = spec("USER", InputType::String);
    s.default = Some("world".to_string());
    let effective = validate_inputs(&[s], &HashMap::new()).unwrap();
    assert_eq!(effective.get("USER").map(String::as_str), Some("world"));
}

#[test]
fn provided_value_overrides_default() {
    let mut s = spec("USER", InputType::String);
    s.default = Some("world".to_string());
    let effective = validate_inputs(&[s], &provided(&[("USER", "amara")])).unwrap();
    assert_eq!(effective.get("USER").map(String::as_str), Some("amara"));
}

#[test]
fn missing_required_input_fails() {
    let mut s = spec("USER", InputType::String);
    s.required = true;
    let err = validate_inputs(&[s], &HashMap::new()).unwrap_err();
    assert!(matches!(err, InputError::MissingRequired(name) if name == "USER"));
}

#[test]
fn optional_input_without_value_is_omitted() {
    let s = spec("OPT", InputType::String);
    let effective = validate_inputs(&[s], &HashMap::new()).unwrap();
    assert!(effective.is_empty());
}

#[test]
fn undeclared_input_fails() {
    let err = validate_inputs(&[], &provided(&[("GHOST", "boo")])).unwrap_err();
    assert!(matches!(err, InputError::Unknown(name) if name == "GHOST"));
}

#[parameterized(
    int_ok = { InputType::Int, "42", true },
    int_negative = { InputType::Int, "-7", true },
    int_bad = { InputType::Int, "4.2", false },
    bool_true = { InputType::Bool, "true", true },
    bool_false = { InputType::Bool, "false", true },
    bool_bad = { InputType::Bool, "yes", false },
    email_ok = { InputType::Email, "dev@example.com", true },
    email_no_at = { InputType::Email, "example.com", false },
    email_no_domain_dot = { InputType::Email, "dev@localhost", false },
    date_ok = { InputType::Date, "2026-08-01", true },
    date_bad = { InputType::Date, "01/08/2026", false },
    file_anything = { InputType::File, "reports/q3.csv", true },
)]
fn type_checks(input_type: InputType, value: &str, ok: bool) {
    let s = spec("V", input_type);
    let result = validate_inputs(&[s], &provided(&[("V", value)]));
    assert_eq!(result.is_ok(), ok, "value {value:?}");
}

#[test]
fn enum_accepts_only_declared_options() {
    let mut s = spec("ENV", InputType::Enum);
    s.options = vec!["staging".to_string(), "prod".to_string()];
    assert!(validate_inputs(std::slice::from_ref(&s), &provided(&[("ENV", "prod")])).is_ok());
    let err = validate_inputs(&[s], &provided(&[("ENV", "dev")])).unwrap_err();
    assert!(matches!(err, InputError::NotAnOption { .. }));
}

#[test]
fn validation_regex_is_enforced() {
    let mut s = spec("TAG", InputType::String);
    s.validation = Some("^v[0-9]+$".to_string());
    assert!(validate_inputs(std::slice::from_ref(&s), &provided(&[("TAG", "v12")])).is_ok());
    let err = validate_inputs(&[s], &provided(&[("TAG", "latest")])).unwrap_err();
    assert!(matches!(err, InputError::FailsValidation { .. }));
}

#[test]
fn defaults_are_type_checked_too() {
    let mut s = spec("N", InputType::Int);
    s.default = Some("not-a-number".to_string());
    let err = validate_inputs(&[s], &HashMap::new()).unwrap_err();
    assert!(matches!(err, InputError::WrongType { .. }));
}
