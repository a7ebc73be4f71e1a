// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Template variable resolution.
//!
//! Flows reference runtime values with `{{ namespace.path }}` fragments.
//! Three namespaces exist: `inputs.X` (declared inputs), `actions.A.Y`
//! (OUTPUT keys of earlier actions), and `secrets.S` (keystore lookups).
//! Resolution is pure and happens once per field immediately before
//! executor dispatch, so later actions observe earlier actions' outputs.

use regex::Regex;
use relay_core::{SecretError, SecretStore};
use std::collections::HashMap;
use std::sync::LazyLock;
use thiserror::Error;

/// Regex pattern for `{{ namespace.path }}` fragments.
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static REF_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_-]*(?:\.[a-zA-Z0-9_.-]+)*)\s*\}\}")
        .expect("constant regex pattern is valid")
});

/// Errors from resolving a template against an execution context.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The reference names an unknown input, action, key, or namespace.
    #[error("unresolved template reference: {{{{ {0} }}}}")]
    UnknownReference(String),
    /// Secret lookup failed. Kept distinct from [`Self::UnknownReference`]
    /// so the audit trail can tell a typo from a missing secret.
    #[error("secret unavailable: {0}")]
    SecretUnavailable(#[from] SecretError),
}

/// A parsed template reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateRef {
    Input(String),
    Action { action: String, key: String },
    Secret(String),
}

/// Extract every `{{ ... }}` reference in a template.
///
/// References in unknown namespaces are returned as errors so validation
/// rejects them before a flow is accepted.
pub fn extract_refs(template: &str) -> Result<Vec<TemplateRef>, ResolveError> {
    let mut refs = Vec::new();
    for caps in REF_PATTERN.captures_iter(template) {
        refs.push(parse_ref(&caps[1])?);
    }
    Ok(refs)
}

fn parse_ref(path: &str) -> Result<TemplateRef, ResolveError> {
    let mut parts = path.splitn(2, '.');
    let namespace = parts.next().unwrap_or_default();
    let rest = parts.next();
    match (namespace, rest) {
        ("inputs", Some(name)) if !name.is_empty() && !name.contains('.') => {
            Ok(TemplateRef::Input(name.to_string()))
        }
        ("actions", Some(rest)) => match rest.split_once('.') {
            Some((action, key)) if !action.is_empty() && !key.is_empty() => {
                Ok(TemplateRef::Action {
                    action: action.to_string(),
                    key: key.to_string(),
                })
            }
            _ => Err(ResolveError::UnknownReference(path.to_string())),
        },
        ("secrets", Some(name)) if !name.is_empty() && !name.contains('.') => {
            Ok(TemplateRef::Secret(name.to_string()))
        }
        _ => Err(ResolveError::UnknownReference(path.to_string())),
    }
}

/// Execution-scoped values templates resolve against.
pub struct TemplateContext<'a> {
    pub namespace: &'a str,
    pub inputs: &'a HashMap<String, String>,
    /// OUTPUT maps of actions that already ran, keyed by action id.
    pub actions: &'a HashMap<String, HashMap<String, String>>,
    pub secrets: &'a dyn SecretStore,
}

impl TemplateContext<'_> {
    fn lookup(&self, reference: &TemplateRef) -> Result<String, ResolveError> {
        match reference {
            TemplateRef::Input(name) => self
                .inputs
                .get(name)
                .cloned()
                .ok_or_else(|| ResolveError::UnknownReference(format!("inputs.{name}"))),
            TemplateRef::Action { action, key } => self
                .actions
                .get(action)
                .and_then(|outputs| outputs.get(key))
                .cloned()
                .ok_or_else(|| {
                    ResolveError::UnknownReference(format!("actions.{action}.{key}"))
                }),
            TemplateRef::Secret(name) => Ok(self.secrets.get(self.namespace, name)?),
        }
    }
}

/// Expand every `{{ ... }}` fragment in `template`.
///
/// Missing inputs/actions fail with [`ResolveError::UnknownReference`];
/// missing secrets fail with the distinct secret-unavailable kind. Text
/// outside fragments passes through untouched.
pub fn resolve(template: &str, ctx: &TemplateContext<'_>) -> Result<String, ResolveError> {
    let mut out = String::with_capacity(template.len());
    let mut last_end = 0;
    for caps in REF_PATTERN.captures_iter(template) {
        // Capture 0 always exists when captures_iter yields
        let Some(whole) = caps.get(0) else { continue };
        let reference = parse_ref(&caps[1])?;
        let value = ctx.lookup(&reference)?;
        out.push_str(&template[last_end..whole.start()]);
        out.push_str(&value);
        last_end = whole.end();
    }
    out.push_str(&template[last_end..]);
    Ok(out)
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
