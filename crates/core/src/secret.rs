// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Secret keystore seam.
//!
//! The engine asks the keystore for plaintext at template-resolve time
//! and never persists the value. The at-rest encryption backend is an
//! external collaborator; this trait is the whole contract.

use crate::namespace::scoped_name;
use parking_lot::RwLock;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret not found: {namespace}/{name}")]
    NotFound { namespace: String, name: String },
    #[error("keystore error: {0}")]
    Backend(String),
}

/// Read-only secret access, scoped by namespace.
pub trait SecretStore: Send + Sync {
    fn get(&self, namespace: &str, name: &str) -> Result<String, SecretError>;
}

/// In-memory keystore for wiring and tests.
#[derive(Default)]
pub struct StaticSecrets {
    values: RwLock<HashMap<String, String>>,
}

impl StaticSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, namespace: &str, name: &str, value: impl Into<String>) {
        self.values
            .write()
            .insert(scoped_name(namespace, name), value.into());
    }
}

impl SecretStore for StaticSecrets {
    fn get(&self, namespace: &str, name: &str) -> Result<String, SecretError> {
        self.values
            .read()
            .get(&scoped_name(namespace, name))
            .cloned()
            .ok_or_else(|| SecretError::NotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }
}
