// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Approval authority seam.
//!
//! Who may decide approvals is a property of the surrounding deployment
//! (sessions, OIDC, role mappings), not of the engine. The gate
//! consults this trait before flipping an approval row.

/// Authority check for approval decisions.
pub trait ApprovalPolicy: Send + Sync {
    /// May `user` decide approvals for executions in `namespace`?
    fn can_decide(&self, user: &str, namespace: &str) -> bool;
}

/// Policy that lets anyone decide (single-operator deployments).
pub struct AllowAll;

impl ApprovalPolicy for AllowAll {
    fn can_decide(&self, _user: &str, _namespace: &str) -> bool {
        true
    }
}

/// Policy backed by an explicit (user, namespace) allow list.
#[derive(Default)]
pub struct NamespaceApprovers {
    entries: Vec<(String, String)>,
}

impl NamespaceApprovers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(mut self, user: &str, namespace: &str) -> Self {
        self.entries.push((user.to_string(), namespace.to_string()));
        self
    }
}

impl ApprovalPolicy for NamespaceApprovers {
    fn can_decide(&self, user: &str, namespace: &str) -> bool {
        self.entries
            .iter()
            .any(|(u, ns)| u == user && ns == namespace)
    }
}
