// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error type.

use relay_core::ExecId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Parse(#[from] relay_flow::ParseError),
    #[error(transparent)]
    Validate(#[from] relay_flow::ValidateError),
    #[error(transparent)]
    Input(#[from] relay_flow::InputError),
    #[error(transparent)]
    Cron(#[from] relay_flow::CronError),
    #[error(transparent)]
    Store(#[from] relay_store::StoreError),
    #[error("{user} cannot decide approvals in namespace '{namespace}'")]
    Forbidden { user: String, namespace: String },
    #[error("unknown node: {0}")]
    UnknownNode(String),
    #[error("unknown execution: {0}")]
    UnknownExecution(ExecId),
    #[error("engine io error: {0}")]
    Io(#[from] std::io::Error),
}
