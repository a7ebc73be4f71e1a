// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor registry.
//!
//! Name → factory plus name → config schema. Populated once at process
//! init; duplicate registration fails hard. The registry also implements
//! the flow validator's [`ExecutorCatalog`] seam, so `with` blocks are
//! schema-checked before a flow document is accepted.

use crate::executor::{container, script, Executor, ExecutorError, ExecutorSpawn};
use relay_flow::ExecutorCatalog;
use std::collections::HashMap;
use std::sync::Arc;

type ExecutorFactory = Arc<dyn Fn(ExecutorSpawn) -> Box<dyn Executor> + Send + Sync>;
type ConfigSchema = Arc<dyn Fn(&serde_json::Value) -> Result<(), String> + Send + Sync>;

#[derive(Default)]
pub struct ExecutorRegistry {
    factories: HashMap<String, ExecutorFactory>,
    schemas: HashMap<String, ConfigSchema>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in executors registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(
            "script",
            script::validate_config,
            |spawn| Box::new(script::ScriptExecutor::new(spawn)) as _,
        );
        registry.register(
            "container",
            container::validate_config,
            |spawn| Box::new(container::ContainerExecutor::new(spawn)) as _,
        );
        registry
    }

    /// Register an executor with its config schema. Fails hard on
    /// duplicates.
    pub fn register(
        &mut self,
        name: &str,
        schema: impl Fn(&serde_json::Value) -> Result<(), String> + Send + Sync + 'static,
        factory: impl Fn(ExecutorSpawn) -> Box<dyn Executor> + Send + Sync + 'static,
    ) {
        let replaced = self.factories.insert(name.to_string(), Arc::new(factory));
        self.schemas.insert(name.to_string(), Arc::new(schema));
        assert!(replaced.is_none(), "executor registered twice: {name}");
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Produce an executor instance for one action.
    pub fn create(
        &self,
        executor: &str,
        spawn: ExecutorSpawn,
    ) -> Result<Box<dyn Executor>, ExecutorError> {
        let factory = self
            .factories
            .get(executor)
            .ok_or_else(|| ExecutorError::Unknown(executor.to_string()))?;
        Ok(factory(spawn))
    }
}

impl ExecutorCatalog for ExecutorRegistry {
    fn has_executor(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    fn validate_config(&self, executor: &str, with: &serde_json::Value) -> Result<(), String> {
        match self.schemas.get(executor) {
            Some(schema) => schema(with),
            None => Err(format!("unknown executor: {executor}")),
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
