//! Variable loaders feed configuration into the container before discovery begins.
//!
//! Loaders run in registration order and later registrations overwrite earlier ones, so a
//! defaults loader followed by an environment loader gives the usual override layering.

use crate::context::ContextBuilder;
use crate::error::BoxError;
use crate::variable::Value;
use std::collections::BTreeMap;

pub trait VariableLoader: Send + Sync {
    fn load(&self, builder: &dyn ContextBuilder) -> Result<(), BoxError>;
}

/// An in-memory set of variables, handy for defaults and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticVariables {
    values: BTreeMap<String, Value>,
}

impl StaticVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl VariableLoader for StaticVariables {
    fn load(&self, builder: &dyn ContextBuilder) -> Result<(), BoxError> {
        for (name, value) in &self.values {
            builder.register_variable(name, value.clone());
        }
        Ok(())
    }
}
