//! # Starters
//!
//! A starter is a named, optional bundle of registrations ("if `cache.enabled` is set, add a
//! cache component"). Starters run one after another in registration order, after variables
//! are loaded and before dependency discovery, so anything they register takes part in the
//! normal discovery and initialization passes.
//!
//! ```rust
//! use autowire_container::starter::{property_equals, ConditionalStarter};
//! use autowire_container::{ComponentBase, ContextBuilder};
//! use std::sync::Arc;
//!
//! let cache = ConditionalStarter::new(
//!     "cache",
//!     property_equals("cache.enabled", "true"),
//!     |builder: &dyn ContextBuilder| {
//!         builder.register_component(Arc::new(ComponentBase::new("cache")))?;
//!         Ok(())
//!     },
//! );
//! # let _ = cache;
//! ```

use crate::context::{ApplicationContext, ContextBuilder};
use crate::error::{BoxError, ContainerError};

pub trait Starter: Send + Sync {
    fn name(&self) -> &str;

    /// Consulted right before [`Starter::start`]; returning `false` skips the starter.
    fn should_start(&self, _ctx: &dyn ApplicationContext) -> bool {
        true
    }

    fn start(&self, builder: &dyn ContextBuilder) -> Result<(), BoxError>;
}

type StartFn = Box<dyn Fn(&dyn ContextBuilder) -> Result<(), BoxError> + Send + Sync>;
type Condition = Box<dyn Fn(&dyn ApplicationContext) -> bool + Send + Sync>;

/// An unconditional starter backed by a closure.
pub struct StarterFn {
    name: String,
    body: StartFn,
}

impl StarterFn {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&dyn ContextBuilder) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            body: Box::new(body),
        }
    }
}

impl Starter for StarterFn {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self, builder: &dyn ContextBuilder) -> Result<(), BoxError> {
        (self.body)(builder)
    }
}

/// A starter that only applies when its condition holds.
pub struct ConditionalStarter {
    name: String,
    condition: Condition,
    body: StartFn,
}

impl ConditionalStarter {
    pub fn new<C, F>(name: impl Into<String>, condition: C, body: F) -> Self
    where
        C: Fn(&dyn ApplicationContext) -> bool + Send + Sync + 'static,
        F: Fn(&dyn ContextBuilder) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            condition: Box::new(condition),
            body: Box::new(body),
        }
    }
}

impl Starter for ConditionalStarter {
    fn name(&self) -> &str {
        &self.name
    }

    fn should_start(&self, ctx: &dyn ApplicationContext) -> bool {
        (self.condition)(ctx)
    }

    fn start(&self, builder: &dyn ContextBuilder) -> Result<(), BoxError> {
        (self.body)(builder)
    }
}

/// Runs its children in order. Each child's own condition is checked against the builder as it
/// stands at that point, so a child sees what earlier children registered.
pub struct CompositeStarter {
    name: String,
    starters: Vec<Box<dyn Starter>>,
}

impl CompositeStarter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            starters: Vec::new(),
        }
    }

    pub fn with(mut self, starter: impl Starter + 'static) -> Self {
        self.starters.push(Box::new(starter));
        self
    }
}

impl Starter for CompositeStarter {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self, builder: &dyn ContextBuilder) -> Result<(), BoxError> {
        for starter in &self.starters {
            if !starter.should_start(builder.as_context()) {
                tracing::debug!(
                    composite = %self.name,
                    starter = starter.name(),
                    "Skipping starter, condition not met"
                );
                continue;
            }
            starter
                .start(builder)
                .map_err(|source| ContainerError::StarterFailed {
                    name: starter.name().to_string(),
                    source,
                })?;
        }
        Ok(())
    }
}

/// True when `property` renders exactly as `expected`.
pub fn property_equals(
    property: impl Into<String>,
    expected: impl Into<String>,
) -> impl Fn(&dyn ApplicationContext) -> bool + Send + Sync + 'static {
    let property = property.into();
    let expected = expected.into();
    move |ctx: &dyn ApplicationContext| ctx.get_variable(&property) == expected
}

/// True when `property` is set to a non-empty value.
pub fn property_exists(
    property: impl Into<String>,
) -> impl Fn(&dyn ApplicationContext) -> bool + Send + Sync + 'static {
    let property = property.into();
    move |ctx: &dyn ApplicationContext| !ctx.get_variable(&property).is_empty()
}

pub fn component_exists(
    name: impl Into<String>,
) -> impl Fn(&dyn ApplicationContext) -> bool + Send + Sync + 'static {
    let name = name.into();
    move |ctx: &dyn ApplicationContext| ctx.has_component(&name)
}

pub fn component_missing(
    name: impl Into<String>,
) -> impl Fn(&dyn ApplicationContext) -> bool + Send + Sync + 'static {
    let name = name.into();
    move |ctx: &dyn ApplicationContext| !ctx.has_component(&name)
}
