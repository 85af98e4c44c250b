//! Programmatic component registration, run before variables are loaded.

use crate::component::Component;
use crate::context::ContextBuilder;
use crate::error::BoxError;
use std::sync::Arc;

pub trait Factory: Send + Sync {
    fn create(&self, builder: &dyn ContextBuilder) -> Result<(), BoxError>;
}

/// Registers a fixed list of components.
#[derive(Default)]
pub struct ComponentFactory {
    components: Vec<Arc<dyn Component>>,
}

impl ComponentFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, component: impl Component) -> Self {
        self.components.push(Arc::new(component));
        self
    }

    pub fn with_arc(mut self, component: Arc<dyn Component>) -> Self {
        self.components.push(component);
        self
    }
}

impl Factory for ComponentFactory {
    fn create(&self, builder: &dyn ContextBuilder) -> Result<(), BoxError> {
        for component in &self.components {
            builder.register_component(Arc::clone(component))?;
        }
        Ok(())
    }
}

/// A factory backed by a closure.
pub struct FactoryFn<F>(pub F);

impl<F> FactoryFn<F>
where
    F: Fn(&dyn ContextBuilder) -> Result<(), BoxError> + Send + Sync,
{
    pub fn new(create: F) -> Self {
        Self(create)
    }
}

impl<F> Factory for FactoryFn<F>
where
    F: Fn(&dyn ContextBuilder) -> Result<(), BoxError> + Send + Sync,
{
    fn create(&self, builder: &dyn ContextBuilder) -> Result<(), BoxError> {
        (self.0)(builder)
    }
}
