//! # Component Initializer
//!
//! Runs every component's real `init`, dependencies first, exactly once.
//!
//! The walk is a depth-first traversal of the graph the resolver discovered. It keeps the
//! current recursion path and fails with [`ContainerError::CircularDependency`] if a component
//! shows up on it twice. Discovery already checks for cycles, but it only sees the edges that
//! happened to be reachable while dependencies were missing, so this second check stays.

use crate::context::ApplicationContext;
use crate::dependency::DependencyResolver;
use crate::error::ContainerError;
use crate::metrics::MetricsCollector;
use crate::registry::ComponentRegistry;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct ComponentInitializer {
    registry: Arc<ComponentRegistry>,
    metrics: Arc<MetricsCollector>,
    initialized: HashSet<String>,
    init_order: Vec<String>,
}

impl ComponentInitializer {
    pub fn new(registry: Arc<ComponentRegistry>, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            registry,
            metrics,
            initialized: HashSet::new(),
            init_order: Vec::new(),
        }
    }

    /// Initializes every registered component. The first failure aborts the whole phase.
    pub fn initialize_all(
        &mut self,
        resolver: &DependencyResolver,
        ctx: &dyn ApplicationContext,
    ) -> Result<(), ContainerError> {
        info!(components = self.registry.len(), "Initializing components");
        for name in self.registry.get_names() {
            if self.initialized.contains(&name) {
                continue;
            }
            let mut visiting = HashSet::new();
            let mut path = Vec::new();
            self.init_component(&name, resolver, ctx, &mut visiting, &mut path)?;
        }
        Ok(())
    }

    fn init_component(
        &mut self,
        name: &str,
        resolver: &DependencyResolver,
        ctx: &dyn ApplicationContext,
        visiting: &mut HashSet<String>,
        path: &mut Vec<String>,
    ) -> Result<(), ContainerError> {
        if self.initialized.contains(name) {
            return Ok(());
        }
        if visiting.contains(name) {
            let mut cycle = path.clone();
            cycle.push(name.to_string());
            warn!(cycle = ?cycle, "Cycle found during initialization");
            return Err(ContainerError::CircularDependency(cycle));
        }

        let component = self.registry.get(name)?;

        visiting.insert(name.to_string());
        path.push(name.to_string());

        for dep in resolver.get_dependencies(name) {
            if dep != name {
                self.init_component(&dep, resolver, ctx, visiting, path)?;
            }
        }

        debug!(component = name, "Initializing component");
        let start = Instant::now();
        component
            .init(ctx)
            .map_err(|source| ContainerError::InitializationFailed {
                name: name.to_string(),
                source,
            })?;
        let elapsed = start.elapsed();
        self.metrics.record_init_duration(name, elapsed);
        debug!(
            component = name,
            elapsed_ms = elapsed.as_millis() as u64,
            "Component initialized"
        );

        self.initialized.insert(name.to_string());
        self.init_order.push(name.to_string());

        visiting.remove(name);
        path.pop();
        Ok(())
    }

    /// The order components were actually initialized in.
    pub fn init_order(&self) -> Vec<String> {
        self.init_order.clone()
    }

    pub fn is_initialized(&self, name: &str) -> bool {
        self.initialized.contains(name)
    }
}
