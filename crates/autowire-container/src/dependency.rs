//! # Dependency Discovery
//!
//! Components never declare their dependencies. Instead, the resolver runs each component's
//! `init` against a [`TrackingContext`]: a proxy that implements the normal
//! [`ApplicationContext`] contract, forwards every call to the real container, and remembers
//! every component name that passed through it.
//!
//! ## Discovery rules
//!
//! - Type-based and name-based lookups both record the matched name.
//! - `has_component` records the name only when the component exists.
//! - A component that resolves *itself* fails discovery with a two-element cycle
//!   (`[name, name]`).
//! - Lookup failures (a dependency a starter has not registered yet, an `init` that bails out
//!   early) are not fatal here; they are re-checked for real during initialization.
//!
//! After each component's edges are known, a depth-first search from every new dependency back
//! towards the component detects cycles incrementally, so the first offending edge is the one
//! reported.

use crate::component::Component;
use crate::context::{ApplicationContext, Resolved, TypeQuery};
use crate::error::ContainerError;
use crate::metrics::{ComponentMetrics, MetricsCollector};
use crate::registry::ComponentRegistry;
use crate::variable::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::{debug, info};

/// Records every component a single initializer touches.
pub struct TrackingContext<'a> {
    inner: &'a dyn ApplicationContext,
    registry: &'a ComponentRegistry,
    component: &'a str,
    accessed: Mutex<BTreeSet<String>>,
    self_access: AtomicBool,
}

impl<'a> TrackingContext<'a> {
    pub fn new(
        inner: &'a dyn ApplicationContext,
        registry: &'a ComponentRegistry,
        component: &'a str,
    ) -> Self {
        Self {
            inner,
            registry,
            component,
            accessed: Mutex::new(BTreeSet::new()),
            self_access: AtomicBool::new(false),
        }
    }

    /// Names touched so far.
    pub fn accessed(&self) -> BTreeSet<String> {
        self.accessed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether the component tried to resolve itself.
    pub fn accessed_self(&self) -> bool {
        self.self_access.load(Ordering::SeqCst)
    }

    fn record(&self, name: &str) {
        self.accessed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string());
    }

    fn reject_self(&self, name: &str) -> Result<(), ContainerError> {
        if name == self.component {
            self.self_access.store(true, Ordering::SeqCst);
            return Err(ContainerError::CircularDependency(vec![
                name.to_string(),
                name.to_string(),
            ]));
        }
        Ok(())
    }
}

impl ApplicationContext for TrackingContext<'_> {
    fn resolve(&self, query: TypeQuery) -> Result<Resolved, ContainerError> {
        let resolved = self.registry.find_by_type(query)?;
        self.reject_self(&resolved.name)?;
        self.record(&resolved.name);
        debug!(
            component = self.component,
            depends_on = %resolved.name,
            requested = query.type_name,
            "Dependency detected by type"
        );
        Ok(resolved)
    }

    fn get_component_by_name(&self, name: &str) -> Result<Arc<dyn Component>, ContainerError> {
        self.reject_self(name)?;
        self.record(name);
        debug!(
            component = self.component,
            depends_on = name,
            "Dependency detected by name"
        );
        self.inner.get_component_by_name(name)
    }

    fn has_component(&self, name: &str) -> bool {
        let exists = self.inner.has_component(name);
        if exists && name != self.component {
            self.record(name);
        }
        exists
    }

    fn get_component_names(&self) -> Vec<String> {
        self.inner.get_component_names()
    }

    fn get_variable(&self, name: &str) -> String {
        self.inner.get_variable(name)
    }

    fn get_variable_raw(&self, name: &str) -> Option<Value> {
        self.inner.get_variable_raw(name)
    }

    fn get_variables(&self) -> HashMap<String, Value> {
        self.inner.get_variables()
    }

    fn get_metrics(&self) -> HashMap<String, ComponentMetrics> {
        HashMap::new()
    }
}

/// Builds the dependency graph by observing what each initializer accesses.
pub struct DependencyResolver {
    registry: Arc<ComponentRegistry>,
    metrics: Arc<MetricsCollector>,
    dependencies: HashMap<String, BTreeSet<String>>,
}

impl DependencyResolver {
    pub fn new(registry: Arc<ComponentRegistry>, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            registry,
            metrics,
            dependencies: HashMap::new(),
        }
    }

    /// Runs discovery for every registered component, checking for cycles after each one.
    pub fn discover_dependencies(
        &mut self,
        ctx: &dyn ApplicationContext,
    ) -> Result<(), ContainerError> {
        info!(components = self.registry.len(), "Discovering component dependencies");

        for (name, component) in self.registry.get_all() {
            let deps = self.discover_component(ctx, &name, component.as_ref())?;
            self.dependencies.insert(name.clone(), deps.clone());

            for dep in deps.iter().filter(|dep| **dep != name) {
                let mut visited = HashSet::new();
                let mut path = vec![name.clone()];
                if self.detect_cycle(&name, dep, &mut visited, &mut path) {
                    return Err(ContainerError::CircularDependency(path));
                }
            }
        }
        Ok(())
    }

    fn discover_component(
        &self,
        ctx: &dyn ApplicationContext,
        name: &str,
        component: &dyn Component,
    ) -> Result<BTreeSet<String>, ContainerError> {
        let tracker = TrackingContext::new(ctx, &self.registry, name);
        let start = Instant::now();
        debug!(component = name, "Discovering dependencies");

        if let Err(e) = component.init(&tracker) {
            debug!(component = name, error = %e, "Init failed during discovery, deferring");
        }
        if tracker.accessed_self() {
            return Err(ContainerError::CircularDependency(vec![
                name.to_string(),
                name.to_string(),
            ]));
        }

        let deps = tracker.accessed();
        self.metrics.record_dependency_count(name, deps.len());
        debug!(
            component = name,
            dependencies = deps.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Dependencies discovered"
        );
        Ok(deps)
    }

    /// Depth-first search from `target` back to `source`. On success `path` holds the cycle,
    /// starting and ending with `source`.
    fn detect_cycle(
        &self,
        source: &str,
        target: &str,
        visited: &mut HashSet<String>,
        path: &mut Vec<String>,
    ) -> bool {
        if source == target {
            path.push(target.to_string());
            return true;
        }
        if !visited.insert(target.to_string()) {
            return false;
        }

        path.push(target.to_string());
        if let Some(deps) = self.dependencies.get(target) {
            for dep in deps {
                if self.detect_cycle(source, dep, visited, path) {
                    return true;
                }
            }
        }
        path.pop();
        false
    }

    /// A copy of the discovered dependencies of `name`; empty if none were recorded.
    pub fn get_dependencies(&self, name: &str) -> BTreeSet<String> {
        self.dependencies.get(name).cloned().unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn insert_dependencies(&mut self, name: &str, deps: &[&str]) {
        self.dependencies.insert(
            name.to_string(),
            deps.iter().map(|d| d.to_string()).collect(),
        );
    }

    /// A copy of the whole graph.
    pub fn graph(&self) -> HashMap<String, BTreeSet<String>> {
        self.dependencies.clone()
    }
}
