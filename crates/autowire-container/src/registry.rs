//! # Component Registry
//!
//! Holds every registered component under its unique name. Reads vastly outnumber writes
//! (registration happens once, lookups happen from every initializer), so the map sits behind
//! an `RwLock` and every accessor hands back copies rather than references into the map.

use crate::component::{AsAny, Component};
use crate::context::{Resolved, TypeQuery};
use crate::error::ContainerError;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

#[derive(Default)]
struct Inner {
    components: HashMap<String, Arc<dyn Component>>,
    /// Registration order; iteration follows it so discovery is deterministic.
    order: Vec<String>,
}

/// Thread-safe store of named components.
#[derive(Default)]
pub struct ComponentRegistry {
    inner: RwLock<Inner>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a component. Fails if its name is empty or already taken; the first registration
    /// is left untouched in that case.
    pub fn register(&self, component: Arc<dyn Component>) -> Result<(), ContainerError> {
        let name = component.name().to_string();
        if name.is_empty() {
            return Err(ContainerError::InvalidComponent(format!(
                "component of type {} has an empty name",
                (*component).concrete_type_name()
            )));
        }

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.components.contains_key(&name) {
            return Err(ContainerError::ComponentAlreadyRegistered(name));
        }

        info!(component = %name, "Registering component");
        inner.order.push(name.clone());
        inner.components.insert(name, component);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Component>, ContainerError> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .components
            .get(name)
            .cloned()
            .ok_or_else(|| ContainerError::ComponentNotFound(name.to_string()))
    }

    pub fn has(&self, name: &str) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .components
            .contains_key(name)
    }

    /// Every component, in registration order.
    pub fn get_all(&self) -> Vec<(String, Arc<dyn Component>)> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .order
            .iter()
            .filter_map(|name| {
                inner
                    .components
                    .get(name)
                    .map(|c| (name.clone(), Arc::clone(c)))
            })
            .collect()
    }

    /// Every component name, in registration order.
    pub fn get_names(&self) -> Vec<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .order
            .clone()
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .order
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Finds the component satisfying `query`.
    ///
    /// Exact concrete-type matches win over advertised interfaces. More than one candidate at
    /// the winning tier is reported as [`ContainerError::AmbiguousComponent`] instead of
    /// picking one arbitrarily.
    pub fn find_by_type(&self, query: TypeQuery) -> Result<Resolved, ContainerError> {
        let components = self.get_all();

        let exact: Vec<_> = components
            .iter()
            .filter(|(_, c)| (**c).concrete_type_id() == query.type_id)
            .collect();
        if let Some((name, component)) = single(&exact, query)? {
            return Ok(Resolved {
                name: name.clone(),
                value: AsAny::into_arc_any(Arc::clone(component)),
            });
        }

        let mut assignable = Vec::new();
        for (name, component) in &components {
            let mut interfaces = Component::interfaces(Arc::clone(component));
            if let Some(view) = interfaces.take(query.type_id) {
                assignable.push((name.clone(), view));
            }
        }
        match assignable.len() {
            0 => Err(ContainerError::ComponentTypeNotFound(
                query.type_name.to_string(),
            )),
            1 => {
                let (name, value) = assignable.remove(0);
                Ok(Resolved { name, value })
            }
            _ => Err(ambiguous(
                query,
                assignable.iter().map(|(name, _)| name.clone()).collect(),
            )),
        }
    }
}

fn single<'a>(
    matches: &[&'a (String, Arc<dyn Component>)],
    query: TypeQuery,
) -> Result<Option<&'a (String, Arc<dyn Component>)>, ContainerError> {
    match matches {
        [] => Ok(None),
        [only] => Ok(Some(*only)),
        many => Err(ambiguous(
            query,
            many.iter().map(|(name, _)| name.clone()).collect(),
        )),
    }
}

fn ambiguous(query: TypeQuery, mut candidates: Vec<String>) -> ContainerError {
    candidates.sort();
    ContainerError::AmbiguousComponent {
        type_name: query.type_name.to_string(),
        candidates,
    }
}
