//! # Application Context
//!
//! The lookup contract components use from `init`. Two implementations exist: the real
//! [`Container`](crate::Container) and the discovery-time tracking proxy in
//! [`dependency`](crate::dependency). Because components only ever see
//! `&dyn ApplicationContext`, they cannot tell the two apart.
//!
//! ## Generic lookup over an object-safe core
//!
//! Trait objects cannot have generic methods, so the trait exposes a single type-erased entry
//! point ([`ApplicationContext::resolve`]) and the typed API lives in [`ContextExt`], which is
//! blanket-implemented for every context (including `dyn ApplicationContext`):
//!
//! ```rust,ignore
//! let db: Arc<Database> = ctx.get_component::<Database>()?;        // concrete type
//! let greeter: Arc<dyn Greeter> = ctx.get_component::<dyn Greeter>()?; // advertised interface
//! let cache: Arc<Cache> = ctx.get_named::<Cache>("cache")?;          // by name, typed
//! let port = ctx.variables().get_int("server.port", 8080);
//! ```

use crate::component::{AsAny, Component};
use crate::error::ContainerError;
use crate::factory::Factory;
use crate::loader::VariableLoader;
use crate::metrics::ComponentMetrics;
use crate::starter::Starter;
use crate::variable::{Value, VariableHelper};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// Identifies the type requested by a type-based lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeQuery {
    pub type_id: TypeId,
    pub type_name: &'static str,
}

impl TypeQuery {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }
}

/// A successful type-based lookup: the matched component's name and a boxed `Arc<T>`.
pub struct Resolved {
    pub name: String,
    pub value: Box<dyn Any + Send + Sync>,
}

/// Read-only view of the container handed to component initializers.
pub trait ApplicationContext: Send + Sync {
    /// Resolves a component by type: exact concrete type first, then advertised interfaces.
    fn resolve(&self, query: TypeQuery) -> Result<Resolved, ContainerError>;

    fn get_component_by_name(&self, name: &str) -> Result<Arc<dyn Component>, ContainerError>;

    fn has_component(&self, name: &str) -> bool;

    fn get_component_names(&self) -> Vec<String>;

    /// The rendered value of a variable, or an empty string if it is missing.
    fn get_variable(&self, name: &str) -> String;

    fn get_variable_raw(&self, name: &str) -> Option<Value>;

    /// Snapshot of every variable; used for prefix-based binding.
    fn get_variables(&self) -> HashMap<String, Value>;

    fn get_metrics(&self) -> HashMap<String, ComponentMetrics>;
}

/// The registration surface available to the bootstrap block, factories, loaders and starters.
pub trait ContextBuilder: ApplicationContext {
    /// This builder as a plain lookup context (for starter conditions).
    fn as_context(&self) -> &dyn ApplicationContext;

    fn register_component(&self, component: Arc<dyn Component>) -> Result<(), ContainerError>;

    /// Registers or overwrites a variable.
    fn register_variable(&self, name: &str, value: Value);

    fn register_variable_loader(&self, loader: Box<dyn VariableLoader>);

    fn register_factory(&self, factory: Box<dyn Factory>);

    fn register_starter(&self, starter: Box<dyn Starter>);
}

/// Typed lookups on top of [`ApplicationContext`].
pub trait ContextExt {
    /// Looks up the single component of type `T` (a concrete type or an advertised `dyn Trait`).
    fn get_component<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, ContainerError>;

    /// Looks up a component by name and downcasts it to `T`.
    fn get_named<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, ContainerError>;

    fn variables(&self) -> VariableHelper<'_, Self>;
}

impl<C: ApplicationContext + ?Sized> ContextExt for C {
    fn get_component<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, ContainerError> {
        let query = TypeQuery::of::<T>();
        let resolved = self.resolve(query)?;
        resolved
            .value
            .downcast::<Arc<T>>()
            .map(|arc| *arc)
            .map_err(|_| {
                ContainerError::InvalidTarget(format!(
                    "component '{}' resolved for {} has a different type",
                    resolved.name, query.type_name
                ))
            })
    }

    fn get_named<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, ContainerError> {
        let component = self.get_component_by_name(name)?;
        let actual = (*component).concrete_type_name();
        AsAny::into_arc_any(component)
            .downcast::<Arc<T>>()
            .map(|arc| *arc)
            .map_err(|_| {
                ContainerError::InvalidTarget(format!(
                    "component '{name}' is {actual}, not {}",
                    std::any::type_name::<T>()
                ))
            })
    }

    fn variables(&self) -> VariableHelper<'_, Self> {
        VariableHelper::new(self)
    }
}
