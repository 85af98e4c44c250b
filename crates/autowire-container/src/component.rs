//! # Component Contract
//!
//! The `Component` trait defines the contract that every managed service must implement to be
//! registered in the container. A component has a unique name and an initializer; everything
//! else is an optional capability the container discovers at runtime.
//!
//! # Architecture Note
//! The container never asks a component to *declare* its dependencies. Instead it runs `init`
//! against a tracking context and records every component the initializer looks up. That means
//! `init` runs twice (once for discovery, once for real) and must tolerate it: set state through
//! interior mutability (`OnceLock`, `Mutex`, …) and keep side effects cheap.
//!
//! # Capabilities
//! Rust has no runtime interface checks, so optional capabilities are exposed through accessor
//! methods with `None` defaults:
//! - [`Component::lifecycle`] → [`Lifecycle`] (`start` / `stop`)
//! - [`Component::background`] → [`Background`] (long-running `run`)
//! - [`Component::scheduled`] → [`Scheduled`] (periodic `execute`)
//!
//! A component opts in by returning `Some(self)`.

use crate::context::ApplicationContext;
use crate::error::BoxError;
use async_trait::async_trait;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Type-erasure helpers every component gets for free.
///
/// Blanket-implemented for all sized `Send + Sync + 'static` types; it exists so that a
/// `dyn Component` can still report its concrete type and hand out an owned `Arc` of it.
pub trait AsAny: Any + Send + Sync {
    /// Boxes `Arc<Self>` so it can be downcast back to the concrete `Arc<T>`.
    fn into_arc_any(self: Arc<Self>) -> Box<dyn Any + Send + Sync>;

    fn concrete_type_id(&self) -> TypeId;

    fn concrete_type_name(&self) -> &'static str;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn into_arc_any(self: Arc<Self>) -> Box<dyn Any + Send + Sync> {
        Box::new(self)
    }

    fn concrete_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn concrete_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// A named unit of application behaviour managed by the container.
///
/// # Example
///
/// ```rust
/// use autowire_container::{ApplicationContext, BoxError, Component, ContextExt};
/// use std::sync::{Arc, OnceLock};
///
/// struct Database;
/// impl Component for Database {
///     fn name(&self) -> &str { "database" }
///     fn init(&self, _ctx: &dyn ApplicationContext) -> Result<(), BoxError> { Ok(()) }
/// }
///
/// #[derive(Default)]
/// struct Repository { db: OnceLock<Arc<Database>> }
/// impl Component for Repository {
///     fn name(&self) -> &str { "repository" }
///     fn init(&self, ctx: &dyn ApplicationContext) -> Result<(), BoxError> {
///         // Looking up `Database` is what makes it a dependency.
///         let db = ctx.get_component::<Database>()?;
///         let _ = self.db.set(db);
///         Ok(())
///     }
/// }
/// ```
pub trait Component: AsAny {
    /// The unique registry key for this component. Must not be empty.
    fn name(&self) -> &str;

    /// Resolves dependencies and prepares internal state.
    ///
    /// Called once against a tracking context during discovery (errors ignored) and once for
    /// real after every discovered dependency has been initialized.
    fn init(&self, ctx: &dyn ApplicationContext) -> Result<(), BoxError>;

    fn lifecycle(&self) -> Option<&dyn Lifecycle> {
        None
    }

    fn background(&self) -> Option<&dyn Background> {
        None
    }

    fn scheduled(&self) -> Option<&dyn Scheduled> {
        None
    }

    /// Trait-object views this component can be resolved as, besides its concrete type.
    ///
    /// ```rust,ignore
    /// fn interfaces(self: Arc<Self>) -> Interfaces {
    ///     Interfaces::new().with::<dyn Greeter>(self)
    /// }
    /// ```
    fn interfaces(self: Arc<Self>) -> Interfaces {
        Interfaces::default()
    }
}

/// Start/stop hooks driven by the lifecycle manager.
#[async_trait]
pub trait Lifecycle: Send + Sync {
    /// Called once after every component has been initialized.
    ///
    /// `shutdown` is the container-wide cancellation signal; it fires when the application is
    /// asked to exit.
    async fn start(&self, shutdown: CancellationToken) -> Result<(), BoxError>;

    /// Called once during shutdown, in reverse start order.
    ///
    /// `deadline` is cancelled if the container's stop timeout elapses before this returns.
    async fn stop(&self, deadline: CancellationToken) -> Result<(), BoxError>;
}

/// A component with a long-running body, launched right after its `start` returns.
#[async_trait]
pub trait Background: Send + Sync {
    /// Runs until `shutdown` is cancelled or the work is done.
    async fn run(&self, shutdown: CancellationToken);
}

/// A component executed on a fixed interval.
#[async_trait]
pub trait Scheduled: Send + Sync {
    fn schedule(&self) -> Schedule;

    async fn execute(&self, shutdown: CancellationToken);
}

/// Timing for a [`Scheduled`] component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub interval: Duration,
    pub initial_delay: Duration,
    pub run_on_startup: bool,
}

impl Schedule {
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            initial_delay: Duration::ZERO,
            run_on_startup: false,
        }
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn run_on_startup(mut self) -> Self {
        self.run_on_startup = true;
        self
    }
}

/// Trait-object views advertised by a component.
///
/// Keyed by the `TypeId` of the unsized trait (`dyn Greeter`), each entry holds an `Arc<dyn
/// Greeter>` pointing at the component.
#[derive(Default)]
pub struct Interfaces {
    views: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Interfaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertises `value` under the interface `I`.
    pub fn with<I: ?Sized + Send + Sync + 'static>(mut self, value: Arc<I>) -> Self {
        self.views.insert(TypeId::of::<I>(), Box::new(value));
        self
    }

    pub fn contains(&self, type_id: TypeId) -> bool {
        self.views.contains_key(&type_id)
    }

    /// Removes the view for `type_id`; the box holds an `Arc<I>`.
    pub fn take(&mut self, type_id: TypeId) -> Option<Box<dyn Any + Send + Sync>> {
        self.views.remove(&type_id)
    }
}

/// Minimal component holding only a name, for components with nothing to initialize.
#[derive(Debug, Clone)]
pub struct ComponentBase {
    name: String,
}

impl ComponentBase {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Component for ComponentBase {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&self, _ctx: &dyn ApplicationContext) -> Result<(), BoxError> {
        Ok(())
    }
}
