//! # Autowire Container
//!
//! An in-process composition root: it holds named **components** and configuration
//! **variables**, works out which components depend on which *without being told*, initializes
//! them in dependency order and drives their start/stop lifecycle.
//!
//! ## Why discovery instead of declaration?
//!
//! Most dependency-injection containers ask every service to list what it needs. This one
//! watches instead. Each component's `init` is first run against a tracking context that
//! records every lookup it performs. The recorded lookups *are* the dependency graph:
//!
//! - **No duplication**: the lookup that wires the dependency is also its declaration
//! - **No drift**: adding a lookup to `init` adds the edge automatically
//! - **Late registration**: components contributed by starters take part like any other
//!
//! The price is that `init` runs twice and must be cheap and idempotent.
//!
//! ## Architecture Overview
//!
//! 1. **Storage** ([`ComponentRegistry`], [`VariableStore`], [`MetricsCollector`]): thread-safe
//!    maps, every accessor returns copies
//! 2. **Discovery** ([`DependencyResolver`]): tracked `init` runs plus incremental cycle checks
//! 3. **Initialization** ([`ComponentInitializer`]): depth-first, dependencies first, with its own
//!    cycle check
//! 4. **Lifecycle** ([`LifecycleManager`]): concurrent start, background and scheduled tasks,
//!    reverse batched stop
//! 5. **Façade** ([`Container`]): the bootstrap pipeline and the [`ContextBuilder`] surface
//!
//! ## Quick Start
//!
//! ```rust
//! use autowire_container::{
//!     ApplicationContext, BoxError, Component, Container, ContainerConfig, ContextExt,
//! };
//! use std::sync::{Arc, OnceLock};
//! use tokio_util::sync::CancellationToken;
//!
//! struct Database;
//! impl Component for Database {
//!     fn name(&self) -> &str { "database" }
//!     fn init(&self, _ctx: &dyn ApplicationContext) -> Result<(), BoxError> { Ok(()) }
//! }
//!
//! #[derive(Default)]
//! struct Repository { db: OnceLock<Arc<Database>> }
//! impl Component for Repository {
//!     fn name(&self) -> &str { "repository" }
//!     fn init(&self, ctx: &dyn ApplicationContext) -> Result<(), BoxError> {
//!         let _ = self.db.set(ctx.get_component::<Database>()?);
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let running = Container::bootstrap(
//!         ContainerConfig::default(),
//!         CancellationToken::new(),
//!         |builder| {
//!             // Registration order does not matter.
//!             builder.register_component(Arc::new(Repository::default()))?;
//!             builder.register_component(Arc::new(Database))
//!         },
//!     )
//!     .await
//!     .unwrap();
//!
//!     assert_eq!(running.init_order(), vec!["database", "repository"]);
//!     running.shutdown().await;
//! }
//! ```
//!
//! ## Testing
//!
//! See [`mock`] for a configurable component that records every hook call.

pub mod component;
pub mod config;
pub mod container;
pub mod context;
pub mod dependency;
pub mod error;
pub mod factory;
pub mod initializer;
pub mod lifecycle;
pub mod loader;
pub mod metrics;
pub mod mock;
pub mod registry;
pub mod starter;
pub mod variable;

// Re-export core types for convenience
pub use component::{
    AsAny, Background, Component, ComponentBase, Interfaces, Lifecycle, Schedule, Scheduled,
};
pub use config::ContainerConfig;
pub use container::{Container, RunningContainer};
pub use context::{ApplicationContext, ContextBuilder, ContextExt, Resolved, TypeQuery};
pub use dependency::{DependencyResolver, TrackingContext};
pub use error::{BoxError, ComponentFailure, ContainerError};
pub use factory::{ComponentFactory, Factory, FactoryFn};
pub use initializer::ComponentInitializer;
pub use lifecycle::{LifecycleManager, LifecycleState};
pub use loader::{StaticVariables, VariableLoader};
pub use metrics::{ComponentMetrics, MetricsCollector};
pub use registry::ComponentRegistry;
pub use starter::{CompositeStarter, ConditionalStarter, Starter, StarterFn};
pub use variable::{Value, VariableHelper, VariableStore};
