//! # Container
//!
//! The façade tying the registry, variable store, metrics, resolver, initializer and lifecycle
//! manager together.
//!
//! ## Bootstrap pipeline
//!
//! 1. the caller's registration block
//! 2. factories
//! 3. variable loaders
//! 4. starters (sequential, each gated by `should_start`)
//! 5. dependency discovery
//! 6. initialization in dependency order
//! 7. concurrent start
//!
//! Any failure up to step 6 aborts the bootstrap before anything runs. A failure in step 7
//! stops whatever did start before the error is returned, so no half-started container is ever
//! handed back.

use crate::component::Component;
use crate::config::ContainerConfig;
use crate::context::{ApplicationContext, ContextBuilder, Resolved, TypeQuery};
use crate::dependency::DependencyResolver;
use crate::error::ContainerError;
use crate::factory::Factory;
use crate::initializer::ComponentInitializer;
use crate::lifecycle::{LifecycleManager, LifecycleState};
use crate::loader::VariableLoader;
use crate::metrics::{ComponentMetrics, MetricsCollector};
use crate::registry::ComponentRegistry;
use crate::starter::Starter;
use crate::variable::{Value, VariableStore};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

pub struct Container {
    registry: Arc<ComponentRegistry>,
    variables: Arc<VariableStore>,
    metrics: Arc<MetricsCollector>,
    loaders: Mutex<Vec<Box<dyn VariableLoader>>>,
    factories: Mutex<Vec<Box<dyn Factory>>>,
    starters: Mutex<Vec<Box<dyn Starter>>>,
    stop_batch_size: usize,
    stop_timeout: Option<Duration>,
    started: AtomicBool,
}

impl Default for Container {
    fn default() -> Self {
        Self::new(ContainerConfig::default())
    }
}

impl Container {
    pub fn new(config: ContainerConfig) -> Self {
        Self {
            registry: Arc::new(ComponentRegistry::new()),
            variables: Arc::new(VariableStore::new()),
            metrics: Arc::new(MetricsCollector::new(config.enable_metrics)),
            loaders: Mutex::new(config.variable_loaders),
            factories: Mutex::new(Vec::new()),
            starters: Mutex::new(config.starters),
            stop_batch_size: config.stop_batch_size.max(1),
            stop_timeout: config.stop_timeout,
            started: AtomicBool::new(false),
        }
    }

    /// Builds a container, runs `block` against it and starts it.
    ///
    /// ```rust,no_run
    /// use autowire_container::{ComponentBase, Container, ContainerConfig, ContextBuilder};
    /// use std::sync::Arc;
    /// use tokio_util::sync::CancellationToken;
    ///
    /// # async fn demo() -> Result<(), autowire_container::ContainerError> {
    /// let shutdown = CancellationToken::new();
    /// let running = Container::bootstrap(ContainerConfig::default(), shutdown, |builder| {
    ///     builder.register_component(Arc::new(ComponentBase::new("database")))
    /// })
    /// .await?;
    /// running.shutdown().await;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn bootstrap<F>(
        config: ContainerConfig,
        shutdown: CancellationToken,
        block: F,
    ) -> Result<RunningContainer, ContainerError>
    where
        F: FnOnce(&dyn ContextBuilder) -> Result<(), ContainerError>,
    {
        let container = Arc::new(Container::new(config));
        if let Err(e) = block(&*container) {
            error!(error = %e, "Registration failed");
            return Err(e);
        }
        container.start(shutdown).await
    }

    #[cfg(test)]
    pub(crate) fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    /// Registers a component by value.
    pub fn register(&self, component: impl Component) -> Result<(), ContainerError> {
        self.registry.register(Arc::new(component))
    }

    /// Runs the pipeline from factories through start. Can only be called once.
    #[instrument(skip_all)]
    pub async fn start(
        self: &Arc<Self>,
        shutdown: CancellationToken,
    ) -> Result<RunningContainer, ContainerError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ContainerError::AlreadyStarted);
        }
        let begin = Instant::now();
        info!("Starting container");

        let (init_order, dependencies) = match self.prepare() {
            Ok(prepared) => prepared,
            Err(e) => {
                match e.cycle() {
                    Some(cycle) => error!(cycle = ?cycle, "Container startup failed: {e}"),
                    None => error!(error = %e, "Container startup failed"),
                }
                return Err(e);
            }
        };

        let lifecycle = LifecycleManager::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.metrics),
            shutdown.child_token(),
        )
        .with_stop_batch_size(self.stop_batch_size)
        .with_stop_timeout(self.stop_timeout);

        if let Err(e) = lifecycle.start_all(&init_order).await {
            error!(error = %e, "Startup failed, stopping components that did start");
            lifecycle.shutdown().await;
            return Err(e);
        }

        info!(
            components = init_order.len(),
            elapsed_ms = begin.elapsed().as_millis() as u64,
            "Container started"
        );
        Ok(RunningContainer {
            container: Arc::clone(self),
            lifecycle,
            init_order,
            dependencies,
            stopped: AtomicBool::new(false),
        })
    }

    /// Everything up to and including initialization.
    fn prepare(
        &self,
    ) -> Result<(Vec<String>, HashMap<String, BTreeSet<String>>), ContainerError> {
        self.run_factories()?;
        self.run_loaders()?;
        self.run_starters()?;

        let mut resolver =
            DependencyResolver::new(Arc::clone(&self.registry), Arc::clone(&self.metrics));
        resolver.discover_dependencies(self)?;

        let mut initializer =
            ComponentInitializer::new(Arc::clone(&self.registry), Arc::clone(&self.metrics));
        initializer.initialize_all(&resolver, self)?;

        let order = initializer.init_order();
        debug!(order = ?order, "Initialization order");
        Ok((order, resolver.graph()))
    }

    fn run_factories(&self) -> Result<(), ContainerError> {
        // A factory may register further factories; keep draining until none are left.
        loop {
            let batch = std::mem::take(&mut *lock(&self.factories));
            if batch.is_empty() {
                return Ok(());
            }
            for factory in batch {
                factory.create(self).map_err(ContainerError::FactoryFailed)?;
            }
        }
    }

    fn run_loaders(&self) -> Result<(), ContainerError> {
        loop {
            let batch = std::mem::take(&mut *lock(&self.loaders));
            if batch.is_empty() {
                return Ok(());
            }
            for loader in batch {
                loader
                    .load(self)
                    .map_err(ContainerError::VariableLoaderFailed)?;
            }
            debug!(variables = self.variables.len(), "Variables loaded");
        }
    }

    fn run_starters(&self) -> Result<(), ContainerError> {
        loop {
            let batch = std::mem::take(&mut *lock(&self.starters));
            if batch.is_empty() {
                return Ok(());
            }
            for starter in batch {
                let name = starter.name().to_string();
                if !starter.should_start(self) {
                    debug!(starter = %name, "Skipping starter, condition not met");
                    continue;
                }
                info!(starter = %name, "Applying starter");
                starter
                    .start(self)
                    .map_err(|source| ContainerError::StarterFailed { name, source })?;
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ApplicationContext for Container {
    fn resolve(&self, query: TypeQuery) -> Result<Resolved, ContainerError> {
        self.registry.find_by_type(query)
    }

    fn get_component_by_name(&self, name: &str) -> Result<Arc<dyn Component>, ContainerError> {
        self.registry.get(name)
    }

    fn has_component(&self, name: &str) -> bool {
        self.registry.has(name)
    }

    fn get_component_names(&self) -> Vec<String> {
        self.registry.get_names()
    }

    fn get_variable(&self, name: &str) -> String {
        self.variables.get_string(name)
    }

    fn get_variable_raw(&self, name: &str) -> Option<Value> {
        self.variables.get(name)
    }

    fn get_variables(&self) -> HashMap<String, Value> {
        self.variables.snapshot()
    }

    fn get_metrics(&self) -> HashMap<String, ComponentMetrics> {
        self.metrics.snapshot()
    }
}

impl ContextBuilder for Container {
    fn as_context(&self) -> &dyn ApplicationContext {
        self
    }

    fn register_component(&self, component: Arc<dyn Component>) -> Result<(), ContainerError> {
        self.registry.register(component)
    }

    fn register_variable(&self, name: &str, value: Value) {
        self.variables.register(name, value);
    }

    fn register_variable_loader(&self, loader: Box<dyn VariableLoader>) {
        lock(&self.loaders).push(loader);
    }

    fn register_factory(&self, factory: Box<dyn Factory>) {
        lock(&self.factories).push(factory);
    }

    fn register_starter(&self, starter: Box<dyn Starter>) {
        lock(&self.starters).push(starter);
    }
}

/// A started container. Dropping it does not stop anything; call [`RunningContainer::shutdown`].
pub struct RunningContainer {
    container: Arc<Container>,
    lifecycle: LifecycleManager,
    init_order: Vec<String>,
    dependencies: HashMap<String, BTreeSet<String>>,
    stopped: AtomicBool,
}

impl RunningContainer {
    /// Lookup access to the running components and variables.
    pub fn context(&self) -> &Container {
        &self.container
    }

    pub fn init_order(&self) -> Vec<String> {
        self.init_order.clone()
    }

    pub fn start_order(&self) -> Vec<String> {
        self.lifecycle.start_order()
    }

    /// The discovered dependencies of `name`.
    pub fn dependencies(&self, name: &str) -> BTreeSet<String> {
        self.dependencies.get(name).cloned().unwrap_or_default()
    }

    pub fn state(&self, name: &str) -> Option<LifecycleState> {
        self.lifecycle.state(name)
    }

    pub fn metrics(&self) -> HashMap<String, ComponentMetrics> {
        self.container.metrics.snapshot()
    }

    /// The token running components observe; cancelled on shutdown.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.lifecycle.shutdown_token()
    }

    /// Stops everything. Calling it again is a no-op.
    #[instrument(skip_all)]
    pub async fn shutdown(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            debug!("Shutdown already performed");
            return;
        }
        self.lifecycle.shutdown().await;

        if self.container.metrics.is_enabled() {
            match self.container.metrics.to_json() {
                Ok(json) => info!(metrics = %json, "Component metrics"),
                Err(e) => warn!(error = %e, "Failed to render component metrics"),
            }
        }
    }
}
