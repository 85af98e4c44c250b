//! # Mock Components & Testing Guide
//!
//! `MockComponent` is a configurable component for exercising the container without writing a
//! struct per test. Dependencies, capabilities and failures are all set through a fluent
//! builder, and every hook call is appended to a shared [`EventLog`] so tests can assert on
//! ordering afterwards.
//!
//! ## When to use mocks vs real components
//!
//! | Feature | MockComponent | Hand-written component |
//! |---------|---------------|------------------------|
//! | **Setup** | One builder chain | A struct plus trait impls |
//! | **Ordering assertions** | Built in ([`EventLog`]) | Roll your own |
//! | **Fault injection** | `fail_start`, `panic_on_stop`, ... | Manual |
//! | **Typed lookups of itself** | No | Yes |
//!
//! ## Example
//!
//! ```rust
//! use autowire_container::mock::{EventKind, EventLog, MockComponent};
//! use autowire_container::{Container, ContainerConfig, ContextBuilder};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let log = EventLog::new();
//!     // One component per stop batch keeps the stop order fully deterministic.
//!     let running = Container::bootstrap(
//!         ContainerConfig::default().with_stop_batch_size(1),
//!         CancellationToken::new(),
//!         |builder| {
//!             builder.register_component(Arc::new(
//!                 MockComponent::new("web", &log).depends_on("db").with_lifecycle(),
//!             ))?;
//!             builder.register_component(Arc::new(MockComponent::new("db", &log).with_lifecycle()))
//!         },
//!     )
//!     .await
//!     .unwrap();
//!
//!     assert_eq!(running.init_order(), vec!["db", "web"]);
//!     running.shutdown().await;
//!     assert_eq!(log.of(EventKind::Stop), vec!["web", "db"]);
//! }
//! ```
//!
//! Note that `init` runs twice per component (discovery, then the real pass), so
//! [`EventKind::Init`] appears twice per name.

use crate::component::{Background, Component, Lifecycle, Schedule, Scheduled};
use crate::context::{ApplicationContext, ContextExt};
use crate::error::{BoxError, ContainerError};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Which hook an [`Event`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Init,
    Start,
    /// `stop` was entered.
    Stop,
    /// `stop` finished its delay.
    Stopped,
    Run,
    /// `execute` was entered.
    Execute,
    /// `execute` finished its delay.
    Executed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub component: String,
}

/// Shared, append-only record of hook calls.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<Event>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, kind: EventKind, component: &str) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Event {
                kind,
                component: component.to_string(),
            });
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Component names for every event of `kind`, in the order they happened.
    pub fn of(&self, kind: EventKind) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.component)
            .collect()
    }

    pub fn count(&self, kind: EventKind, component: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| e.kind == kind && e.component == component)
            .count()
    }

    /// Index of the first `kind` event for `component`, if any.
    pub fn position(&self, kind: EventKind, component: &str) -> Option<usize> {
        self.events()
            .iter()
            .position(|e| e.kind == kind && e.component == component)
    }
}

type Lookup = Box<dyn Fn(&dyn ApplicationContext) -> Result<(), ContainerError> + Send + Sync>;

/// A component whose behaviour is configured per test.
pub struct MockComponent {
    name: String,
    log: EventLog,
    lookups: Vec<Lookup>,
    lifecycle: bool,
    background: bool,
    schedule: Option<Schedule>,
    init_error: Option<String>,
    start_error: Option<String>,
    start_panic: Option<String>,
    start_delay: Option<Duration>,
    stop_error: Option<String>,
    stop_panic: Option<String>,
    stop_delay: Option<Duration>,
    execute_delay: Option<Duration>,
}

impl MockComponent {
    pub fn new(name: impl Into<String>, log: &EventLog) -> Self {
        Self {
            name: name.into(),
            log: log.clone(),
            lookups: Vec::new(),
            lifecycle: false,
            background: false,
            schedule: None,
            init_error: None,
            start_error: None,
            start_panic: None,
            start_delay: None,
            stop_error: None,
            stop_panic: None,
            stop_delay: None,
            execute_delay: None,
        }
    }

    /// Looks `name` up by name during `init`.
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.lookups.push(Box::new(move |ctx: &dyn ApplicationContext| {
            ctx.get_component_by_name(&name).map(|_| ())
        }));
        self
    }

    /// Looks `T` up by type during `init`.
    pub fn depends_on_type<T: ?Sized + Send + Sync + 'static>(mut self) -> Self {
        self.lookups.push(Box::new(|ctx: &dyn ApplicationContext| {
            ctx.get_component::<T>().map(|_| ())
        }));
        self
    }

    pub fn with_lifecycle(mut self) -> Self {
        self.lifecycle = true;
        self
    }

    pub fn with_background(mut self) -> Self {
        self.background = true;
        self
    }

    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    pub fn fail_init(mut self, reason: impl Into<String>) -> Self {
        self.init_error = Some(reason.into());
        self
    }

    pub fn fail_start(mut self, reason: impl Into<String>) -> Self {
        self.start_error = Some(reason.into());
        self
    }

    pub fn panic_on_start(mut self, message: impl Into<String>) -> Self {
        self.start_panic = Some(message.into());
        self
    }

    pub fn start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = Some(delay);
        self
    }

    pub fn fail_stop(mut self, reason: impl Into<String>) -> Self {
        self.stop_error = Some(reason.into());
        self
    }

    pub fn panic_on_stop(mut self, message: impl Into<String>) -> Self {
        self.stop_panic = Some(message.into());
        self
    }

    /// Makes `stop` sleep for `delay`, ignoring its deadline token.
    pub fn stop_delay(mut self, delay: Duration) -> Self {
        self.stop_delay = Some(delay);
        self
    }

    /// Makes each scheduled execution sleep for `delay`, ignoring its shutdown token.
    pub fn execute_delay(mut self, delay: Duration) -> Self {
        self.execute_delay = Some(delay);
        self
    }
}

impl Component for MockComponent {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&self, ctx: &dyn ApplicationContext) -> Result<(), BoxError> {
        self.log.record(EventKind::Init, &self.name);
        for lookup in &self.lookups {
            lookup(ctx)?;
        }
        match &self.init_error {
            Some(reason) => Err(reason.clone().into()),
            None => Ok(()),
        }
    }

    fn lifecycle(&self) -> Option<&dyn Lifecycle> {
        self.lifecycle.then_some(self as &dyn Lifecycle)
    }

    fn background(&self) -> Option<&dyn Background> {
        self.background.then_some(self as &dyn Background)
    }

    fn scheduled(&self) -> Option<&dyn Scheduled> {
        self.schedule.map(|_| self as &dyn Scheduled)
    }
}

#[async_trait]
impl Lifecycle for MockComponent {
    async fn start(&self, _shutdown: CancellationToken) -> Result<(), BoxError> {
        if let Some(delay) = self.start_delay {
            tokio::time::sleep(delay).await;
        }
        self.log.record(EventKind::Start, &self.name);
        if let Some(message) = &self.start_panic {
            panic!("{message}");
        }
        match &self.start_error {
            Some(reason) => Err(reason.clone().into()),
            None => Ok(()),
        }
    }

    async fn stop(&self, _deadline: CancellationToken) -> Result<(), BoxError> {
        self.log.record(EventKind::Stop, &self.name);
        if let Some(delay) = self.stop_delay {
            tokio::time::sleep(delay).await;
        }
        self.log.record(EventKind::Stopped, &self.name);
        if let Some(message) = &self.stop_panic {
            panic!("{message}");
        }
        match &self.stop_error {
            Some(reason) => Err(reason.clone().into()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Background for MockComponent {
    async fn run(&self, shutdown: CancellationToken) {
        self.log.record(EventKind::Run, &self.name);
        shutdown.cancelled().await;
    }
}

#[async_trait]
impl Scheduled for MockComponent {
    fn schedule(&self) -> Schedule {
        self.schedule
            .unwrap_or_else(|| Schedule::every(Duration::from_secs(1)))
    }

    async fn execute(&self, _shutdown: CancellationToken) {
        self.log.record(EventKind::Execute, &self.name);
        if let Some(delay) = self.execute_delay {
            tokio::time::sleep(delay).await;
        }
        self.log.record(EventKind::Executed, &self.name);
    }
}
