//! # Lifecycle Manager
//!
//! Drives the running phase of the container once every component is initialized.
//!
//! ## Start
//!
//! Components exposing [`Lifecycle`](crate::Lifecycle) are launched in initialization order,
//! each on its own task, so they start in parallel. The manager then waits for every launch.
//! Failures are aggregated instead of failing fast: an `Err` or a panic from one component
//! becomes a [`ComponentFailure`] and the others still get their chance. Once a component's
//! `start` returns, its background body and its schedule (if any) are spawned on a
//! [`TaskTracker`] so shutdown can wait for them.
//!
//! ## Stop
//!
//! Components that reached [`LifecycleState::Running`] are stopped in the exact reverse of the
//! order they were launched in, in batches of at most `stop_batch_size`. Each batch is a
//! barrier: every `stop` in it has returned (or panicked, or timed out) before the next,
//! earlier-started batch begins. Stop failures are logged, never returned.
//!
//! ```text
//! start order:  a b c d e f g
//! stop batches: [g f e d c] [b a]      (batch size 5)
//! ```

use crate::component::Component;
use crate::error::{panic_message, BoxError, ComponentFailure, ContainerError};
use crate::metrics::MetricsCollector;
use crate::registry::ComponentRegistry;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

/// Where a component is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Registered,
    Initialized,
    Starting,
    Running,
    Stopping,
    Stopped,
    StartFailed,
    StopFailed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LifecycleState::Registered => "registered",
            LifecycleState::Initialized => "initialized",
            LifecycleState::Starting => "starting",
            LifecycleState::Running => "running",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Stopped => "stopped",
            LifecycleState::StartFailed => "start-failed",
            LifecycleState::StopFailed => "stop-failed",
        };
        f.write_str(label)
    }
}

type HookOutcome = (Result<(), BoxError>, Duration);

pub struct LifecycleManager {
    registry: Arc<ComponentRegistry>,
    metrics: Arc<MetricsCollector>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    states: Mutex<HashMap<String, LifecycleState>>,
    /// Launch order of lifecycle components; stop walks it backwards.
    started: Mutex<Vec<String>>,
    stop_batch_size: usize,
    stop_timeout: Option<Duration>,
}

impl LifecycleManager {
    pub fn new(
        registry: Arc<ComponentRegistry>,
        metrics: Arc<MetricsCollector>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            registry,
            metrics,
            shutdown,
            tracker: TaskTracker::new(),
            states: Mutex::new(HashMap::new()),
            started: Mutex::new(Vec::new()),
            stop_batch_size: crate::config::DEFAULT_STOP_BATCH_SIZE,
            stop_timeout: None,
        }
    }

    /// Width of each stop batch; values below one are treated as one.
    pub fn with_stop_batch_size(mut self, size: usize) -> Self {
        self.stop_batch_size = size.max(1);
        self
    }

    /// Upper bound for each stop batch and for the final wait on background tasks.
    pub fn with_stop_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// The shared cancellation signal handed to every start, background and scheduled task.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// The state of `name`, or `None` if no such component is registered.
    pub fn state(&self, name: &str) -> Option<LifecycleState> {
        let known = self
            .states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .copied();
        match known {
            Some(state) => Some(state),
            None if self.registry.has(name) => Some(LifecycleState::Registered),
            None => None,
        }
    }

    /// The order lifecycle components were launched in.
    pub fn start_order(&self) -> Vec<String> {
        self.started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Starts every component in `init_order` and waits for all launches to finish.
    pub async fn start_all(&self, init_order: &[String]) -> Result<(), ContainerError> {
        info!(components = init_order.len(), "Starting components");

        let mut launches: Vec<(String, JoinHandle<HookOutcome>)> = Vec::new();
        for name in init_order {
            let component = self.registry.get(name)?;
            self.set_state(name, LifecycleState::Initialized);

            if component.lifecycle().is_none() {
                spawn_workers(&self.tracker, &self.shutdown, name, &component);
                continue;
            }

            debug!(component = %name, "Launching start");
            self.set_state(name, LifecycleState::Starting);
            self.started
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(name.clone());

            let tracker = self.tracker.clone();
            let shutdown = self.shutdown.clone();
            let task_name = name.clone();
            let handle = tokio::spawn(async move {
                let start = Instant::now();
                let result = match component.lifecycle() {
                    Some(lifecycle) => lifecycle.start(shutdown.clone()).await,
                    None => Ok(()),
                };
                let elapsed = start.elapsed();
                if result.is_ok() {
                    spawn_workers(&tracker, &shutdown, &task_name, &component);
                }
                (result, elapsed)
            });
            launches.push((name.clone(), handle));
        }

        let mut failures = Vec::new();
        for (name, handle) in launches {
            match handle.await {
                Ok((Ok(()), elapsed)) => {
                    self.metrics.record_start_duration(&name, elapsed);
                    self.set_state(&name, LifecycleState::Running);
                    info!(
                        component = %name,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Component started"
                    );
                }
                Ok((Err(e), _)) => {
                    self.set_state(&name, LifecycleState::StartFailed);
                    error!(component = %name, error = %e, "Component failed to start");
                    failures.push(ComponentFailure {
                        name,
                        reason: e.to_string(),
                        panicked: false,
                    });
                }
                Err(join) => {
                    self.set_state(&name, LifecycleState::StartFailed);
                    let panicked = join.is_panic();
                    let reason = if panicked {
                        panic_message(join.into_panic())
                    } else {
                        join.to_string()
                    };
                    error!(component = %name, error = %reason, panicked, "Component failed to start");
                    failures.push(ComponentFailure {
                        name,
                        reason,
                        panicked,
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ContainerError::StartFailed(failures))
        }
    }

    /// Stops every running component, newest first, in barrier-separated batches.
    pub async fn stop_all(&self) {
        let order: Vec<String> = self
            .start_order()
            .into_iter()
            .rev()
            .filter(|name| self.state(name) == Some(LifecycleState::Running))
            .collect();
        info!(
            components = order.len(),
            batch_size = self.stop_batch_size,
            "Stopping components"
        );

        for (index, batch) in order.chunks(self.stop_batch_size).enumerate() {
            debug!(batch = index, components = ?batch, "Stopping batch");
            let mut stops = Vec::with_capacity(batch.len());
            for name in batch {
                let component = match self.registry.get(name) {
                    Ok(component) => component,
                    Err(e) => {
                        error!(component = %name, error = %e, "Component vanished before stop");
                        continue;
                    }
                };
                self.set_state(name, LifecycleState::Stopping);

                let deadline = CancellationToken::new();
                let task_deadline = deadline.clone();
                let handle = tokio::spawn(async move {
                    let start = Instant::now();
                    let result = match component.lifecycle() {
                        Some(lifecycle) => lifecycle.stop(task_deadline).await,
                        None => Ok(()),
                    };
                    (result, start.elapsed())
                });
                stops.push((name.clone(), deadline, handle));
            }

            let batch_deadline = self
                .stop_timeout
                .map(|timeout| tokio::time::Instant::now() + timeout);
            for (name, deadline, handle) in stops {
                self.await_stop(&name, deadline, handle, batch_deadline)
                    .await;
            }
        }
        info!("All components stopped");
    }

    async fn await_stop(
        &self,
        name: &str,
        deadline: CancellationToken,
        mut handle: JoinHandle<HookOutcome>,
        batch_deadline: Option<tokio::time::Instant>,
    ) {
        let joined = match batch_deadline {
            Some(at) => match tokio::time::timeout_at(at, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    deadline.cancel();
                    self.set_state(name, LifecycleState::StopFailed);
                    warn!(component = %name, "Stop timed out, detaching task");
                    return;
                }
            },
            None => handle.await,
        };

        match joined {
            Ok((Ok(()), elapsed)) => {
                self.metrics.record_stop_duration(name, elapsed);
                self.set_state(name, LifecycleState::Stopped);
                info!(
                    component = %name,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Component stopped"
                );
            }
            Ok((Err(e), elapsed)) => {
                self.metrics.record_stop_duration(name, elapsed);
                self.set_state(name, LifecycleState::StopFailed);
                error!(component = %name, error = %e, "Component failed to stop");
            }
            Err(join) if join.is_panic() => {
                self.set_state(name, LifecycleState::StopFailed);
                let reason = panic_message(join.into_panic());
                error!(component = %name, error = %reason, "Panic in component shutdown");
            }
            Err(join) => {
                self.set_state(name, LifecycleState::StopFailed);
                error!(component = %name, error = %join, "Stop task cancelled");
            }
        }
    }

    /// Cancels the shared signal, stops every running component and waits for background and
    /// scheduled tasks to drain.
    pub async fn shutdown(&self) {
        info!("Shutting down components");
        self.shutdown.cancel();
        self.stop_all().await;

        self.tracker.close();
        match self.stop_timeout {
            Some(timeout) => {
                if tokio::time::timeout(timeout, self.tracker.wait())
                    .await
                    .is_err()
                {
                    warn!(
                        remaining = self.tracker.len(),
                        "Background tasks still running after stop timeout"
                    );
                }
            }
            None => self.tracker.wait().await,
        }
        info!("Shutdown complete");
    }

    fn set_state(&self, name: &str, state: LifecycleState) {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), state);
    }
}

/// Spawns the background body and the schedule loop of `component`, when it has them.
fn spawn_workers(
    tracker: &TaskTracker,
    shutdown: &CancellationToken,
    name: &str,
    component: &Arc<dyn Component>,
) {
    if component.background().is_some() {
        debug!(component = name, "Launching background task");
        let component = Arc::clone(component);
        let token = shutdown.clone();
        let task_name = name.to_string();
        supervise(tracker, name, "background", async move {
            if let Some(background) = component.background() {
                info!(component = %task_name, "Background component running");
                background.run(token).await;
                info!(component = %task_name, "Background component completed");
            }
        });
    }

    if let Some(scheduled) = component.scheduled() {
        let schedule = scheduled.schedule();
        debug!(
            component = name,
            interval_ms = schedule.interval.as_millis() as u64,
            "Launching scheduler"
        );
        let component = Arc::clone(component);
        let token = shutdown.clone();
        let task_tracker = tracker.clone();
        let task_name = name.to_string();
        supervise(tracker, name, "scheduler", async move {
            run_schedule(task_tracker, token, task_name, component).await;
        });
    }
}

async fn run_schedule(
    tracker: TaskTracker,
    shutdown: CancellationToken,
    name: String,
    component: Arc<dyn Component>,
) {
    let Some(schedule) = component.scheduled().map(|s| s.schedule()) else {
        return;
    };

    if schedule.run_on_startup {
        debug!(component = %name, "Executing scheduled component on startup");
        execute_once(&component, shutdown.clone()).await;
    }

    if !schedule.initial_delay.is_zero() {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep(schedule.initial_delay) => {}
        }
    }

    if schedule.interval.is_zero() {
        warn!(component = %name, "Scheduled component has a zero interval, not repeating");
        return;
    }

    let mut ticker = tokio::time::interval_at(
        tokio::time::Instant::now() + schedule.interval,
        schedule.interval,
    );
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(
        component = %name,
        interval_ms = schedule.interval.as_millis() as u64,
        "Scheduled component running"
    );

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!(component = %name, "Scheduled component stopping");
                return;
            }
            _ = ticker.tick() => {
                debug!(component = %name, "Executing scheduled component");
                let component = Arc::clone(&component);
                let token = shutdown.clone();
                // Executions are independent; a slow one does not hold back the next tick.
                supervise(&tracker, &name, "scheduled execution", async move {
                    execute_once(&component, token).await;
                });
            }
        }
    }
}

async fn execute_once(component: &Arc<dyn Component>, shutdown: CancellationToken) {
    if let Some(scheduled) = component.scheduled() {
        scheduled.execute(shutdown).await;
    }
}

/// Runs `body` on `tracker`, logging a panic instead of letting it vanish with the handle.
fn supervise<F>(tracker: &TaskTracker, name: &str, what: &'static str, body: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let inner = tokio::spawn(body);
    let name = name.to_string();
    tracker.spawn(async move {
        if let Err(join) = inner.await {
            if join.is_panic() {
                let reason = panic_message(join.into_panic());
                error!(component = %name, task = what, error = %reason, "Panic in component task");
            }
        }
    });
}
