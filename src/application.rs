//! # Application Bootstrapping
//!
//! [`Application`] is the outermost layer: it wires the process into the container.
//!
//! ## Responsibilities
//!
//! 1. **Configuration sources** - registers the properties and environment loaders selected in
//!    [`ApplicationConfig`], ahead of any loader the registration block adds
//! 2. **Bootstrap** - runs the registration block and the container pipeline
//! 3. **Signals** - Ctrl-C or SIGTERM cancels the shared shutdown token
//! 4. **Shutdown** - [`Application::run`] parks until the token fires, then stops everything
//!
//! ## Variable precedence
//!
//! Loaders run in registration order and later values win:
//!
//! 1. loaders from the [`ContainerConfig`]
//! 2. properties files, in the order given
//! 3. the environment (`AUTOWIRE_*` by default)
//! 4. loaders registered inside the block
//!
//! ## Example
//!
//! ```rust,no_run
//! use autowire_boot::{setup_tracing, Application, ApplicationConfig};
//! use autowire_container::ComponentBase;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), autowire_boot::BootError> {
//!     setup_tracing();
//!
//!     let config = ApplicationConfig::default().with_properties_file("application.properties");
//!     let app = Application::new(config, |builder| {
//!         builder.register_component(Arc::new(ComponentBase::new("database")))
//!     })
//!     .await?;
//!
//!     // Blocks until Ctrl-C, then stops all components.
//!     app.run().await;
//!     Ok(())
//! }
//! ```

use crate::error::BootError;
use crate::loaders::{EnvVariableLoader, PropertiesVariableLoader, DEFAULT_ENV_PREFIX};
use autowire_container::{
    Container, ContainerConfig, ContainerError, ContextBuilder, RunningContainer,
};
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Selects the configuration sources and container settings for an [`Application`].
#[derive(Debug)]
pub struct ApplicationConfig {
    container: ContainerConfig,
    env_prefix: Option<String>,
    properties_files: Vec<PathBuf>,
    handle_signals: bool,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            container: ContainerConfig::default(),
            env_prefix: Some(DEFAULT_ENV_PREFIX.to_string()),
            properties_files: Vec::new(),
            handle_signals: true,
        }
    }
}

impl ApplicationConfig {
    pub fn with_container(mut self, container: ContainerConfig) -> Self {
        self.container = container;
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Skips the environment loader entirely.
    pub fn without_env(mut self) -> Self {
        self.env_prefix = None;
        self
    }

    /// Adds a properties file. Files are loaded in the order added; missing ones are skipped.
    pub fn with_properties_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.properties_files.push(path.into());
        self
    }

    /// Leaves Ctrl-C and SIGTERM alone; only [`Application::shutdown_token`] stops the app.
    pub fn without_signal_handlers(mut self) -> Self {
        self.handle_signals = false;
        self
    }

    fn into_parts(self) -> (ContainerConfig, bool) {
        let mut container = self.container;
        for path in self.properties_files {
            container = container.with_variable_loader(PropertiesVariableLoader::new(path));
        }
        if let Some(prefix) = self.env_prefix {
            container = container.with_variable_loader(EnvVariableLoader::new(prefix));
        }
        (container, self.handle_signals)
    }
}

/// A bootstrapped container bound to the process lifetime.
pub struct Application {
    running: RunningContainer,
    shutdown: CancellationToken,
    signals: Mutex<Option<JoinHandle<()>>>,
}

impl Application {
    /// Builds and starts the container.
    ///
    /// On failure nothing is left running and the signal listener is torn down again.
    #[instrument(skip_all)]
    pub async fn new<F>(config: ApplicationConfig, block: F) -> Result<Self, BootError>
    where
        F: FnOnce(&dyn ContextBuilder) -> Result<(), ContainerError>,
    {
        let (container_config, handle_signals) = config.into_parts();
        let shutdown = CancellationToken::new();
        let signals = if handle_signals {
            Some(spawn_signal_listener(shutdown.clone())?)
        } else {
            None
        };

        info!("Starting application");
        match Container::bootstrap(container_config, shutdown.clone(), block).await {
            Ok(running) => Ok(Self {
                running,
                shutdown,
                signals: Mutex::new(signals),
            }),
            Err(e) => {
                shutdown.cancel();
                if let Some(listener) = signals {
                    listener.abort();
                }
                Err(e.into())
            }
        }
    }

    /// Lookup access to components and variables.
    pub fn container(&self) -> &Container {
        self.running.context()
    }

    pub fn running(&self) -> &RunningContainer {
        &self.running
    }

    /// Cancelling this token makes [`run`](Self::run) return.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Parks until a shutdown signal arrives, then stops the container.
    pub async fn run(&self) {
        self.shutdown.cancelled().await;
        info!("Shutdown signal received");
        self.shutdown().await;
    }

    /// Stops the container. Safe to call more than once.
    #[instrument(skip_all)]
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let listener = self
            .signals
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some(listener) = listener {
            listener.abort();
        }
        self.running.shutdown().await;
        info!("Application stopped");
    }
}

/// Cancels `shutdown` on Ctrl-C or SIGTERM. The task exits on its own once `shutdown` fires.
fn spawn_signal_listener(shutdown: CancellationToken) -> Result<JoinHandle<()>, BootError> {
    #[cfg(unix)]
    let mut terminate =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .map_err(BootError::Signal)?;

    Ok(tokio::spawn(async move {
        #[cfg(unix)]
        let terminated = terminate.recv();
        #[cfg(not(unix))]
        let terminated = std::future::pending::<Option<()>>();

        tokio::select! {
            _ = shutdown.cancelled() => return,
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!(error = %e, "Unable to listen for Ctrl-C");
                    return;
                }
                info!("Interrupt received");
            }
            _ = terminated => info!("Terminate signal received"),
        }
        shutdown.cancel();
    }))
}
