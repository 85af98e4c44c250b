//! Container configuration.

use crate::loader::VariableLoader;
use crate::starter::Starter;
use std::fmt;
use std::time::Duration;

/// Components stopped concurrently per shutdown batch unless configured otherwise.
pub const DEFAULT_STOP_BATCH_SIZE: usize = 5;

/// Options for one container run.
///
/// ```rust
/// use autowire_container::ContainerConfig;
/// use std::time::Duration;
///
/// let config = ContainerConfig::default()
///     .with_stop_batch_size(2)
///     .with_stop_timeout(Duration::from_secs(10));
/// assert_eq!(config.stop_batch_size, 2);
/// ```
pub struct ContainerConfig {
    pub enable_metrics: bool,
    pub stop_batch_size: usize,
    /// `None` waits for every stop indefinitely.
    pub stop_timeout: Option<Duration>,
    /// Registered ahead of anything the bootstrap block adds.
    pub variable_loaders: Vec<Box<dyn VariableLoader>>,
    pub starters: Vec<Box<dyn Starter>>,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            enable_metrics: true,
            stop_batch_size: DEFAULT_STOP_BATCH_SIZE,
            stop_timeout: None,
            variable_loaders: Vec::new(),
            starters: Vec::new(),
        }
    }
}

impl ContainerConfig {
    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.enable_metrics = enabled;
        self
    }

    /// Clamped to at least one.
    pub fn with_stop_batch_size(mut self, size: usize) -> Self {
        self.stop_batch_size = size.max(1);
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = Some(timeout);
        self
    }

    pub fn with_variable_loader(mut self, loader: impl VariableLoader + 'static) -> Self {
        self.variable_loaders.push(Box::new(loader));
        self
    }

    pub fn with_starter(mut self, starter: impl Starter + 'static) -> Self {
        self.starters.push(Box::new(starter));
        self
    }
}

impl fmt::Debug for ContainerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerConfig")
            .field("enable_metrics", &self.enable_metrics)
            .field("stop_batch_size", &self.stop_batch_size)
            .field("stop_timeout", &self.stop_timeout)
            .field("variable_loaders", &self.variable_loaders.len())
            .field(
                "starters",
                &self.starters.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
