//! Variable loaders for the two configuration sources every deployment has: the process
//! environment and a flat `key=value` properties file.
//!
//! Both register plain string values; [`VariableHelper`](autowire_container::VariableHelper)
//! parses them on read.

use crate::error::BootError;
use autowire_container::{BoxError, ContextBuilder, Value, VariableLoader};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_ENV_PREFIX: &str = "AUTOWIRE_";

/// Loads environment variables whose name starts with `prefix`.
///
/// The prefix is stripped and the rest lowercased with `_` turned into `.`, so with the
/// default prefix `AUTOWIRE_SERVER_PORT=8080` becomes `server.port = "8080"`. An empty prefix
/// loads the whole environment.
#[derive(Debug, Clone)]
pub struct EnvVariableLoader {
    prefix: String,
}

impl Default for EnvVariableLoader {
    fn default() -> Self {
        Self::new(DEFAULT_ENV_PREFIX)
    }
}

impl EnvVariableLoader {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The variable name for environment key `key`, or `None` if the prefix does not match.
    pub fn variable_name(&self, key: &str) -> Option<String> {
        let rest = key.strip_prefix(self.prefix.as_str())?;
        Some(rest.to_lowercase().replace('_', "."))
    }
}

impl VariableLoader for EnvVariableLoader {
    fn load(&self, builder: &dyn ContextBuilder) -> Result<(), BoxError> {
        let mut loaded = 0usize;
        // Entries that are not valid UTF-8 cannot be represented as variables.
        for (key, value) in std::env::vars_os() {
            let (Some(key), Ok(value)) = (key.to_str(), value.into_string()) else {
                continue;
            };
            if let Some(name) = self.variable_name(key) {
                builder.register_variable(&name, Value::String(value));
                loaded += 1;
            }
        }
        debug!(prefix = %self.prefix, loaded, "Environment variables loaded");
        Ok(())
    }
}

/// Loads a `.properties` file.
///
/// Blank lines and lines starting with `#` are ignored. Everything else is split on the first
/// `=` with both sides trimmed; lines without `=` are skipped. A missing file is not an error.
#[derive(Debug, Clone)]
pub struct PropertiesVariableLoader {
    path: PathBuf,
}

impl PropertiesVariableLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VariableLoader for PropertiesVariableLoader {
    fn load(&self, builder: &dyn ContextBuilder) -> Result<(), BoxError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "Properties file not found, skipping");
                return Ok(());
            }
            Err(source) => {
                return Err(BootError::Properties {
                    path: self.path.clone(),
                    source,
                }
                .into())
            }
        };

        let entries = parse_properties(&content);
        debug!(path = %self.path.display(), loaded = entries.len(), "Properties loaded");
        for (key, value) in entries {
            builder.register_variable(&key, Value::String(value));
        }
        Ok(())
    }
}

/// Parses `key=value` lines, in file order.
pub fn parse_properties(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}
