//! # Container Errors
//!
//! This module defines the error type shared by every part of the container.
//! Registration, discovery, initialization and startup failures all surface as a
//! [`ContainerError`], so the bootstrap call has exactly one error type to report.

use std::fmt;

/// Boxed error returned by component hooks, factories, loaders and starters.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur within the container itself.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("component '{0}' not found")]
    ComponentNotFound(String),

    #[error("component '{0}' already registered")]
    ComponentAlreadyRegistered(String),

    #[error("invalid component: {0}")]
    InvalidComponent(String),

    /// The path starts and ends with the same component name.
    #[error("circular dependency detected: {}", .0.join(" -> "))]
    CircularDependency(Vec<String>),

    #[error("no component found matching type {0}")]
    ComponentTypeNotFound(String),

    /// More than one component satisfies a type lookup.
    #[error("multiple components match type {type_name}: {}", .candidates.join(", "))]
    AmbiguousComponent {
        type_name: String,
        candidates: Vec<String>,
    },

    #[error("invalid lookup target: {0}")]
    InvalidTarget(String),

    #[error("component '{name}' failed to initialize")]
    InitializationFailed {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("factory failed")]
    FactoryFailed(#[source] BoxError),

    #[error("variable loader failed")]
    VariableLoaderFailed(#[source] BoxError),

    #[error("starter '{name}' failed")]
    StarterFailed {
        name: String,
        #[source]
        source: BoxError,
    },

    /// Every component that failed to start, in the order the failures were observed.
    #[error("{} component(s) failed to start: {}", .0.len(), join_failures(.0))]
    StartFailed(Vec<ComponentFailure>),

    #[error("container already started")]
    AlreadyStarted,
}

impl ContainerError {
    /// The cycle path carried by a [`ContainerError::CircularDependency`].
    pub fn cycle(&self) -> Option<&[String]> {
        match self {
            ContainerError::CircularDependency(path) => Some(path),
            _ => None,
        }
    }
}

/// A single component's start failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentFailure {
    pub name: String,
    pub reason: String,
    pub panicked: bool,
}

impl fmt::Display for ComponentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.panicked {
            write!(f, "panic in component {}: {}", self.name, self.reason)
        } else {
            write!(f, "component {}: {}", self.name, self.reason)
        }
    }
}

fn join_failures(failures: &[ComponentFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Extracts a readable message from a panicked task.
pub(crate) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}
