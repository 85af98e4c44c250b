//! # Boot Errors
//!
//! Failures of the bootstrapping glue, as opposed to [`ContainerError`], which covers the
//! container pipeline itself.

use autowire_container::ContainerError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum BootError {
    #[error(transparent)]
    Container(#[from] ContainerError),
    #[error("failed to read properties file {}: {source}", .path.display())]
    Properties {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to install signal handler: {0}")]
    Signal(#[source] std::io::Error),
}
