//! # Autowire Boot
//!
//! > **Process glue for the autowire container.**
//!
//! [`autowire_container`] knows nothing about processes, files or signals. This crate adds the
//! thin layer every binary needs on top of it:
//!
//! - [`Application`]: bootstrap, Ctrl-C / SIGTERM handling, `run` until shutdown
//! - [`EnvVariableLoader`] and [`PropertiesVariableLoader`]: the usual configuration sources
//! - [`setup_tracing`]: a compact `RUST_LOG`-driven subscriber
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Entry Point ([`application`])
//! - **Role**: Owns the shutdown token and the running container.
//! - **Key items**: [`Application`], [`ApplicationConfig`].
//!
//! ### 2. Configuration Sources ([`loaders`])
//! - **Role**: Turn environment variables and properties files into container variables.
//! - **Key items**: [`EnvVariableLoader`], [`PropertiesVariableLoader`].
//!
//! ### 3. Observability ([`tracing`])
//! - **Role**: Installs the log subscriber.
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! # Run the sample with lifecycle logs
//! RUST_LOG=info cargo run -p autowire-sample
//!
//! # Override a variable from the environment
//! AUTOWIRE_GREETING_MESSAGE=hi RUST_LOG=info cargo run -p autowire-sample
//! ```
//!
//! ### Running Tests
//!
//! ```bash
//! cargo test --workspace
//! ```

pub mod application;
pub mod error;
pub mod loaders;
pub mod tracing;

pub use application::{Application, ApplicationConfig};
pub use error::BootError;
pub use loaders::{parse_properties, EnvVariableLoader, PropertiesVariableLoader, DEFAULT_ENV_PREFIX};
pub use self::tracing::{setup_tracing, try_setup_tracing};
