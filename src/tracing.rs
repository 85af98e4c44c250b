//! # Observability & Tracing
//!
//! Logging setup for applications built on the container.
//!
//! ## Overview
//!
//! The [`setup_tracing`] function installs a `tracing_subscriber` formatter filtered by
//! `RUST_LOG`. The container itself only emits events; nothing is printed until a subscriber
//! is installed, so libraries and tests stay quiet unless they opt in.
//!
//! ## Configuration
//!
//! Log lines use the compact format without the crate/module prefix (`with_target(false)`),
//! which keeps them short while still carrying structured fields.
//!
//! ## What Gets Traced
//!
//! - **Bootstrap**: factories, loaders, starters and the final initialization order
//! - **Per component**: init, start and stop with `component` and `elapsed_ms` fields
//! - **Failures**: cycle paths (`cycle = [...]`), aggregated start failures, recovered panics
//! - **Workers**: background exits and scheduled executions at `debug`
//!
//! ## Usage Examples
//!
//! ```bash
//! # Lifecycle milestones only
//! RUST_LOG=info cargo run -p autowire-sample
//!
//! # Per-component timings and the discovered dependency graph
//! RUST_LOG=debug cargo run -p autowire-sample
//!
//! # Container internals only
//! RUST_LOG=autowire_container=debug cargo run -p autowire-sample
//! ```
//!
//! ## Output Example
//!
//! **With `RUST_LOG=info`**:
//!
//! ```text
//! INFO Starting application
//! INFO Starting container
//! INFO Dependencies discovered components=4
//! INFO Container started components=4 elapsed_ms=2
//! INFO Shutdown signal received
//! INFO Stopping components count=2
//! ```

/// Installs the global subscriber. Call once, at the top of `main`.
///
/// Panics if a global subscriber is already set, same as
/// [`tracing_subscriber::fmt::SubscriberBuilder::init`].
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}

/// Like [`setup_tracing`] but returns quietly when a subscriber is already installed.
///
/// Useful in tests, where several cases may try to install one.
pub fn try_setup_tracing() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init()
        .is_ok()
}
