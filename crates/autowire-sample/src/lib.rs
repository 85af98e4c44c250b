//! # Autowire Sample
//!
//! A runnable order pipeline showing the container end to end.
//!
//! ## 📚 What it demonstrates
//!
//! - **Discovery**: no component declares its dependencies; see [`components`]
//! - **Interface lookup**: the repository asks for `dyn OrderStore`, not `MemoryStore`
//! - **Configuration**: defaults from [`defaults`], overridden by `application.properties`
//!   and `AUTOWIRE_*` environment variables
//! - **Starters**: the audit trail only exists with `audit.enabled=true`
//! - **Background and scheduled work**: [`Processor`](components::Processor) and
//!   [`Reporter`](components::Reporter)
//!
//! ## 🧪 Testing
//!
//! `tests/integration_test.rs` boots the same registration with fast timings.

pub mod components;

use autowire_boot::ApplicationConfig;
use autowire_container::{ContainerConfig, ContainerError, ContextBuilder, StaticVariables};
use components::{audit_starter, Greeter, MemoryStore, OrderRepository, Processor, Reporter};
use std::sync::Arc;

/// Lowest-precedence variable values.
pub fn defaults() -> StaticVariables {
    StaticVariables::new()
        .with("greeting.message", "Thanks for your order")
        .with("processor.interval.ms", 1000)
        .with("reporter.interval.ms", 5000)
        .with("reporter.delay.ms", 1000)
        .with("reporter.run.on.startup", true)
        .with("audit.enabled", "false")
}

/// Defaults, then `application.properties` in the working directory, then the environment.
pub fn application_config() -> ApplicationConfig {
    ApplicationConfig::default()
        .with_container(ContainerConfig::default().with_variable_loader(defaults()))
        .with_properties_file("application.properties")
}

/// The registration block. Order is irrelevant; discovery sorts it out.
pub fn register(builder: &dyn ContextBuilder) -> Result<(), ContainerError> {
    builder.register_component(Arc::new(Reporter::default()))?;
    builder.register_component(Arc::new(Processor::default()))?;
    builder.register_component(Arc::new(OrderRepository::default()))?;
    builder.register_component(Arc::new(Greeter::default()))?;
    builder.register_component(Arc::new(MemoryStore::default()))?;
    builder.register_starter(Box::new(audit_starter()));
    Ok(())
}
