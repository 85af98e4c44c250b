//! An optional component contributed by a starter.

use async_trait::async_trait;
use autowire_container::starter::{property_equals, ConditionalStarter};
use autowire_container::{ApplicationContext, BoxError, Component, ContextBuilder, Lifecycle};
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Keeps a record of every confirmation the repository hands out.
#[derive(Debug, Default)]
pub struct AuditTrail {
    entries: Mutex<Vec<String>>,
}

impl AuditTrail {
    pub const NAME: &'static str = "audit";

    pub fn record(&self, entry: impl Into<String>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Component for AuditTrail {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn init(&self, _ctx: &dyn ApplicationContext) -> Result<(), BoxError> {
        Ok(())
    }

    fn lifecycle(&self) -> Option<&dyn Lifecycle> {
        Some(self)
    }
}

#[async_trait]
impl Lifecycle for AuditTrail {
    async fn start(&self, _shutdown: CancellationToken) -> Result<(), BoxError> {
        info!("Audit trail enabled");
        Ok(())
    }

    async fn stop(&self, _deadline: CancellationToken) -> Result<(), BoxError> {
        info!(entries = self.entries().len(), "Audit trail closed");
        Ok(())
    }
}

/// Registers an [`AuditTrail`] when `audit.enabled` is `true`.
pub fn audit_starter() -> ConditionalStarter {
    ConditionalStarter::new(
        "audit",
        property_equals("audit.enabled", "true"),
        |builder: &dyn ContextBuilder| {
            builder.register_component(Arc::new(AuditTrail::default()))?;
            Ok(())
        },
    )
}
