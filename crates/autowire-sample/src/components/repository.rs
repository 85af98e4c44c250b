//! Order placement on top of whichever [`OrderStore`] is registered.

use super::audit::AuditTrail;
use super::greeting::Greeter;
use super::store::{Order, OrderStore};
use autowire_container::{ApplicationContext, BoxError, Component, ContextExt};
use std::sync::{Arc, OnceLock};
use tracing::info;

#[derive(Default)]
pub struct OrderRepository {
    store: OnceLock<Arc<dyn OrderStore>>,
    greeter: OnceLock<Arc<Greeter>>,
    audit: OnceLock<Arc<AuditTrail>>,
}

impl OrderRepository {
    pub const NAME: &'static str = "orders";

    /// Stores the order and returns its confirmation line.
    pub fn place(&self, item: &str, quantity: u32) -> Result<(Order, String), BoxError> {
        let store = self.store.get().ok_or("order repository is not initialized")?;
        let greeter = self.greeter.get().ok_or("order repository is not initialized")?;

        let order = store.save(item, quantity);
        let confirmation = greeter.confirmation(&order.item, order.id);
        if let Some(audit) = self.audit.get() {
            audit.record(confirmation.clone());
        }
        info!(order_id = order.id, item = %order.item, quantity, "Order placed");
        Ok((order, confirmation))
    }

    pub fn count(&self) -> usize {
        self.store.get().map_or(0, |store| store.count())
    }

    pub fn total_quantity(&self) -> u64 {
        self.store.get().map_or(0, |store| {
            store.all().iter().map(|o| u64::from(o.quantity)).sum()
        })
    }
}

impl Component for OrderRepository {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn init(&self, ctx: &dyn ApplicationContext) -> Result<(), BoxError> {
        let _ = self.store.set(ctx.get_component::<dyn OrderStore>()?);
        let _ = self.greeter.set(ctx.get_component::<Greeter>()?);
        // Optional: only present when the audit starter ran.
        if ctx.has_component(AuditTrail::NAME) {
            let _ = self.audit.set(ctx.get_named::<AuditTrail>(AuditTrail::NAME)?);
        }
        Ok(())
    }
}
