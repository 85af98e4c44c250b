//! In-memory order storage, resolved by its interface rather than its concrete type.

use autowire_container::{ApplicationContext, BoxError, Component, Interfaces};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: u64,
    pub item: String,
    pub quantity: u32,
}

pub trait OrderStore: Send + Sync {
    /// Stores a new order and returns it with its assigned id.
    fn save(&self, item: &str, quantity: u32) -> Order;
    fn count(&self) -> usize;
    fn all(&self) -> Vec<Order>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    orders: Mutex<Vec<Order>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub const NAME: &'static str = "store";
}

impl OrderStore for MemoryStore {
    fn save(&self, item: &str, quantity: u32) -> Order {
        let order = Order {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            item: item.to_string(),
            quantity,
        };
        self.orders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(order.clone());
        order
    }

    fn count(&self) -> usize {
        self.orders.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn all(&self) -> Vec<Order> {
        self.orders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Component for MemoryStore {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn init(&self, _ctx: &dyn ApplicationContext) -> Result<(), BoxError> {
        Ok(())
    }

    fn interfaces(self: Arc<Self>) -> Interfaces {
        Interfaces::new().with::<dyn OrderStore>(self)
    }
}
