//! # Sample Components
//!
//! A small order pipeline wired entirely by discovery:
//!
//! | Component | Looks up | Capabilities |
//! |-----------|----------|--------------|
//! | [`MemoryStore`] (`store`) | nothing | advertises `dyn OrderStore` |
//! | [`Greeter`] (`greeter`) | `greeting.*` variables | none |
//! | [`OrderRepository`] (`orders`) | `dyn OrderStore`, `Greeter`, optionally `audit` | none |
//! | [`Processor`] (`processor`) | `orders` | lifecycle, background |
//! | [`Reporter`] (`reporter`) | `OrderRepository` | lifecycle, scheduled |
//! | [`AuditTrail`] (`audit`) | nothing | lifecycle; only with `audit.enabled=true` |
//!
//! None of them lists its dependencies anywhere; the lookups in `init` are the wiring.

pub mod audit;
pub mod greeting;
pub mod processor;
pub mod reporter;
pub mod repository;
pub mod store;

pub use audit::{audit_starter, AuditTrail};
pub use greeting::{Greeter, GreetingSettings};
pub use processor::Processor;
pub use reporter::Reporter;
pub use repository::OrderRepository;
pub use store::{MemoryStore, Order, OrderStore};
