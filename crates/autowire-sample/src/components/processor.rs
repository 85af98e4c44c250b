//! A background worker that keeps placing orders until shutdown.

use super::repository::OrderRepository;
use async_trait::async_trait;
use autowire_container::{
    ApplicationContext, Background, BoxError, Component, ContextExt, Lifecycle,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const ITEMS: [&str; 3] = ["widget", "gadget", "gizmo"];

#[derive(Default)]
pub struct Processor {
    repository: OnceLock<Arc<OrderRepository>>,
    interval: OnceLock<Duration>,
    processed: AtomicU64,
}

impl Processor {
    pub const NAME: &'static str = "processor";

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::SeqCst)
    }

    fn process_one(&self) -> Result<(), BoxError> {
        let repository = self.repository.get().ok_or("processor is not initialized")?;
        let n = self.processed.fetch_add(1, Ordering::SeqCst);
        let item = ITEMS[(n % ITEMS.len() as u64) as usize];
        repository.place(item, (n % 5 + 1) as u32)?;
        Ok(())
    }
}

impl Component for Processor {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn init(&self, ctx: &dyn ApplicationContext) -> Result<(), BoxError> {
        let _ = self
            .repository
            .set(ctx.get_named::<OrderRepository>(OrderRepository::NAME)?);
        let millis = ctx.variables().get_int("processor.interval.ms", 1000).max(1);
        let _ = self.interval.set(Duration::from_millis(millis as u64));
        Ok(())
    }

    fn lifecycle(&self) -> Option<&dyn Lifecycle> {
        Some(self)
    }

    fn background(&self) -> Option<&dyn Background> {
        Some(self)
    }
}

#[async_trait]
impl Lifecycle for Processor {
    async fn start(&self, _shutdown: CancellationToken) -> Result<(), BoxError> {
        info!("Processor starting");
        Ok(())
    }

    async fn stop(&self, _deadline: CancellationToken) -> Result<(), BoxError> {
        info!(processed = self.processed(), "Processor stopping");
        Ok(())
    }
}

#[async_trait]
impl Background for Processor {
    async fn run(&self, shutdown: CancellationToken) {
        let interval = self.interval.get().copied().unwrap_or(Duration::from_secs(1));
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Processor received shutdown signal");
                    return;
                }
                _ = tokio::time::sleep(interval) => {
                    if let Err(e) = self.process_one() {
                        warn!(error = %e, "Processing failed");
                    }
                }
            }
        }
    }
}
