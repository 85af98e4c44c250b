//! A scheduled component summarising the order book.

use super::repository::OrderRepository;
use async_trait::async_trait;
use autowire_container::{
    ApplicationContext, BoxError, Component, ContextExt, Lifecycle, Schedule, Scheduled,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Default)]
pub struct Reporter {
    repository: OnceLock<Arc<OrderRepository>>,
    schedule: OnceLock<Schedule>,
    executions: AtomicU64,
}

impl Reporter {
    pub const NAME: &'static str = "reporter";

    pub fn executions(&self) -> u64 {
        self.executions.load(Ordering::SeqCst)
    }
}

impl Component for Reporter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn init(&self, ctx: &dyn ApplicationContext) -> Result<(), BoxError> {
        let _ = self.repository.set(ctx.get_component::<OrderRepository>()?);

        let vars = ctx.variables();
        let interval = vars.get_int("reporter.interval.ms", 5000).max(0) as u64;
        let delay = vars.get_int("reporter.delay.ms", 1000).max(0) as u64;
        let mut schedule = Schedule::every(Duration::from_millis(interval))
            .with_initial_delay(Duration::from_millis(delay));
        if vars.get_bool("reporter.run.on.startup", true) {
            schedule = schedule.run_on_startup();
        }
        let _ = self.schedule.set(schedule);
        Ok(())
    }

    fn lifecycle(&self) -> Option<&dyn Lifecycle> {
        Some(self)
    }

    fn scheduled(&self) -> Option<&dyn Scheduled> {
        Some(self)
    }
}

#[async_trait]
impl Lifecycle for Reporter {
    async fn start(&self, _shutdown: CancellationToken) -> Result<(), BoxError> {
        info!("Reporter starting");
        Ok(())
    }

    async fn stop(&self, _deadline: CancellationToken) -> Result<(), BoxError> {
        info!(executions = self.executions(), "Reporter stopping");
        Ok(())
    }
}

#[async_trait]
impl Scheduled for Reporter {
    fn schedule(&self) -> Schedule {
        self.schedule.get().copied().unwrap_or_else(|| {
            Schedule::every(Duration::from_secs(5))
                .with_initial_delay(Duration::from_secs(1))
                .run_on_startup()
        })
    }

    async fn execute(&self, _shutdown: CancellationToken) {
        let run = self.executions.fetch_add(1, Ordering::SeqCst) + 1;
        let (orders, quantity) = self
            .repository
            .get()
            .map_or((0, 0), |r| (r.count(), r.total_quantity()));
        info!(run, orders, quantity, "Order report");
    }
}
