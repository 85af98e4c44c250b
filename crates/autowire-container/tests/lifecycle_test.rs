use autowire_container::mock::{EventKind, EventLog, MockComponent};
use autowire_container::{
    Container, ContainerConfig, ContainerError, ContextBuilder, LifecycleState, RunningContainer,
    Schedule,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Routes container logs through the test harness; set `RUST_LOG` to see them.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn boot(
    config: ContainerConfig,
    components: Vec<MockComponent>,
) -> Result<RunningContainer, ContainerError> {
    init_tracing();
    Container::bootstrap(config, CancellationToken::new(), move |b: &dyn ContextBuilder| {
        for component in components {
            b.register_component(Arc::new(component))?;
        }
        Ok(())
    })
    .await
}

/// Polls `log` until `kind` has been recorded for `component`, or a second passes.
async fn wait_for(log: &EventLog, kind: EventKind, component: &str) -> bool {
    for _ in 0..100 {
        if log.count(kind, component) > 0 {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

// --- Start ---

#[tokio::test]
async fn test_start_follows_init_order_and_marks_running() {
    let log = EventLog::new();
    let running = boot(
        ContainerConfig::default(),
        vec![
            MockComponent::new("web", &log).depends_on("db").with_lifecycle(),
            MockComponent::new("db", &log).with_lifecycle(),
            MockComponent::new("config", &log),
        ],
    )
    .await
    .unwrap();

    assert_eq!(running.start_order(), vec!["db", "web"]);
    assert_eq!(running.state("db"), Some(LifecycleState::Running));
    assert_eq!(running.state("web"), Some(LifecycleState::Running));
    // No lifecycle capability: initialized, never started.
    assert_eq!(running.state("config"), Some(LifecycleState::Initialized));
    assert_eq!(log.count(EventKind::Start, "config"), 0);
    assert_eq!(running.state("nobody"), None);

    running.shutdown().await;
    assert_eq!(running.state("db"), Some(LifecycleState::Stopped));
    assert_eq!(running.state("web"), Some(LifecycleState::Stopped));
}

#[tokio::test]
async fn test_components_start_concurrently() {
    let log = EventLog::new();
    let delay = Duration::from_millis(300);
    let began = Instant::now();
    let running = boot(
        ContainerConfig::default(),
        vec![
            MockComponent::new("a", &log).with_lifecycle().start_delay(delay),
            MockComponent::new("b", &log).with_lifecycle().start_delay(delay),
            MockComponent::new("c", &log).with_lifecycle().start_delay(delay),
        ],
    )
    .await
    .unwrap();

    // Sequential starts would take at least 900ms.
    assert!(began.elapsed() < Duration::from_millis(800));
    assert_eq!(log.of(EventKind::Start).len(), 3);
    running.shutdown().await;
}

#[tokio::test]
async fn test_start_failures_are_aggregated_and_started_components_are_stopped() {
    let log = EventLog::new();
    let result = boot(
        ContainerConfig::default(),
        vec![
            MockComponent::new("healthy", &log).with_lifecycle(),
            MockComponent::new("exploding", &log)
                .with_lifecycle()
                .panic_on_start("kaboom"),
            MockComponent::new("refusing", &log)
                .with_lifecycle()
                .fail_start("port in use"),
        ],
    )
    .await;

    let failures = match result {
        Err(ContainerError::StartFailed(failures)) => failures,
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("start should have failed"),
    };
    assert_eq!(failures.len(), 2);

    let exploding = failures.iter().find(|f| f.name == "exploding").unwrap();
    assert!(exploding.panicked);
    assert_eq!(exploding.reason, "kaboom");

    let refusing = failures.iter().find(|f| f.name == "refusing").unwrap();
    assert!(!refusing.panicked);
    assert_eq!(refusing.reason, "port in use");

    assert!(failures.iter().all(|f| f.name != "healthy"));

    // Every component got to attempt its start.
    let started: HashSet<String> = log.of(EventKind::Start).into_iter().collect();
    assert_eq!(started.len(), 3);
    // Only the component that actually started is stopped again.
    assert_eq!(log.of(EventKind::Stop), vec!["healthy"]);
}

// --- Stop ---

#[tokio::test]
async fn test_stop_is_reverse_start_order_even_when_one_stop_panics() {
    let log = EventLog::new();
    let running = boot(
        ContainerConfig::default().with_stop_batch_size(1),
        vec![
            MockComponent::new("a", &log).with_lifecycle(),
            MockComponent::new("b", &log)
                .depends_on("a")
                .with_lifecycle()
                .panic_on_stop("b refuses to die"),
            MockComponent::new("c", &log).depends_on("b").with_lifecycle(),
        ],
    )
    .await
    .unwrap();
    assert_eq!(running.start_order(), vec!["a", "b", "c"]);

    running.shutdown().await;

    assert_eq!(log.of(EventKind::Stop), vec!["c", "b", "a"]);
    assert_eq!(running.state("b"), Some(LifecycleState::StopFailed));
    assert_eq!(running.state("a"), Some(LifecycleState::Stopped));
    assert_eq!(running.state("c"), Some(LifecycleState::Stopped));
}

#[tokio::test]
async fn test_stop_runs_in_barrier_separated_batches() {
    let log = EventLog::new();
    let components = (0..7)
        .map(|i| {
            MockComponent::new(format!("c{i}"), &log)
                .with_lifecycle()
                .stop_delay(Duration::from_millis(50))
        })
        .collect();
    let running = boot(ContainerConfig::default(), components).await.unwrap();
    let reverse: Vec<String> = running.start_order().into_iter().rev().collect();
    assert_eq!(reverse.len(), 7);

    running.shutdown().await;

    let events = log.events();
    let at = |kind: EventKind, name: &str| {
        events
            .iter()
            .position(|e| e.kind == kind && e.component == name)
            .unwrap_or_else(|| panic!("no {kind:?} for {name}"))
    };
    let (first, second) = reverse.split_at(5);

    // Within a batch every stop is entered before any of them completes.
    let last_first_entered = first.iter().map(|n| at(EventKind::Stop, n)).max().unwrap();
    let first_first_done = first.iter().map(|n| at(EventKind::Stopped, n)).min().unwrap();
    assert!(last_first_entered < first_first_done, "{events:?}");

    // The second batch only begins once the first has fully completed.
    let last_first_done = first.iter().map(|n| at(EventKind::Stopped, n)).max().unwrap();
    let first_second_entered = second.iter().map(|n| at(EventKind::Stop, n)).min().unwrap();
    assert!(last_first_done < first_second_entered, "{events:?}");
}

#[tokio::test]
async fn test_stop_timeout_detaches_a_hung_component() {
    let log = EventLog::new();
    let running = boot(
        ContainerConfig::default()
            .with_stop_batch_size(1)
            .with_stop_timeout(Duration::from_millis(100)),
        vec![
            MockComponent::new("early", &log).with_lifecycle(),
            MockComponent::new("hung", &log)
                .depends_on("early")
                .with_lifecycle()
                .stop_delay(Duration::from_secs(30)),
        ],
    )
    .await
    .unwrap();

    let began = Instant::now();
    running.shutdown().await;

    assert!(began.elapsed() < Duration::from_secs(5));
    assert_eq!(running.state("hung"), Some(LifecycleState::StopFailed));
    assert_eq!(running.state("early"), Some(LifecycleState::Stopped));
    assert_eq!(log.of(EventKind::Stop), vec!["hung", "early"]);
}

#[tokio::test]
async fn test_shutdown_is_idempotent() {
    let log = EventLog::new();
    let running = boot(
        ContainerConfig::default(),
        vec![MockComponent::new("db", &log).with_lifecycle()],
    )
    .await
    .unwrap();

    running.shutdown().await;
    running.shutdown().await;
    assert_eq!(log.count(EventKind::Stop, "db"), 1);
}

// --- Background and scheduled ---

#[tokio::test]
async fn test_background_components_run_until_cancelled() {
    let log = EventLog::new();
    let running = boot(
        ContainerConfig::default(),
        vec![
            MockComponent::new("worker", &log)
                .with_lifecycle()
                .with_background(),
            MockComponent::new("daemon", &log).with_background(),
        ],
    )
    .await
    .unwrap();

    assert!(wait_for(&log, EventKind::Run, "worker").await);
    assert!(wait_for(&log, EventKind::Run, "daemon").await);
    assert!(!running.shutdown_token().is_cancelled());

    // Both bodies block on the token; shutdown must cancel it and then wait for them.
    tokio::time::timeout(Duration::from_secs(5), running.shutdown())
        .await
        .expect("shutdown hung");
    assert!(running.shutdown_token().is_cancelled());
}

#[tokio::test]
async fn test_scheduled_component_executes_on_interval() {
    let log = EventLog::new();
    let running = boot(
        ContainerConfig::default(),
        vec![MockComponent::new("ticker", &log)
            .with_lifecycle()
            .with_schedule(Schedule::every(Duration::from_millis(40)).run_on_startup())],
    )
    .await
    .unwrap();

    assert!(wait_for(&log, EventKind::Execute, "ticker").await);
    tokio::time::sleep(Duration::from_millis(250)).await;
    running.shutdown().await;

    let executed = log.count(EventKind::Execute, "ticker");
    assert!(executed >= 3, "only {executed} executions");

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(log.count(EventKind::Execute, "ticker"), executed);
}

#[tokio::test]
async fn test_slow_executions_do_not_hold_back_the_next_tick() {
    let log = EventLog::new();
    let running = boot(
        ContainerConfig::default(),
        vec![MockComponent::new("slow", &log)
            .with_schedule(Schedule::every(Duration::from_millis(20)))
            .execute_delay(Duration::from_millis(150))],
    )
    .await
    .unwrap();

    assert!(wait_for(&log, EventKind::Executed, "slow").await);
    running.shutdown().await;

    // Ticks keep firing while the first execution is still sleeping.
    let events = log.events();
    let first_done = events
        .iter()
        .position(|e| e.kind == EventKind::Executed)
        .unwrap();
    let overlapping = events[..first_done]
        .iter()
        .filter(|e| e.kind == EventKind::Execute)
        .count();
    assert!(overlapping >= 3, "only {overlapping} executions began before the first ended");
}

#[tokio::test]
async fn test_scheduled_initial_delay_is_cancellable() {
    let log = EventLog::new();
    let running = boot(
        ContainerConfig::default(),
        vec![MockComponent::new("slow", &log).with_schedule(
            Schedule::every(Duration::from_secs(60)).with_initial_delay(Duration::from_secs(60)),
        )],
    )
    .await
    .unwrap();

    let began = Instant::now();
    running.shutdown().await;
    assert!(began.elapsed() < Duration::from_secs(5));
    assert_eq!(log.count(EventKind::Execute, "slow"), 0);
}

#[tokio::test]
async fn test_zero_interval_runs_only_the_startup_execution() {
    let log = EventLog::new();
    let running = boot(
        ContainerConfig::default(),
        vec![MockComponent::new("once", &log)
            .with_schedule(Schedule::every(Duration::ZERO).run_on_startup())],
    )
    .await
    .unwrap();

    assert!(wait_for(&log, EventKind::Execute, "once").await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    running.shutdown().await;
    assert_eq!(log.count(EventKind::Execute, "once"), 1);
}

// --- Metrics ---

#[tokio::test]
async fn test_metrics_follow_capabilities() {
    let log = EventLog::new();
    let running = boot(
        ContainerConfig::default(),
        vec![
            MockComponent::new("service", &log)
                .depends_on("db")
                .depends_on("cache"),
            MockComponent::new("db", &log).with_lifecycle(),
            MockComponent::new("cache", &log),
        ],
    )
    .await
    .unwrap();

    let metrics = running.metrics();
    assert_eq!(metrics.len(), 3);
    for record in metrics.values() {
        assert!(record.init_duration.is_some(), "{} has no init time", record.name);
    }
    assert_eq!(metrics["service"].dependency_count, 2);
    assert_eq!(metrics["db"].dependency_count, 0);
    assert!(metrics["db"].start_duration.is_some());
    assert!(metrics["cache"].start_duration.is_none());
    assert!(metrics["service"].start_duration.is_none());

    running.shutdown().await;
    let metrics = running.metrics();
    assert!(metrics["db"].stop_duration.is_some());
    assert!(metrics["cache"].stop_duration.is_none());
}

#[tokio::test]
async fn test_disabled_metrics_stay_empty() {
    let log = EventLog::new();
    let running = boot(
        ContainerConfig::default().with_metrics(false),
        vec![MockComponent::new("db", &log).with_lifecycle()],
    )
    .await
    .unwrap();

    assert!(running.metrics().is_empty());
    running.shutdown().await;
}
