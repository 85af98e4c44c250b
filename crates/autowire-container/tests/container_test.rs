use autowire_container::mock::{EventKind, EventLog, MockComponent};
use autowire_container::starter::{component_exists, property_equals, property_exists};
use autowire_container::{
    ApplicationContext, BoxError, Component, ComponentBase, ComponentFactory, CompositeStarter,
    ConditionalStarter, Container, ContainerConfig, ContainerError, ContextBuilder, ContextExt,
    FactoryFn, Interfaces, RunningContainer, StarterFn, StaticVariables, Value, VariableLoader,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tokio_util::sync::CancellationToken;

// --- Test components ---

trait Storage: Send + Sync {
    fn kind(&self) -> &'static str;
}

struct MemoryStorage {
    name: &'static str,
}

impl Storage for MemoryStorage {
    fn kind(&self) -> &'static str {
        "memory"
    }
}

impl Component for MemoryStorage {
    fn name(&self) -> &str {
        self.name
    }

    fn init(&self, _ctx: &dyn ApplicationContext) -> Result<(), BoxError> {
        Ok(())
    }

    fn interfaces(self: Arc<Self>) -> Interfaces {
        Interfaces::new().with::<dyn Storage>(self)
    }
}

#[derive(Default)]
struct StorageUser {
    storage: OnceLock<Arc<dyn Storage>>,
}

impl Component for StorageUser {
    fn name(&self) -> &str {
        "storage-user"
    }

    fn init(&self, ctx: &dyn ApplicationContext) -> Result<(), BoxError> {
        let storage = ctx.get_component::<dyn Storage>()?;
        let _ = self.storage.set(storage);
        Ok(())
    }
}

struct Narcissist;

impl Component for Narcissist {
    fn name(&self) -> &str {
        "narcissist"
    }

    fn init(&self, ctx: &dyn ApplicationContext) -> Result<(), BoxError> {
        ctx.get_component::<Narcissist>()?;
        Ok(())
    }
}

struct FailingLoader;

impl VariableLoader for FailingLoader {
    fn load(&self, _builder: &dyn ContextBuilder) -> Result<(), BoxError> {
        Err("config file is corrupt".into())
    }
}

async fn boot<F>(block: F) -> Result<RunningContainer, ContainerError>
where
    F: FnOnce(&dyn ContextBuilder) -> Result<(), ContainerError>,
{
    Container::bootstrap(ContainerConfig::default(), CancellationToken::new(), block).await
}

fn mock(builder: &dyn ContextBuilder, component: MockComponent) -> Result<(), ContainerError> {
    builder.register_component(Arc::new(component))
}

// --- Discovery and initialization order ---

#[tokio::test]
async fn test_init_order_places_dependencies_first() {
    let log = EventLog::new();
    let running = boot(|b| {
        // Registered dependents-first on purpose.
        mock(b, MockComponent::new("web", &log).depends_on("service"))?;
        mock(b, MockComponent::new("service", &log).depends_on("repo").depends_on("cache"))?;
        mock(b, MockComponent::new("repo", &log).depends_on("db"))?;
        mock(b, MockComponent::new("cache", &log))?;
        mock(b, MockComponent::new("db", &log))
    })
    .await
    .unwrap();

    let order = running.init_order();
    let pos = |name: &str| order.iter().position(|n| n == name).unwrap();
    assert_eq!(order.len(), 5);
    assert!(pos("db") < pos("repo"));
    assert!(pos("repo") < pos("service"));
    assert!(pos("cache") < pos("service"));
    assert!(pos("service") < pos("web"));

    let deps = running.dependencies("service");
    assert_eq!(
        deps.into_iter().collect::<Vec<_>>(),
        vec!["cache".to_string(), "repo".to_string()]
    );

    // Discovery plus the real pass.
    assert_eq!(log.count(EventKind::Init, "db"), 2);
    running.shutdown().await;
}

#[tokio::test]
async fn test_dependency_by_interface_type() {
    let running = boot(|b| {
        b.register_component(Arc::new(StorageUser::default()))?;
        b.register_component(Arc::new(MemoryStorage { name: "memory" }))
    })
    .await
    .unwrap();

    assert_eq!(running.init_order(), vec!["memory", "storage-user"]);
    let user = running.context().get_named::<StorageUser>("storage-user").unwrap();
    assert_eq!(user.storage.get().map(|s| s.kind()), Some("memory"));
    running.shutdown().await;
}

#[tokio::test]
async fn test_duplicate_registration_fails_and_keeps_first() {
    let container = Container::default();
    let first: Arc<dyn Component> = Arc::new(ComponentBase::new("db"));
    container.register_component(Arc::clone(&first)).unwrap();

    let err = container
        .register_component(Arc::new(MemoryStorage { name: "db" }))
        .unwrap_err();
    assert!(matches!(err, ContainerError::ComponentAlreadyRegistered(ref n) if n == "db"));

    let stored = container.get_component_by_name("db").unwrap();
    assert!(Arc::ptr_eq(&stored, &first));
}

#[tokio::test]
async fn test_self_lookup_by_name_is_a_two_element_cycle() {
    let log = EventLog::new();
    let err = boot(|b| mock(b, MockComponent::new("loop", &log).depends_on("loop")))
        .await
        .err()
        .unwrap();

    assert_eq!(err.cycle(), Some(&["loop".to_string(), "loop".to_string()][..]));
}

#[tokio::test]
async fn test_self_lookup_by_type_is_a_two_element_cycle() {
    let err = boot(|b| b.register_component(Arc::new(Narcissist)))
        .await
        .err()
        .unwrap();

    match err {
        ContainerError::CircularDependency(path) => assert_eq!(path, vec!["narcissist"; 2]),
        other => panic!("expected a cycle, got {other}"),
    }
}

#[tokio::test]
async fn test_three_component_cycle_is_reported_for_any_registration_order() {
    let edges: HashMap<&str, &str> = [("a", "b"), ("b", "c"), ("c", "a")].into_iter().collect();
    let orders = [["a", "b", "c"], ["b", "c", "a"], ["c", "a", "b"], ["c", "b", "a"]];

    for order in orders {
        let log = EventLog::new();
        let err = boot(|b| {
            for name in order {
                mock(b, MockComponent::new(name, &log).depends_on(edges[name]))?;
            }
            Ok(())
        })
        .await
        .err()
        .unwrap();

        let cycle = err.cycle().expect("cycle error").to_vec();
        assert_eq!(cycle.len(), 4, "order {order:?} gave {cycle:?}");
        assert_eq!(cycle.first(), cycle.last());
        for name in ["a", "b", "c"] {
            assert!(cycle.iter().any(|n| n == name));
        }
        for pair in cycle.windows(2) {
            assert_eq!(edges[pair[0].as_str()], pair[1], "cycle {cycle:?} is not a path");
        }
        // Nothing was started.
        assert!(log.of(EventKind::Start).is_empty());
    }
}

#[tokio::test]
async fn test_missing_dependency_fails_during_initialization() {
    let log = EventLog::new();
    let err = boot(|b| mock(b, MockComponent::new("web", &log).depends_on("ghost")))
        .await
        .err()
        .unwrap();

    assert!(matches!(err, ContainerError::ComponentNotFound(ref n) if n == "ghost"));
}

#[tokio::test]
async fn test_init_failure_aborts_bootstrap() {
    let log = EventLog::new();
    let err = boot(|b| {
        mock(b, MockComponent::new("db", &log).with_lifecycle())?;
        mock(b, MockComponent::new("web", &log).depends_on("db").fail_init("bad config"))
    })
    .await
    .err()
    .unwrap();

    match err {
        ContainerError::InitializationFailed { name, source } => {
            assert_eq!(name, "web");
            assert_eq!(source.to_string(), "bad config");
        }
        other => panic!("unexpected error {other}"),
    }
    assert!(log.of(EventKind::Start).is_empty());
}

#[tokio::test]
async fn test_pipeline_runs_only_once() {
    let container = Arc::new(Container::default());
    container.register(ComponentBase::new("db")).unwrap();

    let running = container.start(CancellationToken::new()).await.unwrap();
    let again = container.start(CancellationToken::new()).await;
    assert!(matches!(again, Err(ContainerError::AlreadyStarted)));
    running.shutdown().await;
}

// --- Type-based lookup ---

#[tokio::test]
async fn test_type_lookup_zero_one_and_many_matches() {
    let running = boot(|b| {
        b.register_component(Arc::new(MemoryStorage { name: "primary" }))?;
        b.register_component(Arc::new(MemoryStorage { name: "replica" }))?;
        b.register_component(Arc::new(ComponentBase::new("plain")))
    })
    .await
    .unwrap();
    let ctx = running.context();

    // Exactly one ComponentBase.
    let plain = ctx.get_component::<ComponentBase>().unwrap();
    assert_eq!(plain.name(), "plain");

    // Nothing is a StorageUser.
    assert!(matches!(
        ctx.get_component::<StorageUser>(),
        Err(ContainerError::ComponentTypeNotFound(_))
    ));

    // Two storages: reported, not guessed.
    match ctx.get_component::<dyn Storage>() {
        Err(ContainerError::AmbiguousComponent { candidates, .. }) => {
            assert_eq!(candidates, vec!["primary", "replica"]);
        }
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("ambiguous lookup resolved"),
    }
    // The container still answers afterwards.
    assert_eq!(ctx.get_component_names().len(), 3);
    running.shutdown().await;
}

#[tokio::test]
async fn test_named_lookup_with_wrong_type_is_invalid_target() {
    let running = boot(|b| b.register_component(Arc::new(ComponentBase::new("plain"))))
        .await
        .unwrap();

    assert!(matches!(
        running.context().get_named::<MemoryStorage>("plain"),
        Err(ContainerError::InvalidTarget(_))
    ));
    assert!(running.context().get_named::<ComponentBase>("plain").is_ok());
    running.shutdown().await;
}

// --- Variables ---

#[derive(Debug, Deserialize, PartialEq)]
struct ServerSettings {
    host: String,
    port: u16,
}

#[tokio::test]
async fn test_variable_registration_overwrites() {
    let running = boot(|b| {
        b.register_variable("server.port", Value::from(8080));
        b.register_variable("server.port", Value::from(9090));
        Ok(())
    })
    .await
    .unwrap();
    let ctx = running.context();

    assert_eq!(ctx.get_variable("server.port"), "9090");
    assert_eq!(ctx.get_variable("missing"), "");

    ctx.register_variable("server.port", Value::from("7070"));
    assert_eq!(ctx.get_variable("server.port"), "7070");
    assert_eq!(ctx.variables().get_int("server.port", 0), 7070);
    running.shutdown().await;
}

#[tokio::test]
async fn test_typed_variable_helpers() {
    let loader = StaticVariables::new()
        .with("server.host", "localhost")
        .with("server.port", 8443)
        .with("feature.enabled", "yes")
        .with("ratio", "0.25")
        .with("bogus", "not-a-number");
    let config = ContainerConfig::default().with_variable_loader(loader);
    let running = Container::bootstrap(config, CancellationToken::new(), |_| Ok(()))
        .await
        .unwrap();
    let vars = running.context().variables();

    assert!(vars.get_bool("feature.enabled", false));
    assert_eq!(vars.get_float("ratio", 1.0), 0.25);
    assert_eq!(vars.get_int("bogus", 3), 3);
    assert_eq!(vars.get_string("absent", "fallback"), "fallback");

    let server: ServerSettings = vars.get_struct("server").unwrap();
    assert_eq!(
        server,
        ServerSettings {
            host: "localhost".into(),
            port: 8443
        }
    );
    assert!(vars.get_struct::<ServerSettings>("nothing").is_err());
    running.shutdown().await;
}

#[tokio::test]
async fn test_string_override_of_a_typed_default_still_reads_as_a_struct() {
    // Environment and properties loaders only ever produce strings.
    let config = ContainerConfig::default()
        .with_variable_loader(
            StaticVariables::new()
                .with("server.host", "localhost")
                .with("server.port", 8080),
        )
        .with_variable_loader(StaticVariables::new().with("server.port", "9090"));
    let running = Container::bootstrap(config, CancellationToken::new(), |_| Ok(()))
        .await
        .unwrap();
    let vars = running.context().variables();

    assert_eq!(vars.get_int("server.port", 0), 9090);
    let server: ServerSettings = vars.get_struct("server").unwrap();
    assert_eq!(server.port, 9090);
    assert_eq!(server.host, "localhost");
    running.shutdown().await;
}

#[derive(Debug, Deserialize, PartialEq)]
struct PoolSettings {
    size: u32,
}

#[derive(Debug, Deserialize, PartialEq)]
struct DbSettings {
    pool: PoolSettings,
}

#[tokio::test]
async fn test_nested_section_shadows_a_scalar_of_the_same_name() {
    for _ in 0..16 {
        let running = boot(|b| {
            b.register_variable("db.pool", Value::from("fixed"));
            b.register_variable("db.pool.size", Value::from(4));
            Ok(())
        })
        .await
        .unwrap();

        let db: DbSettings = running.context().variables().get_struct("db").unwrap();
        assert_eq!(db.pool, PoolSettings { size: 4 });
        running.shutdown().await;
    }
}

#[tokio::test]
async fn test_later_loaders_override_earlier_ones() {
    let config = ContainerConfig::default()
        .with_variable_loader(StaticVariables::new().with("mode", "default"))
        .with_variable_loader(StaticVariables::new().with("mode", "override"));
    let running = Container::bootstrap(config, CancellationToken::new(), |_| Ok(()))
        .await
        .unwrap();

    assert_eq!(running.context().get_variable("mode"), "override");
    running.shutdown().await;
}

#[tokio::test]
async fn test_loader_failure_aborts_bootstrap() {
    let err = boot(|b| {
        b.register_variable_loader(Box::new(FailingLoader));
        Ok(())
    })
    .await
    .err()
    .unwrap();

    match err {
        ContainerError::VariableLoaderFailed(source) => {
            assert_eq!(source.to_string(), "config file is corrupt")
        }
        other => panic!("unexpected error {other}"),
    }
}

// --- Factories and starters ---

#[tokio::test]
async fn test_factories_register_components() {
    let running = boot(|b| {
        b.register_factory(Box::new(
            ComponentFactory::new()
                .with(ComponentBase::new("one"))
                .with(ComponentBase::new("two")),
        ));
        b.register_factory(Box::new(FactoryFn::new(|b: &dyn ContextBuilder| {
            b.register_component(Arc::new(ComponentBase::new("three")))?;
            Ok(())
        })));
        Ok(())
    })
    .await
    .unwrap();

    let mut names = running.context().get_component_names();
    names.sort();
    assert_eq!(names, vec!["one", "three", "two"]);
    running.shutdown().await;
}

#[tokio::test]
async fn test_factory_failure_aborts_bootstrap() {
    let err = boot(|b| {
        b.register_component(Arc::new(ComponentBase::new("dup")))?;
        b.register_factory(Box::new(ComponentFactory::new().with(ComponentBase::new("dup"))));
        Ok(())
    })
    .await
    .err()
    .unwrap();

    assert!(matches!(err, ContainerError::FactoryFailed(_)));
}

#[tokio::test]
async fn test_conditional_starters_see_loaded_variables() {
    let log = EventLog::new();
    let cache_log = log.clone();
    let metrics_log = log.clone();
    let config = ContainerConfig::default()
        .with_variable_loader(StaticVariables::new().with("cache.enabled", "true"))
        .with_starter(ConditionalStarter::new(
            "cache",
            property_equals("cache.enabled", "true"),
            move |b: &dyn ContextBuilder| {
                b.register_component(Arc::new(MockComponent::new("cache", &cache_log)))?;
                Ok(())
            },
        ))
        .with_starter(ConditionalStarter::new(
            "metrics",
            property_exists("metrics.endpoint"),
            move |b: &dyn ContextBuilder| {
                b.register_component(Arc::new(MockComponent::new("metrics", &metrics_log)))?;
                Ok(())
            },
        ));

    let app_log = log.clone();
    let running = Container::bootstrap(config, CancellationToken::new(), move |b| {
        // Depends on a component only a starter registers.
        mock(b, MockComponent::new("app", &app_log).depends_on("cache"))
    })
    .await
    .unwrap();

    let ctx = running.context();
    assert!(ctx.has_component("cache"));
    assert!(!ctx.has_component("metrics"));
    assert_eq!(running.init_order(), vec!["cache", "app"]);
    running.shutdown().await;
}

#[tokio::test]
async fn test_composite_starter_children_see_earlier_registrations() {
    let composite = CompositeStarter::new("data")
        .with(StarterFn::new("db", |b: &dyn ContextBuilder| {
            b.register_component(Arc::new(ComponentBase::new("db")))?;
            Ok(())
        }))
        .with(ConditionalStarter::new(
            "migrations",
            component_exists("db"),
            |b: &dyn ContextBuilder| {
                b.register_component(Arc::new(ComponentBase::new("migrations")))?;
                Ok(())
            },
        ));

    let running = Container::bootstrap(
        ContainerConfig::default().with_starter(composite),
        CancellationToken::new(),
        |_| Ok(()),
    )
    .await
    .unwrap();

    assert!(running.context().has_component("migrations"));
    running.shutdown().await;
}

#[tokio::test]
async fn test_starter_failure_carries_its_name() {
    let err = boot(|b| {
        b.register_starter(Box::new(StarterFn::new("broken", |_: &dyn ContextBuilder| {
            Err("cannot reach broker".into())
        })));
        Ok(())
    })
    .await
    .err()
    .unwrap();

    match err {
        ContainerError::StarterFailed { name, source } => {
            assert_eq!(name, "broken");
            assert_eq!(source.to_string(), "cannot reach broker");
        }
        other => panic!("unexpected error {other}"),
    }
}

#[tokio::test]
async fn test_composite_starter_keeps_the_failing_child_as_source() {
    let composite = CompositeStarter::new("data").with(StarterFn::new(
        "db",
        |_: &dyn ContextBuilder| Err("connection refused".into()),
    ));

    let err = Container::bootstrap(
        ContainerConfig::default().with_starter(composite),
        CancellationToken::new(),
        |_| Ok(()),
    )
    .await
    .err()
    .unwrap();

    let ContainerError::StarterFailed { name, source } = err else {
        panic!("expected a starter failure");
    };
    assert_eq!(name, "data");
    match source.downcast_ref::<ContainerError>() {
        Some(ContainerError::StarterFailed { name, source }) => {
            assert_eq!(name, "db");
            assert_eq!(source.to_string(), "connection refused");
        }
        other => panic!("unexpected source {other:?}"),
    }
    let root = std::error::Error::source(source.as_ref()).map(ToString::to_string);
    assert_eq!(root.as_deref(), Some("connection refused"));
}
