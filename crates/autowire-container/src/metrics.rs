//! # Component Metrics
//!
//! Per-component timings and dependency counts collected while the container boots and
//! shuts down. Collection can be switched off through
//! [`ContainerConfig::enable_metrics`](crate::ContainerConfig); a disabled collector records
//! nothing and reports an empty snapshot.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

/// Metrics for one component. Durations stay `None` until the matching phase ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComponentMetrics {
    pub name: String,
    pub dependency_count: usize,
    pub init_duration: Option<Duration>,
    pub start_duration: Option<Duration>,
    pub stop_duration: Option<Duration>,
}

pub struct MetricsCollector {
    enabled: bool,
    metrics: RwLock<HashMap<String, ComponentMetrics>>,
}

impl MetricsCollector {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            metrics: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn record_dependency_count(&self, name: &str, count: usize) {
        self.update(name, |m| m.dependency_count = count);
    }

    pub fn record_init_duration(&self, name: &str, duration: Duration) {
        self.update(name, |m| m.init_duration = Some(duration));
    }

    pub fn record_start_duration(&self, name: &str, duration: Duration) {
        self.update(name, |m| m.start_duration = Some(duration));
    }

    pub fn record_stop_duration(&self, name: &str, duration: Duration) {
        self.update(name, |m| m.stop_duration = Some(duration));
    }

    /// A copy of every record; mutating it does not touch the collector.
    pub fn snapshot(&self) -> HashMap<String, ComponentMetrics> {
        if !self.enabled {
            return HashMap::new();
        }
        self.metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The snapshot as a JSON object keyed by component name, in name order.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let sorted: BTreeMap<String, ComponentMetrics> = self.snapshot().into_iter().collect();
        serde_json::to_string(&sorted)
    }

    pub fn get(&self, name: &str) -> Option<ComponentMetrics> {
        if !self.enabled {
            return None;
        }
        self.metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    fn update(&self, name: &str, apply: impl FnOnce(&mut ComponentMetrics)) {
        if !self.enabled {
            return;
        }
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        let record = metrics
            .entry(name.to_string())
            .or_insert_with(|| ComponentMetrics {
                name: name.to_string(),
                ..ComponentMetrics::default()
            });
        apply(record);
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(true)
    }
}
