//! Export Coordinator
//!
//! The [`ExportCoordinator`] owns every [`StatusCollector`], a name index over them and
//! the [`MetricRegistry`]. For each inbound exposition request it binds one target and
//! runs a collection cycle: scrape the target, map the status document into gauges,
//! and emit the gauges to a [`MetricSink`] in a fixed order.
//!
//! # Serialization
//!
//! A single async mutex guards the current-target binding and is held for a whole
//! cycle, network fetch included. Two concurrent requests for different targets can
//! therefore never interleave their scrape and mapping steps on the shared gauges.
//!
//! # Failure handling
//!
//! A cycle never fails outward. Transport and decode errors are logged and turn the
//! `status` gauge to 0; only that gauge is emitted for the cycle. Secondary gauges are
//! emitted only when the overall state is green.

use crate::error::{ExporterError, Result};
use crate::kibana::{StatusCollector, StatusPayload};
use crate::metrics::{self, MetricRegistry};
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

/// Destination of the metric families produced by a collection cycle
pub trait MetricSink {
    fn emit(&mut self, families: Vec<MetricFamily>);
}

impl MetricSink for Vec<MetricFamily> {
    fn emit(&mut self, families: Vec<MetricFamily>) {
        self.extend(families);
    }
}

pub struct ExportCoordinator {
    collectors: Vec<StatusCollector>,
    by_name: HashMap<String, usize>,
    registry: MetricRegistry,
    /// Index of the collector bound for the next cycle
    current: Mutex<Option<usize>>,
    log_payloads: bool,
}

impl ExportCoordinator {
    /// Index the collectors by name and create the gauges under `namespace`.
    ///
    /// # Errors
    ///
    /// [`ExporterError::Config`] when there is no collector, two collectors share a
    /// name, or the namespace is empty or yields invalid metric names.
    pub fn new(collectors: Vec<StatusCollector>, namespace: &str) -> Result<Self> {
        if namespace.trim().is_empty() {
            return Err(ExporterError::Config(
                "metric namespace must not be empty".to_string(),
            ));
        }
        if collectors.is_empty() {
            return Err(ExporterError::Config(
                "at least one Kibana target is required".to_string(),
            ));
        }

        let registry = MetricRegistry::new(namespace).map_err(|e| {
            ExporterError::Config(format!("invalid metric namespace '{}': {}", namespace, e))
        })?;

        let mut by_name = HashMap::with_capacity(collectors.len());
        for (index, collector) in collectors.iter().enumerate() {
            if by_name.insert(collector.name().to_string(), index).is_some() {
                return Err(ExporterError::Config(format!(
                    "duplicate target name '{}'",
                    collector.name()
                )));
            }
        }

        Ok(Self {
            collectors,
            by_name,
            registry,
            current: Mutex::new(None),
            log_payloads: false,
        })
    }

    /// Log every decoded status document as JSON at debug level
    pub fn with_payload_logging(mut self, enabled: bool) -> Self {
        self.log_payloads = enabled;
        self
    }

    pub fn collectors(&self) -> &[StatusCollector] {
        &self.collectors
    }

    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    /// First configured target, used when a request names none
    pub fn default_target(&self) -> &StatusCollector {
        &self.collectors[0]
    }

    /// Look a target up by name; `None` when no such target is configured
    pub fn select_target(&self, name: &str) -> Option<&StatusCollector> {
        self.by_name.get(name).map(|&index| &self.collectors[index])
    }

    /// Descriptors of every gauge this coordinator may emit
    pub fn describe(&self) -> Vec<&Desc> {
        self.registry.descs()
    }

    /// Record which collector the next cycle scrapes.
    ///
    /// A collector that does not belong to this coordinator clears the binding.
    pub async fn bind_current_target(&self, collector: &StatusCollector) {
        let index = self.index_of(collector);
        *self.current.lock().await = index;
    }

    /// Run one cycle against the currently bound target
    pub async fn run_collection_cycle<S: MetricSink>(&self, sink: &mut S) {
        let current = self.current.lock().await;
        self.cycle(*current, sink).await;
    }

    /// Bind `collector` and run one cycle without releasing the lock in between
    pub async fn collect_target<S: MetricSink>(&self, collector: &StatusCollector, sink: &mut S) {
        let mut current = self.current.lock().await;
        *current = self.index_of(collector);
        self.cycle(*current, sink).await;
    }

    /// Run one cycle against `collector` and capture what it emitted
    pub async fn snapshot(&self, collector: &StatusCollector) -> CycleSnapshot {
        let mut families = Vec::new();
        self.collect_target(collector, &mut families).await;
        CycleSnapshot {
            descs: self.describe().into_iter().cloned().collect(),
            families,
        }
    }

    fn index_of(&self, collector: &StatusCollector) -> Option<usize> {
        let index = self.by_name.get(collector.name()).copied();
        if index.is_none() {
            warn!(
                "Target '{}' is not managed by this exporter, unbinding",
                collector.name()
            );
        }
        index
    }

    /// Must be called with the binding lock held
    async fn cycle<S: MetricSink>(&self, current: Option<usize>, sink: &mut S) {
        let Some(index) = current else {
            error!("Target not set: can't scrape");
            sink.emit(self.registry.status_families());
            return;
        };
        let target = &self.collectors[index];

        debug!("Issuing a scrape of Kibana '{}'", target.name());
        match target.scrape().await {
            Ok(payload) => {
                if self.log_payloads {
                    match serde_json::to_string(&payload) {
                        Ok(json) => debug!("Returned metrics content: {}", json),
                        Err(e) => error!("Error converting payload to JSON: {}", e),
                    }
                }

                if self.apply(&payload) {
                    sink.emit(self.registry.all_families());
                } else {
                    sink.emit(self.registry.status_families());
                }
            }
            Err(e) => {
                error!(
                    "Error while scraping metrics from Kibana '{}': {}",
                    target.name(),
                    e
                );
                self.registry.status.set(0.0);
                sink.emit(self.registry.status_families());
            }
        }
    }

    /// Map the payload into the gauges and return whether the target is healthy.
    ///
    /// Secondary gauges are only touched for a healthy target.
    fn apply(&self, payload: &StatusPayload) -> bool {
        let healthy = payload.is_healthy();
        let registry = &self.registry;
        registry.status.set(if healthy { 1.0 } else { 0.0 });
        if !healthy {
            debug!(
                "Kibana overall state is '{}', skipping detailed metrics",
                payload.status.overall.state
            );
            return false;
        }

        let build = payload.version.build_number.to_string();
        registry.info.reset();
        registry
            .info
            .with_label_values(&[payload.version.number.as_str(), build.as_str()])
            .set(1.0);

        let m = &payload.metrics;
        registry
            .concurrent_connections
            .set(m.concurrent_connections as f64);
        registry.uptime_millis.set(m.process.uptime_in_millis);
        registry
            .heap_total_bytes
            .set(m.process.memory.heap.total_in_bytes as f64);
        registry
            .heap_used_bytes
            .set(m.process.memory.heap.used_in_bytes as f64);
        registry.load_1m.set(m.os.load.one);
        registry.load_5m.set(m.os.load.five);
        registry.load_15m.set(m.os.load.fifteen);
        registry.response_average.set(m.response_times.avg_in_millis);
        registry.response_max.set(m.response_times.max_in_millis);
        registry
            .requests_disconnects
            .set(m.requests.disconnects as f64);
        registry.requests_total.set(m.requests.total as f64);
        true
    }
}

/// Output of one collection cycle, exposed through the `prometheus` collector contract
///
/// Families keep their emission order; [`CycleSnapshot::render`] writes them as-is.
pub struct CycleSnapshot {
    descs: Vec<Desc>,
    families: Vec<MetricFamily>,
}

impl CycleSnapshot {
    pub fn families(&self) -> &[MetricFamily] {
        &self.families
    }

    pub fn render(&self) -> anyhow::Result<String> {
        metrics::render(&self.families)
    }
}

impl Collector for CycleSnapshot {
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        self.families.clone()
    }
}
