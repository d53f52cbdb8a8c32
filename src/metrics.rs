//! Prometheus Metrics Definitions
//!
//! This module defines the fixed set of gauges exposed by the Kibana exporter. They
//! are created once at startup and updated by every healthy collection cycle.
//!
//! # Metrics
//!
//! | Name | Source field |
//! |------|--------------|
//! | `status` | `status.overall.state` (1 = green, 0 otherwise) |
//! | `info{version,build}` | `version.number`, `version.build_number` (always 1) |
//! | `concurrent_connections` | `metrics.concurrent_connections` |
//! | `millis_uptime` | `metrics.process.uptime_in_millis` |
//! | `heap_max_in_bytes` | `metrics.process.memory.heap.total_in_bytes` |
//! | `heap_used_in_bytes` | `metrics.process.memory.heap.used_in_bytes` |
//! | `os_load_1m` / `os_load_5m` / `os_load_15m` | `metrics.os.load.*` |
//! | `response_average` / `response_max` | `metrics.response_times.*` |
//! | `requests_disconnects` / `requests_total` | `metrics.requests.*` |
//!
//! All metrics share one namespace prefix, `kibana_` by default.

use crate::error::Result;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, Gauge, GaugeVec, Opts, TextEncoder};

/// Default metric namespace
pub const NAMESPACE: &str = "kibana";

/// Label names of the info gauge, in order
pub const INFO_LABELS: [&str; 2] = ["version", "build"];

/// Fixed set of Kibana gauges
#[derive(Clone)]
pub struct MetricRegistry {
    namespace: String,

    pub status: Gauge,
    pub info: GaugeVec,

    pub concurrent_connections: Gauge,
    pub uptime_millis: Gauge,
    pub heap_total_bytes: Gauge,
    pub heap_used_bytes: Gauge,

    pub load_1m: Gauge,
    pub load_5m: Gauge,
    pub load_15m: Gauge,

    pub response_average: Gauge,
    pub response_max: Gauge,
    pub requests_disconnects: Gauge,
    pub requests_total: Gauge,
}

impl MetricRegistry {
    /// Create every gauge under `namespace`.
    ///
    /// Fails when the namespace does not produce valid metric names.
    pub fn new(namespace: &str) -> Result<Self> {
        let gauge = |name: &str, help: &str| {
            Gauge::with_opts(Opts::new(name, help).namespace(namespace))
        };

        let status = gauge("status", "Kibana overall status (0: down, 1: up)")?;
        let info = GaugeVec::new(
            Opts::new(
                "info",
                "Kibana overall info, version and build; see labels, always 1",
            )
            .namespace(namespace),
            &INFO_LABELS,
        )?;

        let concurrent_connections =
            gauge("concurrent_connections", "Kibana concurrent connections")?;
        let uptime_millis = gauge("millis_uptime", "Kibana uptime in milliseconds")?;
        let heap_total_bytes = gauge("heap_max_in_bytes", "Kibana heap maximum in bytes")?;
        let heap_used_bytes = gauge("heap_used_in_bytes", "Kibana heap usage in bytes")?;

        let load_1m = gauge("os_load_1m", "Kibana load average 1m")?;
        let load_5m = gauge("os_load_5m", "Kibana load average 5m")?;
        let load_15m = gauge("os_load_15m", "Kibana load average 15m")?;

        let response_average = gauge(
            "response_average",
            "Kibana average response time in milliseconds",
        )?;
        let response_max = gauge(
            "response_max",
            "Kibana maximum response time in milliseconds",
        )?;
        let requests_disconnects =
            gauge("requests_disconnects", "Kibana request disconnections count")?;
        let requests_total = gauge("requests_total", "Kibana total request count")?;

        Ok(Self {
            namespace: namespace.to_string(),
            status,
            info,
            concurrent_connections,
            uptime_millis,
            heap_total_bytes,
            heap_used_bytes,
            load_1m,
            load_5m,
            load_15m,
            response_average,
            response_max,
            requests_disconnects,
            requests_total,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Gauges following `status` and `info`, in exposition order
    fn secondary(&self) -> [&Gauge; 11] {
        [
            &self.concurrent_connections,
            &self.uptime_millis,
            &self.heap_total_bytes,
            &self.heap_used_bytes,
            &self.load_1m,
            &self.load_5m,
            &self.load_15m,
            &self.response_average,
            &self.response_max,
            &self.requests_disconnects,
            &self.requests_total,
        ]
    }

    /// Descriptors of every gauge, in exposition order
    pub fn descs(&self) -> Vec<&Desc> {
        let mut descs = self.status.desc();
        descs.extend(self.info.desc());
        for gauge in self.secondary() {
            descs.extend(gauge.desc());
        }
        descs
    }

    /// Only the overall status family
    pub fn status_families(&self) -> Vec<MetricFamily> {
        self.status.collect()
    }

    /// Status, info, then the remaining gauges in their fixed order
    pub fn all_families(&self) -> Vec<MetricFamily> {
        let mut families = self.status.collect();
        families.extend(self.info.collect());
        for gauge in self.secondary() {
            families.extend(gauge.collect());
        }
        families
    }
}

/// Render metric families in the Prometheus text format, preserving their order
pub fn render(families: &[MetricFamily]) -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new(NAMESPACE).expect("Failed to create metric registry")
    }
}
