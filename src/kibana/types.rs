//! Kibana API Type Definitions
//!
//! Serde model of the `GET /api/status` document. Only the fields the exporter maps
//! into gauges are modelled; everything else in the response is ignored.
//!
//! Every struct uses `#[serde(default)]`, so a field missing from the response
//! decodes as its zero value instead of failing the whole scrape. Example document:
//!
//! ```json
//! {
//!   "version": {"number": "7.17.1", "build_number": 46635},
//!   "status": {"overall": {"state": "green"}},
//!   "metrics": {
//!     "concurrent_connections": 3,
//!     "process": {"uptime_in_millis": 1234.5, "memory": {"heap": {"total_in_bytes": 1, "used_in_bytes": 1}}},
//!     "os": {"load": {"1m": 0.5, "5m": 0.4, "15m": 0.3}},
//!     "response_times": {"avg_in_millis": 12.0, "max_in_millis": 80.0},
//!     "requests": {"disconnects": 0, "total": 42}
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Decoded `/api/status` response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusPayload {
    pub version: VersionInfo,
    pub status: StatusInfo,
    pub metrics: StatusMetrics,
}

impl StatusPayload {
    /// Only an overall state of `green` (any case) counts as healthy
    pub fn is_healthy(&self) -> bool {
        self.status.overall.state.to_lowercase() == "green"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionInfo {
    pub number: String,
    pub build_number: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusInfo {
    pub overall: OverallStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverallStatus {
    pub state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusMetrics {
    pub concurrent_connections: i64,
    pub process: ProcessMetrics,
    pub os: OsMetrics,
    pub response_times: ResponseTimes,
    pub requests: RequestCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessMetrics {
    pub uptime_in_millis: f64,
    pub memory: ProcessMemory,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessMemory {
    pub heap: HeapUsage,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeapUsage {
    pub total_in_bytes: i64,
    pub used_in_bytes: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OsMetrics {
    pub load: LoadAverage,
}

/// 1/5/15 minute load averages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadAverage {
    #[serde(rename = "1m")]
    pub one: f64,
    #[serde(rename = "5m")]
    pub five: f64,
    #[serde(rename = "15m")]
    pub fifteen: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseTimes {
    pub avg_in_millis: f64,
    pub max_in_millis: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestCounts {
    pub disconnects: i64,
    pub total: i64,
}
