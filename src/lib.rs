//! Kibana Prometheus Exporter
//!
//! Polls one or more Kibana instances for their `/api/status` document and republishes
//! selected fields as Prometheus gauges.
//!
//! # Overview
//!
//! Every request to the metrics endpoint selects one configured target (by the
//! `target` query parameter, or the first target by default), fetches its status once,
//! and maps the result into a fixed set of `kibana_*` gauges. Nothing is cached
//! between scrapes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐   GET /api/status    ┌─────────────────────┐
//! │   Kibana    │ ◄──────────────────  │      Exporter       │
//! │  (targets)  │        JSON          │                     │      HTTP      ┌────────────┐
//! └─────────────┘                      │  StatusCollector(s) │ ◄────────────► │ Prometheus │
//!                                      │  ExportCoordinator  │   /metrics     └────────────┘
//!                                      │  MetricRegistry     │
//!                                      └─────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`kibana`] - Target profiles, status API client and payload types
//! - [`metrics`] - Prometheus gauge definitions and text rendering
//! - [`exporter`] - Collection cycle: target binding, scrape, mapping, emission
//! - [`server`] - HTTP server, readiness phase and dry-run mode
//! - [`config`] - Configuration file loading and target validation
//! - [`error`] - Error types
//!
//! # Quick Start
//!
//! ```no_run
//! use kibana_exporter::{config::{Config, ServerConfig}, exporter::ExportCoordinator, kibana::StatusCollector, server};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/kibana_exporter.yml")?;
//!     let collectors = config
//!         .targets()?
//!         .into_iter()
//!         .map(StatusCollector::new)
//!         .collect::<Result<Vec<_>, _>>()?;
//!     let coordinator = Arc::new(ExportCoordinator::new(collectors, "kibana")?);
//!     server::start(ServerConfig::default(), coordinator).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod exporter;
pub mod kibana;
pub mod metrics;
pub mod server;
