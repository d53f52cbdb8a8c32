//! Configuration
//!
//! The configuration file lists the Kibana targets to export:
//!
//! ```yaml
//! kibanas:
//!   - name: production
//!     protocol: https
//!     host: kibana.example.org
//!     port: 443
//!     username: monitor
//!     password: secret
//!     skip-tls: no
//!     wait: yes
//! ```
//!
//! Unknown fields are rejected at load time. Records are checked and defaulted by
//! [`TargetConfig::validate`], which turns them into [`TargetProfile`]s.

use crate::error::{ExporterError, Result};
use crate::kibana::profile::{Scheme, DEFAULT_HOST, DEFAULT_PORT};
use crate::kibana::TargetProfile;
use anyhow::Context;
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub kibanas: Vec<TargetConfig>,
}

/// One raw target record, as written in the configuration file
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    #[serde(default)]
    pub name: String,
    pub protocol: Option<String>,
    pub host: Option<String>,
    pub port: Option<String>,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    #[serde(rename = "skip-tls")]
    pub skip_tls: Option<String>,
    pub wait: Option<String>,
}

/// Listen surface of the exporter itself
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_address: String,
    pub metrics_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            metrics_path: default_metrics_path(),
        }
    }
}

fn default_listen_address() -> String {
    "0.0.0.0:9684".to_string()
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

/// Parse a boolean-like value: `yes`/`no`/`true`/`false`/`1`/`0`, any case
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "yes" | "true" | "1" => Some(true),
        "no" | "false" | "0" => Some(false),
        _ => None,
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        // Load environment variables from .env if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()
            .with_context(|| format!("Failed to read configuration file {}", path))?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Validate every record and build the active target set
    pub fn targets(&self) -> Result<Vec<TargetProfile>> {
        if self.kibanas.is_empty() {
            return Err(ExporterError::Config("no valid config found".to_string()));
        }

        let mut seen = HashSet::new();
        let mut profiles = Vec::with_capacity(self.kibanas.len());
        for target in &self.kibanas {
            let profile = target.validate()?;
            if !seen.insert(profile.name().to_string()) {
                return Err(ExporterError::Config(format!(
                    "duplicate target name '{}'",
                    profile.name()
                )));
            }
            profiles.push(profile);
        }
        Ok(profiles)
    }
}

impl TargetConfig {
    /// Fill protocol, host and port where they are absent or empty.
    ///
    /// Applying it more than once yields the same record.
    pub fn with_defaults(mut self) -> Self {
        if present(&self.protocol).is_none() {
            self.protocol = Some(Scheme::default().to_string());
        }
        if present(&self.host).is_none() {
            self.host = Some(DEFAULT_HOST.to_string());
        }
        if present(&self.port).is_none() {
            self.port = Some(DEFAULT_PORT.to_string());
        }
        self
    }

    /// Check the record and build its profile
    ///
    /// # Errors
    ///
    /// [`ExporterError::Config`] naming the offending field when the name is missing,
    /// the protocol is not http/https, the port is not a TCP port, or `skip-tls` /
    /// `wait` are not boolean-like.
    pub fn validate(&self) -> Result<TargetProfile> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ExporterError::Config(
                "config must have the field name set".to_string(),
            ));
        }

        let filled = self.clone().with_defaults();
        let protocol = present(&filled.protocol).unwrap_or_default();
        let scheme = protocol
            .parse::<Scheme>()
            .map_err(|_| ExporterError::invalid_field(name, "protocol", protocol))?;
        let port_value = present(&filled.port).unwrap_or_default();
        let port = port_value
            .parse::<u16>()
            .map_err(|_| ExporterError::invalid_field(name, "port", port_value))?;
        let host = present(&filled.host).unwrap_or(DEFAULT_HOST).to_string();

        let skip_tls = parse_flag(name, "skip-tls", &self.skip_tls)?;
        let wait = parse_flag(name, "wait", &self.wait)?;

        Ok(TargetProfile::new(
            name.to_string(),
            scheme,
            host,
            port,
            present(&self.username).map(str::to_string),
            self.password.clone(),
            skip_tls,
            wait,
        ))
    }
}

fn parse_flag(target: &str, field: &str, value: &Option<String>) -> Result<bool> {
    match present(value) {
        None => Ok(false),
        Some(v) => parse_bool(v).ok_or_else(|| ExporterError::invalid_field(target, field, v)),
    }
}
