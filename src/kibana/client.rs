//! Kibana Status API Client
//!
//! A [`StatusCollector`] owns one [`TargetProfile`] and an HTTP client configured for
//! it. Each [`StatusCollector::scrape`] is exactly one `GET {base_url}/api/status`
//! round trip: no retries, no caching.
//!
//! # Authentication
//!
//! When both a username and a password are configured, a `Basic` authorization value
//! is computed once at construction and attached to every request. Otherwise no
//! `Authorization` header is ever sent.
//!
//! # TLS
//!
//! For `https` targets the `skip_tls` flag disables certificate verification. For
//! `http` targets the flag has no effect and is only reported in the logs.

use crate::error::{ExporterError, Result};
use crate::kibana::profile::TargetProfile;
use crate::kibana::types::StatusPayload;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Delay between two readiness probes
pub const WAIT_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Request timeout used by [`StatusCollector::new`]
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Compute the `Authorization` value for a pair of credentials.
///
/// Returns `None` unless both parts are non-empty.
///
/// ```
/// use kibana_exporter::kibana::basic_auth_header;
///
/// assert_eq!(
///     basic_auth_header(Some("kibanau"), Some("kibanap")).as_deref(),
///     Some("Basic a2liYW5hdTpraWJhbmFw")
/// );
/// assert_eq!(basic_auth_header(Some("kibanau"), None), None);
/// ```
pub fn basic_auth_header(username: Option<&str>, password: Option<&str>) -> Option<String> {
    match (username, password) {
        (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => {
            let encoded = STANDARD.encode(format!("{}:{}", user, pass));
            Some(format!("Basic {}", encoded))
        }
        _ => None,
    }
}

/// Fetches and decodes the status document of one Kibana target
///
/// The reachability flag only reflects the outcome of the latest fetch. It is an
/// atomic so that the collector can be probed at startup and scraped from the
/// exporter's serialized collection cycle through a shared reference.
pub struct StatusCollector {
    profile: TargetProfile,
    client: Client,
    auth_header: Option<String>,
    state: AtomicBool,
}

impl StatusCollector {
    pub fn new(profile: TargetProfile) -> Result<Self> {
        Self::with_timeout(profile, DEFAULT_TIMEOUT)
    }

    /// Build a collector whose requests are bounded by `timeout`.
    ///
    /// Fails only when the underlying HTTP client cannot be built.
    pub fn with_timeout(profile: TargetProfile, timeout: Duration) -> Result<Self> {
        let mut builder = Client::builder().timeout(timeout);

        if profile.scheme().is_tls() {
            debug!("Kibana URL is a TLS one: {}", profile.base_url());
            if profile.skip_tls() {
                info!(
                    "Skipping TLS verification for Kibana URL: {}",
                    profile.base_url()
                );
            }
            builder = builder.danger_accept_invalid_certs(profile.skip_tls());
        } else {
            debug!("Kibana URL is a plain text one: {}", profile.base_url());
            if profile.skip_tls() {
                warn!(
                    "skip-tls is enabled for an http URL, ignoring: {}",
                    profile.base_url()
                );
            }
        }

        let client = builder.build().map_err(|e| {
            ExporterError::Config(format!(
                "could not build HTTP client for target '{}': {}",
                profile.name(),
                e
            ))
        })?;

        let auth_header = basic_auth_header(
            profile.username(),
            profile.password().map(|p| p.expose_secret()),
        );
        if auth_header.is_some() {
            debug!("Using authenticated requests with Kibana '{}'", profile.name());
        } else {
            info!(
                "Kibana username or password is not provided for '{}', assuming unauthenticated communication",
                profile.name()
            );
        }

        Ok(Self {
            profile,
            client,
            auth_header,
            state: AtomicBool::new(false),
        })
    }

    pub fn name(&self) -> &str {
        self.profile.name()
    }

    pub fn profile(&self) -> &TargetProfile {
        &self.profile
    }

    /// Precomputed `Authorization` value, if credentials were configured
    pub fn auth_header(&self) -> Option<&str> {
        self.auth_header.as_deref()
    }

    /// Reachability observed by the most recent fetch
    pub fn state(&self) -> bool {
        self.state.load(Ordering::SeqCst)
    }

    fn status_url(&self) -> String {
        format!("{}/api/status", self.profile.base_url())
    }

    /// Fetch and decode the status document
    ///
    /// # Errors
    ///
    /// - [`ExporterError::Transport`] when the request cannot be sent or the response
    ///   status is not `200`. Reachability becomes `false`.
    /// - [`ExporterError::Transport`] when the body of a `200` response cannot be read,
    ///   and [`ExporterError::Decode`] when it is not a status document. The target did
    ///   answer, so reachability stays `true`.
    pub async fn scrape(&self) -> Result<StatusPayload> {
        let url = self.status_url();
        debug!("Requesting api/status from {}", url);

        let mut request = self.client.get(&url).header(ACCEPT, "application/json");
        if let Some(auth) = &self.auth_header {
            let mut value = HeaderValue::from_str(auth)
                .map_err(|e| ExporterError::Transport(format!("invalid auth header: {}", e)))?;
            value.set_sensitive(true);
            request = request.header(AUTHORIZATION, value);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                self.state.store(false, Ordering::SeqCst);
                return Err(ExporterError::Transport(format!(
                    "error while reading Kibana status from {}: {}",
                    url, e
                )));
            }
        };

        if response.status() != StatusCode::OK {
            self.state.store(false, Ordering::SeqCst);
            return Err(ExporterError::Transport(format!(
                "invalid response from Kibana status: {}",
                response.status()
            )));
        }

        // The target answered: it stays reachable even if the body is unusable
        self.state.store(true, Ordering::SeqCst);
        let body = response.text().await.map_err(|e| {
            ExporterError::Transport(format!(
                "error while reading response from Kibana status: {}",
                e
            ))
        })?;

        debug!("Processing api/status response from '{}'", self.name());
        serde_json::from_str(&body).map_err(|source| ExporterError::Decode { source, body })
    }

    /// Scrape once and report whether it succeeded
    pub async fn test_connection(&self) -> bool {
        debug!("Checking Kibana status for '{}'", self.name());
        match self.scrape().await {
            Ok(_) => true,
            Err(e) => {
                info!("Test connection to Kibana '{}' failed: {}", self.name(), e);
                false
            }
        }
    }

    /// Block until the target answers, probing every [`WAIT_RETRY_DELAY`]
    pub async fn wait_until_ready(&self) {
        self.wait_until_ready_with(WAIT_RETRY_DELAY, None).await;
    }

    /// Probe until the target answers or `max_attempts` probes have failed.
    ///
    /// `None` means no limit. Returns whether the target became ready.
    pub async fn wait_until_ready_with(&self, delay: Duration, max_attempts: Option<u32>) -> bool {
        let mut attempts: u32 = 0;
        loop {
            attempts = attempts.saturating_add(1);
            if self.test_connection().await {
                info!("Kibana '{}' is up", self.name());
                return true;
            }

            if max_attempts.is_some_and(|max| attempts >= max) {
                warn!(
                    "Kibana '{}' still unreachable after {} attempts",
                    self.name(),
                    attempts
                );
                return false;
            }

            info!("Waiting for Kibana '{}' to be responsive", self.name());
            tokio::time::sleep(delay).await;
        }
    }
}
