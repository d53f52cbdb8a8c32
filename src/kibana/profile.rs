//! Target Profiles
//!
//! A [`TargetProfile`] is the validated, fully-defaulted description of one Kibana
//! instance. Profiles come either from a configuration record
//! ([`crate::config::TargetConfig::validate`]) or from a single URL given on the
//! command line ([`TargetProfile::from_url`]). The base URL is derived once, when the
//! profile is built, and never changes afterwards.

use crate::error::{ExporterError, Result};
use regex::Regex;
use secrecy::SecretString;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Port Kibana listens on out of the box
pub const DEFAULT_PORT: u16 = 5601;
pub const DEFAULT_HOST: &str = "localhost";

/// `scheme://host[:port][/path]`, as accepted on the command line
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^(?i:(https?))://([^:/\s]+)(?::(\d+))?(/[^\s?#]*)?$").expect("valid url pattern")
});

/// URL scheme used to reach a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    pub fn is_tls(&self) -> bool {
        matches!(self, Scheme::Https)
    }

    /// Port implied by a URL of this scheme that names none
    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("http") {
            Ok(Scheme::Http)
        } else if s.eq_ignore_ascii_case("https") {
            Ok(Scheme::Https)
        } else {
            Err(())
        }
    }
}

/// Validated description of one Kibana endpoint
#[derive(Debug, Clone)]
pub struct TargetProfile {
    name: String,
    scheme: Scheme,
    host: String,
    port: u16,
    username: Option<String>,
    password: Option<SecretString>,
    skip_tls: bool,
    wait: bool,
    base_url: String,
}

impl TargetProfile {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        name: String,
        scheme: Scheme,
        host: String,
        port: u16,
        username: Option<String>,
        password: Option<SecretString>,
        skip_tls: bool,
        wait: bool,
    ) -> Self {
        let base_url = format!("{}://{}:{}", scheme, host, port);
        Self::with_base_url(
            name, scheme, host, port, username, password, skip_tls, wait, base_url,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn with_base_url(
        name: String,
        scheme: Scheme,
        host: String,
        port: u16,
        username: Option<String>,
        password: Option<SecretString>,
        skip_tls: bool,
        wait: bool,
        base_url: String,
    ) -> Self {
        Self {
            name,
            scheme,
            host,
            port,
            username,
            password,
            skip_tls,
            wait,
            base_url,
        }
    }

    /// Build a profile from a complete `scheme://host[:port][/path]` URL.
    ///
    /// Scheme, host and port are taken from the URL as-is and bypass the defaulting
    /// rules of configuration records. Without a port the scheme's own port applies
    /// (80 or 443) and the base URL keeps the authority as written. A path, such as a
    /// Kibana `server.basePath`, is kept in the base URL.
    ///
    /// # Example
    ///
    /// ```
    /// use kibana_exporter::kibana::{Scheme, TargetProfile};
    ///
    /// let profile = TargetProfile::from_url("default", "https://example.org:9201", None, None, false, false)?;
    /// assert_eq!(profile.scheme(), Scheme::Https);
    /// assert_eq!(profile.host(), "example.org");
    /// assert_eq!(profile.port(), 9201);
    ///
    /// let proxied = TargetProfile::from_url("default", "https://example.org/kibana/", None, None, false, false)?;
    /// assert_eq!(proxied.port(), 443);
    /// assert_eq!(proxied.base_url(), "https://example.org/kibana");
    /// # Ok::<(), kibana_exporter::error::ExporterError>(())
    /// ```
    pub fn from_url(
        name: &str,
        url: &str,
        username: Option<String>,
        password: Option<SecretString>,
        skip_tls: bool,
        wait: bool,
    ) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(ExporterError::Config(
                "target must have the field name set".to_string(),
            ));
        }

        let url = url.trim();
        let url = url.strip_suffix('/').unwrap_or(url);
        let captures = URL_PATTERN
            .captures(url)
            .ok_or_else(|| ExporterError::invalid_field(name, "uri", url))?;

        let scheme = captures[1]
            .parse::<Scheme>()
            .map_err(|_| ExporterError::invalid_field(name, "uri", url))?;
        let host = captures[2].to_string();
        let path = captures.get(4).map_or("", |path| path.as_str());

        let (port, authority) = match captures.get(3) {
            Some(port) => {
                let number = port
                    .as_str()
                    .parse::<u16>()
                    .map_err(|_| ExporterError::invalid_field(name, "port", port.as_str()))?;
                (number, format!("{}:{}", host, number))
            }
            None => (scheme.default_port(), host.clone()),
        };
        let base_url = format!("{}://{}{}", scheme, authority, path);

        Ok(Self::with_base_url(
            name.to_string(),
            scheme,
            host,
            port,
            username,
            password,
            skip_tls,
            wait,
            base_url,
        ))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn password(&self) -> Option<&SecretString> {
        self.password.as_ref()
    }

    /// Skip certificate verification (only honoured for https)
    pub fn skip_tls(&self) -> bool {
        self.skip_tls
    }

    /// Block at startup until the target answers
    pub fn wait(&self) -> bool {
        self.wait
    }

    /// `scheme://host:port`, or the URL given to [`TargetProfile::from_url`], computed
    /// once at construction
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
