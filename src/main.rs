use anyhow::{Context, Result};
use clap::Parser;
use kibana_exporter::{
    config::{Config, ServerConfig},
    exporter::ExportCoordinator,
    kibana::{client::WAIT_RETRY_DELAY, StatusCollector, TargetProfile},
    metrics::NAMESPACE,
    server,
};
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on for HTTP requests
    #[arg(long = "web.listen-address", env = "EXPORTER_ADDR", default_value = "0.0.0.0:9684")]
    listen_address: String,

    /// Path under which to expose metrics
    #[arg(long = "web.telemetry-path", default_value = "/metrics")]
    metrics_path: String,

    /// Exporter configuration file
    #[arg(short = 'c', long = "config-file", env = "KIBANA_EXPORTER_CONFIG")]
    config_file: Option<String>,

    /// Only check the configuration, print one scrape of the first target and exit
    #[arg(short = 'n', long = "dry-run")]
    dry_run: bool,

    /// Kibana URL to fetch metrics from (replaces the targets of the config file)
    #[arg(long = "kibana.uri", env = "KIBANA_URI")]
    kibana_uri: Option<String>,

    /// Username for the Kibana API
    #[arg(short = 'u', long = "kibana.username", env = "KIBANA_USERNAME")]
    kibana_username: Option<String>,

    /// Password for the Kibana API
    #[arg(short = 'p', long = "kibana.password", env = "KIBANA_PASSWORD")]
    kibana_password: Option<String>,

    /// Skip TLS verification for TLS secured Kibana URLs
    #[arg(short = 'd', long = "kibana.skip-tls")]
    kibana_skip_tls: bool,

    /// Timeout of one request to Kibana, in seconds
    #[arg(
        long = "kibana.timeout",
        default_value = "10",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    kibana_timeout: u64,

    /// Wait for Kibana to be responsive before starting
    #[arg(short = 'w', long = "wait")]
    wait: bool,

    /// Give up waiting after this many probes (waits forever when absent)
    #[arg(long = "wait.max-attempts")]
    wait_max_attempts: Option<u32>,

    /// Output verbose details during metrics collection, use for development only
    #[arg(short = 's', long = "debug")]
    debug: bool,
}

impl Args {
    /// Targets from `--kibana.uri` when given, otherwise from the config file
    fn targets(&self) -> Result<Vec<TargetProfile>> {
        if let Some(uri) = self.kibana_uri.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            let username = self
                .kibana_username
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string);
            let password = self
                .kibana_password
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(|p| SecretString::from(p.to_string()));
            let profile = TargetProfile::from_url(
                "default",
                uri,
                username,
                password,
                self.kibana_skip_tls,
                self.wait,
            )?;
            return Ok(vec![profile]);
        }

        let Some(path) = self.config_file.as_deref().filter(|p| !p.is_empty()) else {
            anyhow::bail!("No config found: use --config-file or --kibana.uri");
        };
        let config = Config::load(path)?;
        let targets = config
            .targets()
            .with_context(|| format!("Invalid configuration in {}", path))?;
        Ok(targets)
    }
}

fn build_coordinator(targets: Vec<TargetProfile>, args: &Args) -> Result<ExportCoordinator> {
    let timeout = Duration::from_secs(args.kibana_timeout);
    let collectors = targets
        .into_iter()
        .map(|profile| StatusCollector::with_timeout(profile, timeout))
        .collect::<Result<Vec<_>, _>>()?;

    let coordinator =
        ExportCoordinator::new(collectors, NAMESPACE)?.with_payload_logging(args.debug);
    Ok(coordinator)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize tracing
    let default_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Kibana Prometheus Exporter v{}",
        env!("CARGO_PKG_VERSION")
    );

    let targets = match args.targets() {
        Ok(targets) => targets,
        Err(e) => {
            error!("Error loading config: {:#}", e);
            std::process::exit(1);
        }
    };
    for target in &targets {
        info!("Kibana target '{}': {}", target.name(), target.base_url());
    }

    let coordinator = match build_coordinator(targets, &args) {
        Ok(coordinator) => Arc::new(coordinator),
        Err(e) => {
            error!("Error while initializing exporter: {:#}", e);
            std::process::exit(1);
        }
    };
    info!("Kibana exporter initialized");

    if args.dry_run {
        info!("Configuration OK, running once in dry-run mode (output to stdout)");
        match server::dry_run(&coordinator).await {
            Ok(output) => print!("{}", output),
            Err(e) => error!("Error gathering metrics: {}", e),
        }
        std::process::exit(1);
    }

    if let Err(e) =
        server::wait_for_targets(&coordinator, WAIT_RETRY_DELAY, args.wait_max_attempts).await
    {
        error!("Startup failed: {}", e);
        std::process::exit(1);
    }

    let server_config = ServerConfig {
        listen_address: args.listen_address.clone(),
        metrics_path: args.metrics_path.clone(),
    };

    // Start the metrics server
    if let Err(e) = server::start(server_config, coordinator).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
