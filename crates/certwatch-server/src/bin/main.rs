//! certwatch CLI
//!
//! # Usage
//!
//! ```bash
//! # Summarize certificates from a file
//! certwatch summarize --certs certs.json --now 2024-03-01
//!
//! # Run the registered alert rules once
//! certwatch --config certwatch.toml evaluate --rule certwatch.alerts.tls
//!
//! # List the HTTP routes that `serve` registers
//! certwatch routes
//!
//! # Serve the HTTP API
//! certwatch --config certwatch.toml serve --port 8080
//! ```

use anyhow::{Context, Result};
use certwatch_core::{get_cert_summary, parse_timestamp, Thresholds};
use certwatch_server::{bootstrap, plugin_setup, CertSource, CertwatchConfig, StaticCertSource};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Certificate lifecycle alerting
#[derive(Parser, Debug)]
#[command(name = "certwatch")]
#[command(about = "Certificate lifecycle alerting", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (.toml, .yaml or .yml)
    #[arg(short, long, global = true, env = "CERTWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Days before expiry at which a certificate is expiring
    #[arg(long, global = true)]
    expiration_days: Option<u32>,

    /// Certificate age in days at which rotation is due
    #[arg(long, global = true)]
    age_days: Option<u32>,

    /// Emit JSON log lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarize certificates read from a JSON or YAML file
    Summarize {
        /// Certificate list file; defaults to the configured source
        #[arg(long)]
        certs: Option<PathBuf>,

        /// Evaluation instant (RFC 3339 or YYYY-MM-DD); defaults to now
        #[arg(long, value_parser = parse_instant)]
        now: Option<DateTime<Utc>>,

        /// Include healthy certificates in the output
        #[arg(long)]
        all: bool,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Execute registered alert rules once and print their alerts
    Evaluate {
        /// Rule type id; all rules when omitted
        #[arg(long)]
        rule: Option<String>,

        #[arg(long, value_parser = parse_instant)]
        now: Option<DateTime<Utc>>,
    },

    /// List the HTTP routes registered by `serve`
    Routes,

    /// Serve the HTTP API
    Serve {
        #[arg(long, env = "CERTWATCH_HOST")]
        host: Option<String>,

        #[arg(short, long, env = "CERTWATCH_PORT")]
        port: Option<u16>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn parse_instant(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    parse_timestamp(value).map_err(|e| e.to_string())
}

fn load_config(cli: &Cli) -> Result<CertwatchConfig> {
    let mut config = CertwatchConfig::load_layered(cli.config.as_deref())
        .context("failed to load configuration")?;

    if let Some(days) = cli.expiration_days {
        config.tls.expiration_threshold_days = days;
    }
    if let Some(days) = cli.age_days {
        config.tls.age_threshold_days = days;
    }
    if let Command::Serve { host, port } = &cli.command {
        if let Some(host) = host {
            config.server.host = host.clone();
        }
        if let Some(port) = port {
            config.server.port = *port;
        }
    }
    if cli.log_json {
        config.logging.json = true;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Subscriber active while configuration loads, before `init_tracing`
///
/// Only `RUST_LOG` drives it; the configured level is not known yet.
fn startup_subscriber() -> impl tracing::Subscriber + Send + Sync {
    fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish()
}

fn init_tracing(config: &CertwatchConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

fn summarize(
    config: &CertwatchConfig,
    certs: Option<PathBuf>,
    now: Option<DateTime<Utc>>,
    all: bool,
    format: OutputFormat,
) -> Result<()> {
    let path = certs
        .or_else(|| config.sources.certificates.clone())
        .context("no certificate file given; pass --certs or set sources.certificates")?;
    let source = StaticCertSource::from_file(&path)
        .with_context(|| format!("failed to load certificates from {}", path.display()))?;
    let certificates = source.certificates()?;

    let now = now.unwrap_or_else(Utc::now);
    let thresholds = Thresholds::from_settings(now, &config.tls)?;
    let localizer = config.localizer();

    let summaries: Vec<_> = certificates
        .iter()
        .map(|cert| get_cert_summary(cert, &thresholds, now, &localizer))
        .filter(|summary| all || summary.is_alerting())
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summaries)?),
        OutputFormat::Text => {
            for summary in &summaries {
                let name = if summary.common_name.is_empty() {
                    "<unnamed>"
                } else {
                    summary.common_name.as_str()
                };
                println!(
                    "{:<40} {:<9} {}",
                    name,
                    summary.state.to_string(),
                    summary.summary
                );
            }
            println!(
                "{} of {} certificates need attention",
                summaries.iter().filter(|s| s.is_alerting()).count(),
                certificates.len()
            );
        }
    }
    Ok(())
}

async fn serve(config: &CertwatchConfig) -> Result<()> {
    let setup = plugin_setup(config)?;
    let service = bootstrap(setup, Arc::new(Utc::now))?;

    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;
    tracing::info!(address = %address, routes = service.routes.len(), "certwatch listening");

    let app = service.router.layer(TraceLayer::new_for_http());
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = tracing::subscriber::with_default(startup_subscriber(), || load_config(&cli))?;
    init_tracing(&config);

    match cli.command {
        Command::Summarize {
            certs,
            now,
            all,
            format,
        } => summarize(&config, certs, now, all, format),
        Command::Evaluate { rule, now } => {
            let service = bootstrap(plugin_setup(&config)?, Arc::new(Utc::now))?;
            let now = now.unwrap_or_else(Utc::now);
            let ids: Vec<String> = match rule {
                Some(id) => vec![id],
                None => service.descriptors.iter().map(|d| d.id.clone()).collect(),
            };

            let mut report = serde_json::Map::new();
            for id in ids {
                let alerts = service.rules.execute(&id, now, None)?;
                report.insert(id, serde_json::to_value(alerts)?);
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::Routes => {
            let service = bootstrap(plugin_setup(&config)?, Arc::new(Utc::now))?;
            for route in &service.routes {
                println!(
                    "{:<7} {:<50} {}",
                    route.method,
                    route.path,
                    route.access.as_str()
                );
            }
            Ok(())
        }
        Command::Serve { .. } => serve(&config).await,
    }
}
