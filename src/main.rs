//! depcheck: a health-check endpoint for bound backing services.
//!
//! This is the application entry point. It loads the optional settings file,
//! initializes tracing, decodes the relationships from the environment (failing
//! before anything binds if they are missing or malformed), wires the probes
//! and starts the HTTP server.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use depcheck::checker::HealthChecker;
use depcheck::config::{AppConfig, LoggingConfig, Settings, DEFAULT_LOG_FILTER};
use depcheck::http::start_server;
use depcheck::routes::create_router;
use depcheck::state::AppState;

/// depcheck: Report the health of bound MySQL, Redis and Elasticsearch services
#[derive(Parser, Debug)]
#[command(name = "depcheck", version, about)]
struct Args {
    /// Path to an optional TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level filter (e.g., "depcheck=debug,tower_http=info")
    #[arg(short, long)]
    log_level: Option<String>,

    /// Log format: "text" or "json" (overrides the settings file)
    #[arg(long)]
    log_format: Option<String>,
}

fn init_tracing(filter: &str, logging: &LoggingConfig) {
    let registry = tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(filter));

    if logging.is_json() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args = Args::parse();

    // Settings are needed before tracing so the log format is known
    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(format) = args.log_format {
        settings.logging.format = format;
    }

    // Initialize tracing with priority: CLI > env > default
    let log_filter = args
        .log_level
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
    init_tracing(&log_filter, &settings.logging);

    // Fail fast: never serve a report built from missing or malformed relationships
    let config = AppConfig::from_env(settings).map_err(|e| {
        tracing::error!(error = %e, "Invalid configuration, refusing to start");
        e
    })?;

    tracing::info!(
        timeout_secs = config.probes.timeout().as_secs(),
        "Loaded configuration"
    );

    let checker = HealthChecker::from_config(&config)?;

    // Log configured services
    for kind in checker.kinds() {
        if let Some(instance) = config.relationships.first(kind) {
            tracing::info!(
                service = %kind,
                host = %instance.host,
                port = ?instance.port,
                has_auth = instance.has_credentials(),
                "Backing service configured"
            );
        }
    }

    let app = create_router(AppState::new(checker));

    start_server(app, &config.http).await?;

    Ok(())
}
