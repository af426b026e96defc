//! imakube-backend: demo service for load balancing, probing and fault injection.
//!
//! This is the application entry point. It parses the command line, loads
//! configuration (optional TOML file plus the `PORT` environment variable),
//! initializes tracing, builds the Axum router and starts the HTTP server.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use imakube_backend::config::{AppConfig, DEFAULT_HTTP_PORT, DEFAULT_LOG_FILTER, PORT_ENV_VAR};
use imakube_backend::http::start_server;
use imakube_backend::{create_router, AppState};

/// imakube-backend: parity, load generation, liveness and crash endpoints
#[derive(Parser, Debug)]
#[command(name = "imakube-backend", version, about)]
struct Args {
    /// Path to an optional TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Log level filter (e.g., "imakube_backend=debug,tower_http=info")
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration; the environment is read here and nowhere else
    let base = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    let port_env = std::env::var(PORT_ENV_VAR).ok();
    let config = base.with_port_override(port_env.as_deref())?;

    // Initialize tracing with priority: CLI > env > default
    let log_filter = args
        .log_level
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

    let registry =
        tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(&log_filter));
    if config.logging.is_json() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let port_from_env = port_env.as_deref().is_some_and(|p| !p.trim().is_empty());
    if !port_from_env && config.http.port == DEFAULT_HTTP_PORT {
        tracing::info!("{PORT_ENV_VAR} is not set, using default port {DEFAULT_HTTP_PORT}");
    }

    tracing::info!(
        config_file = args.config.as_deref().unwrap_or("<defaults>"),
        port = config.http.port,
        crash_delay_ms = config.fault.crash_delay_ms,
        exit_code = config.fault.exit_code,
        max_n = config.load.max_n,
        "Loaded configuration"
    );

    let http_config = config.http.clone();
    let state = AppState::new(config);
    let app = create_router(state);

    start_server(app, &http_config).await?;

    Ok(())
}
