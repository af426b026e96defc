//! Configuration loading and constants.
//!
//! Loads application configuration from an optional TOML file and defines the
//! defaults for the HTTP listener, fault injection timing, load generation
//! bounds and logging. `AppConfig` is the root configuration struct; it is built
//! once in `main` and handed to the router and server, nothing else reads the
//! environment.

use const_format::formatcp;
use serde::Deserialize;
use std::path::Path;

// =============================================================================
// HTTP Listener
// =============================================================================

/// Default bind address (all interfaces, as inside a container)
pub const DEFAULT_HTTP_HOST: &str = "0.0.0.0";

/// Default port when neither the config file nor `PORT` provide one
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Seconds to wait for open connections on SIGTERM/SIGINT
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 30;

/// Environment variable that overrides `http.port`
pub const PORT_ENV_VAR: &str = "PORT";

// =============================================================================
// CORS
// =============================================================================
// Every response carries permissive cross-origin headers so the browser UI can
// call the API from another origin.

pub const CORS_ALLOW_ORIGIN: &str = "*";
pub const CORS_ALLOW_METHODS: &str = "GET, POST, OPTIONS";
pub const CORS_ALLOW_HEADERS: &str = "Content-Type";

// =============================================================================
// Fault Injection
// =============================================================================

/// Delay between the crash response leaving the handler and process exit
pub const DEFAULT_CRASH_DELAY_MS: u64 = 200;

/// Exit status used for a deliberate crash
pub const DEFAULT_CRASH_EXIT_CODE: i32 = 1;

/// Body message returned by the crash endpoint
pub const CRASH_MESSAGE: &str = "Backend will crash now";

// =============================================================================
// Load Generation
// =============================================================================

/// Largest Fibonacci index whose value still fits in a u64
pub const FIBONACCI_MAX_REPRESENTABLE_N: u64 = 93;

/// Shipped default for `load.max_n`.
///
/// Naive recursion at this index takes around a second; every step up
/// multiplies the cost by ~1.6 and a running computation cannot be cancelled.
pub const DEFAULT_MAX_N: u64 = 40;

/// Fibonacci index computed per unit of batch load
pub const DEFAULT_BATCH_N: u64 = 20;

/// Upper bound on the number of computations in one batch request
pub const DEFAULT_MAX_BATCH_COUNT: u64 = 10_000;

// =============================================================================
// Logging
// =============================================================================

/// Crate name as it appears in tracing targets
pub const CRATE_TARGET: &str = "imakube_backend";

/// Default log filter when neither `--log-level` nor RUST_LOG is set
pub const DEFAULT_LOG_FILTER: &str = formatcp!("{}=debug,tower_http=info", CRATE_TARGET);

/// Default log format (text or json)
pub const DEFAULT_LOG_FORMAT: &str = "text";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// HTTP listener configuration
    #[serde(default)]
    pub http: HttpServerConfig,
    /// Crash endpoint behaviour
    #[serde(default)]
    pub fault: FaultConfig,
    /// Load generation bounds
    #[serde(default)]
    pub load: LoadConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "HttpServerConfig::default_host")]
    pub host: String,
    #[serde(default = "HttpServerConfig::default_port")]
    pub port: u16,
    /// Graceful shutdown window in seconds
    #[serde(default = "HttpServerConfig::default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            shutdown_grace_seconds: Self::default_shutdown_grace(),
        }
    }
}

impl HttpServerConfig {
    fn default_host() -> String {
        DEFAULT_HTTP_HOST.to_string()
    }

    fn default_port() -> u16 {
        DEFAULT_HTTP_PORT
    }

    fn default_shutdown_grace() -> u64 {
        DEFAULT_SHUTDOWN_GRACE_SECS
    }
}

/// Crash endpoint settings
#[derive(Debug, Clone, Deserialize)]
pub struct FaultConfig {
    /// Milliseconds between response delivery and process exit
    #[serde(default = "FaultConfig::default_crash_delay")]
    pub crash_delay_ms: u64,
    /// Process exit status, must be non-zero
    #[serde(default = "FaultConfig::default_exit_code")]
    pub exit_code: i32,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            crash_delay_ms: Self::default_crash_delay(),
            exit_code: Self::default_exit_code(),
        }
    }
}

impl FaultConfig {
    fn default_crash_delay() -> u64 {
        DEFAULT_CRASH_DELAY_MS
    }

    fn default_exit_code() -> i32 {
        DEFAULT_CRASH_EXIT_CODE
    }
}

/// Load generation settings
#[derive(Debug, Clone, Deserialize)]
pub struct LoadConfig {
    /// Largest accepted `n` for `GET /generate-load`.
    ///
    /// Never above 93 (the u64 limit). The work runs to completion on a
    /// blocking thread even if the client goes away, so large values can pin
    /// a thread practically forever.
    #[serde(default = "LoadConfig::default_max_n")]
    pub max_n: u64,
    /// Fibonacci index computed per batch unit
    #[serde(default = "LoadConfig::default_batch_n")]
    pub batch_n: u64,
    /// Largest accepted `count` for `POST /generate-load`
    #[serde(default = "LoadConfig::default_max_batch_count")]
    pub max_batch_count: u64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            max_n: Self::default_max_n(),
            batch_n: Self::default_batch_n(),
            max_batch_count: Self::default_max_batch_count(),
        }
    }
}

impl LoadConfig {
    fn default_max_n() -> u64 {
        DEFAULT_MAX_N
    }

    fn default_batch_n() -> u64 {
        DEFAULT_BATCH_N
    }

    fn default_max_batch_count() -> u64 {
        DEFAULT_MAX_BATCH_COUNT
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "text" (human-readable, default) or "json" (structured)
    #[serde(default = "LoggingConfig::default_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: DEFAULT_LOG_FORMAT.to_string(),
        }
    }
}

impl LoggingConfig {
    fn default_format() -> String {
        DEFAULT_LOG_FORMAT.to_string()
    }

    pub fn is_json(&self) -> bool {
        self.format == "json"
    }
}

impl AppConfig {
    /// Load configuration from a TOML file and validate it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply the value of the `PORT` environment variable, if any.
    ///
    /// Accepts both `8080` and `:8080`. An empty value counts as unset.
    pub fn with_port_override(mut self, port: Option<&str>) -> Result<Self, ConfigError> {
        let Some(raw) = port.map(str::trim).filter(|p| !p.is_empty()) else {
            return Ok(self);
        };

        let digits = raw.strip_prefix(':').unwrap_or(raw);
        self.http.port = digits.parse().map_err(|_| {
            ConfigError::Validation(format!("{PORT_ENV_VAR} must be a TCP port, got '{raw}'"))
        })?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fault.exit_code == 0 {
            return Err(ConfigError::Validation(
                "fault.exit_code must be non-zero".to_string(),
            ));
        }

        if self.load.max_n > FIBONACCI_MAX_REPRESENTABLE_N {
            return Err(ConfigError::Validation(format!(
                "load.max_n must be at most {FIBONACCI_MAX_REPRESENTABLE_N}, got {}",
                self.load.max_n
            )));
        }

        if self.load.batch_n > self.load.max_n {
            return Err(ConfigError::Validation(format!(
                "load.batch_n ({}) exceeds load.max_n ({})",
                self.load.batch_n, self.load.max_n
            )));
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return Err(ConfigError::Validation(format!(
                "logging.format must be \"text\" or \"json\", got \"{}\"",
                self.logging.format
            )));
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Configuration error: {0}")]
    Validation(String),
}
