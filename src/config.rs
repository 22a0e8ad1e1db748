//! Configuration loading and constants.
//!
//! Platform-provided values (the relationships blob and the listen port) come
//! from environment variables; tuning knobs (bind host, probe timeout, log
//! format) come from an optional TOML settings file. `AppConfig` is the root
//! configuration struct and is built once at startup, before the listener binds.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use base64::Engine;
use const_format::formatcp;
use serde::{Deserialize, Serialize};

// =============================================================================
// Environment
// =============================================================================

/// Base64-encoded JSON map of service kind to instance descriptors
pub const RELATIONSHIPS_ENV: &str = "PLATFORM_RELATIONSHIPS";

/// TCP port to listen on
pub const PORT_ENV: &str = "PORT";

/// Overrides `[probes] timeout_seconds`
pub const PROBE_TIMEOUT_ENV: &str = "HEALTH_PROBE_TIMEOUT_SECS";

// =============================================================================
// Probe Constants
// =============================================================================

/// Default per-probe timeout in seconds
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;

pub const MYSQL_DEFAULT_PORT: u16 = 3306;
pub const REDIS_DEFAULT_PORT: u16 = 6379;
pub const ELASTICSEARCH_DEFAULT_PORT: u16 = 9200;

/// Prefix of the throwaway key written by the Redis probe
pub const REDIS_PROBE_KEY_PREFIX: &str = "depcheck-";

/// Value written by the Redis probe
pub const REDIS_PROBE_VALUE: &str = "bar";

/// Expiry on the Redis probe key, in case the explicit DEL never runs
pub const REDIS_PROBE_KEY_TTL_SECS: u64 = 60;

/// Index and document id overwritten by the Elasticsearch probe
pub const ELASTICSEARCH_PROBE_INDEX: &str = "test-index";
pub const ELASTICSEARCH_PROBE_DOC_ID: &str = "1";

/// User-Agent sent by the Elasticsearch probe
pub const PROBE_USER_AGENT: &str =
    formatcp!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

// =============================================================================
// HTTP Constants
// =============================================================================

/// Loopback bind address unless the settings file says otherwise
pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";

/// Dependency reports are never cacheable
pub const CACHE_CONTROL_REPORT: &str = "no-store";

/// Connection drain window after SIGINT/SIGTERM
pub const SHUTDOWN_GRACE_SECS: u64 = 10;

// =============================================================================
// Logging
// =============================================================================

/// Default log filter when neither --log-level nor RUST_LOG is set
pub const DEFAULT_LOG_FILTER: &str = "depcheck=info,tower_http=info";

/// Default log format (text or json)
pub const DEFAULT_LOG_FORMAT: &str = "text";

// =============================================================================
// Relationships
// =============================================================================

/// Kind of backing service probed by the report endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Mysql,
    Redis,
    Elasticsearch,
}

impl ServiceKind {
    /// Every kind, in the order they appear in the report.
    pub const ALL: [ServiceKind; 3] = [
        ServiceKind::Mysql,
        ServiceKind::Redis,
        ServiceKind::Elasticsearch,
    ];

    /// Key used both in the relationships blob and in the JSON report
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Mysql => "mysql",
            ServiceKind::Redis => "redis",
            ServiceKind::Elasticsearch => "elasticsearch",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection parameters for one bound backing-service instance.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct InstanceDescriptor {
    pub host: String,
    /// Omitted when the service listens on its default port
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Database name, where the service has one
    #[serde(default)]
    pub path: Option<String>,
    /// URL scheme for HTTP-based services (default: http)
    #[serde(default)]
    pub scheme: Option<String>,
}

impl InstanceDescriptor {
    /// Descriptor with only a host set
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            username: None,
            password: None,
            path: None,
            scheme: None,
        }
    }

    /// Get effective port (descriptor port or the service default)
    pub fn port_or(&self, default: u16) -> u16 {
        self.port.unwrap_or(default)
    }

    /// Check if credentials are configured (both username and password)
    pub fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }
}

// Manual impl so passwords never end up in logs.
impl fmt::Debug for InstanceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceDescriptor")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("path", &self.path)
            .field("scheme", &self.scheme)
            .finish()
    }
}

/// Map from service kind name to its provisioned instances.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Relationships(HashMap<String, Vec<InstanceDescriptor>>);

impl Relationships {
    /// Decode the base64-encoded JSON document found in `PLATFORM_RELATIONSHIPS`.
    pub fn decode(encoded: &str) -> Result<Self, ConfigError> {
        let bytes = base64::engine::general_purpose::STANDARD.decode(encoded.trim())?;
        let json = String::from_utf8(bytes)?;
        let relationships: Relationships = serde_json::from_str(&json)?;
        relationships.validate()?;
        Ok(relationships)
    }

    /// First instance bound for a kind. Validation guarantees it exists for
    /// every kind in [`ServiceKind::ALL`].
    pub fn first(&self, kind: ServiceKind) -> Option<&InstanceDescriptor> {
        self.0.get(kind.as_str()).and_then(|instances| instances.first())
    }

    /// Every probed kind must be bound to at least one instance. Kinds this
    /// service does not probe are carried along unchecked.
    fn validate(&self) -> Result<(), ConfigError> {
        let empty = ServiceKind::ALL
            .iter()
            .find(|kind| self.0.get(kind.as_str()).is_some_and(|instances| instances.is_empty()));
        if let Some(kind) = empty {
            return Err(ConfigError::Validation(format!(
                "relationship '{}' has no instances",
                kind
            )));
        }

        let missing: Vec<&str> = ServiceKind::ALL
            .iter()
            .filter(|kind| !self.0.contains_key(kind.as_str()))
            .map(|kind| kind.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Validation(format!(
                "missing relationships: {}",
                missing.join(", ")
            )));
        }

        Ok(())
    }
}

impl From<HashMap<String, Vec<InstanceDescriptor>>> for Relationships {
    fn from(map: HashMap<String, Vec<InstanceDescriptor>>) -> Self {
        Self(map)
    }
}

// =============================================================================
// Settings file
// =============================================================================

/// Optional TOML settings. Every section and key has a default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub probes: ProbeSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpSettings {
    #[serde(default = "HttpSettings::default_host")]
    pub host: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
        }
    }
}

impl HttpSettings {
    fn default_host() -> String {
        DEFAULT_HTTP_HOST.to_string()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbeSettings {
    /// Upper bound on a single probe, connection setup included
    #[serde(default = "ProbeSettings::default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: Self::default_timeout(),
        }
    }
}

impl ProbeSettings {
    fn default_timeout() -> u64 {
        DEFAULT_PROBE_TIMEOUT_SECS
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
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
        self.format.eq_ignore_ascii_case("json")
    }
}

impl Settings {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }
}

// =============================================================================
// Root configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP server configuration
    pub http: HttpServerConfig,
    /// Bound backing services
    pub relationships: Relationships,
    pub probes: ProbeSettings,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    /// Build the configuration from the process environment.
    pub fn from_env(settings: Settings) -> Result<Self, ConfigError> {
        Self::from_lookup(settings, |name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(settings: Settings, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let encoded = lookup(RELATIONSHIPS_ENV).ok_or(ConfigError::MissingVar(RELATIONSHIPS_ENV))?;
        let relationships = Relationships::decode(&encoded)?;

        let port_raw = lookup(PORT_ENV).ok_or(ConfigError::MissingVar(PORT_ENV))?;
        let port = port_raw
            .trim()
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidVar(PORT_ENV, e.to_string()))?;

        let mut probes = settings.probes;
        if let Some(raw) = lookup(PROBE_TIMEOUT_ENV) {
            probes.timeout_seconds = raw
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::InvalidVar(PROBE_TIMEOUT_ENV, e.to_string()))?;
        }
        if probes.timeout_seconds == 0 {
            return Err(ConfigError::Validation(
                "probe timeout must be at least one second".to_string(),
            ));
        }

        Ok(Self {
            http: HttpServerConfig {
                host: settings.http.host,
                port,
            },
            relationships,
            probes,
            logging: settings.logging,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment variable {0} is not set")]
    MissingVar(&'static str),
    #[error("Environment variable {0} is invalid: {1}")]
    InvalidVar(&'static str, String),
    #[error("Relationships are not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Relationships are not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("Relationships are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("Configuration error: {0}")]
    Validation(String),
}
