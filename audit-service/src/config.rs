//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (`AUDIT_API_KEY`, `PORT`, `APP`, ...)
//! 2. TOML file: `$AUDIT_CONFIG_FILE`, or `./config.toml` when present
//! 3. Default values
//!
//! Environment variables keep their deployment names rather than a common
//! prefix, so each one is mapped onto its config key explicitly. A blank
//! variable counts as unset.

use figment::{
    providers::{Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::audit::assembler::PlatformFields;
use crate::audit::claims::ClaimMapping;
use crate::audit::config::AuditSinkConfig;
use crate::error::{Error, Result};

/// Environment variable naming an alternate config file
pub const CONFIG_FILE_VAR: &str = "AUDIT_CONFIG_FILE";

const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Value used for platform fields that are not configured
pub const UNKNOWN: &str = "unknown";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub service: ServiceConfig,

    /// Ingest authentication
    #[serde(default)]
    pub auth: AuthConfig,

    /// Deployment fields stamped on every audit record
    #[serde(default)]
    pub platform: PlatformFields,

    /// Bearer token claim mapping
    #[serde(default)]
    pub jwt: JwtConfig,

    /// Audit sink configuration
    #[serde(default)]
    pub audit: AuditSinkConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level or `EnvFilter` directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Operational log output format
    #[serde(default)]
    pub log_format: LogFormat,

    /// Also write operational logs to rolling `app.<date>.log` files in the
    /// audit log directory
    #[serde(default = "default_log_file")]
    pub log_file: bool,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Largest accepted request body in bytes
    #[serde(default = "default_body_limit_bytes")]
    pub body_limit_bytes: usize,

    /// CORS origin: `*` for any, otherwise one exact origin
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            log_file: default_log_file(),
            timeout_secs: default_timeout(),
            body_limit_bytes: default_body_limit_bytes(),
            allowed_origin: default_allowed_origin(),
        }
    }
}

impl ServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Operational log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Ingest authentication configuration
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared key expected in `X-API-Key`; required
    #[serde(default)]
    pub api_key: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Bearer token configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Claim → field mapping; the built-in table when unset
    ///
    /// Kept optional so a configured mapping replaces the default table
    /// instead of being merged into it.
    #[serde(default)]
    pub claim_mapping: Option<ClaimMapping>,
}

impl JwtConfig {
    /// The configured mapping, or the built-in table
    pub fn mapping(&self) -> ClaimMapping {
        self.claim_mapping.clone().unwrap_or_default()
    }
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> bool {
    true
}

fn default_timeout() -> u64 {
    30
}

fn default_body_limit_bytes() -> usize {
    1024 * 1024
}

fn default_allowed_origin() -> String {
    "*".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            auth: AuthConfig::default(),
            platform: PlatformFields {
                app: Some(UNKNOWN.to_string()),
                platform: Some(UNKNOWN.to_string()),
                environment: Some(UNKNOWN.to_string()),
                hostname: Some(system_hostname()),
            },
            jwt: JwtConfig::default(),
            audit: AuditSinkConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment and optional file
    pub fn load() -> Result<Self> {
        Self::load_with(|name| std::env::var(name).ok())
    }

    /// Load configuration using `lookup` in place of the process environment
    pub fn load_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut figment = Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Config::default()));

        if let Some(path) = config_file(&lookup) {
            tracing::info!("Loading configuration from: {}", path.display());
            figment = figment.merge(Toml::file(path));
        }

        // Environment variables have highest priority
        figment = merge_env(figment, &lookup)?;

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file, ignoring the environment
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.auth.api_key.trim().is_empty() {
            return Err(config_error(
                "AUDIT_API_KEY environment variable is required",
            ));
        }
        if self.service.port == 0 {
            return Err(config_error("PORT must be between 1 and 65535"));
        }
        Ok(())
    }
}

fn config_file(lookup: &impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    match lookup(CONFIG_FILE_VAR) {
        Some(path) => Some(PathBuf::from(path)),
        None => {
            let path = PathBuf::from(DEFAULT_CONFIG_FILE);
            path.exists().then_some(path)
        }
    }
}

fn merge_env(mut figment: Figment, lookup: &impl Fn(&str) -> Option<String>) -> Result<Figment> {
    const STRING_VARS: [(&str, &str); 9] = [
        ("AUDIT_API_KEY", "auth.api_key"),
        ("APP", "platform.app"),
        ("PLATFORM", "platform.platform"),
        ("ENVIRONMENT", "platform.environment"),
        ("HOSTNAME", "platform.hostname"),
        ("ALLOWED_ORIGIN", "service.allowed_origin"),
        ("LOG_LEVEL", "service.log_level"),
        ("AUDIT_LOG_DIR", "audit.directory"),
        ("AUDIT_SINK", "audit.sink"),
    ];

    for (var, key) in STRING_VARS {
        if let Some(value) = lookup(var) {
            figment = figment.merge(Serialized::default(key, value.trim().to_string()));
        }
    }

    if let Some(port) = lookup("PORT") {
        let port = parse_port(&port)?;
        figment = figment.merge(Serialized::default("service.port", port));
    }

    if let Some(json) = lookup("JWT_CLAIM_MAPPING") {
        let mapping = ClaimMapping::from_json(&json)
            .map_err(|e| config_error(format!("Invalid JWT_CLAIM_MAPPING: {e}")))?;
        figment = figment.merge(Serialized::default("jwt.claim_mapping", mapping));
    }

    Ok(figment)
}

fn parse_port(value: &str) -> Result<u16> {
    match value.trim().parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(config_error(format!(
            "Invalid PORT value: {value} (must be an integer between 1 and 65535)"
        ))),
    }
}

fn config_error(message: impl Into<String>) -> Error {
    figment::Error::from(message.into()).into()
}

/// Best-effort system hostname, or `unknown`
///
/// Reads `/etc/hostname`, then the `HOSTNAME` and `COMPUTERNAME` (Windows)
/// environment variables.
fn system_hostname() -> String {
    resolve_hostname(std::fs::read_to_string("/etc/hostname").ok(), |name| {
        std::env::var(name).ok()
    })
}

fn resolve_hostname<F>(hostname_file: Option<String>, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    hostname_file
        .into_iter()
        .chain(lookup("HOSTNAME"))
        .chain(lookup("COMPUTERNAME"))
        .map(|name| name.trim().to_string())
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}
