//! Server configuration.

use causeway_core::observability::LogFormat;
use causeway_core::{Error, Result};
use causeway_relay::dispatch::DispatchMode;

const MIN_OPERATION_TTL_SECS: u64 = 1;
const MAX_OPERATION_TTL_SECS: u64 = 3600; // 1 hour max

fn default_operation_ttl_secs() -> u64 {
    300 // 5 minutes
}

/// CORS configuration for browser-based access.
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Allowed origins. Use `["*"]` to allow all origins (development only).
    /// Empty list disables CORS entirely.
    pub allowed_origins: Vec<String>,

    /// Max age for preflight cache (seconds).
    pub max_age_seconds: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            // Default: disabled (secure-by-default).
            allowed_origins: Vec::new(),
            max_age_seconds: 3600,
        }
    }
}

/// Configuration for the Causeway API server.
#[derive(Clone)]
pub struct Config {
    /// HTTP server port.
    pub http_port: u16,

    /// Enable debug mode.
    ///
    /// When enabled, the server may start without a worker URL (submissions
    /// are stored but dispatch fails immediately) and logs are pretty-printed.
    pub debug: bool,

    /// Explicit log format override; falls back to the debug-derived default.
    pub log_format: Option<LogFormat>,

    /// Base URL of the external worker; dispatch posts submissions here.
    pub worker_url: Option<String>,

    /// Whether the worker acknowledges and calls back, or resolves inline.
    pub dispatch_mode: DispatchMode,

    /// Per-call dispatch timeout override in seconds.
    pub dispatch_timeout_secs: Option<u64>,

    /// API key attached to dispatch requests as `x-api-key`.
    pub worker_api_key: Option<String>,

    /// Operation record time-to-live in seconds (1-3600, default 300).
    pub operation_ttl_secs: u64,

    /// Maximum delivery attempts per operation, including the first.
    pub dispatch_max_attempts: u32,

    /// Base delay for exponential dispatch backoff, in milliseconds.
    pub dispatch_backoff_ms: u64,

    /// Base URL clients and the worker use to reach this server.
    ///
    /// Defaults to `http://localhost:{http_port}` when unset.
    pub public_base_url: Option<String>,

    /// CORS configuration.
    pub cors: CorsConfig,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("http_port", &self.http_port)
            .field("debug", &self.debug)
            .field("log_format", &self.log_format)
            .field("worker_url", &self.worker_url)
            .field("dispatch_mode", &self.dispatch_mode)
            .field("dispatch_timeout_secs", &self.dispatch_timeout_secs)
            .field(
                "worker_api_key",
                &self.worker_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("operation_ttl_secs", &self.operation_ttl_secs)
            .field("dispatch_max_attempts", &self.dispatch_max_attempts)
            .field("dispatch_backoff_ms", &self.dispatch_backoff_ms)
            .field("public_base_url", &self.public_base_url)
            .field("cors", &self.cors)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 8080,
            debug: false,
            log_format: None,
            worker_url: None,
            dispatch_mode: DispatchMode::Accept,
            dispatch_timeout_secs: None,
            worker_api_key: None,
            operation_ttl_secs: default_operation_ttl_secs(),
            dispatch_max_attempts: 3,
            dispatch_backoff_ms: 1000,
            public_base_url: None,
            cors: CorsConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// Supported env vars:
    /// - `CAUSEWAY_HTTP_PORT`
    /// - `CAUSEWAY_DEBUG`
    /// - `CAUSEWAY_LOG_FORMAT` (`json` | `pretty`)
    /// - `CAUSEWAY_WORKER_URL`
    /// - `CAUSEWAY_DISPATCH_MODE` (`accept` | `inline`)
    /// - `CAUSEWAY_DISPATCH_TIMEOUT_SECS`
    /// - `CAUSEWAY_WORKER_API_KEY`
    /// - `CAUSEWAY_OPERATION_TTL_SECS` (1-3600, default: 300)
    /// - `CAUSEWAY_DISPATCH_MAX_ATTEMPTS`
    /// - `CAUSEWAY_DISPATCH_BACKOFF_MS`
    /// - `CAUSEWAY_PUBLIC_BASE_URL`
    /// - `CAUSEWAY_CORS_ALLOWED_ORIGINS` (comma-separated, or `*`)
    /// - `CAUSEWAY_CORS_MAX_AGE_SECONDS`
    ///
    /// # Errors
    ///
    /// Returns an error if any environment variable is present but cannot be
    /// parsed, or falls outside its allowed range.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(port) = env_u16("CAUSEWAY_HTTP_PORT")? {
            config.http_port = port;
        }
        if let Some(debug) = env_bool("CAUSEWAY_DEBUG")? {
            config.debug = debug;
        }
        if let Some(format) = env_string("CAUSEWAY_LOG_FORMAT") {
            config.log_format = Some(parse_log_format("CAUSEWAY_LOG_FORMAT", &format)?);
        }
        config.worker_url = env_string("CAUSEWAY_WORKER_URL");
        if let Some(mode) = env_string("CAUSEWAY_DISPATCH_MODE") {
            config.dispatch_mode = parse_dispatch_mode("CAUSEWAY_DISPATCH_MODE", &mode)?;
        }
        if let Some(secs) = env_u64("CAUSEWAY_DISPATCH_TIMEOUT_SECS")? {
            if secs == 0 {
                return Err(Error::InvalidInput(
                    "CAUSEWAY_DISPATCH_TIMEOUT_SECS must be greater than 0".to_string(),
                ));
            }
            config.dispatch_timeout_secs = Some(secs);
        }
        config.worker_api_key = env_string("CAUSEWAY_WORKER_API_KEY");

        if let Some(secs) = env_u64("CAUSEWAY_OPERATION_TTL_SECS")? {
            if secs < MIN_OPERATION_TTL_SECS {
                return Err(Error::InvalidInput(format!(
                    "CAUSEWAY_OPERATION_TTL_SECS must be at least {MIN_OPERATION_TTL_SECS}"
                )));
            }
            if secs > MAX_OPERATION_TTL_SECS {
                return Err(Error::InvalidInput(format!(
                    "CAUSEWAY_OPERATION_TTL_SECS must be at most {MAX_OPERATION_TTL_SECS}"
                )));
            }
            config.operation_ttl_secs = secs;
        }
        if let Some(attempts) = env_u64("CAUSEWAY_DISPATCH_MAX_ATTEMPTS")? {
            if attempts == 0 {
                return Err(Error::InvalidInput(
                    "CAUSEWAY_DISPATCH_MAX_ATTEMPTS must be greater than 0".to_string(),
                ));
            }
            config.dispatch_max_attempts = u32::try_from(attempts).map_err(|_| {
                Error::InvalidInput("CAUSEWAY_DISPATCH_MAX_ATTEMPTS is too large".to_string())
            })?;
        }
        if let Some(backoff) = env_u64("CAUSEWAY_DISPATCH_BACKOFF_MS")? {
            config.dispatch_backoff_ms = backoff;
        }
        if let Some(base) = env_string("CAUSEWAY_PUBLIC_BASE_URL") {
            config.public_base_url = Some(base.trim_end_matches('/').to_string());
        }

        if let Some(origins) = env_string("CAUSEWAY_CORS_ALLOWED_ORIGINS") {
            config.cors.allowed_origins = parse_cors_allowed_origins(&origins);
        }
        if let Some(max_age) = env_u64("CAUSEWAY_CORS_MAX_AGE_SECONDS")? {
            config.cors.max_age_seconds = max_age;
        }

        Ok(config)
    }

    /// The log format appropriate for this configuration.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        if let Some(format) = self.log_format {
            return format;
        }
        if self.debug {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        }
    }

    /// Base URL clients use to reach this server, no trailing slash.
    #[must_use]
    pub fn public_base_url(&self) -> String {
        self.public_base_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.http_port))
    }

    /// Returns the operation time-to-live as a `chrono::Duration`.
    #[must_use]
    pub fn operation_ttl(&self) -> chrono::Duration {
        let secs = self.operation_ttl_secs.min(MAX_OPERATION_TTL_SECS);
        chrono::Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX))
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn env_u16(name: &str) -> Result<Option<u16>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse::<u16>()
        .map(Some)
        .map_err(|e| Error::InvalidInput(format!("{name} must be a u16: {e}")))
}

fn env_u64(name: &str) -> Result<Option<u64>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse::<u64>()
        .map(Some)
        .map_err(|e| Error::InvalidInput(format!("{name} must be a u64: {e}")))
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    let value = value.trim().to_ascii_lowercase();
    match value.as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        _ => Err(Error::InvalidInput(format!(
            "{name} must be a boolean (true/false/1/0)"
        ))),
    }
}

fn env_bool(name: &str) -> Result<Option<bool>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    parse_bool(name, &v).map(Some)
}

fn parse_log_format(name: &str, value: &str) -> Result<LogFormat> {
    let format = value.trim().to_ascii_lowercase();
    match format.as_str() {
        "json" => Ok(LogFormat::Json),
        "pretty" => Ok(LogFormat::Pretty),
        _ => Err(Error::InvalidInput(format!(
            "{name} must be one of: json, pretty (got {value})"
        ))),
    }
}

fn parse_dispatch_mode(name: &str, value: &str) -> Result<DispatchMode> {
    let mode = value.trim().to_ascii_lowercase();
    match mode.as_str() {
        "accept" => Ok(DispatchMode::Accept),
        "inline" => Ok(DispatchMode::Inline),
        _ => Err(Error::InvalidInput(format!(
            "{name} must be one of: accept, inline (got {value})"
        ))),
    }
}

fn parse_cors_allowed_origins(value: &str) -> Vec<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if trimmed == "*" {
        return vec!["*".to_string()];
    }
    trimmed
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = Config::default();
        assert_eq!(config.http_port, 8080);
        assert!(!config.debug);
        assert_eq!(config.operation_ttl_secs, 300);
        assert_eq!(config.dispatch_max_attempts, 3);
        assert_eq!(config.dispatch_mode, DispatchMode::Accept);
        assert_eq!(config.public_base_url(), "http://localhost:8080");
    }

    #[test]
    fn operation_ttl_converts_to_chrono() {
        let config = Config {
            operation_ttl_secs: 120,
            ..Config::default()
        };
        assert_eq!(config.operation_ttl(), chrono::Duration::seconds(120));
    }

    #[test]
    fn parse_bool_accepts_true_values() {
        for value in ["true", "1", "yes", "Y", "TRUE"] {
            assert!(parse_bool("TEST", value).unwrap());
        }
    }

    #[test]
    fn parse_bool_accepts_false_values() {
        for value in ["false", "0", "no", "N", "FALSE"] {
            assert!(!parse_bool("TEST", value).unwrap());
        }
    }

    #[test]
    fn parse_bool_rejects_invalid_values() {
        assert!(parse_bool("TEST", "maybe").is_err());
    }

    #[test]
    fn parse_dispatch_mode_accepts_both_modes() {
        assert_eq!(
            parse_dispatch_mode("TEST", "accept").unwrap(),
            DispatchMode::Accept
        );
        assert_eq!(
            parse_dispatch_mode("TEST", "Inline").unwrap(),
            DispatchMode::Inline
        );
        assert!(parse_dispatch_mode("TEST", "sync").is_err());
    }

    #[test]
    fn parse_log_format_accepts_both_formats() {
        assert!(matches!(
            parse_log_format("TEST", "json").unwrap(),
            LogFormat::Json
        ));
        assert!(matches!(
            parse_log_format("TEST", "Pretty").unwrap(),
            LogFormat::Pretty
        ));
        assert!(parse_log_format("TEST", "xml").is_err());
    }

    #[test]
    fn log_format_override_wins_over_debug() {
        let config = Config {
            debug: true,
            log_format: Some(LogFormat::Json),
            ..Config::default()
        };
        assert!(matches!(config.log_format(), LogFormat::Json));
    }

    #[test]
    fn parse_cors_origins_splits_and_trims() {
        assert_eq!(
            parse_cors_allowed_origins("http://a.test, http://b.test"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
        assert_eq!(parse_cors_allowed_origins("*"), vec!["*".to_string()]);
        assert!(parse_cors_allowed_origins("  ").is_empty());
    }

    #[test]
    fn debug_redacts_worker_api_key() {
        let config = Config {
            worker_api_key: Some("secret-key".to_string()),
            ..Config::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("[REDACTED]"));
    }
}
