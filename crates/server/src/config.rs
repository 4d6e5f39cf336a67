//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DRONSHOP_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `SECRET_KEY` - JWT signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `DRONSHOP_HOST` - Bind address (default: 127.0.0.1)
//! - `DRONSHOP_PORT` - Listen port (default: 8000)
//! - `ACCESS_TOKEN_EXPIRE_MINUTES` - Access token lifetime (default: 15, max: one year)
//! - `REFRESH_TOKEN_EXPIRE_DAYS` - Refresh token lifetime (default: 14, max: 3650)
//! - `SMS_CODE_LENGTH` - Digits in a verification code (default: 6)
//! - `SMS_CODE_TTL_SECONDS` - Verification code lifetime (default: 300)
//! - `UPLOADS_DIR` - Directory for product images (default: uploads)
//! - `ALLOWED_ORIGINS` - Comma-separated CORS origins (default: <http://localhost:5173>)
//! - `DEV_LOGIN_ENABLED` / `DEV_SEED` - Enable dev accounts and relaxed limits
//! - `RATE_LIMIT_{AUTH,ADMIN,GENERAL}_MAX` / `RATE_LIMIT_{..}_WINDOW_SECS`
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SECRET_KEY_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API application configuration.
///
/// `SecretString` fields redact themselves in `Debug` output.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// HMAC key for access and refresh tokens
    pub secret_key: SecretString,
    /// Access token lifetime in minutes
    pub access_token_expire_minutes: i64,
    /// Refresh token lifetime in days
    pub refresh_token_expire_days: i64,
    /// Verification code settings
    pub sms: SmsConfig,
    /// Root directory for uploaded files
    pub uploads_dir: PathBuf,
    /// Origins allowed by CORS
    pub allowed_origins: Vec<String>,
    /// Enables `/api/auth/dev-login`
    pub dev_login_enabled: bool,
    /// Seeds dev accounts at startup
    pub dev_seed: bool,
    /// Per traffic class request limits
    pub rate_limits: RateLimitConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "production", "staging")
    pub sentry_environment: Option<String>,
}

/// Verification code settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmsConfig {
    /// Number of digits in a code
    pub code_length: u32,
    /// How long an issued code stays valid
    pub code_ttl: Duration,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            code_length: 6,
            code_ttl: Duration::from_secs(300),
        }
    }
}

/// A fixed-window limit: at most `max_requests` per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitRule {
    pub max_requests: u32,
    pub window: Duration,
}

impl LimitRule {
    #[must_use]
    pub const fn per_minute(max_requests: u32) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(60),
        }
    }
}

/// Request limits for each traffic class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// `/api/auth/*`
    pub auth: LimitRule,
    /// `/api/admin/*`
    pub admin: LimitRule,
    /// Everything else
    pub general: LimitRule,
}

impl RateLimitConfig {
    /// Default limits. Dev mode relaxes auth and admin so hot reloads do not lock you out.
    #[must_use]
    pub const fn defaults(dev_mode: bool) -> Self {
        if dev_mode {
            Self {
                auth: LimitRule::per_minute(100),
                admin: LimitRule::per_minute(200),
                general: LimitRule::per_minute(200),
            }
        } else {
            Self {
                auth: LimitRule::per_minute(10),
                admin: LimitRule::per_minute(20),
                general: LimitRule::per_minute(200),
            }
        }
    }

    fn from_env(dev_mode: bool) -> Result<Self, ConfigError> {
        let defaults = Self::defaults(dev_mode);
        Ok(Self {
            auth: rule_from_env("AUTH", defaults.auth)?,
            admin: rule_from_env("ADMIN", defaults.admin)?,
            general: rule_from_env("GENERAL", defaults.general)?,
        })
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the secret key fails validation (length, placeholder, entropy).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("DRONSHOP_DATABASE_URL")?;
        let host = parse_env::<IpAddr>("DRONSHOP_HOST", "127.0.0.1")?;
        let port = parse_env::<u16>("DRONSHOP_PORT", "8000")?;

        let secret_key = get_validated_secret("SECRET_KEY")?;
        validate_secret_length(&secret_key, "SECRET_KEY")?;

        let access_token_expire_minutes =
            parse_positive("ACCESS_TOKEN_EXPIRE_MINUTES", 15, MAX_ACCESS_TOKEN_MINUTES)?;
        let refresh_token_expire_days =
            parse_positive("REFRESH_TOKEN_EXPIRE_DAYS", 14, MAX_REFRESH_TOKEN_DAYS)?;

        let code_length = parse_env::<u32>("SMS_CODE_LENGTH", "6")?;
        if !(4..=9).contains(&code_length) {
            return Err(ConfigError::InvalidEnvVar(
                "SMS_CODE_LENGTH".to_string(),
                "must be between 4 and 9".to_string(),
            ));
        }
        let code_ttl = Duration::from_secs(parse_env::<u64>("SMS_CODE_TTL_SECONDS", "300")?);

        let dev_login_enabled = parse_flag("DEV_LOGIN_ENABLED")?;
        let dev_seed = parse_flag("DEV_SEED")?;

        Ok(Self {
            database_url,
            host,
            port,
            secret_key,
            access_token_expire_minutes,
            refresh_token_expire_days,
            sms: SmsConfig {
                code_length,
                code_ttl,
            },
            uploads_dir: PathBuf::from(get_env_or_default("UPLOADS_DIR", "uploads")),
            allowed_origins: parse_origins(&get_env_or_default(
                "ALLOWED_ORIGINS",
                "http://localhost:5173",
            )),
            dev_login_enabled,
            dev_seed,
            rate_limits: RateLimitConfig::from_env(dev_login_enabled || dev_seed)?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Configuration with every optional setting at its default.
    ///
    /// Used by the CLI and by tests that build the router without an environment.
    #[must_use]
    pub fn with_defaults(database_url: SecretString, secret_key: SecretString) -> Self {
        Self {
            database_url,
            host: IpAddr::from([127, 0, 0, 1]),
            port: 8000,
            secret_key,
            access_token_expire_minutes: 15,
            refresh_token_expire_days: 14,
            sms: SmsConfig::default(),
            uploads_dir: PathBuf::from("uploads"),
            allowed_origins: vec!["http://localhost:5173".to_string()],
            dev_login_enabled: false,
            dev_seed: false,
            rate_limits: RateLimitConfig::defaults(false),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Dev mode exposes verification codes, dev login and relaxed rate limits.
    #[must_use]
    pub const fn dev_mode(&self) -> bool {
        self.dev_login_enabled || self.dev_seed
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Upper bound for `ACCESS_TOKEN_EXPIRE_MINUTES` (one year).
const MAX_ACCESS_TOKEN_MINUTES: i64 = 365 * 24 * 60;
/// Upper bound for `REFRESH_TOKEN_EXPIRE_DAYS` (ten years).
const MAX_REFRESH_TOKEN_DAYS: i64 = 3650;

fn parse_positive(key: &str, default: i64, max: i64) -> Result<i64, ConfigError> {
    let value = parse_env::<i64>(key, &default.to_string())?;
    check_range(key, value, max)
}

fn check_range(key: &str, value: i64, max: i64) -> Result<i64, ConfigError> {
    if value <= 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be positive".to_string(),
        ));
    }
    if value > max {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be at most {max}"),
        ));
    }
    Ok(value)
}

fn parse_flag(key: &str) -> Result<bool, ConfigError> {
    match get_optional_env(key) {
        None => Ok(false),
        Some(raw) => parse_bool(&raw)
            .ok_or_else(|| ConfigError::InvalidEnvVar(key.to_string(), format!("'{raw}' is not a boolean"))),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}

fn rule_from_env(class: &str, default: LimitRule) -> Result<LimitRule, ConfigError> {
    let max_key = format!("RATE_LIMIT_{class}_MAX");
    let window_key = format!("RATE_LIMIT_{class}_WINDOW_SECS");

    let max_requests = parse_env::<u32>(&max_key, &default.max_requests.to_string())?;
    let window_secs = parse_env::<u64>(&window_key, &default.window.as_secs().to_string())?;
    if max_requests == 0 || window_secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            format!("RATE_LIMIT_{class}_*"),
            "limits must be positive".to_string(),
        ));
    }

    Ok(LimitRule {
        max_requests,
        window: Duration::from_secs(window_secs),
    })
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SECRET_KEY_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SECRET_KEY_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
