//! Process configuration, read once from the environment.
//!
//! | variable                  | default        |
//! |---------------------------|----------------|
//! | `JWT_SECRET`              | `dev-secret`   |
//! | `BIND_ADDR`               | `0.0.0.0:8080` |
//! | `LOAN_PERIOD_DAYS`        | `30`           |
//! | `MAX_RENEWALS`            | `1`            |
//! | `PREVENT_DUPLICATE_LOANS` | `true`         |
//! | `CATALOG_SEED_PATH`       | unset          |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use libristack_core::DomainError;
use libristack_lending::LendingPolicy;

const DEV_SECRET: &str = "dev-secret";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}='{value}' is invalid: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid lending policy: {0}")]
    Policy(DomainError),
}

/// Failure while bringing the application up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to read catalog seed {path}: {source}")]
    SeedRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to load catalog seed: {0}")]
    Seed(DomainError),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub bind_addr: SocketAddr,
    pub policy: LendingPolicy,
    /// Legacy catalog export loaded at startup.
    pub catalog_seed_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_SECRET.to_string()
        });

        let defaults = LendingPolicy::default();
        let policy = LendingPolicy {
            loan_period_days: parse_or(&lookup, "LOAN_PERIOD_DAYS", defaults.loan_period_days)?,
            max_renewals: parse_or(&lookup, "MAX_RENEWALS", defaults.max_renewals)?,
            prevent_duplicate_loans: match lookup("PREVENT_DUPLICATE_LOANS") {
                Some(raw) => parse_bool("PREVENT_DUPLICATE_LOANS", &raw)?,
                None => defaults.prevent_duplicate_loans,
            },
        };
        policy.validate().map_err(ConfigError::Policy)?;

        let bind_addr = match lookup("BIND_ADDR") {
            Some(raw) => parse_value("BIND_ADDR", &raw)?,
            None => DEFAULT_BIND_ADDR
                .parse()
                .map_err(|e: std::net::AddrParseError| invalid("BIND_ADDR", DEFAULT_BIND_ADDR, e))?,
        };

        let catalog_seed_path = lookup("CATALOG_SEED_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            jwt_secret,
            bind_addr,
            policy,
            catalog_seed_path,
        })
    }

    /// Defaults with an explicit secret; used by tests and embedders.
    pub fn with_secret(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            policy: LendingPolicy::default(),
            catalog_seed_path: None,
        }
    }
}

fn invalid(var: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_value<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    raw.trim().parse().map_err(|e: T::Err| invalid(var, raw, e))
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    match lookup(var) {
        Some(raw) => parse_value(var, &raw),
        None => Ok(default),
    }
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(var, raw, "expected true or false")),
    }
}
