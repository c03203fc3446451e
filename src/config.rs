//! Runtime configuration parsed from environment variables.
//!
//! Every `from_env` constructor delegates to a `from_lookup` twin that takes
//! the variable source as a closure, so parsing is testable without touching
//! the process environment.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SITE_DIR: &str = "site";
pub const DEFAULT_SESSION_TTL_SECS: u64 = 8 * 60 * 60;
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_COLLECTION: &str = "resultados_generales";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required env var: {var}")]
    Missing { var: String },
    #[error("invalid value for {var}: {value}")]
    Invalid { var: String, value: String },
}

/// Parse a boolean flag (`1/true/yes/on`, `0/false/no/off`).
fn parse_bool(raw: Option<&str>) -> Option<bool> {
    raw.and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    })
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { var: key.into(), value: raw }),
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String, ConfigError> {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::Missing { var: key.into() })
}

// =============================================================================
// STORE
// =============================================================================

/// Which document store receives submissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Firestore { project_id: String, collection: String },
    Postgres { database_url: String, collection: String },
}

impl StoreConfig {
    /// - `STORE_BACKEND`: `firestore` (default) or `postgres`
    /// - `FIRESTORE_PROJECT_ID` (firestore) / `DATABASE_URL` (postgres)
    /// - `FIRESTORE_COLLECTION`: default `resultados_generales`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|k| std::env::var(k).ok())
    }

    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let collection = lookup("FIRESTORE_COLLECTION").unwrap_or_else(|| DEFAULT_COLLECTION.to_owned());
        match lookup("STORE_BACKEND").as_deref().unwrap_or("firestore") {
            "firestore" => Ok(Self::Firestore { project_id: required(lookup, "FIRESTORE_PROJECT_ID")?, collection }),
            "postgres" => Ok(Self::Postgres { database_url: required(lookup, "DATABASE_URL")?, collection }),
            other => Err(ConfigError::Invalid { var: "STORE_BACKEND".into(), value: other.into() }),
        }
    }
}

// =============================================================================
// NOTIFICATIONS
// =============================================================================

/// Notification provider settings. Absent config disables the email channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyConfig {
    EmailJs { service_id: String, template_id: String, public_key: String, private_key: Option<String> },
    Resend { api_key: String, from: String, to: String },
}

impl NotifyConfig {
    /// - `NOTIFY_PROVIDER`: `emailjs` (default) or `resend`
    /// - EmailJS: `EMAILJS_SERVICE_ID`, `EMAILJS_TEMPLATE_ID`, `EMAILJS_PUBLIC_KEY`, optional `EMAILJS_PRIVATE_KEY`
    /// - Resend: `RESEND_API_KEY`, `RESEND_FROM`, `RESEND_TO`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|k| std::env::var(k).ok())
    }

    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        match lookup("NOTIFY_PROVIDER").as_deref().unwrap_or("emailjs") {
            "emailjs" => Ok(Self::EmailJs {
                service_id: required(lookup, "EMAILJS_SERVICE_ID")?,
                template_id: required(lookup, "EMAILJS_TEMPLATE_ID")?,
                public_key: required(lookup, "EMAILJS_PUBLIC_KEY")?,
                private_key: lookup("EMAILJS_PRIVATE_KEY").filter(|v| !v.trim().is_empty()),
            }),
            "resend" => Ok(Self::Resend {
                api_key: required(lookup, "RESEND_API_KEY")?,
                from: required(lookup, "RESEND_FROM")?,
                to: required(lookup, "RESEND_TO")?,
            }),
            other => Err(ConfigError::Invalid { var: "NOTIFY_PROVIDER".into(), value: other.into() }),
        }
    }
}

// =============================================================================
// APP
// =============================================================================

/// Process-level settings. Store and notifier settings are parsed separately
/// because their absence is handled differently at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    /// Static site root served at `/`.
    pub site_dir: PathBuf,
    /// Directory holding `laboratorios.json`, `ensayos_aptitud.json`, `search_index.json`.
    pub data_dir: PathBuf,
    pub session_ttl: Duration,
    pub cookie_secure: bool,
    pub store_timeout: Duration,
    /// Web API key for the auth service; `None` disables login.
    pub firebase_api_key: Option<String>,
}

impl AppConfig {
    /// - `PORT` (3000), `SITE_DIR` (`site`), `DATA_DIR` (`$SITE_DIR/data`)
    /// - `SESSION_TTL_SECS` (28800), `STORE_TIMEOUT_SECS` (10)
    /// - `COOKIE_SECURE` (false), `FIREBASE_API_KEY`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|k| std::env::var(k).ok())
    }

    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let site_dir = PathBuf::from(lookup("SITE_DIR").unwrap_or_else(|| DEFAULT_SITE_DIR.to_owned()));
        let data_dir = lookup("DATA_DIR").map_or_else(|| site_dir.join("data"), PathBuf::from);
        let cookie_secure = match lookup("COOKIE_SECURE") {
            None => false,
            Some(raw) => {
                parse_bool(Some(raw.as_str())).ok_or(ConfigError::Invalid { var: "COOKIE_SECURE".into(), value: raw })?
            }
        };

        Ok(Self {
            port: parse_or(lookup, "PORT", DEFAULT_PORT)?,
            site_dir,
            data_dir,
            session_ttl: Duration::from_secs(parse_or(lookup, "SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)?),
            cookie_secure,
            store_timeout: Duration::from_secs(parse_or(lookup, "STORE_TIMEOUT_SECS", DEFAULT_STORE_TIMEOUT_SECS)?),
            firebase_api_key: lookup("FIREBASE_API_KEY").filter(|v| !v.trim().is_empty()),
        })
    }

    #[must_use]
    pub fn laboratories_path(&self) -> PathBuf {
        self.data_dir.join("laboratorios.json")
    }

    #[must_use]
    pub fn dataset_path(&self) -> PathBuf {
        self.data_dir.join("ensayos_aptitud.json")
    }

    #[must_use]
    pub fn search_index_path(&self) -> PathBuf {
        self.data_dir.join("search_index.json")
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
