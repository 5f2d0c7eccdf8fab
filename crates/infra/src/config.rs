//! Configuration loading and representation.
//!
//! Everything comes from `GATEHOUSE_*` environment variables with dev-friendly
//! defaults. [`GatehouseConfig::from_lookup`] takes any lookup function so
//! tests never touch the process environment.

use chrono::Duration;
use thiserror::Error;

use gatehouse_kernel::Settings;
use gatehouse_observability::{LogConfig, LogFormat};

pub const SESSION_TTL_SECS: &str = "GATEHOUSE_SESSION_TTL_SECS";
pub const CSRF_COOKIE: &str = "GATEHOUSE_CSRF_COOKIE";
pub const SESSION_COOKIE: &str = "GATEHOUSE_SESSION_COOKIE";
pub const LANGUAGE_COOKIE: &str = "GATEHOUSE_LANGUAGE_COOKIE";
pub const SECURE_COOKIES: &str = "GATEHOUSE_SECURE_COOKIES";
pub const LANGUAGES: &str = "GATEHOUSE_LANGUAGES";
pub const DEFAULT_LANGUAGE: &str = "GATEHOUSE_DEFAULT_LANGUAGE";
pub const LOG_FORMAT: &str = "GATEHOUSE_LOG_FORMAT";
pub const LOG_LEVEL: &str = "GATEHOUSE_LOG_LEVEL";
pub const BIND_ADDR: &str = "GATEHOUSE_BIND_ADDR";

const DEFAULT_SESSION_TTL_SECS: i64 = 86_400;
pub const MAX_SESSION_TTL_SECS: i64 = 365 * 86_400;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(var: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            var,
            reason: reason.into(),
        }
    }
}

/// Names and attributes of the cookies the HTTP adapter manages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieConfig {
    pub csrf: String,
    pub session: String,
    pub language: String,
    /// Add the `Secure` attribute (HTTPS deployments).
    pub secure: bool,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            csrf: "gatehouse_csrf".to_string(),
            session: "gatehouse_session".to_string(),
            language: "gatehouse_lang".to_string(),
            secure: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatehouseConfig {
    pub settings: Settings,
    pub cookies: CookieConfig,
    pub log: LogConfig,
    pub bind_addr: String,
}

impl Default for GatehouseConfig {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            cookies: CookieConfig::default(),
            log: LogConfig::default(),
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

impl GatehouseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup; unset or blank variables take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let session_ttl = match get(SESSION_TTL_SECS) {
            Some(raw) => parse_ttl(&raw)?,
            None => Duration::seconds(DEFAULT_SESSION_TTL_SECS),
        };

        let languages = match get(LANGUAGES) {
            Some(raw) => parse_languages(&raw)?,
            None => defaults.settings.languages.clone(),
        };
        let default_language = match get(DEFAULT_LANGUAGE) {
            Some(raw) => {
                let code = raw.to_lowercase();
                if !languages.contains(&code) {
                    return Err(ConfigError::invalid(
                        DEFAULT_LANGUAGE,
                        format!("'{code}' is not listed in {LANGUAGES}"),
                    ));
                }
                code
            }
            None => languages
                .first()
                .cloned()
                .unwrap_or(defaults.settings.default_language),
        };

        let cookies = CookieConfig {
            csrf: cookie_name(CSRF_COOKIE, get(CSRF_COOKIE), defaults.cookies.csrf)?,
            session: cookie_name(SESSION_COOKIE, get(SESSION_COOKIE), defaults.cookies.session)?,
            language: cookie_name(LANGUAGE_COOKIE, get(LANGUAGE_COOKIE), defaults.cookies.language)?,
            secure: match get(SECURE_COOKIES) {
                Some(raw) => parse_bool(SECURE_COOKIES, &raw)?,
                None => defaults.cookies.secure,
            },
        };
        if cookies.csrf == cookies.session || cookies.csrf == cookies.language || cookies.session == cookies.language {
            return Err(ConfigError::invalid(CSRF_COOKIE, "cookie names must be distinct"));
        }

        let log = LogConfig {
            format: match get(LOG_FORMAT) {
                Some(raw) => raw
                    .parse::<LogFormat>()
                    .map_err(|e| ConfigError::invalid(LOG_FORMAT, e.to_string()))?,
                None => defaults.log.format,
            },
            level: get(LOG_LEVEL).unwrap_or(defaults.log.level),
        };

        Ok(Self {
            settings: Settings {
                session_ttl,
                languages,
                default_language,
            },
            cookies,
            log,
            bind_addr: get(BIND_ADDR).unwrap_or(defaults.bind_addr),
        })
    }
}

fn parse_ttl(raw: &str) -> Result<Duration, ConfigError> {
    let secs: i64 = raw
        .parse()
        .map_err(|_| ConfigError::invalid(SESSION_TTL_SECS, format!("'{raw}' is not a whole number of seconds")))?;
    if secs <= 0 {
        return Err(ConfigError::invalid(SESSION_TTL_SECS, "must be positive"));
    }
    if secs > MAX_SESSION_TTL_SECS {
        return Err(ConfigError::invalid(
            SESSION_TTL_SECS,
            format!("must not exceed {MAX_SESSION_TTL_SECS} seconds"),
        ));
    }
    Ok(Duration::seconds(secs))
}

fn parse_languages(raw: &str) -> Result<Vec<String>, ConfigError> {
    let mut languages: Vec<String> = Vec::new();
    for code in raw.split(',').map(|c| c.trim().to_lowercase()).filter(|c| !c.is_empty()) {
        if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(ConfigError::invalid(LANGUAGES, format!("'{code}' is not a language code")));
        }
        if !languages.contains(&code) {
            languages.push(code);
        }
    }
    if languages.is_empty() {
        return Err(ConfigError::invalid(LANGUAGES, "at least one language is required"));
    }
    Ok(languages)
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::invalid(var, format!("'{other}' is not a boolean"))),
    }
}

/// Cookie names are RFC 6265 tokens: visible ASCII without separators.
fn cookie_name(var: &'static str, value: Option<String>, default: String) -> Result<String, ConfigError> {
    let name = value.unwrap_or(default);
    let valid = name
        .chars()
        .all(|c| c.is_ascii_graphic() && !"()<>@,;:\\\"/[]?={}".contains(c));
    if !valid {
        return Err(ConfigError::invalid(var, format!("'{name}' is not a valid cookie name")));
    }
    Ok(name)
}
