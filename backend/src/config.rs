use std::str::FromStr;

use sqlx::postgres::PgConnectOptions;
use thiserror::Error;

pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value}")]
    Invalid {
        name: &'static str,
        value: String,
    },
    #[error("missing database configuration: set DATABASE_URL or DB_USER, DB_PASS and DB_HOST")]
    MissingDatabase,
    #[error("invalid DATABASE_URL: {0}")]
    DatabaseUrl(#[source] sqlx::Error),
}

#[derive(Debug, Clone)]
pub enum StoreConfig {
    Memory,
    Postgres(PgConnectOptions),
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub store: StoreConfig,
    pub max_connections: u32,
    pub gemini: GeminiConfig,
    pub event_capacity: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let store = match get("STORE").as_deref() {
            None | Some("postgres") => StoreConfig::Postgres(database_options(&get)?),
            Some("memory") => StoreConfig::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "STORE",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            port: parse_or("PORT", get("PORT"), 3000)?,
            store,
            max_connections: parse_or("DB_MAX_CONNECTIONS", get("DB_MAX_CONNECTIONS"), 10)?,
            gemini: GeminiConfig {
                api_key: get("GEMINI_API_KEY").unwrap_or_default(),
                base_url: get("GEMINI_API_URL").unwrap_or_else(|| DEFAULT_GEMINI_URL.to_string()),
                model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            },
            event_capacity: parse_or("EVENT_CHANNEL_CAPACITY", get("EVENT_CHANNEL_CAPACITY"), 256)?,
        })
    }
}

fn parse_or<T: FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid { name, value: v }),
    }
}

fn database_options(get: &dyn Fn(&str) -> Option<String>) -> Result<PgConnectOptions, ConfigError> {
    if let Some(url) = get("DATABASE_URL") {
        return PgConnectOptions::from_str(&url).map_err(ConfigError::DatabaseUrl);
    }
    let (Some(user), Some(pass), Some(host)) = (get("DB_USER"), get("DB_PASS"), get("DB_HOST"))
    else {
        return Err(ConfigError::MissingDatabase);
    };
    let port = parse_or("DB_PORT", get("DB_PORT"), 5432u16)?;
    let database = get("DB_NAME").unwrap_or_else(|| "finaicer".to_string());
    Ok(PgConnectOptions::new()
        .host(&host)
        .port(port)
        .username(&user)
        .password(&pass)
        .database(&database))
}
