//! Configuration loaded from the environment
//!
//! Connection target, source table names and the analysis defaults
//! (article language, exchange allow-list). Per-call options such as the
//! period or sort order are plain function arguments and never live here.

use crate::error::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_DATABASE: &str = "md:my_db";
pub const DEFAULT_ARTICLES_TABLE: &str = "llm_feature_extract_date_ny";
pub const DEFAULT_PRICES_TABLE: &str = "minute_ohlc_ny_tz";
pub const DEFAULT_CLEAN_SYMBOLS_TABLE: &str = "clean_symbols";
pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_MAJOR_EXCHANGES: &[&str] = &["NASDAQ", "NYSE"];

/// Where the analytical database lives
#[derive(Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    InMemory,
    File(PathBuf),
    MotherDuck { database: String, token: String },
}

impl DatabaseTarget {
    /// Parse a target string (`:memory:`, `md:<db>` or a file path)
    pub fn parse(raw: &str, token: Option<String>) -> Result<Self> {
        let raw = raw.trim();

        if raw.is_empty() {
            return Err(AppError::Config("Database target is empty".to_string()));
        }

        if raw == ":memory:" {
            return Ok(DatabaseTarget::InMemory);
        }

        if let Some(database) = raw.strip_prefix("md:") {
            let token = token
                .filter(|t| !t.trim().is_empty())
                .ok_or_else(|| AppError::Config("motherduck_token not set".to_string()))?;

            return Ok(DatabaseTarget::MotherDuck {
                database: database.to_string(),
                token,
            });
        }

        Ok(DatabaseTarget::File(PathBuf::from(raw)))
    }

    /// Connection string handed to DuckDB
    pub(crate) fn connection_string(&self) -> String {
        match self {
            DatabaseTarget::InMemory => ":memory:".to_string(),
            DatabaseTarget::File(path) => path.display().to_string(),
            DatabaseTarget::MotherDuck { database, token } => {
                format!("md:{}?motherduck_token={}", database, token)
            }
        }
    }
}

// The token must never reach the logs
impl fmt::Display for DatabaseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseTarget::InMemory => write!(f, ":memory:"),
            DatabaseTarget::File(path) => write!(f, "{}", path.display()),
            DatabaseTarget::MotherDuck { database, .. } => write!(f, "md:{}", database),
        }
    }
}

impl fmt::Debug for DatabaseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DatabaseTarget({})", self)
    }
}

/// Names of the upstream base tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTables {
    pub articles: String,
    pub prices: String,
    pub clean_symbols: String,
}

impl Default for SourceTables {
    fn default() -> Self {
        Self {
            articles: DEFAULT_ARTICLES_TABLE.to_string(),
            prices: DEFAULT_PRICES_TABLE.to_string(),
            clean_symbols: DEFAULT_CLEAN_SYMBOLS_TABLE.to_string(),
        }
    }
}

impl SourceTables {
    /// Table names end up in query text, so only plain identifiers are accepted
    pub fn validate(&self) -> Result<()> {
        for name in [&self.articles, &self.prices, &self.clean_symbols] {
            validate_identifier(name)?;
        }
        Ok(())
    }
}

fn validate_identifier(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        });

    if valid {
        Ok(())
    } else {
        Err(AppError::Config(format!("Invalid table identifier: {}", name)))
    }
}

/// Settings shared by every retrieval
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsSettings {
    pub tables: SourceTables,
    /// Language code used by the publish-count and mention retrievals
    pub article_language: String,
    /// Exchange allow-list, stored uppercase
    pub major_exchanges: Vec<String>,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            tables: SourceTables::default(),
            article_language: DEFAULT_LANGUAGE.to_string(),
            major_exchanges: DEFAULT_MAJOR_EXCHANGES.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// Full application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseTarget,
    /// Open local database files read-only
    pub read_only: bool,
    pub analytics: AnalyticsSettings,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Load configuration, taking the database target from `database` when given
    pub fn load(database: Option<&str>) -> Result<Self> {
        dotenv().ok();

        let database_raw = match database {
            Some(raw) => raw.to_string(),
            None => env::var("NEWSDESK_DATABASE").unwrap_or_else(|_| DEFAULT_DATABASE.to_string()),
        };
        let database = DatabaseTarget::parse(&database_raw, motherduck_token())?;

        let read_only = parse_bool(
            "NEWSDESK_READ_ONLY",
            &env::var("NEWSDESK_READ_ONLY").unwrap_or_else(|_| "true".to_string()),
        )?;

        let tables = SourceTables {
            articles: env::var("NEWSDESK_ARTICLES_TABLE")
                .unwrap_or_else(|_| DEFAULT_ARTICLES_TABLE.to_string()),
            prices: env::var("NEWSDESK_PRICES_TABLE")
                .unwrap_or_else(|_| DEFAULT_PRICES_TABLE.to_string()),
            clean_symbols: env::var("NEWSDESK_CLEAN_SYMBOLS_TABLE")
                .unwrap_or_else(|_| DEFAULT_CLEAN_SYMBOLS_TABLE.to_string()),
        };
        tables.validate()?;

        let article_language =
            env::var("NEWSDESK_LANGUAGE").unwrap_or_else(|_| DEFAULT_LANGUAGE.to_string());

        let major_exchanges = match env::var("NEWSDESK_MAJOR_EXCHANGES") {
            Ok(raw) => parse_exchange_list(&raw)?,
            Err(_) => AnalyticsSettings::default().major_exchanges,
        };

        Ok(Self {
            database,
            read_only,
            analytics: AnalyticsSettings {
                tables,
                article_language,
                major_exchanges,
            },
        })
    }
}

fn motherduck_token() -> Option<String> {
    env::var("motherduck_token")
        .or_else(|_| env::var("MOTHERDUCK_TOKEN"))
        .ok()
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(AppError::Config(format!("Invalid {}: {}", key, raw))),
    }
}

/// Parse a comma-separated exchange list into normalized names
pub fn parse_exchange_list(raw: &str) -> Result<Vec<String>> {
    let exchanges: Vec<String> = raw
        .split(',')
        .map(|e| e.trim().to_uppercase())
        .filter(|e| !e.is_empty())
        .collect();

    if exchanges.is_empty() {
        return Err(AppError::Config("Exchange allow-list is empty".to_string()));
    }

    Ok(exchanges)
}
