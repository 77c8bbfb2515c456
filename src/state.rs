//! Application state management

use crate::config::{AnalyticsSettings, AppConfig};
use crate::db::duckdb::DuckDb;
use crate::error::Result;
use std::sync::Arc;

/// Connection handle and settings passed to every retrieval
pub struct AppState {
    /// DuckDB connection for the analytical store
    pub duckdb: Arc<DuckDb>,

    /// Source tables, language and exchange allow-list
    pub settings: AnalyticsSettings,
}

impl AppState {
    /// Create new application state from configuration
    pub fn new(config: &AppConfig) -> Result<Self> {
        config.analytics.tables.validate()?;

        let duckdb = Arc::new(DuckDb::open(&config.database, config.read_only)?);

        tracing::info!(
            "Application state initialized (language={}, exchanges={:?})",
            config.analytics.article_language,
            config.analytics.major_exchanges
        );

        Ok(Self {
            duckdb,
            settings: config.analytics.clone(),
        })
    }

    /// Wrap an already opened database
    pub fn with_database(duckdb: DuckDb, settings: AnalyticsSettings) -> Result<Self> {
        settings.tables.validate()?;
        Ok(Self {
            duckdb: Arc::new(duckdb),
            settings,
        })
    }

    /// Release the connection
    ///
    /// Succeeds without closing when another owner still holds the handle;
    /// the last owner closes it on drop.
    pub fn shutdown(self) -> Result<()> {
        match Arc::try_unwrap(self.duckdb) {
            Ok(duckdb) => duckdb.close(),
            Err(_) => {
                tracing::warn!("DuckDB handle still shared at shutdown");
                Ok(())
            }
        }
    }

    #[cfg(test)]
    pub fn new_for_testing() -> Result<Self> {
        Self::with_database(DuckDb::open_in_memory()?, AnalyticsSettings::default())
    }
}
