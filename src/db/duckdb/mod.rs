//! DuckDB database module for the analytical query layer

pub mod models;
pub mod query;
mod migrations;

use crate::config::DatabaseTarget;
use crate::error::{AppError, Result};
use duckdb::{AccessMode, Config, Connection, Row};
use parking_lot::Mutex;
use query::Query;

/// DuckDB database wrapper
///
/// Owns the single connection used by every retrieval. Queries are read-only;
/// the only writes are the explicit schema bootstrap for local databases.
pub struct DuckDb {
    conn: Mutex<Connection>,
    target: DatabaseTarget,
}

impl DuckDb {
    /// Open a connection to the configured target
    pub fn open(target: &DatabaseTarget, read_only: bool) -> Result<Self> {
        let conn = match target {
            DatabaseTarget::InMemory => Connection::open_in_memory()?,
            DatabaseTarget::File(path) if read_only => {
                let config = Config::default().access_mode(AccessMode::ReadOnly)?;
                Connection::open_with_flags(path, config)?
            }
            DatabaseTarget::File(path) => Connection::open(path)?,
            DatabaseTarget::MotherDuck { .. } => Connection::open(target.connection_string())?,
        };

        tracing::info!("Opened DuckDB connection: {} (read_only={})", target, read_only);

        Ok(Self {
            conn: Mutex::new(conn),
            target: target.clone(),
        })
    }

    /// In-memory database with the base schema in place
    pub fn open_in_memory() -> Result<Self> {
        let db = Self::open(&DatabaseTarget::InMemory, false)?;
        db.bootstrap_schema()?;
        Ok(db)
    }

    pub fn target(&self) -> &DatabaseTarget {
        &self.target
    }

    /// Create the base tables for a local database
    pub fn bootstrap_schema(&self) -> Result<()> {
        if matches!(self.target, DatabaseTarget::MotherDuck { .. }) {
            return Err(AppError::Validation(
                "Schema bootstrap is only available for local databases".to_string(),
            ));
        }

        let conn = self.conn.lock();
        migrations::run_migrations(&conn)
    }

    /// Run a built query and map every row
    pub fn query_rows<T, F>(&self, query: &Query, map: F) -> Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> duckdb::Result<T>,
    {
        tracing::debug!(params = query.params().len(), "Executing query:\n{}", query.sql());

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(query.sql())?;

        let rows = stmt
            .query_map(duckdb::params_from_iter(query.params().iter()), map)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        tracing::debug!("Query returned {} rows", rows.len());
        Ok(rows)
    }

    /// Databases visible to the connection (connectivity check)
    pub fn list_databases(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT database_name FROM duckdb_databases() ORDER BY database_name")?;

        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;

        Ok(names)
    }

    /// Close the connection, surfacing any engine error
    pub fn close(self) -> Result<()> {
        tracing::info!("Closing DuckDB connection: {}", self.target);
        self.conn.into_inner().close().map_err(|(_, e)| AppError::DuckDb(e))
    }

    #[cfg(test)]
    pub(crate) fn execute(&self, sql: &str, params: &[duckdb::types::Value]) -> Result<usize> {
        let conn = self.conn.lock();
        Ok(conn.execute(sql, duckdb::params_from_iter(params.iter()))?)
    }
}
