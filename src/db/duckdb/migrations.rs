//! DuckDB schema bootstrap for local databases
//!
//! Upstream ingestion owns these tables in production. The migrations exist
//! so a local file or an in-memory database can be seeded with the same shape.

use crate::error::Result;
use duckdb::Connection;

/// Run all DuckDB migrations
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS migrations (
            name VARCHAR PRIMARY KEY,
            applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
    )?;

    run_migration(conn, "001_feature_extract", CREATE_FEATURE_EXTRACT)?;
    run_migration(conn, "002_minute_ohlc", CREATE_MINUTE_OHLC)?;
    run_migration(conn, "003_clean_symbols", CREATE_CLEAN_SYMBOLS)?;

    tracing::info!("DuckDB migrations completed");
    Ok(())
}

fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<()> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM migrations WHERE name = ?",
        [name],
        |row| row.get(0),
    )?;

    if !exists {
        tracing::info!("Running DuckDB migration: {}", name);
        conn.execute_batch(sql)?;
        conn.execute("INSERT INTO migrations (name) VALUES (?)", [name])?;
    }

    Ok(())
}

const CREATE_FEATURE_EXTRACT: &str = r#"
CREATE TABLE IF NOT EXISTS llm_feature_extract (
    _id VARCHAR PRIMARY KEY,
    url VARCHAR,
    publish_time_ny TIMESTAMP NOT NULL,
    article_language VARCHAR,
    financial_event_with_symbols JSON,
    sentiments JSON,
    summary_embeddings FLOAT[],
    summary VARCHAR
);

CREATE VIEW IF NOT EXISTS llm_feature_extract_date_ny AS
SELECT * FROM llm_feature_extract;
"#;

const CREATE_MINUTE_OHLC: &str = r#"
CREATE TABLE IF NOT EXISTS minute_ohlc_ny_tz (
    symbol VARCHAR NOT NULL,
    timestamp_ny TIMESTAMP NOT NULL,
    open DOUBLE NOT NULL,
    high DOUBLE NOT NULL,
    low DOUBLE NOT NULL,
    close DOUBLE NOT NULL,
    volume BIGINT NOT NULL,
    PRIMARY KEY (symbol, timestamp_ny)
);
"#;

const CREATE_CLEAN_SYMBOLS: &str = r#"
CREATE TABLE IF NOT EXISTS clean_symbols (
    symbol VARCHAR PRIMARY KEY
);
"#;
