//! Returns Service
//!
//! Forward-return computation: for every event, the first price bar strictly
//! after the event (entry) and the first bar strictly after event + 1 day
//! (exit), joined by the event id. Events lacking either bar produce no row.

use crate::config::SourceTables;
use crate::db::duckdb::models::{PositionReturn, SentimentReturn};
use crate::db::duckdb::query::{text, QueryBuilder};
use crate::error::{AppError, Result};
use crate::services::relations::{self, normalize_symbol, CLEAN_SYMBOL_SET, WEIGHTED_SENTIMENT};
use crate::state::AppState;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::info;

/// Holding horizon between the event and the exit bar
pub const EXIT_HORIZON: &str = "INTERVAL 1 DAY";

/// Caller-supplied event for a direct forward-return lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnEvent {
    pub id: String,
    pub symbol: String,
    pub publish_time: NaiveDateTime,
}

/// Returns service for business logic
pub struct ReturnsService;

impl ReturnsService {
    /// Attach the forward-return stages for `input`
    ///
    /// `input` must expose `id`, `symbol` and `publish_time_ny` with `(id, symbol)`
    /// unique; its other columns pass through. Stage names are prefixed with
    /// `prefix` so several inputs can be priced within one query. Returns the builder and
    /// the name of the output relation, which adds `first_open_ts`,
    /// `first_open_price`, `last_close_ts`, `last_close_price`, `holding_secs`
    /// and `position_return` to the input columns.
    pub fn attach_position_returns(
        q: QueryBuilder,
        tables: &SourceTables,
        input: &str,
        prefix: &str,
    ) -> (QueryBuilder, String) {
        let prices = format!("{}_prices", prefix);
        let entry = format!("{}_entry", prefix);
        let exit = format!("{}_exit", prefix);
        let output = format!("{}_returns", prefix);

        let q = q
            .with(
                &prices,
                format!(
                    "SELECT upper(trim(symbol)) AS symbol, timestamp_ny, open, close
                    FROM {prices_table}
                    WHERE upper(trim(symbol)) IN (SELECT symbol FROM {input})",
                    prices_table = tables.prices,
                ),
            )
            .with(
                &entry,
                format!(
                    "SELECT i.id, i.symbol, o.timestamp_ny AS first_open_ts, o.open AS first_open_price
                    FROM {input} i
                    ASOF JOIN {prices} o
                      ON i.symbol = o.symbol AND i.publish_time_ny < o.timestamp_ny"
                ),
            )
            .with(
                &exit,
                format!(
                    "SELECT i.id, i.symbol, o.timestamp_ny AS last_close_ts, o.close AS last_close_price
                    FROM {input} i
                    ASOF JOIN {prices} o
                      ON i.symbol = o.symbol AND i.publish_time_ny + {EXIT_HORIZON} < o.timestamp_ny"
                ),
            )
            .with(
                &output,
                format!(
                    "SELECT
                        i.*,
                        e.first_open_ts,
                        e.first_open_price::DOUBLE AS first_open_price,
                        x.last_close_ts,
                        x.last_close_price::DOUBLE AS last_close_price,
                        date_diff('second', e.first_open_ts, x.last_close_ts) AS holding_secs,
                        (x.last_close_price / e.first_open_price - 1)::DOUBLE AS position_return
                    FROM {input} i
                    JOIN {entry} e ON e.id = i.id AND e.symbol = i.symbol
                    JOIN {exit} x ON x.id = i.id AND x.symbol = i.symbol
                    WHERE e.first_open_price <> 0"
                ),
            );

        (q, output)
    }

    /// Forward returns for caller-supplied events
    pub fn position_returns(state: &AppState, events: &[ReturnEvent]) -> Result<Vec<PositionReturn>> {
        info!("ReturnsService::position_returns - {} events", events.len());

        if events.is_empty() {
            return Ok(Vec::new());
        }

        let mut seen = HashSet::new();
        if let Some(dup) = events.iter().find(|e| !seen.insert(e.id.as_str())) {
            return Err(AppError::Validation(format!("Duplicate event id: {}", dup.id)));
        }

        let placeholders = vec!["(?::VARCHAR, ?::VARCHAR, ?::TIMESTAMP)"; events.len()].join(", ");
        let params = events.iter().flat_map(|e| {
            [
                text(e.id.clone()),
                text(normalize_symbol(&e.symbol)),
                text(e.publish_time.format("%Y-%m-%d %H:%M:%S%.6f").to_string()),
            ]
        });

        let q = QueryBuilder::new().with_params(
            "return_events",
            format!(
                "SELECT * FROM (VALUES {}) AS t(id, symbol, publish_time_ny)",
                placeholders
            ),
            params,
        );
        let (q, returns) =
            Self::attach_position_returns(q, &state.settings.tables, "return_events", "events");

        let query = q.select(format!(
            "SELECT id, symbol, publish_time_ny, first_open_ts, first_open_price,
                    last_close_ts, last_close_price, holding_secs, position_return
            FROM {}
            ORDER BY publish_time_ny, id",
            returns
        ));

        state.duckdb.query_rows(&query, |row| {
            Ok(PositionReturn {
                id: row.get(0)?,
                symbol: row.get(1)?,
                publish_time: row.get(2)?,
                first_open_ts: row.get(3)?,
                first_open_price: row.get(4)?,
                last_close_ts: row.get(5)?,
                last_close_price: row.get(6)?,
                holding_secs: row.get(7)?,
                position_return: row.get(8)?,
            })
        })
    }

    /// Weighted sentiment of every clean-symbol article next to its forward return
    pub fn sentiment_return_pairs(state: &AppState) -> Result<Vec<SentimentReturn>> {
        info!("ReturnsService::sentiment_return_pairs");

        let tables = &state.settings.tables;
        let q = relations::weighted_sentiment(QueryBuilder::new(), tables);
        let q = relations::clean_symbol_set(q, tables).with(
            "sentiment_events",
            format!(
                "SELECT id, symbol, publish_time_ny, weighted_sentiment
                FROM {WEIGHTED_SENTIMENT}
                WHERE symbol IN (SELECT symbol FROM {CLEAN_SYMBOL_SET})"
            ),
        );
        let (q, returns) = Self::attach_position_returns(q, tables, "sentiment_events", "sentiment");

        let query = q.select(format!(
            "SELECT id, symbol, publish_time_ny, weighted_sentiment::DOUBLE, position_return
            FROM {}
            ORDER BY publish_time_ny, id",
            returns
        ));

        state.duckdb.query_rows(&query, |row| {
            Ok(SentimentReturn {
                id: row.get(0)?,
                symbol: row.get(1)?,
                publish_time: row.get(2)?,
                weighted_sentiment: row.get(3)?,
                position_return: row.get(4)?,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{insert_article, insert_bar, insert_clean_symbols, ArticleFixture};
    use chrono::Duration;

    fn ts(raw: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn event(id: &str, symbol: &str, at: &str) -> ReturnEvent {
        ReturnEvent {
            id: id.to_string(),
            symbol: symbol.to_string(),
            publish_time: ts(at),
        }
    }

    #[test]
    fn test_no_exit_bar_and_no_prices_yield_no_rows() {
        let state = AppState::new_for_testing().unwrap();
        insert_bar(&state, "AAPL", "2024-01-01 09:31:00", 100.0, 101.0);

        let rows = ReturnsService::position_returns(
            &state,
            &[
                event("e1", "AAPL", "2024-01-01 09:30:00"),
                event("e2", "MSFT", "2024-01-01 09:30:00"),
            ],
        )
        .unwrap();

        assert!(rows.is_empty());
    }

    #[test]
    fn test_entry_and_exit_are_strictly_after() {
        let state = AppState::new_for_testing().unwrap();
        insert_bar(&state, "AAPL", "2024-01-01 09:30:00", 99.0, 99.5);
        insert_bar(&state, "AAPL", "2024-01-01 09:31:00", 100.0, 101.0);
        insert_bar(&state, "AAPL", "2024-01-02 09:30:00", 104.0, 104.5);
        insert_bar(&state, "AAPL", "2024-01-02 09:31:00", 105.0, 110.0);

        let rows =
            ReturnsService::position_returns(&state, &[event("e1", "aapl ", "2024-01-01 09:30:00")])
                .unwrap();

        assert_eq!(rows.len(), 1);
        let r = &rows[0];
        assert_eq!(r.symbol, "AAPL");
        assert_eq!(r.first_open_ts, ts("2024-01-01 09:31:00"));
        assert_eq!(r.last_close_ts, ts("2024-01-02 09:31:00"));
        assert!(r.first_open_ts > r.publish_time);
        assert!(r.last_close_ts > r.publish_time + Duration::days(1));
        assert_eq!(r.holding_secs, 86_400);
        assert!((r.position_return - (110.0 / 100.0 - 1.0)).abs() < 1e-9);
    }

    #[test]
    fn test_gaps_use_nearest_subsequent_bar() {
        let state = AppState::new_for_testing().unwrap();
        // Friday afternoon event, next bars on Monday and Tuesday
        insert_bar(&state, "MSFT", "2024-01-08 09:30:00", 50.0, 51.0);
        insert_bar(&state, "MSFT", "2024-01-09 09:30:00", 52.0, 55.0);

        let rows =
            ReturnsService::position_returns(&state, &[event("e1", "MSFT", "2024-01-05 15:00:00")])
                .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].first_open_ts, ts("2024-01-08 09:30:00"));
        assert_eq!(rows[0].last_close_ts, ts("2024-01-08 09:30:00"));
        assert!((rows[0].position_return - (51.0 / 50.0 - 1.0)).abs() < 1e-9);
    }

    #[test]
    fn test_duplicate_event_ids_rejected() {
        let state = AppState::new_for_testing().unwrap();
        let err = ReturnsService::position_returns(
            &state,
            &[
                event("e1", "AAPL", "2024-01-01 09:30:00"),
                event("e1", "MSFT", "2024-01-01 09:30:00"),
            ],
        )
        .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_sentiment_return_pairs() {
        let state = AppState::new_for_testing().unwrap();
        insert_clean_symbols(&state, &["AAPL"]);
        insert_bar(&state, "AAPL", "2024-01-02 10:00:00", 100.0, 100.0);
        insert_bar(&state, "AAPL", "2024-01-03 10:00:00", 100.0, 102.0);
        insert_bar(&state, "TSLA", "2024-01-02 10:00:00", 10.0, 10.0);
        insert_bar(&state, "TSLA", "2024-01-03 10:00:00", 10.0, 12.0);

        insert_article(
            &state,
            &ArticleFixture::new("a1", "2024-01-02 09:00:00")
                .event("AAPL", &["NASDAQ"])
                .sentiment(Some(0.5), Some(0.8)),
        );
        // No sentiment entries
        insert_article(
            &state,
            &ArticleFixture::new("a2", "2024-01-02 09:00:00").event("AAPL", &["NASDAQ"]),
        );
        // Not in the clean symbol set
        insert_article(
            &state,
            &ArticleFixture::new("a3", "2024-01-02 09:00:00")
                .event("TSLA", &["NASDAQ"])
                .sentiment(Some(0.5), Some(0.8)),
        );

        let rows = ReturnsService::sentiment_return_pairs(&state).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "a1");
        assert!((rows[0].weighted_sentiment - 0.4).abs() < 1e-9);
        assert!((rows[0].position_return - 0.02).abs() < 1e-9);
    }
}
