//! Publish Service
//!
//! Article volume retrievals: date coverage, daily publish counts and symbol
//! mention counts per period.

use crate::db::duckdb::models::{
    ArticleDateRange, DailyPublishCount, PublishFrequency, SymbolMentionCount,
};
use crate::db::duckdb::query::{text, Pagination, QueryBuilder};
use crate::error::{AppError, Result};
use crate::services::aggregation::Period;
use crate::services::relations::{self, normalize_symbol, ARTICLE_SYMBOLS, CLEAN_SYMBOL_SET};
use crate::state::AppState;
use chrono::NaiveDate;
use tracing::{info, warn};

/// Publish service for business logic
pub struct PublishService;

impl PublishService {
    /// First and last publish date, `None` for an empty store
    pub fn article_date_range(state: &AppState) -> Result<Option<ArticleDateRange>> {
        info!("PublishService::article_date_range");

        let query = QueryBuilder::new().select(format!(
            "SELECT min(publish_time_ny)::DATE, max(publish_time_ny)::DATE FROM {}",
            state.settings.tables.articles
        ));

        let rows = state.duckdb.query_rows(&query, |row| {
            Ok((
                row.get::<_, Option<NaiveDate>>(0)?,
                row.get::<_, Option<NaiveDate>>(1)?,
            ))
        })?;

        Ok(match rows.into_iter().next() {
            Some((Some(min_date), Some(max_date))) => Some(ArticleDateRange { min_date, max_date }),
            _ => None,
        })
    }

    /// Articles in the configured language per calendar day
    pub fn publish_count_per_day(state: &AppState) -> Result<Vec<DailyPublishCount>> {
        info!(
            "PublishService::publish_count_per_day - language={}",
            state.settings.article_language
        );

        let query = QueryBuilder::new().select_with_params(
            format!(
                "SELECT publish_time_ny::DATE AS publish_date, count(*) AS article_count
                FROM {}
                WHERE article_language = ?
                GROUP BY publish_date
                ORDER BY publish_date",
                state.settings.tables.articles
            ),
            vec![text(state.settings.article_language.clone())],
        );

        state.duckdb.query_rows(&query, |row| {
            Ok(DailyPublishCount {
                date: row.get(0)?,
                count: row.get(1)?,
            })
        })
    }

    /// Mention counts per period for a page of the most mentioned clean symbols
    pub fn symbol_mentions_per_period(
        state: &AppState,
        period: Period,
        pagination: Pagination,
    ) -> Result<Vec<SymbolMentionCount>> {
        info!(
            "PublishService::symbol_mentions_per_period - period={}, pagination={:?}",
            period, pagination
        );

        let tables = &state.settings.tables;
        let q = relations::article_symbols(QueryBuilder::new(), tables);
        let q = relations::clean_symbol_set(q, tables)
            .with_params(
                "language_symbols",
                format!(
                    "SELECT id, publish_time_ny, symbol
                    FROM {ARTICLE_SYMBOLS}
                    WHERE article_language = ?
                      AND symbol IN (SELECT symbol FROM {CLEAN_SYMBOL_SET})"
                ),
                vec![text(state.settings.article_language.clone())],
            )
            .with(
                "top_symbols",
                format!(
                    "SELECT symbol, count(*) AS mentions
                    FROM language_symbols
                    GROUP BY symbol
                    ORDER BY mentions DESC, symbol{}",
                    pagination.clause()
                ),
            );

        let query = q.select(format!(
            "SELECT {bucket} AS date_period, symbol, count(*) AS symbol_count
            FROM language_symbols
            WHERE symbol IN (SELECT symbol FROM top_symbols)
            GROUP BY date_period, symbol
            ORDER BY symbol, date_period",
            bucket = period.truncate("publish_time_ny"),
        ));

        state.duckdb.query_rows(&query, |row| {
            Ok(SymbolMentionCount {
                date_period: row.get(0)?,
                symbol: row.get(1)?,
                symbol_count: row.get(2)?,
            })
        })
    }

    /// Articles in the configured language mentioning `symbol`, per period
    pub fn publish_frequency_for_symbol(
        state: &AppState,
        period: Period,
        symbol: &str,
    ) -> Result<Vec<PublishFrequency>> {
        info!(
            "PublishService::publish_frequency_for_symbol - period={}, symbol={}",
            period, symbol
        );

        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            warn!("Rejected empty symbol");
            return Err(AppError::Validation("Symbol is empty".to_string()));
        }

        let q = relations::article_symbols(QueryBuilder::new(), &state.settings.tables);
        let query = q.select_with_params(
            format!(
                "SELECT {bucket} AS date_period, count(DISTINCT id) AS article_count
                FROM {ARTICLE_SYMBOLS}
                WHERE article_language = ? AND symbol = ?
                GROUP BY date_period
                ORDER BY date_period",
                bucket = period.truncate("publish_time_ny"),
            ),
            vec![text(state.settings.article_language.clone()), text(symbol)],
        );

        state.duckdb.query_rows(&query, |row| {
            Ok(PublishFrequency {
                date_period: row.get(0)?,
                count: row.get(1)?,
            })
        })
    }
}
