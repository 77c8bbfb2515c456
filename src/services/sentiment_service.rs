//! Sentiment Service
//!
//! Mean and median weighted sentiment per period, in long form.

use crate::db::duckdb::models::PeriodStat;
use crate::db::duckdb::query::{text, QueryBuilder};
use crate::error::{AppError, Result};
use crate::services::aggregation::{self, Period};
use crate::services::relations::{self, normalize_symbol, WEIGHTED_SENTIMENT};
use crate::state::AppState;
use tracing::{info, warn};

/// Sentiment service for business logic
pub struct SentimentService;

impl SentimentService {
    /// Daily weighted sentiment across all stocks
    pub fn sentiment_per_day(state: &AppState) -> Result<Vec<PeriodStat>> {
        info!("SentimentService::sentiment_per_day");

        let q = relations::weighted_sentiment(QueryBuilder::new(), &state.settings.tables);
        let q = aggregation::mean_median_by_period(
            q,
            WEIGHTED_SENTIMENT,
            "publish_time_ny",
            "weighted_sentiment",
            Period::Day,
            "daily_sentiment",
        );

        let query = aggregation::period_stats_query(q, "daily_sentiment");
        aggregation::read_period_stats(&state.duckdb, &query)
    }

    /// Weighted sentiment per period for articles whose representative symbol is `symbol`
    pub fn sentiment_per_period_for_symbol(
        state: &AppState,
        period: Period,
        symbol: &str,
    ) -> Result<Vec<PeriodStat>> {
        info!(
            "SentimentService::sentiment_per_period_for_symbol - period={}, symbol={}",
            period, symbol
        );

        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            warn!("Rejected empty symbol");
            return Err(AppError::Validation("Symbol is empty".to_string()));
        }

        let q = relations::weighted_sentiment(QueryBuilder::new(), &state.settings.tables)
            .with_params(
                "symbol_sentiment",
                format!("SELECT * FROM {WEIGHTED_SENTIMENT} WHERE symbol = ?"),
                vec![text(symbol)],
            );
        let q = aggregation::mean_median_by_period(
            q,
            "symbol_sentiment",
            "publish_time_ny",
            "weighted_sentiment",
            period,
            "period_sentiment",
        );

        let query = aggregation::period_stats_query(q, "period_sentiment");
        aggregation::read_period_stats(&state.duckdb, &query)
    }
}
