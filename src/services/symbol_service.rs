//! Symbol Service
//!
//! Lists the clean symbol universe restricted to the exchange allow-list,
//! ordered alphabetically, by article count or by scaled sentiment volatility.

use crate::db::duckdb::models::RankedSymbol;
use crate::db::duckdb::query::{double, Pagination, QueryBuilder};
use crate::error::{AppError, Result};
use crate::services::relations::{
    self, ARTICLE_SYMBOLS, ARTICLE_SYMBOL_EXCHANGES, CLEAN_SYMBOL_SET, MAJOR_EXCHANGES,
    WEIGHTED_SENTIMENT,
};
use crate::state::AppState;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// Average articles per month required by the coverage filter
pub const MIN_MONTHLY_ARTICLES: f64 = 5.0;

/// Symbol listing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SymbolSortOption {
    SentimentStdDev,
    NumberOfArticles,
    Symbol,
}

impl SymbolSortOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolSortOption::SentimentStdDev => "SENTIMENT_STD_DEV",
            SymbolSortOption::NumberOfArticles => "NUMBER_OF_ARTICLES",
            SymbolSortOption::Symbol => "SYMBOL",
        }
    }

    fn order_by(&self) -> &'static str {
        match self {
            SymbolSortOption::SentimentStdDev => "sentiment_std_dev_scaled DESC, symbol",
            SymbolSortOption::NumberOfArticles => "article_count DESC, symbol",
            SymbolSortOption::Symbol => "symbol",
        }
    }
}

impl fmt::Display for SymbolSortOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SymbolSortOption {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SENTIMENT_STD_DEV" => Ok(SymbolSortOption::SentimentStdDev),
            "NUMBER_OF_ARTICLES" => Ok(SymbolSortOption::NumberOfArticles),
            "SYMBOL" => Ok(SymbolSortOption::Symbol),
            _ => Err(AppError::Validation(format!("Invalid sort option: {}", s))),
        }
    }
}

/// Auxiliary listing filters
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SymbolFilters {
    /// Keep only symbols present in the volatility ranking
    pub large_sentiment_change: bool,
    /// Keep only symbols averaging at least this many articles per month
    pub min_monthly_articles: Option<f64>,
}

impl SymbolFilters {
    /// Coverage filter at [`MIN_MONTHLY_ARTICLES`]
    pub fn sufficient_coverage() -> Self {
        Self {
            large_sentiment_change: false,
            min_monthly_articles: Some(MIN_MONTHLY_ARTICLES),
        }
    }
}

/// Symbol service for business logic
pub struct SymbolService;

impl SymbolService {
    /// List symbols with a sort option given as text
    pub fn list_symbols_by_name(
        state: &AppState,
        sort: &str,
        filters: SymbolFilters,
        pagination: Pagination,
    ) -> Result<Vec<RankedSymbol>> {
        let sort = sort.parse::<SymbolSortOption>().map_err(|e| {
            warn!("Rejected sort option: {}", sort);
            e
        })?;
        Self::list_symbols(state, sort, filters, pagination)
    }

    /// List symbols on allow-listed exchanges that are in the clean set
    pub fn list_symbols(
        state: &AppState,
        sort: SymbolSortOption,
        filters: SymbolFilters,
        pagination: Pagination,
    ) -> Result<Vec<RankedSymbol>> {
        info!(
            "SymbolService::list_symbols - sort={}, filters={:?}, pagination={:?}",
            sort, filters, pagination
        );

        let settings = &state.settings;
        let tables = &settings.tables;

        let q = relations::article_symbols(QueryBuilder::new(), tables);
        let q = relations::article_symbol_exchanges(q, tables);
        let q = relations::clean_symbol_set(q, tables);
        let q = relations::major_exchanges(q, settings);
        let q = relations::weighted_sentiment(q, tables);

        let q = q
            .with(
                "listed_symbols",
                format!(
                    "SELECT DISTINCT symbol
                    FROM {ARTICLE_SYMBOL_EXCHANGES}
                    WHERE exchange IN (SELECT exchange FROM {MAJOR_EXCHANGES})
                      AND symbol IN (SELECT symbol FROM {CLEAN_SYMBOL_SET})"
                ),
            )
            .with(
                "symbol_article_counts",
                format!(
                    "SELECT symbol, count(DISTINCT id) AS article_count
                    FROM {ARTICLE_SYMBOLS}
                    GROUP BY symbol"
                ),
            )
            .with(
                "symbol_volatility",
                format!(
                    "SELECT
                        symbol,
                        (stddev_pop(weighted_sentiment)
                            * (count(*)::DOUBLE / max(count(*)) OVER ()))::DOUBLE AS sentiment_std_dev_scaled
                    FROM {WEIGHTED_SENTIMENT}
                    WHERE symbol IN (SELECT symbol FROM {CLEAN_SYMBOL_SET})
                    GROUP BY symbol"
                ),
            )
            .with(
                "dataset_months",
                format!(
                    "SELECT coalesce(date_diff('month', min(publish_time_ny), max(publish_time_ny)) + 1, 1) AS months
                    FROM {}",
                    tables.articles
                ),
            )
            .with(
                "ranked_symbols",
                "SELECT
                    l.symbol,
                    coalesce(c.article_count, 0) AS article_count,
                    v.sentiment_std_dev_scaled,
                    coalesce(c.article_count, 0)::DOUBLE / m.months AS monthly_articles
                FROM listed_symbols l
                LEFT JOIN symbol_article_counts c ON c.symbol = l.symbol
                LEFT JOIN symbol_volatility v ON v.symbol = l.symbol
                CROSS JOIN dataset_months m",
            );

        let mut conditions = Vec::new();
        let mut params = Vec::new();

        if filters.large_sentiment_change || sort == SymbolSortOption::SentimentStdDev {
            conditions.push("sentiment_std_dev_scaled IS NOT NULL");
        }
        if let Some(min) = filters.min_monthly_articles {
            conditions.push("monthly_articles >= ?");
            params.push(double(min));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = q.select_with_params(
            format!(
                "SELECT symbol, article_count, sentiment_std_dev_scaled, monthly_articles
                FROM ranked_symbols
                {}
                ORDER BY {}{}",
                where_clause,
                sort.order_by(),
                pagination.clause()
            ),
            params,
        );

        state.duckdb.query_rows(&query, |row| {
            Ok(RankedSymbol {
                symbol: row.get(0)?,
                article_count: row.get(1)?,
                sentiment_std_dev_scaled: row.get(2)?,
                monthly_articles: row.get(3)?,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{insert_article, insert_clean_symbols, ArticleFixture};

    fn symbols(rows: &[RankedSymbol]) -> Vec<&str> {
        rows.iter().map(|r| r.symbol.as_str()).collect()
    }

    /// AAA: 4 articles, BBB: 2, CCC: 1 without sentiment; all NASDAQ and clean
    fn seed(state: &AppState) {
        insert_clean_symbols(state, &["AAA", "BBB", "CCC", "OTCX"]);

        for (i, score) in [1.0, -1.0, 1.0, -1.0].iter().enumerate() {
            insert_article(
                state,
                &ArticleFixture::new(&format!("aaa{}", i), &format!("2024-01-0{} 10:00:00", i + 1))
                    .event("AAA", &["NASDAQ"])
                    .sentiment(Some(*score), Some(1.0)),
            );
        }
        for (i, score) in [1.0, -1.0].iter().enumerate() {
            insert_article(
                state,
                &ArticleFixture::new(&format!("bbb{}", i), &format!("2024-01-0{} 11:00:00", i + 1))
                    .event("bbb", &["nyse"])
                    .sentiment(Some(*score), Some(1.0)),
            );
        }
        insert_article(
            state,
            &ArticleFixture::new("ccc0", "2024-01-05 10:00:00").event("CCC", &["NASDAQ"]),
        );
        insert_article(
            state,
            &ArticleFixture::new("otc0", "2024-01-05 10:00:00").event("OTCX", &["OTC"]),
        );
        insert_article(
            state,
            &ArticleFixture::new("dirty0", "2024-01-05 10:00:00").event("DIRTY", &["NASDAQ"]),
        );
    }

    #[test]
    fn test_parse_sort_option() {
        assert_eq!(
            "sentiment_std_dev".parse::<SymbolSortOption>().unwrap(),
            SymbolSortOption::SentimentStdDev
        );
        assert_eq!("SYMBOL".parse::<SymbolSortOption>().unwrap(), SymbolSortOption::Symbol);

        let err = "bogus".parse::<SymbolSortOption>().unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn test_alphabetic_listing_filters_exchange_and_clean_set() {
        let state = AppState::new_for_testing().unwrap();
        seed(&state);

        let rows = SymbolService::list_symbols(
            &state,
            SymbolSortOption::Symbol,
            SymbolFilters::default(),
            Pagination::default(),
        )
        .unwrap();

        assert_eq!(symbols(&rows), vec!["AAA", "BBB", "CCC"]);
        assert_eq!(rows[0].article_count, 4);
        assert!(rows[2].sentiment_std_dev_scaled.is_none());
    }

    #[test]
    fn test_article_count_order_and_pagination() {
        let state = AppState::new_for_testing().unwrap();
        seed(&state);

        let rows = SymbolService::list_symbols(
            &state,
            SymbolSortOption::NumberOfArticles,
            SymbolFilters::default(),
            Pagination::new(1, Some(1)),
        )
        .unwrap();

        assert_eq!(symbols(&rows), vec!["BBB"]);
    }

    #[test]
    fn test_volatility_scales_with_coverage() {
        let state = AppState::new_for_testing().unwrap();
        seed(&state);

        let rows = SymbolService::list_symbols(
            &state,
            SymbolSortOption::SentimentStdDev,
            SymbolFilters::default(),
            Pagination::default(),
        )
        .unwrap();

        // Equal spread, AAA has twice the observations
        assert_eq!(symbols(&rows), vec!["AAA", "BBB"]);
        let aaa = rows[0].sentiment_std_dev_scaled.unwrap();
        let bbb = rows[1].sentiment_std_dev_scaled.unwrap();
        assert!((aaa - 1.0).abs() < 1e-9);
        assert!((bbb - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_filters() {
        let state = AppState::new_for_testing().unwrap();
        seed(&state);

        let volatile = SymbolService::list_symbols(
            &state,
            SymbolSortOption::Symbol,
            SymbolFilters {
                large_sentiment_change: true,
                min_monthly_articles: None,
            },
            Pagination::default(),
        )
        .unwrap();
        assert_eq!(symbols(&volatile), vec!["AAA", "BBB"]);

        // Single-month dataset: monthly average equals the article count
        let covered = SymbolService::list_symbols(
            &state,
            SymbolSortOption::Symbol,
            SymbolFilters {
                large_sentiment_change: false,
                min_monthly_articles: Some(2.0),
            },
            Pagination::default(),
        )
        .unwrap();
        assert_eq!(symbols(&covered), vec!["AAA", "BBB"]);

        let sparse = SymbolService::list_symbols(
            &state,
            SymbolSortOption::Symbol,
            SymbolFilters::sufficient_coverage(),
            Pagination::default(),
        )
        .unwrap();
        assert!(sparse.is_empty());
    }

    #[test]
    fn test_unknown_sort_name_rejected() {
        let state = AppState::new_for_testing().unwrap();
        let err = SymbolService::list_symbols_by_name(
            &state,
            "bogus",
            SymbolFilters::default(),
            Pagination::default(),
        )
        .unwrap_err();

        assert_eq!(err.to_string(), "Validation error: Invalid sort option: bogus");
    }
}
