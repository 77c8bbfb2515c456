//! DuckDB result models
//!
//! One record type per retrieval. All of them serialize flat so the
//! presentation layer can treat a `Vec` of them as a table.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// First and last publish date in the article store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleDateRange {
    pub min_date: NaiveDate,
    pub max_date: NaiveDate,
}

/// Article publish count for one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPublishCount {
    pub date: NaiveDate,
    pub count: i64,
}

/// Mentions of one symbol within one period bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolMentionCount {
    pub date_period: NaiveDateTime,
    pub symbol: String,
    pub symbol_count: i64,
}

/// Article count for one period bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishFrequency {
    pub date_period: NaiveDateTime,
    pub count: i64,
}

/// Statistic that produced a [`PeriodStat`] value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvgMethod {
    Mean,
    Median,
}

impl AvgMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AvgMethod::Mean => "mean",
            AvgMethod::Median => "median",
        }
    }

    pub(crate) fn from_column(name: &str) -> Option<Self> {
        match name {
            "mean" => Some(AvgMethod::Mean),
            "median" => Some(AvgMethod::Median),
            _ => None,
        }
    }
}

impl fmt::Display for AvgMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Long-form aggregate row: one per (bucket, statistic)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodStat {
    pub date_period: NaiveDateTime,
    pub avg_method: AvgMethod,
    pub avg_val: f64,
    /// Number of weighted sentiment observations in the bucket
    pub observations: i64,
}

/// Entry in a symbol listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedSymbol {
    pub symbol: String,
    pub article_count: i64,
    /// Population std dev of weighted sentiment scaled by relative coverage
    pub sentiment_std_dev_scaled: Option<f64>,
    pub monthly_articles: f64,
}

/// Forward return for one event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionReturn {
    pub id: String,
    pub symbol: String,
    pub publish_time: NaiveDateTime,
    pub first_open_ts: NaiveDateTime,
    pub first_open_price: f64,
    pub last_close_ts: NaiveDateTime,
    pub last_close_price: f64,
    pub holding_secs: i64,
    pub position_return: f64,
}

/// Weighted sentiment of an article next to its forward return
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentReturn {
    pub id: String,
    pub symbol: String,
    pub publish_time: NaiveDateTime,
    pub weighted_sentiment: f64,
    pub position_return: f64,
}

/// Most similar prior article pair with both forward returns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarPairReturn {
    pub id: String,
    pub similar_id: String,
    pub symbol: String,
    /// Cosine similarity rounded to two decimals
    pub similarity: f64,
    pub publish_time_first_article: NaiveDateTime,
    pub publish_time_second_article: NaiveDateTime,
    pub position_return_first_article: f64,
    pub position_return_second_article: f64,
}
