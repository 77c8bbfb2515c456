//! Temporal aggregation
//!
//! Buckets per-article values by a calendar period and reshapes mean and
//! median into long form, one row per (bucket, statistic).

use crate::db::duckdb::models::{AvgMethod, PeriodStat};
use crate::db::duckdb::query::{Query, QueryBuilder};
use crate::db::duckdb::DuckDb;
use crate::error::{AppError, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Calendar granularity for `date_trunc`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl Period {
    pub const ALL: [Period; 7] = [
        Period::Minute,
        Period::Hour,
        Period::Day,
        Period::Week,
        Period::Month,
        Period::Quarter,
        Period::Year,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Minute => "minute",
            Period::Hour => "hour",
            Period::Day => "day",
            Period::Week => "week",
            Period::Month => "month",
            Period::Quarter => "quarter",
            Period::Year => "year",
        }
    }

    /// Bucket expression for a timestamp column
    pub fn truncate(&self, column: &str) -> String {
        format!("date_trunc('{}', {})::TIMESTAMP", self.as_str(), column)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Period::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| AppError::Validation(format!("Invalid period: {}", s)))
    }
}

/// Attach mean/median per bucket of `value` in `input`, in long form, as `output`
///
/// `output` has columns `date_period`, `avg_method`, `avg_val`, `observations`.
pub fn mean_median_by_period(
    q: QueryBuilder,
    input: &str,
    timestamp: &str,
    value: &str,
    period: Period,
    output: &str,
) -> QueryBuilder {
    let wide = format!("{}_wide", output);

    q.with(
        &wide,
        format!(
            "SELECT
                {bucket} AS date_period,
                avg({value})::DOUBLE AS mean,
                median({value})::DOUBLE AS median,
                count(*) AS observations
            FROM {input}
            GROUP BY date_period",
            bucket = period.truncate(timestamp),
        ),
    )
    .with(
        output,
        format!(
            "SELECT date_period, avg_method, avg_val, observations
            FROM {wide}
            UNPIVOT (avg_val FOR avg_method IN (mean, median))"
        ),
    )
}

/// Finish a long-form relation into ordered [`PeriodStat`] rows
pub fn period_stats_query(q: QueryBuilder, relation: &str) -> Query {
    q.select(format!(
        "SELECT date_period, avg_method, avg_val, observations
        FROM {}
        ORDER BY date_period, avg_method",
        relation
    ))
}

pub fn read_period_stats(db: &DuckDb, query: &Query) -> Result<Vec<PeriodStat>> {
    let rows = db.query_rows(query, |row| {
        Ok((
            row.get::<_, NaiveDateTime>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, f64>(2)?,
            row.get::<_, i64>(3)?,
        ))
    })?;

    rows.into_iter()
        .map(|(date_period, method, avg_val, observations)| {
            let avg_method = AvgMethod::from_column(&method)
                .ok_or_else(|| AppError::Internal(format!("Unexpected statistic: {}", method)))?;

            Ok(PeriodStat {
                date_period,
                avg_method,
                avg_val,
                observations,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;

    #[test]
    fn test_parse_period() {
        assert_eq!("day".parse::<Period>().unwrap(), Period::Day);
        assert_eq!(" Week ".parse::<Period>().unwrap(), Period::Week);
        assert_eq!("MONTH".parse::<Period>().unwrap(), Period::Month);

        let err = "fortnight".parse::<Period>().unwrap_err();
        assert!(err.to_string().contains("fortnight"));
    }

    #[test]
    fn test_three_buckets_reshape_to_six_rows() {
        let state = AppState::new_for_testing().unwrap();
        let q = QueryBuilder::new().with(
            "facts",
            "SELECT * FROM (VALUES
                (TIMESTAMP '2024-01-01 09:00:00', 1.0),
                (TIMESTAMP '2024-01-01 17:00:00', 3.0),
                (TIMESTAMP '2024-01-01 18:00:00', 8.0),
                (TIMESTAMP '2024-01-02 09:00:00', 2.0),
                (TIMESTAMP '2024-01-03 09:00:00', -1.0),
                (TIMESTAMP '2024-01-03 10:00:00', 1.0)
            ) AS t(ts, val)",
        );
        let q = mean_median_by_period(q, "facts", "ts", "val", Period::Day, "stats");
        let rows = read_period_stats(&state.duckdb, &period_stats_query(q, "stats")).unwrap();

        assert_eq!(rows.len(), 6);
        assert_eq!(rows.iter().filter(|r| r.avg_method == AvgMethod::Mean).count(), 3);
        assert_eq!(rows.iter().filter(|r| r.avg_method == AvgMethod::Median).count(), 3);

        assert_eq!(rows[0].avg_method, AvgMethod::Mean);
        assert!((rows[0].avg_val - 4.0).abs() < 1e-9);
        assert_eq!(rows[0].observations, 3);
        assert_eq!(rows[1].avg_method, AvgMethod::Median);
        assert!((rows[1].avg_val - 3.0).abs() < 1e-9);

        assert_eq!(rows[4].date_period.to_string(), "2024-01-03 00:00:00");
        assert!(rows[4].avg_val.abs() < 1e-9);
    }

    #[test]
    fn test_week_bucket_starts_monday() {
        let state = AppState::new_for_testing().unwrap();
        let q = QueryBuilder::new().with(
            "facts",
            "SELECT * FROM (VALUES
                (TIMESTAMP '2024-01-03 09:00:00', 1.0),
                (TIMESTAMP '2024-01-05 09:00:00', 2.0)
            ) AS t(ts, val)",
        );
        let q = mean_median_by_period(q, "facts", "ts", "val", Period::Week, "stats");
        let rows = read_period_stats(&state.duckdb, &period_stats_query(q, "stats")).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date_period.to_string(), "2024-01-01 00:00:00");
        assert!((rows[0].avg_val - 1.5).abs() < 1e-9);
    }
}
