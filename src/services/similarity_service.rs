//! Similarity Service
//!
//! Pairs each article with the most similar earlier article about the same
//! symbol and prices both with the forward-return stages.

use crate::db::duckdb::models::SimilarPairReturn;
use crate::db::duckdb::query::{double, QueryBuilder};
use crate::error::{AppError, Result};
use crate::services::relations::{
    self, ARTICLE_SYMBOLS, ARTICLE_SYMBOL_EXCHANGES, CLEAN_SYMBOL_SET, MAJOR_EXCHANGES,
};
use crate::services::returns_service::ReturnsService;
use crate::state::AppState;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Length of `summary_embeddings` vectors
pub const EMBEDDING_DIM: usize = 256;

/// Minimum gap between an article and its similar predecessor
pub const MIN_GAP: &str = "INTERVAL 10 DAY";

/// Closed range on the rounded similarity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityRange {
    pub min: f64,
    pub max: f64,
}

impl SimilarityRange {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        let range = Self { min, max };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min.is_nan() || self.max.is_nan() || self.min > self.max {
            return Err(AppError::Validation(format!(
                "Invalid similarity range: {}..{}",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Similarity service for business logic
pub struct SimilarityService;

impl SimilarityService {
    /// Most similar prior article per (article, symbol), with both forward returns
    pub fn similar_pairs_with_returns(
        state: &AppState,
        range: Option<SimilarityRange>,
    ) -> Result<Vec<SimilarPairReturn>> {
        info!("SimilarityService::similar_pairs_with_returns - range={:?}", range);

        if let Some(r) = &range {
            if let Err(e) = r.validate() {
                warn!("Rejected similarity range {:?}", r);
                return Err(e);
            }
        }

        let settings = &state.settings;
        let tables = &settings.tables;

        let q = relations::article_symbols(QueryBuilder::new(), tables);
        let q = relations::article_symbol_exchanges(q, tables);
        let q = relations::clean_symbol_set(q, tables);
        let q = relations::major_exchanges(q, settings);

        let q = q
            .with(
                "sim_articles",
                format!(
                    "SELECT id, publish_time_ny, embedding::FLOAT[{dim}] AS embedding
                    FROM (
                        SELECT _id AS id, publish_time_ny, summary_embeddings AS embedding
                        FROM {articles}
                        WHERE len(summary_embeddings) = {dim}
                    )",
                    dim = EMBEDDING_DIM,
                    articles = tables.articles,
                ),
            )
            .with(
                "sim_anchors",
                format!(
                    "SELECT k.id, k.symbol, a.publish_time_ny, a.embedding
                    FROM (
                        SELECT DISTINCT id, symbol
                        FROM {ARTICLE_SYMBOL_EXCHANGES}
                        WHERE exchange IN (SELECT exchange FROM {MAJOR_EXCHANGES})
                          AND symbol IN (SELECT symbol FROM {CLEAN_SYMBOL_SET})
                    ) k
                    JOIN sim_articles a ON a.id = k.id"
                ),
            )
            .with(
                "sim_candidates",
                format!(
                    "SELECT
                        aa.id,
                        aa.symbol,
                        aa.publish_time_ny,
                        bs.id AS similar_id,
                        bs.publish_time_ny AS publish_time_second,
                        array_cosine_similarity(aa.embedding, bb.embedding)::DOUBLE AS similarity
                    FROM sim_anchors aa
                    JOIN {ARTICLE_SYMBOLS} bs
                      ON bs.symbol = aa.symbol
                     AND bs.id <> aa.id
                     AND bs.publish_time_ny <= aa.publish_time_ny - {MIN_GAP}
                    JOIN sim_articles bb ON bb.id = bs.id"
                ),
            )
            .with(
                "sim_best",
                "SELECT *
                FROM sim_candidates
                WHERE similarity IS NOT NULL AND NOT isnan(similarity)
                QUALIFY row_number() OVER (
                    PARTITION BY id, symbol
                    ORDER BY similarity DESC, publish_time_second DESC, similar_id
                ) = 1",
            )
            .with(
                "sim_first",
                "SELECT id, symbol, publish_time_ny, similar_id, publish_time_second, similarity
                FROM sim_best",
            )
            .with(
                "sim_second",
                "SELECT DISTINCT similar_id AS id, symbol, publish_time_second AS publish_time_ny
                FROM sim_best",
            );

        let (q, first) = ReturnsService::attach_position_returns(q, tables, "sim_first", "first_side");
        let (q, second) =
            ReturnsService::attach_position_returns(q, tables, "sim_second", "second_side");

        let (filter, params) = match range {
            Some(r) => (
                "WHERE round(f.similarity, 2) BETWEEN ? AND ?",
                vec![double(r.min), double(r.max)],
            ),
            None => ("", Vec::new()),
        };

        let query = q.select_with_params(
            format!(
                "SELECT
                    f.id,
                    f.similar_id,
                    f.symbol,
                    round(f.similarity, 2) AS similarity,
                    f.publish_time_ny,
                    f.publish_time_second,
                    f.position_return,
                    s.position_return
                FROM {first} f
                JOIN {second} s ON s.id = f.similar_id AND s.symbol = f.symbol
                {filter}
                ORDER BY f.id, f.symbol"
            ),
            params,
        );

        state.duckdb.query_rows(&query, |row| {
            Ok(SimilarPairReturn {
                id: row.get(0)?,
                similar_id: row.get(1)?,
                symbol: row.get(2)?,
                similarity: row.get(3)?,
                publish_time_first_article: row.get(4)?,
                publish_time_second_article: row.get(5)?,
                position_return_first_article: row.get(6)?,
                position_return_second_article: row.get(7)?,
            })
        })
    }
}
