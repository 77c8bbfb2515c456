//! Fixtures for database tests

use crate::db::duckdb::query::{double, text};
use crate::services::similarity_service::EMBEDDING_DIM;
use crate::state::AppState;
use duckdb::types::Value;
use serde_json::{json, Map, Value as Json};

/// Builder for one `llm_feature_extract` row
#[derive(Debug, Clone)]
pub struct ArticleFixture {
    id: String,
    publish_time: String,
    language: String,
    events: Vec<Json>,
    sentiments: Vec<Json>,
    embedding: Option<Vec<f32>>,
}

impl ArticleFixture {
    pub fn new(id: &str, publish_time: &str) -> Self {
        Self {
            id: id.to_string(),
            publish_time: publish_time.to_string(),
            language: "en".to_string(),
            events: Vec::new(),
            sentiments: Vec::new(),
            embedding: None,
        }
    }

    pub fn language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    pub fn event(mut self, symbol: &str, exchanges: &[&str]) -> Self {
        self.events.push(json!({
            "event_type": "earnings",
            "symbol": { "symbol": symbol, "stock_exchanges": exchanges }
        }));
        self
    }

    pub fn sentiment(mut self, score: Option<f64>, confidence: Option<f64>) -> Self {
        let mut entry = Map::new();
        if let Some(score) = score {
            entry.insert("sentiment_score".to_string(), json!(score));
        }
        if let Some(confidence) = confidence {
            entry.insert("sentiment_confidence".to_string(), json!(confidence));
        }
        self.sentiments.push(Json::Object(entry));
        self
    }

    /// Leading components of the embedding; the rest is zero padded
    pub fn embedding(mut self, leading: &[f32]) -> Self {
        let mut vector = vec![0.0_f32; EMBEDDING_DIM];
        vector[..leading.len()].copy_from_slice(leading);
        self.embedding = Some(vector);
        self
    }
}

pub fn insert_article(state: &AppState, article: &ArticleFixture) {
    let embedding = match &article.embedding {
        Some(vector) => {
            let parts: Vec<String> = vector.iter().map(|v| v.to_string()).collect();
            text(format!("[{}]", parts.join(", ")))
        }
        None => Value::Null,
    };

    state
        .duckdb
        .execute(
            "INSERT INTO llm_feature_extract VALUES
                (?, ?, ?::TIMESTAMP, ?, ?::JSON, ?::JSON, ?::FLOAT[], ?)",
            &[
                text(article.id.clone()),
                text(format!("https://news.example.com/{}", article.id)),
                text(article.publish_time.clone()),
                text(article.language.clone()),
                text(Json::Array(article.events.clone()).to_string()),
                text(Json::Array(article.sentiments.clone()).to_string()),
                embedding,
                text(format!("Summary of {}", article.id)),
            ],
        )
        .unwrap();
}

pub fn insert_bar(state: &AppState, symbol: &str, timestamp: &str, open: f64, close: f64) {
    state
        .duckdb
        .execute(
            "INSERT INTO minute_ohlc_ny_tz VALUES (?, ?::TIMESTAMP, ?, ?, ?, ?, 1000)",
            &[
                text(symbol),
                text(timestamp),
                double(open),
                double(open.max(close)),
                double(open.min(close)),
                double(close),
            ],
        )
        .unwrap();
}

pub fn insert_clean_symbols(state: &AppState, symbols: &[&str]) {
    for symbol in symbols {
        state
            .duckdb
            .execute("INSERT INTO clean_symbols VALUES (?)", &[text(*symbol)])
            .unwrap();
    }
}
