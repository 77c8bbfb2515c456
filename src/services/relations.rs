//! Shared relations: symbol extraction and sentiment weighting
//!
//! Each function attaches one stage (plus whatever it reads from) to a
//! [`QueryBuilder`] under a fixed name. Stages are attached at most once per
//! query, so retrievals request whatever they need without coordinating.

use crate::config::{AnalyticsSettings, SourceTables};
use crate::db::duckdb::query::{text, values_placeholders, QueryBuilder};

/// One row per (article, distinct normalized symbol)
pub const ARTICLE_SYMBOLS: &str = "article_symbols";
/// One row per financial event JSON object
pub const ARTICLE_EVENTS: &str = "article_events";
/// One row per (article, symbol, listed exchange) taken from the same event
pub const ARTICLE_SYMBOL_EXCHANGES: &str = "article_symbol_exchanges";
pub const CLEAN_SYMBOL_SET: &str = "clean_symbol_set";
pub const MAJOR_EXCHANGES: &str = "major_exchanges";
pub const ARTICLE_SENTIMENT: &str = "article_sentiment";
/// One row per article with a representative symbol and a defined weighted sentiment
pub const WEIGHTED_SENTIMENT: &str = "weighted_sentiment";

/// Uppercase and strip surrounding whitespace
pub fn normalize_symbol(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// SQL counterpart of [`normalize_symbol`]; empty results become NULL
fn normalized_sql(expr: &str) -> String {
    format!("NULLIF(upper(trim({})), '')", expr)
}

/// Exploded mode: every distinct symbol an article mentions
pub fn article_symbols(q: QueryBuilder, tables: &SourceTables) -> QueryBuilder {
    q.with(
        ARTICLE_SYMBOLS,
        format!(
            "SELECT DISTINCT id, publish_time_ny, article_language, {symbol} AS symbol
            FROM (
                SELECT
                    _id AS id,
                    publish_time_ny,
                    article_language,
                    unnest(json_extract_string(financial_event_with_symbols, '$[*].symbol.symbol')) AS raw_symbol
                FROM {articles}
            )
            WHERE {symbol} IS NOT NULL",
            symbol = normalized_sql("raw_symbol"),
            articles = tables.articles,
        ),
    )
}

/// Symbol and exchange pairs, kept per event so an exchange is never
/// attributed to another event's symbol
pub fn article_symbol_exchanges(q: QueryBuilder, tables: &SourceTables) -> QueryBuilder {
    q.with(
        ARTICLE_EVENTS,
        format!(
            "SELECT _id AS id, unnest(json_extract(financial_event_with_symbols, '$[*]')) AS event
            FROM {}",
            tables.articles
        ),
    )
    .with(
        ARTICLE_SYMBOL_EXCHANGES,
        format!(
            "SELECT DISTINCT id, symbol, {exchange} AS exchange
            FROM (
                SELECT
                    id,
                    {symbol} AS symbol,
                    unnest(json_extract_string(event, '$.symbol.stock_exchanges[*]')) AS raw_exchange
                FROM {events}
            )
            WHERE symbol IS NOT NULL AND {exchange} IS NOT NULL",
            exchange = normalized_sql("raw_exchange"),
            symbol = normalized_sql("json_extract_string(event, '$.symbol.symbol')"),
            events = ARTICLE_EVENTS,
        ),
    )
}

/// Clean symbol reference list, normalized for exact matching
pub fn clean_symbol_set(q: QueryBuilder, tables: &SourceTables) -> QueryBuilder {
    q.with(
        CLEAN_SYMBOL_SET,
        format!(
            "SELECT DISTINCT {} AS symbol
            FROM {}
            WHERE {} IS NOT NULL",
            normalized_sql("symbol"),
            tables.clean_symbols,
            normalized_sql("symbol"),
        ),
    )
}

/// Exchange allow-list as a one-column relation
pub fn major_exchanges(q: QueryBuilder, settings: &AnalyticsSettings) -> QueryBuilder {
    if settings.major_exchanges.is_empty() {
        return q.with(MAJOR_EXCHANGES, "SELECT NULL::VARCHAR AS exchange WHERE false");
    }

    q.with_params(
        MAJOR_EXCHANGES,
        format!(
            "SELECT exchange FROM (VALUES {}) AS t(exchange)",
            values_placeholders(settings.major_exchanges.len(), "VARCHAR")
        ),
        settings
            .major_exchanges
            .iter()
            .map(|e| text(normalize_symbol(e))),
    )
}

/// First-only symbol and positional score × confidence products
///
/// Each sentiment entry carries its own score and confidence, so pairing is
/// done per entry. A missing score or confidence makes that product NULL.
pub fn article_sentiment(q: QueryBuilder, tables: &SourceTables) -> QueryBuilder {
    q.with(
        ARTICLE_SENTIMENT,
        format!(
            "SELECT
                _id AS id,
                publish_time_ny,
                {symbol} AS symbol,
                list_transform(
                    json_extract(sentiments, '$[*]'),
                    s -> TRY_CAST(json_extract_string(s, '$.sentiment_score') AS DOUBLE)
                        * TRY_CAST(json_extract_string(s, '$.sentiment_confidence') AS DOUBLE)
                ) AS weighted_mentions
            FROM {articles}",
            symbol = normalized_sql(
                "json_extract_string(financial_event_with_symbols, '$[*].symbol.symbol')[1]"
            ),
            articles = tables.articles,
        ),
    )
}

/// Weighted sentiment facts; rows without a symbol or a first product are dropped
pub fn weighted_sentiment(q: QueryBuilder, tables: &SourceTables) -> QueryBuilder {
    article_sentiment(q, tables).with(
        WEIGHTED_SENTIMENT,
        format!(
            "SELECT id, publish_time_ny, symbol, weighted_mentions[1] AS weighted_sentiment
            FROM {}
            WHERE symbol IS NOT NULL
              AND weighted_mentions[1] IS NOT NULL",
            ARTICLE_SENTIMENT
        ),
    )
}
