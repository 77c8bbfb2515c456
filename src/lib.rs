//! Newsdesk - financial news analytics
//!
//! Analytical query layer relating news-article sentiment and symbol
//! mentions to subsequent stock price movement. Retrievals are composed
//! from named relations over a DuckDB (or MotherDuck) store and return
//! flat, typed tables for a presentation layer.

pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod services;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "newsdesk=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
