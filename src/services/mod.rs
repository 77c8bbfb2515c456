//! Services Layer
//!
//! Retrievals called by the CLI commands or by any embedding host. Every
//! service composes shared relations into one query, runs it on the
//! DuckDB handle held by [`AppState`](crate::state::AppState) and maps the
//! rows into typed records.
//!
//! # Architecture
//!
//! ```text
//! CLI commands ──┐
//!                ├──> Services --> relations/aggregation --> QueryBuilder --> DuckDB
//! Host app ──────┘
//! ```
//!
//! # Services
//!
//! - `PublishService` - Date range, publish counts, symbol mentions, per-symbol frequency
//! - `SentimentService` - Mean/median weighted sentiment per period
//! - `SymbolService` - Symbol ranking and filtering
//! - `ReturnsService` - Forward returns, sentiment/return pairs
//! - `SimilarityService` - Most similar prior article pairs with returns

pub mod aggregation;
pub mod relations;

pub mod publish_service;
pub mod returns_service;
pub mod sentiment_service;
pub mod similarity_service;
pub mod symbol_service;

// Re-export commonly used types and services
pub use aggregation::Period;
pub use publish_service::PublishService;
pub use returns_service::{ReturnEvent, ReturnsService};
pub use sentiment_service::SentimentService;
pub use similarity_service::{SimilarityRange, SimilarityService};
pub use symbol_service::{SymbolFilters, SymbolService, SymbolSortOption, MIN_MONTHLY_ARTICLES};
