//! Market-wide overview commands

use crate::commands::print_json;
use crate::db::duckdb::query::Pagination;
use crate::error::Result;
use crate::services::{
    Period, PublishService, ReturnsService, SentimentService, SimilarityRange, SimilarityService,
};
use crate::state::AppState;
use clap::{Args, Subcommand};

#[derive(Args, Debug)]
pub struct OverviewCommand {
    #[command(subcommand)]
    command: OverviewSubcommands,
}

#[derive(Subcommand, Debug)]
enum OverviewSubcommands {
    /// First and last article publish date
    DateRange,

    /// Articles per calendar day
    PublishCounts,

    /// Mention counts per period for the most mentioned symbols
    Mentions {
        /// Bucket size (minute, hour, day, week, month, quarter, year)
        #[arg(short, long, default_value = "week")]
        period: String,

        /// Number of top symbols to skip
        #[arg(long, default_value_t = 0)]
        offset: u64,

        /// Number of top symbols to include
        #[arg(short, long, default_value_t = 10)]
        limit: u64,
    },

    /// Mean and median weighted sentiment per day
    Sentiment,

    /// Weighted sentiment next to the forward return of each article
    SentimentReturns,

    /// Most similar prior article pairs with both forward returns
    Similar {
        /// Lower bound on the rounded similarity
        #[arg(long, requires = "max_similarity")]
        min_similarity: Option<f64>,

        /// Upper bound on the rounded similarity
        #[arg(long, requires = "min_similarity")]
        max_similarity: Option<f64>,
    },
}

pub fn execute(cmd: OverviewCommand, state: &AppState) -> Result<()> {
    match cmd.command {
        OverviewSubcommands::DateRange => print_json(&PublishService::article_date_range(state)?),
        OverviewSubcommands::PublishCounts => {
            print_json(&PublishService::publish_count_per_day(state)?)
        }
        OverviewSubcommands::Mentions {
            period,
            offset,
            limit,
        } => {
            let period = period.parse::<Period>()?;
            let rows = PublishService::symbol_mentions_per_period(
                state,
                period,
                Pagination::new(offset, Some(limit)),
            )?;
            print_json(&rows)
        }
        OverviewSubcommands::Sentiment => print_json(&SentimentService::sentiment_per_day(state)?),
        OverviewSubcommands::SentimentReturns => {
            print_json(&ReturnsService::sentiment_return_pairs(state)?)
        }
        OverviewSubcommands::Similar {
            min_similarity,
            max_similarity,
        } => {
            let range = match (min_similarity, max_similarity) {
                (Some(min), Some(max)) => Some(SimilarityRange::new(min, max)?),
                _ => None,
            };
            print_json(&SimilarityService::similar_pairs_with_returns(state, range)?)
        }
    }
}
