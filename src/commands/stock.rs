//! Per-symbol commands

use crate::commands::print_json;
use crate::db::duckdb::query::Pagination;
use crate::error::Result;
use crate::services::{
    Period, PublishService, SentimentService, SymbolFilters, SymbolService, MIN_MONTHLY_ARTICLES,
};
use crate::state::AppState;
use clap::{Args, Subcommand};

#[derive(Args, Debug)]
pub struct StockCommand {
    #[command(subcommand)]
    command: StockSubcommands,
}

#[derive(Subcommand, Debug)]
enum StockSubcommands {
    /// List symbols on the allow-listed exchanges
    Symbols {
        /// SENTIMENT_STD_DEV, NUMBER_OF_ARTICLES or SYMBOL
        #[arg(short, long, default_value = "SYMBOL")]
        sort: String,

        /// Only symbols with a sentiment volatility score
        #[arg(long)]
        large_sentiment_change: bool,

        /// Only symbols averaging enough articles per month
        #[arg(long)]
        sufficient_coverage: bool,

        #[arg(long, default_value_t = 0)]
        offset: u64,

        #[arg(short, long)]
        limit: Option<u64>,
    },

    /// Article count per period for one symbol
    Frequency {
        symbol: String,

        #[arg(short, long, default_value = "week")]
        period: String,
    },

    /// Mean and median weighted sentiment per period for one symbol
    Sentiment {
        symbol: String,

        #[arg(short, long, default_value = "week")]
        period: String,
    },
}

pub fn execute(cmd: StockCommand, state: &AppState) -> Result<()> {
    match cmd.command {
        StockSubcommands::Symbols {
            sort,
            large_sentiment_change,
            sufficient_coverage,
            offset,
            limit,
        } => {
            let filters = SymbolFilters {
                large_sentiment_change,
                min_monthly_articles: sufficient_coverage.then_some(MIN_MONTHLY_ARTICLES),
            };
            let rows = SymbolService::list_symbols_by_name(
                state,
                &sort,
                filters,
                Pagination::new(offset, limit),
            )?;
            print_json(&rows)
        }
        StockSubcommands::Frequency { symbol, period } => {
            let period = period.parse::<Period>()?;
            print_json(&PublishService::publish_frequency_for_symbol(
                state, period, &symbol,
            )?)
        }
        StockSubcommands::Sentiment { symbol, period } => {
            let period = period.parse::<Period>()?;
            print_json(&SentimentService::sentiment_per_period_for_symbol(
                state, period, &symbol,
            )?)
        }
    }
}
