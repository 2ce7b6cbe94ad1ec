//! Command line interface.

use clap::{Parser, Subcommand};
use coinwatch_analysis::{
    DEFAULT_CORRELATION_WINDOW_DAYS, DEFAULT_LOOKBACK_DAYS, DEFAULT_MAJORITY_THRESHOLD,
    DEFAULT_ROLLING_WINDOW_DAYS,
};

/// Crypto price tracker: collect market snapshots and analyse trends.
#[derive(Parser, Debug)]
#[command(name = "coinwatch", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (can also be set via COINWATCH_CONFIG env var)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Poll the market data API and store snapshots
    Collect {
        /// Run a single cycle and exit (for external schedulers)
        #[arg(long)]
        once: bool,
        /// Stop after this many cycles
        #[arg(long, conflicts_with = "once")]
        max_cycles: Option<u64>,
    },
    /// Create the price table if it does not exist
    InitDb,
    /// Latest stored price per coin
    Latest,
    /// Raw stored snapshots for one coin
    History {
        coin: String,
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
    /// Rolling average of daily prices
    Rolling {
        coin: String,
        #[arg(long, default_value_t = DEFAULT_ROLLING_WINDOW_DAYS)]
        window: usize,
    },
    /// Day-over-day percent changes
    Returns { coin: String },
    /// Bullish/bearish classification
    Trend {
        coin: String,
        #[arg(long, default_value_t = DEFAULT_LOOKBACK_DAYS)]
        lookback: usize,
        #[arg(long, default_value_t = DEFAULT_MAJORITY_THRESHOLD)]
        threshold: usize,
    },
    /// Pearson correlation of two coins' daily prices
    Correlate {
        coin_a: String,
        coin_b: String,
        #[arg(long, default_value_t = DEFAULT_CORRELATION_WINDOW_DAYS)]
        window: usize,
    },
    /// Delete rows older than the retention horizon
    Prune {
        /// Override the configured retention horizon
        #[arg(long)]
        older_than_days: Option<u32>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_collect_once() {
        let cli = Cli::try_parse_from(["coinwatch", "collect", "--once"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Collect {
                once: true,
                max_cycles: None
            }
        );
    }

    #[test]
    fn test_once_conflicts_with_max_cycles() {
        assert!(Cli::try_parse_from(["coinwatch", "collect", "--once", "--max-cycles", "3"]).is_err());
    }

    #[test]
    fn test_parse_trend_defaults() {
        let cli = Cli::try_parse_from(["coinwatch", "--config", "c.toml", "trend", "bitcoin"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some("c.toml"));
        assert_eq!(
            cli.command,
            Command::Trend {
                coin: "bitcoin".to_string(),
                lookback: 7,
                threshold: 4
            }
        );
    }

    #[test]
    fn test_window_defaults() {
        let cli = Cli::try_parse_from(["coinwatch", "rolling", "bitcoin"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Rolling {
                coin: "bitcoin".to_string(),
                window: DEFAULT_ROLLING_WINDOW_DAYS
            }
        );
        let cli = Cli::try_parse_from(["coinwatch", "correlate", "bitcoin", "ethereum"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Correlate {
                coin_a: "bitcoin".to_string(),
                coin_b: "ethereum".to_string(),
                window: DEFAULT_CORRELATION_WINDOW_DAYS
            }
        );
    }

    #[test]
    fn test_parse_correlate() {
        let cli =
            Cli::try_parse_from(["coinwatch", "correlate", "bitcoin", "ethereum", "--window", "14"])
                .unwrap();
        assert_eq!(
            cli.command,
            Command::Correlate {
                coin_a: "bitcoin".to_string(),
                coin_b: "ethereum".to_string(),
                window: 14
            }
        );
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
