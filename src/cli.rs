//! Command line built with clap.
//!
//! [`Cli`] carries the global flags (`--config`, `--verbose`) and one
//! [`Command`]: `run`, `coupons` or `check`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::pipeline::LotteryMode;

/// Daily check-in, member-day lottery and coupon report for Weaiove accounts.
#[derive(Debug, Parser)]
#[command(name = "weaiove", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file. Missing files fall back to defaults and the environment.
    #[arg(long, global = true, default_value = "weaiove.toml")]
    pub config: PathBuf,

    /// Debug-level logging.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// When to run the member-day lottery.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum LotteryArg {
    /// Only on the configured weekday.
    #[default]
    Auto,
    /// Every run.
    Always,
    /// Never.
    Never,
}

impl From<LotteryArg> for LotteryMode {
    fn from(arg: LotteryArg) -> Self {
        match arg {
            LotteryArg::Auto => LotteryMode::Auto,
            LotteryArg::Always => LotteryMode::Always,
            LotteryArg::Never => LotteryMode::Never,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Processes every account and sends the chunked reports.
    Run {
        #[arg(long, value_enum, default_value_t = LotteryArg::Auto)]
        lottery: LotteryArg,
    },

    /// Lists unused coupons, one notification per account holding any.
    Coupons,

    /// Parses the account list without calling the API.
    Check,
}
