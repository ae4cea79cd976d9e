mod accounts;
mod api;
mod cli;
mod config;
mod error;
mod lottery;
mod notify;
mod orchestrator;
mod pipeline;
mod tasks;
#[cfg(test)]
mod testing;
mod ui;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use accounts::parse_accounts;
use api::HttpConnector;
use cli::{Cli, Command};
use config::AppConfig;
use error::AppError;
use notify::NotifyChannel;
use orchestrator::Orchestrator;
use pipeline::{LotteryMode, PipelineSettings};
use ui::RunProgress;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "weaiove=debug" } else { "weaiove=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load(&cli.config)?;
    let entries = parse_accounts(&config.accounts);

    match cli.command {
        Command::Check => {
            if ui::print_entries(&entries) == 0 {
                return Err(AppError::NoAccounts.into());
            }
        }
        Command::Run { lottery } => {
            let orchestrator = build(&config, lottery.into())?;
            let progress = RunProgress::start(entries.len());
            let summary = orchestrator.run(&entries, &progress).await;
            progress.finish(&summary);
        }
        Command::Coupons => {
            let orchestrator = build(&config, LotteryMode::Never)?;
            let progress = RunProgress::start(entries.len());
            let summary = orchestrator.scan_coupons(&entries, &progress).await;
            progress.finish(&summary);
        }
    }
    Ok(())
}

fn build(
    config: &AppConfig,
    lottery: LotteryMode,
) -> Result<Orchestrator<HttpConnector, NotifyChannel>, AppError> {
    let notifier = NotifyChannel::from_config(&config.bark);
    info!(channel = notifier.name(), "notification channel selected");
    let connector = HttpConnector::new(config.api.clone())?;
    Ok(Orchestrator::new(
        connector,
        notifier,
        PipelineSettings::from_config(config, lottery),
        config.chunk_size(),
    ))
}
