mod cli;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use wallet_credit_score::aggregator::Aggregator;
use wallet_credit_score::api::{self, AppState};
use wallet_credit_score::config::Config;
use wallet_credit_score::eth::AlchemyClient;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;
    init_tracing(config.debug);

    match cli.command {
        Commands::Serve { addr } => {
            let bind = addr.unwrap_or_else(|| config.bind_addr());
            let aggregator = build_aggregator(&config)?;
            let state = AppState {
                aggregator: Arc::new(aggregator),
            };
            api::run_http_server(&bind, state).await?;
        }
        Commands::Score { wallet } => {
            let aggregator = build_aggregator(&config)?;
            let report = aggregator
                .score(&wallet)
                .await
                .with_context(|| format!("failed to score {}", wallet))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Chains => {
            let profiles: Vec<_> = config.chains.iter().collect();
            println!("{}", serde_json::to_string_pretty(&profiles)?);
        }
    }

    Ok(())
}

fn build_aggregator(config: &Config) -> anyhow::Result<Aggregator> {
    let mut aggregator = Aggregator::new(config.chains.clone(), config.score)
        .with_fetch_timeout(config.fetch_timeout);
    for profile in config.chains.enabled() {
        let key = config
            .api_keys
            .get(&profile.id)
            .with_context(|| format!("no API key for {}", profile.id))?;
        let client = AlchemyClient::for_chain(profile, key)?;
        aggregator = aggregator.with_provider(profile.id, Arc::new(client));
    }
    Ok(aggregator)
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .init();
}
