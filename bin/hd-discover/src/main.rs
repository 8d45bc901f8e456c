//! Runs gap-limit discovery over every chain of a stored HD wallet account and writes the
//! advanced account back.

use std::{fs, path::Path};

use anyhow::Context;
use clap::Parser;
use config::Config;
use hd_account::Account;
use hd_common::{logging, logging::LoggerConfig};
use hd_esplora_oracle::{EsploraOracle, RetryingOracle};
use serde::de::DeserializeOwned;
use tokio::runtime;
use tracing::{debug, info, trace};

mod args;
mod config;
mod store;

fn main() -> anyhow::Result<()> {
    logging::init(LoggerConfig::with_base_name("hd-discover"))?;

    let cli = args::Cli::parse();
    let config = parse_toml::<Config>(&cli.config)?;
    info!(account = %cli.account.display(), esplora = %config.esplora_url, "starting discovery");

    let runtime = runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create runtime")?;

    let account = store::read_account(&cli.account, config.address_kind)?;
    let network = account.get_network()?;
    debug!(?network, chains = account.len(), "account loaded");

    runtime.block_on(discover(&account, &config))?;

    store::write_account(cli.output_path(), &account)?;
    info!("discovery complete");

    Ok(())
}

async fn discover<N>(account: &Account<N>, config: &Config) -> anyhow::Result<()>
where
    N: hd_key_deriv::ChainNode,
{
    let esplora = EsploraOracle::new(&config.esplora_url, config.timeout())
        .context("failed to create esplora client")?;
    let oracle = RetryingOracle::new(esplora)
        .with_retry_count(config.retry_count())
        .with_retry_interval(config.retry_interval());

    let outcomes = account
        .discover_all(&config.discovery(), &oracle)
        .await
        .context("discovery failed")?;

    for (chain, outcome) in outcomes.iter().enumerate() {
        let current = account.get_chain_address(chain)?;
        info!(
            %chain,
            used = outcome.used,
            checked = outcome.checked,
            last_used_index = ?outcome.last_used_index,
            %current,
            "chain discovered"
        );
    }

    Ok(())
}

/// Reads and parses a TOML file from the given path into the given type `T`.
fn parse_toml<T>(path: impl AsRef<Path>) -> anyhow::Result<T>
where
    T: std::fmt::Debug + DeserializeOwned,
{
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read TOML file {}", path.display()))?;
    trace!(?raw, "read file");

    let parsed = toml::from_str::<T>(&raw)
        .with_context(|| format!("failed to parse TOML file {}", path.display()))?;
    debug!(?parsed, "parsed TOML file");

    Ok(parsed)
}
