//! Address oracle backed by an Esplora HTTP API.
use std::{ops::Deref, str::FromStr, time::Duration};

use async_trait::async_trait;
use bitcoin::{address::NetworkUnchecked, Address};
use esplora_client::{AddressStats, AsyncClient};
use futures::future::try_join_all;
use hd_account::{AddressOracle, OracleError, UsageMap};
use thiserror::Error;
use tracing::{debug, trace};

/// Errors from talking to an Esplora instance.
#[derive(Debug, Error)]
pub enum EsploraError {
    /// The Esplora client failed, e.g. on a transport error or a non-success status.
    #[error("esplora: {0}")]
    Client(#[from] esplora_client::Error),

    /// A queried address is not a valid bitcoin address.
    #[error("invalid address {address}: {source}")]
    InvalidAddress {
        /// The address as queried.
        address: String,
        /// Why it failed to parse.
        source: bitcoin::address::ParseError,
    },
}

impl From<EsploraError> for OracleError {
    fn from(err: EsploraError) -> Self {
        OracleError::new(err)
    }
}

/// Whether the address has ever appeared in a transaction, confirmed or not.
pub fn is_used(stats: &AddressStats) -> bool {
    u64::from(stats.chain_stats.tx_count) + u64::from(stats.mempool_stats.tx_count) > 0
}

/// An async, rustls & tokio powered esplora client answering address usage queries.
#[derive(Debug, Clone)]
pub struct EsploraOracle(AsyncClient);

impl Deref for EsploraOracle {
    type Target = AsyncClient;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl EsploraOracle {
    /// Creates an oracle against the provided url (remove trailing '/'s!), e.g.
    /// `https://blockstream.info/testnet/api`.
    ///
    /// The client's timeout has a granularity of whole seconds; shorter timeouts round up.
    pub fn new(esplora_url: &str, timeout: Option<Duration>) -> Result<Self, EsploraError> {
        let mut builder = esplora_client::Builder::new(esplora_url.trim_end_matches('/'));
        if let Some(timeout) = timeout {
            let secs = timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0);
            builder = builder.timeout(secs.max(1));
        }

        Ok(Self(builder.build_async()?))
    }

    /// Fetches whether a single address has been used.
    pub async fn is_address_used(&self, address: &str) -> Result<bool, EsploraError> {
        let parsed = Address::<NetworkUnchecked>::from_str(address).map_err(|source| {
            EsploraError::InvalidAddress {
                address: address.to_owned(),
                source,
            }
        })?;

        // The indexer decides which network it serves; a foreign address is simply unknown there.
        let stats = self.get_address_stats(&parsed.assume_checked()).await?;
        let used = is_used(&stats);
        trace!(%address, %used, "fetched address stats");

        Ok(used)
    }
}

#[async_trait]
impl AddressOracle for EsploraOracle {
    async fn query(&self, addresses: &[String]) -> Result<UsageMap, OracleError> {
        debug!(count = addresses.len(), url = %self.url(), "querying esplora");

        let usage = try_join_all(addresses.iter().map(|address| async move {
            let used = self.is_address_used(address).await?;
            Ok::<_, EsploraError>((address.clone(), used))
        }))
        .await?;

        Ok(usage.into_iter().collect())
    }
}
