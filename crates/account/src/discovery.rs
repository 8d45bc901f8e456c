//! Gap-limit discovery.
//!
//! Starting from a chain's current address, addresses are queried in batches of `gap_limit`. The
//! scan tracks the run of consecutive unused addresses and stops as soon as that run reaches
//! `gap_limit`, i.e. after the first batch that leaves a clean gap behind the last used address.
//!
//! The scan owns the chain it advances. Callers hand in a clone and only adopt the result once
//! the scan has succeeded, so no partially scanned state is ever visible elsewhere.

use hd_key_deriv::ChainNode;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    chain::Chain,
    errors::{ChainError, DiscoveryError},
    oracle::AddressOracle,
};

/// Gap limit recommended by BIP44.
pub const DEFAULT_GAP_LIMIT: u32 = 20;

/// Default maximum number of addresses a single scan may check.
pub const DEFAULT_SCAN_BOUND: u32 = 10_000;

/// Parameters of a discovery scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Number of consecutive unused addresses that ends the scan.
    pub gap_limit: u32,

    /// Maximum number of addresses checked before giving up.
    ///
    /// Guards against an oracle that reports every address as used.
    pub scan_bound: u32,
}

impl DiscoveryConfig {
    /// Creates a config with the given gap limit and the default scan bound.
    pub const fn with_gap_limit(gap_limit: u32) -> Self {
        Self {
            gap_limit,
            scan_bound: DEFAULT_SCAN_BOUND,
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self::with_gap_limit(DEFAULT_GAP_LIMIT)
    }
}

/// What a successful scan observed.
///
/// `used` and `checked` count from the address that was current when the scan started, so
/// `checked - used` is the length of the trailing unused run the scan derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryOutcome {
    /// Addresses from the starting address up to and including the last used one.
    pub used: u32,

    /// Addresses queried in total.
    pub checked: u32,

    /// Derivation index of the last address reported used, if any.
    pub last_used_index: Option<u32>,
}

impl DiscoveryOutcome {
    /// Length of the unused run at the end of the scanned range.
    pub const fn unused(&self) -> u32 {
        self.checked - self.used
    }
}

/// A scanned working chain along with the scan's outcome.
#[derive(Debug)]
pub struct Discovered<N: ChainNode> {
    /// The working chain, advanced to the last checked address.
    pub chain: Chain<N>,

    /// What the scan observed.
    pub outcome: DiscoveryOutcome,
}

/// Runs a gap-limit scan over `chain`, consuming it as the scan's working copy.
///
/// An empty chain first derives its initial address. On any error the working copy is dropped.
pub async fn discover<N, O>(
    mut chain: Chain<N>,
    config: &DiscoveryConfig,
    oracle: &O,
) -> Result<Discovered<N>, DiscoveryError>
where
    N: ChainNode,
    O: AddressOracle + ?Sized,
{
    if config.gap_limit == 0 {
        return Err(DiscoveryError::InvalidGapLimit);
    }
    if chain.is_empty() {
        chain.next()?;
    }

    let batch_size = config.gap_limit as usize;
    let mut gap = 0u32;
    let mut checked = 0u32;
    let mut last_used_index = None;

    loop {
        if checked.saturating_add(config.gap_limit) > config.scan_bound {
            return Err(DiscoveryError::ScanBoundExceeded {
                bound: config.scan_bound,
            });
        }

        let mut batch = Vec::with_capacity(batch_size);
        batch.push(chain.get()?.to_owned());
        while batch.len() < batch_size {
            batch.push(chain.next()?);
        }
        checked += config.gap_limit;

        debug!(
            first = %batch[0],
            size = batch.len(),
            %checked,
            "querying oracle for address batch"
        );
        let usage = oracle.query(&batch).await?;

        for address in &batch {
            match usage.get(address) {
                Some(true) => {
                    gap = 0;
                    last_used_index = chain.find(address);
                }
                Some(false) => gap += 1,
                None => {
                    return Err(DiscoveryError::MalformedOracleResponse {
                        address: address.clone(),
                    })
                }
            }
        }
        trace!(%gap, ?last_used_index, "batch evaluated");

        if gap >= config.gap_limit {
            break;
        }

        chain.next()?;
    }

    let outcome = DiscoveryOutcome {
        used: checked - gap,
        checked,
        last_used_index,
    };
    debug!(?outcome, "discovery finished");

    Ok(Discovered { chain, outcome })
}

/// Trims a scanned chain so exactly one unused address follows the last used one.
pub(crate) fn retain_one_unused<N: ChainNode>(
    chain: &mut Chain<N>,
    outcome: &DiscoveryOutcome,
) -> Result<(), ChainError> {
    for _ in 1..outcome.unused() {
        chain.pop().ok_or(ChainError::EmptyChain)?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{
        collections::HashSet,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use async_trait::async_trait;
    use hd_key_deriv::ExtendedKey;

    use super::*;
    use crate::{
        chain::tests::public_chain,
        oracle::{OracleError, UsageMap},
    };

    /// Oracle backed by a fixed set of used addresses.
    #[derive(Debug, Default)]
    pub(crate) struct StaticOracle {
        pub(crate) used: HashSet<String>,
        pub(crate) calls: AtomicUsize,
    }

    impl StaticOracle {
        pub(crate) fn new(used: impl IntoIterator<Item = String>) -> Self {
            Self {
                used: used.into_iter().collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl AddressOracle for StaticOracle {
        async fn query(&self, addresses: &[String]) -> Result<UsageMap, OracleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(addresses
                .iter()
                .map(|a| (a.clone(), self.used.contains(a)))
                .collect())
        }
    }

    #[derive(Debug)]
    struct FailingOracle;

    #[async_trait]
    impl AddressOracle for FailingOracle {
        async fn query(&self, _addresses: &[String]) -> Result<UsageMap, OracleError> {
            Err(OracleError::new("indexer unavailable"))
        }
    }

    /// Answers every address except the last one of each batch.
    #[derive(Debug)]
    struct ForgetfulOracle;

    #[async_trait]
    impl AddressOracle for ForgetfulOracle {
        async fn query(&self, addresses: &[String]) -> Result<UsageMap, OracleError> {
            let answered = addresses.len().saturating_sub(1);
            Ok(addresses[..answered]
                .iter()
                .map(|a| (a.clone(), false))
                .collect())
        }
    }

    #[derive(Debug)]
    struct EverythingUsedOracle;

    #[async_trait]
    impl AddressOracle for EverythingUsedOracle {
        async fn query(&self, addresses: &[String]) -> Result<UsageMap, OracleError> {
            Ok(addresses.iter().map(|a| (a.clone(), true)).collect())
        }
    }

    /// The first `n` addresses of the test chain.
    fn addresses(n: usize) -> Vec<String> {
        let mut chain = public_chain();
        while chain.len() < n {
            chain.next().unwrap();
        }
        chain.addresses().to_vec()
    }

    fn config(gap_limit: u32) -> DiscoveryConfig {
        DiscoveryConfig::with_gap_limit(gap_limit)
    }

    #[tokio::test]
    async fn test_nothing_used() {
        let oracle = StaticOracle::default();
        let Discovered { chain, outcome } =
            discover(public_chain(), &config(20), &oracle).await.unwrap();

        assert_eq!(outcome.used, 0);
        assert_eq!(outcome.checked, 20);
        assert_eq!(outcome.last_used_index, None);
        assert_eq!(chain.len(), 20);
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_first_address_used() {
        let all = addresses(1);
        let oracle = StaticOracle::new(all);
        let Discovered { chain, outcome } =
            discover(public_chain(), &config(20), &oracle).await.unwrap();

        // The first batch leaves a run of 19, one short of the gap limit, so a second batch is
        // needed to observe a clean gap.
        assert_eq!(outcome.used, 1);
        assert_eq!(outcome.checked, 40);
        assert_eq!(outcome.unused(), 39);
        assert_eq!(outcome.last_used_index, Some(0));
        assert_eq!(chain.len(), 40);
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_sparse_usage_spans_batches() {
        let all = addresses(26);
        let oracle = StaticOracle::new([all[0].clone(), all[25].clone()]);
        let Discovered { outcome, .. } =
            discover(public_chain(), &config(20), &oracle).await.unwrap();

        assert_eq!(outcome.used, 26);
        assert_eq!(outcome.checked, 60);
        assert_eq!(outcome.last_used_index, Some(25));
    }

    #[tokio::test]
    async fn test_gap_larger_than_limit_hides_later_usage() {
        let all = addresses(30);
        let oracle = StaticOracle::new([all[29].clone()]);
        let Discovered { outcome, .. } =
            discover(public_chain(), &config(10), &oracle).await.unwrap();

        assert_eq!(outcome.used, 0);
        assert_eq!(outcome.checked, 10);
    }

    #[tokio::test]
    async fn test_scan_starts_at_current_address() {
        let mut chain = public_chain();
        for _ in 0..4 {
            chain.next().unwrap();
        }
        let current = chain.get().unwrap().to_owned();
        let oracle = StaticOracle::new([current]);

        let Discovered { outcome, .. } = discover(chain, &config(5), &oracle).await.unwrap();
        assert_eq!(outcome.used, 1);
        assert_eq!(outcome.checked, 10);
        assert_eq!(outcome.last_used_index, Some(4));
    }

    #[tokio::test]
    async fn test_empty_chain_derives_first_address() {
        let full = public_chain();
        let empty = Chain::empty(full.root().clone(), 0, crate::chain::tests::address_fn());
        let oracle = StaticOracle::default();

        let Discovered { chain, outcome } = discover(empty, &config(3), &oracle).await.unwrap();
        assert_eq!(outcome.checked, 3);
        assert_eq!(chain.addresses()[0], full.get().unwrap());
    }

    #[tokio::test]
    async fn test_idempotent_on_static_oracle() {
        let all = addresses(8);
        let oracle = StaticOracle::new([all[2].clone(), all[7].clone()]);
        let snapshot = public_chain();

        let first = discover(snapshot.clone(), &config(5), &oracle).await.unwrap();
        let second = discover(snapshot.clone(), &config(5), &oracle).await.unwrap();

        assert_eq!(first.outcome, second.outcome);
        assert_eq!(first.chain, second.chain);
        assert_eq!(snapshot.len(), 1);
    }

    #[tokio::test]
    async fn test_oracle_error_is_propagated() {
        let err = discover(public_chain(), &config(20), &FailingOracle)
            .await
            .unwrap_err();

        match err {
            DiscoveryError::Oracle(e) => assert_eq!(e.to_string(), "indexer unavailable"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_address_is_malformed() {
        let all = addresses(4);
        let err = discover(public_chain(), &config(4), &ForgetfulOracle)
            .await
            .unwrap_err();

        match err {
            DiscoveryError::MalformedOracleResponse { address } => assert_eq!(address, all[3]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_zero_gap_limit_is_rejected() {
        let oracle = StaticOracle::default();
        let err = discover(public_chain(), &config(0), &oracle)
            .await
            .unwrap_err();

        assert!(matches!(err, DiscoveryError::InvalidGapLimit));
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_scan_bound() {
        let config = DiscoveryConfig {
            gap_limit: 5,
            scan_bound: 23,
        };
        let err = discover(public_chain(), &config, &EverythingUsedOracle)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DiscoveryError::ScanBoundExceeded { bound: 23 }
        ));
    }

    #[test]
    fn test_retain_one_unused() {
        let mut chain: Chain<ExtendedKey> = public_chain();
        for _ in 0..39 {
            chain.next().unwrap();
        }
        let outcome = DiscoveryOutcome {
            used: 1,
            checked: 40,
            last_used_index: Some(0),
        };

        retain_one_unused(&mut chain, &outcome).unwrap();
        assert_eq!(chain.addresses(), &addresses(2)[..]);
    }
}
