//! An HD wallet account: a fixed, ordered set of address chains.
use std::sync::Arc;

use hd_key_deriv::{ChainNode, DerivationContext};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::{
    chain::{AddressFn, Chain},
    discovery::{discover, retain_one_unused, Discovered, DiscoveryConfig, DiscoveryOutcome},
    errors::{AccountError, AccountResult},
    oracle::AddressOracle,
    state::ChainState,
};

/// Everything needed to start a fresh chain.
#[derive(Clone)]
pub struct ChainSpec<N: ChainNode> {
    /// Root node of the chain.
    pub node: N,
    /// Index of the chain's first address.
    pub start_index: u32,
    /// Address function for the chain.
    pub address_fn: AddressFn<N>,
}

impl<N: ChainNode> std::fmt::Debug for ChainSpec<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainSpec")
            .field("node", &self.node)
            .field("start_index", &self.start_index)
            .finish_non_exhaustive()
    }
}

/// An ordered, fixed set of chains, one per role (external = 0, internal = 1 by convention).
///
/// Each chain lives in its own slot. Readers take a snapshot of the slot, writers replace its
/// contents in a single store, so a chain is never observed half-updated. In particular,
/// [`Account::discover_chain`] scans a private copy and the live chain stays unchanged until the
/// scan has completed successfully.
///
/// A scan only commits over the exact chain it started from. If chain `i` was advanced or
/// replaced while its scan was in flight, the scan fails with [`AccountError::ChainModified`]
/// and the newer chain is kept.
#[derive(Debug)]
pub struct Account<N: ChainNode> {
    chains: Vec<RwLock<Arc<Chain<N>>>>,
}

impl<N: ChainNode> Account<N> {
    /// Creates an account from already built chains.
    pub fn new(chains: impl IntoIterator<Item = Chain<N>>) -> Self {
        Self {
            chains: chains
                .into_iter()
                .map(|chain| RwLock::new(Arc::new(chain)))
                .collect(),
        }
    }

    /// Creates an account with one fresh chain per spec, each holding its first address.
    pub fn from_specs(specs: impl IntoIterator<Item = ChainSpec<N>>) -> AccountResult<Self> {
        let chains = specs
            .into_iter()
            .map(|spec| Chain::new(spec.node, spec.start_index, spec.address_fn))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(chains))
    }

    /// Restores an account from its persisted chain states.
    pub fn from_state(
        states: impl IntoIterator<Item = ChainState>,
        address_fn: AddressFn<N>,
    ) -> AccountResult<Self> {
        let chains = states
            .into_iter()
            .map(|state| state.into_chain(Arc::clone(&address_fn)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(chains))
    }

    /// Restores an account from its JSON form.
    pub fn from_json_str(json: &str, address_fn: AddressFn<N>) -> AccountResult<Self> {
        let states: Vec<ChainState> = serde_json::from_str(json)?;
        Self::from_state(states, address_fn)
    }

    /// The persisted state of every chain, in chain order.
    pub fn to_state(&self) -> Vec<ChainState> {
        self.get_chains()
            .iter()
            .map(|chain| ChainState::from_chain(chain.as_ref()))
            .collect()
    }

    /// The JSON form of [`Account::to_state`].
    pub fn to_json_string(&self) -> AccountResult<String> {
        Ok(serde_json::to_string(&self.to_state())?)
    }

    /// Number of chains.
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// Whether the account has no chains.
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    fn slot(&self, i: usize) -> AccountResult<&RwLock<Arc<Chain<N>>>> {
        self.chains.get(i).ok_or(AccountError::InvalidChainIndex {
            index: i,
            len: self.chains.len(),
        })
    }

    fn snapshot(&self, i: usize) -> AccountResult<Arc<Chain<N>>> {
        Ok(Arc::clone(&*self.slot(i)?.read()))
    }

    /// Whether any chain has derived `address`.
    pub fn contains_address(&self, address: &str) -> bool {
        self.chains
            .iter()
            .any(|slot| slot.read().find(address).is_some())
    }

    /// Derives the key behind `address` from the first chain that knows it.
    ///
    /// `parents` is positional: entry `i`, if present, is used as chain `i`'s derivation
    /// context. Missing entries mean [`DerivationContext::PublicOnly`].
    pub fn derive(
        &self,
        address: &str,
        parents: &[DerivationContext<'_, N>],
    ) -> AccountResult<Option<N>> {
        for (i, slot) in self.chains.iter().enumerate() {
            let context = parents.get(i).copied().unwrap_or_default();
            let chain = Arc::clone(&*slot.read());
            if let Some(node) = chain.derive(address, context)? {
                return Ok(Some(node));
            }
        }
        Ok(None)
    }

    /// Runs gap-limit discovery on chain `i` and commits the result.
    ///
    /// The scan runs on a clone. On success the clone is trimmed so exactly one unused address
    /// follows the last used one, then it replaces chain `i` in one store. On failure chain `i`
    /// is left untouched, including when chain `i` changed during the scan.
    pub async fn discover_chain<O>(
        &self,
        i: usize,
        config: &DiscoveryConfig,
        oracle: &O,
    ) -> AccountResult<DiscoveryOutcome>
    where
        O: AddressOracle + ?Sized,
    {
        let snapshot = self.snapshot(i)?;
        debug!(chain = i, addresses = snapshot.len(), "starting discovery");

        let Discovered { mut chain, outcome } =
            match discover((*snapshot).clone(), config, oracle).await {
                Ok(discovered) => discovered,
                Err(e) => {
                    warn!(chain = i, %e, "discovery failed, chain left unchanged");
                    return Err(e.into());
                }
            };

        retain_one_unused(&mut chain, &outcome)?;

        let mut slot = self.slot(i)?.write();
        if !Arc::ptr_eq(&*slot, &snapshot) {
            warn!(chain = i, "chain changed during discovery, discarding scan");
            return Err(AccountError::ChainModified { index: i });
        }
        *slot = Arc::new(chain);

        info!(
            chain = i,
            used = outcome.used,
            checked = outcome.checked,
            last_used_index = ?outcome.last_used_index,
            "discovery committed"
        );
        Ok(outcome)
    }

    /// Runs [`Account::discover_chain`] on every chain in order, stopping at the first error.
    ///
    /// Chains discovered before the failing one keep their committed results.
    pub async fn discover_all<O>(
        &self,
        config: &DiscoveryConfig,
        oracle: &O,
    ) -> AccountResult<Vec<DiscoveryOutcome>>
    where
        O: AddressOracle + ?Sized,
    {
        let mut outcomes = Vec::with_capacity(self.len());
        for i in 0..self.len() {
            outcomes.push(self.discover_chain(i, config, oracle).await?);
        }
        Ok(outcomes)
    }

    /// Every address of every chain, chain order then derivation order.
    pub fn get_all_addresses(&self) -> Vec<String> {
        self.get_chains()
            .iter()
            .flat_map(|chain| chain.addresses().iter().cloned())
            .collect()
    }

    /// A snapshot of chain `i`.
    pub fn get_chain(&self, i: usize) -> Option<Arc<Chain<N>>> {
        self.snapshot(i).ok()
    }

    /// Snapshots of every chain, in order.
    pub fn get_chains(&self) -> Vec<Arc<Chain<N>>> {
        self.chains
            .iter()
            .map(|slot| Arc::clone(&*slot.read()))
            .collect()
    }

    /// The current address of chain `i`.
    pub fn get_chain_address(&self, i: usize) -> AccountResult<String> {
        Ok(self.snapshot(i)?.get()?.to_owned())
    }

    /// Whether chain `i` has derived `address`. False for an out of range index.
    pub fn is_chain_address(&self, i: usize, address: &str) -> bool {
        self.snapshot(i)
            .is_ok_and(|chain| chain.find(address).is_some())
    }

    /// Derives and returns the next address of chain `i`.
    pub fn next_chain_address(&self, i: usize) -> AccountResult<String> {
        let mut slot = self.slot(i)?.write();
        Ok(Arc::make_mut(&mut *slot).next()?)
    }

    /// Network of the first chain's root node.
    pub fn get_network(&self) -> AccountResult<N::Network> {
        let first = self.chains.first().ok_or(AccountError::EmptyAccount)?;
        let network = first.read().root().network();
        Ok(network)
    }

    /// A watch-only copy of this account with every root neutered.
    pub fn to_public_only(&self) -> Self {
        Self::new(self.get_chains().iter().map(|chain| chain.to_public_only()))
    }
}

impl<N: ChainNode> Clone for Account<N> {
    fn clone(&self) -> Self {
        Self::new(self.get_chains().iter().map(|chain| (**chain).clone()))
    }
}
