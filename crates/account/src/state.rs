//! Persisted form of an account.
//!
//! One entry per chain, in chain order:
//!
//! ```json
//! [
//!   { "node": "tpubD6Nz...", "map": { "mzBc4XEF...": 0, "mkq6vA9K...": 1 } },
//!   { "node": "tpubD6Nz...", "map": { "n1Ykz6Ce...": 0 } }
//! ]
//! ```
use std::collections::BTreeMap;

use hd_key_deriv::ChainNode;
use serde::{Deserialize, Serialize};

use crate::{
    chain::{AddressFn, Chain},
    errors::AccountResult,
};

/// Persisted state of one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainState {
    /// Serialized root node of the chain.
    pub node: String,

    /// Every derived address with the index it was derived at.
    pub map: BTreeMap<String, u32>,
}

impl ChainState {
    /// Captures the persisted state of `chain`.
    pub fn from_chain<N: ChainNode>(chain: &Chain<N>) -> Self {
        Self {
            node: chain.root().serialize(),
            map: chain
                .index_map()
                .iter()
                .map(|(address, index)| (address.clone(), *index))
                .collect(),
        }
    }

    /// Rebuilds the chain this state was captured from.
    ///
    /// Fails if `node` does not parse or if the map already holds the last derivable index.
    pub fn into_chain<N: ChainNode>(self, address_fn: AddressFn<N>) -> AccountResult<Chain<N>> {
        let root = N::deserialize(&self.node)?;
        Ok(Chain::from_map(root, self.map, address_fn)?)
    }
}
