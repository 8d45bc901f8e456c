//! A single derivation chain: an append-only list of addresses derived from one root node.
use std::{collections::HashMap, fmt, sync::Arc};

use hd_key_deriv::{ChainNode, DerivationContext};
use tracing::trace;

use crate::errors::ChainError;

/// Turns the node derived at an index into an address. Must be pure.
pub type AddressFn<N> = Arc<dyn Fn(&N, u32) -> String + Send + Sync>;

/// An ordered, append-only sequence of addresses derived from a chain root.
///
/// The address at position `i` of [`Chain::addresses`] is recorded in the index map under the
/// derivation index it was produced at. Chains started at index zero therefore satisfy
/// `find(addresses[i]) == i` and `addresses.len() == next_index`.
///
/// Cloning deep-copies the address list and index map; the root node is immutable and shared.
#[derive(Clone)]
pub struct Chain<N: ChainNode> {
    root: Arc<N>,
    next_index: u32,
    index: HashMap<String, u32>,
    addresses: Vec<String>,
    address_fn: AddressFn<N>,
}

impl<N: ChainNode> Chain<N> {
    /// Creates a chain rooted at `root` and derives its first address at `start_index`.
    pub fn new(root: N, start_index: u32, address_fn: AddressFn<N>) -> Result<Self, ChainError> {
        let mut chain = Self::empty(root, start_index, address_fn);
        chain.next()?;
        Ok(chain)
    }

    /// Creates a chain with no derived addresses whose next derivation is `next_index`.
    pub fn empty(root: N, next_index: u32, address_fn: AddressFn<N>) -> Self {
        Self {
            root: Arc::new(root),
            next_index,
            index: HashMap::new(),
            addresses: Vec::new(),
            address_fn,
        }
    }

    /// Restores a chain from a persisted address-to-index map.
    ///
    /// Addresses are ordered by their index and the next derivation continues one past the
    /// highest recorded index. Fails with [`ChainError::IndexOverflow`] if that index does not
    /// fit in a `u32`.
    pub fn from_map(
        root: N,
        map: impl IntoIterator<Item = (String, u32)>,
        address_fn: AddressFn<N>,
    ) -> Result<Self, ChainError> {
        let index: HashMap<String, u32> = map.into_iter().collect();

        let mut ordered: Vec<(&String, &u32)> = index.iter().collect();
        ordered.sort_by_key(|(address, idx)| (**idx, (*address).clone()));
        let addresses: Vec<String> = ordered.into_iter().map(|(a, _)| a.clone()).collect();

        let next_index = match index.values().max() {
            Some(&max) => max
                .checked_add(1)
                .ok_or(ChainError::IndexOverflow { index: max })?,
            None => 0,
        };

        Ok(Self {
            root: Arc::new(root),
            next_index,
            index,
            addresses,
            address_fn,
        })
    }

    /// The most recently derived address.
    pub fn get(&self) -> Result<&str, ChainError> {
        self.addresses
            .last()
            .map(String::as_str)
            .ok_or(ChainError::EmptyChain)
    }

    /// Derives the address at the next index, appends it and returns it.
    pub fn next(&mut self) -> Result<String, ChainError> {
        let index = self.next_index;
        let next_index = index
            .checked_add(1)
            .ok_or(ChainError::IndexOverflow { index })?;
        let child = self.root.derive_child(index)?;
        let address = (self.address_fn)(&child, index);
        trace!(%address, %index, "derived chain address");

        self.index.insert(address.clone(), index);
        self.addresses.push(address.clone());
        self.next_index = next_index;

        Ok(address)
    }

    /// Removes and returns the most recently derived address, if any.
    ///
    /// This is the exact inverse of [`Chain::next`].
    pub fn pop(&mut self) -> Option<String> {
        let address = self.addresses.pop()?;
        if let Some(index) = self.index.remove(&address) {
            self.next_index = index;
        }
        Some(address)
    }

    /// The derivation index of `address`, if this chain derived it.
    pub fn find(&self, address: &str) -> Option<u32> {
        self.index.get(address).copied()
    }

    /// Derives the child key behind `address`.
    ///
    /// Returns `Ok(None)` if the address does not belong to this chain. With
    /// [`DerivationContext::WithPrivateParent`] the child is derived from the supplied root
    /// instead, which must be the private-capable counterpart of this chain's root.
    pub fn derive(
        &self,
        address: &str,
        context: DerivationContext<'_, N>,
    ) -> Result<Option<N>, ChainError> {
        let Some(index) = self.find(address) else {
            return Ok(None);
        };

        let parent = match context {
            DerivationContext::PublicOnly => &*self.root,
            DerivationContext::WithPrivateParent(parent) => parent,
        };

        Ok(Some(parent.derive_child(index)?))
    }

    /// Every derived address, in derivation order.
    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    /// The address-to-index map.
    pub const fn index_map(&self) -> &HashMap<String, u32> {
        &self.index
    }

    /// The index the next call to [`Chain::next`] derives at.
    pub const fn next_index(&self) -> u32 {
        self.next_index
    }

    /// The chain's root node.
    pub fn root(&self) -> &N {
        &self.root
    }

    /// Number of derived addresses.
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Whether no address has been derived yet.
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// A copy of this chain whose root carries no private key material.
    pub fn to_public_only(&self) -> Self {
        Self {
            root: Arc::new(self.root.to_public_only()),
            ..self.clone()
        }
    }
}

impl<N: ChainNode> fmt::Debug for Chain<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("root", &self.root)
            .field("next_index", &self.next_index)
            .field("addresses", &self.addresses)
            .finish_non_exhaustive()
    }
}

impl<N: ChainNode> PartialEq for Chain<N> {
    fn eq(&self, other: &Self) -> bool {
        self.next_index == other.next_index
            && self.addresses == other.addresses
            && self.index == other.index
            && (Arc::ptr_eq(&self.root, &other.root)
                || self.root.serialize() == other.root.serialize())
    }
}
