//! Address generation for chain nodes.
//!
//! Every function here has the shape chains expect from an address function: given the node
//! derived at some index, and the index itself, produce the address string. They are pure; the
//! index is accepted for interface compatibility and does not influence the result.

use bitcoin::{address::KnownHrp, Address, NetworkKind};
use serde::{Deserialize, Serialize};

use crate::{ChainNode, ExtendedKey};

/// Generate a P2PKH address for the node.
#[must_use]
pub fn p2pkh_address(node: &ExtendedKey, _index: u32) -> String {
    Address::p2pkh(node.public_key().pubkey_hash(), node.network()).to_string()
}

/// Generate a P2WPKH address for the node.
#[must_use]
pub fn p2wpkh_address(node: &ExtendedKey, _index: u32) -> String {
    let hrp = match node.network() {
        NetworkKind::Main => KnownHrp::Mainnet,
        NetworkKind::Test => KnownHrp::Testnets,
    };
    Address::p2wpkh(&node.public_key(), hrp).to_string()
}

/// The address encodings chains can be configured with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressKind {
    /// Legacy pay-to-pubkey-hash.
    #[default]
    P2pkh,
    /// Native segwit v0 pay-to-witness-pubkey-hash.
    P2wpkh,
}

impl AddressKind {
    /// The address function for this encoding.
    pub fn address_fn(self) -> fn(&ExtendedKey, u32) -> String {
        match self {
            AddressKind::P2pkh => p2pkh_address,
            AddressKind::P2wpkh => p2wpkh_address,
        }
    }
}
