//! Key derivation primitives for HD wallet accounts.
//!
//! This crate provides the extended-key node type that address chains are built on, the BIP44
//! account key derivation that produces the chain roots, and the address functions that turn a
//! derived node into an address string.
//!
//! # Usage
//!
//! ```rust,ignore
//! use bitcoin::{bip32::Xpriv, Network};
//! use hd_key_deriv::{AccountKeys, AddressKind, ChainNode, BIP44_PURPOSE};
//!
//! let master = Xpriv::new_master(Network::Testnet, &seed)?;
//! let keys = AccountKeys::new(&master, BIP44_PURPOSE, 1, 0)?;
//!
//! // Watch-only chain roots, external first.
//! let roots = keys.public_chain_nodes()?;
//! let first = AddressKind::P2pkh.address_fn()(&roots[0].derive_child(0)?, 0);
//! ```

pub mod address;
pub mod derive;
mod keys;
mod paths;

pub use address::{p2pkh_address, p2wpkh_address, AddressKind};
pub use derive::{ChainNode, DerivationContext, DerivationError, ExtendedKey};
pub use keys::AccountKeys;
pub use paths::{BIP44_PURPOSE, BIP84_PURPOSE, CHAIN_INDICES, EXTERNAL_CHAIN, INTERNAL_CHAIN};
