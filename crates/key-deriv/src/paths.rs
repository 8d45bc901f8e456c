//! BIP44 derivation paths for account chains.
//!
//! # Key Hierarchy Overview
//!
//! ```text
//! Master Seed
//! └── m/purpose'/coin_type'/account' (account node from AccountKeys)
//!     ├── .../0 ─── External chain (receive addresses)
//!     └── .../1 ─── Internal chain (change addresses)
//! ```
//!
//! Chain indices are non-hardened so that a neutered account node can still derive both chains
//! and every address below them.
use bitcoin::bip32::ChildNumber;

/// BIP44 purpose index.
pub const BIP44_PURPOSE: u32 = 44;

/// BIP84 purpose index (native segwit).
pub const BIP84_PURPOSE: u32 = 84;

/// Index of the external (receive) chain below an account node.
pub const EXTERNAL_CHAIN: u32 = 0;

/// Index of the internal (change) chain below an account node.
pub const INTERNAL_CHAIN: u32 = 1;

/// Chain indices in the order accounts store them.
pub const CHAIN_INDICES: [u32; 2] = [EXTERNAL_CHAIN, INTERNAL_CHAIN];

/// Path from the master node to `m/purpose'/coin_type'/account'`.
pub(crate) fn account_path(
    purpose: u32,
    coin_type: u32,
    account: u32,
) -> Result<[ChildNumber; 3], bitcoin::bip32::Error> {
    Ok([
        ChildNumber::from_hardened_idx(purpose)?,
        ChildNumber::from_hardened_idx(coin_type)?,
        ChildNumber::from_hardened_idx(account)?,
    ])
}
