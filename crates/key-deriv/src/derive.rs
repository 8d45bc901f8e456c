//! Extended key nodes that address chains derive from.
//!
//! A chain only ever needs a handful of capabilities from its root key: deriving a
//! non-hardened child, stripping private material, reporting its network and round-tripping
//! through its serialized form. Those capabilities are captured by [`ChainNode`] so the account
//! logic stays independent of the concrete key type. [`ExtendedKey`] is the BIP32
//! implementation used in practice.
//!
//! # Usage
//!
//! ```rust,ignore
//! use hd_key_deriv::{ChainNode, ExtendedKey};
//!
//! let node = ExtendedKey::deserialize("tpubD6NzVbkrYhZ4...")?;
//! let child = node.derive_child(7)?;
//! assert!(!child.is_private());
//! ```

use std::{fmt, str::FromStr};

use bitcoin::{
    bip32::{self, ChildNumber, Xpriv, Xpub},
    CompressedPublicKey, NetworkKind,
};
use secp256k1::SECP256K1;

/// Error type for key derivation operations.
#[derive(Debug, thiserror::Error)]
pub enum DerivationError {
    /// BIP32 derivation or parsing failed.
    #[error("BIP32 derivation error: {0}")]
    Bip32(#[from] bip32::Error),
}

/// The capabilities an address chain requires from its root key.
///
/// Implementations must be immutable values: every operation returns a new node and never
/// alters `self`, which lets chains share a root between clones.
pub trait ChainNode: Clone + fmt::Debug + Send + Sync + 'static {
    /// Network parameters embedded in the node.
    type Network: Clone + fmt::Debug + PartialEq;

    /// Derives the non-hardened child at `index`.
    fn derive_child(&self, index: u32) -> Result<Self, DerivationError>;

    /// Returns a copy of this node with all private key material removed.
    fn to_public_only(&self) -> Self;

    /// Whether this node can derive private descendants.
    fn is_private(&self) -> bool;

    /// Network parameters of this node.
    fn network(&self) -> Self::Network;

    /// Serializes the node into its canonical string form.
    fn serialize(&self) -> String;

    /// Parses a node from its canonical string form.
    fn deserialize(s: &str) -> Result<Self, DerivationError>;
}

/// A BIP32 extended key, either private-capable or neutered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtendedKey {
    /// Extended private key. Derives private children.
    Private(Xpriv),
    /// Extended public key. Derives public children only.
    Public(Xpub),
}

impl ExtendedKey {
    /// The public half of this key.
    pub fn xpub(&self) -> Xpub {
        match self {
            ExtendedKey::Private(xpriv) => Xpub::from_priv(SECP256K1, xpriv),
            ExtendedKey::Public(xpub) => *xpub,
        }
    }

    /// The private half of this key, if present.
    pub const fn xpriv(&self) -> Option<&Xpriv> {
        match self {
            ExtendedKey::Private(xpriv) => Some(xpriv),
            ExtendedKey::Public(_) => None,
        }
    }

    /// The compressed public key of this node.
    pub fn public_key(&self) -> CompressedPublicKey {
        self.xpub().to_pub()
    }
}

impl From<Xpriv> for ExtendedKey {
    fn from(xpriv: Xpriv) -> Self {
        ExtendedKey::Private(xpriv)
    }
}

impl From<Xpub> for ExtendedKey {
    fn from(xpub: Xpub) -> Self {
        ExtendedKey::Public(xpub)
    }
}

impl ChainNode for ExtendedKey {
    type Network = NetworkKind;

    fn derive_child(&self, index: u32) -> Result<Self, DerivationError> {
        let child = ChildNumber::from_normal_idx(index)?;
        Ok(match self {
            ExtendedKey::Private(xpriv) => {
                ExtendedKey::Private(xpriv.derive_priv(SECP256K1, &[child])?)
            }
            ExtendedKey::Public(xpub) => ExtendedKey::Public(xpub.derive_pub(SECP256K1, &[child])?),
        })
    }

    fn to_public_only(&self) -> Self {
        ExtendedKey::Public(self.xpub())
    }

    fn is_private(&self) -> bool {
        matches!(self, ExtendedKey::Private(_))
    }

    fn network(&self) -> NetworkKind {
        match self {
            ExtendedKey::Private(xpriv) => xpriv.network,
            ExtendedKey::Public(xpub) => xpub.network,
        }
    }

    fn serialize(&self) -> String {
        self.to_string()
    }

    fn deserialize(s: &str) -> Result<Self, DerivationError> {
        s.parse()
    }
}

impl fmt::Display for ExtendedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtendedKey::Private(xpriv) => write!(f, "{xpriv}"),
            ExtendedKey::Public(xpub) => write!(f, "{xpub}"),
        }
    }
}

impl FromStr for ExtendedKey {
    type Err = DerivationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Xpriv::from_str(s) {
            Ok(xpriv) => Ok(ExtendedKey::Private(xpriv)),
            Err(_) => Ok(ExtendedKey::Public(Xpub::from_str(s)?)),
        }
    }
}

/// How a chain derives the key for one of its addresses.
///
/// Chains normally hold neutered roots and therefore hand out public-only children. Supplying a
/// private-capable root for the *same* path escalates a single derivation to a private child
/// without the chain ever storing private material.
#[derive(Debug)]
pub enum DerivationContext<'a, N> {
    /// Derive from the chain's own root.
    PublicOnly,
    /// Derive from the given private-capable root instead.
    WithPrivateParent(&'a N),
}

// Manual impls, deriving would put needless bounds on `N`.
impl<N> Clone for DerivationContext<'_, N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<N> Copy for DerivationContext<'_, N> {}

impl<N> Default for DerivationContext<'_, N> {
    fn default() -> Self {
        DerivationContext::PublicOnly
    }
}

#[cfg(test)]
mod tests {
    use bitcoin::Network;

    use super::*;

    fn master() -> Xpriv {
        Xpriv::new_master(Network::Regtest, &[7u8; 32]).unwrap()
    }

    #[test]
    fn test_public_and_private_children_agree() {
        let private = ExtendedKey::from(master());
        let public = private.to_public_only();

        for index in [0, 1, 19, 1_000] {
            let from_private = private.derive_child(index).unwrap();
            let from_public = public.derive_child(index).unwrap();

            assert!(from_private.is_private());
            assert!(!from_public.is_private());
            assert_eq!(from_private.public_key(), from_public.public_key());
        }
    }

    #[test]
    fn test_hardened_index_is_rejected() {
        let node = ExtendedKey::from(master()).to_public_only();
        let err = node.derive_child(1 << 31).unwrap_err();
        assert!(matches!(err, DerivationError::Bip32(_)));
    }

    #[test]
    fn test_serialize_roundtrip() {
        let private = ExtendedKey::from(master());
        let public = private.to_public_only();

        for node in [private, public] {
            let s = node.serialize();
            let parsed = ExtendedKey::deserialize(&s).unwrap();
            assert_eq!(parsed, node);
            assert_eq!(parsed.serialize(), s);
        }
    }

    #[test]
    fn test_network_is_preserved() {
        let node = ExtendedKey::from(master());
        assert_eq!(node.network(), NetworkKind::Test);
        assert_eq!(node.to_public_only().network(), NetworkKind::Test);
        assert_eq!(node.derive_child(3).unwrap().network(), NetworkKind::Test);
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(ExtendedKey::deserialize("definitely not a key").is_err());
    }
}
