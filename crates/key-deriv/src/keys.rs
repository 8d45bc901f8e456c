use bitcoin::bip32::{ChildNumber, Xpriv, Xpub};
use secp256k1::SECP256K1;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{
    paths::{account_path, CHAIN_INDICES},
    ChainNode, DerivationError, ExtendedKey,
};

/// Account keys derived from a master key.
///
/// - Account key: `m/purpose'/coin_type'/account'`
/// - Chain keys: `m/purpose'/coin_type'/account'/{0,1}`
#[derive(Debug, Clone)]
pub struct AccountKeys {
    /// Account-level [`Xpriv`].
    account: Xpriv,
}

impl AccountKeys {
    /// Creates a new [`AccountKeys`] from a master [`Xpriv`].
    pub fn new(
        master: &Xpriv,
        purpose: u32,
        coin_type: u32,
        account: u32,
    ) -> Result<Self, DerivationError> {
        let path = account_path(purpose, coin_type, account)?;
        let account = master.derive_priv(SECP256K1, &path)?;

        Ok(Self { account })
    }

    /// Account [`Xpriv`].
    pub const fn account_xpriv(&self) -> &Xpriv {
        &self.account
    }

    /// Private-capable root nodes of the external and internal chains, in that order.
    ///
    /// The chain roots are derived straight from the account key without copying it. They are
    /// owned by the caller and are not wiped when this [`AccountKeys`] is dropped; prefer
    /// [`AccountKeys::public_chain_nodes`] unless private children are needed.
    pub fn chain_nodes(&self) -> Result<Vec<ExtendedKey>, DerivationError> {
        CHAIN_INDICES
            .iter()
            .map(|&index| {
                let child = ChildNumber::from_normal_idx(index)?;
                let xpriv = self.account.derive_priv(SECP256K1, &[child])?;
                Ok::<_, DerivationError>(ExtendedKey::Private(xpriv))
            })
            .collect()
    }

    /// Neutered root nodes of the external and internal chains, in that order.
    ///
    /// Derived from the account's public key, so no private chain key is ever materialized.
    pub fn public_chain_nodes(&self) -> Result<Vec<ExtendedKey>, DerivationError> {
        let account = ExtendedKey::Public(Xpub::from_priv(SECP256K1, &self.account));
        CHAIN_INDICES
            .iter()
            .map(|&index| account.derive_child(index))
            .collect()
    }
}

impl Drop for AccountKeys {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl Zeroize for AccountKeys {
    #[inline]
    fn zeroize(&mut self) {
        let Self { account } = self;

        // NOTE: `Xpriv.network` is a public parameter and is left as is.
        // `SecretKey::non_secure_erase` writes `1`s to the memory.
        account.depth.zeroize();
        {
            let fingerprint: &mut [u8; 4] = account.parent_fingerprint.as_mut();
            fingerprint.zeroize();
        }
        account.private_key.non_secure_erase();
        {
            let chaincode: &mut [u8; 32] = account.chain_code.as_mut();
            chaincode.zeroize();
        }
        account.child_number = if account.child_number.is_normal() {
            ChildNumber::Normal { index: 0 }
        } else {
            ChildNumber::Hardened { index: 0 }
        };
    }
}

impl ZeroizeOnDrop for AccountKeys {}
