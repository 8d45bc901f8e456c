//! Reading and writing account state files.

use std::{fs, path::Path, sync::Arc};

use anyhow::Context;
use hd_account::{Account, AddressFn};
use hd_key_deriv::{AddressKind, ExtendedKey};
use tracing::{debug, info};

/// The address function matching `kind`.
pub(crate) fn address_fn(kind: AddressKind) -> AddressFn<ExtendedKey> {
    Arc::new(kind.address_fn())
}

/// Loads an account from its JSON state file.
pub(crate) fn read_account(
    path: &Path,
    address_kind: AddressKind,
) -> anyhow::Result<Account<ExtendedKey>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read account file {}", path.display()))?;

    let account = Account::from_json_str(&json, address_fn(address_kind))
        .with_context(|| format!("failed to load account from {}", path.display()))?;
    debug!(path = %path.display(), chains = account.len(), "loaded account");

    Ok(account)
}

/// Writes an account's JSON state to `path`.
///
/// The state is written to a sibling temporary file first and then renamed over `path`, so an
/// interrupted write never leaves a truncated account behind.
pub(crate) fn write_account(path: &Path, account: &Account<ExtendedKey>) -> anyhow::Result<()> {
    let json = account.to_json_string()?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    fs::write(&tmp, json).with_context(|| format!("failed to write {}", path.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("failed to replace {}", path.display()))?;

    info!(path = %path.display(), "stored account");
    Ok(())
}

#[cfg(test)]
mod tests {
    use bitcoin::{bip32::Xpriv, Network};
    use hd_key_deriv::{AccountKeys, BIP84_PURPOSE};

    use super::*;

    fn account(kind: AddressKind) -> Account<ExtendedKey> {
        let master = Xpriv::new_master(Network::Regtest, &[7u8; 32]).unwrap();
        let roots = AccountKeys::new(&master, BIP84_PURPOSE, 1, 0)
            .unwrap()
            .public_chain_nodes()
            .unwrap();
        let chains = roots
            .into_iter()
            .map(|root| hd_account::Chain::new(root, 0, address_fn(kind)).unwrap());
        let account = Account::new(chains);
        account.next_chain_address(0).unwrap();
        account
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("account.json");
        let account = account(AddressKind::P2wpkh);

        write_account(&path, &account).unwrap();
        let restored = read_account(&path, AddressKind::P2wpkh).unwrap();

        assert_eq!(restored.to_state(), account.to_state());
        assert_eq!(
            restored.next_chain_address(0).unwrap(),
            account.next_chain_address(0).unwrap()
        );
        assert!(!dir.path().join("account.json.tmp").exists());
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_account(&dir.path().join("missing.json"), AddressKind::P2pkh).unwrap_err();
        assert!(err.to_string().contains("failed to read account file"));
    }

    #[test]
    fn test_read_invalid_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("account.json");
        std::fs::write(&path, r#"[{"node": "xpub-nope", "map": {}}]"#).unwrap();

        let err = read_account(&path, AddressKind::P2pkh).unwrap_err();
        assert!(err.to_string().contains("failed to load account"));
    }
}
