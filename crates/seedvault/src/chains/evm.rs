use alloy::{
    primitives::{Address, Signature},
    signers::{
        local::{coins_bip39::English, MnemonicBuilder, PrivateKeySigner},
        SignerSync as _,
    },
};
use bip39::Mnemonic;
use eyre::Context as _;
use std::{fmt, str::FromStr as _};
use zeroize::Zeroizing;

/// Standard Ethereum HD path for `account`.
pub fn derivation_path(account: u32) -> String {
    format!("m/44'/60'/0'/0/{account}")
}

/// secp256k1 key at `m/44'/60'/0'/0/{account}`.
pub struct EthereumKey {
    signer: PrivateKeySigner,
    account: u32,
}

impl fmt::Debug for EthereumKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EthereumKey")
            .field("address", &self.address_checksum())
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

impl EthereumKey {
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// EIP-55 checksummed `0x` address.
    pub fn address_checksum(&self) -> String {
        self.address().to_checksum(None)
    }

    pub const fn account(&self) -> u32 {
        self.account
    }

    pub fn private_key_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(format!("0x{}", hex::encode(self.signer.to_bytes())))
    }

    /// EIP-191 personal-sign. Returns the 65-byte `r || s || v` signature as `0x` hex.
    pub fn sign_message(&self, message: &[u8]) -> eyre::Result<String> {
        let sig = self
            .signer
            .sign_message_sync(message)
            .context("sign evm message")?;
        Ok(format!("0x{}", hex::encode(sig.as_bytes())))
    }
}

pub fn derive(mnemonic: &Mnemonic, account: u32) -> eyre::Result<EthereumKey> {
    let account = super::check_account(account)?;
    let phrase = Zeroizing::new(mnemonic.to_string());
    let signer = MnemonicBuilder::<English>::default()
        .phrase(phrase.as_str())
        .index(account)
        .context("evm index")?
        .build()
        .context("build evm wallet")?;
    Ok(EthereumKey { signer, account })
}

/// Check an EIP-191 signature against an address by public-key recovery.
pub fn verify_message(
    address: &str,
    message: &[u8],
    signature_hex: &str,
) -> eyre::Result<bool> {
    let expected = Address::from_str(address.trim()).context("parse evm address")?;
    let sig = Signature::from_str(signature_hex.trim()).context("parse evm signature")?;
    Ok(sig
        .recover_address_from_msg(message)
        .is_ok_and(|recovered| recovered == expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{errors::VaultError, mnemonic};

    const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon \
                           abandon abandon abandon about";
    const TEST_JUNK: &str = "test test test test test test test test test test test junk";

    #[test]
    fn known_vectors_derive_expected_addresses() -> eyre::Result<()> {
        let abandon = derive(&mnemonic::parse(ABANDON)?, 0)?;
        assert_eq!(
            abandon.address_checksum(),
            "0x9858EfFD232B4033E47d90003D41EC34EcaEda94"
        );

        // Hardhat/Anvil default account.
        let junk = derive(&mnemonic::parse(TEST_JUNK)?, 0)?;
        assert_eq!(
            junk.address_checksum(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
        assert_eq!(
            junk.private_key_hex().as_str(),
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
        );
        Ok(())
    }

    #[test]
    fn derivation_is_deterministic_and_account_scoped() -> eyre::Result<()> {
        let m = mnemonic::parse(TEST_JUNK)?;
        let a = derive(&m, 0)?;
        let b = derive(&m, 0)?;
        let c = derive(&m, 1)?;
        assert_eq!(a.address(), b.address());
        assert_ne!(a.address(), c.address());
        assert_eq!(
            c.address_checksum(),
            "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"
        );
        assert_eq!(derivation_path(3), "m/44'/60'/0'/0/3");
        Ok(())
    }

    #[test]
    fn signed_message_verifies_only_for_signer_and_message() -> eyre::Result<()> {
        let key = derive(&mnemonic::parse(TEST_JUNK)?, 0)?;
        let other = derive(&mnemonic::parse(TEST_JUNK)?, 1)?;
        let sig = key.sign_message(b"hello seedvault")?;

        assert!(verify_message(
            &key.address_checksum(),
            b"hello seedvault",
            &sig
        )?);
        assert!(!verify_message(
            &key.address_checksum(),
            b"hello seedvault!",
            &sig
        )?);
        assert!(!verify_message(
            &other.address_checksum(),
            b"hello seedvault",
            &sig
        )?);
        Ok(())
    }

    #[test]
    fn hardened_account_index_is_refused() -> eyre::Result<()> {
        let m = mnemonic::parse(TEST_JUNK)?;
        assert!(derive(&m, crate::chains::MAX_ACCOUNT_INDEX).is_ok());
        let err = derive(&m, 0x8000_0000)
            .err()
            .ok_or_else(|| eyre::eyre!("hardened index must fail"))?;
        assert_eq!(
            err.downcast_ref::<VaultError>(),
            Some(&VaultError::AccountIndexOutOfRange {
                account: 0x8000_0000
            })
        );
        Ok(())
    }

    #[test]
    fn debug_output_hides_private_key() -> eyre::Result<()> {
        let key = derive(&mnemonic::parse(TEST_JUNK)?, 0)?;
        let dbg = format!("{key:?}");
        assert!(!dbg.contains("ac0974bec39a17e36ba4a6b4d238ff944bacb478"));
        Ok(())
    }
}
