//! Per-chain key derivation and message signing.

use crate::errors::VaultError;

pub mod evm;
pub mod solana;

/// Highest index usable as a hardened BIP-32 path component.
pub const MAX_ACCOUNT_INDEX: u32 = 0x7FFF_FFFF;

pub const fn check_account(account: u32) -> Result<u32, VaultError> {
    if account > MAX_ACCOUNT_INDEX {
        return Err(VaultError::AccountIndexOutOfRange { account });
    }
    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hardened_bit_is_rejected() {
        assert_eq!(check_account(0), Ok(0));
        assert_eq!(check_account(MAX_ACCOUNT_INDEX), Ok(MAX_ACCOUNT_INDEX));
        assert_eq!(
            check_account(MAX_ACCOUNT_INDEX + 1),
            Err(VaultError::AccountIndexOutOfRange {
                account: 0x8000_0000
            })
        );
        assert_eq!(
            check_account(u32::MAX).map_err(|e| e.code()),
            Err("account_index_out_of_range")
        );
    }
}
