use alloy_primitives::{Address, B256};
use alloy_sol_types::SolError;

use hook_account_types::abi;

/// Errors that abort a whole invocation. Each maps onto one ABI custom error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HookError {
    #[error("signature does not recover to the account admin")]
    InvalidSignature,
    #[error("nonce {0} already used")]
    NonceAlreadyUsed(B256),
    #[error("caller {0} is not the trusted executor")]
    OnlyTrustedExecutor(Address),
    #[error("caller {0} is not the admin")]
    OnlyAdmin(Address),
    #[error("caller {0} is not the account itself")]
    OnlySelf(Address),
    #[error("account {0} is already initialized")]
    AlreadyInitialized(Address),
    #[error("account is not initialized")]
    InvalidInitialization,
    #[error("implementation {0} has no code")]
    InvalidImplementation(Address),
}

impl HookError {
    /// ABI-encoded custom error, used as revert data.
    pub fn abi_encode(&self) -> Vec<u8> {
        match *self {
            Self::InvalidSignature => abi::InvalidSignature {}.abi_encode(),
            Self::NonceAlreadyUsed(nonce) => abi::NonceAlreadyUsed { nonce }.abi_encode(),
            Self::OnlyTrustedExecutor(caller) => abi::OnlyTrustedExecutor { caller }.abi_encode(),
            Self::OnlyAdmin(caller) => abi::OnlyAdmin { caller }.abi_encode(),
            Self::OnlySelf(caller) => abi::OnlySelf { caller }.abi_encode(),
            Self::AlreadyInitialized(account) => abi::AlreadyInitialized { account }.abi_encode(),
            Self::InvalidInitialization => abi::InvalidInitialization {}.abi_encode(),
            Self::InvalidImplementation(implementation) => {
                abi::InvalidImplementation { implementation }.abi_encode()
            }
        }
    }

    /// Recover the typed error from revert data. Unknown payloads yield `None`.
    pub fn abi_decode(data: &[u8]) -> Option<Self> {
        let selector: [u8; 4] = data.get(..4)?.try_into().ok()?;

        if selector == abi::InvalidSignature::SELECTOR {
            abi::InvalidSignature::abi_decode(data, true).ok()?;
            Some(Self::InvalidSignature)
        } else if selector == abi::NonceAlreadyUsed::SELECTOR {
            let e = abi::NonceAlreadyUsed::abi_decode(data, true).ok()?;
            Some(Self::NonceAlreadyUsed(e.nonce))
        } else if selector == abi::OnlyTrustedExecutor::SELECTOR {
            let e = abi::OnlyTrustedExecutor::abi_decode(data, true).ok()?;
            Some(Self::OnlyTrustedExecutor(e.caller))
        } else if selector == abi::OnlyAdmin::SELECTOR {
            let e = abi::OnlyAdmin::abi_decode(data, true).ok()?;
            Some(Self::OnlyAdmin(e.caller))
        } else if selector == abi::OnlySelf::SELECTOR {
            let e = abi::OnlySelf::abi_decode(data, true).ok()?;
            Some(Self::OnlySelf(e.caller))
        } else if selector == abi::AlreadyInitialized::SELECTOR {
            let e = abi::AlreadyInitialized::abi_decode(data, true).ok()?;
            Some(Self::AlreadyInitialized(e.account))
        } else if selector == abi::InvalidInitialization::SELECTOR {
            abi::InvalidInitialization::abi_decode(data, true).ok()?;
            Some(Self::InvalidInitialization)
        } else if selector == abi::InvalidImplementation::SELECTOR {
            let e = abi::InvalidImplementation::abi_decode(data, true).ok()?;
            Some(Self::InvalidImplementation(e.implementation))
        } else {
            None
        }
    }
}
