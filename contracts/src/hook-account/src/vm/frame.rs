use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolError;

use crate::{errors::HookError, vm::Vm};

/// Execution context of one call frame.
///
/// Under delegation the frame is shared unchanged: `address` stays the account whose state is
/// being operated on, `caller` stays the original caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame {
    pub caller: Address,
    pub address: Address,
    pub value: U256,
}

/// Code installed at an address.
pub trait Contract: Send + Sync {
    fn name(&self) -> &'static str;

    fn call(&self, vm: &mut Vm, frame: &Frame, input: &[u8]) -> Result<Bytes, Revert>;
}

/// Failed frame, carrying the exact revert payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, thiserror::Error)]
#[error("execution reverted: 0x{}", hex::encode(.data))]
pub struct Revert {
    pub data: Bytes,
}

impl Revert {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Decode the payload as the custom error `E`.
    pub fn decode<E: SolError>(&self) -> Option<E> {
        E::abi_decode(&self.data, true).ok()
    }

    pub fn hook_error(&self) -> Option<HookError> {
        HookError::abi_decode(&self.data)
    }
}

impl From<HookError> for Revert {
    fn from(error: HookError) -> Self {
        Self::new(error.abi_encode())
    }
}
