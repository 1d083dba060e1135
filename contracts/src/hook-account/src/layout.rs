//! Persistent state schema of a hook account.
//!
//! The delegating shell and whatever logic it currently points at share one state space. The
//! shell only ever touches [`ShellSlots`]; those two fields sit at hash-derived ERC-1967 slots so
//! they can never alias the logic's sequentially allocated fields in [`EngineSlots`]. Any logic
//! body installed through an upgrade must keep honouring this schema (`LAYOUT_VERSION`).

use std::collections::BTreeSet;

use alloy_primitives::{b256, keccak256, Address, B256, U256};

pub const LAYOUT_VERSION: u16 = 1;

/// `bytes32(uint256(keccak256("eip1967.proxy.implementation")) - 1)`.
pub const IMPLEMENTATION_SLOT: B256 =
    b256!("360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc");

/// `bytes32(uint256(keccak256("eip1967.proxy.admin")) - 1)`.
pub const ADMIN_SLOT: B256 =
    b256!("b53127684a568b3173ae13b9f8a6016e243e63b6e8ee1178d6a717850b5d6103");

// Sequential slots owned by the engine.
pub const INITIALIZED_SLOT: U256 = U256::from_limbs([0, 0, 0, 0]);
pub const TRUSTED_EXECUTOR_SLOT: U256 = U256::from_limbs([1, 0, 0, 0]);
pub const USED_NONCES_SLOT: U256 = U256::from_limbs([2, 0, 0, 0]);

/// Fields the shell reads and writes directly.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShellSlots {
    pub admin: Address,
    pub implementation: Address,
}

/// Fields owned by the engine logic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineSlots {
    pub initialized: bool,
    pub trusted_executor: Address,
    /// Storage slots of consumed or revoked nonces.
    used_nonces: BTreeSet<B256>,
}

impl EngineSlots {
    pub fn is_used(&self, nonce: B256) -> bool {
        self.used_nonces.contains(&nonce_slot(nonce))
    }

    /// Returns `false` if `nonce` was already used.
    pub fn mark_used(&mut self, nonce: B256) -> bool {
        self.used_nonces.insert(nonce_slot(nonce))
    }

    /// Undo of [`mark_used`](Self::mark_used); only the host's rollback calls this.
    pub(crate) fn unmark(&mut self, nonce: B256) {
        self.used_nonces.remove(&nonce_slot(nonce));
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountState {
    pub layout_version: u16,
    pub shell: ShellSlots,
    pub engine: EngineSlots,
}

impl Default for AccountState {
    fn default() -> Self {
        Self {
            layout_version: LAYOUT_VERSION,
            shell: ShellSlots::default(),
            engine: EngineSlots::default(),
        }
    }
}

/// Storage key of `usedNonces[nonce]`: `keccak256(nonce || USED_NONCES_SLOT)`.
pub fn nonce_slot(nonce: B256) -> B256 {
    let mut buf = Vec::with_capacity(64);
    buf.extend_from_slice(nonce.as_slice());
    buf.extend_from_slice(&USED_NONCES_SLOT.to_be_bytes::<32>());
    keccak256(buf)
}

fn address_word(address: Address) -> B256 {
    let mut padded = [0u8; 32];
    padded[12..32].copy_from_slice(address.as_slice());
    B256::from(padded)
}

fn bool_word(flag: bool) -> B256 {
    B256::from(U256::from(flag as u8).to_be_bytes::<32>())
}

impl AccountState {
    /// Raw word view of the schema, as an off-platform reader addressing slots would see it.
    ///
    /// Returns `None` for slots outside the schema.
    pub fn slot(&self, slot: B256) -> Option<B256> {
        if slot == IMPLEMENTATION_SLOT {
            return Some(address_word(self.shell.implementation));
        }
        if slot == ADMIN_SLOT {
            return Some(address_word(self.shell.admin));
        }
        let index = U256::from_be_bytes(slot.0);
        if index == INITIALIZED_SLOT {
            return Some(bool_word(self.engine.initialized));
        }
        if index == TRUSTED_EXECUTOR_SLOT {
            return Some(address_word(self.engine.trusted_executor));
        }
        self.engine.used_nonces.contains(&slot).then(|| bool_word(true))
    }
}
