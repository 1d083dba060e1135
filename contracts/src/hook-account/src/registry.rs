//! Deterministic per-owner account provisioning.
//!
//! The account of `owner` lives at the CREATE2 address derived from the registry address, the
//! owner-derived salt and the shell template. It can be computed before anything is deployed;
//! deployment is lazy and happens at most once per owner.

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolInterface, SolValue};
use tracing::debug;

use hook_account_types::{
    abi::{
        self,
        IAccountRegistry::IAccountRegistryCalls,
        IHookAccount::{executeHooks_0Call, executeHooks_1Call, initializeCall},
    },
    Call,
};

use crate::{
    shell::AccountShell,
    vm::{create2_address, Contract, Frame, Revert, Vm},
};

/// Salt binding an account to its owner: the owner address left-padded to 32 bytes.
pub fn owner_salt(owner: Address) -> B256 {
    let mut salt = [0u8; 32];
    salt[12..32].copy_from_slice(owner.as_slice());
    B256::from(salt)
}

/// Address of `owner`'s account under `registry` for the given shell template.
pub fn account_address(registry: Address, owner: Address, shell: &AccountShell) -> Address {
    create2_address(registry, owner_salt(owner), shell.init_code_hash())
}

#[derive(Clone, Copy, Debug)]
pub struct AccountRegistry {
    /// Logic every new account is initialised with.
    implementation: Address,
    shell: AccountShell,
}

impl AccountRegistry {
    pub fn new(implementation: Address) -> Self {
        Self::with_shell(implementation, AccountShell::delegating())
    }

    pub fn with_shell(implementation: Address, shell: AccountShell) -> Self {
        Self {
            implementation,
            shell,
        }
    }

    pub fn implementation(&self) -> Address {
        self.implementation
    }

    pub fn shell(&self) -> AccountShell {
        self.shell
    }

    /// Deploy and initialise `owner`'s account unless it already exists.
    ///
    /// The registry becomes the account's trusted executor.
    fn ensure_account(&self, vm: &mut Vm, registry: Address, owner: Address) -> Result<Address, Revert> {
        let account = account_address(registry, owner, &self.shell);
        if vm.has_code(account) {
            return Ok(account);
        }

        let deployed = vm.create2(
            registry,
            owner_salt(owner),
            Arc::new(self.shell),
            self.shell.init_code_hash(),
        )?;
        debug_assert_eq!(deployed, account);

        let init = initializeCall {
            implementation: self.implementation,
            admin: owner,
            trustedExecutor: registry,
            calls: Vec::new(),
        };
        vm.call(registry, account, U256::ZERO, &init.abi_encode())?;
        vm.emit(registry, &abi::AccountCreated { owner, account });
        debug!(%registry, %owner, %account, "account created");
        Ok(account)
    }

    /// Provision `owner`'s account if needed, then forward the signed batch to it.
    ///
    /// Runs inside the registry's frame, so a failure anywhere also undoes the deployment.
    fn execute_hooks(
        &self,
        vm: &mut Vm,
        frame: &Frame,
        owner: Address,
        forward: Vec<u8>,
    ) -> Result<Bytes, Revert> {
        let account = self.ensure_account(vm, frame.address, owner)?;
        vm.call(frame.address, account, frame.value, &forward)
    }
}

impl Contract for AccountRegistry {
    fn name(&self) -> &'static str {
        "AccountRegistry"
    }

    fn call(&self, vm: &mut Vm, frame: &Frame, input: &[u8]) -> Result<Bytes, Revert> {
        let decoded = IAccountRegistryCalls::abi_decode(input, true).map_err(|_| Revert::empty())?;
        match decoded {
            IAccountRegistryCalls::addressFor(c) => {
                let account = account_address(frame.address, c.owner, &self.shell);
                Ok(account.abi_encode().into())
            }
            IAccountRegistryCalls::accountImplementation(_) => {
                Ok(self.implementation.abi_encode().into())
            }
            IAccountRegistryCalls::executeHooks_0(c) => {
                let forward = executeHooks_0Call {
                    calls: c.calls,
                    nonce: c.nonce,
                    signature: c.signature,
                };
                self.execute_hooks(vm, frame, c.owner, forward.abi_encode())
            }
            IAccountRegistryCalls::executeHooks_1(c) => {
                let forward = executeHooks_1Call {
                    calls: c.calls,
                    nonce: c.nonce,
                    v: c.v,
                    r: c.r,
                    s: c.s,
                };
                self.execute_hooks(vm, frame, c.owner, forward.abi_encode())
            }
        }
    }
}

/// ABI-encoded registry call carrying a packed signature.
pub fn encode_execute_hooks(calls: Vec<Call>, nonce: B256, owner: Address, signature: Bytes) -> Vec<u8> {
    abi::IAccountRegistry::executeHooks_0Call {
        calls,
        nonce,
        owner,
        signature,
    }
    .abi_encode()
}
