//! The deployed, owner-addressable account.
//!
//! A shell owns nothing but the two [`ShellSlots`](crate::layout::ShellSlots) fields; every
//! other invocation is delegated to the logic at `implementation`, which runs against this
//! account's state and whose outcome (revert payload included) is returned unchanged.

use alloy_primitives::{keccak256, Address, Bytes, B256};
use alloy_sol_types::{SolCall, SolInterface, SolValue};
use tracing::debug;

use hook_account_types::abi::{
    self,
    IAccountShell::IAccountShellCalls,
    IHookAccount::initializeCall,
};

use crate::{
    errors::HookError,
    vm::{Contract, Frame, Revert, Vm},
};

/// An account may only delegate to code living somewhere else.
pub(crate) fn ensure_implementation(
    vm: &Vm,
    account: Address,
    implementation: Address,
) -> Result<(), HookError> {
    if implementation == account || !vm.has_code(implementation) {
        return Err(HookError::InvalidImplementation(implementation));
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShellKind {
    /// Delegates everything once initialised.
    Delegating,
    /// Additionally serves `admin()` and `upgradeTo(address)` itself when the caller is the
    /// admin; all other callers are delegated as usual.
    Transparent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccountShell {
    kind: ShellKind,
}

impl AccountShell {
    pub const fn new(kind: ShellKind) -> Self {
        Self { kind }
    }

    pub const fn delegating() -> Self {
        Self::new(ShellKind::Delegating)
    }

    pub const fn transparent() -> Self {
        Self::new(ShellKind::Transparent)
    }

    pub fn kind(&self) -> ShellKind {
        self.kind
    }

    /// Template identity; stands in for the shell's creation bytecode.
    pub fn init_code(&self) -> &'static [u8] {
        match self.kind {
            ShellKind::Delegating => b"hook-account/shell/delegating/v1",
            ShellKind::Transparent => b"hook-account/shell/transparent/v1",
        }
    }

    pub fn init_code_hash(&self) -> B256 {
        keccak256(self.init_code())
    }

    /// Before initialisation only `initialize` is accepted; it seeds `implementation` from its
    /// own arguments so the engine can be reached.
    fn bootstrap(&self, vm: &mut Vm, frame: &Frame, input: &[u8]) -> Result<Bytes, Revert> {
        if input.get(..4) != Some(&initializeCall::SELECTOR[..]) {
            return Err(HookError::InvalidInitialization.into());
        }
        let init = initializeCall::abi_decode(input, true)
            .map_err(|_| Revert::from(HookError::InvalidInitialization))?;
        ensure_implementation(vm, frame.address, init.implementation)?;

        vm.set_implementation(frame.address, init.implementation);
        vm.delegate(frame, init.implementation, input)
    }

    fn serve_admin(&self, vm: &mut Vm, frame: &Frame, input: &[u8]) -> Option<Result<Bytes, Revert>> {
        let admin = vm.account_state(frame.address)?.shell.admin;
        if frame.caller != admin {
            return None;
        }
        match IAccountShellCalls::abi_decode(input, true).ok()? {
            IAccountShellCalls::admin(_) => Some(Ok(admin.abi_encode().into())),
            IAccountShellCalls::upgradeTo(c) => {
                Some(self.upgrade_to(vm, frame.address, c.newImplementation))
            }
        }
    }

    fn upgrade_to(
        &self,
        vm: &mut Vm,
        account: Address,
        new_implementation: Address,
    ) -> Result<Bytes, Revert> {
        ensure_implementation(vm, account, new_implementation)?;
        vm.set_implementation(account, new_implementation);
        vm.emit(
            account,
            &abi::Upgraded {
                implementation: new_implementation,
            },
        );
        debug!(%account, implementation = %new_implementation, "shell upgraded");
        Ok(Bytes::new())
    }
}

impl Contract for AccountShell {
    fn name(&self) -> &'static str {
        match self.kind {
            ShellKind::Delegating => "AccountShell",
            ShellKind::Transparent => "TransparentAccountShell",
        }
    }

    fn call(&self, vm: &mut Vm, frame: &Frame, input: &[u8]) -> Result<Bytes, Revert> {
        let implementation = vm
            .account_state(frame.address)
            .map(|s| s.shell.implementation)
            .unwrap_or_default();
        if implementation == Address::ZERO {
            return self.bootstrap(vm, frame, input);
        }

        if self.kind == ShellKind::Transparent {
            if let Some(result) = self.serve_admin(vm, frame, input) {
                return result;
            }
        }
        vm.delegate(frame, implementation, input)
    }
}
