//! Hook execution engine: the logic every account shell delegates to.
//!
//! Runs against the calling account's own [`AccountState`](crate::layout::AccountState) (the
//! frame's `address`), never against state of its own. State machine per account:
//! `Uninitialized -> Initialized`, with no way back.

use alloy_primitives::{Address, Bytes, B256};
use alloy_sol_types::{SolInterface, SolValue};
use tracing::debug;

use hook_account_types::{
    abi::{self, IHookAccount::IHookAccountCalls},
    domain_separator, hooks_digest, BatchSignature, Call,
};

use crate::{
    auth,
    errors::HookError,
    shell::ensure_implementation,
    vm::{Contract, Frame, Revert, Vm},
};

/// Proof that the running frame is the account acting on itself.
///
/// Only this module can mint one, so privileged transitions taking it are unreachable from the
/// public dispatch surface except through the self-call check in `updateTrustedExecutor`.
pub struct SelfAuthority(());

#[derive(Clone, Copy, Debug, Default)]
pub struct HookEngine;

impl HookEngine {
    pub fn initialize(
        &self,
        vm: &mut Vm,
        frame: &Frame,
        implementation: Address,
        admin: Address,
        trusted_executor: Address,
        calls: &[Call],
    ) -> Result<(), Revert> {
        let account = frame.address;
        if vm.account_state(account).is_some_and(|s| s.engine.initialized) {
            return Err(HookError::AlreadyInitialized(account).into());
        }
        ensure_implementation(vm, account, implementation)?;

        vm.set_implementation(account, implementation);
        let previous_admin = vm.set_admin(account, admin);
        vm.set_initialized(account);
        vm.emit(
            account,
            &abi::AdminChanged {
                previousAdmin: previous_admin,
                newAdmin: admin,
            },
        );
        vm.emit(account, &abi::Upgraded { implementation });
        debug!(%account, %admin, %implementation, calls = calls.len(), "account initialized");

        // Bootstrap calls need no signature: initialisation happens once, as part of the
        // account's own creation.
        execute_calls(vm, account, calls)?;

        self.set_trusted_executor(vm, account, trusted_executor, SelfAuthority(()));
        Ok(())
    }

    pub fn execute_hooks(
        &self,
        vm: &mut Vm,
        frame: &Frame,
        calls: &[Call],
        nonce: B256,
        signature: &BatchSignature,
    ) -> Result<(), Revert> {
        let account = frame.address;
        let admin = match vm.account_state(account) {
            Some(state) if state.engine.initialized => state.shell.admin,
            _ => return Err(HookError::InvalidInitialization.into()),
        };

        if !auth::verify(vm.chain_id(), account, calls, nonce, admin, signature) {
            return Err(HookError::InvalidSignature.into());
        }
        self.use_nonce(vm, account, nonce)?;

        debug!(%account, %nonce, calls = calls.len(), "executing signed hooks");
        execute_calls(vm, account, calls)
    }

    /// No nonce bookkeeping: the caller's identity is the authorisation, so replay protection on
    /// this path is the trusted executor's concern.
    pub fn trusted_execute_hooks(
        &self,
        vm: &mut Vm,
        frame: &Frame,
        calls: &[Call],
    ) -> Result<(), Revert> {
        let account = frame.address;
        let trusted = vm
            .account_state(account)
            .map(|s| s.engine.trusted_executor)
            .unwrap_or_default();
        if trusted == Address::ZERO || frame.caller != trusted {
            return Err(HookError::OnlyTrustedExecutor(frame.caller).into());
        }

        debug!(%account, executor = %frame.caller, calls = calls.len(), "executing trusted hooks");
        execute_calls(vm, account, calls)
    }

    pub fn update_trusted_executor(
        &self,
        vm: &mut Vm,
        frame: &Frame,
        who: Address,
    ) -> Result<(), Revert> {
        if frame.caller != frame.address {
            return Err(HookError::OnlySelf(frame.caller).into());
        }
        self.set_trusted_executor(vm, frame.address, who, SelfAuthority(()));
        Ok(())
    }

    pub fn set_trusted_executor(
        &self,
        vm: &mut Vm,
        account: Address,
        who: Address,
        _authority: SelfAuthority,
    ) {
        let previous = vm.set_trusted_executor(account, who);
        vm.emit(
            account,
            &abi::TrustedExecutorUpdated {
                previousExecutor: previous,
                newExecutor: who,
            },
        );
        debug!(%account, %previous, new = %who, "trusted executor updated");
    }

    pub fn update_implementation(
        &self,
        vm: &mut Vm,
        frame: &Frame,
        new_implementation: Address,
    ) -> Result<(), Revert> {
        let account = frame.address;
        self.only_admin(vm, frame)?;
        ensure_implementation(vm, account, new_implementation)?;

        vm.set_implementation(account, new_implementation);
        vm.emit(
            account,
            &abi::Upgraded {
                implementation: new_implementation,
            },
        );
        debug!(%account, implementation = %new_implementation, "implementation upgraded");
        Ok(())
    }

    pub fn revoke_nonce(&self, vm: &mut Vm, frame: &Frame, nonce: B256) -> Result<(), Revert> {
        self.only_admin(vm, frame)?;
        self.use_nonce(vm, frame.address, nonce)?;
        debug!(account = %frame.address, %nonce, "nonce revoked");
        Ok(())
    }

    fn only_admin(&self, vm: &Vm, frame: &Frame) -> Result<(), HookError> {
        let admin = vm
            .account_state(frame.address)
            .map(|s| s.shell.admin)
            .unwrap_or_default();
        if admin == Address::ZERO || frame.caller != admin {
            return Err(HookError::OnlyAdmin(frame.caller));
        }
        Ok(())
    }

    fn use_nonce(&self, vm: &mut Vm, account: Address, nonce: B256) -> Result<(), HookError> {
        if !vm.use_nonce(account, nonce) {
            return Err(HookError::NonceAlreadyUsed(nonce));
        }
        Ok(())
    }
}

/// Run `calls` in order from `account`.
///
/// A failing call with `allowFailure` is discarded (its frame has already been rolled back); any
/// other failure aborts with the callee's exact revert payload.
pub fn execute_calls(vm: &mut Vm, account: Address, calls: &[Call]) -> Result<(), Revert> {
    for (index, call) in calls.iter().enumerate() {
        match vm.call(account, call.target, call.value, &call.callData) {
            Ok(_) => {}
            Err(revert) if call.allowFailure => {
                debug!(%account, index, target = %call.target, %revert, "tolerated call failure");
            }
            Err(revert) => return Err(revert),
        }
    }
    Ok(())
}

impl Contract for HookEngine {
    fn name(&self) -> &'static str {
        "HookEngine"
    }

    fn call(&self, vm: &mut Vm, frame: &Frame, input: &[u8]) -> Result<Bytes, Revert> {
        let decoded = IHookAccountCalls::abi_decode(input, true).map_err(|_| Revert::empty())?;
        let account = frame.address;

        let out = match decoded {
            IHookAccountCalls::initialize(c) => {
                self.initialize(vm, frame, c.implementation, c.admin, c.trustedExecutor, &c.calls)?;
                Vec::new()
            }
            IHookAccountCalls::executeHooks_0(c) => {
                let signature = BatchSignature::Packed(c.signature);
                self.execute_hooks(vm, frame, &c.calls, c.nonce, &signature)?;
                Vec::new()
            }
            IHookAccountCalls::executeHooks_1(c) => {
                let signature = BatchSignature::Split { v: c.v, r: c.r, s: c.s };
                self.execute_hooks(vm, frame, &c.calls, c.nonce, &signature)?;
                Vec::new()
            }
            IHookAccountCalls::trustedExecuteHooks(c) => {
                self.trusted_execute_hooks(vm, frame, &c.calls)?;
                Vec::new()
            }
            IHookAccountCalls::updateTrustedExecutor(c) => {
                self.update_trusted_executor(vm, frame, c.trustedExecutor)?;
                Vec::new()
            }
            IHookAccountCalls::updateImplementation(c) => {
                self.update_implementation(vm, frame, c.newImplementation)?;
                Vec::new()
            }
            IHookAccountCalls::revokeNonce(c) => {
                self.revoke_nonce(vm, frame, c.nonce)?;
                Vec::new()
            }
            IHookAccountCalls::domainSeparator(_) => {
                domain_separator(vm.chain_id(), account).abi_encode()
            }
            IHookAccountCalls::hashHooks(c) => {
                hooks_digest(vm.chain_id(), account, &c.calls, c.nonce).abi_encode()
            }
            IHookAccountCalls::trustedExecutor(_) => {
                let state = vm.account_state(account);
                state.map(|s| s.engine.trusted_executor).unwrap_or_default().abi_encode()
            }
            IHookAccountCalls::admin(_) => {
                let state = vm.account_state(account);
                state.map(|s| s.shell.admin).unwrap_or_default().abi_encode()
            }
            IHookAccountCalls::implementation(_) => {
                let state = vm.account_state(account);
                state.map(|s| s.shell.implementation).unwrap_or_default().abi_encode()
            }
            IHookAccountCalls::nonces(c) => {
                let state = vm.account_state(account);
                state.is_some_and(|s| s.engine.is_used(c.nonce)).abi_encode()
            }
        };
        Ok(out.into())
    }
}
