#![allow(dead_code)]

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{sol, SolCall, SolError, SolInterface, SolValue};
use k256::ecdsa::SigningKey;

use hook_account::{
    abi::IHookAccount,
    auth::{address_of, sign_hooks},
    registry::{account_address, encode_execute_hooks},
    AccountRegistry, AccountShell, BatchSignature, Call, Contract, Frame, HookEngine, Revert, Vm,
};

pub const CHAIN_ID: u64 = 31337;

sol! {
    interface ICounter {
        function increment() external payable;
        function fail() external payable;
        function count() external view returns (uint256);
    }

    error Boom(uint256 code);
}

/// Counts successful `increment()` calls in slot 0. `fail()` increments, then reverts.
pub struct Counter;

impl Counter {
    fn bump(vm: &mut Vm, address: Address) {
        let current = U256::from_be_bytes(vm.sload(address, B256::ZERO).0);
        let next = current + U256::from(1u64);
        vm.sstore(address, B256::ZERO, B256::from(next.to_be_bytes::<32>()));
    }
}

impl Contract for Counter {
    fn name(&self) -> &'static str {
        "Counter"
    }

    fn call(&self, vm: &mut Vm, frame: &Frame, input: &[u8]) -> Result<Bytes, Revert> {
        match ICounter::ICounterCalls::abi_decode(input, true).map_err(|_| Revert::empty())? {
            ICounter::ICounterCalls::increment(_) => {
                Self::bump(vm, frame.address);
                Ok(Bytes::new())
            }
            ICounter::ICounterCalls::fail(_) => {
                Self::bump(vm, frame.address);
                Err(Revert::new(Boom { code: U256::from(7u64) }.abi_encode()))
            }
            ICounter::ICounterCalls::count(_) => {
                let count = U256::from_be_bytes(vm.sload(frame.address, B256::ZERO).0);
                Ok(count.abi_encode().into())
            }
        }
    }
}

pub fn increment(counter: Address, value: U256, allow_failure: bool) -> Call {
    Call {
        target: counter,
        value,
        callData: ICounter::incrementCall {}.abi_encode().into(),
        allowFailure: allow_failure,
    }
}

pub fn fail(counter: Address, value: U256, allow_failure: bool) -> Call {
    Call {
        target: counter,
        value,
        callData: ICounter::failCall {}.abi_encode().into(),
        allowFailure: allow_failure,
    }
}

pub fn nonce(n: u8) -> B256 {
    B256::repeat_byte(n)
}

pub struct Fixture {
    pub vm: Vm,
    pub engine: Address,
    pub registry: Address,
    pub counter: Address,
    pub relayer: Address,
    pub shell: AccountShell,
    pub owner_key: SigningKey,
    pub owner: Address,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_shell(AccountShell::delegating())
    }

    pub fn with_shell(shell: AccountShell) -> Self {
        let engine = Address::repeat_byte(0xe1);
        let registry = Address::repeat_byte(0x7e);
        let counter = Address::repeat_byte(0xc0);
        let relayer = Address::repeat_byte(0x4e);

        let mut vm = Vm::new(CHAIN_ID);
        vm.install(engine, Arc::new(HookEngine));
        vm.install(registry, Arc::new(AccountRegistry::with_shell(engine, shell)));
        vm.install(counter, Arc::new(Counter));
        vm.fund(relayer, U256::from(1_000u64));

        let owner_key = SigningKey::from_slice(&[0x0au8; 32]).expect("valid key");
        let owner = address_of(owner_key.verifying_key());

        Self {
            vm,
            engine,
            registry,
            counter,
            relayer,
            shell,
            owner_key,
            owner,
        }
    }

    pub fn account(&self) -> Address {
        account_address(self.registry, self.owner, &self.shell)
    }

    pub fn sign(&self, calls: &[Call], nonce: B256) -> BatchSignature {
        sign_hooks(&self.owner_key, CHAIN_ID, self.account(), calls, nonce).expect("signing")
    }

    /// Relayer submits a signed batch through the registry.
    pub fn execute_via_registry(&mut self, calls: Vec<Call>, nonce: B256, value: U256) -> Result<Bytes, Revert> {
        let signature = self.sign(&calls, nonce).to_packed().expect("packed");
        let input = encode_execute_hooks(calls, nonce, self.owner, signature);
        self.vm.transact(self.relayer, self.registry, value, &input)
    }

    /// Relayer submits a signed batch straight to an existing account.
    pub fn execute_direct(
        &mut self,
        calls: Vec<Call>,
        nonce: B256,
        signature: &BatchSignature,
    ) -> Result<Bytes, Revert> {
        let input = match signature {
            BatchSignature::Split { v, r, s } => IHookAccount::executeHooks_1Call {
                calls,
                nonce,
                v: *v,
                r: *r,
                s: *s,
            }
            .abi_encode(),
            BatchSignature::Packed(blob) => IHookAccount::executeHooks_0Call {
                calls,
                nonce,
                signature: blob.clone(),
            }
            .abi_encode(),
        };
        let account = self.account();
        self.vm.transact(self.relayer, account, U256::ZERO, &input)
    }

    /// Deploy the owner's account with an empty batch.
    pub fn deploy_account(&mut self) -> Address {
        self.execute_via_registry(Vec::new(), nonce(0xff), U256::ZERO)
            .expect("deployment");
        self.account()
    }

    pub fn count(&mut self) -> U256 {
        let out = self
            .vm
            .transact(self.relayer, self.counter, U256::ZERO, &ICounter::countCall {}.abi_encode())
            .expect("count");
        U256::abi_decode(&out, true).expect("uint256")
    }

    pub fn read_address(&mut self, input: Vec<u8>) -> Address {
        let account = self.account();
        let out = self
            .vm
            .transact(self.relayer, account, U256::ZERO, &input)
            .expect("read");
        Address::abi_decode(&out, true).expect("address")
    }
}
