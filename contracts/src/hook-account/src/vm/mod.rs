//! In-process execution host.
//!
//! Models the parts of an EVM-style platform the accounts depend on: native balances, code at
//! addresses, per-frame atomicity, context-preserving delegation, deterministic deployment and
//! event logs. Every [`Vm::call`] is a checkpoint: each state write is journaled, and a failing
//! frame unwinds the journal back to where the frame was entered.

mod frame;

use std::{collections::BTreeMap, mem, sync::Arc};

use alloy_primitives::{keccak256, Address, Bytes, Log, B256, U256};
use alloy_sol_types::SolEvent;
use tracing::trace;

pub use frame::{Contract, Frame, Revert};

use crate::layout::AccountState;

/// Nesting limit for calls and delegations together. Frames recurse on the native stack, so
/// this has to stay well inside a default thread stack.
pub const MAX_CALL_DEPTH: usize = 64;

#[derive(Default)]
struct AccountInfo {
    balance: U256,
    code: Option<Arc<dyn Contract>>,
    /// Raw word storage used by ordinary contracts.
    storage: BTreeMap<B256, B256>,
    /// Typed schema used by hook accounts.
    hooks: Option<AccountState>,
}

/// Undo record of one state write.
enum Change {
    Balance { address: Address, previous: U256 },
    Code { address: Address, previous: Option<Arc<dyn Contract>> },
    Storage { address: Address, slot: B256, previous: B256 },
    HooksCreated { address: Address },
    Implementation { address: Address, previous: Address },
    Admin { address: Address, previous: Address },
    Initialized { address: Address, previous: bool },
    TrustedExecutor { address: Address, previous: Address },
    NonceUsed { address: Address, nonce: B256 },
}

#[derive(Default)]
struct World {
    accounts: BTreeMap<Address, AccountInfo>,
    logs: Vec<Log>,
}

impl World {
    fn account_mut(&mut self, address: Address) -> &mut AccountInfo {
        self.accounts.entry(address).or_default()
    }

    fn hooks_mut(&mut self, address: Address) -> &mut AccountState {
        self.account_mut(address)
            .hooks
            .get_or_insert_with(AccountState::default)
    }

    fn undo(&mut self, change: Change) {
        match change {
            Change::Balance { address, previous } => self.account_mut(address).balance = previous,
            Change::Code { address, previous } => self.account_mut(address).code = previous,
            Change::Storage {
                address,
                slot,
                previous,
            } => write_word(&mut self.account_mut(address).storage, slot, previous),
            Change::HooksCreated { address } => self.account_mut(address).hooks = None,
            Change::Implementation { address, previous } => {
                self.hooks_mut(address).shell.implementation = previous
            }
            Change::Admin { address, previous } => self.hooks_mut(address).shell.admin = previous,
            Change::Initialized { address, previous } => {
                self.hooks_mut(address).engine.initialized = previous
            }
            Change::TrustedExecutor { address, previous } => {
                self.hooks_mut(address).engine.trusted_executor = previous
            }
            Change::NonceUsed { address, nonce } => self.hooks_mut(address).engine.unmark(nonce),
        }
    }
}

fn write_word(storage: &mut BTreeMap<B256, B256>, slot: B256, value: B256) {
    if value == B256::ZERO {
        storage.remove(&slot);
    } else {
        storage.insert(slot, value);
    }
}

#[derive(Clone, Copy)]
struct Checkpoint {
    journal: usize,
    logs: usize,
}

pub struct Vm {
    chain_id: u64,
    world: World,
    journal: Vec<Change>,
    depth: usize,
}

/// CREATE2 address: `keccak256(0xff || deployer || salt || init_code_hash)[12..]`.
pub fn create2_address(deployer: Address, salt: B256, init_code_hash: B256) -> Address {
    let mut buf = Vec::with_capacity(1 + 20 + 32 + 32);
    buf.push(0xff);
    buf.extend_from_slice(deployer.as_slice());
    buf.extend_from_slice(salt.as_slice());
    buf.extend_from_slice(init_code_hash.as_slice());
    Address::from_slice(&keccak256(buf)[12..])
}

impl Vm {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            world: World::default(),
            journal: Vec::new(),
            depth: 0,
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Place code at a fixed address, replacing whatever was there.
    pub fn install(&mut self, address: Address, code: Arc<dyn Contract>) {
        let previous = self.world.account_mut(address).code.replace(code);
        self.journal.push(Change::Code { address, previous });
    }

    pub fn has_code(&self, address: Address) -> bool {
        self.code(address).is_some()
    }

    pub fn code(&self, address: Address) -> Option<Arc<dyn Contract>> {
        self.world.accounts.get(&address).and_then(|a| a.code.clone())
    }

    pub fn balance(&self, address: Address) -> U256 {
        self.world
            .accounts
            .get(&address)
            .map(|a| a.balance)
            .unwrap_or_default()
    }

    /// Credit native balance out of thin air.
    pub fn fund(&mut self, address: Address, amount: U256) {
        let balance = self.balance(address);
        self.set_balance(address, balance.saturating_add(amount));
    }

    fn set_balance(&mut self, address: Address, balance: U256) {
        let previous = mem::replace(&mut self.world.account_mut(address).balance, balance);
        self.journal.push(Change::Balance { address, previous });
    }

    pub fn sload(&self, address: Address, slot: B256) -> B256 {
        self.world
            .accounts
            .get(&address)
            .and_then(|a| a.storage.get(&slot).copied())
            .unwrap_or_default()
    }

    pub fn sstore(&mut self, address: Address, slot: B256, value: B256) {
        let previous = self.sload(address, slot);
        write_word(&mut self.world.account_mut(address).storage, slot, value);
        self.journal.push(Change::Storage {
            address,
            slot,
            previous,
        });
    }

    /// Word at `slot`, seeing through the typed schema of hook accounts.
    pub fn storage_at(&self, address: Address, slot: B256) -> B256 {
        self.account_state(address)
            .and_then(|state| state.slot(slot))
            .unwrap_or_else(|| self.sload(address, slot))
    }

    pub fn account_state(&self, address: Address) -> Option<&AccountState> {
        self.world.accounts.get(&address).and_then(|a| a.hooks.as_ref())
    }

    /// Hook account state at `address`, allocated on first write.
    fn hooks_mut(&mut self, address: Address) -> &mut AccountState {
        let account = self.world.account_mut(address);
        if account.hooks.is_none() {
            self.journal.push(Change::HooksCreated { address });
        }
        account.hooks.get_or_insert_with(AccountState::default)
    }

    /// Returns the previous implementation.
    pub fn set_implementation(&mut self, address: Address, implementation: Address) -> Address {
        let slot = &mut self.hooks_mut(address).shell.implementation;
        let previous = mem::replace(slot, implementation);
        self.journal.push(Change::Implementation { address, previous });
        previous
    }

    /// Returns the previous admin.
    pub fn set_admin(&mut self, address: Address, admin: Address) -> Address {
        let previous = mem::replace(&mut self.hooks_mut(address).shell.admin, admin);
        self.journal.push(Change::Admin { address, previous });
        previous
    }

    pub fn set_initialized(&mut self, address: Address) {
        let previous = mem::replace(&mut self.hooks_mut(address).engine.initialized, true);
        self.journal.push(Change::Initialized { address, previous });
    }

    /// Returns the previous executor.
    pub fn set_trusted_executor(&mut self, address: Address, executor: Address) -> Address {
        let slot = &mut self.hooks_mut(address).engine.trusted_executor;
        let previous = mem::replace(slot, executor);
        self.journal.push(Change::TrustedExecutor { address, previous });
        previous
    }

    /// Mark `nonce` used for the account. Returns `false` if it already was.
    pub fn use_nonce(&mut self, address: Address, nonce: B256) -> bool {
        let fresh = self.hooks_mut(address).engine.mark_used(nonce);
        if fresh {
            self.journal.push(Change::NonceUsed { address, nonce });
        }
        fresh
    }

    pub fn emit<E: SolEvent>(&mut self, address: Address, event: &E) {
        self.world.logs.push(Log {
            address,
            data: event.encode_log_data(),
        });
    }

    pub fn logs(&self) -> &[Log] {
        &self.world.logs
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            journal: self.journal.len(),
            logs: self.world.logs.len(),
        }
    }

    fn revert_to(&mut self, checkpoint: Checkpoint) {
        for change in self.journal.drain(checkpoint.journal..).rev() {
            self.world.undo(change);
        }
        self.world.logs.truncate(checkpoint.logs);
    }

    /// One top-level invocation from `origin`.
    pub fn transact(
        &mut self,
        origin: Address,
        to: Address,
        value: U256,
        input: &[u8],
    ) -> Result<Bytes, Revert> {
        let result = self.call(origin, to, value, input);
        if self.depth == 0 {
            // Nothing outside a transaction can roll it back.
            self.journal.clear();
        }
        result
    }

    /// Run one call frame. A failing frame leaves no trace, its value transfer included.
    pub fn call(
        &mut self,
        caller: Address,
        target: Address,
        value: U256,
        input: &[u8],
    ) -> Result<Bytes, Revert> {
        if self.depth >= MAX_CALL_DEPTH {
            trace!(%caller, %target, depth = self.depth, "call depth exceeded");
            return Err(Revert::empty());
        }
        let checkpoint = self.checkpoint();

        self.depth += 1;
        let result = self.enter(caller, target, value, input);
        self.depth -= 1;

        if let Err(ref revert) = result {
            trace!(%caller, %target, %value, %revert, "frame reverted");
            self.revert_to(checkpoint);
        }
        result
    }

    fn enter(
        &mut self,
        caller: Address,
        target: Address,
        value: U256,
        input: &[u8],
    ) -> Result<Bytes, Revert> {
        self.transfer(caller, target, value)?;

        let Some(code) = self.code(target) else {
            return Ok(Bytes::new());
        };
        trace!(%caller, %target, %value, code = code.name(), "call");
        let frame = Frame {
            caller,
            address: target,
            value,
        };
        code.call(self, &frame, input)
    }

    fn transfer(&mut self, from: Address, to: Address, value: U256) -> Result<(), Revert> {
        if value.is_zero() {
            return Ok(());
        }
        let source = self.balance(from).checked_sub(value).ok_or_else(Revert::empty)?;
        self.set_balance(from, source);
        let sink = self.balance(to).saturating_add(value);
        self.set_balance(to, sink);
        Ok(())
    }

    /// Run the code installed at `code_address` against the current frame's state.
    ///
    /// Not a checkpoint of its own, but it counts toward [`MAX_CALL_DEPTH`].
    pub fn delegate(
        &mut self,
        frame: &Frame,
        code_address: Address,
        input: &[u8],
    ) -> Result<Bytes, Revert> {
        if self.depth >= MAX_CALL_DEPTH {
            trace!(account = %frame.address, %code_address, depth = self.depth, "delegation depth exceeded");
            return Err(Revert::empty());
        }
        let code = self.code(code_address).ok_or_else(Revert::empty)?;
        trace!(account = %frame.address, %code_address, code = code.name(), "delegate");

        self.depth += 1;
        let result = code.call(self, frame, input);
        self.depth -= 1;
        result
    }

    /// Deploy `code` at its CREATE2 address. Fails if that address already has code.
    pub fn create2(
        &mut self,
        deployer: Address,
        salt: B256,
        code: Arc<dyn Contract>,
        init_code_hash: B256,
    ) -> Result<Address, Revert> {
        let address = create2_address(deployer, salt, init_code_hash);
        if self.has_code(address) {
            return Err(Revert::empty());
        }
        trace!(%deployer, %address, code = code.name(), "create2");
        self.install(address, code);
        Ok(address)
    }
}
