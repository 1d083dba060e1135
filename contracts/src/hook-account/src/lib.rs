//! Hook accounts: per-owner execution accounts that run batches of calls pre-authorised by
//! a single offline EIP-712 signature from the owner.
//!
//! Layers, leaves first:
//! - [`layout`]: the state schema shared by the delegating shell and its logic.
//! - [`auth`]: signer recovery over the batch digest.
//! - [`engine`]: the account logic (initialisation, nonces, batch execution, admin paths).
//! - [`shell`]: the deployed account, which delegates to whatever logic it points at.
//! - [`registry`]: deterministic per-owner provisioning and deploy-and-execute.
//!
//! [`vm`] is the in-process execution host all of the above run on.

pub mod auth;
pub mod engine;
pub mod errors;
pub mod layout;
pub mod registry;
pub mod shell;
pub mod vm;

pub use engine::HookEngine;
pub use errors::HookError;
pub use hook_account_types::{abi, eip712, BatchSignature, Call};
pub use layout::AccountState;
pub use registry::AccountRegistry;
pub use shell::{AccountShell, ShellKind};
pub use vm::{Contract, Frame, Revert, Vm};
