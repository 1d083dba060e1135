//! Shared types for hook accounts: ABI surface, signature encodings and the batch digest.
//!
//! Both the accounts and the off-platform signer link this crate so that the digest a
//! signer produces is, byte for byte, the digest an account verifies.

pub mod abi;
pub mod eip712;
pub mod signature;

pub use abi::{Call, Hooks};
pub use eip712::{domain_separator, hash_call, hash_calls, hash_hooks, hooks_digest, typed_data_digest};
pub use signature::BatchSignature;
