//! EIP-712 digest of a batch of calls.
//!
//! The encoding is fixed: any change here breaks every signature produced off-platform.

use alloy_primitives::{keccak256, Address, B256, U256};

use crate::abi::Call;

pub const DOMAIN_NAME: &str = "HookAccount";
pub const DOMAIN_VERSION: &str = "1";

pub const DOMAIN_TYPE: &[u8] =
    b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";
pub const CALL_TYPE: &[u8] = b"Call(address target,uint256 value,bytes callData,bool allowFailure)";
/// `encodeType(Hooks)`: the primary type followed by its referenced `Call` type.
pub const HOOKS_TYPE: &[u8] = b"Hooks(Call[] calls,bytes32 nonce)Call(address target,uint256 value,bytes callData,bool allowFailure)";

fn address_word(address: Address) -> [u8; 32] {
    let mut padded = [0u8; 32];
    padded[12..32].copy_from_slice(address.as_slice());
    padded
}

fn bool_word(flag: bool) -> [u8; 32] {
    let mut padded = [0u8; 32];
    padded[31] = flag as u8;
    padded
}

/// Domain separator binding the protocol name/version, the network and one account.
pub fn domain_separator(chain_id: u64, verifying_contract: Address) -> B256 {
    let mut buf = Vec::with_capacity(32 * 5);
    buf.extend_from_slice(keccak256(DOMAIN_TYPE).as_slice());
    buf.extend_from_slice(keccak256(DOMAIN_NAME.as_bytes()).as_slice());
    buf.extend_from_slice(keccak256(DOMAIN_VERSION.as_bytes()).as_slice());
    buf.extend_from_slice(&U256::from(chain_id).to_be_bytes::<32>());
    buf.extend_from_slice(&address_word(verifying_contract));
    keccak256(buf)
}

/// `hashStruct(Call)`; the payload is hashed, every other field is one word.
pub fn hash_call(call: &Call) -> B256 {
    let mut buf = Vec::with_capacity(32 * 5);
    buf.extend_from_slice(keccak256(CALL_TYPE).as_slice());
    buf.extend_from_slice(&address_word(call.target));
    buf.extend_from_slice(&call.value.to_be_bytes::<32>());
    buf.extend_from_slice(keccak256(&call.callData).as_slice());
    buf.extend_from_slice(&bool_word(call.allowFailure));
    keccak256(buf)
}

/// Hash of the ordered per-call digests (EIP-712 encoding of `Call[]`).
pub fn hash_calls(calls: &[Call]) -> B256 {
    let mut buf = Vec::with_capacity(32 * calls.len());
    for call in calls {
        buf.extend_from_slice(hash_call(call).as_slice());
    }
    keccak256(buf)
}

/// `hashStruct(Hooks)` over `{calls, nonce}`.
pub fn hash_hooks(calls: &[Call], nonce: B256) -> B256 {
    let mut buf = Vec::with_capacity(32 * 3);
    buf.extend_from_slice(keccak256(HOOKS_TYPE).as_slice());
    buf.extend_from_slice(hash_calls(calls).as_slice());
    buf.extend_from_slice(nonce.as_slice());
    keccak256(buf)
}

/// `keccak256("\x19\x01" || domainSeparator || structHash)`.
pub fn typed_data_digest(domain_separator: B256, struct_hash: B256) -> B256 {
    let mut buf = Vec::with_capacity(2 + 32 + 32);
    buf.extend_from_slice(b"\x19\x01");
    buf.extend_from_slice(domain_separator.as_slice());
    buf.extend_from_slice(struct_hash.as_slice());
    keccak256(buf)
}

/// The digest an account admin signs for `calls` under `nonce`.
pub fn hooks_digest(chain_id: u64, account: Address, calls: &[Call], nonce: B256) -> B256 {
    typed_data_digest(domain_separator(chain_id, account), hash_hooks(calls, nonce))
}
