//! Signer recovery over the batch digest.
//!
//! An account accepts a batch only if the signature recovers to its admin. Every failure mode
//! (bad length, bad `v`, malleable `s`, recovery failure, wrong signer) collapses into the same
//! "not authorised" outcome.

use alloy_primitives::{keccak256, Address, B256};
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};

use hook_account_types::{hooks_digest, BatchSignature, Call};

/// Ethereum address of a secp256k1 public key: low 20 bytes of `keccak256(x || y)`.
pub fn address_of(key: &VerifyingKey) -> Address {
    let encoded = key.to_encoded_point(false);
    let hash = keccak256(&encoded.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

fn recovery_id(v: u8) -> Option<RecoveryId> {
    let parity = match v {
        27 | 28 => v - 27,
        0 | 1 => v,
        _ => return None,
    };
    RecoveryId::try_from(parity).ok()
}

/// Recover the signer of a 32-byte digest.
pub fn recover_signer(digest: B256, signature: &BatchSignature) -> Option<Address> {
    let (v, r, s) = signature.to_parts()?;
    let recovery_id = recovery_id(v)?;

    let mut rs = [0u8; 64];
    rs[..32].copy_from_slice(r.as_slice());
    rs[32..].copy_from_slice(s.as_slice());
    let sig = Signature::try_from(&rs[..]).ok()?;
    // Reject the high-s twin of every valid signature.
    if sig.normalize_s().is_some() {
        return None;
    }

    let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &sig, recovery_id).ok()?;
    Some(address_of(&key))
}

/// Whether `signature` over `(calls, nonce)` for `account` on `chain_id` was made by `expected`.
pub fn verify(
    chain_id: u64,
    account: Address,
    calls: &[Call],
    nonce: B256,
    expected: Address,
    signature: &BatchSignature,
) -> bool {
    let digest = hooks_digest(chain_id, account, calls, nonce);
    matches!(recover_signer(digest, signature), Some(signer) if signer == expected)
}

/// Sign a digest, producing a canonical low-s `r || s || v` signature with `v` in {27, 28}.
pub fn sign_digest(key: &SigningKey, digest: B256) -> Result<BatchSignature, k256::ecdsa::Error> {
    let (signature, recovery_id) = key.sign_prehash_recoverable(digest.as_slice())?;
    let mut out = Vec::with_capacity(65);
    out.extend_from_slice(&signature.to_bytes());
    out.push(27 + recovery_id.to_byte());
    Ok(BatchSignature::Packed(out.into()))
}

/// Sign a batch for `account` on `chain_id`.
pub fn sign_hooks(
    key: &SigningKey,
    chain_id: u64,
    account: Address,
    calls: &[Call],
    nonce: B256,
) -> Result<BatchSignature, k256::ecdsa::Error> {
    sign_digest(key, hooks_digest(chain_id, account, calls, nonce))
}
