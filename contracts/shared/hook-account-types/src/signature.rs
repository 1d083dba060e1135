//! Recoverable signature encodings accepted by every signature-consuming entry point.

use alloy_primitives::{Bytes, B256};

/// Recoverable ECDSA signature in one of the two wire forms.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchSignature {
    /// Opaque blob: `r || s || v` (65 bytes) or EIP-2098 compact `r || yParityAndS` (64 bytes).
    Packed(Bytes),
    /// Decomposed `(v, r, s)`.
    Split { v: u8, r: B256, s: B256 },
}

impl BatchSignature {
    /// Normalise into `(v, r, s)`. Returns `None` for blobs of any other length.
    ///
    /// `v` is returned as encoded; callers decide which values they accept.
    pub fn to_parts(&self) -> Option<(u8, B256, B256)> {
        match self {
            Self::Split { v, r, s } => Some((*v, *r, *s)),
            Self::Packed(bytes) if bytes.len() == 65 => {
                let r = B256::from_slice(&bytes[0..32]);
                let s = B256::from_slice(&bytes[32..64]);
                Some((bytes[64], r, s))
            }
            Self::Packed(bytes) if bytes.len() == 64 => {
                let r = B256::from_slice(&bytes[0..32]);
                let mut s = B256::from_slice(&bytes[32..64]);
                let parity = s[0] >> 7;
                s[0] &= 0x7f;
                Some((27 + parity, r, s))
            }
            Self::Packed(_) => None,
        }
    }

    /// The 65-byte `r || s || v` blob, if the signature is well-formed.
    pub fn to_packed(&self) -> Option<Bytes> {
        let (v, r, s) = self.to_parts()?;
        let mut out = Vec::with_capacity(65);
        out.extend_from_slice(r.as_slice());
        out.extend_from_slice(s.as_slice());
        out.push(v);
        Some(out.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_and_split_agree() {
        let r = B256::repeat_byte(0x01);
        let s = B256::repeat_byte(0x02);
        let mut blob = Vec::new();
        blob.extend_from_slice(r.as_slice());
        blob.extend_from_slice(s.as_slice());
        blob.push(28);

        let packed = BatchSignature::Packed(blob.into());
        let split = BatchSignature::Split { v: 28, r, s };
        assert_eq!(packed.to_parts(), split.to_parts());
        assert_eq!(split.to_packed(), Some(packed.to_packed().unwrap()));
    }

    #[test]
    fn test_compact_form_carries_parity_in_top_bit() {
        let r = B256::repeat_byte(0x01);
        let s = B256::repeat_byte(0x02);
        let mut vs = s;
        vs[0] |= 0x80;
        let mut blob = Vec::new();
        blob.extend_from_slice(r.as_slice());
        blob.extend_from_slice(vs.as_slice());

        let parts = BatchSignature::Packed(blob.into()).to_parts().unwrap();
        assert_eq!(parts, (28, r, s));
    }

    #[test]
    fn test_unknown_length_is_rejected() {
        assert_eq!(BatchSignature::Packed(Bytes::from(vec![0u8; 63])).to_parts(), None);
        assert_eq!(BatchSignature::Packed(Bytes::new()).to_packed(), None);
    }
}
