//! Protocol-wide domain separators and personalizations.
//!
//! All BLAKE2b personalizations are exactly 16 bytes (the BLAKE2b
//! personal field width). Every hash in the publishing pipeline has its
//! own personalization, so no two derivations can collide by construction.

/// BLAKE2b-256 personalization for the message content digest.
///
/// The digest covers `(kind, subtype, createdAt, payload)` and never the
/// creator, so a message keeps its content address when republished under
/// a different identity.
pub const MESSAGE_HASH_PERSONALIZATION: &[u8; 16] = b"ZkPost_MsgDigest";

/// BLAKE2b-512 personalization mapping a message digest to the circuit's
/// public signal.
pub const SIGNAL_HASH_PERSONALIZATION: &[u8; 16] = b"ZkPost_SignalFld";

/// BLAKE2b-512 personalization for the per-message external nullifier.
///
/// Domain-separated from the signal hash: the two values are derived from
/// the same digest and must never coincide.
pub const EXTERNAL_NULLIFIER_PERSONALIZATION: &[u8; 16] = b"ZkPost_ExtNullif";

/// BLAKE2b-512 personalization for internal nodes of the identity tree.
pub const MERKLE_NODE_PERSONALIZATION: &[u8; 16] = b"ZkPost_MerkleNod";

/// BLAKE2b-512 personalization for identity commitments (tree leaves).
///
/// $$\mathsf{cm} = H(\mathsf{pk}_x \| \mathsf{pk}_y \| \mathsf{nf_{id}} \|
/// \mathsf{td})$$
pub const COMMITMENT_PERSONALIZATION: &[u8; 16] = b"ZkPost_IdCommit_";

/// BLAKE2b-512 personalization for the revealed nullifier hash.
///
/// $$\mathsf{nh} = H(\mathsf{extNf} \| \mathsf{nf_{id}} \| \text{pathBits})$$
pub const NULLIFIER_HASH_PERSONALIZATION: &[u8; 16] = b"ZkPost_NfHash___";

/// BLAKE2b-512 personalization for `PRF^expand`: identity secrets from a
/// 32-byte seed.
pub const PRF_EXPAND_PERSONALIZATION: &[u8; 16] = b"ZkPost_ExpandSd_";

/// Default depth of the identity tree (Semaphore's 20 levels, ~1M members).
pub const DEFAULT_TREE_DEPTH: usize = 20;

/// Largest supported tree depth. Path bits are packed into one field
/// element, which must stay below the 255-bit modulus.
pub const MAX_TREE_DEPTH: usize = 32;

/// Domain-separated key expansion from an identity seed.
///
/// `PRF^expand_seed(t) = BLAKE2b-512("ZkPost_ExpandSd_", seed || t)`
///
/// A struct with a single-byte domain separator and associated constants
/// for each child secret.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PrfExpand {
    domain_separator: u8,
}

impl PrfExpand {
    /// `[0x00]` -> authorization signing key (scalar field)
    pub(crate) const AUTH: Self = Self {
        domain_separator: 0x00,
    };
    /// `[0x01]` -> identity nullifier (base field)
    pub(crate) const NULLIFIER: Self = Self {
        domain_separator: 0x01,
    };
    /// `[0x02]` -> identity trapdoor (base field)
    pub(crate) const TRAPDOOR: Self = Self {
        domain_separator: 0x02,
    };

    /// Evaluate the PRF: `BLAKE2b-512("ZkPost_ExpandSd_", seed || domain_sep)`.
    ///
    /// Returns 64 bytes suitable for unbiased reduction into either field
    /// via `FromUniformBytes`.
    pub(crate) fn with(self, seed: &[u8; 32]) -> [u8; 64] {
        *blake2b_simd::Params::new()
            .hash_length(64)
            .personal(PRF_EXPAND_PERSONALIZATION)
            .to_state()
            .update(seed)
            .update(&[self.domain_separator])
            .finalize()
            .as_array()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Same seed, different domain separators -> different outputs.
    #[test]
    fn prf_expand_domain_separators_independent() {
        let seed = [0x42u8; 32];
        let auth = PrfExpand::AUTH.with(&seed);
        let nullifier = PrfExpand::NULLIFIER.with(&seed);
        let trapdoor = PrfExpand::TRAPDOOR.with(&seed);
        assert_ne!(auth, nullifier);
        assert_ne!(auth, trapdoor);
        assert_ne!(nullifier, trapdoor);
    }

    /// Personalizations must be pairwise distinct.
    #[test]
    fn personalizations_distinct() {
        let all = [
            MESSAGE_HASH_PERSONALIZATION,
            SIGNAL_HASH_PERSONALIZATION,
            EXTERNAL_NULLIFIER_PERSONALIZATION,
            MERKLE_NODE_PERSONALIZATION,
            COMMITMENT_PERSONALIZATION,
            NULLIFIER_HASH_PERSONALIZATION,
            PRF_EXPAND_PERSONALIZATION,
        ];
        for (i, left) in all.iter().enumerate() {
            for right in all.iter().skip(i + 1) {
                assert_ne!(left, right);
            }
        }
    }
}
