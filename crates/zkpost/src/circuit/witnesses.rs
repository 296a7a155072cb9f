use ff::FromUniformBytes as _;
use pasta_curves::Fp;

use super::PublicSignals;
use crate::{
    keys::{IdentityNullifier, IdentityTrapdoor},
    signal::{ExternalNullifier, SignalHash},
};

/// Circuit inputs, named after the circuit's input signals.
#[derive(Clone, Debug)]
pub struct Inputs {
    /// Compressed identity public key.
    pub identity_pk: [u8; 32],
    /// Compressed nonce point `R` of the authorization signature.
    pub auth_sig_r: [u8; 32],
    /// Scalar `S` of the authorization signature.
    pub auth_sig_s: [u8; 32],
    /// Public signal.
    pub signal_hash: SignalHash,
    /// Context binding.
    pub external_nullifier: ExternalNullifier,
    /// Identity nullifier secret.
    pub identity_nullifier: IdentityNullifier,
    /// Identity trapdoor secret.
    pub identity_trapdoor: IdentityTrapdoor,
    /// Merkle siblings, leaf level first.
    pub identity_path_elements: Vec<Fp>,
    /// Merkle direction bits, leaf level first.
    pub identity_path_index: Vec<u8>,
}

/// A full assignment: the checked inputs plus every derived value.
#[derive(Clone, Debug)]
pub struct Witness {
    pub(super) assignments: Vec<Fp>,
    pub(super) leaf: Fp,
    pub(super) public: PublicSignals,
}

impl Witness {
    /// Recomputed identity commitment.
    #[must_use]
    pub const fn leaf(&self) -> Fp {
        self.leaf
    }

    /// Public outputs.
    #[must_use]
    pub const fn public_signals(&self) -> &PublicSignals {
        &self.public
    }

    /// Private assignments in wire order, for the proving backend.
    #[must_use]
    pub fn assignments(&self) -> &[Fp] {
        &self.assignments
    }
}

/// Embed the signature scalar $S \in \mathbb{F}_q$ into $\mathbb{F}_p$.
///
/// The two moduli differ, so the little-endian bytes are zero-extended and
/// reduced.
pub(super) fn scalar_to_base(s: &[u8; 32]) -> Fp {
    let mut wide = [0u8; 64];
    let (low, _) = wide.split_at_mut(32);
    low.copy_from_slice(s);
    Fp::from_uniform_bytes(&wide)
}
