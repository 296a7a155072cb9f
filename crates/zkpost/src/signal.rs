//! Per-message external nullifier and signal hash.
//!
//! Both are pure functions of the message digest:
//!
//! $$\mathsf{extNf} = H(\texttt{"ZkPost\_ExtNullif"},\; h) \qquad
//!   \mathsf{signalHash} = H(\texttt{"ZkPost\_SignalFld"},\; h)$$
//!
//! Binding the external nullifier to the digest scopes double-signal
//! protection to one message: an identity can produce at most one valid
//! nullifier hash per message.

use ff::PrimeField as _;
use pasta_curves::Fp;

use crate::{
    constants::{EXTERNAL_NULLIFIER_PERSONALIZATION, SIGNAL_HASH_PERSONALIZATION},
    message::Digest,
    primitives::hash_to_field,
};

/// Context binding for a proof. One per message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExternalNullifier(Fp);

impl ExternalNullifier {
    /// Derive from a message digest.
    #[must_use]
    pub fn derive(digest: &Digest) -> Self {
        Self(hash_to_field(
            EXTERNAL_NULLIFIER_PERSONALIZATION,
            &[digest.as_bytes()],
        ))
    }
}

/// The message digest mapped into the circuit field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignalHash(Fp);

impl SignalHash {
    /// Derive from a message digest.
    #[must_use]
    pub fn derive(digest: &Digest) -> Self {
        Self(hash_to_field(SIGNAL_HASH_PERSONALIZATION, &[digest.as_bytes()]))
    }
}

impl From<Fp> for ExternalNullifier {
    fn from(fp: Fp) -> Self {
        Self(fp)
    }
}

impl From<ExternalNullifier> for Fp {
    fn from(nf: ExternalNullifier) -> Self {
        nf.0
    }
}

impl From<Fp> for SignalHash {
    fn from(fp: Fp) -> Self {
        Self(fp)
    }
}

impl From<SignalHash> for Fp {
    fn from(signal: SignalHash) -> Self {
        signal.0
    }
}

/// Both derived values for one message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signals {
    /// Context binding.
    pub external_nullifier: ExternalNullifier,
    /// Public signal.
    pub signal_hash: SignalHash,
}

impl Signals {
    /// Derive both values from a message digest.
    #[must_use]
    pub fn derive(digest: &Digest) -> Self {
        Self {
            external_nullifier: ExternalNullifier::derive(digest),
            signal_hash: SignalHash::derive(digest),
        }
    }

    /// `extNf || signalHash`, the message the identity keypair signs.
    #[must_use]
    pub fn auth_message(&self) -> [u8; 64] {
        let mut msg = [0u8; 64];
        let (head, tail) = msg.split_at_mut(32);
        head.copy_from_slice(&self.external_nullifier.0.to_repr());
        tail.copy_from_slice(&self.signal_hash.0.to_repr());
        msg
    }
}
