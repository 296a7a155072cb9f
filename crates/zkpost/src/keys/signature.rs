#![expect(
    clippy::field_scoped_visibility_modifiers,
    reason = "key relationships stay within the keys module"
)]

//! Authorization signatures.

use reddsa::orchard::SpendAuth;

/// RedPallas signature over `externalNullifier || signalHash`.
///
/// Encoded as 64 bytes: the compressed nonce point `R` then the scalar `S`.
#[derive(Clone, Copy, Debug)]
pub struct AuthSignature(pub(super) reddsa::Signature<SpendAuth>);

impl AuthSignature {
    /// Compressed `R`.
    #[must_use]
    pub fn r_bytes(&self) -> [u8; 32] {
        self.halves().0
    }

    /// Little-endian `S`.
    #[must_use]
    pub fn s_bytes(&self) -> [u8; 32] {
        self.halves().1
    }

    /// Reassemble from the two circuit inputs.
    #[must_use]
    pub fn from_parts(r: &[u8; 32], s: &[u8; 32]) -> Self {
        let mut bytes = [0u8; 64];
        let (head, tail) = bytes.split_at_mut(32);
        head.copy_from_slice(r);
        tail.copy_from_slice(s);
        Self::from(bytes)
    }

    fn halves(&self) -> ([u8; 32], [u8; 32]) {
        let bytes = <[u8; 64]>::from(*self);
        let (head, tail) = bytes.split_at(32);
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(head);
        s.copy_from_slice(tail);
        (r, s)
    }
}

impl From<[u8; 64]> for AuthSignature {
    fn from(bytes: [u8; 64]) -> Self {
        Self(reddsa::Signature::<SpendAuth>::from(bytes))
    }
}

impl From<AuthSignature> for [u8; 64] {
    fn from(sig: AuthSignature) -> [u8; 64] {
        <[u8; 64]>::from(sig.0)
    }
}
