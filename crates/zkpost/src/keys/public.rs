#![expect(
    clippy::field_scoped_visibility_modifiers,
    reason = "key relationships stay within the keys module"
)]

//! Public keys and curve point helpers.

use group::GroupEncoding as _;
use pasta_curves::{
    EpAffine, Fp,
    arithmetic::{Coordinates, CurveAffine as _},
};
use reddsa::orchard::SpendAuth;

use super::signature::AuthSignature;

/// `pk = [ask]G`. Its affine coordinates enter the identity commitment.
#[derive(Clone, Copy, Debug)]
pub struct AuthVerifyingKey(pub(super) reddsa::VerificationKey<SpendAuth>);

impl AuthVerifyingKey {
    /// Verify an authorization signature.
    pub fn verify(&self, msg: &[u8], sig: &AuthSignature) -> Result<(), reddsa::Error> {
        self.0.verify(msg, &sig.0)
    }

    /// Affine `(x, y)` of the key point.
    #[must_use]
    pub fn coordinates(&self) -> Option<(Fp, Fp)> {
        point_coordinates(&<[u8; 32]>::from(*self))
    }
}

impl From<AuthVerifyingKey> for [u8; 32] {
    fn from(pk: AuthVerifyingKey) -> Self {
        pk.0.into()
    }
}

impl TryFrom<[u8; 32]> for AuthVerifyingKey {
    type Error = reddsa::Error;

    fn try_from(bytes: [u8; 32]) -> Result<Self, Self::Error> {
        reddsa::VerificationKey::<SpendAuth>::try_from(bytes).map(Self)
    }
}

/// Decode a compressed Pallas point to affine coordinates.
///
/// `None` for invalid encodings and for the identity, which has no affine
/// form.
pub(crate) fn point_coordinates(bytes: &[u8; 32]) -> Option<(Fp, Fp)> {
    let point: EpAffine = Option::from(EpAffine::from_bytes(bytes))?;
    let coordinates: Coordinates<EpAffine> = Option::from(point.coordinates())?;
    Some((*coordinates.x(), *coordinates.y()))
}
