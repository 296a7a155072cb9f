//! Private identity material. None of it prints in `Debug` output.

use core::fmt;

use ff::{FromUniformBytes as _, PrimeField as _};
use pasta_curves::{Fp, Fq};
use rand::{CryptoRng, RngCore};
use reddsa::orchard::SpendAuth;

use super::{public::AuthVerifyingKey, signature::AuthSignature};
use crate::constants::PrfExpand;

/// Root of an anonymous identity: 32 bytes of entropy.
///
/// Derives the signing key, the identity nullifier and the identity
/// trapdoor through `PRF^expand` with one domain byte per child.
#[derive(Clone, Copy)]
pub struct IdentitySeed([u8; 32]);

impl IdentitySeed {
    /// Sample a fresh seed.
    pub fn random(rng: &mut (impl RngCore + CryptoRng)) -> Self {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// `ask = ToScalar(PRF^expand_seed([0x00]))`
    #[must_use]
    pub fn auth_signing_key(&self) -> AuthSigningKey {
        let ask = Fq::from_uniform_bytes(&PrfExpand::AUTH.with(&self.0));
        #[expect(clippy::expect_used, reason = "canonical scalar repr always decodes")]
        let sk = reddsa::SigningKey::<SpendAuth>::try_from(ask.to_repr())
            .expect("reduced scalar is a valid signing key");
        AuthSigningKey(sk)
    }

    /// `nf_id = ToBase(PRF^expand_seed([0x01]))`
    #[must_use]
    pub fn identity_nullifier(&self) -> IdentityNullifier {
        IdentityNullifier(Fp::from_uniform_bytes(&PrfExpand::NULLIFIER.with(&self.0)))
    }

    /// `td = ToBase(PRF^expand_seed([0x02]))`
    #[must_use]
    pub fn identity_trapdoor(&self) -> IdentityTrapdoor {
        IdentityTrapdoor(Fp::from_uniform_bytes(&PrfExpand::TRAPDOOR.with(&self.0)))
    }
}

impl From<[u8; 32]> for IdentitySeed {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for IdentitySeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IdentitySeed(..)")
    }
}

/// RedPallas signing key that authorizes `(externalNullifier, signalHash)`
/// inside the circuit.
#[derive(Clone, Copy)]
pub struct AuthSigningKey(reddsa::SigningKey<SpendAuth>);

impl AuthSigningKey {
    /// `pk = [ask]G`
    #[must_use]
    pub fn verifying_key(&self) -> AuthVerifyingKey {
        AuthVerifyingKey(reddsa::VerificationKey::from(&self.0))
    }

    /// Sign `msg`.
    pub fn sign(&self, rng: &mut (impl RngCore + CryptoRng), msg: &[u8]) -> AuthSignature {
        AuthSignature(self.0.sign(rng, msg))
    }
}

impl fmt::Debug for AuthSigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthSigningKey(..)")
    }
}

/// Identity nullifier secret. Only ever leaves the device hashed.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct IdentityNullifier(Fp);

/// Identity trapdoor secret. Blinds the commitment.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct IdentityTrapdoor(Fp);

impl From<Fp> for IdentityNullifier {
    fn from(fp: Fp) -> Self {
        Self(fp)
    }
}

impl From<IdentityNullifier> for Fp {
    fn from(nf: IdentityNullifier) -> Self {
        nf.0
    }
}

impl From<Fp> for IdentityTrapdoor {
    fn from(fp: Fp) -> Self {
        Self(fp)
    }
}

impl From<IdentityTrapdoor> for Fp {
    fn from(td: IdentityTrapdoor) -> Self {
        td.0
    }
}

impl fmt::Debug for IdentityNullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IdentityNullifier(..)")
    }
}

impl fmt::Debug for IdentityTrapdoor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IdentityTrapdoor(..)")
    }
}
