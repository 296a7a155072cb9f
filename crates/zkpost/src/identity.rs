//! Anonymous identity state and the per-call session context.
//!
//! [`State`] is replaced wholesale on login and logout and only ever read
//! while publishing. Callers hand it to the coordinator inside a
//! [`Session`] snapshot rather than through ambient global state.

use alloc::sync::Arc;
use core::fmt;

use ff::PrimeField as _;
use pasta_curves::Fp;

use crate::{
    constants::COMMITMENT_PERSONALIZATION,
    error::{ProofError, WitnessError},
    keys::{AuthSigningKey, AuthVerifyingKey, IdentityNullifier, IdentitySeed, IdentityTrapdoor},
    merkle,
    primitives::hash_to_field,
};

/// Identity commitment: the public leaf of the identity tree.
///
/// $$\mathsf{cm} = H(\mathsf{pk}_x \| \mathsf{pk}_y \| \mathsf{nf_{id}} \|
///   \mathsf{td})$$
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Commitment(Fp);

impl Commitment {
    /// Commit to a public key point and the two identity secrets.
    #[must_use]
    pub fn derive(
        pk: (Fp, Fp),
        nullifier: IdentityNullifier,
        trapdoor: IdentityTrapdoor,
    ) -> Self {
        let (x, y) = pk;
        Self(hash_to_field(
            COMMITMENT_PERSONALIZATION,
            &[
                &x.to_repr(),
                &y.to_repr(),
                &Fp::from(nullifier).to_repr(),
                &Fp::from(trapdoor).to_repr(),
            ],
        ))
    }
}

impl From<Fp> for Commitment {
    fn from(fp: Fp) -> Self {
        Self(fp)
    }
}

impl From<Commitment> for Fp {
    fn from(cm: Commitment) -> Self {
        cm.0
    }
}

/// Signing keypair used inside the proof circuit.
#[derive(Clone, Copy, Debug)]
pub struct Keypair {
    signing: AuthSigningKey,
    verifying: AuthVerifyingKey,
}

impl Keypair {
    /// Pair a signing key with its verifying key.
    #[must_use]
    pub fn new(signing: AuthSigningKey) -> Self {
        Self {
            verifying: signing.verifying_key(),
            signing,
        }
    }

    /// Signing half.
    #[must_use]
    pub const fn signing(&self) -> &AuthSigningKey {
        &self.signing
    }

    /// Verifying half.
    #[must_use]
    pub const fn verifying(&self) -> &AuthVerifyingKey {
        &self.verifying
    }
}

/// One of the five fields a complete identity needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    /// [`State::commitment`]
    Commitment,
    /// [`State::nullifier`]
    Nullifier,
    /// [`State::trapdoor`]
    Trapdoor,
    /// [`State::path`]
    MerklePath,
    /// [`State::keypair`]
    Keypair,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Commitment => "commitment",
            Self::Nullifier => "identity nullifier",
            Self::Trapdoor => "identity trapdoor",
            Self::MerklePath => "merkle path",
            Self::Keypair => "keypair",
        })
    }
}

/// Anonymous identity material. Any field may be missing.
#[derive(Clone, Debug, Default)]
pub struct State {
    /// Public leaf value.
    pub commitment: Option<Commitment>,
    /// Identity nullifier secret.
    pub nullifier: Option<IdentityNullifier>,
    /// Identity trapdoor secret.
    pub trapdoor: Option<IdentityTrapdoor>,
    /// Membership path of `commitment` in the current identity tree.
    pub path: Option<merkle::Path>,
    /// Circuit signing keypair.
    pub keypair: Option<Keypair>,
}

/// Borrowed view of a [`State`] with every field present.
#[derive(Clone, Copy, Debug)]
pub struct Complete<'state> {
    /// Public leaf value.
    pub commitment: Commitment,
    /// Identity nullifier secret.
    pub nullifier: IdentityNullifier,
    /// Identity trapdoor secret.
    pub trapdoor: IdentityTrapdoor,
    /// Membership path.
    pub path: &'state merkle::Path,
    /// Circuit signing keypair.
    pub keypair: &'state Keypair,
}

impl State {
    /// Derive every secret from a seed. The path is supplied by whoever
    /// tracks the identity tree; without it the state stays incomplete.
    #[must_use]
    pub fn from_seed(seed: &IdentitySeed, path: Option<merkle::Path>) -> Self {
        let keypair = Keypair::new(seed.auth_signing_key());
        let nullifier = seed.identity_nullifier();
        let trapdoor = seed.identity_trapdoor();
        let commitment = keypair
            .verifying()
            .coordinates()
            .map(|pk| Commitment::derive(pk, nullifier, trapdoor));
        Self {
            commitment,
            nullifier: Some(nullifier),
            trapdoor: Some(trapdoor),
            path,
            keypair: Some(keypair),
        }
    }

    /// Whether the anonymous path is available at all.
    #[must_use]
    pub const fn has_keypair(&self) -> bool {
        self.keypair.is_some()
    }

    /// All five fields, or the first one missing.
    pub fn require_complete(&self) -> Result<Complete<'_>, ProofError> {
        let missing = ProofError::IdentityIncomplete;
        Ok(Complete {
            commitment: self.commitment.ok_or(missing(Field::Commitment))?,
            nullifier: self.nullifier.ok_or(missing(Field::Nullifier))?,
            trapdoor: self.trapdoor.ok_or(missing(Field::Trapdoor))?,
            path: self.path.as_ref().ok_or(missing(Field::MerklePath))?,
            keypair: self.keypair.as_ref().ok_or(missing(Field::Keypair))?,
        })
    }
}

impl Complete<'_> {
    /// Recompute the commitment from the keypair and secrets.
    pub fn recompute_commitment(&self) -> Result<Commitment, WitnessError> {
        let pk = self
            .keypair
            .verifying()
            .coordinates()
            .ok_or(WitnessError::PublicKey)?;
        Ok(Commitment::derive(pk, self.nullifier, self.trapdoor))
    }
}

/// Context for one publishing call.
#[derive(Clone, Debug, Default)]
pub struct Session {
    creator: Option<String>,
    identity: Option<Arc<State>>,
}

impl Session {
    /// Nobody logged in.
    #[must_use]
    pub fn logged_out() -> Self {
        Self::default()
    }

    /// Identity-linked session for `creator`.
    #[must_use]
    pub fn linked(creator: impl Into<String>) -> Self {
        Self {
            creator: Some(creator.into()).filter(|handle| !handle.is_empty()),
            identity: None,
        }
    }

    /// Attach an anonymous identity snapshot.
    #[must_use]
    pub fn with_identity(self, identity: Arc<State>) -> Self {
        Self {
            identity: Some(identity),
            ..self
        }
    }

    /// Identity-linked handle, if any.
    #[must_use]
    pub fn creator(&self) -> Option<&str> {
        self.creator.as_deref()
    }

    /// Anonymous identity snapshot, if any.
    #[must_use]
    pub fn identity(&self) -> Option<&Arc<State>> {
        self.identity.as_ref()
    }

    /// Whether an anonymous keypair is present.
    #[must_use]
    pub fn is_anonymous_capable(&self) -> bool {
        self.identity.as_deref().is_some_and(State::has_keypair)
    }
}
