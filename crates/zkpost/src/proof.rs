//! Proof building.
//!
//! ## Pipeline
//!
//! 1. Check the identity is complete, before touching anything else
//! 2. Sign `extNf || signalHash` with the identity keypair
//! 3. Assemble [`Inputs`] and run [`Circuit::calculate_witness`]
//! 4. Check the recomputed leaf against the stored commitment
//! 5. Hand the witness to a [`Prover`]
//!
//! Building never mutates the identity and never retries. Any failure is
//! terminal for the attempt.

use core::fmt;

use pasta_curves::Fp;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    circuit::{Circuit, Inputs, PublicSignals, Witness},
    error::{ProofError, WitnessError},
    identity,
    signal::Signals,
};

/// Opaque proving key material, as fetched from the artifact host.
#[derive(Clone, PartialEq, Eq)]
pub struct ProvingKey(Vec<u8>);

impl ProvingKey {
    /// Raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for ProvingKey {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for ProvingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProvingKey({} bytes)", self.0.len())
    }
}

/// Serialized succinct proof. Hex on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proof(Vec<u8>);

impl Proof {
    /// Raw proof bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Proof {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl Serialize for Proof {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(&self.0))
    }
}

#[expect(clippy::missing_trait_methods, reason = "serde default is sufficient")]
impl<'de> Deserialize<'de> for Proof {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        hex::decode(encoded)
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

/// A proof together with the public signals it attests to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    /// Succinct proof.
    pub proof: Proof,
    /// `[root, nullifierHash, signalHash, externalNullifier]`
    pub public_signals: PublicSignals,
}

/// Proving backend.
///
/// Proving is CPU-bound; async callers run it on the blocking pool.
pub trait Prover: Send + Sync {
    /// Prove that `witness` satisfies the circuit under `key`.
    fn prove(&self, witness: &Witness, key: &ProvingKey) -> Result<Proof, ProofError>;

    /// Check a bundle against the verifying half of `key`.
    fn verify(&self, bundle: &Bundle, key: &ProvingKey) -> Result<(), ProofError>;
}

/// [`Prover`] over the `mock_snark` backend.
#[derive(Clone, Copy, Debug, Default)]
pub struct MockProver;

impl MockProver {
    fn key(key: &ProvingKey) -> Result<mock_snark::ProvingKey, ProofError> {
        mock_snark::ProvingKey::from_bytes(key.as_bytes())
            .map_err(|err| ProofError::Prover(err.to_string()))
    }
}

impl Prover for MockProver {
    fn prove(&self, witness: &Witness, key: &ProvingKey) -> Result<Proof, ProofError> {
        let proof = mock_snark::prove(
            &Self::key(key)?,
            witness.public_signals().as_slice(),
            witness.assignments(),
            &mut rand::thread_rng(),
        )
        .map_err(|err| ProofError::Prover(err.to_string()))?;
        Ok(Proof(<[u8; mock_snark::PROOF_SIZE]>::from(proof).to_vec()))
    }

    fn verify(&self, bundle: &Bundle, key: &ProvingKey) -> Result<(), ProofError> {
        let proof = mock_snark::Proof::try_from(bundle.proof.as_bytes())
            .map_err(|err| ProofError::Prover(err.to_string()))?;
        mock_snark::verify(
            &Self::key(key)?.verifying_key(),
            bundle.public_signals.as_slice(),
            &proof,
        )
        .map_err(|err| ProofError::Prover(err.to_string()))
    }
}

/// Build a membership proof for one message.
pub fn build_proof<P: Prover + ?Sized>(
    identity: &identity::State,
    signals: &Signals,
    circuit: &Circuit,
    key: &ProvingKey,
    prover: &P,
    rng: &mut (impl RngCore + CryptoRng),
) -> Result<Bundle, ProofError> {
    let complete = identity.require_complete()?;

    let signature = complete
        .keypair
        .signing()
        .sign(rng, &signals.auth_message());
    let inputs = Inputs {
        identity_pk: (*complete.keypair.verifying()).into(),
        auth_sig_r: signature.r_bytes(),
        auth_sig_s: signature.s_bytes(),
        signal_hash: signals.signal_hash,
        external_nullifier: signals.external_nullifier,
        identity_nullifier: complete.nullifier,
        identity_trapdoor: complete.trapdoor,
        identity_path_elements: complete.path.elements().to_vec(),
        identity_path_index: complete.path.indices().to_vec(),
    };
    let witness = circuit.calculate_witness(&inputs)?;
    if witness.leaf() != Fp::from(complete.commitment) {
        return Err(WitnessError::CommitmentMismatch.into());
    }

    let proof = prover.prove(&witness, key)?;
    Ok(Bundle {
        proof,
        public_signals: *witness.public_signals(),
    })
}
