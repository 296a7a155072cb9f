//! # mock_snark
//!
//! A BLAKE2b mock of a Groth16-style SNARK backend.
//!
//! The mock keeps the *shape* of a pairing-based proof system so that
//! callers can be written against it and later pointed at a real backend:
//!
//! - a [`ProvingKey`] is derived from opaque key material and yields a
//!   [`VerifyingKey`];
//! - [`prove`] consumes public inputs and a private witness (both vectors of
//!   Pallas base field elements) and returns a fixed-size [`Proof`];
//! - [`verify`] checks a proof against the verifying key and the public
//!   inputs alone.
//!
//! ## Proof layout
//!
//! | Bytes     | Contents |
//! | --------- | -------- |
//! | `0..64`   | statement digest: `BLAKE2b-512(key_id, public_inputs)` |
//! | `64..128` | blinded witness digest |
//! | `128..192`| seal binding the two halves |
//!
//! This is **not** zero knowledge and **not** sound: anyone holding the key
//! id can forge a proof. It exists so the publishing pipeline can be
//! exercised end to end without proving-key artifacts.

#![cfg_attr(not(feature = "std"), no_std)]

use core::fmt;

use ff::PrimeField as _;
use pasta_curves::Fp;
use rand_core::{CryptoRng, RngCore};

const KEY_PERSONALIZATION: &[u8; 16] = b"MockSnark_KeyId_";
const STATEMENT_PERSONALIZATION: &[u8; 16] = b"MockSnark_Stmt__";
const WITNESS_PERSONALIZATION: &[u8; 16] = b"MockSnark_Wtns__";
const SEAL_PERSONALIZATION: &[u8; 16] = b"MockSnark_Seal__";

/// Size in bytes of a serialized [`Proof`].
pub const PROOF_SIZE: usize = 192;

/// Failures reported by the mock backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnarkError {
    /// Key material was empty.
    EmptyKey,
    /// A proof was requested over zero public inputs.
    EmptyStatement,
    /// The proof bytes do not verify against the statement.
    Rejected,
}

impl fmt::Display for SnarkError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::EmptyKey => formatter.write_str("empty proving key material"),
            Self::EmptyStatement => formatter.write_str("no public inputs"),
            Self::Rejected => formatter.write_str("proof rejected"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SnarkError {}

/// A proving key, identified by the digest of its key material.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProvingKey {
    id: [u8; 32],
}

impl ProvingKey {
    /// Derive a proving key from opaque key material (e.g. a downloaded
    /// `.zkey` blob).
    pub fn from_bytes(material: &[u8]) -> Result<Self, SnarkError> {
        if material.is_empty() {
            return Err(SnarkError::EmptyKey);
        }
        let hash = blake2b_simd::Params::new()
            .hash_length(32)
            .personal(KEY_PERSONALIZATION)
            .hash(material);
        let mut id = [0u8; 32];
        id.copy_from_slice(hash.as_bytes());
        Ok(Self { id })
    }

    /// Sample a fresh key. Test helper.
    pub fn random(rng: &mut (impl RngCore + CryptoRng)) -> Self {
        let mut id = [0u8; 32];
        rng.fill_bytes(&mut id);
        Self { id }
    }

    /// The matching verifying key.
    #[must_use]
    pub const fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey { id: self.id }
    }
}

/// A verifying key. Carries the same identifier as its [`ProvingKey`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VerifyingKey {
    id: [u8; 32],
}

/// A mock proof.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Proof([u8; PROOF_SIZE]);

impl From<[u8; PROOF_SIZE]> for Proof {
    fn from(bytes: [u8; PROOF_SIZE]) -> Self {
        Self(bytes)
    }
}

impl From<Proof> for [u8; PROOF_SIZE] {
    fn from(proof: Proof) -> Self {
        proof.0
    }
}

impl TryFrom<&[u8]> for Proof {
    type Error = SnarkError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        <[u8; PROOF_SIZE]>::try_from(bytes)
            .map(Self)
            .map_err(|_len| SnarkError::Rejected)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Proof {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Proof {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BytesVisitor;

        impl serde::de::Visitor<'_> for BytesVisitor {
            type Value = Proof;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("192 proof bytes")
            }

            fn visit_bytes<E: serde::de::Error>(self, bytes: &[u8]) -> Result<Proof, E> {
                Proof::try_from(bytes).map_err(E::custom)
            }
        }

        deserializer.deserialize_bytes(BytesVisitor)
    }
}

fn length_prefix(len: usize) -> [u8; 8] {
    u64::try_from(len).unwrap_or(u64::MAX).to_le_bytes()
}

fn statement_digest(key_id: &[u8; 32], public_inputs: &[Fp]) -> [u8; 64] {
    let mut state = blake2b_simd::Params::new()
        .hash_length(64)
        .personal(STATEMENT_PERSONALIZATION)
        .to_state();
    state.update(key_id);
    state.update(&length_prefix(public_inputs.len()));
    for input in public_inputs {
        state.update(&input.to_repr());
    }
    *state.finalize().as_array()
}

fn seal(statement: &[u8; 64], witness: &[u8; 64]) -> [u8; 64] {
    *blake2b_simd::Params::new()
        .hash_length(64)
        .personal(SEAL_PERSONALIZATION)
        .to_state()
        .update(statement)
        .update(witness)
        .finalize()
        .as_array()
}

/// Produce a proof that `witness` satisfies the statement `public_inputs`
/// under `key`.
///
/// The witness digest is blinded with fresh randomness, so two proofs of the
/// same statement differ byte-for-byte (as real Groth16 proofs do).
pub fn prove(
    key: &ProvingKey,
    public_inputs: &[Fp],
    witness: &[Fp],
    rng: &mut (impl RngCore + CryptoRng),
) -> Result<Proof, SnarkError> {
    if public_inputs.is_empty() {
        return Err(SnarkError::EmptyStatement);
    }

    let statement = statement_digest(&key.id, public_inputs);

    let mut blind = [0u8; 32];
    rng.fill_bytes(&mut blind);
    let mut state = blake2b_simd::Params::new()
        .hash_length(64)
        .personal(WITNESS_PERSONALIZATION)
        .to_state();
    state.update(&blind);
    state.update(&length_prefix(witness.len()));
    for assignment in witness {
        state.update(&assignment.to_repr());
    }
    let witness_digest = *state.finalize().as_array();

    let mut bytes = [0u8; PROOF_SIZE];
    let (head, sealed) = bytes.split_at_mut(128);
    let (statement_part, witness_part) = head.split_at_mut(64);
    statement_part.copy_from_slice(&statement);
    witness_part.copy_from_slice(&witness_digest);
    sealed.copy_from_slice(&seal(&statement, &witness_digest));
    Ok(Proof(bytes))
}

/// Verify `proof` against `public_inputs`.
pub fn verify(key: &VerifyingKey, public_inputs: &[Fp], proof: &Proof) -> Result<(), SnarkError> {
    let (statement, rest) = proof
        .0
        .split_first_chunk::<64>()
        .ok_or(SnarkError::Rejected)?;
    let (witness_digest, sealed) = rest
        .split_first_chunk::<64>()
        .ok_or(SnarkError::Rejected)?;

    if *statement != statement_digest(&key.id, public_inputs) {
        return Err(SnarkError::Rejected);
    }
    if sealed != seal(statement, witness_digest).as_slice() {
        return Err(SnarkError::Rejected);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use ff::Field as _;
    use rand::{SeedableRng as _, rngs::StdRng};

    use super::*;

    fn statement() -> [Fp; 3] {
        [Fp::ONE, Fp::from(7u64), Fp::from(42u64)]
    }

    /// An honestly produced proof verifies against its own statement.
    #[test]
    fn prove_then_verify() {
        let mut rng = StdRng::seed_from_u64(0);
        let pk = ProvingKey::random(&mut rng);
        let proof = prove(&pk, &statement(), &[Fp::ZERO, Fp::ONE], &mut rng).unwrap();

        verify(&pk.verifying_key(), &statement(), &proof).unwrap();
    }

    /// Changing any public input invalidates the proof.
    #[test]
    fn tampered_statement_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let pk = ProvingKey::random(&mut rng);
        let proof = prove(&pk, &statement(), &[Fp::ONE], &mut rng).unwrap();

        let mut tampered = statement();
        tampered[2] = Fp::from(43u64);
        assert_eq!(
            verify(&pk.verifying_key(), &tampered, &proof),
            Err(SnarkError::Rejected)
        );
    }

    /// A proof made under one key does not verify under another.
    #[test]
    fn wrong_key_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let pk = ProvingKey::random(&mut rng);
        let other = ProvingKey::random(&mut rng);
        let proof = prove(&pk, &statement(), &[], &mut rng).unwrap();

        assert!(verify(&other.verifying_key(), &statement(), &proof).is_err());
    }

    /// Flipping a byte of the witness half breaks the seal.
    #[test]
    fn broken_seal_rejected() {
        let mut rng = StdRng::seed_from_u64(2);
        let pk = ProvingKey::random(&mut rng);
        let mut bytes: [u8; PROOF_SIZE] = prove(&pk, &statement(), &[Fp::ONE], &mut rng)
            .unwrap()
            .into();
        bytes[100] ^= 0x01;

        assert!(verify(&pk.verifying_key(), &statement(), &Proof::from(bytes)).is_err());
    }

    /// Key identity depends only on key material.
    #[test]
    fn key_from_material_is_deterministic() {
        assert_eq!(
            ProvingKey::from_bytes(b"semaphore.zkey").unwrap(),
            ProvingKey::from_bytes(b"semaphore.zkey").unwrap()
        );
        assert_ne!(
            ProvingKey::from_bytes(b"semaphore.zkey").unwrap(),
            ProvingKey::from_bytes(b"other.zkey").unwrap()
        );
        assert_eq!(ProvingKey::from_bytes(b""), Err(SnarkError::EmptyKey));
    }

    /// Proofs over an empty statement are refused.
    #[test]
    fn empty_statement_refused() {
        let mut rng = StdRng::seed_from_u64(3);
        let pk = ProvingKey::random(&mut rng);
        assert_eq!(
            prove(&pk, &[], &[Fp::ONE], &mut rng),
            Err(SnarkError::EmptyStatement)
        );
    }
}
