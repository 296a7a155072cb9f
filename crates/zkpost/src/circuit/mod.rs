//! Semaphore-style membership circuit.
//!
//! The circuit proves, without revealing which leaf:
//!
//! 1. the prover knows `(nf_id, td)` and a key `pk` whose commitment
//!    $H(\mathsf{pk}_x \| \mathsf{pk}_y \| \mathsf{nf_{id}} \| \mathsf{td})$
//!    is a leaf under `root`;
//! 2. `pk` signed `extNf || signalHash`;
//! 3. `nullifierHash` $= H(\mathsf{extNf} \| \mathsf{nf_{id}} \|
//!    \text{pathBits})$.
//!
//! ## Public signals
//!
//! | Index | Signal               |
//! |-------|----------------------|
//! | 0     | `root`               |
//! | 1     | `nullifierHash`      |
//! | 2     | `signalHash`         |
//! | 3     | `externalNullifier`  |
//!
//! [`Circuit::calculate_witness`] is the out-of-circuit constraint check.
//! It rejects inputs in a fixed order: path lengths, path bits, curve
//! points, then the signature.

mod public;
mod witnesses;

use bitvec::{array::BitArray, order::Lsb0};
use ff::PrimeField as _;
use pasta_curves::Fp;
use serde::{Deserialize, Serialize};

pub use public::{PUBLIC_SIGNAL_COUNT, PublicSignals};
pub use witnesses::{Inputs, Witness};

use crate::{
    constants::{MAX_TREE_DEPTH, NULLIFIER_HASH_PERSONALIZATION},
    error::{ProofError, WitnessError},
    identity::Commitment,
    keys::{AuthSignature, AuthVerifyingKey, point_coordinates},
    merkle,
    primitives::hash_to_field,
    signal::Signals,
};

/// Compiled circuit descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCircuit")]
pub struct Circuit {
    name: String,
    depth: usize,
}

#[derive(Deserialize)]
struct RawCircuit {
    name: String,
    depth: usize,
}

impl TryFrom<RawCircuit> for Circuit {
    type Error = ProofError;

    fn try_from(raw: RawCircuit) -> Result<Self, Self::Error> {
        Self::new(raw.name, raw.depth)
    }
}

impl Circuit {
    /// Describe a circuit over a tree of `depth` levels.
    pub fn new(name: impl Into<String>, depth: usize) -> Result<Self, ProofError> {
        if depth == 0 || depth > MAX_TREE_DEPTH {
            return Err(ProofError::Prover(format!(
                "unsupported circuit depth {depth}"
            )));
        }
        Ok(Self {
            name: name.into(),
            depth,
        })
    }

    /// Circuit name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity tree depth the circuit is compiled for.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Check every constraint and derive the public signals.
    pub fn calculate_witness(&self, inputs: &Inputs) -> Result<Witness, WitnessError> {
        let elements = &inputs.identity_path_elements;
        let indices = &inputs.identity_path_index;
        if elements.len() != self.depth || indices.len() != self.depth {
            return Err(WitnessError::PathLength {
                elements: elements.len(),
                indices: indices.len(),
                depth: self.depth,
            });
        }
        if let Some(level) = indices.iter().position(|bit| *bit > 1) {
            return Err(WitnessError::PathIndex { level });
        }

        let (pk_x, pk_y) = point_coordinates(&inputs.identity_pk).ok_or(WitnessError::PublicKey)?;
        let (r_x, r_y) =
            point_coordinates(&inputs.auth_sig_r).ok_or(WitnessError::SignaturePoint)?;

        let signals = Signals {
            external_nullifier: inputs.external_nullifier,
            signal_hash: inputs.signal_hash,
        };
        let pk = AuthVerifyingKey::try_from(inputs.identity_pk)
            .map_err(|_err| WitnessError::PublicKey)?;
        pk.verify(
            &signals.auth_message(),
            &AuthSignature::from_parts(&inputs.auth_sig_r, &inputs.auth_sig_s),
        )
        .map_err(|_err| WitnessError::Signature)?;

        let leaf = Fp::from(Commitment::derive(
            (pk_x, pk_y),
            inputs.identity_nullifier,
            inputs.identity_trapdoor,
        ));
        let root = merkle::Path::new(elements.clone(), indices.clone()).root(leaf)?;

        let mut path_bits = BitArray::<[u8; 32], Lsb0>::ZERO;
        for (level, bit) in indices.iter().enumerate() {
            path_bits.set(level, *bit == 1);
        }
        let nullifier_hash = hash_to_field(
            NULLIFIER_HASH_PERSONALIZATION,
            &[
                &Fp::from(inputs.external_nullifier).to_repr(),
                &Fp::from(inputs.identity_nullifier).to_repr(),
                &path_bits.into_inner(),
            ],
        );

        let s = witnesses::scalar_to_base(&inputs.auth_sig_s);
        let mut assignments = vec![
            pk_x,
            pk_y,
            r_x,
            r_y,
            s,
            inputs.signal_hash.into(),
            inputs.external_nullifier.into(),
            inputs.identity_nullifier.into(),
            inputs.identity_trapdoor.into(),
        ];
        assignments.extend(elements.iter().copied());
        assignments.extend(indices.iter().map(|bit| Fp::from(u64::from(*bit))));
        assignments.extend([leaf, root.0, nullifier_hash]);

        Ok(Witness {
            assignments,
            leaf,
            public: PublicSignals::new(
                root,
                nullifier_hash,
                inputs.signal_hash,
                inputs.external_nullifier,
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use ff::Field as _;
    use rand::{SeedableRng as _, rngs::StdRng};

    use super::*;
    use crate::{
        identity::State,
        keys::IdentitySeed,
        merkle::Group,
        message::Digest,
    };

    const DEPTH: usize = 4;

    fn setup(rng: &mut StdRng) -> (State, Group, Inputs) {
        let seed = IdentitySeed::random(rng);
        let bare = State::from_seed(&seed, None);
        let mut group = Group::new(DEPTH);
        group.insert(Fp::from(11u64)).unwrap();
        let index = group.insert(bare.commitment.unwrap().into()).unwrap();
        group.insert(Fp::from(13u64)).unwrap();
        let state = State::from_seed(&seed, group.path(index));

        let signals = Signals::derive(&Digest::from([1u8; 32]));
        let keypair = state.keypair.unwrap();
        let sig = keypair.signing().sign(rng, &signals.auth_message());
        let path = state.path.clone().unwrap();
        let inputs = Inputs {
            identity_pk: (*keypair.verifying()).into(),
            auth_sig_r: sig.r_bytes(),
            auth_sig_s: sig.s_bytes(),
            signal_hash: signals.signal_hash,
            external_nullifier: signals.external_nullifier,
            identity_nullifier: state.nullifier.unwrap(),
            identity_trapdoor: state.trapdoor.unwrap(),
            identity_path_elements: path.elements().to_vec(),
            identity_path_index: path.indices().to_vec(),
        };
        (state, group, inputs)
    }

    /// Valid inputs reproduce the group root and the stored commitment.
    #[test]
    fn valid_witness() {
        let mut rng = StdRng::seed_from_u64(0);
        let (state, group, inputs) = setup(&mut rng);
        let circuit = Circuit::new("semaphore", DEPTH).unwrap();
        let witness = circuit.calculate_witness(&inputs).unwrap();
        assert_eq!(witness.public_signals().root(), group.root());
        assert_eq!(witness.leaf(), Fp::from(state.commitment.unwrap()));
        assert_eq!(
            witness.public_signals().external_nullifier(),
            inputs.external_nullifier
        );
    }

    /// Nullifier hash is fixed per identity and message, and moves with the
    /// message.
    #[test]
    fn nullifier_hash_scoped_to_message() {
        let mut rng = StdRng::seed_from_u64(1);
        let (state, _, inputs) = setup(&mut rng);
        let circuit = Circuit::new("semaphore", DEPTH).unwrap();
        let first = circuit.calculate_witness(&inputs).unwrap();

        let other = Signals::derive(&Digest::from([2u8; 32]));
        let sig = state
            .keypair
            .unwrap()
            .signing()
            .sign(&mut rng, &other.auth_message());
        let moved = Inputs {
            auth_sig_r: sig.r_bytes(),
            auth_sig_s: sig.s_bytes(),
            signal_hash: other.signal_hash,
            external_nullifier: other.external_nullifier,
            ..inputs.clone()
        };
        let second = circuit.calculate_witness(&moved).unwrap();
        assert_ne!(
            first.public_signals().nullifier_hash(),
            second.public_signals().nullifier_hash()
        );
        let again = circuit.calculate_witness(&inputs).unwrap();
        assert_eq!(
            first.public_signals().nullifier_hash(),
            again.public_signals().nullifier_hash()
        );
    }

    #[test]
    fn rejects_in_order() {
        let mut rng = StdRng::seed_from_u64(2);
        let (_, _, inputs) = setup(&mut rng);
        let circuit = Circuit::new("semaphore", DEPTH).unwrap();

        let mut short = inputs.clone();
        short.identity_path_index.pop();
        short.identity_pk = [0u8; 32];
        assert!(matches!(
            circuit.calculate_witness(&short),
            Err(WitnessError::PathLength { depth: DEPTH, .. })
        ));

        let mut bad_bit = inputs.clone();
        bad_bit.identity_path_index = vec![0, 1, 7, 0];
        bad_bit.identity_pk = [0u8; 32];
        assert_eq!(
            circuit.calculate_witness(&bad_bit).unwrap_err(),
            WitnessError::PathIndex { level: 2 }
        );

        let mut bad_pk = inputs.clone();
        bad_pk.identity_pk = [0u8; 32];
        assert_eq!(
            circuit.calculate_witness(&bad_pk).unwrap_err(),
            WitnessError::PublicKey
        );

        let mut bad_r = inputs.clone();
        bad_r.auth_sig_r = [0u8; 32];
        assert_eq!(
            circuit.calculate_witness(&bad_r).unwrap_err(),
            WitnessError::SignaturePoint
        );

        let mut forged = inputs;
        forged.signal_hash = (Fp::from(forged.signal_hash) + Fp::ONE).into();
        assert_eq!(
            circuit.calculate_witness(&forged).unwrap_err(),
            WitnessError::Signature
        );
    }

    #[test]
    fn depth_bounds() {
        assert!(Circuit::new("semaphore", 0).is_err());
        assert!(Circuit::new("semaphore", MAX_TREE_DEPTH + 1).is_err());
        let parsed: Circuit =
            serde_json::from_str(r#"{"name":"semaphore","depth":20}"#).unwrap();
        assert_eq!(parsed.depth(), 20);
        assert!(serde_json::from_str::<Circuit>(r#"{"name":"x","depth":99}"#).is_err());
    }
}
