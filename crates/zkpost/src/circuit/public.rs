use pasta_curves::Fp;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};

use crate::{
    merkle::Root,
    primitives::{decode_hex, encode_hex},
    signal::{ExternalNullifier, SignalHash},
};

/// Number of public signals the circuit exposes.
pub const PUBLIC_SIGNAL_COUNT: usize = 4;

/// Public outputs of the membership circuit, in circuit order:
/// `[root, nullifierHash, signalHash, externalNullifier]`.
///
/// Serializes as a JSON array of hex field elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicSignals([Fp; PUBLIC_SIGNAL_COUNT]);

impl PublicSignals {
    /// Assemble in circuit order.
    #[must_use]
    pub fn new(
        root: Root,
        nullifier_hash: Fp,
        signal_hash: SignalHash,
        external_nullifier: ExternalNullifier,
    ) -> Self {
        Self([
            root.0,
            nullifier_hash,
            signal_hash.into(),
            external_nullifier.into(),
        ])
    }

    /// Identity tree root at proof time.
    #[must_use]
    pub const fn root(&self) -> Root {
        let [root, _, _, _] = self.0;
        Root(root)
    }

    /// `H(extNf, nf_id, pathBits)`; the relay tracks it per message.
    #[must_use]
    pub const fn nullifier_hash(&self) -> Fp {
        let [_, nullifier_hash, _, _] = self.0;
        nullifier_hash
    }

    /// Signal hash of the published message.
    #[must_use]
    pub fn signal_hash(&self) -> SignalHash {
        let [_, _, signal_hash, _] = self.0;
        SignalHash::from(signal_hash)
    }

    /// External nullifier of the published message.
    #[must_use]
    pub fn external_nullifier(&self) -> ExternalNullifier {
        let [_, _, _, external_nullifier] = self.0;
        ExternalNullifier::from(external_nullifier)
    }

    /// Signals as field elements, for the proving backend.
    #[must_use]
    pub const fn as_slice(&self) -> &[Fp] {
        &self.0
    }
}

impl Serialize for PublicSignals {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().map(encode_hex))
    }
}

#[expect(clippy::missing_trait_methods, reason = "serde default is sufficient")]
impl<'de> Deserialize<'de> for PublicSignals {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = Vec::<String>::deserialize(deserializer)?;
        let decoded = encoded
            .iter()
            .map(|signal| decode_hex(signal).ok_or_else(|| D::Error::custom("invalid field element")))
            .collect::<Result<Vec<_>, _>>()?;
        let signals = <[Fp; PUBLIC_SIGNAL_COUNT]>::try_from(decoded)
            .map_err(|found| D::Error::invalid_length(found.len(), &"4 public signals"))?;
        Ok(Self(signals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// JSON form is an array of four hex strings, in circuit order.
    #[test]
    fn json_shape() {
        let signals = PublicSignals::new(
            Root(Fp::from(1u64)),
            Fp::from(2u64),
            SignalHash::from(Fp::from(3u64)),
            ExternalNullifier::from(Fp::from(4u64)),
        );
        let value = serde_json::to_value(signals).unwrap();
        let array = value.as_array().unwrap();
        assert_eq!(array.len(), PUBLIC_SIGNAL_COUNT);
        assert_eq!(array.first().unwrap(), &format!("01{}", "00".repeat(31)));
        assert_eq!(serde_json::from_value::<PublicSignals>(value).unwrap(), signals);
    }

    #[test]
    fn wrong_length_rejected() {
        let three = serde_json::json!(["00".repeat(32), "00".repeat(32), "00".repeat(32)]);
        assert!(serde_json::from_value::<PublicSignals>(three).is_err());
    }
}
