use ff::{FromUniformBytes as _, PrimeField as _};
use pasta_curves::Fp;

/// Hash arbitrary byte strings into $\mathbb{F}_p$.
///
/// $$\text{ToBase}(\text{BLAKE2b-512}(\text{personal},\; p_1 \| \ldots \| p_n))$$
///
/// Parts are concatenated without framing; callers only pass fixed-width
/// inputs (field reprs, 32-byte digests).
pub(crate) fn hash_to_field(personal: &[u8; 16], parts: &[&[u8]]) -> Fp {
    let mut state = blake2b_simd::Params::new()
        .hash_length(64)
        .personal(personal)
        .to_state();
    for part in parts {
        state.update(part);
    }
    Fp::from_uniform_bytes(state.finalize().as_array())
}

/// Lowercase hex of the 32-byte little-endian canonical repr.
pub(crate) fn encode_hex(fp: &Fp) -> String {
    hex::encode(fp.to_repr())
}

/// Inverse of [`encode_hex`]. Rejects wrong lengths and non-canonical reprs.
pub(crate) fn decode_hex(encoded: &str) -> Option<Fp> {
    let bytes = hex::decode(encoded).ok()?;
    let repr = <[u8; 32]>::try_from(bytes.as_slice()).ok()?;
    Option::from(Fp::from_repr(repr))
}

pub(crate) mod fp_hex {
    use pasta_curves::Fp;
    use serde::{Deserialize as _, Deserializer, Serializer};

    pub(crate) fn serialize<S: Serializer>(fp: &Fp, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::encode_hex(fp))
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Fp, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        super::decode_hex(&encoded)
            .ok_or_else(|| serde::de::Error::custom("invalid field element"))
    }
}
