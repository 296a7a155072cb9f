mod field;

pub(crate) use field::{decode_hex, encode_hex, fp_hex, hash_to_field};
pub use pasta_curves::Fp;
