//! Identity key material.
//!
//! ## Derivation tree
//!
//! ```mermaid
//! flowchart TB
//!     seed[IdentitySeed]
//!     ask[AuthSigningKey]
//!     nf[IdentityNullifier]
//!     td[IdentityTrapdoor]
//!     pk[AuthVerifyingKey]
//!     seed --> ask
//!     seed --> nf
//!     seed --> td
//!     ask --> pk
//! ```
//!
//! The signing key lives in $\mathbb{F}_q$ (RedPallas `SpendAuth`). The
//! nullifier and trapdoor live in $\mathbb{F}_p$ and are circuit inputs.

mod private;
mod public;
mod signature;

pub use private::{AuthSigningKey, IdentityNullifier, IdentitySeed, IdentityTrapdoor};
pub use public::AuthVerifyingKey;
pub use signature::AuthSignature;

pub(crate) use public::point_coordinates;
