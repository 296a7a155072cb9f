//! Error taxonomy for the publishing pipeline.
//!
//! Each stage has its own enum. [`SubmitError`] is what the coordinator
//! hands back to callers and wraps the stage errors verbatim.

use thiserror::Error;

use crate::{identity::Field, message};

/// A message could not be constructed, parsed or routed.
///
/// Always raised before any network or proof work begins.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The subtype tag is not defined for the message kind.
    #[error("subtype {subtype:?} is not valid for {kind}")]
    UnknownSubtype {
        /// Kind the subtype was parsed against.
        kind: message::Kind,
        /// Offending wire tag.
        subtype: String,
    },

    /// Subtype and payload belong to different kinds.
    #[error("{subtype} message cannot carry a {payload} payload")]
    PayloadMismatch {
        /// Kind implied by the subtype.
        subtype: message::Kind,
        /// Kind implied by the payload.
        payload: message::Kind,
    },

    /// The subtype points at another message but no reference was given.
    #[error("{0} message requires a reference")]
    MissingReference(message::Subtype),

    /// The subtype carries user text but the content is empty.
    #[error("{0} message requires content")]
    EmptyContent(message::Subtype),

    /// The payload object does not decode for its kind.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// A message id is neither `hash` nor `creator/hash`.
    #[error("malformed message id: {0:?}")]
    MalformedMessageId(String),

    /// A message id names a different digest than its body hashes to.
    #[error("message id {0:?} does not match its content digest")]
    DigestMismatch(String),

    /// The identity-linked path was chosen without a creator handle.
    #[error("identity-linked publish requires a creator")]
    MissingCreator,
}

/// Circuit inputs violate a circuit constraint.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WitnessError {
    /// A Merkle path sequence does not match the circuit depth.
    #[error("merkle path has {elements} elements and {indices} indices, circuit depth is {depth}")]
    PathLength {
        /// Number of sibling hashes.
        elements: usize,
        /// Number of direction bits.
        indices: usize,
        /// Depth the circuit was compiled for.
        depth: usize,
    },

    /// A path index is neither 0 nor 1.
    #[error("path index at level {level} is not a bit")]
    PathIndex {
        /// Tree level of the offending index.
        level: usize,
    },

    /// The identity public key is not a valid curve point.
    #[error("identity public key is not a curve point")]
    PublicKey,

    /// The signature's R component is not a valid curve point.
    #[error("signature R is not a curve point")]
    SignaturePoint,

    /// The authorization signature does not verify.
    #[error("authorization signature does not verify")]
    Signature,

    /// The recomputed leaf differs from the stored identity commitment.
    #[error("identity commitment does not match its secrets")]
    CommitmentMismatch,
}

/// The proof pipeline failed. Terminal for the submission attempt.
#[derive(Debug, Error)]
pub enum ProofError {
    /// Anonymous path attempted without the full identity material.
    #[error("identity incomplete: missing {0}")]
    IdentityIncomplete(Field),

    /// The witness could not be assembled.
    #[error("witness: {0}")]
    Witness(#[from] WitnessError),

    /// The prover or its artifacts failed.
    #[error("prover: {0}")]
    Prover(String),
}

/// A relay, store or indexer call failed.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The request could not be sent or the body could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered outside 2xx.
    #[error("server returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        message: String,
    },

    /// A response body did not decode.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Different content already lives under a content address.
    #[error("conflicting content stored at {0}")]
    Conflict(String),

    /// The collaborator is not configured or not reachable.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

/// Why a submission ended in the failed state.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Message construction or routing was rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The proof pipeline failed.
    #[error(transparent)]
    Proof(#[from] ProofError),

    /// The relay or store rejected the write or was unreachable.
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Another submission for the same reference is still running.
    #[error("a submission for reference {0:?} is already in flight")]
    InFlight(String),
}

impl From<WitnessError> for SubmitError {
    fn from(err: WitnessError) -> Self {
        Self::Proof(ProofError::Witness(err))
    }
}
