//! # zkpost
//!
//! Content-addressed social messages with anonymous, proof-gated publishing.
//!
//! Every message has a canonical digest over its storage form. That digest is
//! both its content address and the seed of the values an anonymous proof
//! binds to:
//!
//! - **Identity-linked** messages are written under the creator's namespace
//!   at `<creator>/message/<hash>`.
//! - **Anonymous** messages go to a relay with a membership proof showing
//!   the author holds a committed identity in the group tree, without saying
//!   which one. The relay rejects a second proof with the same nullifier
//!   hash for the same message.
//!
//! ## Message forms
//!
//! A [`Message`] moves between three representations:
//!
//! - [`Stored`](message::Stored): the storage form, hashed for the digest
//! - [`Canonical`](message::Canonical): storage form plus `messageId` and
//!   `hash`, as returned by the indexer
//! - [`Message`]: the in-memory form with an optional creator
//!
//! ## Publishing
//!
//! [`Publisher`] owns the per-reference draft state machine and picks the
//! path for each submission. [`Feed`](feed::Feed) reads posts and
//! engagement counters back from the indexer into a shared
//! [`MessageCache`](feed::MessageCache).
//!
//! ## Proving
//!
//! The circuit is a Semaphore-style membership statement over Pallas. The
//! witness calculator lives in [`circuit`]; the SNARK itself is behind the
//! [`Prover`](proof::Prover) trait.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::pub_use, reason = "exporting items for consumers")]

extern crate alloc;

pub mod artifact;
pub mod circuit;
pub mod config;
pub mod constants;
pub mod drafts;
pub mod error;
pub mod feed;
pub mod identity;
pub mod keys;
pub mod merkle;
pub mod message;
pub mod proof;
pub mod publish;
pub mod signal;
pub mod transport;

mod primitives;

pub use config::PublisherConfig;
pub use error::{NetworkError, ProofError, SubmitError, ValidationError, WitnessError};
pub use identity::Session;
pub use message::{Digest, Id, Kind, Message, Subtype};
pub use primitives::Fp;
pub use publish::{Publisher, Route, Submission};
