//! Network collaborators: the anonymous relay, the content-addressed store
//! and the indexing API.
//!
//! Each is an async trait with an HTTP implementation in [`http`] and, where
//! tests or embedders need one, an in-memory implementation in [`memory`].

pub mod http;
pub mod memory;

use core::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    circuit::PublicSignals,
    error::NetworkError,
    feed::Indexed,
    message::{Digest, Stored},
    proof::Proof,
};

/// Header naming the viewer on indexer requests.
pub const CONTEXTUAL_NAME_HEADER: &str = "x-contextual-name";

/// Where a message lives in the content store.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// A creator's identity-linked namespace.
    User(String),
    /// The shared namespace anonymous messages are written to.
    Public,
}

impl Namespace {
    /// Namespace for an optional creator handle.
    #[must_use]
    pub fn for_creator(creator: Option<&str>) -> Self {
        match creator {
            Some(handle) if !handle.is_empty() => Self::User(handle.to_owned()),
            Some(_) | None => Self::Public,
        }
    }

    /// `<user>/message/<hash>` or `message/<hash>`.
    #[must_use]
    pub fn message_path(&self, digest: &Digest) -> String {
        match self {
            Self::User(user) => format!("{user}/message/{digest}"),
            Self::Public => format!("message/{digest}"),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(user) => f.write_str(user),
            Self::Public => f.write_str("<public>"),
        }
    }
}

/// Body of `POST /semaphore/post`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    /// Storage form of the message. No `messageId` or `hash`.
    pub post: Stored,
    /// Hex proof.
    pub proof: Proof,
    /// Hex field elements.
    pub public_signals: PublicSignals,
}

/// Anonymous relay. Verifies the proof and enforces nullifier uniqueness
/// server-side.
#[async_trait]
pub trait Relay: Send + Sync {
    /// Submit a proven message. Any non-2xx answer is an error.
    async fn publish(&self, request: &RelayRequest) -> Result<(), NetworkError>;
}

/// Content-addressed message store.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Write `message` under `namespace` at its digest. Writing identical
    /// content twice succeeds.
    async fn put(
        &self,
        namespace: &Namespace,
        digest: &Digest,
        message: &Stored,
    ) -> Result<(), NetworkError>;

    /// Read a message back. `None` when absent.
    async fn get(
        &self,
        namespace: &Namespace,
        digest: &Digest,
    ) -> Result<Option<Stored>, NetworkError>;
}

/// Page window for list queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    /// Maximum number of items.
    pub limit: usize,
    /// Items to skip.
    pub offset: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 10,
            offset: 0,
        }
    }
}

/// Indexer list queries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Query {
    /// `GET /v1/posts`, optionally filtered by creator.
    Posts {
        /// Creator filter.
        creator: Option<String>,
    },
    /// `GET /v1/homefeed`
    HomeFeed,
    /// `GET /v1/replies?parent=`
    Replies {
        /// Parent message id.
        parent: String,
    },
    /// `GET /v1/:creator/likes`
    LikedBy {
        /// Whose likes.
        creator: String,
    },
    /// `GET /v1/:creator/replies`
    RepliedBy {
        /// Whose replies.
        creator: String,
    },
}

/// Read-side query API.
#[async_trait]
pub trait Indexer: Send + Sync {
    /// `GET /v1/post/:hash`. `None` when the indexer does not know it.
    async fn post(
        &self,
        viewer: Option<&str>,
        digest: &Digest,
    ) -> Result<Option<Indexed>, NetworkError>;

    /// Run a list query. Items come back in server order.
    async fn list(
        &self,
        viewer: Option<&str>,
        query: &Query,
        page: Page,
    ) -> Result<Vec<Indexed>, NetworkError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_paths() {
        let digest = Digest::from([0x0f; 32]);
        let hex = "0f".repeat(32);
        assert_eq!(
            Namespace::for_creator(Some("alice")).message_path(&digest),
            format!("alice/message/{hex}")
        );
        assert_eq!(
            Namespace::for_creator(None).message_path(&digest),
            format!("message/{hex}")
        );
        assert_eq!(Namespace::for_creator(Some("")), Namespace::Public);
    }
}
