//! In-memory transport for tests and embedding.

use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use tracing::debug;

use super::{ContentStore, Namespace, Relay, RelayRequest};
use crate::{
    error::NetworkError,
    message::{Digest, Stored},
    primitives::encode_hex,
};

/// Content-addressed map keyed by `<namespace>/message/<hash>`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    messages: DashMap<String, Stored>,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Stored content at a raw path.
    #[must_use]
    pub fn at(&self, path: &str) -> Option<Stored> {
        self.messages.get(path).map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn put(
        &self,
        namespace: &Namespace,
        digest: &Digest,
        message: &Stored,
    ) -> Result<(), NetworkError> {
        let path = namespace.message_path(digest);
        match self.messages.entry(path) {
            Entry::Occupied(existing) if existing.get() == message => {
                debug!(path = %existing.key(), "identical content already stored");
                Ok(())
            }
            Entry::Occupied(existing) => Err(NetworkError::Conflict(existing.key().clone())),
            Entry::Vacant(slot) => {
                slot.insert(message.clone());
                Ok(())
            }
        }
    }

    async fn get(
        &self,
        namespace: &Namespace,
        digest: &Digest,
    ) -> Result<Option<Stored>, NetworkError> {
        Ok(self.at(&namespace.message_path(digest)))
    }
}

/// Relay that accepts each `(externalNullifier, nullifierHash)` pair once.
///
/// Proofs are not verified. A relay built with [`MemoryRelay::failing`]
/// answers every request with the given status.
#[derive(Debug, Default)]
pub struct MemoryRelay {
    accepted: DashMap<(String, String), RelayRequest>,
    failure: Option<u16>,
}

impl MemoryRelay {
    /// A relay that accepts fresh nullifiers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A relay that rejects everything with `status`.
    #[must_use]
    pub fn failing(status: u16) -> Self {
        Self {
            failure: Some(status),
            ..Self::default()
        }
    }

    /// Accepted requests, in no particular order.
    #[must_use]
    pub fn accepted(&self) -> Vec<RelayRequest> {
        self.accepted
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[async_trait]
impl Relay for MemoryRelay {
    async fn publish(&self, request: &RelayRequest) -> Result<(), NetworkError> {
        if let Some(status) = self.failure {
            return Err(NetworkError::Status {
                status,
                message: "relay unavailable".into(),
            });
        }
        let signals = &request.public_signals;
        let key = (
            encode_hex(&signals.external_nullifier().into()),
            encode_hex(&signals.nullifier_hash()),
        );
        match self.accepted.entry(key) {
            Entry::Occupied(_) => Err(NetworkError::Status {
                status: 409,
                message: "nullifier already used for this message".into(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(request.clone());
                Ok(())
            }
        }
    }
}
