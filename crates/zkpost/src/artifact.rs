//! Circuit and proving-key retrieval.
//!
//! Artifacts are fetched once and reused across proof-building calls. Any
//! retrieval failure surfaces as [`ProofError::Prover`].

use alloc::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::{
    circuit::Circuit,
    error::{NetworkError, ProofError},
    proof::ProvingKey,
    transport::http::check_status,
};

/// A circuit with its proving key.
#[derive(Clone, Debug)]
pub struct Artifacts {
    /// Circuit descriptor.
    pub circuit: Circuit,
    /// Proving key material.
    pub key: ProvingKey,
}

/// Supplies proof artifacts.
#[async_trait]
pub trait ArtifactLoader: Send + Sync {
    /// Fetch the circuit and proving key.
    async fn load(&self) -> Result<Arc<Artifacts>, ProofError>;
}

/// Serves artifacts held in memory.
#[derive(Clone, Debug)]
pub struct StaticArtifacts(Arc<Artifacts>);

impl StaticArtifacts {
    /// Serve `circuit` and `key`.
    #[must_use]
    pub fn new(circuit: Circuit, key: ProvingKey) -> Self {
        Self(Arc::new(Artifacts { circuit, key }))
    }
}

#[async_trait]
impl ArtifactLoader for StaticArtifacts {
    async fn load(&self) -> Result<Arc<Artifacts>, ProofError> {
        Ok(Arc::clone(&self.0))
    }
}

/// Fetches the circuit JSON and the proving key over HTTP.
#[derive(Clone, Debug)]
pub struct HttpArtifacts {
    client: Client,
    circuit_url: String,
    key_url: String,
}

impl HttpArtifacts {
    /// GET the circuit from `circuit_url` and the key from `key_url`.
    #[must_use]
    pub fn new(client: Client, circuit_url: impl Into<String>, key_url: impl Into<String>) -> Self {
        Self {
            client,
            circuit_url: circuit_url.into(),
            key_url: key_url.into(),
        }
    }

    async fn fetch(&self) -> Result<Artifacts, NetworkError> {
        let circuit_response = check_status(self.client.get(&self.circuit_url).send().await?).await?;
        let circuit = serde_json::from_slice(&circuit_response.bytes().await?)?;
        let key_response = check_status(self.client.get(&self.key_url).send().await?).await?;
        let key = ProvingKey::from(key_response.bytes().await?.to_vec());
        Ok(Artifacts { circuit, key })
    }
}

#[async_trait]
impl ArtifactLoader for HttpArtifacts {
    async fn load(&self) -> Result<Arc<Artifacts>, ProofError> {
        debug!(circuit = %self.circuit_url, key = %self.key_url, "fetching proof artifacts");
        self.fetch()
            .await
            .map(Arc::new)
            .map_err(|err| ProofError::Prover(format!("artifact load failed: {err}")))
    }
}

/// Loads through an inner loader once, then serves the cached value.
///
/// A failed load is not cached; the next call tries again.
#[derive(Debug)]
pub struct CachedArtifacts<L> {
    inner: L,
    cell: OnceCell<Arc<Artifacts>>,
}

impl<L: ArtifactLoader> CachedArtifacts<L> {
    /// Wrap `inner`.
    #[must_use]
    pub const fn new(inner: L) -> Self {
        Self {
            inner,
            cell: OnceCell::const_new(),
        }
    }
}

#[async_trait]
impl<L: ArtifactLoader> ArtifactLoader for CachedArtifacts<L> {
    async fn load(&self) -> Result<Arc<Artifacts>, ProofError> {
        self.cell
            .get_or_try_init(|| self.inner.load())
            .await
            .map(Arc::clone)
    }
}

#[cfg(test)]
mod tests {
    use core::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Debug, Default)]
    struct Counting {
        calls: AtomicUsize,
        fail_first: bool,
    }

    #[async_trait]
    impl ArtifactLoader for Counting {
        async fn load(&self) -> Result<Arc<Artifacts>, ProofError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && call == 0 {
                return Err(ProofError::Prover("offline".into()));
            }
            Ok(Arc::new(Artifacts {
                circuit: Circuit::new("semaphore", 20)?,
                key: ProvingKey::from(vec![1, 2, 3]),
            }))
        }
    }

    /// Artifacts are fetched once across many loads.
    #[tokio::test]
    async fn cached_loads_once() {
        let cached = CachedArtifacts::new(Counting::default());
        let first = cached.load().await.unwrap();
        let second = cached.load().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 1);
    }

    /// A failed fetch is retried by the next caller.
    #[tokio::test]
    async fn failure_not_cached() {
        let cached = CachedArtifacts::new(Counting {
            fail_first: true,
            ..Counting::default()
        });
        assert!(matches!(cached.load().await, Err(ProofError::Prover(_))));
        cached.load().await.unwrap();
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 2);
    }
}
