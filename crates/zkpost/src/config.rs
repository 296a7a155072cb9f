//! Publisher configuration.

use core::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{constants::DEFAULT_TREE_DEPTH, error::NetworkError, message::Kind};

/// Endpoints and routing policy for a [`Publisher`](crate::Publisher).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    /// Anonymous relay base URL.
    pub relay_url: String,
    /// Content store base URL.
    pub store_url: String,
    /// Indexer base URL. Hydration is skipped when empty.
    pub indexer_url: String,
    /// Circuit descriptor URL.
    pub circuit_url: String,
    /// Proving key URL.
    pub proving_key_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Kinds published anonymously when a keypair is present.
    pub anonymous_kinds: Vec<Kind>,
    /// Identity tree depth expected from the circuit.
    pub tree_depth: usize,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            relay_url: "http://localhost:3000".to_owned(),
            store_url: "http://localhost:8765/gun".to_owned(),
            indexer_url: "http://localhost:3000".to_owned(),
            circuit_url: "http://localhost:3000/circuits/semaphore.json".to_owned(),
            proving_key_url: "http://localhost:3000/circuits/semaphore_final.zkey".to_owned(),
            timeout_secs: 30,
            anonymous_kinds: vec![Kind::Post],
            tree_depth: DEFAULT_TREE_DEPTH,
        }
    }
}

impl PublisherConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Whether `kind` may take the anonymous path.
    #[must_use]
    pub fn is_anonymous_kind(&self, kind: Kind) -> bool {
        self.anonymous_kinds.contains(&kind)
    }

    /// Check every endpoint the publisher cannot run without is set.
    ///
    /// `indexer_url` may be empty; hydration is skipped then.
    pub fn require_endpoints(&self) -> Result<(), NetworkError> {
        let required = [
            ("relay_url", &self.relay_url),
            ("store_url", &self.store_url),
            ("circuit_url", &self.circuit_url),
            ("proving_key_url", &self.proving_key_url),
        ];
        match required.iter().find(|(_, url)| url.trim().is_empty()) {
            Some((name, _)) => Err(NetworkError::Unavailable(format!("{name} is not configured"))),
            None => Ok(()),
        }
    }

    /// HTTP client with the configured timeout.
    pub fn http_client(&self) -> Result<Client, NetworkError> {
        Ok(Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?)
    }
}
