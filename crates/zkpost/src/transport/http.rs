//! `reqwest` implementations of the transport traits.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::debug;

use super::{
    CONTEXTUAL_NAME_HEADER, ContentStore, Indexer, Namespace, Page, Query, Relay, RelayRequest,
};
use crate::{
    error::NetworkError,
    feed::Indexed,
    message::{Digest, Stored},
};

/// Turn any non-2xx response into [`NetworkError::Status`].
pub(crate) async fn check_status(response: Response) -> Result<Response, NetworkError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    Err(NetworkError::Status { status, message })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, NetworkError> {
    let bytes = check_status(response).await?.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn trim_base(raw: impl Into<String>) -> String {
    let mut base = raw.into();
    while base.ends_with('/') {
        base.pop();
    }
    base
}

/// Indexer response envelope.
#[derive(Deserialize)]
struct Envelope<T> {
    payload: T,
}

/// Relay client: `POST {base}/semaphore/post`.
#[derive(Clone, Debug)]
pub struct HttpRelay {
    client: Client,
    base: String,
}

impl HttpRelay {
    /// Relay at `base`.
    #[must_use]
    pub fn new(client: Client, base: impl Into<String>) -> Self {
        Self {
            client,
            base: trim_base(base),
        }
    }
}

#[async_trait]
impl Relay for HttpRelay {
    async fn publish(&self, request: &RelayRequest) -> Result<(), NetworkError> {
        let url = format!("{}/semaphore/post", self.base);
        debug!(%url, "posting to relay");
        let response = self.client.post(&url).json(request).send().await?;
        check_status(response).await.map(drop)
    }
}

/// Content store client: `PUT`/`GET {base}/<namespace path>`.
#[derive(Clone, Debug)]
pub struct HttpContentStore {
    client: Client,
    base: String,
}

impl HttpContentStore {
    /// Store at `base`.
    #[must_use]
    pub fn new(client: Client, base: impl Into<String>) -> Self {
        Self {
            client,
            base: trim_base(base),
        }
    }

    fn url(&self, namespace: &Namespace, digest: &Digest) -> String {
        format!("{}/{}", self.base, namespace.message_path(digest))
    }
}

#[async_trait]
impl ContentStore for HttpContentStore {
    async fn put(
        &self,
        namespace: &Namespace,
        digest: &Digest,
        message: &Stored,
    ) -> Result<(), NetworkError> {
        let url = self.url(namespace, digest);
        debug!(%url, "writing message");
        let response = self.client.put(&url).json(message).send().await?;
        check_status(response).await.map(drop)
    }

    async fn get(
        &self,
        namespace: &Namespace,
        digest: &Digest,
    ) -> Result<Option<Stored>, NetworkError> {
        let response = self.client.get(self.url(namespace, digest)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        read_json(response).await.map(Some)
    }
}

/// Indexer client.
#[derive(Clone, Debug)]
pub struct HttpIndexer {
    client: Client,
    base: String,
}

impl HttpIndexer {
    /// Indexer at `base`.
    #[must_use]
    pub fn new(client: Client, base: impl Into<String>) -> Self {
        Self {
            client,
            base: trim_base(base),
        }
    }

    /// `GET {base}/<segments>`, each segment percent-encoded.
    fn get(&self, segments: &[&str], viewer: Option<&str>) -> Result<RequestBuilder, NetworkError> {
        let invalid = || NetworkError::Unavailable(format!("invalid indexer url {:?}", self.base));
        let mut url = Url::parse(&self.base).map_err(|_err| invalid())?;
        url.path_segments_mut()
            .map_err(|()| invalid())?
            .pop_if_empty()
            .extend(segments);
        let request = self.client.get(url);
        Ok(match viewer {
            Some(name) => request.header(CONTEXTUAL_NAME_HEADER, name),
            None => request,
        })
    }
}

#[async_trait]
impl Indexer for HttpIndexer {
    async fn post(
        &self,
        viewer: Option<&str>,
        digest: &Digest,
    ) -> Result<Option<Indexed>, NetworkError> {
        let hash = digest.to_string();
        let response = self.get(&["v1", "post", hash.as_str()], viewer)?.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let envelope: Envelope<Option<Indexed>> = read_json(response).await?;
        Ok(envelope.payload)
    }

    async fn list(
        &self,
        viewer: Option<&str>,
        query: &Query,
        page: Page,
    ) -> Result<Vec<Indexed>, NetworkError> {
        let window = [("limit", page.limit.to_string()), ("offset", page.offset.to_string())];
        let request = match query {
            Query::Posts { creator } => {
                let filter: Vec<_> = creator.iter().map(|handle| ("creator", handle.clone())).collect();
                self.get(&["v1", "posts"], viewer)?.query(&window).query(&filter)
            }
            Query::HomeFeed => self.get(&["v1", "homefeed"], viewer)?.query(&window),
            Query::Replies { parent } => self
                .get(&["v1", "replies"], viewer)?
                .query(&window)
                .query(&[("parent", parent)]),
            Query::LikedBy { creator } => self
                .get(&["v1", creator.as_str(), "likes"], viewer)?
                .query(&window),
            Query::RepliedBy { creator } => self
                .get(&["v1", creator.as_str(), "replies"], viewer)?
                .query(&window),
        };
        let envelope: Envelope<Vec<Indexed>> = read_json(request.send().await?).await?;
        Ok(envelope.payload)
    }
}
