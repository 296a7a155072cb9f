//! Local message cache, meta reconciliation and the indexer read path.
//!
//! Both maps are last-write-wins keyed by id. Concurrent fetches for the
//! same id are not reconciled beyond "latest observed wins".
//!
//! Reposts never accrue counters of their own: their meta is filed under
//! the message they repost.

use alloc::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    error::{NetworkError, ValidationError},
    message::{Id, Message, RawStored, Stored, Subtype, subtype},
    transport::{ContentStore, Indexer, Namespace, Page, Query},
};

/// Engagement counters for one message, viewer-relative flags included.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PostMeta {
    /// Number of replies.
    pub reply_count: u64,
    /// Number of likes.
    pub like_count: u64,
    /// Number of reposts.
    pub repost_count: u64,
    /// Whether the viewer liked it.
    #[serde(deserialize_with = "truthy")]
    pub liked: bool,
    /// Whether the viewer reposted it.
    #[serde(deserialize_with = "truthy")]
    pub reposted: bool,
}

/// Indexers report viewer flags as booleans, counts or ids.
fn truthy<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(flag) => flag,
        Value::Number(number) => number.as_u64() != Some(0),
        Value::String(text) => !text.is_empty(),
        Value::Null | Value::Array(_) | Value::Object(_) => false,
    })
}

/// One item of an indexer response.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Indexed {
    /// `creator/hash` or `hash`.
    pub message_id: String,
    #[serde(flatten)]
    raw: RawStored,
    /// Counters at query time. Absent means "no engagement".
    #[serde(default)]
    pub meta: Option<PostMeta>,
}

impl Indexed {
    /// Subtype wire tag.
    #[must_use]
    pub fn subtype(&self) -> &str {
        &self.raw.subtype
    }

    /// Id whose counters this item carries: the reposted message for
    /// reposts, the item itself otherwise.
    ///
    /// The target is returned in canonical `Id` form, so it matches the
    /// key messages are cached under.
    pub fn meta_target(&self) -> Result<String, ValidationError> {
        let repost = Subtype::Post(subtype::Post::Repost);
        let target = if self.raw.subtype == repost.tag() {
            self.raw
                .payload
                .get("reference")
                .and_then(Value::as_str)
                .filter(|reference| !reference.is_empty())
                .ok_or(ValidationError::MissingReference(repost))?
        } else {
            self.message_id.as_str()
        };
        Ok(target.parse::<Id>()?.to_string())
    }

    /// Decode into a typed message.
    ///
    /// The digest named by `messageId` must be the digest of the body.
    pub fn message(&self) -> Result<Message, ValidationError> {
        let id: Id = self.message_id.parse()?;
        let body = Stored::try_from(self.raw.clone())?;
        if body.digest() != id.digest() {
            return Err(ValidationError::DigestMismatch(self.message_id.clone()));
        }
        Ok(Message::from_stored(id.creator().map(str::to_owned), body))
    }
}

/// Process-local message and meta cache.
#[derive(Debug, Default)]
pub struct MessageCache {
    messages: DashMap<Id, Message>,
    meta: DashMap<String, PostMeta>,
}

impl MessageCache {
    /// An empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a message under its id.
    pub fn insert(&self, message: Message) -> Id {
        let id = message.id();
        debug!(%id, "caching message");
        self.messages.insert(id.clone(), message);
        id
    }

    /// Cached message, if any.
    #[must_use]
    pub fn message(&self, id: &Id) -> Option<Message> {
        self.messages.get(id).map(|entry| entry.value().clone())
    }

    /// Counters for `id`; zeros when never fetched.
    #[must_use]
    pub fn meta(&self, id: &str) -> PostMeta {
        self.meta.get(id).map(|entry| *entry.value()).unwrap_or_default()
    }

    /// Overwrite the stored snapshot for the event's target id.
    ///
    /// A missing `meta` replaces the snapshot with zeros.
    pub fn apply_meta(&self, event: &Indexed) -> Result<String, ValidationError> {
        let target = event.meta_target()?;
        debug!(%target, "applying meta");
        self.meta.insert(target.clone(), event.meta.unwrap_or_default());
        Ok(target)
    }

    /// Apply an item's meta and cache its message.
    pub fn ingest(&self, event: &Indexed) -> Result<Id, ValidationError> {
        let message = event.message()?;
        self.apply_meta(event)?;
        Ok(self.insert(message))
    }
}

/// Read path over the indexer and content store.
#[derive(Clone)]
pub struct Feed {
    indexer: Arc<dyn Indexer>,
    store: Arc<dyn ContentStore>,
    cache: Arc<MessageCache>,
}

impl core::fmt::Debug for Feed {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Feed").field("cache", &self.cache).finish_non_exhaustive()
    }
}

impl Feed {
    /// Read through `indexer` and `store` into `cache`.
    #[must_use]
    pub fn new(
        indexer: Arc<dyn Indexer>,
        store: Arc<dyn ContentStore>,
        cache: Arc<MessageCache>,
    ) -> Self {
        Self {
            indexer,
            store,
            cache,
        }
    }

    /// The cache this feed writes into.
    #[must_use]
    pub const fn cache(&self) -> &Arc<MessageCache> {
        &self.cache
    }

    /// Refresh counters for one message.
    pub async fn fetch_meta(
        &self,
        viewer: Option<&str>,
        id: &Id,
    ) -> Result<Option<PostMeta>, NetworkError> {
        let Some(item) = self.indexer.post(viewer, &id.digest()).await? else {
            return Ok(None);
        };
        match self.cache.apply_meta(&item) {
            Ok(target) => Ok(Some(self.cache.meta(&target))),
            Err(err) => {
                warn!(%id, %err, "indexer returned malformed post");
                Ok(None)
            }
        }
    }

    /// Load a message from its namespace in the content store.
    pub async fn fetch_post(&self, id: &Id) -> Result<Option<Message>, NetworkError> {
        let namespace = Namespace::for_creator(id.creator());
        let Some(body) = self.store.get(&namespace, &id.digest()).await? else {
            return Ok(None);
        };
        let message = Message::from_stored(id.creator().map(str::to_owned), body);
        self.cache.insert(message.clone());
        Ok(Some(message))
    }

    /// `GET /v1/posts`, optionally filtered to one creator.
    pub async fn fetch_posts(
        &self,
        viewer: Option<&str>,
        creator: Option<String>,
        page: Page,
    ) -> Result<Vec<Id>, NetworkError> {
        self.list(viewer, &Query::Posts { creator }, page).await
    }

    /// `GET /v1/homefeed`
    pub async fn fetch_home_feed(
        &self,
        viewer: Option<&str>,
        page: Page,
    ) -> Result<Vec<Id>, NetworkError> {
        self.list(viewer, &Query::HomeFeed, page).await
    }

    /// `GET /v1/replies` under `parent`.
    pub async fn fetch_replies(
        &self,
        viewer: Option<&str>,
        parent: impl Into<String>,
        page: Page,
    ) -> Result<Vec<Id>, NetworkError> {
        let query = Query::Replies {
            parent: parent.into(),
        };
        self.list(viewer, &query, page).await
    }

    /// Posts `creator` liked.
    pub async fn fetch_liked_by(
        &self,
        viewer: Option<&str>,
        creator: impl Into<String>,
        page: Page,
    ) -> Result<Vec<Id>, NetworkError> {
        let query = Query::LikedBy {
            creator: creator.into(),
        };
        self.list(viewer, &query, page).await
    }

    /// Posts `creator` replied to.
    pub async fn fetch_replied_by(
        &self,
        viewer: Option<&str>,
        creator: impl Into<String>,
        page: Page,
    ) -> Result<Vec<Id>, NetworkError> {
        let query = Query::RepliedBy {
            creator: creator.into(),
        };
        self.list(viewer, &query, page).await
    }

    async fn list(
        &self,
        viewer: Option<&str>,
        query: &Query,
        page: Page,
    ) -> Result<Vec<Id>, NetworkError> {
        let items = self.indexer.list(viewer, query, page).await?;
        let ids: Vec<Id> = items
            .iter()
            .filter_map(|item| match self.cache.ingest(item) {
                Ok(id) => Some(id),
                Err(err) => {
                    warn!(message_id = %item.message_id, %err, "skipping malformed indexer item");
                    None
                }
            })
            .collect();
        self.spawn_hydration(ids.clone());
        Ok(ids)
    }

    /// Best-effort background load of full messages. Not retried.
    pub fn spawn_hydration(&self, ids: Vec<Id>) {
        let feed = self.clone();
        drop(tokio::spawn(async move {
            for id in ids {
                if let Err(err) = feed.fetch_post(&id).await {
                    debug!(%id, %err, "hydration failed");
                }
            }
        }));
    }

    /// Best-effort background refresh of a message and its counters.
    pub fn spawn_refresh(&self, viewer: Option<String>, id: Id) {
        let feed = self.clone();
        drop(tokio::spawn(async move {
            if let Err(err) = feed.fetch_post(&id).await {
                debug!(%id, %err, "post refresh failed");
            }
            if let Err(err) = feed.fetch_meta(viewer.as_deref(), &id).await {
                debug!(%id, %err, "meta refresh failed");
            }
        }));
    }
}
