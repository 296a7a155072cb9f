//! Publish coordinator.
//!
//! Chooses between two paths per message:
//!
//! - **Anonymous**: derive signals from the digest, build a membership proof
//!   on the blocking pool, and post `{post, proof, publicSignals}` to the
//!   relay. The message carries no creator.
//! - **Identity-linked**: write the storage form under the creator's
//!   namespace at its content address.
//!
//! The anonymous path is taken iff the session holds a keypair and the
//! message kind is enabled in [`PublisherConfig::anonymous_kinds`]. Reposts
//! exist to attribute, so they always go identity-linked.
//!
//! Draft submissions are serialized per reference. A second call while one
//! is in flight fails fast with [`SubmitError::InFlight`]. Nothing is
//! retried.

use alloc::sync::Arc;
use core::fmt;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};

use crate::{
    artifact::{ArtifactLoader, CachedArtifacts, HttpArtifacts},
    config::PublisherConfig,
    drafts::{self, Draft, Status},
    error::{NetworkError, ProofError, SubmitError, ValidationError},
    feed::{Feed, MessageCache},
    identity::{Field, Session},
    message::{Id, Message, Subtype, subtype},
    proof::{MockProver, Prover, build_proof},
    signal::Signals,
    transport::{
        ContentStore, Namespace, Relay, RelayRequest,
        http::{HttpContentStore, HttpIndexer, HttpRelay},
    },
};

/// Which path a message took.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// Proof-gated relay post.
    Anonymous,
    /// Direct write under the creator's namespace.
    Linked,
}

/// Receipt for an accepted submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submission {
    /// Id the message is cached under.
    pub id: Id,
    /// Path taken.
    pub route: Route,
    /// The published message.
    pub message: Message,
}

/// Draft/submit state machine over the relay and content store.
pub struct Publisher {
    config: PublisherConfig,
    relay: Arc<dyn Relay>,
    store: Arc<dyn ContentStore>,
    artifacts: Arc<dyn ArtifactLoader>,
    prover: Arc<dyn Prover>,
    drafts: drafts::Book,
    cache: Arc<MessageCache>,
    feed: Option<Feed>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl fmt::Debug for Publisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("config", &self.config)
            .field("drafts", &self.drafts)
            .finish_non_exhaustive()
    }
}

/// Returns an interrupted submission's draft to `Editing` when the submit
/// future is dropped.
struct SubmitGuard<'book> {
    book: &'book drafts::Book,
    reference: &'book str,
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.book.abandon(self.reference);
    }
}

/// Holds the submission lock for one reference. Releasing it drops the
/// map entry unless another caller still holds the mutex.
struct ReferenceLock<'publisher> {
    locks: &'publisher DashMap<String, Arc<Mutex<()>>>,
    reference: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ReferenceLock<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        drop(
            self.locks
                .remove_if(&self.reference, |_, mutex| Arc::strong_count(mutex) == 1),
        );
    }
}

impl Publisher {
    /// Publisher over the given collaborators, proving with [`MockProver`].
    #[must_use]
    pub fn new(
        config: PublisherConfig,
        relay: Arc<dyn Relay>,
        store: Arc<dyn ContentStore>,
        artifacts: Arc<dyn ArtifactLoader>,
    ) -> Self {
        Self {
            config,
            relay,
            store,
            artifacts,
            prover: Arc::new(MockProver),
            drafts: drafts::Book::new(),
            cache: Arc::new(MessageCache::new()),
            feed: None,
            locks: DashMap::new(),
        }
    }

    /// HTTP collaborators for every configured endpoint. Artifacts are
    /// fetched on first use and cached.
    ///
    /// Fails with [`NetworkError::Unavailable`] when a required endpoint is
    /// empty.
    pub fn from_config(config: PublisherConfig) -> Result<Self, NetworkError> {
        config.require_endpoints()?;
        let client = config.http_client()?;
        let relay = Arc::new(HttpRelay::new(client.clone(), &config.relay_url));
        let store: Arc<dyn ContentStore> =
            Arc::new(HttpContentStore::new(client.clone(), &config.store_url));
        let artifacts = Arc::new(CachedArtifacts::new(HttpArtifacts::new(
            client.clone(),
            &config.circuit_url,
            &config.proving_key_url,
        )));
        let indexer = (!config.indexer_url.is_empty())
            .then(|| Arc::new(HttpIndexer::new(client, &config.indexer_url)));

        let publisher = Self::new(config, relay, Arc::clone(&store), artifacts);
        Ok(match indexer {
            Some(indexer) => {
                let feed = Feed::new(indexer, store, Arc::clone(&publisher.cache));
                publisher.with_feed(feed)
            }
            None => publisher,
        })
    }

    /// Swap the proving backend.
    #[must_use]
    pub fn with_prover(self, prover: Arc<dyn Prover>) -> Self {
        Self { prover, ..self }
    }

    /// Hydrate submissions through `feed`, sharing its cache.
    #[must_use]
    pub fn with_feed(self, feed: Feed) -> Self {
        Self {
            cache: Arc::clone(feed.cache()),
            feed: Some(feed),
            ..self
        }
    }

    /// Routing and endpoint configuration.
    #[must_use]
    pub const fn config(&self) -> &PublisherConfig {
        &self.config
    }

    /// Local message and meta cache.
    #[must_use]
    pub const fn cache(&self) -> &Arc<MessageCache> {
        &self.cache
    }

    /// Replace the draft content for `reference`.
    pub fn set_draft(&self, reference: &str, content: impl Into<String>) {
        self.drafts.set(reference, content);
    }

    /// Draft for `reference`.
    #[must_use]
    pub fn draft(&self, reference: &str) -> Draft {
        self.drafts.get(reference)
    }

    /// Draft status for `reference`.
    #[must_use]
    pub fn status(&self, reference: &str) -> Status {
        self.drafts.status(reference)
    }

    /// Path a message of `subtype` takes for `session`.
    #[must_use]
    pub fn route(&self, session: &Session, subtype: Subtype) -> Route {
        let repost = subtype == Subtype::Post(subtype::Post::Repost);
        if session.is_anonymous_capable() && self.config.is_anonymous_kind(subtype.kind()) && !repost
        {
            Route::Anonymous
        } else {
            Route::Linked
        }
    }

    /// Submit the draft for `reference` as a post, or a reply when
    /// `reference` is non-empty.
    ///
    /// Success clears the draft. Failure leaves it intact and records the
    /// error in its status.
    #[instrument(skip(self, session))]
    pub async fn submit(
        &self,
        session: &Session,
        reference: &str,
    ) -> Result<Submission, SubmitError> {
        let _lock = self.lock(reference)?;
        let content = self.drafts.begin(reference);
        let _guard = SubmitGuard {
            book: &self.drafts,
            reference,
        };

        let subtype = if reference.is_empty() {
            subtype::Post::Default
        } else {
            subtype::Post::Reply
        };
        let result = match self.creator_for(session, subtype.into()) {
            Ok(creator) => match Message::post(creator, content.as_str(), reference) {
                Ok(message) => self.publish(session, message).await,
                Err(err) => Err(err.into()),
            },
            Err(err) => Err(err),
        };

        match result {
            Ok(submission) => {
                self.drafts.succeed(reference, &content);
                Ok(submission)
            }
            Err(err) => {
                self.drafts.fail(reference, err.to_string());
                Err(err)
            }
        }
    }

    /// Repost `reference`. Success empties the draft replying to it.
    #[instrument(skip(self, session))]
    pub async fn submit_repost(
        &self,
        session: &Session,
        reference: &str,
    ) -> Result<Submission, SubmitError> {
        let creator = self.creator_for(session, subtype::Post::Repost.into())?;
        let submission = self
            .publish(session, Message::repost(creator, reference)?)
            .await?;
        self.drafts.set(reference, String::new());
        Ok(submission)
    }

    /// Moderate `reference`. Success empties the draft replying to it.
    #[instrument(skip(self, session))]
    pub async fn submit_moderation(
        &self,
        session: &Session,
        moderation: subtype::Moderation,
        reference: &str,
    ) -> Result<Submission, SubmitError> {
        let creator = self.creator_for(session, moderation.into())?;
        let submission = self
            .publish(session, Message::moderation(creator, moderation, reference)?)
            .await?;
        self.drafts.set(reference, String::new());
        Ok(submission)
    }

    /// Update a profile field. Drafts are not touched.
    #[instrument(skip(self, session, value))]
    pub async fn submit_profile(
        &self,
        session: &Session,
        profile: subtype::Profile,
        key: &str,
        value: &str,
    ) -> Result<Submission, SubmitError> {
        let creator = self.creator_for(session, profile.into())?;
        self.publish(session, Message::profile(creator, profile, key, value)?)
            .await
    }

    fn lock(&self, reference: &str) -> Result<ReferenceLock<'_>, SubmitError> {
        let mutex = Arc::clone(self.locks.entry(reference.to_owned()).or_default().value());
        let guard = mutex
            .try_lock_owned()
            .map_err(|_busy| SubmitError::InFlight(reference.to_owned()))?;
        Ok(ReferenceLock {
            locks: &self.locks,
            reference: reference.to_owned(),
            guard: Some(guard),
        })
    }

    /// Creator to stamp on the message: none on the anonymous path, the
    /// session handle otherwise.
    fn creator_for(
        &self,
        session: &Session,
        subtype: Subtype,
    ) -> Result<Option<String>, SubmitError> {
        match self.route(session, subtype) {
            Route::Anonymous => Ok(None),
            Route::Linked => session
                .creator()
                .map(|handle| Some(handle.to_owned()))
                .ok_or_else(|| ValidationError::MissingCreator.into()),
        }
    }

    async fn publish(
        &self,
        session: &Session,
        message: Message,
    ) -> Result<Submission, SubmitError> {
        let route = self.route(session, message.subtype());
        let outcome = match route {
            Route::Anonymous => self.publish_anonymous(session, &message).await,
            Route::Linked => self.publish_linked(&message).await,
        };
        outcome.inspect_err(|err| warn!(?route, %err, "submission failed"))?;

        let id = self.cache.insert(message.clone());
        info!(%id, ?route, "submission accepted");
        if let Some(feed) = self.feed.as_ref() {
            feed.spawn_refresh(session.creator().map(str::to_owned), id.clone());
        }
        Ok(Submission { id, route, message })
    }

    async fn publish_anonymous(
        &self,
        session: &Session,
        message: &Message,
    ) -> Result<(), SubmitError> {
        let identity = session
            .identity()
            .map(Arc::clone)
            .ok_or(ProofError::IdentityIncomplete(Field::Keypair))?;
        identity.require_complete()?;

        let signals = Signals::derive(&message.digest());
        let artifacts = self.artifacts.load().await?;
        if artifacts.circuit.depth() != self.config.tree_depth {
            return Err(ProofError::Prover(format!(
                "circuit depth {} does not match tree depth {}",
                artifacts.circuit.depth(),
                self.config.tree_depth
            ))
            .into());
        }

        let prover = Arc::clone(&self.prover);
        debug!(circuit = artifacts.circuit.name(), "building proof");
        let bundle = tokio::task::spawn_blocking(move || {
            build_proof(
                &identity,
                &signals,
                &artifacts.circuit,
                &artifacts.key,
                &*prover,
                &mut rand::thread_rng(),
            )
        })
        .await
        .map_err(|err| ProofError::Prover(format!("proof task failed: {err}")))??;

        let request = RelayRequest {
            post: message.stored().clone(),
            proof: bundle.proof,
            public_signals: bundle.public_signals,
        };
        self.relay.publish(&request).await?;
        Ok(())
    }

    async fn publish_linked(&self, message: &Message) -> Result<(), SubmitError> {
        let creator = message.creator().ok_or(ValidationError::MissingCreator)?;
        let namespace = Namespace::User(creator.to_owned());
        self.store
            .put(&namespace, &message.digest(), message.stored())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use ff::Field as _;
    use pasta_curves::Fp;

    use super::*;

    use crate::{
        artifact::{Artifacts, StaticArtifacts},
        circuit::Circuit,
        identity::State,
        keys::IdentitySeed,
        merkle::Group,
        message::Kind,
        proof::ProvingKey,
        transport::memory::{MemoryRelay, MemoryStore},
    };

    const DEPTH: usize = 4;

    struct Fixture {
        relay: Arc<MemoryRelay>,
        store: Arc<MemoryStore>,
        publisher: Publisher,
    }

    /// Never finishes loading.
    #[derive(Debug)]
    struct Stalled;

    #[async_trait]
    impl ArtifactLoader for Stalled {
        async fn load(&self) -> Result<Arc<Artifacts>, ProofError> {
            core::future::pending().await
        }
    }

    fn fixture(relay: MemoryRelay) -> Fixture {
        let artifacts = StaticArtifacts::new(
            Circuit::new("semaphore", DEPTH).unwrap(),
            ProvingKey::from(b"semaphore.zkey".to_vec()),
        );
        fixture_with(relay, Arc::new(artifacts))
    }

    fn fixture_with(relay: MemoryRelay, artifacts: Arc<dyn ArtifactLoader>) -> Fixture {
        let relay = Arc::new(relay);
        let store = Arc::new(MemoryStore::new());
        let config = PublisherConfig {
            tree_depth: DEPTH,
            ..PublisherConfig::default()
        };
        let publisher = Publisher::new(
            config,
            Arc::clone(&relay) as Arc<dyn Relay>,
            Arc::clone(&store) as Arc<dyn ContentStore>,
            artifacts,
        );
        Fixture {
            relay,
            store,
            publisher,
        }
    }

    fn anonymous_identity() -> Arc<State> {
        let seed = IdentitySeed::from([8u8; 32]);
        let mut group = Group::new(DEPTH);
        group.insert(Fp::ONE).unwrap();
        let bare = State::from_seed(&seed, None);
        let index = group.insert(bare.commitment.unwrap().into()).unwrap();
        Arc::new(State::from_seed(&seed, group.path(index)))
    }

    /// No identity: direct write under the creator, draft cleared, no relay.
    #[tokio::test]
    async fn linked_submit() {
        let fx = fixture(MemoryRelay::new());
        fx.publisher.set_draft("", "hello");
        let session = Session::linked("alice");

        let submission = fx.publisher.submit(&session, "").await.unwrap();
        assert_eq!(submission.route, Route::Linked);
        let path = format!("alice/message/{}", submission.message.digest());
        assert_eq!(fx.store.at(&path).as_ref(), Some(submission.message.stored()));
        assert!(fx.relay.accepted().is_empty());
        assert_eq!(fx.publisher.draft(""), Draft::default());
        assert_eq!(
            fx.publisher.cache().message(&submission.id),
            Some(submission.message)
        );
    }

    /// Complete identity: relay post with proof and signals, no creator.
    #[tokio::test]
    async fn anonymous_submit() {
        let fx = fixture(MemoryRelay::new());
        fx.publisher.set_draft("", "hello");
        let session = Session::linked("alice").with_identity(anonymous_identity());

        let submission = fx.publisher.submit(&session, "").await.unwrap();
        assert_eq!(submission.route, Route::Anonymous);
        assert_eq!(submission.message.creator(), None);
        assert!(fx.store.is_empty());

        let accepted = fx.relay.accepted();
        assert_eq!(accepted.len(), 1);
        let request = accepted.first().unwrap();
        assert_eq!(&request.post, submission.message.stored());
        let signals = Signals::derive(&submission.message.digest());
        assert_eq!(request.public_signals.external_nullifier(), signals.external_nullifier);
        MockProver
            .verify(
                &crate::proof::Bundle {
                    proof: request.proof.clone(),
                    public_signals: request.public_signals,
                },
                &ProvingKey::from(b"semaphore.zkey".to_vec()),
            )
            .unwrap();
        assert_eq!(fx.publisher.status(""), Status::Empty);
    }

    /// Relay rejection fails the submission and keeps the draft.
    #[tokio::test]
    async fn relay_failure_keeps_draft() {
        let fx = fixture(MemoryRelay::failing(500));
        fx.publisher.set_draft("", "hello");
        let session = Session::logged_out().with_identity(anonymous_identity());

        let err = fx.publisher.submit(&session, "").await.unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Network(NetworkError::Status { status: 500, .. })
        ));
        assert_eq!(fx.publisher.draft("").content, "hello");
        assert!(matches!(fx.publisher.status(""), Status::Failed { .. }));
    }

    /// An incomplete identity with a keypair fails without a partial proof.
    #[tokio::test]
    async fn incomplete_identity_fails() {
        let fx = fixture(MemoryRelay::new());
        fx.publisher.set_draft("", "hello");
        let mut state = (*anonymous_identity()).clone();
        state.path = None;
        let session = Session::logged_out().with_identity(Arc::new(state));

        let err = fx.publisher.submit(&session, "").await.unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Proof(ProofError::IdentityIncomplete(Field::MerklePath))
        ));
        assert!(fx.relay.accepted().is_empty());
        assert_eq!(fx.publisher.draft("").content, "hello");
    }

    /// Without identity or creator there is nowhere to publish.
    #[tokio::test]
    async fn logged_out_fails() {
        let fx = fixture(MemoryRelay::new());
        fx.publisher.set_draft("", "hello");
        let err = fx
            .publisher
            .submit(&Session::logged_out(), "")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Validation(ValidationError::MissingCreator)
        ));
        assert_eq!(fx.publisher.draft("").content, "hello");
    }

    /// An empty draft is a validation failure.
    #[tokio::test]
    async fn empty_draft_rejected() {
        let fx = fixture(MemoryRelay::new());
        let err = fx
            .publisher
            .submit(&Session::linked("alice"), "")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Validation(ValidationError::EmptyContent(_))
        ));
    }

    /// A second submit for the same reference is refused while one runs.
    #[tokio::test]
    async fn concurrent_submit_rejected() {
        let fx = fixture(MemoryRelay::new());
        fx.publisher.set_draft("parent", "reply");
        let held = fx.publisher.lock("parent").unwrap();
        let err = fx
            .publisher
            .submit(&Session::linked("alice"), "parent")
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::InFlight(_)));
        assert_eq!(fx.publisher.status("parent"), Status::Editing);
        assert_eq!(fx.publisher.locks.len(), 1);
        drop(held);
        assert!(fx.publisher.locks.is_empty());

        let submission = fx
            .publisher
            .submit(&Session::linked("alice"), "parent")
            .await
            .unwrap();
        assert!(fx.publisher.locks.is_empty());
        assert_eq!(
            submission.message.subtype(),
            Subtype::Post(subtype::Post::Reply)
        );
    }

    /// Reposts, moderation and profile updates stay identity-linked. A
    /// successful repost or moderation empties the reply draft under its
    /// reference; profile updates leave drafts alone.
    #[tokio::test]
    async fn side_submissions() {
        let fx = fixture(MemoryRelay::new());
        fx.publisher.set_draft("alice/00", "half-typed reply");
        fx.publisher.set_draft("", "top-level draft");
        let session = Session::linked("bob").with_identity(anonymous_identity());

        let repost = fx.publisher.submit_repost(&session, "alice/00").await.unwrap();
        assert_eq!(repost.route, Route::Linked);
        assert_eq!(fx.publisher.draft("alice/00"), Draft::default());

        fx.publisher.set_draft("alice/00", "half-typed reply");
        let like = fx
            .publisher
            .submit_moderation(&session, subtype::Moderation::Like, "alice/00")
            .await
            .unwrap();
        assert_eq!(like.route, Route::Linked);
        assert_eq!(fx.publisher.draft("alice/00"), Draft::default());

        let name = fx
            .publisher
            .submit_profile(&session, subtype::Profile::Name, "", "Bob")
            .await
            .unwrap();
        assert_eq!(name.id.creator(), Some("bob"));
        assert_eq!(fx.publisher.draft("").content, "top-level draft");

        assert_eq!(fx.store.len(), 3);
        assert!(fx.relay.accepted().is_empty());
    }

    /// A failed repost keeps the reply draft.
    #[tokio::test]
    async fn failed_repost_keeps_draft() {
        let fx = fixture(MemoryRelay::new());
        fx.publisher.set_draft("alice/00", "half-typed reply");
        let err = fx
            .publisher
            .submit_repost(&Session::logged_out(), "alice/00")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Validation(ValidationError::MissingCreator)
        ));
        assert_eq!(fx.publisher.draft("alice/00").content, "half-typed reply");
        assert_eq!(fx.publisher.status("alice/00"), Status::Editing);
    }

    /// HTTP wiring refuses to start without a relay.
    #[test]
    fn from_config_requires_relay() {
        let config = PublisherConfig {
            relay_url: String::new(),
            ..PublisherConfig::default()
        };
        assert!(matches!(
            Publisher::from_config(config),
            Err(NetworkError::Unavailable(_))
        ));
    }

    /// Enabling a kind sends it through the relay.
    #[tokio::test]
    async fn configurable_anonymous_kinds() {
        let mut fx = fixture(MemoryRelay::new());
        fx.publisher.config.anonymous_kinds = vec![Kind::Post, Kind::Moderation];
        let session = Session::logged_out().with_identity(anonymous_identity());
        let like = fx
            .publisher
            .submit_moderation(&session, subtype::Moderation::Like, "alice/00")
            .await
            .unwrap();
        assert_eq!(like.route, Route::Anonymous);
        assert_eq!(fx.relay.accepted().len(), 1);
    }

    /// The relay refuses a second proof for the same message and identity.
    #[tokio::test]
    async fn double_signal_rejected() {
        let fx = fixture(MemoryRelay::new());
        let session = Session::logged_out().with_identity(anonymous_identity());
        let message = Message::post(None, "same", "").unwrap();
        fx.publisher.publish(&session, message.clone()).await.unwrap();
        let err = fx.publisher.publish(&session, message).await.unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Network(NetworkError::Status { status: 409, .. })
        ));
    }

    /// Dropping a submit future mid-flight returns the draft to editing.
    #[tokio::test]
    async fn cancelled_submit_restores_draft() {
        let fx = fixture_with(MemoryRelay::new(), Arc::new(Stalled));
        fx.publisher.set_draft("", "hello");
        let session = Session::logged_out().with_identity(anonymous_identity());
        {
            let future = fx.publisher.submit(&session, "");
            poll_once(future).await;
        }
        assert!(fx.publisher.locks.is_empty());
        assert!(fx.publisher.lock("").is_ok());
        assert_eq!(fx.publisher.status(""), Status::Editing);
        assert_eq!(fx.publisher.draft("").content, "hello");
    }

    /// Poll a future exactly once, then drop it.
    async fn poll_once<F: core::future::Future>(future: F) {
        let mut future = core::pin::pin!(future);
        core::future::poll_fn(|cx| {
            drop(future.as_mut().poll(cx));
            core::task::Poll::Ready(())
        })
        .await;
    }
}
