//! Messages and their content addresses.
//!
//! A [`Message`] is a kind-scoped [`Subtype`], a matching [`Payload`] and a
//! millisecond [`CreatedAt`], optionally attributed to a creator handle.
//!
//! ## Content address
//!
//! $$\mathsf{digest} = \text{BLAKE2b-256}(\texttt{"ZkPost\_MsgDigest"},\;
//!   \text{kind} \| \text{subtype} \| \text{createdAt} \| \text{payload})$$
//!
//! Every transcript field is length-prefixed and payload fields are absorbed
//! in a fixed order, so the digest never depends on JSON key order. The
//! creator is not absorbed: the same content republished under another
//! handle keeps its address.
//!
//! ## Wire forms
//!
//! - [`Stored`]: what is written to the content store. No derived fields.
//! - [`Canonical`]: [`Stored`] plus `messageId` and `hash`, for display and
//!   indexing. Stripping is a type conversion, not a convention.

mod id;
pub mod payload;
pub mod subtype;

use core::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use id::{Digest, Id};
pub use payload::Payload;
pub use subtype::Subtype;

use crate::{constants::MESSAGE_HASH_PERSONALIZATION, error::ValidationError};

/// Message kind. Serializes as its wire tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Kind {
    /// Posts, replies and reposts.
    Post,
    /// Likes, blocks and thread moderation.
    Moderation,
    /// Profile field updates.
    Profile,
}

impl Kind {
    /// Wire tag.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Moderation => "MODERATION",
            Self::Profile => "PROFILE",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Creation time in integer milliseconds since the Unix epoch.
///
/// Fixed at construction so the digest never sees sub-millisecond noise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CreatedAt(u64);

impl CreatedAt {
    /// The current wall-clock time, truncated to milliseconds.
    #[must_use]
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis())
            .unwrap_or_default();
        Self(u64::try_from(millis).unwrap_or(u64::MAX))
    }
}

impl From<u64> for CreatedAt {
    fn from(millis: u64) -> Self {
        Self(millis)
    }
}

impl From<CreatedAt> for u64 {
    fn from(created_at: CreatedAt) -> Self {
        created_at.0
    }
}

/// The storage form: everything the content store persists.
///
/// Construction validates the subtype/payload pairing, so a `Stored` that
/// exists is always a well-formed message body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "RawStored", try_from = "RawStored")]
pub struct Stored {
    subtype: Subtype,
    created_at: CreatedAt,
    payload: Payload,
}

impl Stored {
    /// Validate and assemble a message body.
    pub fn new(
        subtype: Subtype,
        payload: Payload,
        created_at: CreatedAt,
    ) -> Result<Self, ValidationError> {
        if subtype.kind() != payload.kind() {
            return Err(ValidationError::PayloadMismatch {
                subtype: subtype.kind(),
                payload: payload.kind(),
            });
        }
        if subtype.needs_reference() && payload.reference().is_none() {
            return Err(ValidationError::MissingReference(subtype));
        }
        if subtype.needs_content() {
            if let Payload::Post(post) = &payload {
                if post.content.trim().is_empty() {
                    return Err(ValidationError::EmptyContent(subtype));
                }
            }
        }
        Ok(Self {
            subtype,
            created_at,
            payload,
        })
    }

    /// The content address.
    #[must_use]
    pub fn digest(&self) -> Digest {
        let mut state = blake2b_simd::Params::new()
            .hash_length(32)
            .personal(MESSAGE_HASH_PERSONALIZATION)
            .to_state();
        let mut transcript = |bytes: &[u8]| {
            let len = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
            state.update(&len.to_le_bytes());
            state.update(bytes);
        };
        transcript(self.subtype.kind().tag().as_bytes());
        transcript(self.subtype.tag().as_bytes());
        transcript(&self.created_at.0.to_le_bytes());
        self.payload.absorb(&mut transcript);

        let mut digest = [0u8; 32];
        digest.copy_from_slice(state.finalize().as_bytes());
        Digest::from(digest)
    }
}

/// Untyped wire shape of [`Stored`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawStored {
    #[serde(rename = "type")]
    pub(crate) kind: Kind,
    #[serde(default)]
    pub(crate) subtype: String,
    pub(crate) created_at: u64,
    pub(crate) payload: Value,
}

impl From<Stored> for RawStored {
    fn from(stored: Stored) -> Self {
        Self {
            kind: stored.subtype.kind(),
            subtype: stored.subtype.tag().to_owned(),
            created_at: stored.created_at.0,
            payload: stored.payload.to_value(),
        }
    }
}

impl TryFrom<RawStored> for Stored {
    type Error = ValidationError;

    fn try_from(raw: RawStored) -> Result<Self, Self::Error> {
        let subtype = Subtype::parse(raw.kind, &raw.subtype)?;
        let payload = Payload::from_value(raw.kind, raw.payload)
            .map_err(|err| ValidationError::MalformedPayload(err.to_string()))?;
        Self::new(subtype, payload, CreatedAt(raw.created_at))
    }
}

/// The display/indexing form: [`Stored`] plus its derived identifiers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Canonical {
    /// `creator/hash` or `hash`.
    pub message_id: String,
    /// Hex content address.
    pub hash: Digest,
    /// The storable body.
    #[serde(flatten)]
    pub body: Stored,
}

impl From<Canonical> for Stored {
    fn from(canonical: Canonical) -> Self {
        canonical.body
    }
}

/// A message, optionally attributed to a creator handle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    creator: Option<String>,
    body: Stored,
}

impl Message {
    /// Validate and build a message. An empty creator means anonymous.
    pub fn new(
        creator: Option<String>,
        subtype: impl Into<Subtype>,
        payload: impl Into<Payload>,
        created_at: CreatedAt,
    ) -> Result<Self, ValidationError> {
        let body = Stored::new(subtype.into(), payload.into(), created_at)?;
        Ok(Self::from_stored(creator, body))
    }

    /// Rebuild a message read back from a namespace.
    #[must_use]
    pub fn from_stored(creator: Option<String>, body: Stored) -> Self {
        Self {
            creator: creator.filter(|handle| !handle.is_empty()),
            body,
        }
    }

    /// A post or reply. The subtype is `Reply` iff `reference` is non-empty.
    pub fn post(
        creator: Option<String>,
        content: impl Into<String>,
        reference: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let reference = reference.into();
        let subtype = if reference.is_empty() {
            subtype::Post::Default
        } else {
            subtype::Post::Reply
        };
        let payload = payload::Post {
            content: content.into(),
            reference,
            ..payload::Post::default()
        };
        Self::new(creator, subtype, payload, CreatedAt::now())
    }

    /// A repost of `reference`.
    pub fn repost(
        creator: Option<String>,
        reference: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let payload = payload::Post {
            reference: reference.into(),
            ..payload::Post::default()
        };
        Self::new(creator, subtype::Post::Repost, payload, CreatedAt::now())
    }

    /// A moderation action on `reference`.
    pub fn moderation(
        creator: Option<String>,
        subtype: subtype::Moderation,
        reference: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let payload = payload::Moderation {
            reference: reference.into(),
        };
        Self::new(creator, subtype, payload, CreatedAt::now())
    }

    /// A profile update.
    pub fn profile(
        creator: Option<String>,
        subtype: subtype::Profile,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let payload = payload::Profile {
            key: key.into(),
            value: value.into(),
        };
        Self::new(creator, subtype, payload, CreatedAt::now())
    }

    /// The same content with the creator dropped.
    #[must_use]
    pub fn into_anonymous(self) -> Self {
        Self {
            creator: None,
            body: self.body,
        }
    }

    /// Creator handle, `None` when anonymous.
    #[must_use]
    pub fn creator(&self) -> Option<&str> {
        self.creator.as_deref()
    }

    /// Message kind.
    #[must_use]
    pub const fn kind(&self) -> Kind {
        self.body.subtype.kind()
    }

    /// Kind-scoped subtype.
    #[must_use]
    pub const fn subtype(&self) -> Subtype {
        self.body.subtype
    }

    /// Kind-specific fields.
    #[must_use]
    pub const fn payload(&self) -> &Payload {
        &self.body.payload
    }

    /// Creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> CreatedAt {
        self.body.created_at
    }

    /// The content address. Independent of the creator.
    #[must_use]
    pub fn digest(&self) -> Digest {
        self.body.digest()
    }

    /// `creator/hash`, or `hash` when anonymous.
    #[must_use]
    pub fn id(&self) -> Id {
        Id::new(self.creator.clone(), self.digest())
    }

    /// The body as written to storage.
    #[must_use]
    pub const fn stored(&self) -> &Stored {
        &self.body
    }

    /// Storage form plus the derived identifiers.
    #[must_use]
    pub fn canonical(&self) -> Canonical {
        Canonical {
            message_id: self.id().to_string(),
            hash: self.digest(),
            body: self.body.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    fn hello(creator: Option<&str>) -> Message {
        Message::new(
            creator.map(str::to_owned),
            subtype::Post::Default,
            payload::Post {
                content: "hello".into(),
                ..payload::Post::default()
            },
            CreatedAt::from(1_700_000_000_000),
        )
        .unwrap()
    }

    /// The digest ignores the creator, the id does not.
    #[test]
    fn digest_independent_of_creator() {
        let alice = hello(Some("alice"));
        let anon = hello(None);
        assert_eq!(alice.digest(), anon.digest());
        assert_eq!(alice.id().to_string(), format!("alice/{}", alice.digest()));
        assert_eq!(anon.id().to_string(), anon.digest().to_string());
    }

    /// JSON key order does not change the decoded body or its digest.
    #[test]
    fn key_order_irrelevant() {
        let a: Stored = serde_json::from_value(json!({
            "type": "POST", "subtype": "", "createdAt": 1_700_000_000_000_u64,
            "payload": {"content": "hello", "reference": ""}
        }))
        .unwrap();
        let b: Stored = serde_json::from_value(json!({
            "payload": {"reference": "", "content": "hello"},
            "createdAt": 1_700_000_000_000_u64, "subtype": "", "type": "POST"
        }))
        .unwrap();
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest(), hello(None).digest());
    }

    /// The stored form carries no derived identifiers and round-trips.
    #[test]
    fn stored_round_trip() {
        let message = hello(Some("alice"));
        let value = serde_json::to_value(message.stored()).unwrap();
        assert!(value.get("messageId").is_none());
        assert!(value.get("hash").is_none());
        assert_eq!(value["type"], "POST");
        assert_eq!(value["createdAt"], 1_700_000_000_000_u64);

        let back: Stored = serde_json::from_value(value).unwrap();
        let rebuilt = Message::from_stored(Some("alice".into()), back);
        assert_eq!(rebuilt, message);
        assert_eq!(rebuilt.digest(), message.digest());
    }

    /// The canonical form adds both identifiers around the flattened body.
    #[test]
    fn canonical_adds_identifiers() {
        let message = hello(Some("alice"));
        let value = serde_json::to_value(message.canonical()).unwrap();
        assert_eq!(value["messageId"], message.id().to_string());
        assert_eq!(value["hash"], message.digest().to_string());
        assert_eq!(value["payload"]["content"], "hello");

        let canonical: Canonical = serde_json::from_value(value).unwrap();
        assert_eq!(Stored::from(canonical), *message.stored());
    }

    #[test]
    fn constructors_validate() {
        assert_eq!(
            Message::post(None, "", "").unwrap_err(),
            ValidationError::EmptyContent(Subtype::Post(subtype::Post::Default))
        );
        assert_eq!(
            Message::repost(None, "").unwrap_err(),
            ValidationError::MissingReference(Subtype::Post(subtype::Post::Repost))
        );
        assert_eq!(
            Message::moderation(None, subtype::Moderation::Like, "").unwrap_err(),
            ValidationError::MissingReference(Subtype::Moderation(subtype::Moderation::Like))
        );
        let reply = Message::post(Some("bob".into()), "hi", "alice/00").unwrap();
        assert_eq!(reply.subtype(), Subtype::Post(subtype::Post::Reply));
        let name = Message::profile(None, subtype::Profile::Name, "", "Bob").unwrap();
        assert_eq!(name.kind(), Kind::Profile);
    }

    /// A moderation subtype with a post payload is rejected.
    #[test]
    fn payload_must_match_kind() {
        let err = Message::new(
            None,
            subtype::Moderation::Like,
            payload::Post::default(),
            CreatedAt::from(0),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::PayloadMismatch {
                subtype: Kind::Moderation,
                payload: Kind::Post,
            }
        );
    }

    /// Unknown subtypes and malformed payloads fail to decode.
    #[test]
    fn stored_decode_rejects() {
        let unknown = serde_json::from_value::<Stored>(json!({
            "type": "POST", "subtype": "LIKE", "createdAt": 0,
            "payload": {"content": "x"}
        }));
        assert!(unknown.is_err());
        let malformed = serde_json::from_value::<Stored>(json!({
            "type": "PROFILE", "subtype": "NAME", "createdAt": 0,
            "payload": {"key": 7}
        }));
        assert!(malformed.is_err());
    }

    proptest! {
        /// Repeated hashing is stable and the creator never leaks in.
        #[test]
        fn digest_stable(content in "[a-z ]{1,64}", creator in "[a-z]{1,12}", at in any::<u64>()) {
            let build = |creator: Option<String>| {
                Message::new(
                    creator,
                    subtype::Post::Default,
                    payload::Post { content: content.clone(), ..payload::Post::default() },
                    CreatedAt::from(at),
                )
            };
            let Ok(linked) = build(Some(creator)) else {
                // whitespace-only content is rejected
                return Ok(());
            };
            let anon = build(None).unwrap();
            prop_assert_eq!(linked.digest(), linked.digest());
            prop_assert_eq!(linked.digest(), anon.digest());
        }

        /// Any payload change moves the content address.
        #[test]
        fn digest_payload_sensitive(a in "[a-z]{1,32}", b in "[a-z]{1,32}") {
            prop_assume!(a != b);
            let at = CreatedAt::from(42);
            let first = Message::new(None, subtype::Post::Default, payload::Post { content: a, ..payload::Post::default() }, at).unwrap();
            let second = Message::new(None, subtype::Post::Default, payload::Post { content: b, ..payload::Post::default() }, at).unwrap();
            prop_assert_ne!(first.digest(), second.digest());
        }

        /// Field boundaries are framed: moving bytes between fields changes the digest.
        #[test]
        fn digest_framed(split in 1usize..8) {
            let text = "abcdefgh";
            let (head, tail) = text.split_at(split);
            let at = CreatedAt::from(0);
            let first = Message::new(None, subtype::Post::Reply, payload::Post { content: head.into(), reference: tail.into(), ..payload::Post::default() }, at).unwrap();
            let second = Message::new(None, subtype::Post::Reply, payload::Post { content: text.into(), reference: "x".into(), ..payload::Post::default() }, at).unwrap();
            prop_assert_ne!(first.digest(), second.digest());
        }
    }
}
