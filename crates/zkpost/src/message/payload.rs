//! Kind-specific payload shapes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Kind;

/// Payload of a post.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Markdown body.
    #[serde(default)]
    pub content: String,
    /// Message id of the parent or reposted message. Empty for top-level.
    #[serde(default)]
    pub reference: String,
    /// Optional topic tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Optional attachment URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
}

/// Payload of a moderation action.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Moderation {
    /// Message id being moderated.
    #[serde(default)]
    pub reference: String,
}

/// Payload of a profile update.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Profile key; meaningful for custom updates.
    #[serde(default)]
    pub key: String,
    /// New value.
    pub value: String,
}

/// Payload tagged by kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    /// Post payload.
    Post(Post),
    /// Moderation payload.
    Moderation(Moderation),
    /// Profile payload.
    Profile(Profile),
}

impl Payload {
    /// Kind this payload belongs to.
    #[must_use]
    pub const fn kind(&self) -> Kind {
        match self {
            Self::Post(_) => Kind::Post,
            Self::Moderation(_) => Kind::Moderation,
            Self::Profile(_) => Kind::Profile,
        }
    }

    /// Referenced message id, for the kinds that carry one.
    #[must_use]
    pub fn reference(&self) -> Option<&str> {
        match self {
            Self::Post(post) => Some(post.reference.as_str()),
            Self::Moderation(moderation) => Some(moderation.reference.as_str()),
            Self::Profile(_) => None,
        }
        .filter(|reference| !reference.is_empty())
    }

    /// Decode a JSON payload object for `kind`.
    pub(crate) fn from_value(kind: Kind, value: Value) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            Kind::Post => Self::Post(serde_json::from_value(value)?),
            Kind::Moderation => Self::Moderation(serde_json::from_value(value)?),
            Kind::Profile => Self::Profile(serde_json::from_value(value)?),
        })
    }

    /// JSON payload object, with absent optionals omitted.
    pub(crate) fn to_value(&self) -> Value {
        let mut map = Map::new();
        match self {
            Self::Post(post) => {
                map.insert("content".into(), post.content.clone().into());
                map.insert("reference".into(), post.reference.clone().into());
                if let Some(topic) = &post.topic {
                    map.insert("topic".into(), topic.clone().into());
                }
                if let Some(attachment) = &post.attachment {
                    map.insert("attachment".into(), attachment.clone().into());
                }
            }
            Self::Moderation(moderation) => {
                map.insert("reference".into(), moderation.reference.clone().into());
            }
            Self::Profile(profile) => {
                map.insert("key".into(), profile.key.clone().into());
                map.insert("value".into(), profile.value.clone().into());
            }
        }
        Value::Object(map)
    }

    /// Feed the payload fields, in fixed order, to a digest transcript.
    pub(crate) fn absorb(&self, transcript: &mut impl FnMut(&[u8])) {
        let mut optional = |field: Option<&String>| match field {
            Some(value) => {
                transcript(&[1]);
                transcript(value.as_bytes());
            }
            None => transcript(&[0]),
        };
        match self {
            Self::Post(post) => {
                optional(Some(&post.content));
                optional(Some(&post.reference));
                optional(post.topic.as_ref());
                optional(post.attachment.as_ref());
            }
            Self::Moderation(moderation) => optional(Some(&moderation.reference)),
            Self::Profile(profile) => {
                optional(Some(&profile.key));
                optional(Some(&profile.value));
            }
        }
    }
}

impl From<Post> for Payload {
    fn from(post: Post) -> Self {
        Self::Post(post)
    }
}

impl From<Moderation> for Payload {
    fn from(moderation: Moderation) -> Self {
        Self::Moderation(moderation)
    }
}

impl From<Profile> for Payload {
    fn from(profile: Profile) -> Self {
        Self::Profile(profile)
    }
}
