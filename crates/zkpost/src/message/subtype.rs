//! Subtypes, scoped to their message kind.

use core::fmt;

use super::Kind;
use crate::error::ValidationError;

/// Post subtypes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Post {
    /// Top-level post. Wire tag is the empty string.
    Default,
    /// Reply to `reference`.
    Reply,
    /// Repost of `reference`. Carries no content of its own.
    Repost,
    /// Post mirrored from an external network.
    MirrorPost,
    /// Reply mirrored from an external network.
    MirrorReply,
}

impl Post {
    const ALL: [Self; 5] = [
        Self::Default,
        Self::Reply,
        Self::Repost,
        Self::MirrorPost,
        Self::MirrorReply,
    ];

    /// Wire tag.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Default => "",
            Self::Reply => "REPLY",
            Self::Repost => "REPOST",
            Self::MirrorPost => "M_POST",
            Self::MirrorReply => "M_REPLY",
        }
    }
}

/// Moderation subtypes. Every moderation targets a `reference`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Moderation {
    /// Like the referenced post.
    Like,
    /// Block replies in a thread.
    Block,
    /// Hide blocked replies in a thread.
    ThreadHideBlock,
    /// Thread-wide moderation policy.
    Global,
}

impl Moderation {
    const ALL: [Self; 4] = [Self::Like, Self::Block, Self::ThreadHideBlock, Self::Global];

    /// Wire tag.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Like => "LIKE",
            Self::Block => "BLOCK",
            Self::ThreadHideBlock => "THREAD_HIDE_BLOCK",
            Self::Global => "GLOBAL",
        }
    }
}

/// Profile subtypes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Profile {
    /// Free-form key.
    Custom,
    /// Display name.
    Name,
    /// Biography.
    Bio,
    /// Avatar image URL.
    ProfileImage,
    /// Cover image URL.
    CoverImage,
    /// Personal website.
    Website,
    /// Twitter verification link.
    TwitterVerification,
    /// Group membership flag.
    Group,
}

impl Profile {
    const ALL: [Self; 8] = [
        Self::Custom,
        Self::Name,
        Self::Bio,
        Self::ProfileImage,
        Self::CoverImage,
        Self::Website,
        Self::TwitterVerification,
        Self::Group,
    ];

    /// Wire tag.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Custom => "CUSTOM",
            Self::Name => "NAME",
            Self::Bio => "BIO",
            Self::ProfileImage => "PROFILE_IMAGE",
            Self::CoverImage => "COVER_IMAGE",
            Self::Website => "WEBSITE",
            Self::TwitterVerification => "TWT_VERIFICATION",
            Self::Group => "GROUP",
        }
    }
}

/// A subtype refined by its kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Subtype {
    /// Subtype of a [`Kind::Post`] message.
    Post(Post),
    /// Subtype of a [`Kind::Moderation`] message.
    Moderation(Moderation),
    /// Subtype of a [`Kind::Profile`] message.
    Profile(Profile),
}

impl Subtype {
    /// Parse a wire tag in the scope of `kind`.
    pub fn parse(kind: Kind, tag: &str) -> Result<Self, ValidationError> {
        let found = match kind {
            Kind::Post => Post::ALL.into_iter().find(|s| s.tag() == tag).map(Self::Post),
            Kind::Moderation => Moderation::ALL
                .into_iter()
                .find(|s| s.tag() == tag)
                .map(Self::Moderation),
            Kind::Profile => Profile::ALL
                .into_iter()
                .find(|s| s.tag() == tag)
                .map(Self::Profile),
        };
        found.ok_or_else(|| ValidationError::UnknownSubtype {
            kind,
            subtype: tag.to_owned(),
        })
    }

    /// The kind this subtype belongs to.
    #[must_use]
    pub const fn kind(self) -> Kind {
        match self {
            Self::Post(_) => Kind::Post,
            Self::Moderation(_) => Kind::Moderation,
            Self::Profile(_) => Kind::Profile,
        }
    }

    /// Wire tag.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Post(post) => post.tag(),
            Self::Moderation(moderation) => moderation.tag(),
            Self::Profile(profile) => profile.tag(),
        }
    }

    /// Whether the payload must name another message.
    pub(crate) const fn needs_reference(self) -> bool {
        matches!(
            self,
            Self::Post(Post::Reply | Post::Repost | Post::MirrorReply) | Self::Moderation(_)
        )
    }

    /// Whether the payload must carry user text.
    pub(crate) const fn needs_content(self) -> bool {
        matches!(self, Self::Post(Post::Default | Post::Reply))
    }
}

impl fmt::Display for Subtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag() {
            "" => write!(f, "{}", self.kind()),
            tag => write!(f, "{}/{tag}", self.kind()),
        }
    }
}

impl From<Post> for Subtype {
    fn from(post: Post) -> Self {
        Self::Post(post)
    }
}

impl From<Moderation> for Subtype {
    fn from(moderation: Moderation) -> Self {
        Self::Moderation(moderation)
    }
}

impl From<Profile> for Subtype {
    fn from(profile: Profile) -> Self {
        Self::Profile(profile)
    }
}
