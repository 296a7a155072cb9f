use core::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// A 32-byte content digest. Displays as 64 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; 32]);

impl Digest {
    /// Raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for Digest {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<Digest> for [u8; 32] {
    fn from(digest: Digest) -> Self {
        digest.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({self})")
    }
}

impl FromStr for Digest {
    type Err = ValidationError;

    fn from_str(encoded: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(encoded, &mut bytes)
            .map_err(|_err| ValidationError::MalformedMessageId(encoded.to_owned()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[expect(clippy::missing_trait_methods, reason = "serde default is sufficient")]
impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        encoded.parse().map_err(serde::de::Error::custom)
    }
}

/// Message id: `creator/hash`, or `hash` for anonymous messages.
///
/// Two messages with the same id are the same logical message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Id {
    creator: Option<String>,
    digest: Digest,
}

impl Id {
    /// Combine a creator handle and a digest. An empty handle means anonymous.
    #[must_use]
    pub fn new(creator: Option<String>, digest: Digest) -> Self {
        Self {
            creator: creator.filter(|handle| !handle.is_empty()),
            digest,
        }
    }

    /// Creator handle, if attributed.
    #[must_use]
    pub fn creator(&self) -> Option<&str> {
        self.creator.as_deref()
    }

    /// Content digest.
    #[must_use]
    pub const fn digest(&self) -> Digest {
        self.digest
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.creator {
            Some(creator) => write!(f, "{creator}/{}", self.digest),
            None => write!(f, "{}", self.digest),
        }
    }
}

impl FromStr for Id {
    type Err = ValidationError;

    fn from_str(id: &str) -> Result<Self, Self::Err> {
        let malformed = || ValidationError::MalformedMessageId(id.to_owned());
        match id.rsplit_once('/') {
            Some(("", _)) => Err(malformed()),
            Some((creator, hash)) => Ok(Self {
                creator: Some(creator.to_owned()),
                digest: hash.parse().map_err(|_err| malformed())?,
            }),
            None => Ok(Self {
                creator: None,
                digest: id.parse().map_err(|_err| malformed())?,
            }),
        }
    }
}
