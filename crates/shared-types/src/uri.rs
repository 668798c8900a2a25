//! # URI Model
//!
//! URIs have the form `scheme://authority[/path]`. The `scheme://authority`
//! pair is the *program key* and selects the validator for a write; the path
//! identifies an individual record under that program.
//!
//! Content-addressed programs append the hash to the authority after a
//! colon (`hash://sha256:{hex}`). The colon suffix is *not* part of the
//! program key, so a single registry entry (`hash://sha256`) covers every
//! content address.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Errors produced when parsing a URI string.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UriError {
    /// The string has no `://` separator.
    #[error("invalid uri {0:?}: missing '://' separator")]
    MissingSeparator(String),

    /// The scheme before `://` is empty.
    #[error("invalid uri {0:?}: empty scheme")]
    EmptyScheme(String),

    /// The authority after `://` is empty.
    #[error("invalid uri {0:?}: empty authority")]
    EmptyAuthority(String),
}

/// A parsed `scheme://authority[/path]` URI.
///
/// Stored as the original string plus the separator offset, so `as_str`
/// round-trips exactly what was parsed.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uri {
    raw: String,
    /// Byte offset of the `://` separator.
    sep: usize,
}

impl Uri {
    /// Parse a URI string.
    ///
    /// Requires a non-empty scheme, the `://` separator, and a non-empty
    /// authority. The path (everything after the first `/` past the
    /// authority) may be absent and is treated as an opaque string;
    /// reserved characters are expected to arrive percent-encoded.
    pub fn parse(s: &str) -> Result<Self, UriError> {
        let sep = s
            .find("://")
            .ok_or_else(|| UriError::MissingSeparator(s.to_string()))?;
        if sep == 0 {
            return Err(UriError::EmptyScheme(s.to_string()));
        }
        let rest = &s[sep + 3..];
        let authority_end = rest.find('/').unwrap_or(rest.len());
        if authority_end == 0 {
            return Err(UriError::EmptyAuthority(s.to_string()));
        }
        Ok(Self {
            raw: s.to_string(),
            sep,
        })
    }

    /// The full URI string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The scheme (before `://`).
    pub fn scheme(&self) -> &str {
        &self.raw[..self.sep]
    }

    /// The authority (between `://` and the first `/`), including any
    /// content-hash suffix after a colon.
    pub fn authority(&self) -> &str {
        let rest = &self.raw[self.sep + 3..];
        match rest.find('/') {
            Some(end) => &rest[..end],
            None => rest,
        }
    }

    /// The path after the authority, without the leading `/`.
    pub fn path(&self) -> Option<&str> {
        let rest = &self.raw[self.sep + 3..];
        rest.find('/').map(|end| &rest[end + 1..])
    }

    /// The program key: `scheme://authority`, with any colon suffix on the
    /// authority stripped (`hash://sha256:{hex}` → `hash://sha256`).
    pub fn program_key(&self) -> ProgramKey {
        let authority = self.authority();
        let base = match authority.find(':') {
            Some(end) => &authority[..end],
            None => authority,
        };
        ProgramKey(format!("{}://{}", self.scheme(), base))
    }

    /// The content-hash suffix of the authority, if any
    /// (`hash://sha256:{hex}` → `Some(hex)`).
    pub fn hash_suffix(&self) -> Option<&str> {
        let authority = self.authority();
        authority.find(':').map(|end| &authority[end + 1..])
    }

    /// Append a path segment, inserting `/` as needed.
    pub fn join(&self, segment: &str) -> Uri {
        let raw = if self.raw.ends_with('/') {
            format!("{}{}", self.raw, segment)
        } else {
            format!("{}/{}", self.raw, segment)
        };
        Uri { raw, sep: self.sep }
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl fmt::Debug for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uri({})", self.raw)
    }
}

impl std::str::FromStr for Uri {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uri::parse(s)
    }
}

impl Serialize for Uri {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Uri {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Uri::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A `scheme://authority` pair; the unit of validator registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProgramKey(String);

impl ProgramKey {
    /// Build a program key from a `scheme://authority` string.
    ///
    /// The string is normalized through URI parsing, so colon suffixes are
    /// stripped the same way [`Uri::program_key`] strips them.
    pub fn parse(s: &str) -> Result<Self, UriError> {
        Ok(Uri::parse(s)?.program_key())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProgramKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
