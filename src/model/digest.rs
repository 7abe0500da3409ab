//! Content-addressed digests.

use crate::error::{ParseErrorKind, SbomError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Algorithm prefix carried by every digest this crate accepts.
pub const SHA256_PREFIX: &str = "sha256:";

/// A `sha256:<lowercase hex>` manifest digest.
///
/// The hex length is not fixed at 64 so that abbreviated digests used in
/// fixtures and tests remain valid; only the alphabet is enforced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, JsonSchema)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    /// Parse and validate a digest string.
    pub fn parse(value: &str) -> Result<Self, SbomError> {
        let hex = value
            .strip_prefix(SHA256_PREFIX)
            .filter(|hex| !hex.is_empty())
            .ok_or_else(|| invalid_digest(value))?;

        if !hex
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            return Err(invalid_digest(value));
        }

        Ok(Self(value.to_string()))
    }

    /// Full digest string including the algorithm prefix.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hex part of the digest, as recorded in SPDX `checksumValue` fields.
    #[must_use]
    pub fn hex(&self) -> &str {
        self.0.strip_prefix(SHA256_PREFIX).unwrap_or(&self.0)
    }
}

fn invalid_digest(value: &str) -> SbomError {
    SbomError::parse("digest", ParseErrorKind::InvalidDigest(value.to_string()))
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Digest {
    type Err = SbomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
