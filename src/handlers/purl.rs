//! OCI package URLs.
//!
//! Released images are identified by `pkg:oci/<name>@<digest>` purls whose
//! qualifiers carry the release repository, the tag and, for images built
//! as part of a multi-arch index, the architecture.

use crate::error::{ParseErrorKind, Result, SbomError};
use crate::model::Digest;
use packageurl::PackageUrl;
use serde_json::{json, Value};
use std::str::FromStr;

pub const PURL_TYPE: &str = "oci";

/// Builder for a release purl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OciPurl<'a> {
    repository: &'a str,
    digest: &'a Digest,
    arch: Option<&'a str>,
    tag: Option<&'a str>,
}

impl<'a> OciPurl<'a> {
    #[must_use]
    pub const fn new(repository: &'a str, digest: &'a Digest) -> Self {
        Self {
            repository,
            digest,
            arch: None,
            tag: None,
        }
    }

    #[must_use]
    pub const fn with_arch(mut self, arch: Option<&'a str>) -> Self {
        self.arch = arch;
        self
    }

    #[must_use]
    pub const fn with_tag(mut self, tag: Option<&'a str>) -> Self {
        self.tag = tag;
        self
    }

    /// Render the canonical purl string.
    pub fn build(&self) -> Result<String> {
        let name = self
            .repository
            .rsplit('/')
            .next()
            .unwrap_or(self.repository);

        let mut purl = PackageUrl::new(PURL_TYPE, name).map_err(|e| self.invalid(e))?;
        purl.with_version(self.digest.as_str());
        purl.add_qualifier("repository_url", self.repository)
            .map_err(|e| self.invalid(e))?;
        if let Some(arch) = self.arch {
            purl.add_qualifier("arch", arch).map_err(|e| self.invalid(e))?;
        }
        if let Some(tag) = self.tag {
            purl.add_qualifier("tag", tag).map_err(|e| self.invalid(e))?;
        }

        Ok(purl.to_string())
    }

    fn invalid(&self, err: packageurl::Error) -> SbomError {
        SbomError::parse(
            "release purl",
            ParseErrorKind::InvalidPurl {
                purl: format!("pkg:{PURL_TYPE}/{}@{}", self.repository, self.digest),
                reason: err.to_string(),
            },
        )
    }
}

/// `construct_purl(repository, digest, arch, tag)`.
pub fn construct_purl(
    repository: &str,
    digest: &Digest,
    arch: Option<&str>,
    tag: Option<&str>,
) -> Result<String> {
    OciPurl::new(repository, digest)
        .with_arch(arch)
        .with_tag(tag)
        .build()
}

/// The parts of an existing purl the rewrite cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurlInfo {
    pub name: String,
    pub version: Option<String>,
    pub arch: Option<String>,
    pub tag: Option<String>,
    pub repository_url: Option<String>,
}

/// Parse any purl, decoding its version and qualifiers.
pub fn parse_purl(locator: &str) -> Result<PurlInfo> {
    let purl = PackageUrl::from_str(locator).map_err(|e| {
        SbomError::parse(
            "purl",
            ParseErrorKind::InvalidPurl {
                purl: locator.to_string(),
                reason: e.to_string(),
            },
        )
    })?;

    let qualifier = |key: &str| purl.qualifiers().get(key).map(ToString::to_string);

    Ok(PurlInfo {
        name: purl.name().to_string(),
        version: purl.version().map(ToString::to_string),
        arch: qualifier("arch"),
        tag: qualifier("tag"),
        repository_url: qualifier("repository_url"),
    })
}

/// An SPDX `externalRefs` entry carrying a purl.
#[must_use]
pub fn make_purl_ref(purl: &str) -> Value {
    json!({
        "referenceCategory": "PACKAGE-MANAGER",
        "referenceType": "purl",
        "referenceLocator": purl,
    })
}
