//! Registry credential scoping.
//!
//! External tools are never handed the full credential store. For every
//! invocation the store is narrowed to the single entry that best matches
//! the image reference, re-keyed by the bare registry host, and written to
//! a private scratch directory that is removed when the operation ends.

use crate::error::{ErrorContext, Result, SbomError};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// File name tools expect inside a docker config directory.
pub const AUTH_FILE_NAME: &str = "config.json";

#[derive(Debug, Default, Deserialize)]
struct DockerConfig {
    #[serde(default)]
    auths: IndexMap<String, Value>,
}

/// A multi-registry credential store (`{"auths": {"<host[/path]>": ...}}`).
///
/// Credentials are opaque: they are copied into scoped artifacts verbatim
/// and never inspected or logged.
#[derive(Default)]
pub struct AuthStore {
    auths: IndexMap<String, Value>,
}

impl fmt::Debug for AuthStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthStore")
            .field("entries", &self.auths.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl AuthStore {
    /// Load a credential store from disk.
    ///
    /// A missing or unreadable file is a configuration error, malformed JSON
    /// a parse error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(SbomError::config(format!(
                "No docker config file at {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            SbomError::config(format!(
                "Failed to read docker config file {}: {e}",
                path.display()
            ))
        })?;

        Self::from_json(&content).with_context(|| format!("credential store {}", path.display()))
    }

    /// Parse a credential store from JSON text.
    pub fn from_json(content: &str) -> Result<Self> {
        let config: DockerConfig = serde_json::from_str(content)?;
        Ok(Self {
            auths: config.auths,
        })
    }

    /// Build a store from `(path, credential)` pairs.
    pub fn from_entries<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self {
            auths: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.auths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.auths.is_empty()
    }

    /// Narrow the store to the entry covering `reference`.
    ///
    /// The digest suffix is dropped, then the reference path is tested
    /// against the store from the most specific form down to the bare
    /// registry, removing one path segment per step. The first hit wins,
    /// which makes this a longest-prefix match on segment boundaries.
    #[must_use]
    pub fn scope_for(&self, reference: &str) -> ScopedAuth {
        let reference = reference
            .split_once('@')
            .map_or(reference, |(repository, _)| repository);
        let registry = reference.split('/').next().unwrap_or(reference);

        let mut current = reference;
        loop {
            if let Some(credential) = self.auths.get(current) {
                tracing::debug!("Using credentials for {} (matched {})", registry, current);
                return ScopedAuth {
                    registry: registry.to_string(),
                    matched: Some(current.to_string()),
                    credential: Some(credential.clone()),
                };
            }

            match current.rsplit_once('/') {
                Some((parent, _)) => current = parent,
                None => break,
            }
        }

        ScopedAuth {
            registry: registry.to_string(),
            matched: None,
            credential: None,
        }
    }
}

/// The result of narrowing a store to one reference.
#[derive(Clone)]
pub struct ScopedAuth {
    registry: String,
    matched: Option<String>,
    credential: Option<Value>,
}

impl fmt::Debug for ScopedAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedAuth")
            .field("registry", &self.registry)
            .field("matched", &self.matched)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ScopedAuth {
    /// Whether any store entry covered the reference.
    #[must_use]
    pub const fn is_found(&self) -> bool {
        self.credential.is_some()
    }

    /// Registry host the artifact is keyed by.
    #[must_use]
    pub fn registry(&self) -> &str {
        &self.registry
    }

    /// Store key that matched, if any.
    #[must_use]
    pub fn matched(&self) -> Option<&str> {
        self.matched.as_deref()
    }

    /// The single-entry docker config document, or `{"auths": {}}`.
    #[must_use]
    pub fn to_config_json(&self) -> Value {
        let mut auths = Map::new();
        if let Some(credential) = &self.credential {
            auths.insert(self.registry.clone(), credential.clone());
        }
        json!({ "auths": auths })
    }

    /// Serialize the scoped artifact into `sink`.
    pub fn write_to<W: Write>(&self, mut sink: W) -> Result<()> {
        serde_json::to_writer(&mut sink, &self.to_config_json())?;
        sink.flush()?;
        Ok(())
    }
}

/// Write the scoped credential artifact for `reference` into `sink`.
///
/// Returns whether a matching entry was found. A miss still writes an empty
/// credential set and is not an error; callers decide whether anonymous
/// access is acceptable.
pub fn write_scoped_auth<W: Write>(store: &AuthStore, reference: &str, sink: W) -> Result<bool> {
    let scoped = store.scope_for(reference);
    scoped.write_to(sink)?;
    Ok(scoped.is_found())
}

/// A scoped credential artifact materialized on disk.
///
/// Every acquisition gets its own private temporary directory containing a
/// `config.json`, so concurrent invocations never share scratch files. The
/// directory is deleted by [`ScopedAuthFile::release`] or, on any other exit
/// path, when the guard is dropped.
pub struct ScopedAuthFile {
    dir: TempDir,
    reference: String,
    found: bool,
}

impl fmt::Debug for ScopedAuthFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedAuthFile")
            .field("dir", &self.dir.path())
            .field("reference", &self.reference)
            .field("found", &self.found)
            .finish()
    }
}

impl ScopedAuthFile {
    /// Create the scratch directory and write the scoped artifact into it.
    pub fn acquire(store: &AuthStore, reference: &str) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("component-sbom-auth-")
            .tempdir()
            .map_err(|e| SbomError::io(std::env::temp_dir(), e))?;

        let path = dir.path().join(AUTH_FILE_NAME);
        let file = std::fs::File::create(&path).map_err(|e| SbomError::io(&path, e))?;
        let found = write_scoped_auth(store, reference, std::io::BufWriter::new(file))?;

        Ok(Self {
            dir,
            reference: reference.to_string(),
            found,
        })
    }

    /// [`acquire`](Self::acquire) on the blocking thread pool, so the
    /// filesystem work does not stall other units on the runtime.
    pub async fn acquire_async(store: &Arc<AuthStore>, reference: &str) -> Result<Self> {
        let store = Arc::clone(store);
        let reference = reference.to_string();
        tokio::task::spawn_blocking(move || Self::acquire(&store, &reference))
            .await
            .map_err(|e| SbomError::io(std::env::temp_dir(), std::io::Error::other(e)))?
    }

    /// Whether the artifact carries a credential.
    #[must_use]
    pub const fn is_found(&self) -> bool {
        self.found
    }

    /// Fail with a configuration error if no credential was found and
    /// anonymous access is not allowed.
    pub fn ensure_found(&self, required: bool) -> Result<()> {
        if self.found {
            return Ok(());
        }
        if required {
            return Err(SbomError::config(format!(
                "Could not find auth for {}",
                self.reference
            )));
        }
        tracing::debug!("No credentials for {}, proceeding anonymously", self.reference);
        Ok(())
    }

    /// Directory to use as `DOCKER_CONFIG`.
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Path of the `config.json` inside the scratch directory.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join(AUTH_FILE_NAME)
    }

    /// [`release`](Self::release) on the blocking thread pool.
    pub async fn release_async(self) {
        if let Err(e) = tokio::task::spawn_blocking(move || self.release()).await {
            tracing::warn!("Credential cleanup task failed: {}", e);
        }
    }

    /// Delete the artifact now, reporting cleanup failures.
    pub fn release(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            tracing::warn!("Failed to remove credential scratch dir {}: {}", path.display(), e);
        }
    }
}
