//! Writing rewritten documents and reports.

use crate::error::{Result, SbomError};
use crate::model::Digest;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Target for textual output - either stdout or a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

impl OutputTarget {
    #[must_use]
    pub fn from_option(path: Option<PathBuf>) -> Self {
        path.map_or(Self::Stdout, Self::File)
    }
}

/// Write `content` to the target.
pub async fn write_output(content: &str, target: &OutputTarget) -> Result<()> {
    match target {
        OutputTarget::Stdout => {
            println!("{content}");
            Ok(())
        }
        OutputTarget::File(path) => {
            tokio::fs::write(path, content)
                .await
                .map_err(|e| SbomError::io(path, e))?;
            tracing::info!("Wrote {}", path.display());
            Ok(())
        }
    }
}

/// Create the destination directory if needed.
pub async fn ensure_destination(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| SbomError::io(dir, e))
}

/// Where the rewritten SBOM for `digest` is stored.
#[must_use]
pub fn document_path(dir: &Path, digest: &Digest) -> PathBuf {
    dir.join(digest.as_str())
}

/// Serialize `document` compactly to `<dir>/<digest>`.
pub async fn write_document(dir: &Path, digest: &Digest, document: &Value) -> Result<PathBuf> {
    let path = document_path(dir, digest);
    let bytes = serde_json::to_vec(document)?;
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| SbomError::io(&path, e))?;
    Ok(path)
}
