//! Async read and atomic write of config documents.

use std::io;
use std::path::{Path, PathBuf};

use brandcfg_core::document::{ConfigDocument, DocumentError};
use tokio::fs;

use crate::fsops;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The file does not exist. Callers that create documents substitute an
    /// empty one; everyone else reports it.
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// On-disk content that cannot be parsed even after normalization.
    #[error("Malformed config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: DocumentError,
    },

    #[error("Failed to serialize {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: DocumentError,
    },
}

impl CodecError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Read and parse the document at `path`.
pub async fn read(path: &Path) -> Result<ConfigDocument, CodecError> {
    let text = match fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(CodecError::NotFound(path.to_path_buf()))
        }
        Err(source) => {
            return Err(CodecError::Io {
                action: "read",
                path: path.to_path_buf(),
                source,
            })
        }
    };
    ConfigDocument::parse(&text).map_err(|source| CodecError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Like [`read`], but a missing file yields an empty document. Parse
/// failures are still errors.
pub async fn read_or_empty(path: &Path) -> Result<ConfigDocument, CodecError> {
    match read(path).await {
        Err(CodecError::NotFound(_)) => Ok(ConfigDocument::new()),
        other => other,
    }
}

/// Render `doc` and replace the file at `path` atomically.
pub async fn write(doc: &ConfigDocument, path: &Path) -> Result<(), CodecError> {
    let text = doc.render().map_err(|source| CodecError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    fsops::write_atomic(path, text.as_bytes())
        .await
        .map_err(|e| CodecError::Io {
            action: e.action,
            path: e.path,
            source: e.source,
        })
}
