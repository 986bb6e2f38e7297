//! Static asset lookup for the interactive UIs.
//!
//! # Responsibilities
//! - Resolve a path relative to the static root to bytes and a content type
//! - Report missing files distinctly from I/O faults
//!
//! # Design Decisions
//! - Stores are injected into the handler; there is no process-wide asset box
//! - Lookups are synchronous; the handler runs them on the blocking pool
//! - Paths escaping the root (`..`, absolute) are reported as not found

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use axum::body::Bytes;

/// A resolved static file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub bytes: Bytes,
    pub content_type: String,
}

impl Asset {
    pub fn new(path: &str, bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let content_type = guess_content_type(path, &bytes);
        Self {
            bytes,
            content_type,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    NotFound(String),

    #[error("failed to read asset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Finds static assets by path relative to the static root.
pub trait AssetStore: Send + Sync {
    fn find(&self, path: &str) -> Result<Asset, AssetError>;
}

/// Serves files from a directory on disk.
#[derive(Debug, Clone)]
pub struct DirAssetStore {
    root: PathBuf,
}

impl DirAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetStore for DirAssetStore {
    fn find(&self, path: &str) -> Result<Asset, AssetError> {
        let relative = Path::new(path);
        let escapes_root = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if path.is_empty() || escapes_root {
            return Err(AssetError::NotFound(path.to_owned()));
        }

        let full = self.root.join(relative);
        if !full.is_file() {
            return Err(AssetError::NotFound(path.to_owned()));
        }

        match std::fs::read(&full) {
            Ok(bytes) => Ok(Asset::new(path, bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(AssetError::NotFound(path.to_owned()))
            }
            Err(source) => Err(AssetError::Io {
                path: path.to_owned(),
                source,
            }),
        }
    }
}

/// Serves assets held in memory, e.g. bytes embedded with `include_bytes!`.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetStore {
    assets: HashMap<String, Bytes>,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset(mut self, path: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        self.insert(path, bytes);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: impl Into<Bytes>) {
        self.assets.insert(path.into(), bytes.into());
    }
}

impl AssetStore for MemoryAssetStore {
    fn find(&self, path: &str) -> Result<Asset, AssetError> {
        self.assets
            .get(path)
            .map(|bytes| Asset::new(path, bytes.clone()))
            .ok_or_else(|| AssetError::NotFound(path.to_owned()))
    }
}

/// Content type by extension, falling back to a look at the bytes.
pub fn guess_content_type(path: &str, bytes: &[u8]) -> String {
    if let Some(mime) = mime_guess::from_path(path).first() {
        return mime.to_string();
    }
    let head = &bytes[..bytes.len().min(1024)];
    if std::str::from_utf8(head).is_ok() {
        "text/plain; charset=utf-8".to_string()
    } else {
        "application/octet-stream".to_string()
    }
}
