//! Image binaries.
//!
//! Records only keep opaque references; the bytes live in a `BlobStore`. `FsBlobStore` keeps
//! them under a directory on disk and hands out URLs served by `services::images`.

use chrono::Utc;
use regex::Regex;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

/// Prefix of every image reference.
pub const IMAGE_PREFIX: &str = "object-images";

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("invalid blob reference: {0}")]
    InvalidReference(String),
    #[error("blob not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub trait BlobStore: Send + Sync {
    /// Stores `bytes` under `path` and returns the reference to keep on the record.
    fn upload(&self, path: &str, bytes: &[u8]) -> Result<String, BlobError>;

    /// URL under which clients can fetch the blob.
    fn resolve(&self, reference: &str) -> Result<String, BlobError>;

    fn read(&self, reference: &str) -> Result<Vec<u8>, BlobError>;

    fn delete(&self, reference: &str) -> Result<(), BlobError>;
}

/// Builds the storage path for a newly uploaded image: `object-images/{millis}-{filename}`.
pub fn image_path(filename: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let unsafe_chars =
        UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("static regex"));
    let name = unsafe_chars.replace_all(filename.trim(), "_");
    let name = name.trim_start_matches('.');
    let name = if name.is_empty() { "image" } else { name };
    format!(
        "{}/{}-{}",
        IMAGE_PREFIX,
        Utc::now().timestamp_millis(),
        name
    )
}

pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, BlobError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(FsBlobStore { root })
    }

    /// Maps a reference to a file below the root, refusing anything that could escape it.
    fn locate(&self, reference: &str) -> Result<PathBuf, BlobError> {
        let relative = Path::new(reference);
        let plain = !reference.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !plain {
            return Err(BlobError::InvalidReference(reference.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl BlobStore for FsBlobStore {
    fn upload(&self, path: &str, bytes: &[u8]) -> Result<String, BlobError> {
        let target = self.locate(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, bytes)?;
        Ok(path.to_string())
    }

    fn resolve(&self, reference: &str) -> Result<String, BlobError> {
        self.locate(reference)?;
        Ok(format!("/api/images/{}", reference))
    }

    fn read(&self, reference: &str) -> Result<Vec<u8>, BlobError> {
        let target = self.locate(reference)?;
        fs::read(&target).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => BlobError::NotFound(reference.to_string()),
            _ => BlobError::Io(e),
        })
    }

    fn delete(&self, reference: &str) -> Result<(), BlobError> {
        let target = self.locate(reference)?;
        fs::remove_file(&target).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => BlobError::NotFound(reference.to_string()),
            _ => BlobError::Io(e),
        })
    }
}
