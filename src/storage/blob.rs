//! Artifact object storage.
//!
//! Objects are addressed by flat names (`{id}_{version}-{kind}.jpeg`). A
//! store also knows the public URL an object is served from.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum BlobError {
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Invalid object name: {0:?}")]
    InvalidName(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BlobError>;

/// Named object storage for artifacts.
pub trait BlobStore: Send + Sync {
    /// Store the file at `local` under `name`, replacing any existing object.
    fn upload(&self, local: &Path, name: &str, content_type: &str) -> Result<()>;

    /// Copy the object `name` into the local file `dest`.
    fn download(&self, name: &str, dest: &Path) -> Result<()>;

    /// Names of every stored object, sorted.
    fn list(&self) -> Result<Vec<String>>;

    /// Remove `name`. Removing a missing object is not an error.
    fn delete(&self, name: &str) -> Result<()>;

    /// Publicly resolvable URL of `name`.
    fn public_url(&self, name: &str) -> String;
}

/// `{base}/{name}` with exactly one slash between.
pub fn join_url(base: &str, name: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), name)
}

/// Reject names that would escape a flat namespace.
pub fn validate_name(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\');
    if bad {
        return Err(BlobError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Objects stored as files in one directory, named exactly as their keys.
pub struct LocalBlobStore {
    root: PathBuf,
    public_base: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }
}

impl BlobStore for LocalBlobStore {
    fn upload(&self, local: &Path, name: &str, content_type: &str) -> Result<()> {
        let dest = self.object_path(name)?;
        std::fs::create_dir_all(&self.root)?;
        // Stage under a unique hidden name so readers never see a partial object
        let mut staged = tempfile::NamedTempFile::new_in(&self.root)?;
        let mut source = std::fs::File::open(local)?;
        std::io::copy(&mut source, staged.as_file_mut())?;
        staged.persist(&dest).map_err(|e| e.error)?;
        debug!(name, content_type, "object stored");
        Ok(())
    }

    fn download(&self, name: &str, dest: &Path) -> Result<()> {
        let src = self.object_path(name)?;
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(&src, dest).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BlobError::NotFound(name.to_string())
            } else {
                BlobError::Io(e)
            }
        })?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with('.') {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    fn delete(&self, name: &str) -> Result<()> {
        match std::fs::remove_file(self.object_path(name)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn public_url(&self, name: &str) -> String {
        join_url(&self.public_base, name)
    }
}
