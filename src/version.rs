//! Version resolution for a publish.
//!
//! A publish reads the record's current version once, as its base, and
//! writes every artifact under `base + 1`. When the caller supplies no new
//! file, the stored original of the base version is fetched and reused, so
//! re-edits never work from a derivative.
//!
//! Nothing here locks the record. Two concurrent edits of one id can both
//! resolve the same base; the commit policy decides what happens then.

use crate::storage::{BlobError, BlobStore};
use crate::types::{ArtifactKind, PhotoRecord, artifact_name};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum VersionError {
    #[error("Photo {0} has no published original to reuse")]
    NoOriginal(String),
    #[error("Failed to fetch original {name}: {source}")]
    Fetch {
        name: String,
        #[source]
        source: BlobError,
    },
}

/// A file supplied with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub path: PathBuf,
    /// Name the client gave the file.
    pub filename: String,
}

/// The image a publish works from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub image: PathBuf,
    pub filename: Option<String>,
    pub base_version: u64,
}

impl ResolvedSource {
    pub fn target(&self, id: &str) -> PublishTarget {
        PublishTarget {
            id: id.to_string(),
            version: self.base_version + 1,
        }
    }
}

/// The `(id, version)` every artifact of one publish is named under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishTarget {
    pub id: String,
    pub version: u64,
}

impl PublishTarget {
    pub fn artifact_name(&self, kind: ArtifactKind) -> String {
        artifact_name(&self.id, self.version, kind)
    }
}

/// Pick the source image for a publish of `record`.
///
/// With an upload the file is used as-is. Without one, the original of the
/// record's current version is downloaded into `scratch`.
pub fn resolve_source(
    blobs: &impl BlobStore,
    record: &PhotoRecord,
    upload: Option<&Upload>,
    scratch: &Path,
) -> Result<ResolvedSource, VersionError> {
    if let Some(upload) = upload {
        return Ok(ResolvedSource {
            image: upload.path.clone(),
            filename: Some(upload.filename.clone()),
            base_version: record.version,
        });
    }

    if record.version == 0 {
        return Err(VersionError::NoOriginal(record.id.clone()));
    }

    let name = record.artifact_name(ArtifactKind::Original);
    let image = scratch.join(&name);
    blobs
        .download(&name, &image)
        .map_err(|source| VersionError::Fetch {
            name: name.clone(),
            source,
        })?;
    debug!(id = %record.id, version = record.version, %name, "reusing stored original");

    Ok(ResolvedSource {
        image,
        filename: record.filename.clone(),
        base_version: record.version,
    })
}
