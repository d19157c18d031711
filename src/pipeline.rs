//! The publish pipeline and the caller-facing photo operations.
//!
//! ```text
//! validate ─► record (filters)   ─► resolve source ─┬─► upload original ───────────────┐
//!                                                   └─► annotate ─► select ─► mask ─►   │
//!                                                       transform ─┬─► upload full-size ┤
//!                                                                  └─► upload thumbnail ┴─► commit
//! ```
//!
//! Everything before the record mutation is validation: a request that fails
//! there leaves no trace. The mutation itself only writes filters, so after
//! it any failure leaves the record at its previous status and version with
//! that version's artifacts untouched. A brand-new record stays `uploading`
//! at version 0. The commit is the only step that makes a version visible
//! and it runs exactly once.
//!
//! Collaborators are injected, so tests run the whole flow against fakes.

use crate::annotation::{AnnotationError, Annotator};
use crate::color::dominant_color;
use crate::config::{CommitPolicy, ServiceConfig};
use crate::imaging::{self, Derivatives, ImageBackend, Quality, TransformConfig, TransformError};
use crate::mask::compile_mask;
use crate::selection::select_regions;
use crate::storage::{BlobError, BlobStore, PhotoStore, Publish, StoreError};
use crate::types::{ARTIFACT_CONTENT_TYPE, ArtifactKind, Filters, PhotoRecord};
use crate::version::{PublishTarget, Upload, VersionError, resolve_source};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Caller-facing error. `Display` is the single message shown to the user.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Storage error: {0}")]
    Blob(#[from] BlobError),
    #[error(transparent)]
    Annotation(#[from] AnnotationError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error(transparent)]
    Version(#[from] VersionError),
    #[error("{stage} timed out after {limit:?}")]
    Timeout { stage: &'static str, limit: Duration },
    #[error("{0} worker stopped without a result")]
    WorkerLost(&'static str),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Settings the pipeline needs, resolved from [`ServiceConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub transform: TransformConfig,
    pub annotation_timeout: Duration,
    pub transform_timeout: Duration,
    pub max_upload_bytes: u64,
    pub commit: CommitPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&ServiceConfig::default())
    }
}

impl From<&ServiceConfig> for PipelineConfig {
    fn from(config: &ServiceConfig) -> Self {
        let t = &config.transform;
        Self {
            transform: TransformConfig {
                focus_sigma: t.focus_blur_sigma,
                blur_sigma: t.blur_sigma,
                thumbnail: (t.thumbnail_size[0], t.thumbnail_size[1]),
                quality: Quality::new(t.quality),
            },
            annotation_timeout: config.annotation.timeout(),
            transform_timeout: t.timeout(),
            max_upload_bytes: config.storage.max_upload_bytes,
            commit: config.publish.commit,
        }
    }
}

/// Public URLs of a published version's artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactUrls {
    pub original: String,
    pub full_size: String,
    pub thumbnail: String,
}

/// A record plus where its current artifacts are served from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoView {
    #[serde(flatten)]
    pub record: PhotoRecord,
    /// `None` until the first publish.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urls: Option<ArtifactUrls>,
}

/// Result of a successful publish.
#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub photo: PhotoView,
    /// Number of regions masked.
    pub regions: usize,
}

/// Output of annotate → select → mask → transform.
struct Rendered {
    derivatives: Derivatives,
    labels: Vec<String>,
    color: Option<String>,
    /// The service response exactly as received.
    annotations: serde_json::Value,
    regions: usize,
}

/// Run `work` on its own thread and give up after `limit`.
///
/// An expired stage keeps running in the background, but its result is
/// dropped and nothing downstream of it happens.
fn run_with_timeout<T, E, F>(stage: &'static str, limit: Duration, work: F) -> Result<T>
where
    F: FnOnce() -> std::result::Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
    PipelineError: From<E>,
{
    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name(format!("photo-veil-{stage}"))
        .spawn(move || {
            // Receiver is gone once the deadline has passed
            let _ = tx.send(work());
        })?;
    match rx.recv_timeout(limit) {
        Ok(result) => result.map_err(PipelineError::from),
        Err(RecvTimeoutError::Timeout) => Err(PipelineError::Timeout { stage, limit }),
        Err(RecvTimeoutError::Disconnected) => Err(PipelineError::WorkerLost(stage)),
    }
}

/// Photo operations over injected collaborators.
pub struct PhotoService<S, B, A, I> {
    store: S,
    blobs: B,
    annotator: Arc<A>,
    backend: Arc<I>,
    config: PipelineConfig,
}

impl<S, B, A, I> PhotoService<S, B, A, I>
where
    S: PhotoStore,
    B: BlobStore,
    A: Annotator + 'static,
    I: ImageBackend + 'static,
{
    pub fn new(store: S, blobs: B, annotator: A, backend: I, config: PipelineConfig) -> Self {
        Self {
            store,
            blobs,
            annotator: Arc::new(annotator),
            backend: Arc::new(backend),
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    pub fn annotator(&self) -> &A {
        &self.annotator
    }

    pub fn backend(&self) -> &I {
        &self.backend
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Published photos, newest first.
    pub fn list_uploaded_photos(&self) -> Result<Vec<PhotoView>> {
        Ok(self
            .store
            .list_uploaded()?
            .into_iter()
            .map(|record| self.view(record))
            .collect())
    }

    pub fn get_photo(&self, id: &str) -> Result<PhotoView> {
        Ok(self.view(self.store.get(id)?))
    }

    /// Remove the record. Its artifacts stay behind for the orphan sweep.
    pub fn delete_photo(&self, id: &str) -> Result<()> {
        self.store.delete(id)?;
        info!(id, "photo deleted");
        Ok(())
    }

    /// Create a photo from `upload`, or re-publish `id` with new filters.
    ///
    /// An edit without an upload reprocesses the stored original of the
    /// current version.
    pub fn create_or_update_photo(
        &self,
        id: Option<&str>,
        filters: Filters,
        upload: Option<Upload>,
    ) -> Result<Published> {
        let existing = self.validate(id, upload.as_ref())?;

        let record = match existing {
            Some(record) => self.store.update_filters(&record.id, filters)?,
            None => self.store.insert(filters)?,
        };
        info!(
            id = %record.id,
            version = record.version,
            operation = %record.filters.operation,
            reupload = upload.is_some(),
            "publish started"
        );

        self.publish(&record, upload.as_ref()).inspect_err(|e| {
            warn!(id = %record.id, error = %e, "publish failed; previous version left in place");
        })
    }

    /// Checks that must pass before the record is touched.
    fn validate(&self, id: Option<&str>, upload: Option<&Upload>) -> Result<Option<PhotoRecord>> {
        let existing = match id {
            Some(id) => Some(self.store.get(id)?),
            None => None,
        };

        match (upload, &existing) {
            (None, None) => {
                return Err(PipelineError::Validation("No file was uploaded.".into()));
            }
            (None, Some(record)) if record.version == 0 => {
                return Err(VersionError::NoOriginal(record.id.clone()).into());
            }
            _ => {}
        }

        if let Some(upload) = upload {
            let size = std::fs::metadata(&upload.path)?.len();
            if size > self.config.max_upload_bytes {
                return Err(PipelineError::Validation(format!(
                    "File is too large: {} bytes (limit {} bytes)",
                    size, self.config.max_upload_bytes
                )));
            }
            imaging::ensure_jpeg(&*self.backend, &upload.path)?;
        }

        Ok(existing)
    }

    fn publish(&self, record: &PhotoRecord, upload: Option<&Upload>) -> Result<Published> {
        let scratch = tempfile::Builder::new().prefix("photo-veil-").tempdir()?;
        let resolved = resolve_source(&self.blobs, record, upload, scratch.path())?;
        let target = resolved.target(&record.id);
        debug!(id = %target.id, base = resolved.base_version, target = target.version, "source resolved");

        let (original, rendered) = rayon::join(
            || {
                self.blobs.upload(
                    &resolved.image,
                    &target.artifact_name(ArtifactKind::Original),
                    ARTIFACT_CONTENT_TYPE,
                )
            },
            || self.render(&record.filters, &resolved.image, scratch.path(), &target),
        );
        original?;
        let rendered = rendered?;

        let (full_size, thumbnail) = rayon::join(
            || {
                self.blobs.upload(
                    &rendered.derivatives.full_size,
                    &target.artifact_name(ArtifactKind::FullSize),
                    ARTIFACT_CONTENT_TYPE,
                )
            },
            || {
                self.blobs.upload(
                    &rendered.derivatives.thumbnail,
                    &target.artifact_name(ArtifactKind::Thumbnail),
                    ARTIFACT_CONTENT_TYPE,
                )
            },
        );
        full_size?;
        thumbnail?;

        let expected = match self.config.commit {
            CommitPolicy::LastWriterWins => None,
            CommitPolicy::CompareAndSet => Some(resolved.base_version),
        };
        let publish = Publish {
            version: target.version,
            filename: resolved.filename,
            labels: rendered.labels,
            color: rendered.color,
            annotations: Some(rendered.annotations),
        };
        let committed = self.store.commit_publish(&record.id, &publish, expected)?;
        info!(
            id = %committed.id,
            version = committed.version,
            regions = rendered.regions,
            "publish committed"
        );

        Ok(Published {
            photo: self.view(committed),
            regions: rendered.regions,
        })
    }

    fn render(
        &self,
        filters: &Filters,
        source: &Path,
        work_dir: &Path,
        target: &PublishTarget,
    ) -> Result<Rendered> {
        let annotator = Arc::clone(&self.annotator);
        let image = source.to_path_buf();
        let response = run_with_timeout("annotation", self.config.annotation_timeout, move || {
            annotator.annotate(&image)
        })?;
        let annotations = &response.annotations;

        let polygons = select_regions(annotations, filters);
        let draw_spec = compile_mask(&polygons);
        debug!(id = %target.id, regions = polygons.len(), "regions selected");

        let backend = Arc::clone(&self.backend);
        let source = source.to_path_buf();
        let work_dir = work_dir.to_path_buf();
        let id = target.id.clone();
        let version = target.version;
        let operation = filters.operation;
        let transform = self.config.transform;
        let derivatives = run_with_timeout("transform", self.config.transform_timeout, move || {
            imaging::apply(
                &*backend, &source, &work_dir, &id, version, &draw_spec, operation, &transform,
            )
        })?;

        Ok(Rendered {
            derivatives,
            labels: annotations.labels_by_score(),
            color: dominant_color(annotations.colors()),
            annotations: response.raw,
            regions: polygons.len(),
        })
    }

    fn view(&self, record: PhotoRecord) -> PhotoView {
        let urls = (record.version > 0).then(|| {
            ArtifactUrls {
                original: self
                    .blobs
                    .public_url(&record.artifact_name(ArtifactKind::Original)),
                full_size: self
                    .blobs
                    .public_url(&record.artifact_name(ArtifactKind::FullSize)),
                thumbnail: self
                    .blobs
                    .public_url(&record.artifact_name(ArtifactKind::Thumbnail)),
            }
        });
        PhotoView { record, urls }
    }
}
