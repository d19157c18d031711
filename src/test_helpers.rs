//! Shared test utilities for the photo-veil test suite.
//!
//! Provides in-memory fakes for every collaborator of the pipeline, synthetic
//! image writers, and small builders for annotation payloads.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let annotator = ScriptedAnnotator::returning(Annotations {
//!     face_annotations: Some(vec![face(square(0.0, 0.0, 8.0), [Likelihood::VeryLikely, Likelihood::Unknown, Likelihood::Unknown, Likelihood::Unknown])]),
//!     ..Annotations::default()
//! });
//! let service = PhotoService::new(MemoryPhotoStore::new(), MemoryBlobStore::new(), annotator, MockBackend::jpeg(), config);
//! ```

use crate::annotation::{
    AnnotationError, AnnotationResponse, Annotations, Annotator, BoundingPoly, EntityAnnotation,
    FaceAnnotation, Likelihood, Vertex,
};
use crate::storage::blob::{self, BlobError, BlobStore};
use crate::storage::records::{self, PhotoStore, Publish, RecordTable};
use crate::types::{Filters, PhotoRecord};
use image::RgbImage;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

// =========================================================================
// Record store
// =========================================================================

/// Record store backed by a [`RecordTable`] in memory.
#[derive(Default)]
pub struct MemoryPhotoStore {
    table: Mutex<RecordTable>,
    racing_commit: Mutex<Option<Publish>>,
    fail_commits: Mutex<bool>,
}

impl MemoryPhotoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<PhotoRecord>) -> Self {
        let store = Self::new();
        {
            let mut table = store.table.lock().unwrap();
            for record in records {
                table.put(record);
            }
        }
        store
    }

    /// Commit `publish` on behalf of another writer just before the next
    /// commit lands, as if a concurrent edit had won the race.
    pub fn race_next_commit(&self, publish: Publish) {
        *self.racing_commit.lock().unwrap() = Some(publish);
    }

    /// Make every commit fail with an IO error.
    pub fn fail_commits(&self) {
        *self.fail_commits.lock().unwrap() = true;
    }

    pub fn records(&self) -> Vec<PhotoRecord> {
        self.table.lock().unwrap().list()
    }
}

impl PhotoStore for MemoryPhotoStore {
    fn insert(&self, filters: Filters) -> records::Result<PhotoRecord> {
        Ok(self.table.lock().unwrap().insert(filters))
    }

    fn get(&self, id: &str) -> records::Result<PhotoRecord> {
        self.table.lock().unwrap().get(id)
    }

    fn update_filters(&self, id: &str, filters: Filters) -> records::Result<PhotoRecord> {
        self.table.lock().unwrap().update_filters(id, filters)
    }

    fn commit_publish(
        &self,
        id: &str,
        publish: &Publish,
        expected_version: Option<u64>,
    ) -> records::Result<PhotoRecord> {
        if *self.fail_commits.lock().unwrap() {
            return Err(std::io::Error::other("commit refused").into());
        }
        let mut table = self.table.lock().unwrap();
        if let Some(racer) = self.racing_commit.lock().unwrap().take() {
            table.commit_publish(id, &racer, None)?;
        }
        table.commit_publish(id, publish, expected_version)
    }

    fn delete(&self, id: &str) -> records::Result<()> {
        self.table.lock().unwrap().delete(id)
    }

    fn list(&self) -> records::Result<Vec<PhotoRecord>> {
        Ok(self.table.lock().unwrap().list())
    }
}

// =========================================================================
// Blob store
// =========================================================================

/// Object store keeping every object in memory.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    uploads: Mutex<Vec<(String, String)>>,
    downloads: Mutex<Vec<String>>,
    fail_uploads_containing: Mutex<Option<String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, name: &str, bytes: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(name.to_string(), bytes.to_vec());
    }

    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    /// `(name, content_type)` of every upload, in completion order.
    pub fn uploads(&self) -> Vec<(String, String)> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }

    /// Fail any upload whose name contains `pattern`.
    pub fn fail_uploads_containing(&self, pattern: &str) {
        *self.fail_uploads_containing.lock().unwrap() = Some(pattern.to_string());
    }
}

impl BlobStore for MemoryBlobStore {
    fn upload(&self, local: &Path, name: &str, content_type: &str) -> blob::Result<()> {
        blob::validate_name(name)?;
        if let Some(pattern) = self.fail_uploads_containing.lock().unwrap().as_deref()
            && name.contains(pattern)
        {
            return Err(std::io::Error::other(format!("upload of {name} refused")).into());
        }
        let bytes = std::fs::read(local)?;
        self.put(name, &bytes);
        self.uploads
            .lock()
            .unwrap()
            .push((name.to_string(), content_type.to_string()));
        Ok(())
    }

    fn download(&self, name: &str, dest: &Path) -> blob::Result<()> {
        let bytes = self
            .get(name)
            .ok_or_else(|| BlobError::NotFound(name.to_string()))?;
        std::fs::write(dest, bytes)?;
        self.downloads.lock().unwrap().push(name.to_string());
        Ok(())
    }

    fn list(&self) -> blob::Result<Vec<String>> {
        Ok(self.names())
    }

    fn delete(&self, name: &str) -> blob::Result<()> {
        self.objects.lock().unwrap().remove(name);
        Ok(())
    }

    fn public_url(&self, name: &str) -> String {
        format!("memory://{}", name)
    }
}

// =========================================================================
// Annotator
// =========================================================================

enum Script {
    Respond(serde_json::Value),
    ServiceError { code: i32, message: String },
}

/// Annotator that replays a fixed answer and records what it was asked.
pub struct ScriptedAnnotator {
    script: Script,
    delay: Option<Duration>,
    calls: Mutex<Vec<PathBuf>>,
}

impl ScriptedAnnotator {
    pub fn returning(annotations: Annotations) -> Self {
        Self::returning_raw(serde_json::to_value(annotations).unwrap())
    }

    /// Answer with `raw` exactly as the service would have sent it.
    pub fn returning_raw(raw: serde_json::Value) -> Self {
        Self {
            script: Script::Respond(raw),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(code: i32, message: &str) -> Self {
        Self {
            script: Script::ServiceError {
                code,
                message: message.to_string(),
            },
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Sleep for `delay` before answering.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

impl Annotator for ScriptedAnnotator {
    fn annotate(&self, image: &Path) -> Result<AnnotationResponse, AnnotationError> {
        self.calls.lock().unwrap().push(image.to_path_buf());
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        match &self.script {
            Script::Respond(raw) => AnnotationResponse::from_raw(raw.clone()),
            Script::ServiceError { code, message } => Err(AnnotationError::Service {
                code: *code,
                message: message.clone(),
            }),
        }
    }
}

// =========================================================================
// Synthetic images
// =========================================================================

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

/// Write a small valid JPEG. Every channel is at least 128, so redacted
/// (black) pixels stand out in assertions.
pub fn write_test_jpeg(path: &Path, width: u32, height: u32) {
    let mut img = gradient(width, height);
    for pixel in img.pixels_mut() {
        for c in pixel.0.iter_mut() {
            *c = 128 + *c / 2;
        }
    }
    img.save_with_format(path, image::ImageFormat::Jpeg).unwrap();
}

/// Write a small valid PNG.
pub fn write_test_png(path: &Path, width: u32, height: u32) {
    gradient(width, height)
        .save_with_format(path, image::ImageFormat::Png)
        .unwrap();
}

// =========================================================================
// Annotation builders
// =========================================================================

/// Axis-aligned square with its top-left corner at `(x, y)`.
pub fn square(x: f64, y: f64, size: f64) -> BoundingPoly {
    BoundingPoly {
        vertices: vec![
            Vertex { x, y },
            Vertex { x: x + size, y },
            Vertex {
                x: x + size,
                y: y + size,
            },
            Vertex { x, y: y + size },
        ],
    }
}

/// A face with likelihoods given as `[joy, sorrow, anger, surprise]`.
pub fn face(bounding_poly: BoundingPoly, likelihoods: [Likelihood; 4]) -> FaceAnnotation {
    let [joy, sorrow, anger, surprise] = likelihoods;
    FaceAnnotation {
        bounding_poly,
        joy_likelihood: joy,
        sorrow_likelihood: sorrow,
        anger_likelihood: anger,
        surprise_likelihood: surprise,
    }
}

pub fn logo(bounding_poly: BoundingPoly) -> EntityAnnotation {
    EntityAnnotation {
        description: Some("logo".into()),
        score: Some(0.9),
        bounding_poly,
    }
}

pub fn text(description: &str, bounding_poly: BoundingPoly) -> EntityAnnotation {
    EntityAnnotation {
        description: Some(description.to_string()),
        score: None,
        bounding_poly,
    }
}
