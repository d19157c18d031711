//! Durable storage: photo records and artifact objects.
//!
//! Both are traits so the pipeline can run against in-memory fakes in tests.

pub mod blob;
pub mod records;

pub use blob::{BlobError, BlobStore, LocalBlobStore};
pub use records::{JsonPhotoStore, PhotoStore, Publish, RecordTable, StoreError};
