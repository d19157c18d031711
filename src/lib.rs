//! # Photo Veil
//!
//! Annotation-driven privacy masking for photographs. A photo is sent to a
//! vision service, the detected faces, logos, and text that match the user's
//! filters become a polygon mask, and the photo is republished with the mask
//! applied: redacted, focused, or blurred.
//!
//! # Architecture: Versioned Publish Pipeline
//!
//! ```text
//! upload ─► annotate ─► select regions ─► compile mask ─► transform ─► thumbnail
//!    │                                                        │            │
//!    └──────────────── {id}_{v}-original / -fullsize / -thumbnail ────────┘
//!                                         │
//!                                 commit record at v
//! ```
//!
//! Every publish writes its three artifacts under a fresh version-qualified
//! name and only then commits the record. Readers see either the previous
//! version or the new one, never a mix. A failed publish leaves the record at
//! its previous version and status, with that version's artifacts untouched.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | Records, filters, statuses, artifact naming |
//! | [`annotation`] | Vision payload model and the REST client behind the [`annotation::Annotator`] trait |
//! | [`selection`] | Picks mask regions from annotations by filter |
//! | [`mask`] | Compiles polygons into the backend's draw spec, and parses it back |
//! | [`color`] | Dominant color extraction |
//! | [`imaging`] | Format guard, redact/focus/blur transforms, thumbnails (pure Rust) |
//! | [`storage`] | Record store and blob store traits with local implementations |
//! | [`version`] | Base-version resolution and reuse of stored originals |
//! | [`pipeline`] | The publish orchestrator and caller-facing photo operations |
//! | [`sweep`] | Out-of-band cleanup of orphaned artifacts |
//! | [`config`] | `photo-veil.toml` loading, merging, and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## No Record Lock
//!
//! Two edits of one photo can race: both read version `v` and both publish
//! `v + 1`. By default the last commit wins and the loser's artifacts become
//! orphans. Setting `[publish] commit = "compare-and-set"` makes the commit
//! fail instead. The commit is never retried, so a version is never bumped
//! twice.
//!
//! ## Pure-Rust Imaging
//!
//! The [`imaging`] module decodes, masks, blurs, and encodes with the `image`
//! crate alone. Mask polygons are rasterized at pixel centers with the
//! even-odd rule. There are no system image libraries to install.
//!
//! ## Injected Collaborators
//!
//! The pipeline is generic over its record store, blob store, annotator, and
//! image backend. Production wires the JSON store, local blob directory,
//! vision REST client, and [`imaging::RustBackend`]; tests wire in-memory
//! fakes.

pub mod annotation;
pub mod color;
pub mod config;
pub mod imaging;
pub mod mask;
pub mod output;
pub mod pipeline;
pub mod selection;
pub mod storage;
pub mod sweep;
pub mod types;
pub mod version;

#[cfg(test)]
pub(crate) mod test_helpers;
