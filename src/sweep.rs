//! Orphaned artifact sweep.
//!
//! Aborted and superseded publishes leave artifacts no record points to.
//! The pipeline never cleans them up; this module finds them so an operator
//! can delete them out of band.
//!
//! An artifact is an orphan when its id has no record, or when its version
//! is older than the record's current version. Versions newer than the
//! record's may belong to a publish still in flight and are kept. Names that
//! do not parse as artifact names are never touched.

use crate::storage::{BlobError, BlobStore, PhotoStore, StoreError};
use crate::types::{PhotoRecord, parse_artifact_name};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum SweepError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Storage error: {0}")]
    Blob(#[from] BlobError),
}

/// What a sweep found, and, once applied, what it removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepPlan {
    /// Artifact names safe to delete, sorted.
    pub orphans: Vec<String>,
    /// Artifacts still referenced, or possibly about to be.
    pub kept: usize,
    /// Names that are not artifacts of this service.
    pub unrecognized: Vec<String>,
    /// Set once the orphans have been deleted.
    pub applied: bool,
}

/// Classify `blob_names` against the current records.
pub fn plan_sweep(records: &[PhotoRecord], blob_names: &[String]) -> SweepPlan {
    let current: HashMap<&str, u64> = records
        .iter()
        .map(|r| (r.id.as_str(), r.version))
        .collect();

    let mut plan = SweepPlan::default();
    for name in blob_names {
        let Some(artifact) = parse_artifact_name(name) else {
            plan.unrecognized.push(name.clone());
            continue;
        };
        match current.get(artifact.id.as_str()) {
            Some(&version) if artifact.version >= version => plan.kept += 1,
            _ => plan.orphans.push(name.clone()),
        }
    }
    plan.orphans.sort();
    plan.unrecognized.sort();
    plan
}

/// Plan a sweep over the live stores, deleting the orphans when `apply`.
///
/// Blobs are listed before records. A publish that commits between the two
/// listings then has its record in the snapshot and its artifacts are kept.
///
/// Deletion stops at the first failure; already-deleted names stay deleted
/// and a rerun picks up the rest.
pub fn run_sweep(
    store: &impl PhotoStore,
    blobs: &impl BlobStore,
    apply: bool,
) -> Result<SweepPlan, SweepError> {
    let names = blobs.list()?;
    let records = store.list()?;
    let mut plan = plan_sweep(&records, &names);
    info!(
        orphans = plan.orphans.len(),
        kept = plan.kept,
        unrecognized = plan.unrecognized.len(),
        "sweep planned"
    );

    if apply {
        for name in &plan.orphans {
            blobs.delete(name).inspect_err(|e| {
                warn!(%name, error = %e, "orphan delete failed");
            })?;
        }
        plan.applied = true;
        info!(deleted = plan.orphans.len(), "sweep applied");
    }
    Ok(plan)
}
