use std::collections::HashSet;

use chrono::{Duration, Utc};
use common::BlobId;
use common::storage::{BlobStore, StorageError};
use thiserror::Error;
use tracing::{debug, info};

use crate::catalog::{Catalog, CatalogError};

/// Outcome of one orphan sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Blobs inspected.
    pub examined: usize,
    /// Orphans deleted.
    pub deleted: usize,
    /// Orphans younger than the grace period, left for a later sweep.
    pub kept_recent: usize,
}

#[derive(Debug, Error)]
pub enum SweepError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Reclaim blobs no collection references.
///
/// Partial batch failures and mesh deletion both leave blobs behind on
/// purpose; this sweep is the out-of-band reconciliation for them. The
/// grace period keeps the sweep from racing an in-flight batch whose
/// collection record has not landed yet.
pub async fn sweep_orphans(
    store: &dyn BlobStore,
    catalog: &dyn Catalog,
    grace: Duration,
) -> Result<SweepReport, SweepError> {
    let referenced: HashSet<BlobId> = catalog
        .collections()
        .await?
        .iter()
        .flat_map(|collection| collection.original_files.iter().copied())
        .collect();

    let mut report = SweepReport::default();
    let cutoff = Utc::now() - grace;

    for id in store.list().await? {
        report.examined += 1;
        if referenced.contains(&id) {
            continue;
        }

        let meta = match store.stat(id).await {
            Ok(meta) => meta,
            // Deleted out from under us; nothing left to reclaim.
            Err(StorageError::NotFound(_)) => continue,
            Err(err) => return Err(err.into()),
        };

        if meta.created_at > cutoff {
            debug!(blob = %id, "orphan within grace period, keeping");
            report.kept_recent += 1;
            continue;
        }

        store.delete(id).await?;
        report.deleted += 1;
        debug!(blob = %id, filename = %meta.filename, "deleted orphaned blob");
    }

    info!(
        examined = report.examined,
        deleted = report.deleted,
        kept_recent = report.kept_recent,
        "orphan sweep finished"
    );
    Ok(report)
}
