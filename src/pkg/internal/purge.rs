use serde::Serialize;
use tokio::task::JoinSet;

use crate::{
    pkg::{
        internal::adaptors::{
            files::mutators::FileMutator,
            owners::{mutators::OwnerMutator, selectors::OwnerSelector, spec::Owner},
        },
        server::state::{AppState, GetTxn},
    },
    prelude::Result,
};

#[derive(Debug, Clone, Default, Serialize)]
pub struct PurgeReport {
    pub id: String,
    pub files_removed: usize,
    pub blobs_removed: usize,
    /// Keys whose blob could not be deleted and is now unreferenced.
    pub orphaned_blobs: Vec<String>,
}

/// Deletes an entity with its file records in one transaction, then removes
/// the backing blobs concurrently. Blob failures are reported, not raised.
pub async fn purge(state: &AppState, owner: Owner, id: &str) -> Result<PurgeReport> {
    let mut tx = state.db_pool.begin_txn().await?;
    let profile_image = OwnerSelector::new(&mut tx).profile_image(owner, id).await?;
    let files = FileMutator::new(&mut tx).delete_for_owner(owner, id).await?;
    OwnerMutator::new(&mut tx).delete(owner, id).await?;
    tx.commit().await?;
    tracing::info!(
        "deleted {} {} with {} file records",
        owner.label(),
        id,
        files.len()
    );

    let mut report = PurgeReport {
        id: id.to_string(),
        files_removed: files.len(),
        ..Default::default()
    };
    let keys = files
        .into_iter()
        .map(|f| f.storage_path)
        .chain(profile_image);
    let mut set = JoinSet::new();
    for key in keys {
        let blobs = state.blobs.clone();
        set.spawn(async move {
            let res = blobs.delete_object(&key).await;
            (key, res)
        });
    }
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((_, Ok(()))) => report.blobs_removed += 1,
            Ok((key, Err(err))) => {
                tracing::warn!("could not delete blob {}: {}", &key, err);
                report.orphaned_blobs.push(key);
            }
            Err(err) => tracing::error!("blob cleanup task failed: {}", err),
        }
    }
    report.orphaned_blobs.sort();
    Ok(report)
}
