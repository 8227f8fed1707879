use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;

use crate::pkg::{
    internal::{attachments::UploadPolicy, blobs::FsBlobs},
    server::state::{AppState, MIGRATOR},
};

/// In-memory database plus a throwaway blob directory. Keep the `TempDir`
/// alive for as long as the state is used.
pub async fn state() -> (AppState, TempDir) {
    state_with_policy(UploadPolicy::default()).await
}

pub async fn state_with_policy(policy: UploadPolicy) -> (AppState, TempDir) {
    // every in-memory connection is its own database, so pin the pool to one
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    MIGRATOR.run(&pool).await.expect("migrations apply");
    let dir = tempfile::tempdir().expect("temp blob dir");
    let blobs = Arc::new(FsBlobs::new(dir.path()));
    (AppState::from_parts(pool, blobs, policy), dir)
}
