use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::pkg::internal::adaptors::owners::spec::Owner;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FileEntry {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub content_type: String,
    pub storage_path: String,
    pub size: i64,
    pub stored_size: i64,
    pub compressed: bool,
    pub uploaded_at: DateTime<Utc>,
}

pub struct CreateFileData {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub content_type: String,
    pub storage_path: String,
    pub size: i64,
    pub stored_size: i64,
    pub compressed: bool,
}

pub fn file_columns(owner: Owner) -> String {
    format!(
        "id, {} as owner_id, name, content_type, storage_path, size, stored_size, compressed, uploaded_at",
        owner.owner_column()
    )
}

#[derive(Debug, Clone, Copy, Default, Serialize, FromRow)]
pub struct FileTotals {
    pub count: i64,
    pub size: i64,
    pub stored_size: i64,
}
