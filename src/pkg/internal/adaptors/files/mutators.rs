use chrono::Utc;
use sqlx::SqliteConnection;

use crate::pkg::internal::adaptors::files::spec::{CreateFileData, FileEntry, file_columns};
use crate::pkg::internal::adaptors::owners::spec::Owner;
use crate::prelude::Result;

pub struct FileMutator<'a> {
    pool: &'a mut SqliteConnection,
}

impl<'a> FileMutator<'a> {
    pub fn new(pool: &'a mut SqliteConnection) -> Self {
        FileMutator { pool }
    }

    pub async fn create(&mut self, owner: Owner, data: CreateFileData) -> Result<FileEntry> {
        let row = sqlx::query_as::<_, FileEntry>(&format!(
            r#"
            insert into {} (id, {}, name, content_type, storage_path, size, stored_size, compressed, uploaded_at)
            values (?, ?, ?, ?, ?, ?, ?, ?, ?)
            returning {}
            "#,
            owner.files_table(),
            owner.owner_column(),
            file_columns(owner)
        ))
        .bind(data.id)
        .bind(data.owner_id)
        .bind(data.name)
        .bind(data.content_type)
        .bind(data.storage_path)
        .bind(data.size)
        .bind(data.stored_size)
        .bind(data.compressed)
        .bind(Utc::now())
        .fetch_one(&mut *self.pool)
        .await?;
        Ok(row)
    }

    pub async fn delete(
        &mut self,
        owner: Owner,
        owner_id: &str,
        file_id: &str,
    ) -> Result<Option<FileEntry>> {
        let row = sqlx::query_as::<_, FileEntry>(&format!(
            "delete from {} where id = ? and {} = ? returning {}",
            owner.files_table(),
            owner.owner_column(),
            file_columns(owner)
        ))
        .bind(file_id)
        .bind(owner_id)
        .fetch_optional(&mut *self.pool)
        .await?;
        Ok(row)
    }

    /// Deletes every file row of one entity and hands back what was removed,
    /// so the caller can clean up the blobs.
    pub async fn delete_for_owner(&mut self, owner: Owner, owner_id: &str) -> Result<Vec<FileEntry>> {
        let rows = sqlx::query_as::<_, FileEntry>(&format!(
            "delete from {} where {} = ? returning {}",
            owner.files_table(),
            owner.owner_column(),
            file_columns(owner)
        ))
        .bind(owner_id)
        .fetch_all(&mut *self.pool)
        .await?;
        Ok(rows)
    }
}
