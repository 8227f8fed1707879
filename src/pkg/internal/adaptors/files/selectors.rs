use sqlx::SqliteConnection;

use crate::pkg::internal::adaptors::files::spec::{FileEntry, FileTotals, file_columns};
use crate::pkg::internal::adaptors::owners::spec::Owner;
use crate::prelude::Result;

pub struct FileSelector<'a> {
    pool: &'a mut SqliteConnection,
}

impl<'a> FileSelector<'a> {
    pub fn new(pool: &'a mut SqliteConnection) -> Self {
        FileSelector { pool }
    }

    pub async fn get(
        &mut self,
        owner: Owner,
        owner_id: &str,
        file_id: &str,
    ) -> Result<Option<FileEntry>> {
        let row = sqlx::query_as::<_, FileEntry>(&format!(
            "select {} from {} where id = ? and {} = ?",
            file_columns(owner),
            owner.files_table(),
            owner.owner_column()
        ))
        .bind(file_id)
        .bind(owner_id)
        .fetch_optional(&mut *self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_for_owner(&mut self, owner: Owner, owner_id: &str) -> Result<Vec<FileEntry>> {
        let rows = sqlx::query_as::<_, FileEntry>(&format!(
            "select {} from {} where {} = ? order by uploaded_at desc, name asc",
            file_columns(owner),
            owner.files_table(),
            owner.owner_column()
        ))
        .bind(owner_id)
        .fetch_all(&mut *self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn totals(&mut self, owner: Owner) -> Result<FileTotals> {
        let totals = sqlx::query_as::<_, FileTotals>(&format!(
            "select count(*) as count, coalesce(sum(size), 0) as size,
                    coalesce(sum(stored_size), 0) as stored_size
             from {}",
            owner.files_table()
        ))
        .fetch_one(&mut *self.pool)
        .await?;
        Ok(totals)
    }
}
