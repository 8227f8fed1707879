use sqlx::SqliteConnection;

use crate::pkg::internal::adaptors::owners::spec::Owner;
use crate::prelude::Result;

pub struct OwnerSelector<'a> {
    pool: &'a mut SqliteConnection,
}

impl<'a> OwnerSelector<'a> {
    pub fn new(pool: &'a mut SqliteConnection) -> Self {
        OwnerSelector { pool }
    }

    pub async fn exists(&mut self, owner: Owner, id: &str) -> Result<bool> {
        let found = sqlx::query_scalar::<_, i64>(&format!(
            "select count(*) from {} where id = ?",
            owner.table()
        ))
        .bind(id)
        .fetch_one(&mut *self.pool)
        .await?;
        Ok(found > 0)
    }

    pub async fn ensure_exists(&mut self, owner: Owner, id: &str) -> Result<()> {
        if !self.exists(owner, id).await? {
            return Err(owner.not_found(id));
        }
        Ok(())
    }

    /// Current profile image key; `NotFound` when the entity itself is missing.
    pub async fn profile_image(&mut self, owner: Owner, id: &str) -> Result<Option<String>> {
        let row = sqlx::query_as::<_, (Option<String>,)>(&format!(
            "select profile_image from {} where id = ?",
            owner.table()
        ))
        .bind(id)
        .fetch_optional(&mut *self.pool)
        .await?;
        match row {
            Some((key,)) => Ok(key),
            None => Err(owner.not_found(id)),
        }
    }
}
