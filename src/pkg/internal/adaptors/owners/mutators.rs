use chrono::Utc;
use sqlx::SqliteConnection;

use crate::pkg::internal::adaptors::owners::spec::Owner;
use crate::prelude::Result;

pub struct OwnerMutator<'a> {
    pool: &'a mut SqliteConnection,
}

impl<'a> OwnerMutator<'a> {
    pub fn new(pool: &'a mut SqliteConnection) -> Self {
        OwnerMutator { pool }
    }

    /// Points the entity at a new profile image key, or clears it. Returns
    /// the key it replaced. Run inside a transaction so the read and the
    /// write see the same row.
    pub async fn set_profile_image(
        &mut self,
        owner: Owner,
        id: &str,
        key: Option<&str>,
    ) -> Result<Option<String>> {
        let previous = sqlx::query_as::<_, (Option<String>,)>(&format!(
            "select profile_image from {} where id = ?",
            owner.table()
        ))
        .bind(id)
        .fetch_optional(&mut *self.pool)
        .await?
        .ok_or_else(|| owner.not_found(id))?
        .0;
        let res = sqlx::query(&format!(
            "update {} set profile_image = ?, updated_at = ? where id = ?",
            owner.table()
        ))
        .bind(key)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *self.pool)
        .await?;
        if res.rows_affected() == 0 {
            return Err(owner.not_found(id));
        }
        Ok(previous)
    }

    /// Removes the entity row only; dependent file rows must already be gone.
    pub async fn delete(&mut self, owner: Owner, id: &str) -> Result<bool> {
        let res = sqlx::query(&format!("delete from {} where id = ?", owner.table()))
            .bind(id)
            .execute(&mut *self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;
    use crate::pkg::internal::adaptors::employees::{mutators::EmployeeMutator, spec::EmployeeInput};
    use crate::pkg::server::state::GetTxn;
    use crate::pkg::testing;
    use crate::prelude::Error;

    #[tokio::test]
    #[traced_test]
    async fn test_profile_image_pointer_swaps_in_transaction() -> Result<()> {
        let (state, _dir) = testing::state().await;
        let input: EmployeeInput = serde_json::from_value(serde_json::json!({
            "name": "Barbara Liskov",
            "email": "liskov@example.com"
        }))?;
        let id = {
            let mut conn = state.db_pool.acquire().await?;
            EmployeeMutator::new(&mut conn).create(input).await?.id
        };

        let mut tx = state.db_pool.begin_txn().await?;
        let first = OwnerMutator::new(&mut tx)
            .set_profile_image(Owner::Employee, &id, Some("employees/a.png"))
            .await?;
        assert_eq!(first, None);
        let second = OwnerMutator::new(&mut tx)
            .set_profile_image(Owner::Employee, &id, Some("employees/b.png"))
            .await?;
        assert_eq!(second.as_deref(), Some("employees/a.png"));
        tx.rollback().await?;

        let mut tx = state.db_pool.begin_txn().await?;
        let cleared = OwnerMutator::new(&mut tx)
            .set_profile_image(Owner::Employee, &id, None)
            .await?;
        assert_eq!(cleared, None);
        let missing = OwnerMutator::new(&mut tx)
            .set_profile_image(Owner::Employee, "missing", Some("employees/c.png"))
            .await;
        assert!(matches!(missing, Err(Error::NotFound { entity: "employee", .. })));
        tx.commit().await?;
        Ok(())
    }
}
