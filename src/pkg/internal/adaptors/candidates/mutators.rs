use chrono::Utc;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::pkg::internal::adaptors::candidates::spec::{
    CANDIDATE_COLUMNS, CandidateEntry, CandidateInput,
};
use crate::prelude::{Error, Result};

pub struct CandidateMutator<'a> {
    pool: &'a mut SqliteConnection,
}

impl<'a> CandidateMutator<'a> {
    pub fn new(pool: &'a mut SqliteConnection) -> Self {
        CandidateMutator { pool }
    }

    pub async fn create(&mut self, input: CandidateInput) -> Result<CandidateEntry> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, CandidateEntry>(&format!(
            r#"
            insert into candidates (id, name, email, phone, location, years_of_experience, status,
                unavailable_until, client, notes, created_at, updated_at)
            values (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            returning {}
            "#,
            CANDIDATE_COLUMNS
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(input.name)
        .bind(input.email)
        .bind(input.phone)
        .bind(input.location)
        .bind(input.years_of_experience)
        .bind(input.status)
        .bind(input.unavailable_until)
        .bind(input.client)
        .bind(input.notes)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *self.pool)
        .await?;
        Ok(row)
    }

    /// Overwrites every editable field; the last write wins.
    pub async fn update(&mut self, id: &str, input: CandidateInput) -> Result<CandidateEntry> {
        let row = sqlx::query_as::<_, CandidateEntry>(&format!(
            r#"
            update candidates
            set name = ?, email = ?, phone = ?, location = ?, years_of_experience = ?, status = ?,
                unavailable_until = ?, client = ?, notes = ?, updated_at = ?
            where id = ?
            returning {}
            "#,
            CANDIDATE_COLUMNS
        ))
        .bind(input.name)
        .bind(input.email)
        .bind(input.phone)
        .bind(input.location)
        .bind(input.years_of_experience)
        .bind(input.status)
        .bind(input.unavailable_until)
        .bind(input.client)
        .bind(input.notes)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *self.pool)
        .await?;
        row.ok_or_else(|| Error::not_found("candidate", id))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use tracing_test::traced_test;

    use super::*;
    use crate::pkg::internal::adaptors::candidates::selectors::CandidateSelector;
    use crate::pkg::internal::adaptors::candidates::spec::{
        CandidateFilter, CandidatePatch, CandidateStatus,
    };
    use crate::pkg::internal::adaptors::{SortField, SortOrder};
    use crate::pkg::testing;

    fn input(name: &str, years: f64, status: CandidateStatus) -> CandidateInput {
        CandidateInput {
            name: name.into(),
            email: format!("{}@example.com", name.to_lowercase()),
            phone: None,
            location: None,
            years_of_experience: years,
            status,
            unavailable_until: None,
            client: None,
            notes: None,
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_candidate_crud() -> Result<()> {
        let (state, _dir) = testing::state().await;
        let mut conn = state.db_pool.acquire().await?;

        let created = CandidateMutator::new(&mut conn)
            .create(input("Ada", 7.5, CandidateStatus::Available))
            .await?;
        assert!(!created.id.is_empty());
        assert_eq!(created.status, CandidateStatus::Available);
        assert_eq!(created.created_at, created.updated_at);

        let fetched = CandidateSelector::new(&mut conn)
            .get_by_id(&created.id)
            .await?
            .expect("candidate exists");
        assert_eq!(fetched.name, "Ada");
        assert_eq!(fetched.years_of_experience, 7.5);

        let patch: CandidatePatch = serde_json::from_value(serde_json::json!({
            "status": "unavailable",
            "unavailable_until": "2026-12-01",
            "client": "Initech"
        }))?;
        let updated = CandidateMutator::new(&mut conn)
            .update(&created.id, patch.apply(&fetched).normalize())
            .await?;
        assert_eq!(updated.status, CandidateStatus::Unavailable);
        assert_eq!(
            updated.unavailable_until,
            NaiveDate::from_ymd_opt(2026, 12, 1)
        );
        assert_eq!(updated.client.as_deref(), Some("Initech"));
        assert_eq!(updated.created_at, created.created_at);

        let missing = CandidateMutator::new(&mut conn)
            .update("nope", input("Ghost", 1.0, CandidateStatus::Placed))
            .await;
        assert!(matches!(missing, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn test_candidate_list_filters_and_sorts() -> Result<()> {
        let (state, _dir) = testing::state().await;
        let mut conn = state.db_pool.acquire().await?;
        for (name, years, status) in [
            ("Charlie", 2.0, CandidateStatus::Available),
            ("alice", 9.0, CandidateStatus::Interviewing),
            ("Bob", 5.0, CandidateStatus::Available),
        ] {
            CandidateMutator::new(&mut conn)
                .create(input(name, years, status))
                .await?;
        }

        let by_name = CandidateSelector::new(&mut conn)
            .list(&CandidateFilter {
                sort: Some(SortField::Name),
                ..Default::default()
            })
            .await?;
        let names: Vec<_> = by_name.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["alice", "Bob", "Charlie"]);

        let available = CandidateSelector::new(&mut conn)
            .list(&CandidateFilter {
                status: Some(CandidateStatus::Available),
                sort: Some(SortField::YearsOfExperience),
                order: Some(SortOrder::Desc),
                ..Default::default()
            })
            .await?;
        let names: Vec<_> = available.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Bob", "Charlie"]);

        let searched = CandidateSelector::new(&mut conn)
            .list(&CandidateFilter {
                search: Some("  ALI ".into()),
                ..Default::default()
            })
            .await?;
        assert_eq!(searched.len(), 1);
        assert_eq!(searched[0].name, "alice");

        let seasoned = CandidateSelector::new(&mut conn)
            .list(&CandidateFilter {
                min_experience: Some(5.0),
                sort: Some(SortField::Name),
                limit: Some(1),
                offset: Some(1),
                ..Default::default()
            })
            .await?;
        assert_eq!(seasoned.len(), 1);
        assert_eq!(seasoned[0].name, "Bob");

        let counts = CandidateSelector::new(&mut conn).count_by_status().await?;
        let available_count = counts
            .iter()
            .find(|(s, _)| *s == CandidateStatus::Available)
            .map(|(_, c)| *c);
        assert_eq!(available_count, Some(2));
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn test_unavailability_date_follows_status() -> Result<()> {
        let (state, _dir) = testing::state().await;
        let mut conn = state.db_pool.acquire().await?;
        let mut away = input("Dana", 3.0, CandidateStatus::Available);
        away.unavailable_until = NaiveDate::from_ymd_opt(2026, 11, 1);
        let created = CandidateMutator::new(&mut conn)
            .create(away.normalize())
            .await?;
        assert_eq!(created.unavailable_until, None);

        let mut away = input("Eve", 3.0, CandidateStatus::Unavailable);
        away.unavailable_until = NaiveDate::from_ymd_opt(2026, 11, 1);
        CandidateMutator::new(&mut conn)
            .create(away.normalize())
            .await?;
        let returning = CandidateSelector::new(&mut conn)
            .returning_between(
                NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
                NaiveDate::from_ymd_opt(2026, 11, 15).unwrap(),
            )
            .await?;
        assert_eq!(returning.len(), 1);
        assert_eq!(returning[0].name, "Eve");
        let none_yet = CandidateSelector::new(&mut conn)
            .returning_between(
                NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 10, 15).unwrap(),
            )
            .await?;
        assert!(none_yet.is_empty());
        let overdue = CandidateSelector::new(&mut conn)
            .returning_between(
                NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
                NaiveDate::from_ymd_opt(2026, 11, 30).unwrap(),
            )
            .await?;
        assert!(overdue.is_empty());
        Ok(())
    }
}
