use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::pkg::internal::adaptors::Returning;
use crate::pkg::internal::adaptors::employees::spec::{
    EMPLOYEE_COLUMNS, EmployeeEntry, EmployeeFilter, EmployeeStatus,
};
use crate::prelude::Result;

pub struct EmployeeSelector<'a> {
    pool: &'a mut SqliteConnection,
}

impl<'a> EmployeeSelector<'a> {
    pub fn new(pool: &'a mut SqliteConnection) -> Self {
        EmployeeSelector { pool }
    }

    pub async fn get_by_id(&mut self, id: &str) -> Result<Option<EmployeeEntry>> {
        let row = sqlx::query_as::<_, EmployeeEntry>(&format!(
            "select {} from employees where id = ?",
            EMPLOYEE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list(&mut self, filter: &EmployeeFilter) -> Result<Vec<EmployeeEntry>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "select {} from employees where 1 = 1",
            EMPLOYEE_COLUMNS
        ));
        if let Some(status) = filter.status {
            qb.push(" and status = ").push_bind(status);
        }
        if let Some(client) = filter.client.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            qb.push(" and client = ").push_bind(client.to_string());
        }
        if let Some(min) = filter.min_experience {
            qb.push(" and years_of_experience >= ").push_bind(min);
        }
        if let Some(pattern) = filter.search_pattern() {
            qb.push(" and (lower(name) like ")
                .push_bind(pattern.clone())
                .push(" or lower(email) like ")
                .push_bind(pattern.clone())
                .push(" or lower(coalesce(position, '')) like ")
                .push_bind(pattern.clone())
                .push(" or lower(coalesce(notes, '')) like ")
                .push_bind(pattern)
                .push(")");
        }
        qb.push(filter.ordering());
        let (limit, offset) = filter.page();
        qb.push(" limit ").push_bind(limit);
        qb.push(" offset ").push_bind(offset);
        let rows = qb
            .build_query_as::<EmployeeEntry>()
            .fetch_all(&mut *self.pool)
            .await?;
        tracing::debug!("listed {} employees", rows.len());
        Ok(rows)
    }

    pub async fn count_by_status(&mut self) -> Result<Vec<(EmployeeStatus, i64)>> {
        let rows = sqlx::query_as::<_, (EmployeeStatus, i64)>(
            "select status, count(*) from employees group by status",
        )
        .fetch_all(&mut *self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn count_created_since(&mut self, since: DateTime<Utc>) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "select count(*) from employees where created_at >= ?",
        )
        .bind(since)
        .fetch_one(&mut *self.pool)
        .await?;
        Ok(count)
    }

    /// Employees on leave who are due back on or before `by`.
    pub async fn returning_between(&mut self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Returning>> {
        let rows = sqlx::query_as::<_, Returning>(
            "select id, name, unavailable_until from employees
             where status = ? and unavailable_until between ? and ?
             order by unavailable_until asc, name asc",
        )
        .bind(EmployeeStatus::OnLeave)
        .bind(from)
        .bind(to)
        .fetch_all(&mut *self.pool)
        .await?;
        Ok(rows)
    }
}
