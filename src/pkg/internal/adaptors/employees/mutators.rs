use chrono::Utc;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::pkg::internal::adaptors::employees::spec::{
    EMPLOYEE_COLUMNS, EmployeeEntry, EmployeeInput,
};
use crate::prelude::{Error, Result};

pub struct EmployeeMutator<'a> {
    pool: &'a mut SqliteConnection,
}

impl<'a> EmployeeMutator<'a> {
    pub fn new(pool: &'a mut SqliteConnection) -> Self {
        EmployeeMutator { pool }
    }

    pub async fn create(&mut self, input: EmployeeInput) -> Result<EmployeeEntry> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, EmployeeEntry>(&format!(
            r#"
            insert into employees (id, name, email, phone, location, position, start_date,
                years_of_experience, status, unavailable_until, client, notes, created_at, updated_at)
            values (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            returning {}
            "#,
            EMPLOYEE_COLUMNS
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(input.name)
        .bind(input.email)
        .bind(input.phone)
        .bind(input.location)
        .bind(input.position)
        .bind(input.start_date)
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

    pub async fn update(&mut self, id: &str, input: EmployeeInput) -> Result<EmployeeEntry> {
        let row = sqlx::query_as::<_, EmployeeEntry>(&format!(
            r#"
            update employees
            set name = ?, email = ?, phone = ?, location = ?, position = ?, start_date = ?,
                years_of_experience = ?, status = ?, unavailable_until = ?, client = ?, notes = ?,
                updated_at = ?
            where id = ?
            returning {}
            "#,
            EMPLOYEE_COLUMNS
        ))
        .bind(input.name)
        .bind(input.email)
        .bind(input.phone)
        .bind(input.location)
        .bind(input.position)
        .bind(input.start_date)
        .bind(input.years_of_experience)
        .bind(input.status)
        .bind(input.unavailable_until)
        .bind(input.client)
        .bind(input.notes)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *self.pool)
        .await?;
        row.ok_or_else(|| Error::not_found("employee", id))
    }
}
