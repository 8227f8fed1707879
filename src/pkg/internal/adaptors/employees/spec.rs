use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::pkg::internal::adaptors::{ListFilter, clean, nullable};

pub const EMPLOYEE_COLUMNS: &str = "id, name, email, phone, location, position, start_date, \
     years_of_experience, status, unavailable_until, client, notes, profile_image, created_at, updated_at";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum EmployeeStatus {
    /// Placed with a client.
    Assigned,
    #[default]
    Bench,
    OnLeave,
    Departed,
}

impl EmployeeStatus {
    pub const ALL: [EmployeeStatus; 4] = [
        EmployeeStatus::Assigned,
        EmployeeStatus::Bench,
        EmployeeStatus::OnLeave,
        EmployeeStatus::Departed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmployeeStatus::Assigned => "assigned",
            EmployeeStatus::Bench => "bench",
            EmployeeStatus::OnLeave => "on_leave",
            EmployeeStatus::Departed => "departed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EmployeeEntry {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub position: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub years_of_experience: f64,
    pub status: EmployeeStatus,
    pub unavailable_until: Option<NaiveDate>,
    pub client: Option<String>,
    pub notes: Option<String>,
    pub profile_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EmployeeInput {
    #[validate(length(min = 1, message = "Field cannot be empty"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub position: Option<String>,
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    #[validate(range(min = 0.0, max = 80.0, message = "Years of experience must be between 0 and 80"))]
    pub years_of_experience: f64,
    #[serde(default)]
    pub status: EmployeeStatus,
    pub unavailable_until: Option<NaiveDate>,
    pub client: Option<String>,
    pub notes: Option<String>,
}

impl EmployeeInput {
    /// Same rules as candidates; the return date only applies while on leave.
    pub fn normalize(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_string();
        self.phone = clean(self.phone);
        self.location = clean(self.location);
        self.position = clean(self.position);
        self.client = clean(self.client);
        self.notes = clean(self.notes);
        if self.status != EmployeeStatus::OnLeave {
            self.unavailable_until = None;
        }
        self
    }
}

impl From<&EmployeeEntry> for EmployeeInput {
    fn from(entry: &EmployeeEntry) -> Self {
        EmployeeInput {
            name: entry.name.clone(),
            email: entry.email.clone(),
            phone: entry.phone.clone(),
            location: entry.location.clone(),
            position: entry.position.clone(),
            start_date: entry.start_date,
            years_of_experience: entry.years_of_experience,
            status: entry.status,
            unavailable_until: entry.unavailable_until,
            client: entry.client.clone(),
            notes: entry.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmployeePatch {
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub position: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub start_date: Option<Option<NaiveDate>>,
    pub years_of_experience: Option<f64>,
    pub status: Option<EmployeeStatus>,
    #[serde(default, deserialize_with = "nullable")]
    pub unavailable_until: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable")]
    pub client: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
}

impl EmployeePatch {
    pub fn apply(self, current: &EmployeeEntry) -> EmployeeInput {
        let mut input = EmployeeInput::from(current);
        if let Some(name) = self.name {
            input.name = name;
        }
        if let Some(email) = self.email {
            input.email = email;
        }
        if let Some(phone) = self.phone {
            input.phone = phone;
        }
        if let Some(location) = self.location {
            input.location = location;
        }
        if let Some(position) = self.position {
            input.position = position;
        }
        if let Some(start_date) = self.start_date {
            input.start_date = start_date;
        }
        if let Some(years) = self.years_of_experience {
            input.years_of_experience = years;
        }
        if let Some(status) = self.status {
            input.status = status;
        }
        if let Some(until) = self.unavailable_until {
            input.unavailable_until = until;
        }
        if let Some(client) = self.client {
            input.client = client;
        }
        if let Some(notes) = self.notes {
            input.notes = notes;
        }
        input
    }
}

pub type EmployeeFilter = ListFilter<EmployeeStatus>;
