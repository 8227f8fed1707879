use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

pub mod candidates;
pub mod employees;
pub mod files;
pub mod owners;

/// Distinguishes a missing key (`None`) from an explicit `null` (`Some(None)`)
/// in partial updates.
pub fn nullable<'de, D, T>(deserializer: D) -> core::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Trims the value and turns blank strings into `None`.
pub fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Name,
    #[default]
    CreatedAt,
    UpdatedAt,
    YearsOfExperience,
    Status,
    UnavailableUntil,
    Client,
}

impl SortField {
    pub fn column(&self) -> &'static str {
        match self {
            SortField::Name => "name collate nocase",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::YearsOfExperience => "years_of_experience",
            SortField::Status => "status",
            SortField::UnavailableUntil => "unavailable_until",
            SortField::Client => "client collate nocase",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Query-string filter shared by the candidate and employee listings,
/// generic over the entity's status enum.
#[derive(Debug, Clone, Deserialize)]
pub struct ListFilter<S> {
    pub status: Option<S>,
    pub client: Option<String>,
    /// Case-insensitive substring over name, email and notes.
    pub search: Option<String>,
    pub min_experience: Option<f64>,
    pub sort: Option<SortField>,
    pub order: Option<SortOrder>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl<S> Default for ListFilter<S> {
    fn default() -> Self {
        ListFilter {
            status: None,
            client: None,
            search: None,
            min_experience: None,
            sort: None,
            order: None,
            limit: None,
            offset: None,
        }
    }
}

impl<S> ListFilter<S> {
    pub fn search_pattern(&self) -> Option<String> {
        clean(self.search.clone()).map(|s| format!("%{}%", s.to_lowercase()))
    }

    /// Newest first unless asked otherwise; other fields default to ascending.
    pub fn ordering(&self) -> String {
        let sort = self.sort.unwrap_or_default();
        let order = self.order.unwrap_or(match sort {
            SortField::CreatedAt | SortField::UpdatedAt => SortOrder::Desc,
            _ => SortOrder::Asc,
        });
        format!(" order by {} {}, id asc", sort.column(), order.sql())
    }

    pub fn page(&self) -> (i64, i64) {
        let limit = self.limit.unwrap_or(-1);
        let offset = self.offset.unwrap_or(0).max(0);
        (if limit < 0 { -1 } else { limit }, offset)
    }
}

/// An unavailable entity and the date it is expected back.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Returning {
    pub id: String,
    pub name: String,
    pub unavailable_until: NaiveDate,
}
