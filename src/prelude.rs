use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid input: {0}")]
    Invalid(String),

    #[error("file too large: {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    #[error("request body too large: {0}")]
    BodyTooLarge(String),

    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("blob storage error: {0}")]
    Blob(String),

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Error::Invalid(err.to_string())
    }
}

impl From<axum::extract::multipart::MultipartError> for Error {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Error::BodyTooLarge(err.body_text())
        } else {
            Error::Invalid(err.body_text())
        }
    }
}

impl Error {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound { .. } | Error::Db(sqlx::Error::RowNotFound) => "ERR-NOTFOUND-404",
            Error::Invalid(_) => "ERR-VAL-001",
            Error::TooLarge { .. } | Error::BodyTooLarge(_) => "ERR-FILE-413",
            Error::UnsupportedType(_) => "ERR-FILE-415",
            Error::Blob(_) => "ERR-S3-001",
            Error::Db(_) | Error::Migrate(_) => "ERR-DB-000",
            Error::Config(_) => "ERR-CONF-000",
            Error::Io(_) | Error::Json(_) | Error::Join(_) => "ERR-INTERNAL-000",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::NotFound { .. } | Error::Db(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            Error::Invalid(_) => StatusCode::BAD_REQUEST,
            Error::TooLarge { .. } | Error::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Error::UnsupportedType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Error::Blob(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}: {}", self.code(), &self);
        } else {
            tracing::debug!("{}: {}", self.code(), &self);
        }
        let body = Json(json!({
            "code": self.code(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
