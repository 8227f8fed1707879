use std::{str::FromStr, sync::Arc};

use async_trait::async_trait;
use sqlx::{
    Sqlite, SqlitePool, Transaction,
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use crate::{
    conf::settings,
    pkg::internal::{
        attachments::UploadPolicy,
        blobs::{self, BlobOps},
    },
    prelude::Result,
};

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub fn connect_options(url: &str) -> Result<SqliteConnectOptions> {
    Ok(SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true))
}

pub fn db_pool() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(settings.database_pool_max_connections)
        .connect_lazy_with(connect_options(&settings.database_url)?);
    Ok(pool)
}

#[async_trait]
pub trait GetTxn {
    async fn begin_txn(&self) -> Result<Transaction<'static, Sqlite>>;
}

#[async_trait]
impl GetTxn for Arc<SqlitePool> {
    async fn begin_txn(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.begin().await?)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: Arc<SqlitePool>,
    pub blobs: Arc<dyn BlobOps>,
    pub policy: Arc<UploadPolicy>,
}

impl AppState {
    pub async fn new() -> Result<AppState> {
        let blobs = blobs::from_settings(&settings).await?;
        Ok(AppState::from_parts(
            db_pool()?,
            blobs,
            settings.upload_policy(),
        ))
    }

    pub fn from_parts(pool: SqlitePool, blobs: Arc<dyn BlobOps>, policy: UploadPolicy) -> Self {
        AppState {
            db_pool: Arc::new(pool),
            blobs,
            policy: Arc::new(policy),
        }
    }
}
