use crate::{
    conf::settings,
    pkg::server::state::{MIGRATOR, connect_options},
    prelude::Result,
};
use sqlx::sqlite::SqlitePoolOptions;

pub async fn apply() -> Result<()> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(connect_options(&settings.database_url)?)
        .await?;
    tracing::debug!("connected to db");
    MIGRATOR.run(&pool).await?;
    pool.close().await;
    tracing::info!("migrations applied successfully");
    Ok(())
}
