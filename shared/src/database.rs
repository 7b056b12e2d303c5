use anyhow::{Context, Result};
use sea_orm::{Database, DatabaseConnection};
use tracing::info;

pub async fn get_db_connection(database_url: &str) -> Result<DatabaseConnection> {
    info!("Connecting to database via Sea-ORM at: {}", database_url);
    let db = Database::connect(database_url)
        .await
        .with_context(|| format!("failed to connect to {database_url}"))?;
    Ok(db)
}
