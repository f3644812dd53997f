use sea_orm::{Database, DatabaseConnection};
use tracing::info;

use crate::error::Result;

pub async fn connect(database_url: &str) -> Result<DatabaseConnection> {
    info!("Connecting to database at: {}", database_url);
    let db = Database::connect(database_url).await?;
    Ok(db)
}
