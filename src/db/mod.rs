pub mod models;
pub mod writer;

pub use writer::PredictionWriter;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::error::Result;

/// Opens (creating if missing) the SQLite file and applies embedded migrations.
pub async fn connect(db_path: &str) -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .connect(&format!("sqlite:{db_path}?mode=rwc"))
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

/// In-memory database with the schema applied. One connection, so every query sees the same DB.
#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}
