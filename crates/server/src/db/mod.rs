mod audit;
mod repository;

pub use audit::{AuditEntry, AuditLog};
pub use repository::PatientRepository;

use deadpool_postgres::{Config, Pool, Runtime};
use tokio_postgres::NoTls;

const SCHEMA: &str = include_str!("schema.sql");

/// Database failures outside the patient store
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("failed to create pool: {0}")]
    CreatePool(#[from] deadpool_postgres::CreatePoolError),

    #[error("failed to get connection: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("database query failed: {0}")]
    Query(#[from] tokio_postgres::Error),
}

/// Create a connection pool from a database URL
pub async fn create_pool(database_url: &str) -> Result<Pool, DbError> {
    let mut cfg = Config::new();
    cfg.url = Some(database_url.to_string());
    Ok(cfg.create_pool(Some(Runtime::Tokio1), NoTls)?)
}

/// Create tables and indexes if they do not exist
pub async fn apply_schema(pool: &Pool) -> Result<(), DbError> {
    let client = pool.get().await?;
    client.batch_execute(SCHEMA).await?;
    tracing::info!("Database schema applied");
    Ok(())
}
