use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};

use crate::errors::{AppError, AppResult};

pub type DbPool = Pool<ConnectionManager<PgConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<PgConnection>>;

pub fn create_pool(database_url: &str, max_size: u32) -> AppResult<DbPool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = Pool::builder()
        .max_size(max_size)
        .min_idle(Some(max_size.min(2)))
        .test_on_check_out(true)
        .build(manager)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to create database pool: {e}")))?;

    tracing::info!(max_size, "database connection pool created");
    Ok(pool)
}

pub fn checkout(pool: &DbPool) -> AppResult<DbConnection> {
    pool.get().map_err(|e| {
        tracing::error!(error = %e, "failed to get db connection");
        AppError::new(crate::errors::ErrorCode::ServiceUnavailable, "database connection error")
    })
}
