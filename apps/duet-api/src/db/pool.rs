use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;

use super::store::StoreError;

pub type DbPool = Pool<AsyncPgConnection>;

/// Create a Diesel async connection pool.
///
/// No connection is opened here; an unreachable database surfaces as
/// `StoreError::Unavailable` on first use.
pub fn connect(database_url: &str, max_size: usize) -> Result<DbPool, StoreError> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    let pool = Pool::builder(manager)
        .max_size(max_size)
        .build()
        .map_err(|err| StoreError::Configuration(format!("failed to build connection pool: {err}")))?;

    tracing::info!(max_size, "database pool created");

    Ok(pool)
}
