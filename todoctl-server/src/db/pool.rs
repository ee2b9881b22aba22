//! PostgreSQL connection pool

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Pool size when `[database].max_connections` is not set.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Connect with the default pool size.
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    create_pool_with_options(database_url, DEFAULT_MAX_CONNECTIONS).await
}

/// Connect with at most `max_connections` open connections.
///
/// Every todo request holds one connection; the locked completion path
/// holds it for the whole transaction.
pub async fn create_pool_with_options(
    database_url: &str,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    tracing::debug!(max_connections, "connecting to PostgreSQL");
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires database"]
    async fn pool_respects_max_connections() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = create_pool_with_options(&url, 2).await.unwrap();

        let (one,): (i32,) = sqlx::query_as("SELECT 1").fetch_one(&pool).await.unwrap();
        assert_eq!(one, 1);
        assert!(pool.size() <= 2);
    }
}
