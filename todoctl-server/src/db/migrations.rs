//! Schema migrations for the todos table

use sqlx::PgPool;

/// Apply the schema. Safe to run on every startup.
pub async fn run(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Running todo migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS todos (
            id BIGSERIAL PRIMARY KEY,
            title VARCHAR(255) NOT NULL CHECK (length(btrim(title)) > 0),
            completed BOOLEAN NOT NULL DEFAULT FALSE,
            version BIGINT NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Todo migrations complete");
    Ok(())
}
