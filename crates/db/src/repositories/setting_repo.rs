//! Repository for the `app_settings` key/value table.

use sqlx::PgPool;

use crate::models::setting::AppSetting;

/// Provides reads and upserts of application settings.
pub struct SettingRepo;

impl SettingRepo {
    /// All settings whose key starts with `prefix`.
    pub async fn list_by_prefix(
        pool: &PgPool,
        prefix: &str,
    ) -> Result<Vec<AppSetting>, sqlx::Error> {
        sqlx::query_as::<_, AppSetting>(
            "SELECT key, value, updated_at FROM app_settings
             WHERE starts_with(key, $1)
             ORDER BY key",
        )
        .bind(prefix)
        .fetch_all(pool)
        .await
    }

    /// Insert or replace several settings in one transaction.
    pub async fn upsert_many(pool: &PgPool, entries: &[(String, String)]) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        for (key, value) in entries {
            sqlx::query(
                "INSERT INTO app_settings (key, value) VALUES ($1, $2)
                 ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
            )
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
