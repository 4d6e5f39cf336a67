//! Site settings repository.

use std::collections::BTreeMap;

use sqlx::PgPool;

use super::RepositoryError;
use crate::models::SiteSetting;

const KEY_TAKEN: &str = "Setting with this key already exists";

/// Settings written at startup when the table is empty.
pub const DEFAULT_SETTINGS: [(&str, &str, &str); 4] = [
    ("site_name", "DronShop", "Site name"),
    ("site_description", "FPV/RC shop demo", "Site description"),
    ("contact_email", "info@dronshop.ru", "Contact email"),
    ("contact_phone", "+7 (999) 000-00-00", "Contact phone"),
];

/// Partial update. The outer `Option` is "field present", the inner one the
/// new (possibly `NULL`) value.
#[derive(Debug, Clone, Default)]
pub struct SettingChanges {
    pub value: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub is_public: Option<bool>,
}

/// Repository for `site_settings`.
pub struct SettingsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SettingsRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All settings ordered by key; private ones only when asked for.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, include_private: bool) -> Result<Vec<SiteSetting>, RepositoryError> {
        let rows = sqlx::query_as::<_, SiteSetting>(
            "SELECT key, value, description, is_public FROM site_settings
             WHERE is_public OR $1
             ORDER BY key",
        )
        .bind(include_private)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, key: &str) -> Result<Option<SiteSetting>, RepositoryError> {
        let row = sqlx::query_as::<_, SiteSetting>(
            "SELECT key, value, description, is_public FROM site_settings WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the key already exists.
    pub async fn create(&self, setting: &SiteSetting) -> Result<SiteSetting, RepositoryError> {
        sqlx::query_as::<_, SiteSetting>(
            "INSERT INTO site_settings (key, value, description, is_public)
             VALUES ($1, $2, $3, $4)
             RETURNING key, value, description, is_public",
        )
        .bind(&setting.key)
        .bind(&setting.value)
        .bind(&setting.description)
        .bind(setting.is_public)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_or_database(e, KEY_TAKEN))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the key does not exist.
    pub async fn update(
        &self,
        key: &str,
        changes: &SettingChanges,
    ) -> Result<SiteSetting, RepositoryError> {
        sqlx::query_as::<_, SiteSetting>(
            "UPDATE site_settings SET
                 value = CASE WHEN $2 THEN $3 ELSE value END,
                 description = CASE WHEN $4 THEN $5 ELSE description END,
                 is_public = COALESCE($6, is_public)
             WHERE key = $1
             RETURNING key, value, description, is_public",
        )
        .bind(key)
        .bind(changes.value.is_some())
        .bind(changes.value.clone().flatten())
        .bind(changes.description.is_some())
        .bind(changes.description.clone().flatten())
        .bind(changes.is_public)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the key does not exist.
    pub async fn delete(&self, key: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM site_settings WHERE key = $1")
            .bind(key)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Set many values at once, creating public settings for unknown keys.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails; nothing is written then.
    pub async fn upsert_values(
        &self,
        values: &BTreeMap<String, String>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for (key, value) in values {
            sqlx::query(
                "INSERT INTO site_settings (key, value) VALUES ($1, $2)
                 ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
            )
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Write [`DEFAULT_SETTINGS`] if the table has no rows.
    ///
    /// Returns `true` when the defaults were written.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn seed_defaults_if_empty(&self) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM site_settings")
            .fetch_one(&mut *tx)
            .await?;
        if count > 0 {
            return Ok(false);
        }

        for (key, value, description) in DEFAULT_SETTINGS {
            sqlx::query(
                "INSERT INTO site_settings (key, value, description, is_public)
                 VALUES ($1, $2, $3, TRUE)
                 ON CONFLICT (key) DO NOTHING",
            )
            .bind(key)
            .bind(value)
            .bind(description)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }
}
