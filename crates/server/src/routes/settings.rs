//! Site settings route handlers.
//!
//! `GET /api/settings/public` is open; everything else requires `admin`.

use std::collections::BTreeMap;

use axum::extract::State;
use serde::Deserialize;
use tracing::info;

use crate::db::SettingsRepository;
use crate::db::settings::SettingChanges;
use crate::error::{AppError, MapNotFound, OrNotFound, Result};
use crate::extract::{Json, Path, Query};
use crate::middleware::RequireAdmin;
use crate::models::{PublicSettings, SiteSetting, nullable};
use crate::routes::Success;
use crate::state::AppState;

const NOT_FOUND: &str = "Setting not found";

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub include_private: bool,
}

/// Partial update; explicit `null` clears `value` or `description`.
#[derive(Debug, Default, Deserialize)]
pub struct SettingUpdateForm {
    #[serde(default, deserialize_with = "nullable")]
    pub value: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub is_public: Option<bool>,
}

impl From<SettingUpdateForm> for SettingChanges {
    fn from(form: SettingUpdateForm) -> Self {
        Self {
            value: form.value,
            description: form.description,
            is_public: form.is_public,
        }
    }
}

/// Public settings with a value, as a flat map.
pub async fn public(State(state): State<AppState>) -> Result<Json<PublicSettings>> {
    let settings = SettingsRepository::new(state.pool()).list(false).await?;
    Ok(Json(settings.into_iter().collect()))
}

pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<SiteSetting>>> {
    let settings = SettingsRepository::new(state.pool())
        .list(query.include_private)
        .await?;
    Ok(Json(settings))
}

pub async fn get(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(key): Path<String>,
) -> Result<Json<SiteSetting>> {
    let setting = SettingsRepository::new(state.pool())
        .get(&key)
        .await
        .or_not_found(NOT_FOUND)?;
    Ok(Json(setting))
}

pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(setting): Json<SiteSetting>,
) -> Result<Json<SiteSetting>> {
    if setting.key.trim().is_empty() {
        return Err(AppError::BadRequest("Setting key cannot be empty".to_string()));
    }
    let created = SettingsRepository::new(state.pool()).create(&setting).await?;
    info!(key = %created.key, admin_id = %admin.id, "Setting created");
    Ok(Json(created))
}

pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(key): Path<String>,
    Json(form): Json<SettingUpdateForm>,
) -> Result<Json<SiteSetting>> {
    let updated = SettingsRepository::new(state.pool())
        .update(&key, &form.into())
        .await
        .map_not_found(NOT_FOUND)?;
    Ok(Json(updated))
}

pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(key): Path<String>,
) -> Result<Json<Success>> {
    SettingsRepository::new(state.pool())
        .delete(&key)
        .await
        .map_not_found(NOT_FOUND)?;
    info!(key = %key, admin_id = %admin.id, "Setting deleted");
    Ok(Json(Success::OK))
}

/// Upsert several values at once; unknown keys become public settings.
pub async fn batch(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Json(values): Json<BTreeMap<String, String>>,
) -> Result<Json<PublicSettings>> {
    SettingsRepository::new(state.pool())
        .upsert_values(&values)
        .await?;
    Ok(Json(PublicSettings { settings: values }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_update_form_null_clears() {
        let form: SettingUpdateForm =
            serde_json::from_str(r#"{"value": null, "is_public": false}"#).unwrap();
        let changes = SettingChanges::from(form);
        assert_eq!(changes.value, Some(None));
        assert_eq!(changes.description, None);
        assert_eq!(changes.is_public, Some(false));
    }

    #[test]
    fn test_create_body_defaults_to_public() {
        let setting: SiteSetting = serde_json::from_str(r#"{"key": "banner"}"#).unwrap();
        assert!(setting.is_public);
        assert_eq!(setting.value, None);
    }
}
