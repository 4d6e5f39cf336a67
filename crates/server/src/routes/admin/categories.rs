//! Category management.

use axum::extract::State;
use serde::Deserialize;
use tracing::info;

use dronshop_core::CategoryId;

use crate::db::CategoryRepository;
use crate::error::{AppError, MapNotFound, OrNotFound, Result};
use crate::extract::{Json, Path};
use crate::middleware::RequireAdmin;
use crate::models::{Category, nullable};
use crate::routes::Success;
use crate::services::catalog::validate_parent;
use crate::state::AppState;

const NOT_FOUND: &str = "Category not found";

#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
}

/// Partial update; `"parent_id": null` moves the category to the root.
#[derive(Debug, Default, Deserialize)]
pub struct CategoryUpdateForm {
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub parent_id: Option<Option<CategoryId>>,
}

impl CategoryUpdateForm {
    fn apply(self, category: &mut Category) {
        if let Some(slug) = self.slug {
            category.slug = slug;
        }
        if let Some(name) = self.name {
            category.name = name;
        }
        if let Some(parent_id) = self.parent_id {
            category.parent_id = parent_id;
        }
    }
}

fn require_non_blank(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// All categories ordered by name.
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Vec<Category>>> {
    let categories = CategoryRepository::new(state.pool()).list_by_name().await?;
    Ok(Json(categories))
}

pub async fn get(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<CategoryId>,
) -> Result<Json<Category>> {
    let category = CategoryRepository::new(state.pool())
        .get(id)
        .await
        .or_not_found(NOT_FOUND)?;
    Ok(Json(category))
}

pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(form): Json<CategoryForm>,
) -> Result<Json<Category>> {
    require_non_blank(&form.slug, "slug")?;
    require_non_blank(&form.name, "name")?;

    let repo = CategoryRepository::new(state.pool());
    validate_parent(&repo.parent_map().await?, None, form.parent_id)?;

    let category = repo.create(&form.slug, &form.name, form.parent_id).await?;
    state.categories().invalidate().await;

    info!(category_id = %category.id, slug = %category.slug, admin_id = %admin.id, "Category created");
    Ok(Json(category))
}

pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<CategoryId>,
    Json(form): Json<CategoryUpdateForm>,
) -> Result<Json<Category>> {
    let repo = CategoryRepository::new(state.pool());
    let mut category = repo.get(id).await.or_not_found(NOT_FOUND)?;

    if let Some(slug) = &form.slug {
        require_non_blank(slug, "slug")?;
    }
    if let Some(name) = &form.name {
        require_non_blank(name, "name")?;
    }
    if let Some(parent_id) = form.parent_id {
        validate_parent(&repo.parent_map().await?, Some(id), parent_id)?;
    }

    form.apply(&mut category);
    let updated = repo.update(&category).await.map_not_found(NOT_FOUND)?;
    state.categories().invalidate().await;
    Ok(Json(updated))
}

/// Delete a category; children move up a level and products are detached.
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CategoryId>,
) -> Result<Json<Success>> {
    CategoryRepository::new(state.pool())
        .delete(id)
        .await
        .map_not_found(NOT_FOUND)?;
    state.categories().invalidate().await;

    info!(category_id = %id, admin_id = %admin.id, "Category deleted");
    Ok(Json(Success::OK))
}
