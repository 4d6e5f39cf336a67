//! User moderation.

use std::str::FromStr;

use axum::extract::State;
use serde::Deserialize;
use tracing::info;

use dronshop_core::{UserId, roles};

use crate::db::UserRepository;
use crate::error::{AppError, MapNotFound, OrNotFound, Result};
use crate::extract::{Json, Path, Query};
use crate::middleware::RequireAdmin;
use crate::models::{Account, AdminUserOut};
use crate::routes::Success;
use crate::state::AppState;

const NOT_FOUND: &str = "User not found";

/// `?action=` values accepted by `PATCH /api/admin/users/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Block,
    Unblock,
    MakeAdmin,
    RemoveAdmin,
}

impl FromStr for UserAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "block" => Ok(Self::Block),
            "unblock" => Ok(Self::Unblock),
            "make_admin" => Ok(Self::MakeAdmin),
            "remove_admin" => Ok(Self::RemoveAdmin),
            _ => Err(AppError::BadRequest("Unsupported action".to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UserActionQuery {
    #[serde(default)]
    pub action: String,
}

/// All users, newest first, with their roles.
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Vec<AdminUserOut>>> {
    let repo = UserRepository::new(state.pool());
    let users = repo.list().await?;
    let ids: Vec<UserId> = users.iter().map(|u| u.id).collect();
    let mut roles = repo.roles_for_many(&ids).await?;

    let out = users
        .into_iter()
        .map(|user| {
            let roles = roles.remove(&user.id).unwrap_or_default();
            AdminUserOut::from(Account { user, roles })
        })
        .collect();
    Ok(Json(out))
}

/// Block, unblock, grant or revoke admin.
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
    Query(query): Query<UserActionQuery>,
) -> Result<Json<Success>> {
    let action: UserAction = query.action.parse()?;
    let repo = UserRepository::new(state.pool());
    repo.get_by_id(id).await.or_not_found(NOT_FOUND)?;

    match action {
        UserAction::Block => repo.set_blocked(id, true).await.map_not_found(NOT_FOUND)?,
        UserAction::Unblock => repo.set_blocked(id, false).await.map_not_found(NOT_FOUND)?,
        UserAction::MakeAdmin => repo.grant_role(id, roles::ADMIN).await?,
        UserAction::RemoveAdmin => repo.revoke_role(id, roles::ADMIN).await?,
    }

    info!(user_id = %id, action = ?action, admin_id = %admin.id, "User updated");
    Ok(Json(Success::OK))
}

pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<Json<Success>> {
    UserRepository::new(state.pool())
        .delete(id)
        .await
        .map_not_found(NOT_FOUND)?;

    info!(user_id = %id, admin_id = %admin.id, "User deleted");
    Ok(Json(Success::OK))
}
