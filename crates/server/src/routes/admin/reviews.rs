//! Review moderation.

use axum::extract::State;
use serde::Deserialize;
use tracing::info;

use dronshop_core::{ProductId, ReviewId};

use crate::db::ReviewRepository;
use crate::db::reviews::{ReviewChanges, ReviewFilter};
use crate::error::{MapNotFound, Result};
use crate::extract::{Json, Path, Query};
use crate::middleware::RequireAdmin;
use crate::models::Review;
use crate::routes::Success;
use crate::routes::reviews::{Paging, default_limit, validate_rating};
use crate::state::AppState;

const NOT_FOUND: &str = "Review not found";

#[derive(Debug, Deserialize)]
pub struct ReviewListQuery {
    #[serde(default)]
    pub approved: Option<bool>,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// Moderator edit; fields that are absent are left alone.
#[derive(Debug, Default, Deserialize)]
pub struct ReviewUpdateForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub pros: Option<String>,
    pub cons: Option<String>,
    pub rating: Option<i32>,
    pub approved: Option<bool>,
}

impl From<ReviewUpdateForm> for ReviewChanges {
    fn from(form: ReviewUpdateForm) -> Self {
        Self {
            author_name: form.name,
            author_email: form.email,
            title: form.title,
            content: form.content,
            pros: form.pros,
            cons: form.cons,
            rating: form.rating,
            approved: form.approved,
        }
    }
}

/// All reviews, pending ones included, with author emails.
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Query(query): Query<ReviewListQuery>,
) -> Result<Json<Vec<Review>>> {
    let paging = Paging {
        skip: query.skip,
        limit: query.limit,
    }
    .validated()?;
    let reviews = ReviewRepository::new(state.pool())
        .list(ReviewFilter {
            approved: query.approved,
            product_id: query.product_id,
            skip: paging.skip,
            limit: paging.limit,
        })
        .await?;
    Ok(Json(reviews))
}

pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<ReviewId>,
    Json(form): Json<ReviewUpdateForm>,
) -> Result<Json<Review>> {
    if let Some(rating) = form.rating {
        validate_rating(rating)?;
    }
    let review = ReviewRepository::new(state.pool())
        .update(id, &form.into())
        .await
        .map_not_found(NOT_FOUND)?;
    Ok(Json(review))
}

pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ReviewId>,
) -> Result<Json<Success>> {
    ReviewRepository::new(state.pool())
        .delete(id)
        .await
        .map_not_found(NOT_FOUND)?;
    info!(review_id = %id, admin_id = %admin.id, "Review deleted");
    Ok(Json(Success::OK))
}

/// Publish a review.
pub async fn approve(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<ReviewId>,
) -> Result<Json<Review>> {
    set_approved(&state, id, true).await
}

/// Hide a review again.
pub async fn reject(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<ReviewId>,
) -> Result<Json<Review>> {
    set_approved(&state, id, false).await
}

async fn set_approved(state: &AppState, id: ReviewId, approved: bool) -> Result<Json<Review>> {
    let review = ReviewRepository::new(state.pool())
        .set_approved(id, approved)
        .await
        .map_not_found(NOT_FOUND)?;
    info!(review_id = %id, approved, "Review moderated");
    Ok(Json(review))
}
