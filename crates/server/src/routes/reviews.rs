//! Public review route handlers.

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::info;

use dronshop_core::{ProductId, ReviewId};

use crate::db::reviews::NewReview;
use crate::db::{ProductRepository, ReviewRepository};
use crate::error::{AppError, MapNotFound, OrNotFound, Result};
use crate::extract::{Json, Path, Query};
use crate::middleware::OptionalAuth;
use crate::models::PublicReview;
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 100;

/// Reject ratings outside 1..=5.
///
/// # Errors
///
/// Returns `AppError::BadRequest`.
pub fn validate_rating(rating: i32) -> Result<()> {
    if (1..=5).contains(&rating) {
        Ok(())
    } else {
        Err(AppError::BadRequest(
            "Rating must be between 1 and 5".to_string(),
        ))
    }
}

/// Skip/limit paging shared by review listings.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

pub(crate) const fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

impl Paging {
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for a negative skip or limit.
    pub fn validated(self) -> Result<Self> {
        if self.skip < 0 || self.limit < 0 {
            return Err(AppError::BadRequest(
                "skip and limit cannot be negative".to_string(),
            ));
        }
        Ok(self)
    }
}

/// Review submitted from a product page. Any `product_id` in the body is
/// ignored in favor of the path.
#[derive(Debug, Deserialize)]
pub struct ReviewForm {
    pub name: String,
    pub email: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub pros: Option<String>,
    #[serde(default)]
    pub cons: Option<String>,
    pub rating: i32,
}

#[derive(Debug, Deserialize)]
pub struct HelpfulQuery {
    #[serde(default = "default_helpful")]
    pub helpful: bool,
}

const fn default_helpful() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct HelpfulResponse {
    pub success: bool,
    pub helpful_count: i32,
}

/// Submit a review; it stays hidden until a moderator approves it.
pub async fn create(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(product_id): Path<ProductId>,
    Json(form): Json<ReviewForm>,
) -> Result<Json<PublicReview>> {
    validate_rating(form.rating)?;

    ProductRepository::new(state.pool())
        .get(product_id)
        .await
        .or_not_found("Product not found")?;

    let review = ReviewRepository::new(state.pool())
        .create(&NewReview {
            product_id,
            user_id: user.map(|u| u.id),
            author_name: form.name,
            author_email: form.email,
            title: form.title,
            content: form.content,
            pros: form.pros,
            cons: form.cons,
            rating: form.rating,
        })
        .await?;

    info!(review_id = %review.id, product_id = %product_id, "Review submitted");
    Ok(Json(review.into()))
}

/// Approved reviews of a product.
pub async fn list_for_product(
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
    Query(paging): Query<Paging>,
) -> Result<Json<Vec<PublicReview>>> {
    let paging = paging.validated()?;
    let reviews = ReviewRepository::new(state.pool())
        .list_approved(product_id, paging.skip, paging.limit)
        .await?;
    Ok(Json(reviews.into_iter().map(PublicReview::from).collect()))
}

/// Count a helpful (or, with `?helpful=false`, unhelpful) vote.
pub async fn helpful(
    State(state): State<AppState>,
    Path(id): Path<ReviewId>,
    Query(query): Query<HelpfulQuery>,
) -> Result<Json<HelpfulResponse>> {
    let helpful_count = ReviewRepository::new(state.pool())
        .vote_helpful(id, query.helpful)
        .await
        .map_not_found("Review not found")?;

    Ok(Json(HelpfulResponse {
        success: true,
        helpful_count,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rating() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
    }

    #[test]
    fn test_paging_defaults() {
        let paging: Paging = serde_json::from_str("{}").unwrap();
        assert_eq!((paging.skip, paging.limit), (0, 100));
        assert!(Paging { skip: -1, limit: 10 }.validated().is_err());
    }

    #[test]
    fn test_helpful_defaults_to_true() {
        let query: HelpfulQuery = serde_json::from_str("{}").unwrap();
        assert!(query.helpful);
    }

    #[test]
    fn test_form_ignores_body_product_id() {
        let form: ReviewForm = serde_json::from_str(
            r#"{"product_id": 99, "name": "Ann", "email": "ann@example.com",
                "title": "Great", "content": "Flies well", "rating": 5}"#,
        )
        .unwrap();
        assert_eq!(form.rating, 5);
        assert!(form.pros.is_none());
    }
}
