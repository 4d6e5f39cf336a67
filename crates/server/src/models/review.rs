//! Product reviews.

use chrono::{DateTime, Utc};
use serde::Serialize;

use dronshop_core::{ProductId, ReviewId, UserId};

/// A row from `reviews`; serializes as the admin view (with author email).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: Option<UserId>,
    #[serde(rename = "name")]
    pub author_name: String,
    #[serde(rename = "email")]
    pub author_email: String,
    pub title: String,
    pub content: String,
    pub pros: Option<String>,
    pub cons: Option<String>,
    pub rating: i32,
    pub helpful_count: i32,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

/// Public view of a review; the author's email is withheld.
#[derive(Debug, Clone, Serialize)]
pub struct PublicReview {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: Option<UserId>,
    pub name: String,
    pub title: String,
    pub content: String,
    pub pros: Option<String>,
    pub cons: Option<String>,
    pub rating: i32,
    pub helpful_count: i32,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Review> for PublicReview {
    fn from(review: Review) -> Self {
        Self {
            id: review.id,
            product_id: review.product_id,
            user_id: review.user_id,
            name: review.author_name,
            title: review.title,
            content: review.content,
            pros: review.pros,
            cons: review.cons,
            rating: review.rating,
            helpful_count: review.helpful_count,
            approved: review.approved,
            created_at: review.created_at,
        }
    }
}
