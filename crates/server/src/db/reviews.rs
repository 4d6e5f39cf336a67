//! Review repository.

use sqlx::PgPool;

use dronshop_core::{ProductId, ReviewId, UserId};

use super::RepositoryError;
use crate::models::Review;

const REVIEW_COLUMNS: &str = "id, product_id, user_id, author_name, author_email, title, content, \
     pros, cons, rating, helpful_count, approved, created_at";

/// Fields of a newly submitted review.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub product_id: ProductId,
    pub user_id: Option<UserId>,
    pub author_name: String,
    pub author_email: String,
    pub title: String,
    pub content: String,
    pub pros: Option<String>,
    pub cons: Option<String>,
    pub rating: i32,
}

/// Partial admin edit; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ReviewChanges {
    pub author_name: Option<String>,
    pub author_email: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub pros: Option<String>,
    pub cons: Option<String>,
    pub rating: Option<i32>,
    pub approved: Option<bool>,
}

/// Admin listing filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReviewFilter {
    pub approved: Option<bool>,
    pub product_id: Option<ProductId>,
    pub skip: i64,
    pub limit: i64,
}

/// Repository for product reviews.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an unapproved review with a zero helpful count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(&self, new: &NewReview) -> Result<Review, RepositoryError> {
        let review = sqlx::query_as::<_, Review>(&format!(
            "INSERT INTO reviews
                 (product_id, user_id, author_name, author_email, title, content, pros, cons, rating)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(new.product_id)
        .bind(new.user_id)
        .bind(&new.author_name)
        .bind(&new.author_email)
        .bind(&new.title)
        .bind(&new.content)
        .bind(&new.pros)
        .bind(&new.cons)
        .bind(new.rating)
        .fetch_one(self.pool)
        .await?;
        Ok(review)
    }

    /// Approved reviews of one product, in submission order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_approved(
        &self,
        product_id: ProductId,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Review>, RepositoryError> {
        let rows = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews
             WHERE product_id = $1 AND approved
             ORDER BY id ASC
             OFFSET $2 LIMIT $3"
        ))
        .bind(product_id)
        .bind(skip)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Admin listing, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: ReviewFilter) -> Result<Vec<Review>, RepositoryError> {
        let rows = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews
             WHERE ($1::BOOLEAN IS NULL OR approved = $1)
               AND ($2::INTEGER IS NULL OR product_id = $2)
             ORDER BY created_at DESC, id DESC
             OFFSET $3 LIMIT $4"
        ))
        .bind(filter.approved)
        .bind(filter.product_id)
        .bind(filter.skip)
        .bind(filter.limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        let row = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Apply a partial edit.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review does not exist.
    pub async fn update(
        &self,
        id: ReviewId,
        changes: &ReviewChanges,
    ) -> Result<Review, RepositoryError> {
        sqlx::query_as::<_, Review>(&format!(
            "UPDATE reviews SET
                 author_name = COALESCE($2, author_name),
                 author_email = COALESCE($3, author_email),
                 title = COALESCE($4, title),
                 content = COALESCE($5, content),
                 pros = COALESCE($6, pros),
                 cons = COALESCE($7, cons),
                 rating = COALESCE($8, rating),
                 approved = COALESCE($9, approved)
             WHERE id = $1
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(id)
        .bind(&changes.author_name)
        .bind(&changes.author_email)
        .bind(&changes.title)
        .bind(&changes.content)
        .bind(&changes.pros)
        .bind(&changes.cons)
        .bind(changes.rating)
        .bind(changes.approved)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review does not exist.
    pub async fn set_approved(&self, id: ReviewId, approved: bool) -> Result<Review, RepositoryError> {
        self.update(
            id,
            &ReviewChanges {
                approved: Some(approved),
                ..ReviewChanges::default()
            },
        )
        .await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review does not exist.
    pub async fn delete(&self, id: ReviewId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Increment or decrement the helpful counter, never below zero.
    ///
    /// Returns the new count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review does not exist.
    pub async fn vote_helpful(&self, id: ReviewId, helpful: bool) -> Result<i32, RepositoryError> {
        let delta = if helpful { 1 } else { -1 };
        sqlx::query_scalar::<_, i32>(
            "UPDATE reviews SET helpful_count = GREATEST(helpful_count + $2, 0)
             WHERE id = $1
             RETURNING helpful_count",
        )
        .bind(id)
        .bind(delta)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}
