//! Category repository.

use std::collections::HashMap;

use sqlx::PgPool;

use dronshop_core::CategoryId;

use super::RepositoryError;
use crate::models::Category;

const SLUG_TAKEN: &str = "Category with this slug already exists";

/// Repository for the `categories` tree.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Storefront ordering: root categories first, then by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_roots_first(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, Category>(
            "SELECT id, slug, name, parent_id FROM categories
             ORDER BY (parent_id IS NULL) DESC, name ASC, id ASC",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Admin ordering: by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_name(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, Category>(
            "SELECT id, slug, name, parent_id FROM categories ORDER BY name ASC, id ASC",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, Category>(
            "SELECT id, slug, name, parent_id FROM categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Look up a category by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, Category>(
            "SELECT id, slug, name, parent_id FROM categories WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Snapshot of the whole tree as `id -> parent_id`, loaded in one query.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn parent_map(
        &self,
    ) -> Result<HashMap<CategoryId, Option<CategoryId>>, RepositoryError> {
        let rows = sqlx::query_as::<_, (CategoryId, Option<CategoryId>)>(
            "SELECT id, parent_id FROM categories",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create(
        &self,
        slug: &str,
        name: &str,
        parent_id: Option<CategoryId>,
    ) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(
            "INSERT INTO categories (slug, name, parent_id) VALUES ($1, $2, $3)
             RETURNING id, slug, name, parent_id",
        )
        .bind(slug)
        .bind(name)
        .bind(parent_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_or_database(e, SLUG_TAKEN))
    }

    /// Overwrite all editable fields of a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist and
    /// `RepositoryError::Conflict` if the slug is taken.
    pub async fn update(&self, category: &Category) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(
            "UPDATE categories SET slug = $2, name = $3, parent_id = $4 WHERE id = $1
             RETURNING id, slug, name, parent_id",
        )
        .bind(category.id)
        .bind(&category.slug)
        .bind(&category.name)
        .bind(category.parent_id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_or_database(e, SLUG_TAKEN))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a category in one transaction.
    ///
    /// Children are re-parented to the deleted category's parent and products
    /// in the category are detached (`category_id = NULL`).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let parent = sqlx::query_scalar::<_, Option<CategoryId>>(
            "SELECT parent_id FROM categories WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        sqlx::query("UPDATE categories SET parent_id = $2 WHERE parent_id = $1")
            .bind(id)
            .bind(parent)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE products SET category_id = NULL WHERE category_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
