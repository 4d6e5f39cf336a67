//! Product and product image repository.

use std::collections::HashMap;
use std::str::FromStr;

use sqlx::{PgPool, Postgres, QueryBuilder};

use dronshop_core::{CategoryId, Price, ProductId, ProductImageId};

use super::RepositoryError;
use crate::models::{Product, ProductImage};

const PRODUCT_COLUMNS: &str =
    "p.id, p.name, p.description, p.price, p.category_id, p.active, p.created_at";

// =============================================================================
// Listing filters
// =============================================================================

/// Column a product listing can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Price,
    Name,
    CreatedAt,
}

/// Validated `sort` parameter, e.g. `price` or `created_at:desc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductSort {
    pub key: SortKey,
    pub descending: bool,
}

impl ProductSort {
    /// Newest first.
    pub const NEWEST: Self = Self {
        key: SortKey::CreatedAt,
        descending: true,
    };

    /// `ORDER BY` clause. Only whitelisted column names ever reach SQL.
    #[must_use]
    pub const fn order_by(self) -> &'static str {
        match (self.key, self.descending) {
            (SortKey::Price, false) => "p.price ASC, p.id ASC",
            (SortKey::Price, true) => "p.price DESC, p.id DESC",
            (SortKey::Name, false) => "p.name ASC, p.id ASC",
            (SortKey::Name, true) => "p.name DESC, p.id DESC",
            (SortKey::CreatedAt, false) => "p.created_at ASC, p.id ASC",
            (SortKey::CreatedAt, true) => "p.created_at DESC, p.id DESC",
        }
    }
}

impl FromStr for ProductSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, direction) = s.split_once(':').unwrap_or((s, "asc"));
        let key = match key {
            "price" => SortKey::Price,
            "name" => SortKey::Name,
            "created_at" => SortKey::CreatedAt,
            _ => return Err(format!("unsupported sort key '{key}'")),
        };
        let descending = match direction {
            "asc" => false,
            "desc" => true,
            _ => return Err(format!("unsupported sort direction '{direction}'")),
        };
        Ok(Self { key, descending })
    }
}

/// Filters shared by the storefront and admin product listings.
#[derive(Debug, Clone)]
pub struct ProductFilter {
    pub category: Option<CategoryId>,
    pub search: Option<String>,
    pub active: Option<bool>,
    pub price_min: Option<Price>,
    pub price_max: Option<Price>,
    /// Only products whose inventory row has `current - reserved > 0`.
    pub in_stock: bool,
    pub sort: ProductSort,
    pub limit: i64,
    pub offset: i64,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            category: None,
            search: None,
            active: None,
            price_min: None,
            price_max: None,
            in_stock: false,
            sort: ProductSort::NEWEST,
            limit: 100,
            offset: 0,
        }
    }
}

/// Escape `%`, `_` and `\` so user input matches literally inside `ILIKE`.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    if filter.in_stock {
        qb.push(" JOIN inventory i ON i.product_id = p.id");
    }
    qb.push(" WHERE TRUE");

    if let Some(active) = filter.active {
        qb.push(" AND p.active = ").push_bind(active);
    }
    if let Some(category) = filter.category {
        qb.push(" AND p.category_id = ").push_bind(category);
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        qb.push(" AND p.name ILIKE ")
            .push_bind(format!("%{}%", escape_like(search)));
    }
    if let Some(min) = filter.price_min {
        qb.push(" AND p.price >= ").push_bind(min);
    }
    if let Some(max) = filter.price_max {
        qb.push(" AND p.price <= ").push_bind(max);
    }
    if filter.in_stock {
        qb.push(" AND i.current_stock - i.reserved_stock > 0");
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Fields for a new product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Price,
    pub category_id: Option<CategoryId>,
    pub active: bool,
}

/// Repository for products and their image galleries.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of products matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products p"));
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY ").push(filter.sort.order_by());
        qb.push(" LIMIT ").push_bind(filter.limit);
        qb.push(" OFFSET ").push_bind(filter.offset);

        let rows = qb.build_query_as::<Product>().fetch_all(self.pool).await?;
        Ok(rows)
    }

    /// Number of products matching `filter`, ignoring pagination.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, filter: &ProductFilter) -> Result<i64, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(DISTINCT p.id) FROM products p");
        push_filters(&mut qb, filter);

        let total = qb.build_query_scalar::<i64>().fetch_one(self.pool).await?;
        Ok(total)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Insert a product together with an empty inventory row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn create(&self, new: &NewProduct) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let product = sqlx::query_as::<_, Product>(
            "INSERT INTO products AS p (name, description, price, category_id, active)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING p.id, p.name, p.description, p.price, p.category_id, p.active, p.created_at",
        )
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.price)
        .bind(new.category_id)
        .bind(new.active)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO inventory (product_id, current_stock, reserved_stock) VALUES ($1, 0, 0)",
        )
        .bind(product.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(product)
    }

    /// Overwrite all editable fields of a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn update(&self, product: &Product) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(
            "UPDATE products AS p
             SET name = $2, description = $3, price = $4, category_id = $5, active = $6
             WHERE p.id = $1
             RETURNING p.id, p.name, p.description, p.price, p.category_id, p.active, p.created_at",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.category_id)
        .bind(product.active)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a product, its gallery rows and inventory in one transaction.
    ///
    /// Returns the URLs of the deleted images so the caller can remove files.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn delete(&self, id: ProductId) -> Result<Vec<String>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let urls = sqlx::query_scalar::<_, String>(
            "DELETE FROM product_images WHERE product_id = $1 RETURNING url",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM inventory WHERE product_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(urls)
    }

    // =========================================================================
    // Images
    // =========================================================================

    /// Galleries for many products, each ordered by `sort` then `id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn galleries(
        &self,
        product_ids: &[ProductId],
    ) -> Result<HashMap<ProductId, Vec<ProductImage>>, RepositoryError> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let ids: Vec<i32> = product_ids.iter().map(ProductId::as_i32).collect();
        let rows = sqlx::query_as::<_, ProductImage>(
            "SELECT id, product_id, url, sort FROM product_images
             WHERE product_id = ANY($1)
             ORDER BY product_id ASC, sort ASC, id ASC",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut grouped: HashMap<ProductId, Vec<ProductImage>> = HashMap::new();
        for row in rows {
            grouped.entry(row.product_id).or_default().push(row);
        }
        Ok(grouped)
    }

    /// Append an image to the end of a product's gallery (`sort = max + 1`).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn add_image(
        &self,
        product_id: ProductId,
        url: &str,
    ) -> Result<ProductImage, RepositoryError> {
        let image = sqlx::query_as::<_, ProductImage>(
            "INSERT INTO product_images (product_id, url, sort)
             SELECT $1, $2, COALESCE(MAX(sort), 0) + 1
             FROM product_images WHERE product_id = $1
             RETURNING id, product_id, url, sort",
        )
        .bind(product_id)
        .bind(url)
        .fetch_one(self.pool)
        .await?;
        Ok(image)
    }

    /// Delete one image row belonging to `product_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such image exists for the product.
    pub async fn delete_image(
        &self,
        product_id: ProductId,
        image_id: ProductImageId,
    ) -> Result<ProductImage, RepositoryError> {
        sqlx::query_as::<_, ProductImage>(
            "DELETE FROM product_images WHERE id = $1 AND product_id = $2
             RETURNING id, product_id, url, sort",
        )
        .bind(image_id)
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_parse() {
        assert_eq!(
            "price".parse::<ProductSort>().unwrap(),
            ProductSort {
                key: SortKey::Price,
                descending: false
            }
        );
        assert_eq!(
            "created_at:desc".parse::<ProductSort>().unwrap(),
            ProductSort::NEWEST
        );
        assert!("name:sideways".parse::<ProductSort>().is_err());
        assert!("password_hash".parse::<ProductSort>().is_err());
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("falcon"), "falcon");
    }

    #[test]
    fn test_filters_sql_shape() {
        let filter = ProductFilter {
            category: Some(CategoryId::new(3)),
            search: Some("falcon".to_string()),
            active: Some(true),
            in_stock: true,
            ..ProductFilter::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT p.id FROM products p");
        push_filters(&mut qb, &filter);
        let sql = qb.sql();

        assert!(sql.contains("JOIN inventory i ON i.product_id = p.id"));
        assert!(sql.contains("p.active = $1"));
        assert!(sql.contains("p.category_id = $2"));
        assert!(sql.contains("p.name ILIKE $3"));
        assert!(sql.contains("i.current_stock - i.reserved_stock > 0"));
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let filter = ProductFilter {
            search: Some("   ".to_string()),
            ..ProductFilter::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT p.id FROM products p");
        push_filters(&mut qb, &filter);
        assert!(!qb.sql().contains("ILIKE"));
    }
}
