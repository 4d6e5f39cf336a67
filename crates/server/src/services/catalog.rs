//! Category tree rules, the public category cache and product presentation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use thiserror::Error;

use dronshop_core::CategoryId;

use crate::db::{CategoryRepository, ProductRepository, RepositoryError};
use crate::models::{Category, Product, ProductOut};
use crate::services::media::MediaStore;

/// How long `GET /api/categories` results are reused.
pub const CATEGORY_CACHE_TTL: Duration = Duration::from_secs(60);

/// Invalid parent assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CategoryTreeError {
    #[error("Parent category not found")]
    ParentNotFound,

    #[error("Category cannot be its own parent")]
    SelfParent,

    #[error("Parent category creates a cycle")]
    Cycle,
}

/// Check that `proposed` may become the parent of `editing`.
///
/// `tree` maps every category id to its parent. `editing` is `None` when
/// creating a category. Walking up from `proposed` must never reach
/// `editing`; a visited set stops the walk on loops already in the data.
///
/// # Errors
///
/// Returns the matching `CategoryTreeError`.
pub fn validate_parent(
    tree: &HashMap<CategoryId, Option<CategoryId>>,
    editing: Option<CategoryId>,
    proposed: Option<CategoryId>,
) -> Result<(), CategoryTreeError> {
    let Some(parent) = proposed else {
        return Ok(());
    };
    if !tree.contains_key(&parent) {
        return Err(CategoryTreeError::ParentNotFound);
    }
    let Some(editing) = editing else {
        return Ok(());
    };
    if parent == editing {
        return Err(CategoryTreeError::SelfParent);
    }

    let mut visited = HashSet::new();
    let mut cursor = Some(parent);
    while let Some(current) = cursor {
        if current == editing {
            return Err(CategoryTreeError::Cycle);
        }
        if !visited.insert(current) {
            break;
        }
        cursor = tree.get(&current).copied().flatten();
    }
    Ok(())
}

/// Public category list cached for [`CATEGORY_CACHE_TTL`].
#[derive(Clone)]
pub struct CategoryCache {
    cache: Cache<(), Arc<Vec<Category>>>,
}

impl Default for CategoryCache {
    fn default() -> Self {
        Self::new(CATEGORY_CACHE_TTL)
    }
}

impl CategoryCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
        }
    }

    /// Categories with roots first, loaded on a miss.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if loading fails; nothing is cached then.
    pub async fn get_or_load(&self, pool: &PgPool) -> Result<Arc<Vec<Category>>, RepositoryError> {
        if let Some(hit) = self.cache.get(&()).await {
            return Ok(hit);
        }
        let fresh = Arc::new(CategoryRepository::new(pool).list_roots_first().await?);
        self.cache.insert((), Arc::clone(&fresh)).await;
        Ok(fresh)
    }

    /// Drop the cached list after an admin change.
    pub async fn invalidate(&self) {
        self.cache.invalidate(&()).await;
    }
}

/// Attach galleries (or legacy folder images) to products.
///
/// # Errors
///
/// Returns `RepositoryError` if loading galleries fails.
pub async fn present_products(
    pool: &PgPool,
    media: &MediaStore,
    products: Vec<Product>,
) -> Result<Vec<ProductOut>, RepositoryError> {
    let ids: Vec<_> = products.iter().map(|p| p.id).collect();
    let mut galleries = ProductRepository::new(pool).galleries(&ids).await?;

    let mut out = Vec::with_capacity(products.len());
    for product in products {
        let gallery = galleries.remove(&product.id).unwrap_or_default();
        let fallback = if gallery.is_empty() {
            media.legacy_images(&product.name).await
        } else {
            Vec::new()
        };
        out.push(ProductOut::new(product, gallery, fallback));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: i32) -> CategoryId {
        CategoryId::new(n)
    }

    /// 1 <- 2 <- 3, and 4 standalone.
    fn tree() -> HashMap<CategoryId, Option<CategoryId>> {
        HashMap::from([
            (id(1), None),
            (id(2), Some(id(1))),
            (id(3), Some(id(2))),
            (id(4), None),
        ])
    }

    #[test]
    fn test_root_and_valid_parents() {
        assert_eq!(validate_parent(&tree(), Some(id(3)), None), Ok(()));
        assert_eq!(validate_parent(&tree(), Some(id(4)), Some(id(3))), Ok(()));
        assert_eq!(validate_parent(&tree(), None, Some(id(2))), Ok(()));
    }

    #[test]
    fn test_missing_parent() {
        assert_eq!(
            validate_parent(&tree(), None, Some(id(99))),
            Err(CategoryTreeError::ParentNotFound)
        );
    }

    #[test]
    fn test_self_parent() {
        assert_eq!(
            validate_parent(&tree(), Some(id(2)), Some(id(2))),
            Err(CategoryTreeError::SelfParent)
        );
    }

    #[test]
    fn test_cycles_are_rejected() {
        // 1 -> 3 would close 1 <- 2 <- 3 <- 1.
        assert_eq!(
            validate_parent(&tree(), Some(id(1)), Some(id(3))),
            Err(CategoryTreeError::Cycle)
        );
        // Two-node cycle A -> B -> A.
        assert_eq!(
            validate_parent(&tree(), Some(id(1)), Some(id(2))),
            Err(CategoryTreeError::Cycle)
        );
    }

    #[test]
    fn test_corrupt_loop_terminates() {
        let looped = HashMap::from([(id(1), Some(id(2))), (id(2), Some(id(1))), (id(5), None)]);
        assert_eq!(validate_parent(&looped, Some(id(5)), Some(id(1))), Ok(()));
    }
}
