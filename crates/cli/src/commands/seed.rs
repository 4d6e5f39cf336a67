//! Catalog seeding from YAML.
//!
//! ```yaml
//! categories:
//!   - slug: drones
//!     name: Drones
//!   - slug: fpv
//!     name: FPV kits
//!     parent: drones        # slug defined earlier in the file or in the database
//! products:
//!   - name: Falcon 5 FPV Racer
//!     description: Five inch freestyle frame.
//!     price: 32990
//!     category: fpv
//!     stock: 12
//!     reserved: 0           # optional
//!     active: true          # optional
//! ```
//!
//! Categories are matched by slug and products by name; existing rows are
//! left untouched, so the same file can be loaded repeatedly.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use sqlx::PgPool;
use tracing::{info, warn};

use dronshop_core::{CategoryId, Price, ProductId};
use dronshop_server::db::CategoryRepository;
use dronshop_server::db::ProductRepository;
use dronshop_server::db::products::NewProduct;

use super::{CommandError, connect};

#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub categories: Vec<CategorySeed>,
    #[serde(default)]
    pub products: Vec<ProductSeed>,
}

#[derive(Debug, Deserialize)]
pub struct CategorySeed {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProductSeed {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Price,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub reserved: i32,
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}

/// Seed summary.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub categories_created: usize,
    pub products_created: usize,
    pub skipped: usize,
}

/// Problems detectable without a database.
#[must_use]
pub fn validate(file: &CatalogFile) -> Vec<String> {
    let mut errors = Vec::new();

    let mut slugs = HashSet::new();
    for category in &file.categories {
        if category.slug.trim().is_empty() || category.name.trim().is_empty() {
            errors.push(format!("category '{}' needs a slug and a name", category.slug));
        }
        if !slugs.insert(category.slug.as_str()) {
            errors.push(format!("duplicate category slug '{}'", category.slug));
        }
        if category.parent.as_deref() == Some(category.slug.as_str()) {
            errors.push(format!("category '{}' is its own parent", category.slug));
        }
    }

    let mut names = HashSet::new();
    for product in &file.products {
        if product.name.trim().is_empty() {
            errors.push("product with an empty name".to_string());
        }
        if !names.insert(product.name.as_str()) {
            errors.push(format!("duplicate product '{}'", product.name));
        }
        if product.stock < 0 || product.reserved < 0 {
            errors.push(format!("product '{}' has negative stock", product.name));
        }
    }

    errors
}

/// Load a catalog file into the database.
pub async fn catalog(path: &Path) -> Result<SeedReport, CommandError> {
    info!(path = %path.display(), "Loading catalog");
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CommandError::Io {
            path: path.display().to_string(),
            source,
        })?;
    let file: CatalogFile = serde_yaml::from_str(&content)?;

    let errors = validate(&file);
    if !errors.is_empty() {
        for err in &errors {
            warn!("  - {err}");
        }
        return Err(CommandError::Invalid(format!(
            "{} validation errors found",
            errors.len()
        )));
    }

    let pool = connect().await?;
    let report = load(&pool, &file).await?;

    info!("Seeding complete!");
    info!("  Categories created: {}", report.categories_created);
    info!("  Products created: {}", report.products_created);
    info!("  Skipped (already exist): {}", report.skipped);
    Ok(report)
}

async fn load(pool: &PgPool, file: &CatalogFile) -> Result<SeedReport, CommandError> {
    let categories = CategoryRepository::new(pool);
    let mut report = SeedReport::default();
    let mut by_slug: HashMap<String, CategoryId> = HashMap::new();

    for seed in &file.categories {
        if let Some(existing) = categories.get_by_slug(&seed.slug).await? {
            by_slug.insert(seed.slug.clone(), existing.id);
            report.skipped += 1;
            continue;
        }
        let parent = match &seed.parent {
            Some(slug) => Some(resolve(&categories, &mut by_slug, slug).await?),
            None => None,
        };
        let created = categories.create(&seed.slug, &seed.name, parent).await?;
        by_slug.insert(seed.slug.clone(), created.id);
        report.categories_created += 1;
    }

    let products = ProductRepository::new(pool);
    for seed in &file.products {
        if product_exists(pool, &seed.name).await? {
            report.skipped += 1;
            continue;
        }
        let category_id = match &seed.category {
            Some(slug) => Some(resolve(&categories, &mut by_slug, slug).await?),
            None => None,
        };
        let product = products
            .create(&NewProduct {
                name: seed.name.clone(),
                description: seed.description.clone(),
                price: seed.price,
                category_id,
                active: seed.active,
            })
            .await?;
        write_stock(pool, product.id, seed.stock, seed.reserved).await?;
        report.products_created += 1;
    }

    Ok(report)
}

async fn resolve(
    categories: &CategoryRepository<'_>,
    by_slug: &mut HashMap<String, CategoryId>,
    slug: &str,
) -> Result<CategoryId, CommandError> {
    if let Some(id) = by_slug.get(slug) {
        return Ok(*id);
    }
    let category = categories
        .get_by_slug(slug)
        .await?
        .ok_or_else(|| CommandError::Invalid(format!("unknown category '{slug}'")))?;
    by_slug.insert(slug.to_string(), category.id);
    Ok(category.id)
}

async fn product_exists(pool: &PgPool, name: &str) -> Result<bool, CommandError> {
    let found = sqlx::query_scalar::<_, i32>("SELECT id FROM products WHERE name = $1 LIMIT 1")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

async fn write_stock(
    pool: &PgPool,
    product_id: ProductId,
    current: i32,
    reserved: i32,
) -> Result<(), CommandError> {
    sqlx::query(
        "UPDATE inventory SET current_stock = $2, reserved_stock = $3 WHERE product_id = $1",
    )
    .bind(product_id)
    .bind(current)
    .bind(reserved)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_demo_catalog() {
        let file: CatalogFile =
            serde_yaml::from_str(include_str!("../../../server/seed/demo_catalog.yaml")).unwrap();
        assert!(!file.categories.is_empty());
        assert!(!file.products.is_empty());
        assert!(validate(&file).is_empty());
        assert!(file.products.iter().any(|p| !p.active));
    }

    #[test]
    fn test_validate_reports_problems() {
        let file: CatalogFile = serde_yaml::from_str(
            r"
categories:
  - slug: fpv
    name: FPV
    parent: fpv
  - slug: fpv
    name: Again
products:
  - name: Racer
    price: 100
    stock: -1
",
        )
        .unwrap();
        let errors = validate(&file);
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.contains("own parent")));
        assert!(errors.iter().any(|e| e.contains("duplicate category")));
        assert!(errors.iter().any(|e| e.contains("negative stock")));
    }

    #[test]
    fn test_negative_price_rejected_at_parse() {
        let parsed = serde_yaml::from_str::<CatalogFile>("products:\n  - name: X\n    price: -5\n");
        assert!(parsed.is_err());
    }
}
