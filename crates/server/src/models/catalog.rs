//! Categories, products, images and inventory.

use chrono::{DateTime, Utc};
use serde::Serialize;

use dronshop_core::{CategoryId, Price, ProductId, ProductImageId};

/// A row from `categories`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub slug: String,
    pub name: String,
    pub parent_id: Option<CategoryId>,
}

/// A row from `products`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Price,
    pub category_id: Option<CategoryId>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// A row from `product_images`.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductImage {
    pub id: ProductImageId,
    #[serde(skip)]
    pub product_id: ProductId,
    pub url: String,
    pub sort: i32,
}

/// Product as returned by the catalog and admin endpoints.
///
/// `image` is the first gallery URL; `images` and `gallery` are `null`
/// rather than empty when the product has no pictures.
#[derive(Debug, Clone, Serialize)]
pub struct ProductOut {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Price,
    pub category_id: Option<CategoryId>,
    pub active: bool,
    pub image: Option<String>,
    pub images: Option<Vec<String>>,
    pub gallery: Option<Vec<ProductImage>>,
}

impl ProductOut {
    /// Build the response from a product, its gallery rows and fallback image URLs.
    ///
    /// `fallback` is only used when `gallery` is empty.
    #[must_use]
    pub fn new(product: Product, gallery: Vec<ProductImage>, fallback: Vec<String>) -> Self {
        let urls: Vec<String> = if gallery.is_empty() {
            fallback
        } else {
            gallery.iter().map(|img| img.url.clone()).collect()
        };

        Self {
            id: product.id,
            name: product.name,
            description: product.description,
            price: product.price,
            category_id: product.category_id,
            active: product.active,
            image: urls.first().cloned(),
            images: (!urls.is_empty()).then_some(urls),
            gallery: (!gallery.is_empty()).then_some(gallery),
        }
    }
}

/// Pagination block of `GET /api/products`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductsMeta {
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl ProductsMeta {
    #[must_use]
    pub const fn new(total: i64, page: i64, page_size: i64) -> Self {
        let total_pages = if page_size > 0 {
            (total + page_size - 1) / page_size
        } else {
            1
        };
        Self {
            total,
            page,
            page_size,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1 && total > 0,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductsPage {
    pub items: Vec<ProductOut>,
    pub meta: ProductsMeta,
}

/// Product joined with its (optional) inventory row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InventoryRow {
    pub product_id: ProductId,
    pub product_name: String,
    pub current_stock: i32,
    pub reserved_stock: i32,
}

/// Inventory line of the admin stock table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryOut {
    pub product_id: ProductId,
    pub product_name: String,
    pub current_stock: i32,
    pub reserved_stock: i32,
    pub available_stock: i32,
}

impl From<InventoryRow> for InventoryOut {
    fn from(row: InventoryRow) -> Self {
        Self {
            available_stock: (row.current_stock - row.reserved_stock).max(0),
            product_id: row.product_id,
            product_name: row.product_name,
            current_stock: row.current_stock,
            reserved_stock: row.reserved_stock,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product() -> Product {
        Product {
            id: ProductId::new(1),
            name: "Falcon 5".to_string(),
            description: None,
            price: Price::new(1000).unwrap(),
            category_id: None,
            active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_products_meta() {
        let meta = ProductsMeta::new(25, 1, 12);
        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_next);
        assert!(!meta.has_prev);

        let last = ProductsMeta::new(25, 3, 12);
        assert!(!last.has_next);
        assert!(last.has_prev);

        let empty = ProductsMeta::new(0, 1, 12);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next);
        assert!(!empty.has_prev);
    }

    #[test]
    fn test_product_out_prefers_gallery() {
        let gallery = vec![ProductImage {
            id: ProductImageId::new(4),
            product_id: ProductId::new(1),
            url: "/uploads/products/1/a.jpg".to_string(),
            sort: 1,
        }];
        let out = ProductOut::new(product(), gallery, vec!["/uploads/falcon-5/x.jpg".into()]);
        assert_eq!(out.image.as_deref(), Some("/uploads/products/1/a.jpg"));
        assert_eq!(out.images.unwrap().len(), 1);
        assert!(out.gallery.is_some());
    }

    #[test]
    fn test_product_out_falls_back_and_nulls() {
        let out = ProductOut::new(product(), Vec::new(), vec!["/uploads/falcon-5/x.jpg".into()]);
        assert_eq!(out.image.as_deref(), Some("/uploads/falcon-5/x.jpg"));
        assert!(out.gallery.is_none());

        let bare = ProductOut::new(product(), Vec::new(), Vec::new());
        let json = serde_json::to_value(&bare).unwrap();
        assert!(json["image"].is_null());
        assert!(json["images"].is_null());
        assert!(json["gallery"].is_null());
    }

    #[test]
    fn test_inventory_out_floors_available() {
        let out = InventoryOut::from(InventoryRow {
            product_id: ProductId::new(2),
            product_name: "LiPo".to_string(),
            current_stock: 3,
            reserved_stock: 5,
        });
        assert_eq!(out.available_stock, 0);
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["availableStock"], 0);
        assert_eq!(json["productName"], "LiPo");
    }
}
