//! Storefront catalog route handlers.

use axum::extract::State;
use serde::Deserialize;

use dronshop_core::{CategoryId, Price, ProductId};

use crate::db::ProductRepository;
use crate::db::products::{ProductFilter, ProductSort};
use crate::error::{AppError, OrNotFound, Result};
use crate::extract::{Json, Path, Query};
use crate::models::{Category, ProductOut, ProductsMeta, ProductsPage};
use crate::services::catalog::present_products;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 12;
const MAX_PAGE_SIZE: i64 = 100;

/// Query parameters for `GET /api/products`.
#[derive(Debug, Default, Deserialize)]
pub struct ProductsQuery {
    pub category: Option<CategoryId>,
    pub q: Option<String>,
    pub sort: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub price_min: Option<i64>,
    pub price_max: Option<i64>,
    #[serde(default)]
    pub in_stock: bool,
}

impl ProductsQuery {
    /// Validate and turn into a repository filter plus `(page, page_size)`.
    ///
    /// A reversed price range is swapped rather than rejected.
    fn into_filter(self) -> Result<(ProductFilter, i64, i64)> {
        let page = self.page.unwrap_or(1);
        if page < 1 {
            return Err(AppError::BadRequest("page must be at least 1".to_string()));
        }
        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(AppError::BadRequest(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }

        let price = |value: Option<i64>, name: &str| {
            value
                .map(Price::new)
                .transpose()
                .map_err(|_| AppError::BadRequest(format!("{name} cannot be negative")))
        };
        let mut price_min = price(self.price_min, "price_min")?;
        let mut price_max = price(self.price_max, "price_max")?;
        if matches!((price_min, price_max), (Some(min), Some(max)) if min > max) {
            std::mem::swap(&mut price_min, &mut price_max);
        }

        let sort = self
            .sort
            .as_deref()
            .map(str::parse::<ProductSort>)
            .transpose()
            .map_err(AppError::BadRequest)?
            .unwrap_or(ProductSort::NEWEST);

        let filter = ProductFilter {
            category: self.category,
            search: self.q,
            active: Some(true),
            price_min,
            price_max,
            in_stock: self.in_stock,
            sort,
            limit: page_size,
            offset: (page - 1).saturating_mul(page_size),
        };
        Ok((filter, page, page_size))
    }
}

/// Filtered, paginated listing of active products.
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductsQuery>,
) -> Result<Json<ProductsPage>> {
    let (filter, page, page_size) = query.into_filter()?;
    let products = ProductRepository::new(state.pool());

    let total = products.count(&filter).await?;
    let rows = products.list(&filter).await?;
    let items = present_products(state.pool(), state.media(), rows).await?;

    Ok(Json(ProductsPage {
        items,
        meta: ProductsMeta::new(total, page, page_size),
    }))
}

/// A single active product.
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductOut>> {
    let product = ProductRepository::new(state.pool())
        .get(id)
        .await
        .map(|found| found.filter(|p| p.active))
        .or_not_found("Product not found")?;

    present_products(state.pool(), state.media(), vec![product])
        .await?
        .pop()
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
}

/// All categories, roots first, from the 60 second cache.
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = state.categories().get_or_load(state.pool()).await?;
    Ok(Json(categories.as_ref().clone()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::db::products::SortKey;

    use super::*;

    #[test]
    fn test_defaults() {
        let (filter, page, page_size) = ProductsQuery::default().into_filter().unwrap();
        assert_eq!((page, page_size), (1, 12));
        assert_eq!(filter.offset, 0);
        assert_eq!(filter.active, Some(true));
        assert_eq!(filter.sort, ProductSort::NEWEST);
    }

    #[test]
    fn test_offset_and_sort() {
        let (filter, _, _) = ProductsQuery {
            page: Some(3),
            page_size: Some(20),
            sort: Some("price:desc".to_string()),
            ..ProductsQuery::default()
        }
        .into_filter()
        .unwrap();
        assert_eq!(filter.offset, 40);
        assert_eq!(filter.limit, 20);
        assert_eq!(filter.sort.key, SortKey::Price);
        assert!(filter.sort.descending);
    }

    #[test]
    fn test_price_range_is_swapped() {
        let (filter, _, _) = ProductsQuery {
            price_min: Some(5000),
            price_max: Some(1000),
            ..ProductsQuery::default()
        }
        .into_filter()
        .unwrap();
        assert_eq!(filter.price_min.unwrap().amount(), 1000);
        assert_eq!(filter.price_max.unwrap().amount(), 5000);
    }

    #[test]
    fn test_rejects_bad_paging_and_prices() {
        for query in [
            ProductsQuery {
                page: Some(0),
                ..ProductsQuery::default()
            },
            ProductsQuery {
                page_size: Some(101),
                ..ProductsQuery::default()
            },
            ProductsQuery {
                price_min: Some(-1),
                ..ProductsQuery::default()
            },
            ProductsQuery {
                sort: Some("rating".to_string()),
                ..ProductsQuery::default()
            },
        ] {
            assert!(matches!(query.into_filter(), Err(AppError::BadRequest(_))));
        }
    }
}
