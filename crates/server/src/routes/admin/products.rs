//! Product management and gallery uploads.

use axum::extract::State;
use axum::extract::multipart::{Multipart, MultipartRejection};
use serde::{Deserialize, Serialize};
use tracing::info;

use dronshop_core::{CategoryId, Price, ProductId, ProductImageId};

use crate::db::{CategoryRepository, ProductRepository};
use crate::db::products::{NewProduct, ProductFilter, ProductSort};
use crate::error::{AppError, MapNotFound, OrNotFound, Result};
use crate::extract::{Json, Path, Query};
use crate::middleware::RequireAdmin;
use crate::models::{Product, ProductImage, ProductOut, nullable};
use crate::routes::Success;
use crate::services::catalog::present_products;
use crate::state::AppState;

const NOT_FOUND: &str = "Product not found";
const DEFAULT_PAGE_SIZE: i64 = 100;

/// Admin listing filters. Unlike the storefront, inactive products are
/// included unless `active` is given.
#[derive(Debug, Default, Deserialize)]
pub struct AdminProductsQuery {
    pub category: Option<CategoryId>,
    pub q: Option<String>,
    pub active: Option<bool>,
    pub sort: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl AdminProductsQuery {
    fn into_filter(self) -> Result<ProductFilter> {
        let page = self.page.unwrap_or(1).max(1);
        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size < 1 {
            return Err(AppError::BadRequest("page_size must be positive".to_string()));
        }
        let sort = self
            .sort
            .as_deref()
            .map(str::parse::<ProductSort>)
            .transpose()
            .map_err(AppError::BadRequest)?
            .unwrap_or(ProductSort::NEWEST);

        Ok(ProductFilter {
            category: self.category,
            search: self.q,
            active: self.active,
            sort,
            limit: page_size,
            offset: (page - 1).saturating_mul(page_size),
            ..ProductFilter::default()
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ProductForm {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Price,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}

/// Partial update; explicit `null` clears `description` or `category_id`.
#[derive(Debug, Default, Deserialize)]
pub struct ProductUpdateForm {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default, deserialize_with = "nullable")]
    pub category_id: Option<Option<CategoryId>>,
    #[serde(default)]
    pub active: Option<bool>,
}

impl ProductUpdateForm {
    fn apply(self, product: &mut Product) {
        if let Some(name) = self.name {
            product.name = name;
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(category_id) = self.category_id {
            product.category_id = category_id;
        }
        if let Some(active) = self.active {
            product.active = active;
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub image_url: String,
    pub image: ProductImage,
}

async fn ensure_category(state: &AppState, category_id: Option<CategoryId>) -> Result<()> {
    let Some(category_id) = category_id else {
        return Ok(());
    };
    if CategoryRepository::new(state.pool()).get(category_id).await?.is_none() {
        return Err(AppError::BadRequest("Category not found".to_string()));
    }
    Ok(())
}

async fn present_one(state: &AppState, product: Product) -> Result<Json<ProductOut>> {
    present_products(state.pool(), state.media(), vec![product])
        .await?
        .pop()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))
}

pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Query(query): Query<AdminProductsQuery>,
) -> Result<Json<Vec<ProductOut>>> {
    let filter = query.into_filter()?;
    let rows = ProductRepository::new(state.pool()).list(&filter).await?;
    Ok(Json(present_products(state.pool(), state.media(), rows).await?))
}

/// Create a product with an empty stock row.
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(form): Json<ProductForm>,
) -> Result<Json<ProductOut>> {
    if form.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }
    ensure_category(&state, form.category_id).await?;

    let product = ProductRepository::new(state.pool())
        .create(&NewProduct {
            name: form.name,
            description: form.description,
            price: form.price,
            category_id: form.category_id,
            active: form.active,
        })
        .await?;

    info!(product_id = %product.id, admin_id = %admin.id, "Product created");
    present_one(&state, product).await
}

/// Any product, active or not.
pub async fn get(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductOut>> {
    let product = ProductRepository::new(state.pool())
        .get(id)
        .await
        .or_not_found(NOT_FOUND)?;
    present_one(&state, product).await
}

pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(form): Json<ProductUpdateForm>,
) -> Result<Json<ProductOut>> {
    let repo = ProductRepository::new(state.pool());
    let mut product = repo.get(id).await.or_not_found(NOT_FOUND)?;

    form.apply(&mut product);
    if product.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }
    ensure_category(&state, product.category_id).await?;

    let updated = repo.update(&product).await.map_not_found(NOT_FOUND)?;
    present_one(&state, updated).await
}

/// Delete the product with its stock row and gallery. Image files are
/// removed afterwards; failures there are only logged.
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Json<Success>> {
    let urls = ProductRepository::new(state.pool())
        .delete(id)
        .await
        .map_not_found(NOT_FOUND)?;

    for url in &urls {
        state.media().remove_by_url(url).await;
    }
    state.media().remove_product_dir(id).await;

    info!(product_id = %id, images = urls.len(), admin_id = %admin.id, "Product deleted");
    Ok(Json(Success::OK))
}

/// Append an image from the multipart `file` field to the gallery.
pub async fn upload_image(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<ProductId>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>> {
    let mut multipart = multipart?;
    let repo = ProductRepository::new(state.pool());
    repo.get(id).await.or_not_found(NOT_FOUND)?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field.content_type().map(str::to_owned);
        let file_name = field.file_name().map(str::to_owned);
        let bytes = field.bytes().await?;

        let image = state
            .media()
            .store_product_image(
                id,
                content_type.as_deref(),
                file_name.as_deref(),
                &bytes,
                |url| async move { repo.add_image(id, &url).await.map_err(AppError::from) },
            )
            .await?;

        info!(product_id = %id, image_id = %image.id, "Product image uploaded");
        return Ok(Json(UploadResponse {
            success: true,
            image_url: image.url.clone(),
            image,
        }));
    }

    Err(AppError::BadRequest("Missing file field".to_string()))
}

pub async fn delete_image(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path((id, image_id)): Path<(ProductId, ProductImageId)>,
) -> Result<Json<Success>> {
    let repo = ProductRepository::new(state.pool());
    repo.get(id).await.or_not_found(NOT_FOUND)?;

    let image = repo
        .delete_image(id, image_id)
        .await
        .map_not_found("Image not found")?;
    state.media().remove_by_url(&image.url).await;
    Ok(Json(Success::OK))
}
