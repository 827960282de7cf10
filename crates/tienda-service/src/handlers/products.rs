//! Product catalog handlers.
//!
//! Listing and detail are public; create/update/delete require the admin
//! role. Updates are partial: only fields present in the request body are
//! applied.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;

use tienda_core::{NewProduct, Product, ProductId, ProductPatch};

use crate::auth::Admin;
use crate::error::ApiError;
use crate::state::AppState;

/// Parse a product ID from a path segment. An unparseable ID cannot name
/// an existing product, so it is reported as not found.
fn parse_product_id(raw: &str) -> Result<ProductId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::NotFound(format!("product not found: {raw}")))
}

/// List all products.
pub async fn list_products(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let products = state.store.list_products().await?;
    Ok(Json(products))
}

/// Get a single product.
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let id = parse_product_id(&raw_id)?;

    let product = state
        .store
        .get_product(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("product not found: {id}")))?;

    Ok(Json(product))
}

/// Create product request.
#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Unit price.
    pub price: Decimal,
    /// Initial stock.
    pub stock: i32,
    /// Optional image reference (upload is handled elsewhere).
    pub image_url: Option<String>,
    /// Optional open key-value metadata.
    pub features: Option<serde_json::Value>,
}

/// Reject a feature document that is not a JSON object.
fn validate_features(features: Option<&serde_json::Value>) -> Result<(), ApiError> {
    match features {
        Some(value) if !value.is_object() => Err(ApiError::Validation(
            "features must be a key-value object".into(),
        )),
        _ => Ok(()),
    }
}

/// Create a new product.
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    admin: Admin,
    Json(body): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::Validation("name must not be empty".into()));
    }
    if body.price < Decimal::ZERO {
        return Err(ApiError::Validation("price must not be negative".into()));
    }
    if body.stock < 0 {
        return Err(ApiError::Validation("stock must not be negative".into()));
    }
    validate_features(body.features.as_ref())?;

    let product = Product::new(NewProduct {
        name: body.name,
        description: body.description,
        price: body.price,
        stock: body.stock,
        image_url: body.image_url,
        features: body.features,
    });

    state.store.insert_product(&product).await?;

    tracing::info!(
        admin = %admin.user_id,
        product_id = %product.id,
        name = %product.name,
        "Product created"
    );

    Ok((StatusCode::CREATED, Json(product)))
}

/// Partial product update request. Absent fields keep their prior value.
#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    /// New name, if present.
    pub name: Option<String>,
    /// New description, if present.
    pub description: Option<String>,
    /// New price, if present.
    pub price: Option<Decimal>,
    /// New stock, if present.
    pub stock: Option<i32>,
    /// New image reference, if present.
    pub image_url: Option<String>,
    /// New feature map, if present (replaces the whole document).
    pub features: Option<serde_json::Value>,
}

/// Apply a partial update to a product.
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    admin: Admin,
    Path(raw_id): Path<String>,
    Json(body): Json<UpdateProductRequest>,
) -> Result<Json<Product>, ApiError> {
    let id = parse_product_id(&raw_id)?;

    if let Some(name) = &body.name {
        if name.trim().is_empty() {
            return Err(ApiError::Validation("name must not be empty".into()));
        }
    }
    if let Some(price) = body.price {
        if price < Decimal::ZERO {
            return Err(ApiError::Validation("price must not be negative".into()));
        }
    }
    if let Some(stock) = body.stock {
        if stock < 0 {
            return Err(ApiError::Validation("stock must not be negative".into()));
        }
    }
    validate_features(body.features.as_ref())?;

    let patch = ProductPatch {
        name: body.name,
        description: body.description,
        price: body.price,
        stock: body.stock,
        image_url: body.image_url,
        features: body.features,
    };

    let product = state.store.update_product(&id, patch).await?;

    tracing::info!(
        admin = %admin.user_id,
        product_id = %product.id,
        "Product updated"
    );

    Ok(Json(product))
}

/// Delete a product, purging all cart items that reference it.
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    admin: Admin,
    Path(raw_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_product_id(&raw_id)?;

    state.store.delete_product(&id).await?;

    tracing::info!(admin = %admin.user_id, product_id = %id, "Product deleted");

    Ok(Json(serde_json::json!({ "deleted": true })))
}
