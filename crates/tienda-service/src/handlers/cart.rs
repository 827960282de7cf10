//! Cart and checkout handlers.
//!
//! All endpoints here act on the calling user's active cart, which is
//! created lazily on the first add. Stock is not validated when items are
//! added; the single validation point is checkout, where the store
//! performs the all-or-nothing deduction.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tienda_core::{Cart, CartId, CartItemId, CartLine, ChargedItem, CheckoutSummary, ProductId};

use crate::auth::Customer;
use crate::error::ApiError;
use crate::state::AppState;

/// Add to cart request.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    /// The product to add.
    pub product_id: String,
    /// Units to add; accumulates onto any existing line for this product.
    pub quantity: i32,
}

/// Add to cart response.
#[derive(Debug, Serialize)]
pub struct AddToCartResponse {
    /// Human-readable confirmation.
    pub message: String,
    /// The user's active cart.
    pub cart_id: CartId,
}

/// Add a product to the calling user's active cart.
pub async fn add_to_cart(
    State(state): State<Arc<AppState>>,
    customer: Customer,
    Json(body): Json<AddToCartRequest>,
) -> Result<Json<AddToCartResponse>, ApiError> {
    if body.quantity < 1 {
        return Err(ApiError::Validation(
            "quantity must be a positive integer".into(),
        ));
    }

    let product_id = body
        .product_id
        .parse::<ProductId>()
        .map_err(|_| ApiError::Validation("invalid product id".into()))?;

    if state.store.get_product(&product_id).await?.is_none() {
        return Err(ApiError::Validation(format!(
            "unknown product: {product_id}"
        )));
    }

    let cart = state
        .store
        .find_or_create_active_cart(&customer.user_id)
        .await?;

    // The product could vanish between the check above and here; the store
    // reports that as not-found, which is still a validation failure from
    // the caller's point of view.
    let item = state
        .store
        .add_item(&cart.id, &product_id, body.quantity)
        .await
        .map_err(|err| match err {
            tienda_store::StoreError::NotFound { .. } => {
                ApiError::Validation(format!("unknown product: {product_id}"))
            }
            other => ApiError::from(other),
        })?;

    tracing::info!(
        user_id = %customer.user_id,
        cart_id = %cart.id,
        product_id = %product_id,
        quantity = item.quantity,
        "Product added to cart"
    );

    Ok(Json(AddToCartResponse {
        message: "product added to cart".into(),
        cart_id: cart.id,
    }))
}

/// Cart view response. `cart` is null and `items` empty when the user has
/// no active cart; that is a normal empty view, not an error.
#[derive(Debug, Serialize)]
pub struct CartViewResponse {
    /// The active cart, if one exists.
    pub cart: Option<Cart>,
    /// Item lines with denormalized product details.
    pub items: Vec<CartLine>,
    /// Present only for the empty view.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// View the calling user's active cart with product details.
pub async fn view_cart(
    State(state): State<Arc<AppState>>,
    customer: Customer,
) -> Result<Json<CartViewResponse>, ApiError> {
    let response = match state.store.view_active_cart(&customer.user_id).await? {
        Some(view) => CartViewResponse {
            cart: Some(view.cart),
            items: view.items,
            message: None,
        },
        None => CartViewResponse {
            cart: None,
            items: Vec::new(),
            message: Some("your cart is empty".into()),
        },
    };

    Ok(Json(response))
}

/// Checkout response.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    /// Human-readable confirmation.
    pub message: String,
    /// The cart that was checked out.
    pub cart_id: CartId,
    /// Lines charged.
    pub items: Vec<ChargedItem>,
    /// Order total.
    pub total: Decimal,
    /// Products that vanished before checkout; their lines were skipped.
    pub skipped_products: Vec<ProductId>,
}

impl From<CheckoutSummary> for CheckoutResponse {
    fn from(summary: CheckoutSummary) -> Self {
        Self {
            message: "purchase completed, stock deducted".into(),
            cart_id: summary.cart_id,
            items: summary.items,
            total: summary.total,
            skipped_products: summary.skipped_products,
        }
    }
}

/// Check out the calling user's active cart.
pub async fn checkout(
    State(state): State<Arc<AppState>>,
    customer: Customer,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let summary = state.store.checkout(&customer.user_id).await?;

    tracing::info!(
        user_id = %customer.user_id,
        cart_id = %summary.cart_id,
        lines = summary.items.len(),
        total = %summary.total,
        "Checkout completed"
    );

    Ok(Json(CheckoutResponse::from(summary)))
}

/// Remove a single item from the calling user's active cart.
pub async fn remove_item(
    State(state): State<Arc<AppState>>,
    customer: Customer,
    Path(raw_item_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let item_id = raw_item_id
        .parse::<CartItemId>()
        .map_err(|_| ApiError::NotFound(format!("cart item not found: {raw_item_id}")))?;

    let cart = state
        .store
        .get_active_cart(&customer.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("no active cart".into()))?;

    // Scoped to this user's cart: an item ID from someone else's cart is
    // not found here, not deleted.
    state.store.remove_item(&cart.id, &item_id).await?;

    tracing::info!(
        user_id = %customer.user_id,
        cart_id = %cart.id,
        item_id = %item_id,
        "Cart item removed"
    );

    Ok(Json(serde_json::json!({ "removed": true })))
}

/// Clear the calling user's active cart. A missing cart is a no-op.
pub async fn clear_cart(
    State(state): State<Arc<AppState>>,
    customer: Customer,
) -> Result<Json<serde_json::Value>, ApiError> {
    let cleared = match state.store.get_active_cart(&customer.user_id).await? {
        Some(cart) => state.store.clear_items(&cart.id).await?,
        None => 0,
    };

    tracing::info!(user_id = %customer.user_id, cleared, "Cart cleared");

    Ok(Json(serde_json::json!({ "cleared": cleared })))
}
