//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{cart, health, products};
use crate::state::AppState;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `GET /products` - List products
/// - `GET /products/:id` - Product detail
///
/// ## Products (admin JWT auth)
/// - `POST /products` - Create product
/// - `POST /products/:id` - Partial update
/// - `DELETE /products/:id` - Delete product (purges referencing cart items)
///
/// ## Cart (user JWT auth)
/// - `POST /cart` - Add a product to the active cart
/// - `GET /cart` - View the active cart with product details
/// - `POST /cart/checkout` - Check out (atomic stock deduction)
/// - `DELETE /cart/items/:item_id` - Remove one item
/// - `DELETE /cart` - Clear the cart
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    // Build CORS layer
    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    Router::new()
        // Health (public)
        .route("/health", get(health::health))
        // Catalog
        .route("/products", get(products::list_products))
        .route("/products", post(products::create_product))
        .route("/products/:id", get(products::get_product))
        .route("/products/:id", post(products::update_product))
        .route("/products/:id", delete(products::delete_product))
        // Cart
        .route("/cart", post(cart::add_to_cart))
        .route("/cart", get(cart::view_cart))
        .route("/cart", delete(cart::clear_cart))
        .route("/cart/checkout", post(cart::checkout))
        .route("/cart/items/:item_id", delete(cart::remove_item))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
