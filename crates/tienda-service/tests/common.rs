//! Common test utilities for tienda integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::http::StatusCode;
use axum::Router;
use axum_test::TestServer;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;

use tienda_core::UserId;
use tienda_service::{create_router, AppState, ServiceConfig};
use tienda_store::MemoryStore;

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// A test user ID for authenticated requests.
    pub test_user_id: UserId,
    /// The HS256 secret tokens are minted and verified with.
    pub jwt_secret: String,
}

impl TestHarness {
    /// Create a new test harness with a fresh in-memory store.
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let jwt_secret = "test-secret".to_string();

        let config = ServiceConfig {
            jwt_secret: jwt_secret.clone(),
            ..ServiceConfig::default()
        };

        let state = AppState::new(store, config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");
        let test_user_id = UserId::generate();

        Self {
            server,
            test_user_id,
            jwt_secret,
        }
    }

    /// Mint a signed token the way the external auth service would.
    pub fn mint_token(&self, user_id: UserId, role: &str, expires_in: Duration) -> String {
        let exp = (Utc::now() + expires_in).timestamp();
        let claims = json!({
            "sub": format!("{user_id}@example.test"),
            "user_id": user_id.to_string(),
            "role": role,
            "exp": exp,
        });

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .expect("Failed to encode test token")
    }

    /// Get the authorization header for the default test user.
    pub fn user_auth_header(&self) -> String {
        format!(
            "Bearer {}",
            self.mint_token(self.test_user_id, "user", Duration::hours(1))
        )
    }

    /// Get an admin authorization header.
    pub fn admin_auth_header(&self) -> String {
        format!(
            "Bearer {}",
            self.mint_token(UserId::generate(), "admin", Duration::hours(1))
        )
    }

    /// Get a different user's auth header (for testing isolation).
    pub fn other_user_auth_header(&self) -> String {
        format!(
            "Bearer {}",
            self.mint_token(UserId::generate(), "user", Duration::hours(1))
        )
    }

    /// Get an already-expired auth header for the default test user.
    pub fn expired_user_auth_header(&self) -> String {
        format!(
            "Bearer {}",
            self.mint_token(self.test_user_id, "user", Duration::hours(-2))
        )
    }

    /// Create a product through the admin API and return its ID.
    pub async fn create_product(&self, name: &str, price: &str, stock: i32) -> String {
        let response = self
            .server
            .post("/products")
            .add_header("authorization", self.admin_auth_header())
            .json(&json!({
                "name": name,
                "price": price,
                "stock": stock
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: serde_json::Value = response.json();
        body["id"].as_str().expect("product id").to_string()
    }

    /// Add a product to the default test user's cart.
    pub async fn add_to_cart(&self, product_id: &str, quantity: i32) {
        self.server
            .post("/cart")
            .add_header("authorization", self.user_auth_header())
            .json(&json!({
                "product_id": product_id,
                "quantity": quantity
            }))
            .await
            .assert_status_ok();
    }

    /// Fetch the default test user's cart view.
    pub async fn view_cart(&self) -> serde_json::Value {
        let response = self
            .server
            .get("/cart")
            .add_header("authorization", self.user_auth_header())
            .await;

        response.assert_status_ok();
        response.json()
    }

    /// Fetch a product's current state through the public API.
    pub async fn get_product(&self, product_id: &str) -> serde_json::Value {
        let response = self.server.get(&format!("/products/{product_id}")).await;
        response.assert_status_ok();
        response.json()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
