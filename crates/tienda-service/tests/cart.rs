//! Cart management integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use serde_json::json;

// ============================================================================
// Add to cart
// ============================================================================

#[tokio::test]
async fn add_to_cart_creates_active_cart() {
    let harness = TestHarness::new();
    let id = harness.create_product("Mug", "12.50", 40).await;

    let response = harness
        .server
        .post("/cart")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "product_id": id, "quantity": 2 }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert!(body["cart_id"].as_str().is_some());

    let view = harness.view_cart().await;
    assert_eq!(view["cart"]["id"], body["cart_id"]);
    assert_eq!(view["items"].as_array().unwrap().len(), 1);
    assert_eq!(view["items"][0]["quantity"], 2);
}

#[tokio::test]
async fn repeat_add_accumulates_quantity() {
    let harness = TestHarness::new();
    let id = harness.create_product("Mug", "12.50", 40).await;

    harness.add_to_cart(&id, 2).await;
    harness.add_to_cart(&id, 3).await;

    // One item with quantity 5, not two items.
    let view = harness.view_cart().await;
    let items = view["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], 5);
}

#[tokio::test]
async fn repeat_add_reuses_the_same_cart() {
    let harness = TestHarness::new();
    let a = harness.create_product("A", "1.00", 10).await;
    let b = harness.create_product("B", "2.00", 10).await;

    let first = harness
        .server
        .post("/cart")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "product_id": a, "quantity": 1 }))
        .await;
    first.assert_status_ok();
    let first: serde_json::Value = first.json();

    let second = harness
        .server
        .post("/cart")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "product_id": b, "quantity": 1 }))
        .await;
    second.assert_status_ok();
    let second: serde_json::Value = second.json();

    assert_eq!(first["cart_id"], second["cart_id"]);
}

#[tokio::test]
async fn add_to_cart_rejects_bad_input() {
    let harness = TestHarness::new();
    let id = harness.create_product("Mug", "12.50", 40).await;

    // Zero and negative quantities.
    for quantity in [0, -1] {
        let response = harness
            .server
            .post("/cart")
            .add_header("authorization", harness.user_auth_header())
            .json(&json!({ "product_id": id, "quantity": quantity }))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    // Unknown and unparseable product IDs.
    let response = harness
        .server
        .post("/cart")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({
            "product_id": "00000000-0000-0000-0000-000000000000",
            "quantity": 1
        }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let response = harness
        .server
        .post("/cart")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "product_id": "not-a-uuid", "quantity": 1 }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
async fn cart_requires_authentication() {
    let harness = TestHarness::new();

    let response = harness.server.get("/cart").await;
    response.assert_status_unauthorized();
}

#[tokio::test]
async fn cart_rejects_admin_role() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/cart")
        .add_header("authorization", harness.admin_auth_header())
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn cart_rejects_expired_token() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/cart")
        .add_header("authorization", harness.expired_user_auth_header())
        .await;

    response.assert_status_unauthorized();
}

// ============================================================================
// View cart
// ============================================================================

#[tokio::test]
async fn view_cart_without_cart_is_an_empty_view() {
    let harness = TestHarness::new();

    let view = harness.view_cart().await;
    assert!(view["cart"].is_null());
    assert!(view["items"].as_array().unwrap().is_empty());
    assert!(view["message"].as_str().is_some());
}

#[tokio::test]
async fn view_cart_includes_product_details() {
    let harness = TestHarness::new();
    let id = harness.create_product("Mug", "12.50", 40).await;
    harness.add_to_cart(&id, 2).await;

    let view = harness.view_cart().await;
    let item = &view["items"][0];
    assert_eq!(item["product_id"].as_str().unwrap(), id);
    assert_eq!(item["product"]["name"], "Mug");
    assert_eq!(item["product"]["price"], "12.50");
    assert_eq!(item["product"]["stock"], 40);
}

// ============================================================================
// Remove item
// ============================================================================

#[tokio::test]
async fn remove_item_deletes_exactly_one_item() {
    let harness = TestHarness::new();
    let a = harness.create_product("A", "1.00", 10).await;
    let b = harness.create_product("B", "2.00", 10).await;
    harness.add_to_cart(&a, 1).await;
    harness.add_to_cart(&b, 1).await;

    let view = harness.view_cart().await;
    let item_id = view["items"][0]["id"].as_str().unwrap().to_string();

    let response = harness
        .server
        .delete(&format!("/cart/items/{item_id}"))
        .add_header("authorization", harness.user_auth_header())
        .await;
    response.assert_status_ok();

    let view = harness.view_cart().await;
    assert_eq!(view["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn remove_item_from_another_users_cart_is_not_found() {
    let harness = TestHarness::new();
    let id = harness.create_product("Mug", "12.50", 40).await;
    harness.add_to_cart(&id, 1).await;

    let view = harness.view_cart().await;
    let item_id = view["items"][0]["id"].as_str().unwrap().to_string();

    // A different user with their own cart cannot reach the item.
    let other = harness.other_user_auth_header();
    harness
        .server
        .post("/cart")
        .add_header("authorization", other.clone())
        .json(&json!({ "product_id": id, "quantity": 1 }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .delete(&format!("/cart/items/{item_id}"))
        .add_header("authorization", other)
        .await;
    response.assert_status_not_found();

    // The item is still in its owner's cart.
    let view = harness.view_cart().await;
    assert_eq!(view["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn remove_item_without_cart_is_not_found() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .delete("/cart/items/00000000-0000-0000-0000-000000000000")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_not_found();
}

// ============================================================================
// Clear cart
// ============================================================================

#[tokio::test]
async fn clear_cart_removes_all_items() {
    let harness = TestHarness::new();
    let a = harness.create_product("A", "1.00", 10).await;
    let b = harness.create_product("B", "2.00", 10).await;
    harness.add_to_cart(&a, 1).await;
    harness.add_to_cart(&b, 2).await;

    let response = harness
        .server
        .delete("/cart")
        .add_header("authorization", harness.user_auth_header())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["cleared"], 2);

    let view = harness.view_cart().await;
    assert!(view["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn clear_cart_without_cart_is_a_silent_noop() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .delete("/cart")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["cleared"], 0);
}
