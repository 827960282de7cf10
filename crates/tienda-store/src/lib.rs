//! Storage layer for tienda.
//!
//! This crate owns every invariant the data model promises:
//!
//! - at most one active cart per user (atomic find-or-create),
//! - one cart item per `(cart, product)` (accumulating upsert),
//! - stock never goes negative (checkout validates every line, then
//!   commits every line, inside one transaction),
//! - no dangling cart items (product deletion purges them first).
//!
//! Two backends implement the [`Store`] trait: [`PgStore`] (PostgreSQL via
//! sqlx, the production backend) and [`MemoryStore`] (mutex-serialized
//! in-memory maps, for tests).
//!
//! # Example
//!
//! ```no_run
//! use tienda_core::{NewProduct, Product, UserId};
//! use tienda_store::{MemoryStore, Store};
//!
//! # async fn example() -> tienda_store::Result<()> {
//! let store = MemoryStore::new();
//!
//! let product = Product::new(NewProduct {
//!     name: "Mug".into(),
//!     description: None,
//!     price: "12.50".parse().unwrap(),
//!     stock: 40,
//!     image_url: None,
//!     features: None,
//! });
//! store.insert_product(&product).await?;
//!
//! let user_id = UserId::generate();
//! let cart = store.find_or_create_active_cart(&user_id).await?;
//! store.add_item(&cart.id, &product.id, 2).await?;
//! let summary = store.checkout(&user_id).await?;
//! assert_eq!(summary.total, "25.00".parse().unwrap());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod postgres;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;

use tienda_core::{
    Cart, CartId, CartItem, CartItemId, CartView, CheckoutSummary, Product, ProductId,
    ProductPatch, UserId,
};

/// The storage trait defining all database operations.
///
/// Handlers never compose these calls into multi-step mutations; anything
/// that must be atomic (checkout, product deletion, item accumulation,
/// cart creation) is a single trait method so each backend can apply its
/// own locking discipline.
#[async_trait]
pub trait Store: Send + Sync {
    // =========================================================================
    // Product Operations
    // =========================================================================

    /// Insert a product record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn insert_product(&self, product: &Product) -> Result<()>;

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>>;

    /// List all products, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_products(&self) -> Result<Vec<Product>>;

    /// Apply a partial update to a product and return the updated record.
    /// Fields absent from the patch keep their prior value.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the product doesn't exist.
    async fn update_product(&self, id: &ProductId, patch: ProductPatch) -> Result<Product>;

    /// Delete a product, purging all cart items that reference it first so
    /// no dangling reference survives. Both deletions happen atomically.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the product doesn't exist.
    async fn delete_product(&self, id: &ProductId) -> Result<()>;

    // =========================================================================
    // Cart Operations
    // =========================================================================

    /// Return the user's active cart, creating it if none exists. Atomic:
    /// two concurrent calls for the same user yield the same cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn find_or_create_active_cart(&self, user_id: &UserId) -> Result<Cart>;

    /// Get the user's active cart, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_active_cart(&self, user_id: &UserId) -> Result<Option<Cart>>;

    /// Get the user's active cart joined with its items and their product
    /// details, if an active cart exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn view_active_cart(&self, user_id: &UserId) -> Result<Option<CartView>>;

    // =========================================================================
    // Cart Item Operations
    // =========================================================================

    /// Add `quantity` units of a product to a cart. If the cart already
    /// holds the product, the quantity accumulates onto the existing item;
    /// otherwise a new item is inserted. Returns the resulting item.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the product doesn't exist.
    async fn add_item(
        &self,
        cart_id: &CartId,
        product_id: &ProductId,
        quantity: i32,
    ) -> Result<CartItem>;

    /// Remove a single item from a cart. The item must belong to the given
    /// cart; an item ID from another cart is reported as not found.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no such item exists in this cart.
    async fn remove_item(&self, cart_id: &CartId, item_id: &CartItemId) -> Result<()>;

    /// Delete all items of a cart. Returns the number of items removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn clear_items(&self, cart_id: &CartId) -> Result<u64>;

    // =========================================================================
    // Compound Operations
    // =========================================================================

    /// Check out the user's active cart: validate every line against
    /// current stock, then decrement stock for every line and clear the
    /// cart's items, all inside one transaction. The cart row survives and
    /// is recycled as the user's next active cart.
    ///
    /// Lines whose product no longer exists are skipped and reported in
    /// the summary.
    ///
    /// # Errors
    ///
    /// - `StoreError::NoActiveCart` if the user has no active cart.
    /// - `StoreError::EmptyCart` if the active cart has no items.
    /// - `StoreError::InsufficientStock` if any line exceeds available
    ///   stock; no stock is changed for any line in that case.
    async fn checkout(&self, user_id: &UserId) -> Result<CheckoutSummary>;
}
