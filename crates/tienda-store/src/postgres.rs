//! PostgreSQL storage implementation.
//!
//! This module provides the `PgStore` implementation of the `Store` trait.
//! Compound operations run inside a single transaction; checkout
//! additionally takes `FOR UPDATE` row locks on every product it touches,
//! in a stable order, so concurrent checkouts serialize per product
//! instead of both passing validation on a stale stock read.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use tienda_core::{
    Cart, CartId, CartItem, CartItemId, CartLine, CartStatus, CartView, ChargedItem,
    CheckoutSummary, Product, ProductId, ProductPatch, UnknownCartStatus, UserId,
};

use crate::error::{Result, StoreError};
use crate::Store;

/// Embedded schema migrations, applied at connect time.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// PostgreSQL-backed storage implementation.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to PostgreSQL and apply pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or a migration fails.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        tracing::info!(max_connections, "Connected to PostgreSQL");

        MIGRATOR.run(&pool).await?;

        Ok(Self { pool })
    }

    /// Build a store around an existing pool. Migrations are not run.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

// =============================================================================
// Row types
// =============================================================================

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    price: Decimal,
    stock: i32,
    image_url: Option<String>,
    features: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            price: row.price,
            stock: row.stock,
            image_url: row.image_url,
            features: row.features,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CartRow {
    id: Uuid,
    user_id: Uuid,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CartRow> for Cart {
    type Error = StoreError;

    fn try_from(row: CartRow) -> Result<Self> {
        let status: CartStatus = row
            .status
            .parse()
            .map_err(|e: UnknownCartStatus| StoreError::Database(e.to_string()))?;
        Ok(Self {
            id: CartId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CartItemRow {
    id: Uuid,
    cart_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CartItemRow> for CartItem {
    fn from(row: CartItemRow) -> Self {
        Self {
            id: CartItemId::from_uuid(row.id),
            cart_id: CartId::from_uuid(row.cart_id),
            product_id: ProductId::from_uuid(row.product_id),
            quantity: row.quantity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A cart item joined with its product, for the denormalized cart view.
#[derive(sqlx::FromRow)]
struct CartLineRow {
    item_id: Uuid,
    item_quantity: i32,
    #[sqlx(flatten)]
    product: ProductRow,
}

const PRODUCT_COLUMNS: &str =
    "id, name, description, price, stock, image_url, features, created_at, updated_at";

const CART_COLUMNS: &str = "id, user_id, status, created_at, updated_at";

const CART_ITEM_COLUMNS: &str = "id, cart_id, product_id, quantity, created_at, updated_at";

#[async_trait]
impl Store for PgStore {
    // =========================================================================
    // Product Operations
    // =========================================================================

    async fn insert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            "INSERT INTO products (id, name, description, price, stock, image_url, features, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock)
        .bind(&product.image_url)
        .bind(&product.features)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn update_product(&self, id: &ProductId, patch: ProductPatch) -> Result<Product> {
        let mut tx = self.pool.begin().await?;

        // Lock the row so concurrent patches don't overwrite each other.
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::NotFound {
            entity: "product",
            id: id.to_string(),
        })?;

        let mut product = Product::from(row);
        product.apply(patch);

        sqlx::query(
            "UPDATE products
             SET name = $2, description = $3, price = $4, stock = $5,
                 image_url = $6, features = $7, updated_at = $8
             WHERE id = $1",
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock)
        .bind(&product.image_url)
        .bind(&product.features)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(product)
    }

    async fn delete_product(&self, id: &ProductId) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Purge referencing cart items first; the FK has no cascade.
        let purged = sqlx::query("DELETE FROM cart_items WHERE product_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let deleted = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(StoreError::NotFound {
                entity: "product",
                id: id.to_string(),
            });
        }

        tx.commit().await?;

        if purged > 0 {
            tracing::debug!(product_id = %id, purged, "Purged cart items referencing deleted product");
        }

        Ok(())
    }

    // =========================================================================
    // Cart Operations
    // =========================================================================

    async fn find_or_create_active_cart(&self, user_id: &UserId) -> Result<Cart> {
        let cart = Cart::new(*user_id);

        // The partial unique index on (user_id) WHERE status = 'active'
        // makes this a race-free find-or-create: the losing inserter hits
        // the conflict, does nothing, and reads the winner's row.
        sqlx::query(
            "INSERT INTO carts (id, user_id, status, created_at, updated_at)
             VALUES ($1, $2, 'active', $3, $4)
             ON CONFLICT (user_id) WHERE status = 'active' DO NOTHING",
        )
        .bind(cart.id.as_uuid())
        .bind(cart.user_id.as_uuid())
        .bind(cart.created_at)
        .bind(cart.updated_at)
        .execute(&self.pool)
        .await?;

        self.get_active_cart(user_id)
            .await?
            .ok_or(StoreError::NoActiveCart)
    }

    async fn get_active_cart(&self, user_id: &UserId) -> Result<Option<Cart>> {
        let row = sqlx::query_as::<_, CartRow>(&format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE user_id = $1 AND status = 'active'"
        ))
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Cart::try_from).transpose()
    }

    async fn view_active_cart(&self, user_id: &UserId) -> Result<Option<CartView>> {
        let Some(cart) = self.get_active_cart(user_id).await? else {
            return Ok(None);
        };

        let rows = sqlx::query_as::<_, CartLineRow>(
            "SELECT ci.id AS item_id, ci.quantity AS item_quantity,
                    p.id, p.name, p.description, p.price, p.stock,
                    p.image_url, p.features, p.created_at, p.updated_at
             FROM cart_items ci
             JOIN products p ON p.id = ci.product_id
             WHERE ci.cart_id = $1
             ORDER BY ci.created_at, ci.id",
        )
        .bind(cart.id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(|row| CartLine {
                id: CartItemId::from_uuid(row.item_id),
                product_id: ProductId::from_uuid(row.product.id),
                quantity: row.item_quantity,
                product: Product::from(row.product),
            })
            .collect();

        Ok(Some(CartView { cart, items }))
    }

    // =========================================================================
    // Cart Item Operations
    // =========================================================================

    async fn add_item(
        &self,
        cart_id: &CartId,
        product_id: &ProductId,
        quantity: i32,
    ) -> Result<CartItem> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query("SELECT 1 FROM products WHERE id = $1")
            .bind(product_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .is_some();

        if !exists {
            return Err(StoreError::NotFound {
                entity: "product",
                id: product_id.to_string(),
            });
        }

        let item = CartItem::new(*cart_id, *product_id, quantity);

        // Repeat adds accumulate onto the existing (cart, product) row.
        let row = sqlx::query_as::<_, CartItemRow>(&format!(
            "INSERT INTO cart_items (id, cart_id, product_id, quantity, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (cart_id, product_id)
             DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity,
                           updated_at = EXCLUDED.updated_at
             RETURNING {CART_ITEM_COLUMNS}"
        ))
        .bind(item.id.as_uuid())
        .bind(item.cart_id.as_uuid())
        .bind(item.product_id.as_uuid())
        .bind(item.quantity)
        .bind(item.created_at)
        .bind(item.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(CartItem::from(row))
    }

    async fn remove_item(&self, cart_id: &CartId, item_id: &CartItemId) -> Result<()> {
        // Scoping the delete to the cart is the ownership check: an item
        // ID from another user's cart matches zero rows.
        let deleted = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND cart_id = $2")
            .bind(item_id.as_uuid())
            .bind(cart_id.as_uuid())
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(StoreError::NotFound {
                entity: "cart item",
                id: item_id.to_string(),
            });
        }

        Ok(())
    }

    async fn clear_items(&self, cart_id: &CartId) -> Result<u64> {
        let deleted = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id.as_uuid())
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted)
    }

    // =========================================================================
    // Compound Operations
    // =========================================================================

    async fn checkout(&self, user_id: &UserId) -> Result<CheckoutSummary> {
        let mut tx = self.pool.begin().await?;

        let cart_row = sqlx::query_as::<_, CartRow>(&format!(
            "SELECT {CART_COLUMNS} FROM carts
             WHERE user_id = $1 AND status = 'active' FOR UPDATE"
        ))
        .bind(user_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NoActiveCart)?;

        let cart = Cart::try_from(cart_row)?;

        let items = sqlx::query_as::<_, CartItemRow>(&format!(
            "SELECT {CART_ITEM_COLUMNS} FROM cart_items
             WHERE cart_id = $1 ORDER BY created_at, id"
        ))
        .bind(cart.id.as_uuid())
        .fetch_all(&mut *tx)
        .await?;

        if items.is_empty() {
            return Err(StoreError::EmptyCart);
        }

        // Lock every referenced product in one statement, ordered by id so
        // two overlapping checkouts always acquire locks in the same order.
        let product_ids: Vec<Uuid> = items.iter().map(|item| item.product_id).collect();
        let product_rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE id = ANY($1) ORDER BY id FOR UPDATE"
        ))
        .bind(&product_ids)
        .fetch_all(&mut *tx)
        .await?;

        let mut products: HashMap<Uuid, ProductRow> = product_rows
            .into_iter()
            .map(|row| (row.id, row))
            .collect();

        // Validate every line before touching any stock. A single
        // shortfall aborts the transaction with nothing committed.
        let mut skipped = Vec::new();
        for item in &items {
            match products.get(&item.product_id) {
                Some(product) if product.stock >= item.quantity => {}
                Some(product) => {
                    return Err(StoreError::InsufficientStock {
                        product: product.name.clone(),
                        available: product.stock,
                        requested: item.quantity,
                    });
                }
                None => {
                    // Unreachable while the FK holds; kept as explicit
                    // policy for lines whose product has vanished.
                    tracing::warn!(
                        cart_id = %cart.id,
                        product_id = %item.product_id,
                        "Skipping cart item whose product no longer exists"
                    );
                    skipped.push(ProductId::from_uuid(item.product_id));
                }
            }
        }

        let now = Utc::now();
        let mut charged = Vec::with_capacity(items.len());
        for item in &items {
            let Some(product) = products.get_mut(&item.product_id) else {
                continue;
            };

            sqlx::query("UPDATE products SET stock = stock - $2, updated_at = $3 WHERE id = $1")
                .bind(product.id)
                .bind(item.quantity)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            product.stock -= item.quantity;

            charged.push(ChargedItem::new(
                ProductId::from_uuid(product.id),
                product.name.clone(),
                item.quantity,
                product.price,
            ));
        }

        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart.id.as_uuid())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(CheckoutSummary::new(cart.id, charged, skipped))
    }
}
