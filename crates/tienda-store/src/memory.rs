//! In-memory storage implementation.
//!
//! Backs integration and unit tests. A single mutex guards all state and
//! every compound operation holds it end-to-end, so this backend satisfies
//! the same atomicity contract as the PostgreSQL one: checkout either
//! commits every line or none, and find-or-create never yields two active
//! carts for one user.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use tienda_core::{
    Cart, CartId, CartItem, CartItemId, CartLine, CartStatus, CartView, ChargedItem,
    CheckoutSummary, Product, ProductId, ProductPatch, UserId,
};

use crate::error::{Result, StoreError};
use crate::Store;

/// In-memory storage implementation.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    products: HashMap<ProductId, Product>,
    carts: HashMap<CartId, Cart>,
    // Vec keeps cart items in insertion order, which is the order both
    // the cart view and checkout process them in.
    items: Vec<CartItem>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock only means another test thread panicked; the
        // data itself is still a consistent snapshot.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Inner {
    fn active_cart(&self, user_id: &UserId) -> Option<&Cart> {
        self.carts
            .values()
            .find(|cart| cart.user_id == *user_id && cart.status == CartStatus::Active)
    }

    fn cart_items(&self, cart_id: CartId) -> impl Iterator<Item = &CartItem> + '_ {
        self.items.iter().filter(move |item| item.cart_id == cart_id)
    }
}

#[async_trait]
impl Store for MemoryStore {
    // =========================================================================
    // Product Operations
    // =========================================================================

    async fn insert_product(&self, product: &Product) -> Result<()> {
        self.lock().products.insert(product.id, product.clone());
        Ok(())
    }

    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>> {
        Ok(self.lock().products.get(id).cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let mut products: Vec<Product> = self.lock().products.values().cloned().collect();
        products.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.as_uuid().cmp(b.id.as_uuid()))
        });
        Ok(products)
    }

    async fn update_product(&self, id: &ProductId, patch: ProductPatch) -> Result<Product> {
        let mut inner = self.lock();
        let product = inner.products.get_mut(id).ok_or_else(|| StoreError::NotFound {
            entity: "product",
            id: id.to_string(),
        })?;
        product.apply(patch);
        Ok(product.clone())
    }

    async fn delete_product(&self, id: &ProductId) -> Result<()> {
        let mut inner = self.lock();

        if inner.products.remove(id).is_none() {
            return Err(StoreError::NotFound {
                entity: "product",
                id: id.to_string(),
            });
        }

        // Purge referencing cart items so no dangling reference survives.
        inner.items.retain(|item| item.product_id != *id);

        Ok(())
    }

    // =========================================================================
    // Cart Operations
    // =========================================================================

    async fn find_or_create_active_cart(&self, user_id: &UserId) -> Result<Cart> {
        let mut inner = self.lock();

        if let Some(cart) = inner.active_cart(user_id) {
            return Ok(cart.clone());
        }

        let cart = Cart::new(*user_id);
        inner.carts.insert(cart.id, cart.clone());
        Ok(cart)
    }

    async fn get_active_cart(&self, user_id: &UserId) -> Result<Option<Cart>> {
        Ok(self.lock().active_cart(user_id).cloned())
    }

    async fn view_active_cart(&self, user_id: &UserId) -> Result<Option<CartView>> {
        let inner = self.lock();

        let Some(cart) = inner.active_cart(user_id).cloned() else {
            return Ok(None);
        };

        let items = inner
            .cart_items(cart.id)
            .filter_map(|item| {
                inner.products.get(&item.product_id).map(|product| CartLine {
                    id: item.id,
                    product_id: item.product_id,
                    quantity: item.quantity,
                    product: product.clone(),
                })
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
        let mut inner = self.lock();

        if !inner.products.contains_key(product_id) {
            return Err(StoreError::NotFound {
                entity: "product",
                id: product_id.to_string(),
            });
        }

        if let Some(item) = inner
            .items
            .iter_mut()
            .find(|item| item.cart_id == *cart_id && item.product_id == *product_id)
        {
            item.quantity += quantity;
            item.updated_at = Utc::now();
            return Ok(item.clone());
        }

        let item = CartItem::new(*cart_id, *product_id, quantity);
        inner.items.push(item.clone());
        Ok(item)
    }

    async fn remove_item(&self, cart_id: &CartId, item_id: &CartItemId) -> Result<()> {
        let mut inner = self.lock();

        let position = inner
            .items
            .iter()
            .position(|item| item.id == *item_id && item.cart_id == *cart_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "cart item",
                id: item_id.to_string(),
            })?;

        inner.items.remove(position);
        Ok(())
    }

    async fn clear_items(&self, cart_id: &CartId) -> Result<u64> {
        let mut inner = self.lock();
        let before = inner.items.len();
        inner.items.retain(|item| item.cart_id != *cart_id);
        Ok((before - inner.items.len()) as u64)
    }

    // =========================================================================
    // Compound Operations
    // =========================================================================

    async fn checkout(&self, user_id: &UserId) -> Result<CheckoutSummary> {
        let mut inner = self.lock();

        let cart = inner
            .active_cart(user_id)
            .cloned()
            .ok_or(StoreError::NoActiveCart)?;

        let items: Vec<CartItem> = inner.cart_items(cart.id).cloned().collect();
        if items.is_empty() {
            return Err(StoreError::EmptyCart);
        }

        // Validate every line before touching any stock.
        let mut skipped = Vec::new();
        for item in &items {
            match inner.products.get(&item.product_id) {
                Some(product) if product.has_stock(item.quantity) => {}
                Some(product) => {
                    return Err(StoreError::InsufficientStock {
                        product: product.name.clone(),
                        available: product.stock,
                        requested: item.quantity,
                    });
                }
                None => {
                    tracing::warn!(
                        cart_id = %cart.id,
                        product_id = %item.product_id,
                        "Skipping cart item whose product no longer exists"
                    );
                    skipped.push(item.product_id);
                }
            }
        }

        let now = Utc::now();
        let mut charged = Vec::with_capacity(items.len());
        for item in &items {
            let Some(product) = inner.products.get_mut(&item.product_id) else {
                continue;
            };
            product.stock -= item.quantity;
            product.updated_at = now;
            charged.push(ChargedItem::new(
                product.id,
                product.name.clone(),
                item.quantity,
                product.price,
            ));
        }

        inner.items.retain(|item| item.cart_id != cart.id);

        Ok(CheckoutSummary::new(cart.id, charged, skipped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use tienda_core::NewProduct;

    fn product(name: &str, price_cents: i64, stock: i32) -> Product {
        Product::new(NewProduct {
            name: name.into(),
            description: None,
            price: Decimal::new(price_cents, 2),
            stock,
            image_url: None,
            features: None,
        })
    }

    #[tokio::test]
    async fn product_crud() {
        let store = MemoryStore::new();
        let p = product("Mug", 1250, 40);

        store.insert_product(&p).await.unwrap();

        let retrieved = store.get_product(&p.id).await.unwrap().unwrap();
        assert_eq!(retrieved.name, "Mug");
        assert_eq!(retrieved.stock, 40);

        let updated = store
            .update_product(
                &p.id,
                ProductPatch {
                    stock: Some(15),
                    ..ProductPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.stock, 15);
        // Untouched fields keep their prior value.
        assert_eq!(updated.price, Decimal::new(1250, 2));

        store.delete_product(&p.id).await.unwrap();
        assert!(store.get_product(&p.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_missing_product_fails() {
        let store = MemoryStore::new();
        let result = store
            .update_product(&ProductId::generate(), ProductPatch::default())
            .await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn delete_product_purges_cart_items() {
        let store = MemoryStore::new();
        let p = product("Mug", 1250, 40);
        store.insert_product(&p).await.unwrap();

        let user_id = UserId::generate();
        let cart = store.find_or_create_active_cart(&user_id).await.unwrap();
        store.add_item(&cart.id, &p.id, 2).await.unwrap();

        store.delete_product(&p.id).await.unwrap();

        // No orphan item survives the product.
        let view = store.view_active_cart(&user_id).await.unwrap().unwrap();
        assert!(view.items.is_empty());
        assert!(store.lock().items.is_empty());
    }

    #[tokio::test]
    async fn find_or_create_reuses_active_cart() {
        let store = MemoryStore::new();
        let user_id = UserId::generate();

        let first = store.find_or_create_active_cart(&user_id).await.unwrap();
        let second = store.find_or_create_active_cart(&user_id).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.lock().carts.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_find_or_create_yields_one_cart() {
        let store = Arc::new(MemoryStore::new());
        let user_id = UserId::generate();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.find_or_create_active_cart(&user_id).await.unwrap().id
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }

        ids.dedup();
        assert_eq!(ids.len(), 1, "every caller must see the same cart");
        assert_eq!(store.lock().carts.len(), 1);
    }

    #[tokio::test]
    async fn add_item_accumulates_quantity() {
        let store = MemoryStore::new();
        let p = product("Mug", 1250, 40);
        store.insert_product(&p).await.unwrap();

        let user_id = UserId::generate();
        let cart = store.find_or_create_active_cart(&user_id).await.unwrap();

        store.add_item(&cart.id, &p.id, 2).await.unwrap();
        let item = store.add_item(&cart.id, &p.id, 3).await.unwrap();

        assert_eq!(item.quantity, 5);
        let view = store.view_active_cart(&user_id).await.unwrap().unwrap();
        assert_eq!(view.items.len(), 1, "repeat adds must not create a second item");
        assert_eq!(view.items[0].quantity, 5);
    }

    #[tokio::test]
    async fn add_item_unknown_product_fails() {
        let store = MemoryStore::new();
        let user_id = UserId::generate();
        let cart = store.find_or_create_active_cart(&user_id).await.unwrap();

        let result = store.add_item(&cart.id, &ProductId::generate(), 1).await;
        assert!(matches!(
            result,
            Err(StoreError::NotFound { entity: "product", .. })
        ));
    }

    #[tokio::test]
    async fn remove_item_checks_cart_ownership() {
        let store = MemoryStore::new();
        let p = product("Mug", 1250, 40);
        store.insert_product(&p).await.unwrap();

        let owner = UserId::generate();
        let cart = store.find_or_create_active_cart(&owner).await.unwrap();
        let item = store.add_item(&cart.id, &p.id, 1).await.unwrap();

        // Another user's cart must not be able to remove the item.
        let intruder = UserId::generate();
        let intruder_cart = store.find_or_create_active_cart(&intruder).await.unwrap();
        let result = store.remove_item(&intruder_cart.id, &item.id).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));

        // The item is still there for its owner.
        let view = store.view_active_cart(&owner).await.unwrap().unwrap();
        assert_eq!(view.items.len(), 1);

        store.remove_item(&cart.id, &item.id).await.unwrap();
        let view = store.view_active_cart(&owner).await.unwrap().unwrap();
        assert!(view.items.is_empty());
    }

    #[tokio::test]
    async fn clear_items_reports_count() {
        let store = MemoryStore::new();
        let a = product("A", 100, 10);
        let b = product("B", 200, 10);
        store.insert_product(&a).await.unwrap();
        store.insert_product(&b).await.unwrap();

        let user_id = UserId::generate();
        let cart = store.find_or_create_active_cart(&user_id).await.unwrap();
        store.add_item(&cart.id, &a.id, 1).await.unwrap();
        store.add_item(&cart.id, &b.id, 2).await.unwrap();

        assert_eq!(store.clear_items(&cart.id).await.unwrap(), 2);
        assert_eq!(store.clear_items(&cart.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn checkout_decrements_stock_and_empties_cart() {
        let store = MemoryStore::new();
        let p = product("Mug", 1250, 10);
        store.insert_product(&p).await.unwrap();

        let user_id = UserId::generate();
        let cart = store.find_or_create_active_cart(&user_id).await.unwrap();
        store.add_item(&cart.id, &p.id, 2).await.unwrap();

        let summary = store.checkout(&user_id).await.unwrap();
        assert_eq!(summary.cart_id, cart.id);
        assert_eq!(summary.items.len(), 1);
        assert_eq!(summary.total, Decimal::new(2500, 2));
        assert!(summary.skipped_products.is_empty());

        let after = store.get_product(&p.id).await.unwrap().unwrap();
        assert_eq!(after.stock, 8);

        // The cart survives, empty and still active.
        let view = store.view_active_cart(&user_id).await.unwrap().unwrap();
        assert_eq!(view.cart.id, cart.id);
        assert!(view.items.is_empty());
    }

    #[tokio::test]
    async fn checkout_is_all_or_nothing() {
        let store = MemoryStore::new();
        let a = product("A", 1000, 10);
        let b = product("B", 1000, 3);
        store.insert_product(&a).await.unwrap();
        store.insert_product(&b).await.unwrap();

        let user_id = UserId::generate();
        let cart = store.find_or_create_active_cart(&user_id).await.unwrap();
        store.add_item(&cart.id, &a.id, 5).await.unwrap();
        store.add_item(&cart.id, &b.id, 5).await.unwrap();

        let result = store.checkout(&user_id).await;
        assert!(matches!(
            result,
            Err(StoreError::InsufficientStock { available: 3, requested: 5, .. })
        ));

        // Product A was validated before B failed; its stock must be intact.
        let a_after = store.get_product(&a.id).await.unwrap().unwrap();
        assert_eq!(a_after.stock, 10);
        let b_after = store.get_product(&b.id).await.unwrap().unwrap();
        assert_eq!(b_after.stock, 3);

        // The cart keeps its items so the caller can retry.
        let view = store.view_active_cart(&user_id).await.unwrap().unwrap();
        assert_eq!(view.items.len(), 2);
    }

    #[tokio::test]
    async fn checkout_without_cart_fails() {
        let store = MemoryStore::new();
        let result = store.checkout(&UserId::generate()).await;
        assert!(matches!(result, Err(StoreError::NoActiveCart)));
    }

    #[tokio::test]
    async fn checkout_empty_cart_fails() {
        let store = MemoryStore::new();
        let user_id = UserId::generate();
        store.find_or_create_active_cart(&user_id).await.unwrap();

        let result = store.checkout(&user_id).await;
        assert!(matches!(result, Err(StoreError::EmptyCart)));
    }

    #[tokio::test]
    async fn checkout_reports_vanished_product_as_skipped() {
        let store = MemoryStore::new();
        let kept = product("Kept", 1000, 10);
        let doomed = product("Doomed", 1000, 10);
        store.insert_product(&kept).await.unwrap();
        store.insert_product(&doomed).await.unwrap();

        let user_id = UserId::generate();
        let cart = store.find_or_create_active_cart(&user_id).await.unwrap();
        store.add_item(&cart.id, &kept.id, 1).await.unwrap();
        store.add_item(&cart.id, &doomed.id, 1).await.unwrap();

        // Drop the product row out from under its cart item, bypassing the
        // purge that delete_product would perform.
        store.lock().products.remove(&doomed.id);

        let summary = store.checkout(&user_id).await.unwrap();
        assert_eq!(summary.items.len(), 1);
        assert_eq!(summary.items[0].product_id, kept.id);
        assert_eq!(summary.skipped_products, vec![doomed.id]);
    }
}
