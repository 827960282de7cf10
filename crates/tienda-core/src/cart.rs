//! Cart and cart item types.
//!
//! Each user has at most one *active* cart at a time. The cart is created
//! lazily on the first add-to-cart and recycled after checkout (its items
//! are cleared, the row stays active). Items are unique per
//! `(cart, product)`; repeat adds accumulate quantity instead of inserting
//! a second row.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CartId, CartItemId, Product, ProductId, UserId};

/// Lifecycle state of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartStatus {
    /// Currently accepting items.
    Active,
    /// Checked out. No operation currently produces this state; checkout
    /// recycles the active cart instead of completing it.
    Completed,
}

impl CartStatus {
    /// Stable string form, as persisted in the `carts.status` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

/// Error returned when parsing an unknown cart status string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown cart status: {0}")]
pub struct UnknownCartStatus(pub String);

impl FromStr for CartStatus {
    type Err = UnknownCartStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            other => Err(UnknownCartStatus(other.to_string())),
        }
    }
}

/// A user's shopping cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    /// The cart ID.
    pub id: CartId,

    /// Owning user. Opaque external identity from the auth collaborator;
    /// there is no users table in this service.
    pub user_id: UserId,

    /// Lifecycle state. At most one active cart exists per user.
    pub status: CartStatus,

    /// When the cart was created.
    pub created_at: DateTime<Utc>,

    /// When the cart was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Create a new active cart for a user.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: CartId::generate(),
            user_id,
            status: CartStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One product line within a cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    /// The item ID.
    pub id: CartItemId,

    /// The owning cart.
    pub cart_id: CartId,

    /// The referenced product (non-owning; deleting a product purges its
    /// cart items first).
    pub product_id: ProductId,

    /// Units of the product in the cart, always >= 1.
    pub quantity: i32,

    /// When the item was first added.
    pub created_at: DateTime<Utc>,

    /// When the quantity last changed.
    pub updated_at: DateTime<Utc>,
}

impl CartItem {
    /// Create a new cart item.
    #[must_use]
    pub fn new(cart_id: CartId, product_id: ProductId, quantity: i32) -> Self {
        let now = Utc::now();
        Self {
            id: CartItemId::generate(),
            cart_id,
            product_id,
            quantity,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A cart item joined with its product detail, as served by "view cart".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    /// The item ID.
    pub id: CartItemId,
    /// The referenced product's ID.
    pub product_id: ProductId,
    /// Units in the cart.
    pub quantity: i32,
    /// The product detail, denormalized for the client.
    pub product: Product,
}

/// A cart together with its item lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartView {
    /// The cart.
    pub cart: Cart,
    /// Item lines in insertion order.
    pub items: Vec<CartLine>,
}
