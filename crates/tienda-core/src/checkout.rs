//! Checkout result types.
//!
//! Checkout converts a cart's items into a permanent stock deduction. The
//! operation itself lives behind the store trait (it must be atomic); these
//! types describe its outcome to the caller.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{CartId, ProductId};

/// One successfully charged cart line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargedItem {
    /// The product whose stock was decremented.
    pub product_id: ProductId,
    /// Product name at checkout time.
    pub name: String,
    /// Units deducted from stock.
    pub quantity: i32,
    /// Unit price at checkout time.
    pub unit_price: Decimal,
    /// `unit_price * quantity`.
    pub line_total: Decimal,
}

impl ChargedItem {
    /// Build a charged line, computing its total.
    #[must_use]
    pub fn new(product_id: ProductId, name: String, quantity: i32, unit_price: Decimal) -> Self {
        let line_total = unit_price * Decimal::from(quantity);
        Self {
            product_id,
            name,
            quantity,
            unit_price,
            line_total,
        }
    }
}

/// The outcome of a successful checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSummary {
    /// The cart that was checked out (recycled, not deleted).
    pub cart_id: CartId,
    /// Lines charged, in cart insertion order.
    pub items: Vec<ChargedItem>,
    /// Sum of all line totals.
    pub total: Decimal,
    /// Products referenced by the cart that no longer existed at checkout
    /// time. Their lines were skipped, not charged.
    pub skipped_products: Vec<ProductId>,
}

impl CheckoutSummary {
    /// Build a summary, computing the order total from the charged lines.
    #[must_use]
    pub fn new(cart_id: CartId, items: Vec<ChargedItem>, skipped_products: Vec<ProductId>) -> Self {
        let total = items.iter().map(|item| item.line_total).sum();
        Self {
            cart_id,
            items,
            total,
            skipped_products,
        }
    }
}
