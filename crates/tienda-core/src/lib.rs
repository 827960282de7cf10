//! Core types for the tienda product catalog and cart service.
//!
//! This crate provides the foundational types used throughout tienda:
//!
//! - **Identifiers**: `UserId`, `ProductId`, `CartId`, `CartItemId`
//! - **Catalog**: `Product`, `NewProduct`, `ProductPatch`
//! - **Carts**: `Cart`, `CartStatus`, `CartItem`, `CartView`
//! - **Checkout**: `CheckoutSummary`, `ChargedItem`
//!
//! # Money and stock
//!
//! Prices are `rust_decimal::Decimal` (two fractional digits by
//! convention, matching the `numeric(10, 2)` column they persist to).
//! Stock and quantities are `i32`; the store layer enforces `stock >= 0`
//! and `quantity >= 1`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cart;
pub mod checkout;
pub mod ids;
pub mod product;

pub use cart::{Cart, CartItem, CartLine, CartStatus, CartView, UnknownCartStatus};
pub use checkout::{ChargedItem, CheckoutSummary};
pub use ids::{CartId, CartItemId, IdError, ProductId, UserId};
pub use product::{NewProduct, Product, ProductPatch};
