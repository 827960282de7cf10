//! API handlers.

pub mod cart;
pub mod health;
pub mod products;
