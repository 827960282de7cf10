//! Tienda HTTP API Service.
//!
//! This crate provides the HTTP API for the tienda service, including:
//!
//! - Public product catalog (list, detail)
//! - Admin product management (create, partial update, delete)
//! - Per-user shopping cart (add, view, remove item, clear)
//! - Checkout (atomic stock deduction)
//!
//! # Authentication
//!
//! Callers authenticate with HS256 bearer tokens issued by the external
//! auth service. The token's `role` claim selects the caller kind:
//!
//! 1. **`user`** - Cart and checkout endpoints
//! 2. **`admin`** - Product management endpoints

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // The health handler needs async for routing consistency

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
