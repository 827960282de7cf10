//! Error types for tienda storage.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record ("product", "cart item", ...).
        entity: &'static str,
        /// The identifier that was not found.
        id: String,
    },

    /// The user has no active cart.
    #[error("no active cart")]
    NoActiveCart,

    /// The active cart has no items.
    #[error("cart is empty")]
    EmptyCart,

    /// A cart line requires more units than the product has in stock.
    /// Checkout is all-or-nothing: when this is returned, no stock was
    /// changed for any line.
    #[error("insufficient stock for {product}: available={available}, requested={requested}")]
    InsufficientStock {
        /// Product name, for the caller-facing message.
        product: String,
        /// Units currently in stock.
        available: i32,
        /// Units the cart line requires.
        requested: i32,
    },
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Database(err.to_string())
    }
}
