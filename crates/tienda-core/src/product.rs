//! Product catalog types.
//!
//! A product carries an open-ended `features` document (arbitrary key-value
//! metadata, persisted as JSONB) alongside its fixed columns, so the catalog
//! can describe heterogeneous goods without schema changes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ProductId;

/// A catalog product.
///
/// Stock is mutated by admin updates and by checkout; it never goes
/// negative (the store layer validates before decrementing).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// The product ID.
    pub id: ProductId,

    /// Display name.
    pub name: String,

    /// Optional long-form description.
    pub description: Option<String>,

    /// Unit price, non-negative, two fractional digits by convention.
    pub price: Decimal,

    /// Units available for checkout, non-negative.
    pub stock: i32,

    /// Opaque reference to a stored image. Upload and storage belong to an
    /// external collaborator; this service only round-trips the URL.
    pub image_url: Option<String>,

    /// Open key-value metadata (color, size, weight, ...), no fixed schema.
    pub features: Option<serde_json::Value>,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Create a product from validated input, with a fresh ID and timestamps.
    #[must_use]
    pub fn new(new: NewProduct) -> Self {
        let now = Utc::now();
        Self {
            id: ProductId::generate(),
            name: new.name,
            description: new.description,
            price: new.price,
            stock: new.stock,
            image_url: new.image_url,
            features: new.features,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check whether `quantity` units can be taken from stock.
    #[must_use]
    pub const fn has_stock(&self, quantity: i32) -> bool {
        self.stock >= quantity
    }

    /// Apply a partial update. Fields absent from the patch are untouched.
    pub fn apply(&mut self, patch: ProductPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(stock) = patch.stock {
            self.stock = stock;
        }
        if let Some(image_url) = patch.image_url {
            self.image_url = Some(image_url);
        }
        if let Some(features) = patch.features {
            self.features = Some(features);
        }
        self.updated_at = Utc::now();
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    /// Display name (must be non-empty).
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Unit price (must be >= 0).
    pub price: Decimal,
    /// Initial stock (must be >= 0).
    pub stock: i32,
    /// Optional image reference.
    pub image_url: Option<String>,
    /// Optional feature map.
    pub features: Option<serde_json::Value>,
}

/// A partial product update. Only fields carrying a value are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductPatch {
    /// New name, if present.
    pub name: Option<String>,
    /// New description, if present.
    pub description: Option<String>,
    /// New price, if present (must be >= 0).
    pub price: Option<Decimal>,
    /// New stock, if present (must be >= 0).
    pub stock: Option<i32>,
    /// New image reference, if present.
    pub image_url: Option<String>,
    /// New feature map, if present (replaces the whole document).
    pub features: Option<serde_json::Value>,
}
