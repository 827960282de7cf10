//! Authentication extractors.
//!
//! This module provides extractors for the two caller kinds the auth
//! service mints tokens for:
//!
//! - `Customer` - cart and checkout endpoints (`role = "user"`)
//! - `Admin` - product management endpoints (`role = "admin"`)
//!
//! Token issuance belongs to the external auth service; this service only
//! verifies the HS256 signature with the shared secret and lifts the
//! claims into a typed identity. A missing or unverifiable token is 401;
//! a verified token with the wrong role is 403.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use tienda_core::UserId;

use crate::error::ApiError;
use crate::state::AppState;

/// JWT claims as issued by the auth service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (the auth service puts the login email here).
    pub sub: String,
    /// The user's ID.
    pub user_id: String,
    /// Caller role.
    pub role: Role,
    /// Expiration time (unix seconds).
    pub exp: i64,
}

/// Caller role carried in the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A shopper; may use the cart endpoints.
    User,
    /// A catalog administrator; may manage products.
    Admin,
}

/// Verify the bearer token on a request and return its claims.
fn verify_token(parts: &Parts, state: &AppState) -> Result<Claims, ApiError> {
    let auth_header = parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Unauthorized)?;

    let key = DecodingKey::from_secret(state.config.jwt_secret.as_bytes());
    let validation = Validation::new(Algorithm::HS256);

    let data = jsonwebtoken::decode::<Claims>(token, &key, &validation)
        .map_err(|_| ApiError::Unauthorized)?;

    Ok(data.claims)
}

/// Resolve claims into a typed user ID, requiring an exact role.
fn require_role(claims: &Claims, role: Role) -> Result<UserId, ApiError> {
    if claims.role != role {
        return Err(ApiError::Forbidden);
    }

    claims
        .user_id
        .parse::<UserId>()
        .map_err(|_| ApiError::Unauthorized)
}

/// An authenticated shopper extracted from a verified bearer token.
#[derive(Debug, Clone)]
pub struct Customer {
    /// The user ID.
    pub user_id: UserId,
    /// The raw subject claim from the JWT.
    pub subject: String,
}

impl FromRequestParts<Arc<AppState>> for Customer {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let claims = verify_token(parts, state)?;
            let user_id = require_role(&claims, Role::User)?;

            Ok(Customer {
                user_id,
                subject: claims.sub,
            })
        })
    }
}

/// An authenticated catalog administrator.
#[derive(Debug, Clone)]
pub struct Admin {
    /// The admin's user ID.
    pub user_id: UserId,
    /// The raw subject claim from the JWT.
    pub subject: String,
}

impl FromRequestParts<Arc<AppState>> for Admin {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let claims = verify_token(parts, state)?;
            let user_id = require_role(&claims, Role::Admin)?;

            Ok(Admin {
                user_id,
                subject: claims.sub,
            })
        })
    }
}
