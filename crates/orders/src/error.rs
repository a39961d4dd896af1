//! The closed failure set of the order core.
//!
//! Callers match on these variants instead of string-sniffing messages. All
//! variants except `Transient` and `Store` are deterministic given the same
//! store state.

use thiserror::Error;

use storefront_core::{DomainError, ProductId, UserId};

use crate::store::StoreError;

/// Failure outcome of a coordinator operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// Malformed input; detected before any store access.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced product does not exist. Transaction rolled back in full.
    #[error("product not found: {product_id}")]
    ProductNotFound { product_id: ProductId },

    /// Demand exceeds available stock. Transaction rolled back in full.
    #[error("insufficient stock for product {product_id}")]
    InsufficientStock { product_id: ProductId },

    /// The ordering user is unknown (only when the user check is enabled).
    #[error("user not found: {user_id}")]
    UserNotFound { user_id: UserId },

    /// Order lookup miss.
    #[error("order not found")]
    NotFound,

    /// Lock timeout, deadlock, connectivity. Rolled back; safe to retry the
    /// identical request.
    #[error("transient store failure: {0}")]
    Transient(String),

    /// Any other store-level failure. Rolled back; not classified retryable.
    #[error("store failure: {0}")]
    Store(String),
}

impl OrderError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Whether retrying the identical request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<StoreError> for OrderError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Transient(msg) => Self::Transient(msg),
            StoreError::Backend(msg) => Self::Store(msg),
        }
    }
}

impl From<DomainError> for OrderError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => Self::Validation(msg),
            DomainError::InvalidId(msg) => Self::Validation(msg),
            DomainError::NotFound => Self::NotFound,
        }
    }
}
