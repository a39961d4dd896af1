//! Collaborator ports: inventory store + order ledger behind one transactional
//! seam.
//!
//! The inventory side and the order ledger must participate in one atomic
//! unit, so they are exposed as a single [`Store`] whose [`StoreTx`] carries
//! both sides. Backends: an in-memory single-writer store for dev and
//! tests, and Postgres with row locks (see `storefront-store`).

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use storefront_catalog::{Product, ProductPatch};
use storefront_core::{Cents, OrderId, ProductId, UserId};

use crate::order::{Order, OrderItem, OrderWithItems};

/// Store-level failure.
///
/// `Transient` covers failures the caller may retry identically (lock
/// timeouts, deadlocks, connectivity); `Backend` is everything else. Business
/// rules are never encoded here — they belong to the coordinator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("transient store failure: {0}")]
    Transient(String),

    #[error("store backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// A product row as observed under lock inside a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRow {
    pub name: String,
    pub price_cents: Cents,
    pub stock: i64,
}

/// Storage backend: catalog administration, the ledger read side, and the
/// entry point into the atomic order-creation unit.
///
/// All methods outside [`Store::begin`] are single-shot operations with no
/// cross-request invariants; everything touching stock or the ledger write
/// side goes through a [`StoreTx`].
#[async_trait]
pub trait Store: Send + Sync {
    /// Open an atomic unit spanning inventory and ledger.
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError>;

    // Catalog administration (outside the order core).
    async fn insert_product(&self, product: &Product) -> Result<(), StoreError>;
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;
    /// Newest first.
    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;
    /// `None` when the product does not exist.
    async fn update_product(
        &self,
        id: ProductId,
        patch: ProductPatch,
    ) -> Result<Option<Product>, StoreError>;
    /// `false` when the product does not exist.
    async fn delete_product(&self, id: ProductId) -> Result<bool, StoreError>;

    /// Register a known user (admin side; exercised by the optional
    /// user-existence check).
    async fn put_user(&self, id: UserId) -> Result<(), StoreError>;

    /// Ledger read side. Must reflect any previously committed creation.
    async fn get_order(&self, id: OrderId) -> Result<Option<OrderWithItems>, StoreError>;
}

/// One atomic unit against inventory + ledger.
///
/// Dropping a transaction without [`StoreTx::commit`] must be equivalent to
/// rollback: no order, no items, no stock mutation survives.
#[async_trait]
pub trait StoreTx: Send {
    /// Acquire write-intent locks on the given product rows and return what
    /// was found. `ids` arrive deduplicated and in ascending order; callers
    /// detect missing products by comparing against the returned map.
    async fn lock_products(
        &mut self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, ProductRow>, StoreError>;

    async fn user_exists(&mut self, id: UserId) -> Result<bool, StoreError>;

    /// Persist the order with all its items.
    async fn insert_order(
        &mut self,
        order: &Order,
        items: &[OrderItem],
    ) -> Result<(), StoreError>;

    /// Decrease stock by `quantity`. Backends must refuse to take stock below
    /// zero even if the caller's validation was bypassed.
    async fn decrement_stock(&mut self, id: ProductId, quantity: i64) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
