use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{Cents, DomainError, DomainResult, ProductId};

/// A sellable product with authoritative price and stock.
///
/// `stock` is mutated only inside the order-creation transaction or through
/// an administrative update; it never goes negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    /// Price in cents.
    pub price_cents: Cents,
    /// Units available for sale.
    pub stock: i64,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Build a product from validated creation input, assigning a fresh id.
    pub fn create(input: NewProduct) -> DomainResult<Self> {
        input.validate()?;
        Ok(Self {
            id: ProductId::new(),
            name: input.name,
            description: input.description,
            price_cents: input.price_cents,
            stock: input.stock,
            created_at: Utc::now(),
        })
    }
}

/// Creation input for a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: Cents,
    pub stock: i64,
}

impl NewProduct {
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name must not be empty"));
        }
        if self.price_cents < 0 {
            return Err(DomainError::validation("price_cents must not be negative"));
        }
        if self.stock < 0 {
            return Err(DomainError::validation("stock must not be negative"));
        }
        Ok(())
    }
}

/// Partial update of a product. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<Cents>,
    pub stock: Option<i64>,
}

impl ProductPatch {
    /// A patch that would change nothing is a caller error.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price_cents.is_none()
            && self.stock.is_none()
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.is_empty() {
            return Err(DomainError::validation(
                "no valid fields provided for update",
            ));
        }
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("name must not be empty"));
            }
        }
        if matches!(self.price_cents, Some(p) if p < 0) {
            return Err(DomainError::validation("price_cents must not be negative"));
        }
        if matches!(self.stock, Some(s) if s < 0) {
            return Err(DomainError::validation("stock must not be negative"));
        }
        Ok(())
    }

    /// Apply the patch in place. Callers validate first.
    pub fn apply(self, product: &mut Product) {
        if let Some(name) = self.name {
            product.name = name;
        }
        if let Some(description) = self.description {
            product.description = Some(description);
        }
        if let Some(price_cents) = self.price_cents {
            product.price_cents = price_cents;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
    }
}
