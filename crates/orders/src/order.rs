use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{Cents, OrderId, ProductId, UserId};

use crate::error::OrderError;

/// Order lifecycle status. Orders are immutable once created, so the enum has
/// a single variant; it is kept as an enum so the wire shape stays stable if
/// a lifecycle ever grows around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Created,
}

/// A committed order. `total_cents` is computed once at creation and never
/// recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub total_cents: Cents,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// One persisted line of an order. `unit_price_cents` is a frozen copy of the
/// product price at order time; later price changes never touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price_cents: Cents,
}

/// An order line joined with display data for reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemView {
    pub product_id: ProductId,
    /// Current product name, `None` if the product was deleted since.
    pub product_name: Option<String>,
    pub quantity: i64,
    pub unit_price_cents: Cents,
}

/// An order with its items, as returned to readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItemView>,
}

/// One requested product/quantity pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// An order-creation request as handed to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub user_id: UserId,
    pub lines: Vec<OrderLine>,
}

impl OrderRequest {
    /// Shape validation. Runs before any store access.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.lines.is_empty() {
            return Err(OrderError::validation("order must include items"));
        }
        for line in &self.lines {
            if line.quantity < 1 {
                return Err(OrderError::validation(format!(
                    "quantity must be at least 1 for product {}",
                    line.product_id
                )));
            }
        }
        Ok(())
    }
}

/// Total demand per product across all lines.
///
/// A product may appear on several lines; the stock check has to see the
/// combined quantity or two small lines could jointly oversell. The result is
/// keyed by a `BTreeMap`, which also fixes the lock acquisition order.
pub fn demand_by_product(lines: &[OrderLine]) -> Result<BTreeMap<ProductId, i64>, OrderError> {
    let mut demand = BTreeMap::new();
    for line in lines {
        let entry = demand.entry(line.product_id).or_insert(0i64);
        *entry = entry
            .checked_add(line.quantity)
            .ok_or_else(|| OrderError::validation("requested quantity overflows"))?;
    }
    Ok(demand)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: ProductId, quantity: i64) -> OrderLine {
        OrderLine {
            product_id,
            quantity,
        }
    }

    #[test]
    fn validate_rejects_empty_requests() {
        let request = OrderRequest {
            user_id: UserId::new(),
            lines: vec![],
        };
        assert!(matches!(
            request.validate(),
            Err(OrderError::Validation(_))
        ));
    }

    #[test]
    fn validate_rejects_non_positive_quantities() {
        for quantity in [0, -1] {
            let request = OrderRequest {
                user_id: UserId::new(),
                lines: vec![line(ProductId::new(), quantity)],
            };
            assert!(matches!(
                request.validate(),
                Err(OrderError::Validation(_))
            ));
        }
    }

    #[test]
    fn validate_accepts_positive_quantities() {
        let request = OrderRequest {
            user_id: UserId::new(),
            lines: vec![line(ProductId::new(), 1), line(ProductId::new(), 3)],
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn demand_sums_duplicate_product_lines() {
        let p = ProductId::new();
        let q = ProductId::new();
        let demand = demand_by_product(&[line(p, 2), line(q, 1), line(p, 3)]).unwrap();
        assert_eq!(demand.len(), 2);
        assert_eq!(demand[&p], 5);
        assert_eq!(demand[&q], 1);
    }

    #[test]
    fn demand_keys_are_sorted() {
        let lines: Vec<OrderLine> = (0..8).map(|_| line(ProductId::new(), 1)).collect();
        let demand = demand_by_product(&lines).unwrap();
        let keys: Vec<ProductId> = demand.keys().copied().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn demand_detects_quantity_overflow() {
        let p = ProductId::new();
        let result = demand_by_product(&[line(p, i64::MAX), line(p, 1)]);
        assert!(matches!(result, Err(OrderError::Validation(_))));
    }
}
