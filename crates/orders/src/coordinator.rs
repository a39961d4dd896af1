//! Order transaction coordinator.
//!
//! One `create_order` call is one transaction attempt: validate the request,
//! lock the referenced product rows, check stock against combined demand,
//! compute the total from the locked prices, persist order + items, decrement
//! stock, commit. Any failure past `begin` rolls the whole unit back. The
//! coordinator holds no state between calls; retry policy belongs to the
//! caller, which can distinguish transient failures via
//! [`OrderError::is_transient`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;

use storefront_core::{money, Cents, OrderId, ProductId, UserId};

use crate::error::OrderError;
use crate::order::{
    demand_by_product, Order, OrderItem, OrderItemView, OrderRequest, OrderStatus, OrderWithItems,
};
use crate::store::{ProductRow, Store, StoreTx};

/// Coordinator behavior switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinatorConfig {
    /// Reject orders from users the store has never seen. Off by default;
    /// the user entity is external and most deployments trust the caller.
    pub require_known_user: bool,
}

/// Stateless orchestrator of the order-creation transaction.
pub struct OrderCoordinator {
    store: Arc<dyn Store>,
    config: CoordinatorConfig,
}

impl OrderCoordinator {
    pub fn new(store: Arc<dyn Store>, config: CoordinatorConfig) -> Self {
        Self { store, config }
    }

    /// Create an order atomically, or fail with a fully rolled-back attempt.
    pub async fn create_order(&self, request: OrderRequest) -> Result<OrderWithItems, OrderError> {
        request.validate()?;
        let demand = demand_by_product(&request.lines)?;

        let mut tx = self.store.begin().await?;
        let outcome = self.run_create(&mut *tx, &request, &demand).await;
        match outcome {
            Ok(created) => {
                tx.commit().await?;
                tracing::info!(
                    order_id = %created.order.id,
                    user_id = %created.order.user_id,
                    total_cents = created.order.total_cents,
                    item_count = created.items.len(),
                    "order_created"
                );
                Ok(created)
            }
            Err(err) => {
                // Best effort; dropping the tx also rolls back.
                if let Err(rb) = tx.rollback().await {
                    tracing::warn!(error = %rb, "rollback_failed");
                }
                tracing::debug!(error = %err, "order_creation_rejected");
                Err(err)
            }
        }
    }

    async fn run_create(
        &self,
        tx: &mut dyn StoreTx,
        request: &OrderRequest,
        demand: &BTreeMap<ProductId, i64>,
    ) -> Result<OrderWithItems, OrderError> {
        // BTreeMap iteration gives ascending ids: the deterministic lock order.
        let ids: Vec<ProductId> = demand.keys().copied().collect();
        let rows = tx.lock_products(&ids).await?;

        for id in &ids {
            if !rows.contains_key(id) {
                return Err(OrderError::ProductNotFound { product_id: *id });
            }
        }

        if self.config.require_known_user && !tx.user_exists(request.user_id).await? {
            return Err(OrderError::UserNotFound {
                user_id: request.user_id,
            });
        }

        for (id, quantity) in demand {
            let Some(row) = rows.get(id) else {
                return Err(OrderError::ProductNotFound { product_id: *id });
            };
            if row.stock < *quantity {
                return Err(OrderError::InsufficientStock { product_id: *id });
            }
        }

        let order_id = OrderId::new();
        let (total_cents, items) = price_lines(order_id, request, &rows)?;

        let order = Order {
            id: order_id,
            user_id: request.user_id,
            total_cents,
            status: OrderStatus::Created,
            created_at: Utc::now(),
        };

        tx.insert_order(&order, &items).await?;
        for (id, quantity) in demand {
            tx.decrement_stock(*id, *quantity).await?;
        }

        let item_views = items
            .iter()
            .map(|item| OrderItemView {
                product_id: item.product_id,
                product_name: rows.get(&item.product_id).map(|r| r.name.clone()),
                quantity: item.quantity,
                unit_price_cents: item.unit_price_cents,
            })
            .collect();

        Ok(OrderWithItems {
            order,
            items: item_views,
        })
    }

    /// Look up a committed order with its items. Read-only, no locking.
    pub async fn get_order(&self, id: OrderId) -> Result<OrderWithItems, OrderError> {
        self.store.get_order(id).await?.ok_or(OrderError::NotFound)
    }
}

/// Price every requested line from the locked rows and sum the total.
///
/// One `OrderItem` per requested line, snapshotting the price observed inside
/// this transaction. Arithmetic is overflow-checked.
fn price_lines(
    order_id: OrderId,
    request: &OrderRequest,
    rows: &HashMap<ProductId, ProductRow>,
) -> Result<(Cents, Vec<OrderItem>), OrderError> {
    let mut items = Vec::with_capacity(request.lines.len());
    let mut line_totals = Vec::with_capacity(request.lines.len());
    for line in &request.lines {
        let Some(row) = rows.get(&line.product_id) else {
            return Err(OrderError::ProductNotFound {
                product_id: line.product_id,
            });
        };
        line_totals.push(money::line_total(line.quantity, row.price_cents)?);
        items.push(OrderItem {
            order_id,
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price_cents: row.price_cents,
        });
    }
    let total = money::sum_totals(line_totals)?;
    Ok((total, items))
}

// The coordinator's end-to-end behavior (atomicity, overselling, rollback) is
// exercised against the in-memory backend in `storefront-store`'s integration
// tests; here we cover the pure pricing step.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderLine;
    use proptest::prelude::*;

    fn row(name: &str, price_cents: Cents, stock: i64) -> ProductRow {
        ProductRow {
            name: name.to_string(),
            price_cents,
            stock,
        }
    }

    fn request(lines: Vec<OrderLine>) -> OrderRequest {
        OrderRequest {
            user_id: UserId::new(),
            lines,
        }
    }

    #[test]
    fn price_lines_snapshots_unit_prices_and_sums_total() {
        let p = ProductId::new();
        let q = ProductId::new();
        let mut rows = HashMap::new();
        rows.insert(p, row("widget", 1000, 10));
        rows.insert(q, row("gadget", 250, 10));

        let order_id = OrderId::new();
        let req = request(vec![
            OrderLine {
                product_id: p,
                quantity: 2,
            },
            OrderLine {
                product_id: q,
                quantity: 4,
            },
        ]);

        let (total, items) = price_lines(order_id, &req, &rows).unwrap();
        assert_eq!(total, 2 * 1000 + 4 * 250);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].unit_price_cents, 1000);
        assert_eq!(items[1].unit_price_cents, 250);
        assert!(items.iter().all(|i| i.order_id == order_id));
    }

    #[test]
    fn price_lines_fails_on_unknown_product() {
        let known = ProductId::new();
        let unknown = ProductId::new();
        let mut rows = HashMap::new();
        rows.insert(known, row("widget", 100, 1));

        let req = request(vec![OrderLine {
            product_id: unknown,
            quantity: 1,
        }]);
        let err = price_lines(OrderId::new(), &req, &rows).unwrap_err();
        assert_eq!(err, OrderError::ProductNotFound {
            product_id: unknown
        });
    }

    #[test]
    fn price_lines_detects_total_overflow() {
        let p = ProductId::new();
        let mut rows = HashMap::new();
        rows.insert(p, row("widget", i64::MAX, i64::MAX));

        let req = request(vec![OrderLine {
            product_id: p,
            quantity: 2,
        }]);
        assert!(matches!(
            price_lines(OrderId::new(), &req, &rows),
            Err(OrderError::Validation(_))
        ));
    }

    proptest! {
        // Order.total always equals the sum of quantity * unit_price over the
        // persisted items.
        #[test]
        fn total_equals_sum_of_items(cases in proptest::collection::vec((1i64..50, 0i64..10_000), 1..8)) {
            let mut rows = HashMap::new();
            let mut lines = Vec::new();
            for (quantity, price) in &cases {
                let id = ProductId::new();
                rows.insert(id, row("p", *price, i64::MAX));
                lines.push(OrderLine { product_id: id, quantity: *quantity });
            }

            let (total, items) = price_lines(OrderId::new(), &request(lines), &rows).unwrap();
            let expected: i64 = items.iter().map(|i| i.quantity * i.unit_price_cents).sum();
            prop_assert_eq!(total, expected);
            prop_assert_eq!(items.len(), cases.len());
        }
    }
}
