//! In-memory store.
//!
//! All state lives behind one `tokio::sync::Mutex`. A transaction takes the
//! owned guard for its whole lifetime, so writers are fully serialized; its
//! writes are staged and applied only at commit, which makes dropping the
//! transaction a rollback for free.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use storefront_catalog::{Product, ProductPatch};
use storefront_core::{OrderId, ProductId, UserId};
use storefront_orders::{
    Order, OrderItem, OrderItemView, OrderWithItems, ProductRow, Store, StoreError, StoreTx,
};

#[derive(Debug, Default)]
struct MemoryState {
    products: HashMap<ProductId, Product>,
    users: HashSet<UserId>,
    orders: HashMap<OrderId, (Order, Vec<OrderItem>)>,
}

impl MemoryState {
    fn order_view(&self, order: &Order, items: &[OrderItem]) -> OrderWithItems {
        let items = items
            .iter()
            .map(|item| OrderItemView {
                product_id: item.product_id,
                product_name: self.products.get(&item.product_id).map(|p| p.name.clone()),
                quantity: item.quantity,
                unit_price_cents: item.unit_price_cents,
            })
            .collect();
        OrderWithItems {
            order: order.clone(),
            items,
        }
    }
}

/// In-memory backend for dev and tests. Not optimized for performance.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged_order: Option<(Order, Vec<OrderItem>)>,
    staged_decrements: HashMap<ProductId, i64>,
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        Ok(Box::new(MemoryTx {
            guard,
            staged_order: None,
            staged_decrements: HashMap::new(),
        }))
    }

    async fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.products.get(&id).cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let state = self.state.lock().await;
        let mut products: Vec<Product> = state.products.values().cloned().collect();
        products.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(products)
    }

    async fn update_product(
        &self,
        id: ProductId,
        patch: ProductPatch,
    ) -> Result<Option<Product>, StoreError> {
        let mut state = self.state.lock().await;
        match state.products.get_mut(&id) {
            Some(product) => {
                patch.apply(product);
                Ok(Some(product.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        Ok(state.products.remove(&id).is_some())
    }

    async fn put_user(&self, id: UserId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.users.insert(id);
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderWithItems>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .orders
            .get(&id)
            .map(|(order, items)| state.order_view(order, items)))
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn lock_products(
        &mut self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, ProductRow>, StoreError> {
        // Holding the state guard already excludes every other writer.
        let mut rows = HashMap::with_capacity(ids.len());
        for id in ids {
            if let Some(product) = self.guard.products.get(id) {
                rows.insert(
                    *id,
                    ProductRow {
                        name: product.name.clone(),
                        price_cents: product.price_cents,
                        stock: product.stock,
                    },
                );
            }
        }
        Ok(rows)
    }

    async fn user_exists(&mut self, id: UserId) -> Result<bool, StoreError> {
        Ok(self.guard.users.contains(&id))
    }

    async fn insert_order(
        &mut self,
        order: &Order,
        items: &[OrderItem],
    ) -> Result<(), StoreError> {
        if self.staged_order.is_some() {
            return Err(StoreError::backend("order already staged in transaction"));
        }
        self.staged_order = Some((order.clone(), items.to_vec()));
        Ok(())
    }

    async fn decrement_stock(&mut self, id: ProductId, quantity: i64) -> Result<(), StoreError> {
        let Some(product) = self.guard.products.get(&id) else {
            return Err(StoreError::backend(format!(
                "decrement on unknown product {id}"
            )));
        };
        let already_staged = self.staged_decrements.get(&id).copied().unwrap_or(0);
        if product.stock - already_staged < quantity {
            return Err(StoreError::backend(format!(
                "stock decrement below zero for product {id}"
            )));
        }
        *self.staged_decrements.entry(id).or_insert(0) += quantity;
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        for (id, quantity) in &self.staged_decrements {
            let Some(product) = self.guard.products.get_mut(id) else {
                return Err(StoreError::backend(format!(
                    "commit: unknown product {id}"
                )));
            };
            product.stock -= quantity;
        }
        if let Some((order, items)) = self.staged_order.take() {
            self.guard.orders.insert(order.id, (order, items));
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        // Staged writes are simply dropped with the guard.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_catalog::NewProduct;

    fn product(price_cents: i64, stock: i64) -> Product {
        Product::create(NewProduct {
            name: "widget".to_string(),
            description: None,
            price_cents,
            stock,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn staged_decrements_never_take_stock_below_zero() {
        let store = MemoryStore::new();
        let p = product(100, 3);
        let id = p.id;
        store.insert_product(&p).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.decrement_stock(id, 2).await.unwrap();
        let err = tx.decrement_stock(id, 2).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
        tx.rollback().await.unwrap();

        // Nothing applied.
        assert_eq!(store.get_product(id).await.unwrap().unwrap().stock, 3);
    }

    #[tokio::test]
    async fn rollback_discards_staged_writes() {
        let store = MemoryStore::new();
        let p = product(100, 5);
        let id = p.id;
        store.insert_product(&p).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.decrement_stock(id, 4).await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(store.get_product(id).await.unwrap().unwrap().stock, 5);
    }

    #[tokio::test]
    async fn commit_applies_staged_writes() {
        let store = MemoryStore::new();
        let p = product(100, 5);
        let id = p.id;
        store.insert_product(&p).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.decrement_stock(id, 4).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.get_product(id).await.unwrap().unwrap().stock, 1);
    }

    #[tokio::test]
    async fn list_products_is_newest_first() {
        let store = MemoryStore::new();
        let first = product(1, 1);
        let second = product(2, 1);
        store.insert_product(&first).await.unwrap();
        store.insert_product(&second).await.unwrap();

        let listed = store.list_products().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].created_at >= listed[1].created_at);
    }
}
