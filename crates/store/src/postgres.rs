//! Postgres-backed store.
//!
//! Order creation runs in an explicit transaction: product rows are locked
//! with `SELECT ... FOR UPDATE` (in ascending id order), and the stock
//! decrement is guarded by `AND stock >= $n` so the non-negative invariant
//! holds at the database even if a caller skipped validation.
//!
//! ## Error mapping
//!
//! | Postgres condition              | Code    | StoreError  |
//! |---------------------------------|---------|-------------|
//! | serialization failure           | `40001` | `Transient` |
//! | deadlock detected               | `40P01` | `Transient` |
//! | lock not available              | `55P03` | `Transient` |
//! | pool timeout / connection error | n/a     | `Transient` |
//! | anything else                   | any     | `Backend`   |

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use storefront_catalog::{Product, ProductPatch};
use storefront_core::{OrderId, ProductId, UserId};
use storefront_orders::{
    Order, OrderItem, OrderItemView, OrderStatus, OrderWithItems, ProductRow, Store, StoreError,
    StoreTx,
};

const SCHEMA: &str = include_str!("../migrations/0001_init.sql");

/// Postgres adapter. Cheap to clone; all clones share the pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: Arc<PgPool>,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect a pool against `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(16)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply the bundled schema (idempotent `CREATE ... IF NOT EXISTS`).
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        tracing::info!("database schema ensured");
        Ok(())
    }
}

struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price_cents, stock, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(product.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, description, price_cents, stock, created_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_product", e))?;

        row.map(|r| product_from_row(&r)).transpose()
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, description, price_cents, stock, created_at
            FROM products
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;

        rows.iter().map(product_from_row).collect()
    }

    async fn update_product(
        &self,
        id: ProductId,
        patch: ProductPatch,
    ) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE products
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                price_cents = COALESCE($4, price_cents),
                stock = COALESCE($5, stock)
            WHERE id = $1
            RETURNING id, name, description, price_cents, stock, created_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(&patch.name)
        .bind(&patch.description)
        .bind(patch.price_cents)
        .bind(patch.stock)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;

        row.map(|r| product_from_row(&r)).transpose()
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn put_user(&self, id: UserId) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO users (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("put_user", e))?;
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderWithItems>, StoreError> {
        let Some(order_row) = sqlx::query(
            r#"
            SELECT id, user_id, total_cents, status, created_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_order", e))?
        else {
            return Ok(None);
        };

        let order = order_from_row(&order_row)?;

        let item_rows = sqlx::query(
            r#"
            SELECT oi.product_id, p.name AS product_name, oi.quantity, oi.unit_price_cents
            FROM order_items oi
            LEFT JOIN products p ON p.id = oi.product_id
            WHERE oi.order_id = $1
            ORDER BY oi.id ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_order_items", e))?;

        let mut items = Vec::with_capacity(item_rows.len());
        for row in &item_rows {
            items.push(OrderItemView {
                product_id: ProductId::from_uuid(get(row, "product_id")?),
                product_name: get(row, "product_name")?,
                quantity: get(row, "quantity")?,
                unit_price_cents: get(row, "unit_price_cents")?,
            });
        }

        Ok(Some(OrderWithItems { order, items }))
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn lock_products(
        &mut self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, ProductRow>, StoreError> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();

        // ORDER BY id keeps the server-side lock acquisition order
        // deterministic across concurrent transactions.
        let rows = sqlx::query(
            r#"
            SELECT id, name, price_cents, stock
            FROM products
            WHERE id = ANY($1)
            ORDER BY id ASC
            FOR UPDATE
            "#,
        )
        .bind(&uuids)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("lock_products", e))?;

        let mut locked = HashMap::with_capacity(rows.len());
        for row in &rows {
            let id = ProductId::from_uuid(get(row, "id")?);
            locked.insert(
                id,
                ProductRow {
                    name: get(row, "name")?,
                    price_cents: get(row, "price_cents")?,
                    stock: get(row, "stock")?,
                },
            );
        }
        Ok(locked)
    }

    async fn user_exists(&mut self, id: UserId) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("user_exists", e))?;
        Ok(row.is_some())
    }

    async fn insert_order(
        &mut self,
        order: &Order,
        items: &[OrderItem],
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, total_cents, status, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(order.total_cents)
        .bind(status_str(order.status))
        .bind(order.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(item.order_id.as_uuid())
            .bind(item.product_id.as_uuid())
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_order_item", e))?;
        }
        Ok(())
    }

    async fn decrement_stock(&mut self, id: ProductId, quantity: i64) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - $2
            WHERE id = $1 AND stock >= $2
            "#,
        )
        .bind(id.as_uuid())
        .bind(quantity)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("decrement_stock", e))?;

        // The row is held under FOR UPDATE with stock already validated, so
        // zero rows means the invariant guard fired, not a business failure.
        if result.rows_affected() == 0 {
            return Err(StoreError::backend(format!(
                "stock decrement below zero for product {id}"
            )));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback", e))
    }
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column)
        .map_err(|e| StoreError::backend(format!("column {column}: {e}")))
}

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    Ok(Product {
        id: ProductId::from_uuid(get(row, "id")?),
        name: get(row, "name")?,
        description: get(row, "description")?,
        price_cents: get(row, "price_cents")?,
        stock: get(row, "stock")?,
        created_at: get::<DateTime<Utc>>(row, "created_at")?,
    })
}

fn order_from_row(row: &PgRow) -> Result<Order, StoreError> {
    let status: String = get(row, "status")?;
    Ok(Order {
        id: OrderId::from_uuid(get(row, "id")?),
        user_id: UserId::from_uuid(get(row, "user_id")?),
        total_cents: get(row, "total_cents")?,
        status: status_from_str(&status)?,
        created_at: get::<DateTime<Utc>>(row, "created_at")?,
    })
}

fn status_str(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Created => "created",
    }
}

fn status_from_str(s: &str) -> Result<OrderStatus, StoreError> {
    match s {
        "created" => Ok(OrderStatus::Created),
        other => Err(StoreError::backend(format!("unknown order status: {other}"))),
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) => {
            let code = db.code();
            let code = code.as_deref().unwrap_or("");
            if matches!(code, "40001" | "40P01" | "55P03") {
                StoreError::transient(format!("{operation}: {db}"))
            } else {
                StoreError::backend(format!("{operation}: {db}"))
            }
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
            StoreError::transient(format!("{operation}: {err}"))
        }
        _ => StoreError::backend(format!("{operation}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrip() {
        assert_eq!(status_str(OrderStatus::Created), "created");
        assert_eq!(status_from_str("created").unwrap(), OrderStatus::Created);
        assert!(status_from_str("shipped").is_err());
    }

    #[test]
    fn pool_timeout_maps_to_transient() {
        let err = map_sqlx_error("begin", sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::Transient(_)));
    }

    #[test]
    fn row_not_found_maps_to_backend() {
        let err = map_sqlx_error("get_order", sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Backend(_)));
    }
}
