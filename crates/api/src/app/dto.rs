//! Request DTOs and JSON mapping helpers.

use serde::Deserialize;
use uuid::Uuid;

use storefront_catalog::{NewProduct, Product, ProductPatch};
use storefront_core::{ProductId, UserId};
use storefront_orders::{OrderLine, OrderRequest, OrderWithItems};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub stock: i64,
}

impl From<CreateProductRequest> for NewProduct {
    fn from(req: CreateProductRequest) -> Self {
        NewProduct {
            name: req.name,
            description: req.description,
            price_cents: req.price_cents,
            stock: req.stock,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub stock: Option<i64>,
}

impl From<UpdateProductRequest> for ProductPatch {
    fn from(req: UpdateProductRequest) -> Self {
        ProductPatch {
            name: req.name,
            description: req.description,
            price_cents: req.price_cents,
            stock: req.stock,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderItemRequest {
    pub product_id: Uuid,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: Uuid,
    pub items: Vec<CreateOrderItemRequest>,
}

impl From<CreateOrderRequest> for OrderRequest {
    fn from(req: CreateOrderRequest) -> Self {
        OrderRequest {
            user_id: UserId::from_uuid(req.user_id),
            lines: req
                .items
                .into_iter()
                .map(|item| OrderLine {
                    product_id: ProductId::from_uuid(item.product_id),
                    quantity: item.quantity,
                })
                .collect(),
        }
    }
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn product_to_json(product: &Product) -> serde_json::Value {
    serde_json::json!({
        "id": product.id.to_string(),
        "name": product.name,
        "description": product.description,
        "price_cents": product.price_cents,
        "stock": product.stock,
        "created_at": product.created_at.to_rfc3339(),
    })
}

pub fn order_to_json(order: &OrderWithItems) -> serde_json::Value {
    serde_json::json!({
        "id": order.order.id.to_string(),
        "user_id": order.order.user_id.to_string(),
        "total_cents": order.order.total_cents,
        "status": "created",
        "created_at": order.order.created_at.to_rfc3339(),
        "items": order.items.iter().map(|item| serde_json::json!({
            "product_id": item.product_id.to_string(),
            "product_name": item.product_name,
            "quantity": item.quantity,
            "unit_price_cents": item.unit_price_cents,
        })).collect::<Vec<_>>(),
    })
}
