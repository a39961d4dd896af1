//! Coordinator-versus-store behavior: atomicity, overselling, snapshots.

use std::sync::Arc;

use storefront_catalog::{NewProduct, Product, ProductPatch};
use storefront_core::{ProductId, UserId};
use storefront_orders::{
    CoordinatorConfig, OrderCoordinator, OrderError, OrderLine, OrderRequest, Store,
};

use crate::memory::MemoryStore;

async fn seed_product(store: &MemoryStore, price_cents: i64, stock: i64) -> ProductId {
    let product = Product::create(NewProduct {
        name: "widget".to_string(),
        description: None,
        price_cents,
        stock,
    })
    .unwrap();
    let id = product.id;
    store.insert_product(&product).await.unwrap();
    id
}

fn coordinator(store: &MemoryStore) -> OrderCoordinator {
    OrderCoordinator::new(Arc::new(store.clone()), CoordinatorConfig::default())
}

fn request(lines: Vec<(ProductId, i64)>) -> OrderRequest {
    OrderRequest {
        user_id: UserId::new(),
        lines: lines
            .into_iter()
            .map(|(product_id, quantity)| OrderLine {
                product_id,
                quantity,
            })
            .collect(),
    }
}

async fn stock_of(store: &MemoryStore, id: ProductId) -> i64 {
    store.get_product(id).await.unwrap().unwrap().stock
}

// Concrete scenario: price 10, stock 2; quantity 2 succeeds with total 20 and
// drains stock; a follow-up quantity 1 fails and leaves stock at 0.
#[tokio::test]
async fn create_then_oversell_scenario() {
    let store = MemoryStore::new();
    let p1 = seed_product(&store, 10, 2).await;
    let coordinator = coordinator(&store);

    let created = coordinator
        .create_order(request(vec![(p1, 2)]))
        .await
        .unwrap();
    assert_eq!(created.order.total_cents, 20);
    assert_eq!(created.items.len(), 1);
    assert_eq!(created.items[0].unit_price_cents, 10);
    assert_eq!(stock_of(&store, p1).await, 0);

    let err = coordinator
        .create_order(request(vec![(p1, 1)]))
        .await
        .unwrap_err();
    assert_eq!(err, OrderError::InsufficientStock { product_id: p1 });
    assert_eq!(stock_of(&store, p1).await, 0);
}

#[tokio::test]
async fn validation_failures_never_touch_the_store() {
    let store = MemoryStore::new();
    let p1 = seed_product(&store, 100, 5).await;
    let coordinator = coordinator(&store);

    let empty = coordinator.create_order(request(vec![])).await.unwrap_err();
    assert!(matches!(empty, OrderError::Validation(_)));

    let zero_qty = coordinator
        .create_order(request(vec![(p1, 0)]))
        .await
        .unwrap_err();
    assert!(matches!(zero_qty, OrderError::Validation(_)));

    assert_eq!(stock_of(&store, p1).await, 5);
}

#[tokio::test]
async fn unknown_product_rolls_back_the_whole_order() {
    let store = MemoryStore::new();
    let valid = seed_product(&store, 100, 5).await;
    let missing = ProductId::new();
    let coordinator = coordinator(&store);

    let err = coordinator
        .create_order(request(vec![(valid, 1), (missing, 1)]))
        .await
        .unwrap_err();
    assert_eq!(err, OrderError::ProductNotFound {
        product_id: missing
    });
    assert_eq!(stock_of(&store, valid).await, 5);
}

#[tokio::test]
async fn insufficient_second_line_leaves_first_untouched() {
    let store = MemoryStore::new();
    let plenty = seed_product(&store, 100, 10).await;
    let scarce = seed_product(&store, 100, 1).await;
    let coordinator = coordinator(&store);

    let err = coordinator
        .create_order(request(vec![(plenty, 2), (scarce, 3)]))
        .await
        .unwrap_err();
    assert_eq!(err, OrderError::InsufficientStock {
        product_id: scarce
    });
    assert_eq!(stock_of(&store, plenty).await, 10);
    assert_eq!(stock_of(&store, scarce).await, 1);
}

// Two lines for the same product must be checked as combined demand.
#[tokio::test]
async fn duplicate_lines_cannot_jointly_oversell() {
    let store = MemoryStore::new();
    let p1 = seed_product(&store, 100, 3).await;
    let coordinator = coordinator(&store);

    let err = coordinator
        .create_order(request(vec![(p1, 2), (p1, 2)]))
        .await
        .unwrap_err();
    assert_eq!(err, OrderError::InsufficientStock { product_id: p1 });
    assert_eq!(stock_of(&store, p1).await, 3);

    // Within stock the same shape succeeds, with one item per line.
    let created = coordinator
        .create_order(request(vec![(p1, 1), (p1, 2)]))
        .await
        .unwrap();
    assert_eq!(created.items.len(), 2);
    assert_eq!(created.order.total_cents, 300);
    assert_eq!(stock_of(&store, p1).await, 0);
}

#[tokio::test]
async fn unit_price_is_frozen_against_later_price_changes() {
    let store = MemoryStore::new();
    let p1 = seed_product(&store, 250, 10).await;
    let coordinator = coordinator(&store);

    let created = coordinator
        .create_order(request(vec![(p1, 2)]))
        .await
        .unwrap();
    assert_eq!(created.order.total_cents, 500);

    store
        .update_product(p1, ProductPatch {
            price_cents: Some(999),
            ..Default::default()
        })
        .await
        .unwrap();

    let read = coordinator.get_order(created.order.id).await.unwrap();
    assert_eq!(read.order.total_cents, 500);
    assert_eq!(read.items[0].unit_price_cents, 250);
}

#[tokio::test]
async fn get_order_is_idempotent_and_misses_are_not_found() {
    let store = MemoryStore::new();
    let p1 = seed_product(&store, 100, 5).await;
    let coordinator = coordinator(&store);

    let created = coordinator
        .create_order(request(vec![(p1, 1)]))
        .await
        .unwrap();

    let first = coordinator.get_order(created.order.id).await.unwrap();
    let second = coordinator.get_order(created.order.id).await.unwrap();
    assert_eq!(first, second);

    let miss = coordinator
        .get_order(storefront_core::OrderId::new())
        .await
        .unwrap_err();
    assert_eq!(miss, OrderError::NotFound);
}

#[tokio::test]
async fn order_view_survives_product_deletion() {
    let store = MemoryStore::new();
    let p1 = seed_product(&store, 100, 5).await;
    let coordinator = coordinator(&store);

    let created = coordinator
        .create_order(request(vec![(p1, 1)]))
        .await
        .unwrap();
    assert!(store.delete_product(p1).await.unwrap());

    let read = coordinator.get_order(created.order.id).await.unwrap();
    assert_eq!(read.items[0].product_name, None);
    assert_eq!(read.items[0].unit_price_cents, 100);
}

#[tokio::test]
async fn user_check_is_enforced_only_when_enabled() {
    let store = MemoryStore::new();
    let p1 = seed_product(&store, 100, 5).await;
    let user = UserId::new();
    let checking = OrderCoordinator::new(
        Arc::new(store.clone()),
        CoordinatorConfig {
            require_known_user: true,
        },
    );

    let mut req = request(vec![(p1, 1)]);
    req.user_id = user;
    let err = checking.create_order(req.clone()).await.unwrap_err();
    assert_eq!(err, OrderError::UserNotFound { user_id: user });
    assert_eq!(stock_of(&store, p1).await, 5);

    store.put_user(user).await.unwrap();
    let created = checking.create_order(req).await.unwrap();
    assert_eq!(created.order.user_id, user);
    assert_eq!(stock_of(&store, p1).await, 4);
}

// Stock 5, two concurrent requests for 3: exactly one succeeds and the final
// stock is 2 — never negative, never double-decremented.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_overlapping_orders_cannot_oversell() {
    let store = MemoryStore::new();
    let p1 = seed_product(&store, 100, 5).await;
    let coordinator = Arc::new(coordinator(&store));

    let a = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.create_order(request(vec![(p1, 3)])).await })
    };
    let b = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.create_order(request(vec![(p1, 3)])).await })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    assert!(results.iter().any(|r| matches!(
        r,
        Err(OrderError::InsufficientStock { product_id }) if *product_id == p1
    )));
    assert_eq!(stock_of(&store, p1).await, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_disjoint_orders_both_succeed() {
    let store = MemoryStore::new();
    let p1 = seed_product(&store, 100, 5).await;
    let p2 = seed_product(&store, 200, 5).await;
    let coordinator = Arc::new(coordinator(&store));

    let a = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.create_order(request(vec![(p1, 2)])).await })
    };
    let b = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.create_order(request(vec![(p2, 2)])).await })
    };

    assert!(a.await.unwrap().is_ok());
    assert!(b.await.unwrap().is_ok());
    assert_eq!(stock_of(&store, p1).await, 3);
    assert_eq!(stock_of(&store, p2).await, 3);
}
