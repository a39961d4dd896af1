//! Service wiring: store backend selection and coordinator construction.

use std::sync::Arc;
use std::time::Duration;

use storefront_orders::{CoordinatorConfig, OrderCoordinator, Store};
use storefront_store::{MemoryStore, PgStore};

const DEFAULT_ORDER_TIMEOUT_MS: u64 = 5_000;

/// Shared handles injected into every handler. No globals: the store and the
/// coordinator travel as explicit collaborators.
#[derive(Clone)]
pub struct AppServices {
    pub store: Arc<dyn Store>,
    pub coordinator: Arc<OrderCoordinator>,
    /// Deadline for one order-creation attempt; elapsing rolls back.
    pub order_timeout: Duration,
}

impl AppServices {
    pub fn with_store(
        store: Arc<dyn Store>,
        config: CoordinatorConfig,
        order_timeout: Duration,
    ) -> Self {
        let coordinator = Arc::new(OrderCoordinator::new(store.clone(), config));
        Self {
            store,
            coordinator,
            order_timeout,
        }
    }

    /// Backend selection at startup: `DATABASE_URL` set means Postgres,
    /// otherwise the in-memory store (dev/test).
    pub async fn from_env() -> Self {
        let config = CoordinatorConfig {
            require_known_user: env_flag("REQUIRE_KNOWN_USER"),
        };
        let order_timeout = std::env::var("ORDER_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(DEFAULT_ORDER_TIMEOUT_MS));

        let store: Arc<dyn Store> = match std::env::var("DATABASE_URL") {
            Ok(url) => {
                let store = PgStore::connect(&url)
                    .await
                    .expect("failed to connect to Postgres");
                store
                    .ensure_schema()
                    .await
                    .expect("failed to apply database schema");
                tracing::info!("using postgres store");
                Arc::new(store)
            }
            Err(_) => {
                tracing::warn!("DATABASE_URL not set; using in-memory store");
                Arc::new(MemoryStore::new())
            }
        };

        Self::with_store(store, config, order_timeout)
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false)
}
