//! `storefront-store` — storage adapters behind the order-core ports.
//!
//! Two interchangeable backends implement `storefront_orders::Store`:
//!
//! - [`memory::MemoryStore`] — everything behind one async mutex; a
//!   transaction holds the guard and stages its writes until commit.
//!   Single-writer serialization, used for dev and tests.
//! - [`postgres::PgStore`] — Postgres via sqlx; order creation locks product
//!   rows with `SELECT ... FOR UPDATE` inside an explicit transaction.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[cfg(test)]
mod integration_tests;
