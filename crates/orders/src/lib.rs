//! `storefront-orders` — the order-creation transaction core.
//!
//! This crate owns the only non-trivial behavior in the system: turning an
//! order request into a committed order atomically — stock validated, total
//! computed from prices observed under lock, inventory decremented — or into
//! a fully rolled-back failure. Storage backends plug in behind the [`Store`]
//! and [`StoreTx`] ports.

pub mod coordinator;
pub mod error;
pub mod order;
pub mod store;

pub use coordinator::{CoordinatorConfig, OrderCoordinator};
pub use error::OrderError;
pub use order::{Order, OrderItem, OrderItemView, OrderLine, OrderRequest, OrderStatus, OrderWithItems};
pub use store::{ProductRow, Store, StoreError, StoreTx};
