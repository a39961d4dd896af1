//! `storefront-core` — shared domain primitives.
//!
//! Strongly-typed identifiers, the domain error taxonomy, and fixed-point
//! money helpers. No infrastructure concerns live here.

pub mod error;
pub mod id;
pub mod money;

pub use error::{DomainError, DomainResult};
pub use id::{OrderId, ProductId, UserId};
pub use money::Cents;
