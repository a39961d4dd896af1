//! `storefront-catalog` — product domain types and validation.

pub mod product;

pub use product::{NewProduct, Product, ProductPatch};
