//! Cache types for catalog API responses.

use crate::api::types::{Product, ProductPage};

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(ProductPage),
    Suggestions(Vec<Product>),
}
