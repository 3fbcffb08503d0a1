//! Cache types for catalog reads.

use super::types::Category;

/// Cache key for catalog lists.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    /// All categories in the given sort order.
    Categories { sort: &'static str },
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Categories(Vec<Category>),
}
