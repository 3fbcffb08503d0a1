//! Catalog reads and admin writes for categories and products.

use madio_core::{CategoryId, ProductId};
use secrecy::SecretString;
use tracing::{debug, instrument};

use super::cache::{CacheKey, CacheValue};
use super::collections::{CATEGORIES, PRODUCTS};
use super::query::{Filter, ListQuery};
use super::types::{Category, CategoryInput, ListResult, Product, ProductInput};
use super::{BackendClient, BackendError};

/// Maximum products shown on the listing page.
pub const PRODUCT_LIST_LIMIT: u32 = 50;

/// Sort orders offered on the product listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
    #[default]
    Newest,
    PriceLowHigh,
    PriceHighLow,
    Name,
}

impl ProductSort {
    pub const ALL: [Self; 4] = [
        Self::Newest,
        Self::PriceLowHigh,
        Self::PriceHighLow,
        Self::Name,
    ];

    /// The backend sort expression (also used as the query-string value).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Newest => "-created",
            Self::PriceLowHigh => "price",
            Self::PriceHighLow => "-price",
            Self::Name => "name",
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Newest => "Newest",
            Self::PriceLowHigh => "Price: low to high",
            Self::PriceHighLow => "Price: high to low",
            Self::Name => "Name",
        }
    }

    /// Parse a query-string value, falling back to newest first.
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        value
            .and_then(|v| Self::ALL.into_iter().find(|sort| sort.as_str() == v))
            .unwrap_or_default()
    }
}

/// Product listing criteria.
#[derive(Debug, Clone, Default)]
pub struct ProductSearch {
    pub category: Option<CategoryId>,
    pub search: Option<String>,
    pub sort: ProductSort,
}

impl ProductSearch {
    /// Filter expression for the criteria, `None` when unfiltered.
    #[must_use]
    pub fn filter(&self) -> Option<Filter> {
        let category = self
            .category
            .as_ref()
            .filter(|id| !id.is_empty())
            .map(|id| Filter::eq("category", id));
        let search = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| Filter::like("name", q).or(Filter::like("description", q)));

        match (category, search) {
            (Some(category), Some(search)) => Some(category.and(search)),
            (Some(filter), None) | (None, Some(filter)) => Some(filter),
            (None, None) => None,
        }
    }
}

impl BackendClient {
    // =========================================================================
    // Categories
    // =========================================================================

    /// All categories in the given sort order (`"name"` or `"created"`).
    ///
    /// Results are cached until the TTL expires or an admin write happens.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self))]
    pub async fn categories(&self, sort: &'static str) -> Result<Vec<Category>, BackendError> {
        let cache_key = CacheKey::Categories { sort };
        if let Some(CacheValue::Categories(categories)) = self.cache().get(&cache_key).await {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories: Vec<Category> = self
            .full_list(CATEGORIES, &ListQuery::new().sort(sort), None)
            .await?;

        self.cache()
            .insert(cache_key, CacheValue::Categories(categories.clone()))
            .await;

        Ok(categories)
    }

    /// Number of products in a category.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self), fields(category = %category))]
    pub async fn count_products_in_category(
        &self,
        category: &CategoryId,
    ) -> Result<u64, BackendError> {
        let query = ListQuery::new()
            .per_page(1)
            .filter(Filter::eq("category", category));
        let page: ListResult<Product> = self.list(PRODUCTS, &query, None).await?;
        Ok(u64::try_from(page.total_items).unwrap_or(0))
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails or the caller is not an admin.
    pub async fn create_category(
        &self,
        input: CategoryInput,
        auth: &SecretString,
    ) -> Result<Category, BackendError> {
        let category = self
            .create_multipart(CATEGORIES, input.into_form()?, Some(auth))
            .await?;
        self.invalidate_catalog();
        Ok(category)
    }

    /// Update a category.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails or the caller is not an admin.
    pub async fn update_category(
        &self,
        id: &CategoryId,
        input: CategoryInput,
        auth: &SecretString,
    ) -> Result<Category, BackendError> {
        let category = self
            .update_multipart(CATEGORIES, id.as_str(), input.into_form()?, Some(auth))
            .await?;
        self.invalidate_catalog();
        Ok(category)
    }

    /// Delete a category.
    ///
    /// # Errors
    ///
    /// Returns an error if the category is still referenced or the caller is
    /// not an admin.
    pub async fn delete_category(
        &self,
        id: &CategoryId,
        auth: &SecretString,
    ) -> Result<(), BackendError> {
        self.delete(CATEGORIES, id.as_str(), Some(auth)).await?;
        self.invalidate_catalog();
        Ok(())
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Featured products, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self))]
    pub async fn featured_products(&self, limit: u32) -> Result<Vec<Product>, BackendError> {
        let query = ListQuery::new()
            .per_page(limit)
            .filter(Filter::is("featured", true))
            .expand("category")
            .sort("-created")
            .skip_total();
        let page: ListResult<Product> = self.list(PRODUCTS, &query, None).await?;
        Ok(page.items)
    }

    /// Products matching the listing criteria, capped at [`PRODUCT_LIST_LIMIT`].
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self))]
    pub async fn search_products(
        &self,
        search: &ProductSearch,
    ) -> Result<ListResult<Product>, BackendError> {
        let query = ListQuery::new()
            .per_page(PRODUCT_LIST_LIMIT)
            .maybe_filter(search.filter())
            .expand("category")
            .sort(search.sort.as_str());
        self.list(PRODUCTS, &query, None).await
    }

    /// A product with its category expanded.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: &ProductId) -> Result<Product, BackendError> {
        self.get_one(PRODUCTS, id.as_str(), Some("category"), None)
            .await
    }

    /// Other products from the same category, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn related_products(
        &self,
        product: &Product,
        limit: u32,
    ) -> Result<Vec<Product>, BackendError> {
        let query = ListQuery::new()
            .per_page(limit)
            .filter(Filter::eq("category", &product.category).and(Filter::ne("id", &product.id)))
            .expand("category")
            .sort("-created")
            .skip_total();
        let page: ListResult<Product> = self.list(PRODUCTS, &query, None).await?;
        Ok(page.items)
    }

    /// Newest products for the admin table, category expanded.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    pub async fn admin_products(
        &self,
        limit: u32,
        auth: &SecretString,
    ) -> Result<Vec<Product>, BackendError> {
        let query = ListQuery::new()
            .per_page(limit)
            .expand("category")
            .sort("-created");
        let page: ListResult<Product> = self.list(PRODUCTS, &query, Some(auth)).await?;
        Ok(page.items)
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails or the caller is not an admin.
    pub async fn create_product(
        &self,
        input: ProductInput,
        auth: &SecretString,
    ) -> Result<Product, BackendError> {
        self.create_multipart(PRODUCTS, input.into_form()?, Some(auth))
            .await
    }

    /// Update a product.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails or the caller is not an admin.
    pub async fn update_product(
        &self,
        id: &ProductId,
        input: ProductInput,
        auth: &SecretString,
    ) -> Result<Product, BackendError> {
        self.update_multipart(PRODUCTS, id.as_str(), input.into_form()?, Some(auth))
            .await
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the caller is not an admin.
    pub async fn delete_product(
        &self,
        id: &ProductId,
        auth: &SecretString,
    ) -> Result<(), BackendError> {
        self.delete(PRODUCTS, id.as_str(), Some(auth)).await
    }

    /// Total number of records in a collection visible to the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    pub async fn count(
        &self,
        collection: &str,
        auth: Option<&SecretString>,
    ) -> Result<u64, BackendError> {
        let page: ListResult<serde_json::Value> = self
            .list(collection, &ListQuery::new().per_page(1), auth)
            .await?;
        Ok(u64::try_from(page.total_items).unwrap_or(0))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_parse() {
        assert_eq!(ProductSort::parse(Some("-price")), ProductSort::PriceHighLow);
        assert_eq!(ProductSort::parse(Some("price")), ProductSort::PriceLowHigh);
        assert_eq!(ProductSort::parse(Some("stock")), ProductSort::Newest);
        assert_eq!(ProductSort::parse(None), ProductSort::Newest);
    }

    #[test]
    fn test_search_filter_unfiltered() {
        assert!(ProductSearch::default().filter().is_none());
        let blank = ProductSearch {
            search: Some("   ".to_string()),
            ..ProductSearch::default()
        };
        assert!(blank.filter().is_none());
    }

    #[test]
    fn test_search_filter_category_only() {
        let search = ProductSearch {
            category: Some(CategoryId::new("c1")),
            ..ProductSearch::default()
        };
        assert_eq!(search.filter().unwrap().as_str(), "category = 'c1'");
    }

    #[test]
    fn test_search_filter_text_and_category() {
        let search = ProductSearch {
            category: Some(CategoryId::new("c1")),
            search: Some(" rose ".to_string()),
            sort: ProductSort::Name,
        };
        assert_eq!(
            search.filter().unwrap().as_str(),
            "category = 'c1' && (name ~ 'rose' || description ~ 'rose')"
        );
    }

    #[test]
    fn test_search_text_is_quoted() {
        let search = ProductSearch {
            search: Some("o'hara".to_string()),
            ..ProductSearch::default()
        };
        assert_eq!(
            search.filter().unwrap().as_str(),
            r"(name ~ 'o\'hara' || description ~ 'o\'hara')"
        );
    }
}
