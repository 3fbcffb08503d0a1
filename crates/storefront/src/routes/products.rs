//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use madio_core::{CategoryId, ProductId};
use serde::Deserialize;
use tracing::instrument;

use super::Chrome;
use crate::backend::{
    BackendClient, BackendError, Category, Product, ProductSearch, ProductSort, collections,
};
use crate::error::AppError;
use crate::filters;
use crate::state::AppState;

/// Related products shown on the detail page.
const RELATED_LIMIT: u32 = 4;

/// Product card data for templates.
#[derive(Clone)]
pub struct ProductCard {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: String,
    pub stock: u32,
    pub in_stock: bool,
    pub featured: bool,
    pub category_name: Option<String>,
    pub image_url: Option<String>,
}

impl ProductCard {
    /// Build a card; `thumb` selects a backend thumbnail size.
    #[must_use]
    pub fn new(client: &BackendClient, product: &Product, thumb: Option<&str>) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.display(),
            stock: product.stock,
            in_stock: product.in_stock(),
            featured: product.featured,
            category_name: product.category_name().map(String::from),
            image_url: client.file_url(
                collections::PRODUCTS,
                product.id.as_str(),
                &product.image,
                thumb,
            ),
        }
    }
}

/// Category link data for templates.
#[derive(Clone)]
pub struct CategoryLink {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub image_url: Option<String>,
}

impl CategoryLink {
    #[must_use]
    pub fn new(client: &BackendClient, category: &Category) -> Self {
        Self {
            id: category.id.to_string(),
            name: category.name.clone(),
            description: category.description.clone(),
            icon: category.icon.clone(),
            image_url: client.file_url(
                collections::CATEGORIES,
                category.id.as_str(),
                &category.image,
                Some("400x300"),
            ),
        }
    }
}

/// Sort dropdown option.
#[derive(Clone)]
pub struct SortOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ProductsQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
}

impl ProductsQuery {
    fn into_search(self) -> ProductSearch {
        ProductSearch {
            category: self
                .category
                .filter(|id| !id.trim().is_empty())
                .map(CategoryId::new),
            search: self.search.filter(|q| !q.trim().is_empty()),
            sort: ProductSort::parse(self.sort.as_deref()),
        }
    }
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub chrome: Chrome,
    pub products: Vec<ProductCard>,
    pub total: i64,
    pub categories: Vec<CategoryLink>,
    pub selected_category: String,
    pub search: String,
    pub sorts: Vec<SortOption>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub chrome: Chrome,
    pub product: ProductCard,
    pub category_id: String,
    pub quantity_options: Vec<u32>,
    pub related: Vec<ProductCard>,
}

/// Display the product listing.
#[instrument(skip(state, chrome))]
pub async fn index(
    State(state): State<AppState>,
    chrome: Chrome,
    Query(query): Query<ProductsQuery>,
) -> impl IntoResponse {
    let client = state.backend();
    let search = query.into_search();

    let (products, total) = match client.search_products(&search).await {
        Ok(page) => (
            page.items
                .iter()
                .map(|p| ProductCard::new(client, p, Some("400x400")))
                .collect(),
            page.total_items,
        ),
        Err(e) => {
            tracing::error!("Failed to load products: {e}");
            (Vec::new(), 0)
        }
    };

    let categories = client.categories("name").await.unwrap_or_else(|e| {
        tracing::warn!("Failed to load categories: {e}");
        Vec::new()
    });

    ProductsIndexTemplate {
        chrome,
        products,
        total,
        categories: categories
            .iter()
            .map(|c| CategoryLink::new(client, c))
            .collect(),
        selected_category: search
            .category
            .map(CategoryId::into_inner)
            .unwrap_or_default(),
        search: search.search.unwrap_or_default(),
        sorts: ProductSort::ALL
            .into_iter()
            .map(|sort| SortOption {
                value: sort.as_str(),
                label: sort.label(),
                selected: sort == search.sort,
            })
            .collect(),
    }
}

/// Display a product.
#[instrument(skip(state, chrome), fields(product_id = %id))]
pub async fn show(
    State(state): State<AppState>,
    chrome: Chrome,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let client = state.backend();
    let product = match client.product(&ProductId::new(id)).await {
        Ok(product) => product,
        Err(BackendError::NotFound(_)) => {
            return Err(AppError::NotFound("product".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let related = client
        .related_products(&product, RELATED_LIMIT)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to load related products: {e}");
            Vec::new()
        });

    Ok(ProductShowTemplate {
        chrome,
        category_id: product.category.to_string(),
        quantity_options: (1..=product.stock.min(10)).collect(),
        product: ProductCard::new(client, &product, None),
        related: related
            .iter()
            .map(|p| ProductCard::new(client, p, Some("400x400")))
            .collect(),
    })
}
