//! Category listing route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tokio::task::JoinSet;
use tracing::instrument;

use super::Chrome;
use super::products::CategoryLink;
use crate::filters;
use crate::state::AppState;

/// A category with its product count.
#[derive(Clone)]
pub struct CategoryWithCount {
    pub category: CategoryLink,
    pub product_count: u64,
}

/// Category listing template.
#[derive(Template, WebTemplate)]
#[template(path = "categories/index.html")]
pub struct CategoriesIndexTemplate {
    pub chrome: Chrome,
    pub categories: Vec<CategoryWithCount>,
}

/// Display all categories with their product counts.
#[instrument(skip(state, chrome))]
pub async fn index(State(state): State<AppState>, chrome: Chrome) -> impl IntoResponse {
    let client = state.backend();
    let categories = client.categories("name").await.unwrap_or_else(|e| {
        tracing::error!("Failed to load categories: {e}");
        Vec::new()
    });

    let mut counts = JoinSet::new();
    for (index, category) in categories.iter().enumerate() {
        let client = client.clone();
        let id = category.id.clone();
        counts.spawn(async move {
            let count = client.count_products_in_category(&id).await;
            (index, id, count)
        });
    }

    let mut product_counts = vec![0; categories.len()];
    while let Some(joined) = counts.join_next().await {
        match joined {
            Ok((index, _, Ok(count))) => {
                if let Some(slot) = product_counts.get_mut(index) {
                    *slot = count;
                }
            }
            Ok((_, id, Err(e))) => {
                tracing::warn!(category_id = %id, "Failed to count products: {e}");
            }
            Err(e) => tracing::error!("Product count task failed: {e}"),
        }
    }

    CategoriesIndexTemplate {
        chrome,
        categories: categories
            .iter()
            .zip(product_counts)
            .map(|(category, product_count)| CategoryWithCount {
                category: CategoryLink::new(client, category),
                product_count,
            })
            .collect(),
    }
}
