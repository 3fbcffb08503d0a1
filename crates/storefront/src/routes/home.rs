//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use super::Chrome;
use super::products::{CategoryLink, ProductCard};
use crate::filters;
use crate::state::AppState;

/// Featured products on the home page.
const FEATURED_LIMIT: u32 = 8;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub chrome: Chrome,
    pub categories: Vec<CategoryLink>,
    pub featured: Vec<ProductCard>,
}

/// Display the home page.
///
/// Either section falls back to empty when the backend is unavailable.
#[instrument(skip(state, chrome))]
pub async fn home(State(state): State<AppState>, chrome: Chrome) -> impl IntoResponse {
    let client = state.backend();

    let categories = client.categories("created").await.unwrap_or_else(|e| {
        tracing::warn!("Failed to load categories: {e}");
        Vec::new()
    });

    let featured = client
        .featured_products(FEATURED_LIMIT)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to load featured products: {e}");
            Vec::new()
        });

    HomeTemplate {
        chrome,
        categories: categories
            .iter()
            .map(|c| CategoryLink::new(client, c))
            .collect(),
        featured: featured
            .iter()
            .map(|p| ProductCard::new(client, p, Some("400x400")))
            .collect(),
    }
}
