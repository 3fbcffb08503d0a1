//! Admin overview.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use madio_core::{OrderStatus, Price};
use tracing::instrument;

use super::AdminOrderRow;
use crate::backend::{BackendError, Order, collections};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::routes::Chrome;
use crate::state::AppState;

/// Orders considered for revenue and pending counts.
const REVENUE_WINDOW: u32 = 50;

/// Orders listed under "recent".
const RECENT_ORDERS: usize = 5;

/// Headline numbers for the overview.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OverviewStats {
    pub products: u64,
    pub categories: u64,
    pub users: u64,
    pub orders: u64,
    pub revenue: String,
    pub pending: usize,
}

/// Revenue of the given orders, cancelled ones excluded.
#[must_use]
pub fn revenue(orders: &[Order]) -> Price {
    orders
        .iter()
        .filter(|order| order.status.counts_as_revenue())
        .map(|order| order.total)
        .sum()
}

fn count_or_zero(what: &str, result: Result<u64, BackendError>) -> u64 {
    result.unwrap_or_else(|e| {
        tracing::warn!("Failed to count {what}: {e}");
        0
    })
}

/// Admin overview template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/overview.html")]
pub struct OverviewTemplate {
    pub chrome: Chrome,
    pub stats: OverviewStats,
    pub recent_orders: Vec<AdminOrderRow>,
}

/// Display the admin overview. Each figure falls back to zero on failure.
#[instrument(skip(state, admin, chrome), fields(admin_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    chrome: Chrome,
) -> impl IntoResponse {
    let client = state.backend();
    let token = &admin.token;

    let (products, categories, users, orders) = tokio::join!(
        client.count(collections::PRODUCTS, Some(token)),
        client.count(collections::CATEGORIES, Some(token)),
        client.count(collections::USERS, Some(token)),
        client.recent_orders(REVENUE_WINDOW, token),
    );

    let (orders, order_total) = match orders {
        Ok(page) => {
            let total = u64::try_from(page.total_items).unwrap_or(0);
            (page.items, total)
        }
        Err(e) => {
            tracing::error!("Failed to load recent orders: {e}");
            (Vec::new(), 0)
        }
    };

    let stats = OverviewStats {
        products: count_or_zero("products", products),
        categories: count_or_zero("categories", categories),
        users: count_or_zero("users", users),
        orders: order_total,
        revenue: revenue(&orders).display(),
        pending: orders
            .iter()
            .filter(|order| order.status == OrderStatus::Pending)
            .count(),
    };

    OverviewTemplate {
        chrome,
        stats,
        recent_orders: orders
            .iter()
            .take(RECENT_ORDERS)
            .map(AdminOrderRow::from)
            .collect(),
    }
}
