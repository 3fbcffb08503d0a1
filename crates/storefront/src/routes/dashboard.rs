//! User dashboard route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use madio_core::OrderStatus;
use tracing::instrument;

use super::Chrome;
use crate::backend::Order;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Orders shown on the dashboard.
const ORDER_LIMIT: u32 = 50;

/// Order row for templates.
#[derive(Clone)]
pub struct OrderView {
    pub id: String,
    pub created: String,
    pub status: &'static str,
    pub status_label: &'static str,
    pub item_count: u32,
    pub total: String,
    pub items: Vec<OrderItemView>,
    pub payment: &'static str,
}

/// Order line for templates.
#[derive(Clone)]
pub struct OrderItemView {
    pub name: String,
    pub quantity: u32,
    pub total: String,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            created: order.created.clone(),
            status: order.status.as_str(),
            status_label: order.status.label(),
            item_count: order.item_count(),
            total: order.total.display(),
            items: order
                .items
                .iter()
                .map(|item| OrderItemView {
                    name: item.product_name.clone(),
                    quantity: item.quantity,
                    total: item.total.display(),
                })
                .collect(),
            payment: order.payment_method.map_or("", |method| method.label()),
        }
    }
}

/// Order counts by status.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct OrderStats {
    pub total: usize,
    pub pending: usize,
    pub shipped: usize,
    pub delivered: usize,
}

impl OrderStats {
    #[must_use]
    pub fn from_orders(orders: &[Order]) -> Self {
        let count = |status: OrderStatus| orders.iter().filter(|o| o.status == status).count();
        Self {
            total: orders.len(),
            pending: count(OrderStatus::Pending),
            shipped: count(OrderStatus::Shipped),
            delivered: count(OrderStatus::Delivered),
        }
    }
}

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub chrome: Chrome,
    pub name: String,
    pub email: String,
    pub orders: Vec<OrderView>,
    pub stats: OrderStats,
    pub error: Option<String>,
}

/// Display the signed-in user's order history.
#[instrument(skip(state, user, chrome), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    chrome: Chrome,
) -> impl IntoResponse {
    let (orders, error) = match state
        .backend()
        .user_orders(&user.id, ORDER_LIMIT, &user.token)
        .await
    {
        Ok(orders) => (orders, None),
        Err(e) => {
            tracing::error!("Failed to load orders: {e}");
            (Vec::new(), Some("Your orders could not be loaded".to_string()))
        }
    };

    DashboardTemplate {
        chrome,
        name: user.display_name().to_string(),
        email: user.email.clone(),
        stats: OrderStats::from_orders(&orders),
        orders: orders.iter().map(OrderView::from).collect(),
        error,
    }
}
