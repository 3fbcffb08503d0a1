//! Admin order management.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect},
};
use madio_core::{OrderId, OrderStatus};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{ADMIN_LIST_LIMIT, AdminOrderRow, failure_message};
use crate::backend::Order;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::Flash;
use crate::routes::{Chrome, set_flash};
use crate::state::AppState;

/// Status filter tab.
#[derive(Clone)]
pub struct StatusTab {
    /// Empty for "all".
    pub value: &'static str,
    pub label: &'static str,
    pub count: usize,
    pub active: bool,
}

/// Status choice in the per-row select.
#[derive(Clone)]
pub struct StatusChoice {
    pub value: &'static str,
    pub label: &'static str,
}

/// `?status=` narrows the table to one status.
#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    pub status: Option<String>,
}

/// Status change form data.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

/// Admin order list template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/orders.html")]
pub struct AdminOrdersTemplate {
    pub chrome: Chrome,
    pub orders: Vec<AdminOrderRow>,
    pub tabs: Vec<StatusTab>,
    pub statuses: Vec<StatusChoice>,
}

/// Tabs for "all" plus every status, with counts over `orders`.
#[must_use]
pub fn status_tabs(orders: &[Order], active: Option<OrderStatus>) -> Vec<StatusTab> {
    let mut tabs = vec![StatusTab {
        value: "",
        label: "All",
        count: orders.len(),
        active: active.is_none(),
    }];
    tabs.extend(OrderStatus::ALL.into_iter().map(|status| StatusTab {
        value: status.as_str(),
        label: status.label(),
        count: orders.iter().filter(|o| o.status == status).count(),
        active: active == Some(status),
    }));
    tabs
}

/// List the most recent orders.
#[instrument(skip(state, admin, chrome), fields(admin_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    chrome: Chrome,
    Query(query): Query<OrdersQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = state
        .backend()
        .recent_orders(ADMIN_LIST_LIMIT, &admin.token)
        .await?;
    let active = query
        .status
        .as_deref()
        .and_then(|s| s.parse::<OrderStatus>().ok());

    Ok(AdminOrdersTemplate {
        chrome,
        tabs: status_tabs(&page.items, active),
        orders: page
            .items
            .iter()
            .filter(|order| active.is_none_or(|status| order.status == status))
            .map(AdminOrderRow::from)
            .collect(),
        statuses: OrderStatus::ALL
            .into_iter()
            .map(|status| StatusChoice {
                value: status.as_str(),
                label: status.label(),
            })
            .collect(),
    })
}

/// Change an order's status.
#[instrument(skip(state, session, admin, form), fields(admin_id = %admin.id, status = %form.status))]
pub async fn update_status(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    Form(form): Form<StatusForm>,
) -> Result<Redirect, AppError> {
    let status: OrderStatus = form.status.parse().map_err(AppError::BadRequest)?;
    let id = OrderId::new(id);

    let flash = match state
        .backend()
        .set_order_status(&id, status, &admin.token)
        .await
    {
        Ok(_) => {
            tracing::info!(order_id = %id, "Order status changed");
            Flash::success(format!("Order {id} is now {}", status.label()))
        }
        Err(e) => {
            tracing::warn!("Failed to change order status: {e}");
            Flash::error(failure_message("Changing the order status", &e))
        }
    };
    set_flash(&session, flash).await;
    Ok(Redirect::to("/admin/orders"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn order(status: &str) -> Order {
        serde_json::from_value(serde_json::json!({
            "id": "o",
            "user": "u1",
            "total": 10,
            "status": status,
        }))
        .unwrap()
    }

    #[test]
    fn test_status_tabs() {
        let orders = vec![order("pending"), order("pending"), order("shipped")];
        let tabs = status_tabs(&orders, Some(OrderStatus::Pending));
        assert_eq!(tabs.len(), 6);

        let all = tabs.first().unwrap();
        assert_eq!(all.count, 3);
        assert!(!all.active);

        let pending = tabs.iter().find(|t| t.value == "pending").unwrap();
        assert_eq!(pending.count, 2);
        assert!(pending.active);

        let cancelled = tabs.iter().find(|t| t.value == "cancelled").unwrap();
        assert_eq!(cancelled.count, 0);
    }
}
