//! Order creation and history.

use madio_core::{OrderId, OrderStatus, UserId};
use secrecy::SecretString;
use serde::Serialize;
use tracing::instrument;

use super::collections::ORDERS;
use super::query::{Filter, ListQuery};
use super::types::{ListResult, NewOrder, Order};
use super::{BackendClient, BackendError};

impl BackendClient {
    /// Place an order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the order.
    #[instrument(skip(self, order, auth), fields(user_id = %order.user))]
    pub async fn create_order(
        &self,
        order: &NewOrder,
        auth: &SecretString,
    ) -> Result<Order, BackendError> {
        self.create(ORDERS, order, Some(auth)).await
    }

    /// A user's most recent orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self, auth), fields(user_id = %user))]
    pub async fn user_orders(
        &self,
        user: &UserId,
        limit: u32,
        auth: &SecretString,
    ) -> Result<Vec<Order>, BackendError> {
        let query = ListQuery::new()
            .per_page(limit)
            .filter(Filter::eq("user", user))
            .sort("-created")
            .skip_total();
        let page: ListResult<Order> = self.list(ORDERS, &query, Some(auth)).await?;
        Ok(page.items)
    }

    /// The most recent orders across all users (admin), with the customer
    /// expanded.
    ///
    /// # Errors
    ///
    /// Returns an error if the caller may not list all orders.
    pub async fn recent_orders(
        &self,
        limit: u32,
        auth: &SecretString,
    ) -> Result<ListResult<Order>, BackendError> {
        let query = ListQuery::new()
            .per_page(limit)
            .expand("user")
            .sort("-created");
        self.list(ORDERS, &query, Some(auth)).await
    }

    /// Move an order to a new status.
    ///
    /// # Errors
    ///
    /// Returns an error if the order is missing or the caller is not an admin.
    #[instrument(skip(self, auth), fields(order_id = %id, status = %status))]
    pub async fn set_order_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
        auth: &SecretString,
    ) -> Result<Order, BackendError> {
        #[derive(Serialize)]
        struct StatusUpdate {
            status: OrderStatus,
        }

        self.update(ORDERS, id.as_str(), &StatusUpdate { status }, Some(auth))
            .await
    }
}
