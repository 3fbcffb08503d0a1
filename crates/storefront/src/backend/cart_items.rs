//! Persisted cart lines of signed-in users.

use madio_core::{CartItemId, ProductId, UserId};
use secrecy::SecretString;
use serde::Serialize;
use tracing::instrument;

use super::collections::CART_ITEMS;
use super::query::{Filter, ListQuery};
use super::types::CartItemRecord;
use super::{BackendClient, BackendError};

#[derive(Serialize)]
struct NewCartItem<'a> {
    user: &'a UserId,
    product: &'a ProductId,
    quantity: u32,
}

#[derive(Serialize)]
struct QuantityUpdate {
    quantity: u32,
}

impl BackendClient {
    /// All cart lines of a user with products expanded.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self, auth), fields(user_id = %user))]
    pub async fn cart_items(
        &self,
        user: &UserId,
        auth: &SecretString,
    ) -> Result<Vec<CartItemRecord>, BackendError> {
        let query = ListQuery::new()
            .filter(Filter::eq("user", user))
            .expand("product")
            .sort("created");
        self.full_list(CART_ITEMS, &query, Some(auth)).await
    }

    /// The cart line of a user for one product.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the product is not in the cart.
    #[instrument(skip(self, auth), fields(user_id = %user, product_id = %product))]
    pub async fn find_cart_item(
        &self,
        user: &UserId,
        product: &ProductId,
        auth: &SecretString,
    ) -> Result<CartItemRecord, BackendError> {
        let query =
            ListQuery::new().filter(Filter::eq("user", user).and(Filter::eq("product", product)));
        self.first(CART_ITEMS, &query, Some(auth)).await
    }

    /// Add a product line to a user's cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    #[instrument(skip(self, auth), fields(user_id = %user, product_id = %product))]
    pub async fn create_cart_item(
        &self,
        user: &UserId,
        product: &ProductId,
        quantity: u32,
        auth: &SecretString,
    ) -> Result<CartItemRecord, BackendError> {
        let body = NewCartItem {
            user,
            product,
            quantity,
        };
        self.create(CART_ITEMS, &body, Some(auth)).await
    }

    /// Set the quantity of a cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the line is missing or the write is rejected.
    #[instrument(skip(self, auth), fields(cart_item_id = %id))]
    pub async fn update_cart_item(
        &self,
        id: &CartItemId,
        quantity: u32,
        auth: &SecretString,
    ) -> Result<CartItemRecord, BackendError> {
        self.update(
            CART_ITEMS,
            id.as_str(),
            &QuantityUpdate { quantity },
            Some(auth),
        )
        .await
    }

    /// Remove a cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the line is missing or the delete is rejected.
    pub async fn delete_cart_item(
        &self,
        id: &CartItemId,
        auth: &SecretString,
    ) -> Result<(), BackendError> {
        self.delete(CART_ITEMS, id.as_str(), Some(auth)).await
    }
}
