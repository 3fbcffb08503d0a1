//! Where cart lines are persisted.
//!
//! Anonymous visitors keep their cart under a session key; signed-in users
//! keep it in the backend `cart_items` collection. [`CartBackend`] picks the
//! store from the [`SessionKind`].

use std::future::Future;

use madio_core::{CartItemId, ProductId, UserId};
use secrecy::SecretString;
use tower_sessions::Session;
use tracing::warn;

use super::CartError;
use super::model::{CartChange, CartLine};
use crate::backend::{BackendClient, BackendError, Product};
use crate::models::{CurrentUser, session_keys};

/// Persistence for cart lines.
pub trait CartStore {
    /// Read all stored lines.
    fn load(&self) -> impl Future<Output = Result<Vec<CartLine>, CartError>> + Send;

    /// Persist one change. `lines` is the cart after the change.
    ///
    /// Returns the backend record id when an upsert created or located one.
    fn apply(
        &self,
        lines: &[CartLine],
        change: &CartChange,
    ) -> impl Future<Output = Result<Option<CartItemId>, CartError>> + Send;
}

/// Lookup of current product data.
pub trait ProductSource {
    /// The product, or `None` if it no longer exists.
    fn current_product(
        &self,
        id: &ProductId,
    ) -> impl Future<Output = Result<Option<Product>, CartError>> + Send;
}

impl ProductSource for BackendClient {
    async fn current_product(&self, id: &ProductId) -> Result<Option<Product>, CartError> {
        match self.product(id).await {
            Ok(product) => Ok(Some(product)),
            Err(BackendError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// Session kind
// =============================================================================

/// Whether the visitor is signed in.
#[derive(Debug, Clone)]
pub enum SessionKind {
    Anonymous,
    Authenticated(CurrentUser),
}

impl SessionKind {
    #[must_use]
    pub fn from_user(user: Option<CurrentUser>) -> Self {
        user.map_or(Self::Anonymous, Self::Authenticated)
    }
}

// =============================================================================
// Guest store
// =============================================================================

/// Cart of an anonymous visitor, kept in the session.
#[derive(Clone)]
pub struct GuestStore {
    session: Session,
}

impl GuestStore {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }
}

impl CartStore for GuestStore {
    async fn load(&self) -> Result<Vec<CartLine>, CartError> {
        Ok(self
            .session
            .get::<Vec<CartLine>>(session_keys::GUEST_CART)
            .await?
            .unwrap_or_default())
    }

    async fn apply(
        &self,
        lines: &[CartLine],
        change: &CartChange,
    ) -> Result<Option<CartItemId>, CartError> {
        match change {
            CartChange::Clear(_) => {
                self.session.remove_value(session_keys::GUEST_CART).await?;
            }
            CartChange::Upsert(_) | CartChange::Remove(_) => {
                self.session.insert(session_keys::GUEST_CART, lines).await?;
            }
        }
        Ok(None)
    }
}

// =============================================================================
// Account store
// =============================================================================

/// Cart of a signed-in user, kept in the backend.
#[derive(Clone)]
pub struct AccountStore {
    client: BackendClient,
    user: UserId,
    token: SecretString,
}

impl AccountStore {
    #[must_use]
    pub fn new(client: BackendClient, user: &CurrentUser) -> Self {
        Self {
            client,
            user: user.id.clone(),
            token: user.token.clone(),
        }
    }

    /// The record id of a line, looked up when the line has none yet.
    async fn locate(&self, line: &CartLine) -> Result<Option<CartItemId>, CartError> {
        if let Some(id) = &line.record_id {
            return Ok(Some(id.clone()));
        }
        match self
            .client
            .find_cart_item(&self.user, line.product_id(), &self.token)
            .await
        {
            Ok(record) => Ok(Some(record.id)),
            Err(BackendError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl CartStore for AccountStore {
    async fn load(&self) -> Result<Vec<CartLine>, CartError> {
        let records = self.client.cart_items(&self.user, &self.token).await?;
        Ok(records
            .into_iter()
            .filter_map(|record| match record.expand.product {
                Some(product) => Some(CartLine {
                    product,
                    quantity: record.quantity,
                    record_id: Some(record.id),
                }),
                None => {
                    warn!(cart_item_id = %record.id, product_id = %record.product, "Cart line references a missing product");
                    None
                }
            })
            .collect())
    }

    async fn apply(
        &self,
        _lines: &[CartLine],
        change: &CartChange,
    ) -> Result<Option<CartItemId>, CartError> {
        match change {
            CartChange::Upsert(line) => {
                let record = match self.locate(line).await? {
                    Some(id) => {
                        self.client
                            .update_cart_item(&id, line.quantity, &self.token)
                            .await?
                    }
                    None => {
                        self.client
                            .create_cart_item(&self.user, line.product_id(), line.quantity, &self.token)
                            .await?
                    }
                };
                Ok(Some(record.id))
            }
            CartChange::Remove(line) => {
                if let Some(id) = self.locate(line).await? {
                    self.client.delete_cart_item(&id, &self.token).await?;
                }
                Ok(None)
            }
            CartChange::Clear(_) => {
                let records = self.client.cart_items(&self.user, &self.token).await?;
                let mut first_error = None;
                for record in records {
                    if let Err(e) = self.client.delete_cart_item(&record.id, &self.token).await {
                        warn!(cart_item_id = %record.id, error = %e, "Failed to delete cart line");
                        first_error.get_or_insert(e);
                    }
                }
                first_error.map_or(Ok(None), |e| Err(e.into()))
            }
        }
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// The store for the current visitor.
#[derive(Clone)]
pub enum CartBackend {
    Guest(GuestStore),
    Account(AccountStore),
}

impl CartBackend {
    /// Pick the store for a session.
    #[must_use]
    pub fn for_session(kind: &SessionKind, session: &Session, client: &BackendClient) -> Self {
        match kind {
            SessionKind::Anonymous => Self::Guest(GuestStore::new(session.clone())),
            SessionKind::Authenticated(user) => {
                Self::Account(AccountStore::new(client.clone(), user))
            }
        }
    }
}

impl CartStore for CartBackend {
    async fn load(&self) -> Result<Vec<CartLine>, CartError> {
        match self {
            Self::Guest(store) => store.load().await,
            Self::Account(store) => store.load().await,
        }
    }

    async fn apply(
        &self,
        lines: &[CartLine],
        change: &CartChange,
    ) -> Result<Option<CartItemId>, CartError> {
        match self {
            Self::Guest(store) => store.apply(lines, change).await,
            Self::Account(store) => store.apply(lines, change).await,
        }
    }
}
