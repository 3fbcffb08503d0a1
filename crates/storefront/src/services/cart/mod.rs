//! Cart service.
//!
//! Keeps a quantity-bounded list of products for the current visitor,
//! anonymous or signed in, and folds an anonymous cart into the account cart
//! once per login.
//!
//! The in-memory state is cached in the session under the `cart` key. When
//! that key is missing (first visit, or right after login/logout) the cart is
//! loaded from the visitor's store; for a signed-in user that load is where
//! the merge happens.

mod error;
mod model;
mod store;
mod sync;

pub use error::CartError;
pub use model::{Cart, CartChange, CartLine};
pub use store::{AccountStore, CartBackend, CartStore, GuestStore, ProductSource, SessionKind};
pub use sync::{LoadOutcome, load_anonymous, load_authenticated, persist};

#[cfg(test)]
pub(crate) use model::tests as tests_support;

use madio_core::ProductId;
use tower_sessions::Session;
use tracing::instrument;

use crate::backend::BackendClient;
use crate::models::{CurrentUser, session_keys};

/// Cart state after a mutation.
#[derive(Debug)]
pub struct CartUpdate {
    pub cart: Cart,
    /// Whether the store accepted the write.
    pub persisted: bool,
}

/// Cart operations for one request.
pub struct CartService {
    session: Session,
    client: BackendClient,
    kind: SessionKind,
    store: CartBackend,
}

impl CartService {
    /// Create the service for the visitor behind `session`.
    #[must_use]
    pub fn new(session: Session, client: BackendClient, user: Option<CurrentUser>) -> Self {
        let kind = SessionKind::from_user(user);
        let store = CartBackend::for_session(&kind, &session, &client);
        Self {
            session,
            client,
            kind,
            store,
        }
    }

    /// Discard the cached cart so the next access reloads (and merges).
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn reset(session: &Session) -> Result<(), tower_sessions::session::Error> {
        session.remove_value(session_keys::CART).await?;
        Ok(())
    }

    /// The current cart, loading it on first access.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be read or written.
    #[instrument(skip(self))]
    pub async fn cart(&self) -> Result<Cart, CartError> {
        if let Some(cart) = self.session.get::<Cart>(session_keys::CART).await? {
            return Ok(cart);
        }

        let cart = match &self.kind {
            SessionKind::Anonymous => load_anonymous(&self.store).await,
            SessionKind::Authenticated(_) => {
                let guest = GuestStore::new(self.session.clone());
                load_authenticated(&self.store, &guest, &self.client)
                    .await
                    .cart
            }
        };

        self.save(&cart).await?;
        Ok(cart)
    }

    /// Add units of a product, clamped to its current stock.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` for unknown products and
    /// `CartError::OutOfStock` for sold-out ones.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add(&self, product_id: &ProductId, quantity: u32) -> Result<CartUpdate, CartError> {
        let product = self
            .client
            .current_product(product_id)
            .await?
            .ok_or_else(|| CartError::ProductNotFound(product_id.clone()))?;

        let mut cart = self.cart().await?;
        let change = cart.add(product, quantity)?;
        self.commit(cart, change, Some(product_id)).await
    }

    /// Set a line's quantity; zero or less removes the line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotInCart` if the product has no line and
    /// `CartError::OutOfStock` if it is sold out.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn set_quantity(
        &self,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<CartUpdate, CartError> {
        let mut cart = self.cart().await?;
        let change = cart.set_quantity(product_id, quantity)?;
        self.commit(cart, change, Some(product_id)).await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotInCart` if the product has no line.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove(&self, product_id: &ProductId) -> Result<CartUpdate, CartError> {
        let mut cart = self.cart().await?;
        let change = cart.remove(product_id)?;
        self.commit(cart, change, None).await
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be read or written.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<CartUpdate, CartError> {
        let mut cart = self.cart().await?;
        let change = cart.clear();
        self.commit(cart, change, None).await
    }

    /// Persist a change, then cache the new state whatever the outcome.
    async fn commit(
        &self,
        mut cart: Cart,
        change: CartChange,
        product_id: Option<&ProductId>,
    ) -> Result<CartUpdate, CartError> {
        let persisted = persist(&mut cart, &self.store, change, product_id).await;
        self.save(&cart).await?;
        Ok(CartUpdate { cart, persisted })
    }

    async fn save(&self, cart: &Cart) -> Result<(), CartError> {
        self.session.insert(session_keys::CART, cart).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::model::tests::line;
    use super::*;
    use crate::config::BackendConfig;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn service(session: &Session) -> CartService {
        let client = BackendClient::new(&BackendConfig::default()).unwrap();
        CartService::new(session.clone(), client, None)
    }

    #[tokio::test]
    async fn test_first_access_reads_guest_cart() {
        let session = session();
        session
            .insert(session_keys::GUEST_CART, vec![line("A", 5, 2)])
            .await
            .unwrap();

        let cart = service(&session).cart().await.unwrap();
        assert_eq!(cart.total_items(), 2);

        // Cached from now on.
        let cached: Option<Cart> = session.get(session_keys::CART).await.unwrap();
        assert!(cached.is_some());
    }

    #[tokio::test]
    async fn test_guest_mutations_overwrite_local_store() {
        let session = session();
        session
            .insert(session_keys::GUEST_CART, vec![line("A", 5, 2), line("B", 5, 1)])
            .await
            .unwrap();
        let service = service(&session);

        let update = service
            .set_quantity(&ProductId::new("A"), 9)
            .await
            .unwrap();
        assert!(update.persisted);
        assert_eq!(update.cart.total_items(), 6);

        let stored: Vec<CartLine> = session
            .get(session_keys::GUEST_CART)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored.first().unwrap().quantity, 5);

        service.remove(&ProductId::new("B")).await.unwrap();
        let stored: Vec<CartLine> = session
            .get(session_keys::GUEST_CART)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn test_guest_clear_removes_local_store() {
        let session = session();
        session
            .insert(session_keys::GUEST_CART, vec![line("A", 5, 2)])
            .await
            .unwrap();
        let service = service(&session);

        let update = service.clear().await.unwrap();
        assert!(update.cart.is_empty());
        let stored: Option<Vec<CartLine>> = session.get(session_keys::GUEST_CART).await.unwrap();
        assert!(stored.is_none());
    }

    #[tokio::test]
    async fn test_reset_discards_cached_state() {
        let session = session();
        let service = service(&session);
        service.cart().await.unwrap();

        CartService::reset(&session).await.unwrap();
        let cached: Option<Cart> = session.get(session_keys::CART).await.unwrap();
        assert!(cached.is_none());
    }

    #[tokio::test]
    async fn test_remove_missing_line() {
        let session = session();
        let err = service(&session)
            .remove(&ProductId::new("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::NotInCart(_)));
    }
}
