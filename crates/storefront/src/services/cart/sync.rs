//! Loading, merging and persisting cart state.
//!
//! Mutations never roll back: the in-memory cart keeps the change and the
//! caller learns from `persisted` whether the store accepted it.

use madio_core::ProductId;
use tracing::{error, info, warn};

use super::model::{Cart, CartChange, CartLine};
use super::store::{CartStore, ProductSource};

/// Result of an initial load.
#[derive(Debug)]
pub struct LoadOutcome {
    pub cart: Cart,
    /// Lines taken over from the anonymous cart.
    pub merged: usize,
    /// Whether every merge write succeeded.
    pub persisted: bool,
}

/// Initial load for an anonymous visitor: the local store as-is.
pub async fn load_anonymous<G: CartStore + Sync>(guest: &G) -> Cart {
    match guest.load().await {
        Ok(lines) => Cart::new(lines),
        Err(e) => {
            warn!(error = %e, "Failed to read stored cart, starting empty");
            Cart::default()
        }
    }
}

/// Initial load for a signed-in user.
///
/// Reads the remote cart and folds any anonymous cart into it. When the
/// remote cart cannot be read the anonymous cart is used instead and left in
/// place. Each anonymous line leaves the anonymous store as soon as its merge
/// write succeeds, so a later login only retries the lines that were not
/// saved and never counts a quantity twice.
pub async fn load_authenticated<A, G, P>(account: &A, guest: &G, products: &P) -> LoadOutcome
where
    A: CartStore + Sync,
    G: CartStore + Sync,
    P: ProductSource + Sync,
{
    let remote = match account.load().await {
        Ok(lines) => lines,
        Err(e) => {
            error!(error = %e, "Failed to load remote cart, using stored cart");
            return LoadOutcome {
                cart: load_anonymous(guest).await,
                merged: 0,
                persisted: false,
            };
        }
    };

    let mut cart = Cart::new(remote);

    let guest_lines = match guest.load().await {
        Ok(lines) => lines,
        Err(e) => {
            warn!(error = %e, "Failed to read stored cart, skipping merge");
            Vec::new()
        }
    };
    if guest_lines.is_empty() {
        return LoadOutcome {
            cart,
            merged: 0,
            persisted: true,
        };
    }

    let fresh = refresh_products(products, guest_lines).await;
    let mut pending = fresh.clone();
    let changed = cart.merge(fresh);
    let merged = changed.len();

    let mut persisted = true;
    for line in changed {
        let product_id = line.product_id().clone();
        if persist(&mut cart, account, CartChange::Upsert(line), Some(&product_id)).await {
            settle_guest_line(guest, &mut pending, &product_id).await;
        } else {
            persisted = false;
        }
    }

    if persisted {
        if let Err(e) = guest.apply(&[], &CartChange::Clear(Vec::new())).await {
            warn!(error = %e, "Failed to clear stored cart after merge");
        }
    } else {
        warn!(
            remaining = pending.len(),
            "Keeping unsaved lines in stored cart for the next login"
        );
    }

    info!(merged, persisted, "Merged stored cart into account cart");

    LoadOutcome {
        cart,
        merged,
        persisted,
    }
}

/// Drop a line that reached the account cart from the anonymous store.
async fn settle_guest_line<G: CartStore + Sync>(
    guest: &G,
    pending: &mut Vec<CartLine>,
    product_id: &ProductId,
) {
    let Some(index) = pending.iter().position(|l| l.product_id() == product_id) else {
        return;
    };
    let line = pending.remove(index);
    if let Err(e) = guest.apply(pending.as_slice(), &CartChange::Remove(line)).await {
        warn!(product_id = %product_id, error = %e, "Failed to drop merged line from stored cart");
    }
}

/// Replace each line's product snapshot with current data.
///
/// Lines whose product no longer exists are dropped; lines whose product
/// cannot be fetched keep their snapshot.
async fn refresh_products<P: ProductSource + Sync>(
    products: &P,
    lines: Vec<CartLine>,
) -> Vec<CartLine> {
    let mut fresh = Vec::with_capacity(lines.len());
    for mut line in lines {
        match products.current_product(line.product_id()).await {
            Ok(Some(product)) => {
                line.product = product;
                fresh.push(line);
            }
            Ok(None) => {
                info!(product_id = %line.product_id(), "Dropping cart line for deleted product");
            }
            Err(e) => {
                warn!(product_id = %line.product_id(), error = %e, "Using stored product data for merge");
                fresh.push(line);
            }
        }
    }
    fresh
}

/// Write one change to the store, recording any new record id.
///
/// Returns whether the write succeeded.
pub async fn persist<S: CartStore + Sync>(
    cart: &mut Cart,
    store: &S,
    change: CartChange,
    product_id: Option<&ProductId>,
) -> bool {
    match store.apply(cart.lines(), &change).await {
        Ok(record_id) => {
            if let (Some(record_id), Some(product_id)) = (record_id, product_id) {
                cart.set_record_id(product_id, record_id);
            }
            true
        }
        Err(e) => {
            error!(error = %e, "Failed to save cart change");
            false
        }
    }
}
