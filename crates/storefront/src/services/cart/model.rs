//! In-memory cart state.
//!
//! Every quantity is clamped to `[1, product.stock]` here, so the stores only
//! ever persist valid lines.

use madio_core::{CartItemId, Price, ProductId};
use serde::{Deserialize, Serialize};

use super::CartError;
use crate::backend::Product;

/// One product in the cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    /// Product snapshot taken when the line was last touched.
    pub product: Product,
    pub quantity: u32,
    /// Backend record of the line, once it has been persisted remotely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<CartItemId>,
}

impl CartLine {
    #[must_use]
    pub fn total(&self) -> Price {
        self.product.price * self.quantity
    }

    #[must_use]
    pub const fn product_id(&self) -> &ProductId {
        &self.product.id
    }
}

/// The write a mutation requires from the store.
#[derive(Debug, Clone)]
pub enum CartChange {
    /// A line was added or its quantity changed (state after the change).
    Upsert(CartLine),
    /// A line was removed.
    Remove(CartLine),
    /// Every line was removed.
    Clear(Vec<CartLine>),
}

/// A visitor's cart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

/// Clamp a requested quantity to what can be bought.
fn clamp(quantity: u32, stock: u32) -> u32 {
    quantity.min(stock).max(1)
}

impl Cart {
    #[must_use]
    pub const fn new(lines: Vec<CartLine>) -> Self {
        Self { lines }
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of units across all lines.
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Price of all lines.
    #[must_use]
    pub fn total_price(&self) -> Price {
        self.lines.iter().map(CartLine::total).sum()
    }

    #[must_use]
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product_id() == product_id)
    }

    fn line_mut(&mut self, product_id: &ProductId) -> Option<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|line| line.product_id() == product_id)
    }

    /// Add `quantity` units of `product`, summing with an existing line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::OutOfStock` if the product has no stock.
    pub fn add(&mut self, product: Product, quantity: u32) -> Result<CartChange, CartError> {
        if !product.in_stock() {
            return Err(CartError::OutOfStock(product.name));
        }

        let line = if let Some(line) = self.line_mut(&product.id) {
            line.quantity = clamp(line.quantity.saturating_add(quantity), product.stock);
            line.product = product;
            line.clone()
        } else {
            let line = CartLine {
                quantity: clamp(quantity, product.stock),
                product,
                record_id: None,
            };
            self.lines.push(line.clone());
            line
        };

        Ok(CartChange::Upsert(line))
    }

    /// Set the quantity of a line; zero or less removes it.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotInCart` if the product has no line and
    /// `CartError::OutOfStock` if its product has no stock left, in which
    /// case the line is left untouched.
    pub fn set_quantity(
        &mut self,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<CartChange, CartError> {
        if quantity <= 0 {
            return self.remove(product_id);
        }

        let line = self
            .line_mut(product_id)
            .ok_or_else(|| CartError::NotInCart(product_id.clone()))?;
        if !line.product.in_stock() {
            return Err(CartError::OutOfStock(line.product.name.clone()));
        }
        let requested = u32::try_from(quantity).unwrap_or(u32::MAX);
        line.quantity = clamp(requested, line.product.stock);
        Ok(CartChange::Upsert(line.clone()))
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotInCart` if the product has no line.
    pub fn remove(&mut self, product_id: &ProductId) -> Result<CartChange, CartError> {
        let index = self
            .lines
            .iter()
            .position(|line| line.product_id() == product_id)
            .ok_or_else(|| CartError::NotInCart(product_id.clone()))?;
        Ok(CartChange::Remove(self.lines.remove(index)))
    }

    /// Remove every line.
    pub fn clear(&mut self) -> CartChange {
        CartChange::Clear(std::mem::take(&mut self.lines))
    }

    /// Fold an anonymous cart into this one.
    ///
    /// Each incoming line's product must carry current stock. Matching lines
    /// get the quantities summed and clamped to stock; other lines are added
    /// clamped. Incoming lines for products without stock are skipped.
    /// Returns the lines that changed, which are the ones to write back.
    pub fn merge(&mut self, incoming: Vec<CartLine>) -> Vec<CartLine> {
        let mut changed: Vec<CartLine> = Vec::new();

        for guest in incoming {
            if !guest.product.in_stock() {
                continue;
            }
            let stock = guest.product.stock;

            let line = if let Some(line) = self.line_mut(guest.product_id()) {
                line.quantity = clamp(line.quantity.saturating_add(guest.quantity), stock);
                line.product = guest.product;
                line.clone()
            } else {
                let line = CartLine {
                    quantity: clamp(guest.quantity, stock),
                    product: guest.product,
                    record_id: None,
                };
                self.lines.push(line.clone());
                line
            };

            match changed
                .iter_mut()
                .find(|c| c.product_id() == line.product_id())
            {
                Some(existing) => *existing = line,
                None => changed.push(line),
            }
        }

        changed
    }

    /// Record the backend id of a persisted line.
    pub fn set_record_id(&mut self, product_id: &ProductId, record_id: CartItemId) {
        if let Some(line) = self.line_mut(product_id) {
            line.record_id = Some(record_id);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use madio_core::CategoryId;

    use super::*;

    pub(crate) fn product(id: &str, price: u64, stock: u32) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            description: String::new(),
            price: Price::from_units(price),
            stock,
            featured: false,
            category: CategoryId::new("c1"),
            image: String::new(),
            created: String::new(),
            updated: String::new(),
            expand: crate::backend::ProductExpand::default(),
        }
    }

    pub(crate) fn line(id: &str, stock: u32, quantity: u32) -> CartLine {
        CartLine {
            product: product(id, 100, stock),
            quantity,
            record_id: None,
        }
    }

    #[test]
    fn test_add_clamps_to_stock() {
        let mut cart = Cart::default();
        cart.add(product("B", 100, 4), 10).unwrap();
        assert_eq!(cart.line(&ProductId::new("B")).unwrap().quantity, 4);
    }

    #[test]
    fn test_add_sums_existing_line() {
        let mut cart = Cart::default();
        cart.add(product("A", 100, 5), 2).unwrap();
        let change = cart.add(product("A", 100, 5), 2).unwrap();
        assert!(matches!(change, CartChange::Upsert(ref l) if l.quantity == 4));
        cart.add(product("A", 100, 5), 2).unwrap();
        assert_eq!(cart.line(&ProductId::new("A")).unwrap().quantity, 5);
        assert_eq!(cart.lines().len(), 1);
    }

    #[test]
    fn test_add_zero_quantity_adds_one() {
        let mut cart = Cart::default();
        cart.add(product("A", 100, 5), 0).unwrap();
        assert_eq!(cart.total_items(), 1);
    }

    #[test]
    fn test_add_out_of_stock() {
        let mut cart = Cart::default();
        let err = cart.add(product("A", 100, 0), 1).unwrap_err();
        assert!(matches!(err, CartError::OutOfStock(_)));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_clamps() {
        let mut cart = Cart::new(vec![line("A", 3, 1)]);
        cart.set_quantity(&ProductId::new("A"), 9).unwrap();
        assert_eq!(cart.total_items(), 3);
    }

    #[test]
    fn test_set_quantity_refused_when_sold_out() {
        let mut cart = Cart::new(vec![line("A", 0, 2)]);
        let err = cart.set_quantity(&ProductId::new("A"), 1).unwrap_err();
        assert!(matches!(err, CartError::OutOfStock(_)));
        assert_eq!(cart.line(&ProductId::new("A")).unwrap().quantity, 2);

        // Removing a sold-out line still works.
        let change = cart.set_quantity(&ProductId::new("A"), 0).unwrap();
        assert!(matches!(change, CartChange::Remove(_)));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_zero_or_negative_removes() {
        for quantity in [0, -1, -50] {
            let mut cart = Cart::new(vec![line("A", 3, 2), line("B", 3, 1)]);
            let change = cart.set_quantity(&ProductId::new("A"), quantity).unwrap();
            assert!(matches!(change, CartChange::Remove(_)));
            assert!(cart.line(&ProductId::new("A")).is_none());
            assert_eq!(cart.lines().len(), 1);
        }
    }

    #[test]
    fn test_set_quantity_missing_line() {
        let mut cart = Cart::default();
        assert!(matches!(
            cart.set_quantity(&ProductId::new("A"), 1),
            Err(CartError::NotInCart(_))
        ));
    }

    #[test]
    fn test_totals_follow_state() {
        let mut cart = Cart::default();
        cart.add(product("A", 350_000, 5), 2).unwrap();
        cart.add(product("B", 180_000, 5), 1).unwrap();
        assert_eq!(cart.total_items(), 3);
        assert_eq!(cart.total_price(), Price::from_units(880_000));

        cart.remove(&ProductId::new("A")).unwrap();
        assert_eq!(cart.total_items(), 1);
        assert_eq!(cart.total_price(), Price::from_units(180_000));

        let change = cart.clear();
        assert!(matches!(change, CartChange::Clear(ref lines) if lines.len() == 1));
        assert_eq!(cart.total_price(), Price::ZERO);
    }

    #[test]
    fn test_merge_sums_and_clamps() {
        // anonymous [{A, 3}], A.stock 5, authenticated [{A, 2}] -> {A, 5}
        let mut account = Cart::new(vec![line("A", 5, 2)]);
        let changed = account.merge(vec![line("A", 5, 3)]);
        assert_eq!(account.line(&ProductId::new("A")).unwrap().quantity, 5);
        assert_eq!(changed.len(), 1);

        let mut account = Cart::new(vec![line("A", 5, 4)]);
        account.merge(vec![line("A", 5, 4)]);
        assert_eq!(account.line(&ProductId::new("A")).unwrap().quantity, 5);
    }

    #[test]
    fn test_merge_adds_unmatched_lines_clamped() {
        let mut account = Cart::new(vec![line("A", 5, 1)]);
        let changed = account.merge(vec![line("B", 10, 2), line("C", 4, 10)]);
        assert_eq!(account.line(&ProductId::new("B")).unwrap().quantity, 2);
        assert_eq!(account.line(&ProductId::new("C")).unwrap().quantity, 4);
        assert_eq!(account.line(&ProductId::new("A")).unwrap().quantity, 1);
        assert_eq!(changed.len(), 2);
    }

    #[test]
    fn test_merge_keeps_record_id_of_existing_line() {
        let mut existing = line("A", 5, 1);
        existing.record_id = Some(CartItemId::new("r1"));
        let mut account = Cart::new(vec![existing]);
        let changed = account.merge(vec![line("A", 5, 1)]);
        assert_eq!(changed.first().unwrap().record_id, Some(CartItemId::new("r1")));
    }

    #[test]
    fn test_merge_skips_sold_out_products() {
        let mut account = Cart::default();
        let changed = account.merge(vec![line("A", 0, 2)]);
        assert!(changed.is_empty());
        assert!(account.is_empty());
    }

    #[test]
    fn test_session_roundtrip() {
        let mut cart = Cart::new(vec![line("A", 5, 2)]);
        cart.set_record_id(&ProductId::new("A"), CartItemId::new("r1"));
        let json = serde_json::to_string(&cart).unwrap();
        let parsed: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.lines().first().unwrap().record_id, Some(CartItemId::new("r1")));
        assert_eq!(parsed.total_items(), 2);
    }
}
