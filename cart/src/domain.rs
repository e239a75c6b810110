#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CartItem {
    pub product_id: String,
    pub quantity: i32,
}

impl CartItem {
    pub fn new(product_id: impl Into<String>, quantity: i32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// A user's cart. Items keep insertion order and hold at most one entry per product.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cart {
    pub user_id: String,
    pub items: Vec<CartItem>,
}

impl Cart {
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            items: Vec::new(),
        }
    }

    pub fn with_items(user_id: impl Into<String>, items: Vec<CartItem>) -> Self {
        Self {
            user_id: user_id.into(),
            items,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn quantity_of(&self, product_id: &str) -> Option<i32> {
        self.items
            .iter()
            .find(|item| item.product_id == product_id)
            .map(|item| item.quantity)
    }

    /// Add `quantity` of `product_id`, incrementing an existing line or appending a new one.
    ///
    /// Returns `None` when the cumulative quantity would overflow; the cart is left untouched.
    pub fn merge(&mut self, product_id: &str, quantity: i32) -> Option<i32> {
        if quantity == 0 {
            return self.quantity_of(product_id).or(Some(0));
        }

        match self
            .items
            .iter_mut()
            .find(|item| item.product_id == product_id)
        {
            Some(item) => {
                item.quantity = item.quantity.checked_add(quantity)?;
                Some(item.quantity)
            }
            None => {
                self.items.push(CartItem::new(product_id, quantity));
                Some(quantity)
            }
        }
    }
}
