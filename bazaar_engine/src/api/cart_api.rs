use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{is_valid_quantity, Cart, Channel},
    traits::{CartManagement, OrderFlowError},
};

/// Per-user, per-channel carts.
pub struct CartApi<B> {
    db: B,
}

impl<B: Debug> Debug for CartApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CartApi ({:?})", self.db)
    }
}

impl<B> CartApi<B>
where B: CartManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn cart(&self, user_id: i64, channel: Channel) -> Result<Cart, OrderFlowError> {
        self.db.fetch_cart(user_id, channel).await
    }

    /// Adds `quantity` units of a product to the cart, on top of whatever is already there.
    pub async fn add_item(
        &self,
        user_id: i64,
        channel: Channel,
        product_id: i64,
        quantity: i64,
    ) -> Result<Cart, OrderFlowError> {
        if !is_valid_quantity(quantity) {
            return Err(OrderFlowError::InvalidQuantity(quantity));
        }
        trace!("🛒️ Adding {quantity} of product #{product_id} to the {channel} cart of user #{user_id}");
        self.db.add_cart_item(user_id, channel, product_id, quantity).await
    }

    /// Sets the quantity of a product in the cart. A quantity of zero removes the line.
    pub async fn set_quantity(
        &self,
        user_id: i64,
        channel: Channel,
        product_id: i64,
        quantity: i64,
    ) -> Result<Cart, OrderFlowError> {
        match quantity {
            0 => self.db.remove_cart_item(user_id, channel, product_id).await,
            q if !is_valid_quantity(q) => Err(OrderFlowError::InvalidQuantity(q)),
            q => self.db.upsert_cart_item(user_id, channel, product_id, q).await,
        }
    }

    pub async fn remove_item(&self, user_id: i64, channel: Channel, product_id: i64) -> Result<Cart, OrderFlowError> {
        self.db.remove_cart_item(user_id, channel, product_id).await
    }

    pub async fn clear(&self, user_id: i64, channel: Channel) -> Result<(), OrderFlowError> {
        debug!("🛒️ Clearing the {channel} cart of user #{user_id}");
        self.db.clear_cart(user_id, channel).await
    }
}
