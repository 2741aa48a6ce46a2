use crate::{
    db_types::{Cart, Channel},
    traits::OrderFlowError,
};

/// Every user has one cart per channel.
#[allow(async_fn_in_trait)]
pub trait CartManagement {
    /// The cart joined with the current state of its products.
    async fn fetch_cart(&self, user_id: i64, channel: Channel) -> Result<Cart, OrderFlowError>;

    /// Sets the quantity of a product in the cart, adding the line if needed. The product must exist, be available and
    /// belong to `channel`.
    async fn upsert_cart_item(
        &self,
        user_id: i64,
        channel: Channel,
        product_id: i64,
        quantity: i64,
    ) -> Result<Cart, OrderFlowError>;

    /// Adds `quantity` units of a product on top of whatever the cart already holds, in a single statement. Fails with
    /// `InvalidQuantity` if the line would exceed [`crate::db_types::MAX_CART_QUANTITY`].
    async fn add_cart_item(
        &self,
        user_id: i64,
        channel: Channel,
        product_id: i64,
        quantity: i64,
    ) -> Result<Cart, OrderFlowError>;

    async fn remove_cart_item(&self, user_id: i64, channel: Channel, product_id: i64) -> Result<Cart, OrderFlowError>;

    async fn clear_cart(&self, user_id: i64, channel: Channel) -> Result<(), OrderFlowError>;
}
