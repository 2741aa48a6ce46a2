use crate::{
    db_types::{Channel, NewOrder, Order, OrderCode, PaymentStatus},
    fulfillment::StatusChange,
    order_objects::{OrderChanged, OrderQueryFilter},
    traits::OrderFlowError,
};

/// Order persistence and the fulfilment flow.
///
/// Implementations must run every method that writes more than one row inside a single transaction.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Stores a new order built by [`crate::checkout::build_order`] and, in the same transaction,
    /// * inserts every order item with status `Processing`,
    /// * clears the customer's cart for the order's channel,
    /// * notifies the customer and every distinct seller in the order.
    ///
    /// Fails if the order code is already taken, so that callers can retry with a fresh code.
    async fn place_order(&self, order: NewOrder) -> Result<Order, OrderFlowError>;

    async fn fetch_order_by_code(&self, code: &OrderCode) -> Result<Option<Order>, OrderFlowError>;

    /// Orders placed by the user, newest first.
    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderFlowError>;

    /// Orders containing at least one item sold by the seller, newest first. The full order is returned, but callers
    /// that show it to the seller should filter the items with [`Order::items_for_seller`].
    async fn fetch_orders_for_seller(&self, seller_id: i64) -> Result<Vec<Order>, OrderFlowError>;

    /// Orders assigned to the delivery agent, newest first.
    async fn fetch_orders_for_agent(&self, agent_id: i64) -> Result<Vec<Order>, OrderFlowError>;

    /// Orders that no agent has accepted yet, that are not finished, and that are either paid for or cash on delivery.
    /// Oldest first.
    async fn fetch_pending_deliveries(&self, channel: Option<Channel>) -> Result<Vec<Order>, OrderFlowError>;

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError>;

    /// Loads the order, plans the change with [`crate::fulfillment::plan_transition`] and writes the plan atomically:
    /// item statuses, the derived order status, agent assignment, sales history, cash ledger, payment status and
    /// notifications.
    ///
    /// Accepting an order additionally requires the agent to exist and be available.
    async fn apply_status_change(&self, code: &OrderCode, change: StatusChange)
        -> Result<OrderChanged, OrderFlowError>;

    /// Records the id of the payment-gateway order created for this order.
    async fn set_gateway_order(&self, code: &OrderCode, gateway_order_id: &str) -> Result<Order, OrderFlowError>;

    async fn fetch_order_by_gateway_order(&self, gateway_order_id: &str) -> Result<Option<Order>, OrderFlowError>;

    /// Sets the payment status of the order. When the order becomes `Paid`, `payment_id` is stored and every seller in
    /// the order is told they can start preparing it. A `Paid` order is never changed; it is returned as it is.
    async fn mark_payment(
        &self,
        code: &OrderCode,
        status: PaymentStatus,
        payment_id: Option<&str>,
    ) -> Result<Order, OrderFlowError>;
}
