use std::fmt::Debug;

use log::*;

use crate::{
    checkout::build_order,
    db_types::{Channel, FulfillmentStatus, Order, OrderCode, PaymentMethod},
    events::{EventProducers, OrderPlacedEvent, OrderStatusChangedEvent},
    fulfillment::StatusChange,
    helpers::generate_order_code,
    order_objects::{OrderChanged, OrderQueryFilter},
    traits::{AccountManagement, CartManagement, OrderFlowError, OrderManagement},
};

/// How many fresh order codes to try before giving up on a checkout.
const MAX_CODE_ATTEMPTS: usize = 5;

/// `OrderFlowApi` is the primary API for the order lifecycle: checkout, the per-role views of orders, and every
/// fulfilment status change.
///
/// Status changes are planned by [`crate::fulfillment::plan_transition`] and written atomically by the backend. This
/// API adds the event hooks on top.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B: Debug> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi ({:?})", self.db)
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement + CartManagement + AccountManagement
{
    /// Turns the user's cart for `channel` into an order shipped to one of their saved addresses.
    ///
    /// The order, its items, the seller notifications and the emptied cart are written in one transaction. If the
    /// randomly generated order code is already taken, a new one is drawn.
    pub async fn checkout(
        &self,
        user_id: i64,
        channel: Channel,
        address_id: i64,
        method: PaymentMethod,
    ) -> Result<Order, OrderFlowError> {
        let cart = self.db.fetch_cart(user_id, channel).await?;
        let address =
            self.db.fetch_address(user_id, address_id).await?.ok_or(OrderFlowError::AddressNotFound(address_id))?;
        let mut attempts = 0;
        let order = loop {
            attempts += 1;
            let new_order = build_order(generate_order_code(), user_id, channel, &cart.lines, &address, method)?;
            match self.db.place_order(new_order).await {
                Ok(order) => break order,
                Err(OrderFlowError::DuplicateOrderCode(code)) if attempts < MAX_CODE_ATTEMPTS => {
                    warn!("🔄️📦️ Order code {code} is already taken. Drawing another one.");
                },
                Err(e) => return Err(e),
            }
        };
        info!(
            "🔄️📦️ Order {} placed by user #{user_id}: {} item(s) from {} seller(s) for {}",
            order.code,
            order.items.len(),
            order.notified_sellers().len(),
            order.amount
        );
        self.call_order_placed_hook(&order).await;
        Ok(order)
    }

    async fn call_order_placed_hook(&self, order: &Order) {
        for emitter in &self.producers.order_placed_producer {
            debug!("🔄️📦️ Notifying order placed hook subscribers");
            emitter.publish_event(OrderPlacedEvent::new(order.clone())).await;
        }
    }

    async fn call_status_changed_hook(&self, changed: &OrderChanged) {
        for emitter in &self.producers.status_changed_producer {
            debug!("🔄️🚚️ Notifying status changed hook subscribers");
            let event = OrderStatusChangedEvent::new(changed.old_status, changed.order.clone());
            emitter.publish_event(event).await;
        }
    }

    pub async fn order_by_code(&self, code: &OrderCode) -> Result<Option<Order>, OrderFlowError> {
        self.db.fetch_order_by_code(code).await
    }

    /// Fetches an order on behalf of its customer. Other users' orders are reported as missing.
    pub async fn order_for_user(&self, user_id: i64, code: &OrderCode) -> Result<Order, OrderFlowError> {
        match self.db.fetch_order_by_code(code).await? {
            Some(order) if order.user_id == user_id => Ok(order),
            _ => Err(OrderFlowError::OrderNotFound(code.clone())),
        }
    }

    pub async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderFlowError> {
        self.db.fetch_orders_for_user(user_id).await
    }

    /// Orders that contain at least one item sold by `seller_id`.
    pub async fn orders_for_seller(&self, seller_id: i64) -> Result<Vec<Order>, OrderFlowError> {
        self.db.fetch_orders_for_seller(seller_id).await
    }

    pub async fn orders_for_agent(&self, agent_id: i64) -> Result<Vec<Order>, OrderFlowError> {
        self.db.fetch_orders_for_agent(agent_id).await
    }

    /// Unassigned orders that a delivery agent could accept right now.
    pub async fn pending_deliveries(&self, channel: Option<Channel>) -> Result<Vec<Order>, OrderFlowError> {
        self.db.fetch_pending_deliveries(channel).await
    }

    pub async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError> {
        trace!("🔄️🔍️ Searching orders. {query}");
        self.db.search_orders(query).await
    }

    /// A seller confirms (`Preparing`) or cancels one of their items.
    pub async fn update_item_status(
        &self,
        seller_id: i64,
        code: &OrderCode,
        item_id: i64,
        status: FulfillmentStatus,
    ) -> Result<OrderChanged, OrderFlowError> {
        self.change_status(code, StatusChange::SellerItem { seller_id, item_id, status }).await
    }

    /// The customer cancels every item that has not left the shops yet.
    pub async fn cancel_order(&self, user_id: i64, code: &OrderCode) -> Result<OrderChanged, OrderFlowError> {
        self.change_status(code, StatusChange::CustomerCancel { user_id }).await
    }

    pub async fn accept_delivery(&self, agent_id: i64, code: &OrderCode) -> Result<OrderChanged, OrderFlowError> {
        self.change_status(code, StatusChange::Accept { agent_id }).await
    }

    pub async fn pick_up(&self, agent_id: i64, code: &OrderCode) -> Result<OrderChanged, OrderFlowError> {
        self.change_status(code, StatusChange::PickUp { agent_id }).await
    }

    /// Marks the order as delivered. This writes the seller settlements and, for cash on delivery, the cash owed by
    /// the agent.
    pub async fn deliver(&self, agent_id: i64, code: &OrderCode) -> Result<OrderChanged, OrderFlowError> {
        self.change_status(code, StatusChange::Deliver { agent_id }).await
    }

    /// Admin override. Every item that may move to `status` does; terminal items are left alone.
    pub async fn override_status(
        &self,
        code: &OrderCode,
        status: FulfillmentStatus,
    ) -> Result<OrderChanged, OrderFlowError> {
        warn!("🔄️🛠️ Admin override of order {code} to {status}");
        self.change_status(code, StatusChange::AdminOverride { status }).await
    }

    async fn change_status(&self, code: &OrderCode, change: StatusChange) -> Result<OrderChanged, OrderFlowError> {
        let changed = self.db.apply_status_change(code, change).await?;
        if changed.status_changed() {
            info!("🔄️🚚️ Order {code} is now {} (was {})", changed.order.delivery_status, changed.old_status);
        } else {
            debug!("🔄️🚚️ Order {code} updated. Status remains {}", changed.order.delivery_status);
        }
        for s in &changed.settlements {
            info!("🔄️💰️ Seller #{} credited {} for order {code}", s.seller_id, s.amount);
        }
        self.call_status_changed_hook(&changed).await;
        Ok(changed)
    }
}
