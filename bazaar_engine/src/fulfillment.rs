//! # Order fulfilment state machine
//!
//! Every status change to an order goes through [`plan_transition`]. The function is pure: it takes the current order
//! and a requested [`StatusChange`], checks who is asking and whether the move is legal, and returns a
//! [`TransitionPlan`] describing everything that has to be written. Database backends apply a plan inside a single
//! transaction, so an order, its items, the seller ledgers and the notification inboxes never disagree.
//!
//! ## Item transitions
//!
//! | From \ To        | Processing | Preparing | Out For Delivery | Delivered | Cancelled |
//! |------------------|------------|-----------|------------------|-----------|-----------|
//! | Processing       | -          | ✔         | admin            | admin     | ✔         |
//! | Preparing        | Err        | -         | ✔                | admin     | ✔         |
//! | Out For Delivery | Err        | Err       | -                | ✔         | ✔         |
//! | Delivered        | Err        | Err       | Err              | -         | Err       |
//! | Cancelled        | Err        | Err       | Err              | Err       | -         |
//!
//! ✔ marks the single forward step (or cancellation) available to sellers and delivery agents. Admins may skip ahead.
//!
//! ## Order status
//!
//! The order-level status is never set directly. It is derived from the item statuses by [`derive_order_status`]:
//! an order whose items are all cancelled is `Cancelled`, otherwise it sits at the least advanced status of its
//! remaining items.
//!
//! ## Settlement
//!
//! Whenever items become `Delivered`, each affected seller is credited with the sum of `unit_price * quantity` of
//! their delivered items. The unit price is the one frozen into the order at checkout, never the live product price.
//! For cash-on-delivery orders the delivering agent owes the platform the same value until an admin collects it.
use std::collections::BTreeMap;

use crate::{
    db_types::{FulfillmentStatus, Money, NewNotification, Order, OrderItem, PaymentMethod, PaymentStatus},
    traits::OrderFlowError,
};

use FulfillmentStatus::*;

impl FulfillmentStatus {
    /// Whether a seller or delivery agent may move an item from `self` to `next`. This is the single forward step, or
    /// cancellation from any non-terminal status.
    pub fn can_advance_to(&self, next: FulfillmentStatus) -> bool {
        match (self, next) {
            (from, Cancelled) => !from.is_terminal(),
            (Processing, Preparing) | (Preparing, OutForDelivery) | (OutForDelivery, Delivered) => true,
            _ => false,
        }
    }

    /// Whether an admin may force an item from `self` to `next`. Admins may skip forward steps, but can never move an
    /// item backwards or out of a terminal status.
    pub fn can_override_to(&self, next: FulfillmentStatus) -> bool {
        if self.is_terminal() || *self == next {
            return false;
        }
        match (self.stage(), next.stage()) {
            (_, None) => true,
            (Some(from), Some(to)) => to > from,
            (None, _) => false,
        }
    }
}

/// Derives the order-level status from the statuses of its items.
pub fn derive_order_status<'a, I>(statuses: I) -> FulfillmentStatus
where I: IntoIterator<Item = &'a FulfillmentStatus> {
    statuses.into_iter().filter(|s| **s != Cancelled).min_by_key(|s| s.stage()).copied().unwrap_or(Cancelled)
}

/// A request to change the fulfilment state of an order, tagged with the party that is asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// A seller confirms (`Preparing`) or rejects (`Cancelled`) one of their own items.
    SellerItem { seller_id: i64, item_id: i64, status: FulfillmentStatus },
    /// The customer cancels everything that has not left the shops yet.
    CustomerCancel { user_id: i64 },
    /// A delivery agent claims an unassigned order.
    Accept { agent_id: i64 },
    /// The assigned agent collects every prepared item.
    PickUp { agent_id: i64 },
    /// The assigned agent hands the order over to the customer.
    Deliver { agent_id: i64 },
    /// An admin forces every item that can legally get there to `status`.
    AdminOverride { status: FulfillmentStatus },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub seller_id: i64,
    pub amount: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CashDue {
    pub delivery_boy_id: i64,
    pub amount: Money,
}

/// Everything a backend must write, atomically, to carry out a [`StatusChange`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPlan {
    pub item_updates: Vec<(i64, FulfillmentStatus)>,
    /// The derived order status after the item updates are applied.
    pub order_status: FulfillmentStatus,
    pub assign_agent: Option<i64>,
    pub settlements: Vec<Settlement>,
    pub cash_due: Option<CashDue>,
    pub mark_paid: bool,
    pub notifications: Vec<NewNotification>,
}

impl TransitionPlan {
    fn new(order: &Order, item_updates: Vec<(i64, FulfillmentStatus)>) -> Self {
        let order_status = status_after(order, &item_updates);
        Self {
            item_updates,
            order_status,
            assign_agent: None,
            settlements: Vec::new(),
            cash_due: None,
            mark_paid: false,
            notifications: Vec::new(),
        }
    }

    pub fn settled_amount(&self) -> Money {
        self.settlements.iter().map(|s| s.amount).sum()
    }
}

/// Checks a requested change against the transition rules and the caller's rights, and works out its side effects.
pub fn plan_transition(order: &Order, change: &StatusChange) -> Result<TransitionPlan, OrderFlowError> {
    let mut plan = match *change {
        StatusChange::SellerItem { seller_id, item_id, status } => plan_seller_item(order, seller_id, item_id, status)?,
        StatusChange::CustomerCancel { user_id } => plan_customer_cancel(order, user_id)?,
        StatusChange::Accept { agent_id } => plan_accept(order, agent_id)?,
        StatusChange::PickUp { agent_id } => plan_pick_up(order, agent_id)?,
        StatusChange::Deliver { agent_id } => plan_deliver(order, agent_id)?,
        StatusChange::AdminOverride { status } => plan_admin_override(order, status)?,
    };
    add_settlement(order, &mut plan);
    Ok(plan)
}

fn plan_seller_item(
    order: &Order,
    seller_id: i64,
    item_id: i64,
    status: FulfillmentStatus,
) -> Result<TransitionPlan, OrderFlowError> {
    let item = find_item(order, item_id)?;
    if item.seller_id != seller_id {
        return Err(OrderFlowError::Forbidden(format!("Item {item_id} of order {} is not yours", order.code)));
    }
    if !matches!(status, Preparing | Cancelled) {
        return Err(OrderFlowError::Forbidden("Sellers can only mark items as Preparing or Cancelled".into()));
    }
    if item.status == status {
        return Err(OrderFlowError::NoOp);
    }
    // Once an item has left the shop, the seller no longer controls it
    if !item.status.can_advance_to(status) || item.status == OutForDelivery {
        return Err(OrderFlowError::InvalidTransition { from: item.status, to: status });
    }
    if status == Preparing && !order.is_payable_on_delivery_or_paid() {
        return Err(OrderFlowError::NotPayable(format!("Order {} has not been paid for yet", order.code)));
    }
    let mut plan = TransitionPlan::new(order, vec![(item_id, status)]);
    let message = match status {
        Cancelled => format!("{} in your order {} was cancelled by the shop", item.product_name, order.code),
        _ => format!("{} in your order {} is being prepared", item.product_name, order.code),
    };
    plan.notifications.push(NewNotification::for_order(order.user_id, &order.code, message));
    Ok(plan)
}

fn plan_customer_cancel(order: &Order, user_id: i64) -> Result<TransitionPlan, OrderFlowError> {
    if order.user_id != user_id {
        return Err(OrderFlowError::Forbidden(format!("Order {} is not yours", order.code)));
    }
    if let Some(item) = order.items.iter().find(|i| matches!(i.status, OutForDelivery | Delivered)) {
        return Err(OrderFlowError::InvalidTransition { from: item.status, to: Cancelled });
    }
    let updates = cancellable_items(order);
    if updates.is_empty() {
        return Err(OrderFlowError::InvalidTransition { from: order.delivery_status, to: Cancelled });
    }
    let mut plan = TransitionPlan::new(order, updates);
    plan.notifications.push(NewNotification::for_order(
        order.user_id,
        &order.code,
        format!("Your order {} has been cancelled", order.code),
    ));
    for seller_id in affected_sellers(order, &plan.item_updates) {
        plan.notifications.push(NewNotification::for_order(
            seller_id,
            &order.code,
            format!("Order {} was cancelled by the customer", order.code),
        ));
    }
    if let Some(agent) = order.delivery_boy_id {
        plan.notifications.push(NewNotification::for_order(
            agent,
            &order.code,
            format!("Order {} was cancelled by the customer", order.code),
        ));
    }
    Ok(plan)
}

fn plan_accept(order: &Order, agent_id: i64) -> Result<TransitionPlan, OrderFlowError> {
    match order.delivery_boy_id {
        Some(id) if id == agent_id => return Err(OrderFlowError::NoOp),
        Some(_) => return Err(OrderFlowError::AlreadyAssigned(order.code.clone())),
        None => {},
    }
    if order.delivery_status.is_terminal() || !order.is_payable_on_delivery_or_paid() {
        return Err(OrderFlowError::NotDeliverable(order.code.clone()));
    }
    let mut plan = TransitionPlan::new(order, Vec::new());
    plan.assign_agent = Some(agent_id);
    plan.notifications.push(NewNotification::for_order(
        order.user_id,
        &order.code,
        format!("A delivery partner has been assigned to your order {}", order.code),
    ));
    Ok(plan)
}

fn plan_pick_up(order: &Order, agent_id: i64) -> Result<TransitionPlan, OrderFlowError> {
    check_assigned_agent(order, agent_id)?;
    let updates = advance_all(order, Preparing, OutForDelivery)?;
    let mut plan = TransitionPlan::new(order, updates);
    plan.notifications.push(NewNotification::for_order(
        order.user_id,
        &order.code,
        format!("Your order {} is out for delivery", order.code),
    ));
    for seller_id in affected_sellers(order, &plan.item_updates) {
        plan.notifications.push(NewNotification::for_order(
            seller_id,
            &order.code,
            format!("Order {} has been picked up", order.code),
        ));
    }
    Ok(plan)
}

fn plan_deliver(order: &Order, agent_id: i64) -> Result<TransitionPlan, OrderFlowError> {
    check_assigned_agent(order, agent_id)?;
    let updates = advance_all(order, OutForDelivery, Delivered)?;
    let mut plan = TransitionPlan::new(order, updates);
    plan.notifications.push(NewNotification::for_order(
        order.user_id,
        &order.code,
        format!("Your order {} has been delivered", order.code),
    ));
    Ok(plan)
}

fn plan_admin_override(order: &Order, status: FulfillmentStatus) -> Result<TransitionPlan, OrderFlowError> {
    let updates = order
        .items
        .iter()
        .filter(|i| i.status.can_override_to(status))
        .map(|i| (i.id, status))
        .collect::<Vec<_>>();
    if updates.is_empty() {
        return if order.items.iter().all(|i| i.status == status || i.status.is_terminal()) {
            Err(OrderFlowError::NoOp)
        } else {
            Err(OrderFlowError::InvalidTransition { from: order.delivery_status, to: status })
        };
    }
    let mut plan = TransitionPlan::new(order, updates);
    plan.notifications.push(NewNotification::for_order(
        order.user_id,
        &order.code,
        format!("Your order {} is now {}", order.code, plan.order_status),
    ));
    Ok(plan)
}

/// Credits sellers for items that become `Delivered` in this plan, and works out cash owed by the agent for
/// cash-on-delivery orders.
fn add_settlement(order: &Order, plan: &mut TransitionPlan) {
    let mut per_seller = BTreeMap::<i64, Money>::new();
    for (item_id, status) in &plan.item_updates {
        if *status != Delivered {
            continue;
        }
        if let Some(item) = order.items.iter().find(|i| i.id == *item_id) {
            let total = per_seller.entry(item.seller_id).or_default();
            *total = *total + item.line_total();
        }
    }
    if per_seller.is_empty() {
        return;
    }
    for (seller_id, amount) in &per_seller {
        plan.notifications.push(NewNotification::for_order(
            *seller_id,
            &order.code,
            format!("Order {} was delivered. {amount} has been added to your sales", order.code),
        ));
    }
    plan.settlements = per_seller.into_iter().map(|(seller_id, amount)| Settlement { seller_id, amount }).collect();
    let cod_unpaid =
        order.payment_method == PaymentMethod::CashOnDelivery && order.payment_status != PaymentStatus::Paid;
    if cod_unpaid {
        let amount = plan.settled_amount();
        plan.cash_due = order.delivery_boy_id.map(|delivery_boy_id| CashDue { delivery_boy_id, amount });
        plan.mark_paid = plan.order_status == Delivered;
    }
}

fn find_item(order: &Order, item_id: i64) -> Result<&OrderItem, OrderFlowError> {
    order.items.iter().find(|i| i.id == item_id).ok_or(OrderFlowError::ItemNotFound(item_id))
}

fn check_assigned_agent(order: &Order, agent_id: i64) -> Result<(), OrderFlowError> {
    match order.delivery_boy_id {
        Some(id) if id == agent_id => Ok(()),
        _ => Err(OrderFlowError::Forbidden(format!("Order {} is not assigned to you", order.code))),
    }
}

fn cancellable_items(order: &Order) -> Vec<(i64, FulfillmentStatus)> {
    order.items.iter().filter(|i| i.status.can_advance_to(Cancelled)).map(|i| (i.id, Cancelled)).collect()
}

/// Moves every live item from `from` to `to`. Fails if any live item is somewhere else.
fn advance_all(
    order: &Order,
    from: FulfillmentStatus,
    to: FulfillmentStatus,
) -> Result<Vec<(i64, FulfillmentStatus)>, OrderFlowError> {
    let live = order.items.iter().filter(|i| i.status != Cancelled).collect::<Vec<_>>();
    if live.is_empty() {
        return Err(OrderFlowError::NotDeliverable(order.code.clone()));
    }
    let not_ready = live
        .iter()
        .filter(|i| i.status != from)
        .map(|i| format!("{} is {}", i.product_name, i.status))
        .collect::<Vec<_>>();
    if !not_ready.is_empty() {
        return Err(OrderFlowError::ItemsNotReady(not_ready.join(", ")));
    }
    Ok(live.iter().map(|i| (i.id, to)).collect())
}

fn affected_sellers(order: &Order, updates: &[(i64, FulfillmentStatus)]) -> Vec<i64> {
    let mut sellers = order
        .items
        .iter()
        .filter(|i| updates.iter().any(|(id, _)| *id == i.id))
        .map(|i| i.seller_id)
        .collect::<Vec<_>>();
    sellers.sort_unstable();
    sellers.dedup();
    sellers
}

fn status_after(order: &Order, updates: &[(i64, FulfillmentStatus)]) -> FulfillmentStatus {
    let statuses = order
        .items
        .iter()
        .map(|i| updates.iter().find(|(id, _)| *id == i.id).map(|(_, s)| *s).unwrap_or(i.status))
        .collect::<Vec<_>>();
    derive_order_status(&statuses)
}
