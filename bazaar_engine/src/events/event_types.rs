use serde::{Deserialize, Serialize};

use crate::db_types::{FulfillmentStatus, Order};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlacedEvent {
    pub order: Order,
}

impl OrderPlacedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Raised whenever a status change is applied, even if only item statuses or the assigned agent changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    pub old_status: FulfillmentStatus,
    pub order: Order,
}

impl OrderStatusChangedEvent {
    pub fn new(old_status: FulfillmentStatus, order: Order) -> Self {
        Self { old_status, order }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentVerifiedEvent {
    pub order: Order,
    pub payment_id: String,
}

impl PaymentVerifiedEvent {
    pub fn new(order: Order, payment_id: String) -> Self {
        Self { order, payment_id }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    OrderPlaced(OrderPlacedEvent),
    OrderStatusChanged(OrderStatusChangedEvent),
    PaymentVerified(PaymentVerifiedEvent),
}
