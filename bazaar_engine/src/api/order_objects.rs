use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Channel, FulfillmentStatus, Money, Order, OrderCode, PaymentMethod, PaymentStatus},
    fulfillment::Settlement,
    traits::AccountApiError,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub code: Option<OrderCode>,
    pub user_id: Option<i64>,
    pub seller_id: Option<i64>,
    pub delivery_boy_id: Option<i64>,
    pub channel: Option<Channel>,
    pub payment_status: Option<PaymentStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub status: Option<Vec<FulfillmentStatus>>,
}

impl OrderQueryFilter {
    pub fn since<T>(mut self, since: T) -> Result<Self, AccountApiError>
    where
        T: TryInto<DateTime<Utc>>,
        T::Error: Display,
    {
        let dt = since.try_into().map_err(|e| AccountApiError::QueryError(e.to_string()))?;
        self.since = Some(dt);
        Ok(self)
    }

    pub fn until<T>(mut self, until: T) -> Result<Self, AccountApiError>
    where
        T: TryInto<DateTime<Utc>>,
        T::Error: Display,
    {
        let dt = until.try_into().map_err(|e| AccountApiError::QueryError(e.to_string()))?;
        self.until = Some(dt);
        Ok(self)
    }

    pub fn with_code(mut self, code: OrderCode) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_seller_id(mut self, seller_id: i64) -> Self {
        self.seller_id = Some(seller_id);
        self
    }

    pub fn with_delivery_boy_id(mut self, delivery_boy_id: i64) -> Self {
        self.delivery_boy_id = Some(delivery_boy_id);
        self
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn with_payment_status(mut self, status: PaymentStatus) -> Self {
        self.payment_status = Some(status);
        self
    }

    pub fn with_payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = Some(method);
        self
    }

    pub fn with_status(mut self, status: FulfillmentStatus) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_none() &&
            self.user_id.is_none() &&
            self.seller_id.is_none() &&
            self.delivery_boy_id.is_none() &&
            self.channel.is_none() &&
            self.payment_status.is_none() &&
            self.payment_method.is_none() &&
            self.status.as_ref().map_or(true, Vec::is_empty) &&
            self.since.is_none() &&
            self.until.is_none()
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "No filters.")?;
            return Ok(());
        }
        if let Some(code) = &self.code {
            write!(f, "code: {code}. ")?;
        }
        if let Some(user_id) = &self.user_id {
            write!(f, "user_id: {user_id}. ")?;
        }
        if let Some(seller_id) = &self.seller_id {
            write!(f, "seller_id: {seller_id}. ")?;
        }
        if let Some(id) = &self.delivery_boy_id {
            write!(f, "delivery_boy_id: {id}. ")?;
        }
        if let Some(channel) = &self.channel {
            write!(f, "channel: {channel}. ")?;
        }
        if let Some(status) = &self.payment_status {
            write!(f, "payment_status: {status}. ")?;
        }
        if let Some(method) = &self.payment_method {
            write!(f, "payment_method: {method}. ")?;
        }
        if let Some(since) = &self.since {
            write!(f, "since {since}. ")?;
        }
        if let Some(until) = &self.until {
            write!(f, "until {until}. ")?;
        }
        if let Some(statuses) = &self.status {
            let statuses = statuses.iter().map(|s| s.to_string()).collect::<Vec<String>>().join(",");
            write!(f, "statuses: [{statuses}]. ")?;
        }
        Ok(())
    }
}

/// The outcome of a successful status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderChanged {
    pub old_status: FulfillmentStatus,
    pub order: Order,
    /// Seller credits written as part of this change. Empty unless items were delivered.
    pub settlements: Vec<SettlementRecord>,
}

impl OrderChanged {
    pub fn status_changed(&self) -> bool {
        self.old_status != self.order.delivery_status
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub seller_id: i64,
    pub amount: Money,
}

impl From<Settlement> for SettlementRecord {
    fn from(s: Settlement) -> Self {
        Self { seller_id: s.seller_id, amount: s.amount }
    }
}

//--------------------------------------       Reporting      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: FulfillmentStatus,
    pub count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_orders: i64,
    pub orders_by_status: Vec<StatusCount>,
    /// The value of every delivered item, at the price it was sold for.
    pub delivered_revenue: Money,
    pub customers: i64,
    pub sellers: i64,
    pub delivery_agents: i64,
    pub available_agents: i64,
    /// Cash-on-delivery money still held by delivery agents.
    pub outstanding_cash: Money,
}

/// Cash a delivery agent has collected from customers and not yet handed over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutstandingCash {
    pub delivery_boy_id: i64,
    pub name: String,
    pub phone: String,
    pub amount: Money,
    pub orders: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerEarnings {
    pub seller_id: i64,
    pub name: String,
    pub shop_name: Option<String>,
    pub total: Money,
    pub orders: i64,
}
