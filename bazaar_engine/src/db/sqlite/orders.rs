use chrono::{DateTime, Utc};
use log::*;
use sqlx::{types::Json, FromRow, QueryBuilder, SqliteConnection};

use super::{is_unique_violation, ledgers, notifications};
use crate::{
    db_types::{
        AddressSnapshot,
        Channel,
        FulfillmentStatus,
        NewNotification,
        NewOrder,
        Order,
        OrderCode,
        OrderItem,
        PaymentMethod,
        PaymentStatus,
    },
    fulfillment::TransitionPlan,
    order_objects::OrderQueryFilter,
    traits::OrderFlowError,
};

/// An `orders` row, before its items are attached.
#[derive(Debug, Clone, FromRow)]
struct OrderRow {
    id: i64,
    code: OrderCode,
    user_id: i64,
    channel: Channel,
    amount: i64,
    shipping_address: Json<AddressSnapshot>,
    delivery_status: FulfillmentStatus,
    payment_status: PaymentStatus,
    payment_method: PaymentMethod,
    gateway_order_id: Option<String>,
    gateway_payment_id: Option<String>,
    delivery_boy_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        Order {
            id: self.id,
            code: self.code,
            user_id: self.user_id,
            channel: self.channel,
            amount: self.amount.into(),
            shipping_address: self.shipping_address.0,
            delivery_status: self.delivery_status,
            payment_status: self.payment_status,
            payment_method: self.payment_method,
            gateway_order_id: self.gateway_order_id,
            gateway_payment_id: self.gateway_payment_id,
            delivery_boy_id: self.delivery_boy_id,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

async fn fetch_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id ASC").bind(order_id).fetch_all(conn).await
}

async fn hydrate(row: OrderRow, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    let items = fetch_items(row.id, conn).await?;
    Ok(row.into_order(items))
}

async fn hydrate_all(rows: Vec<OrderRow>, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut orders = Vec::with_capacity(rows.len());
    for row in rows {
        orders.push(hydrate(row, conn).await?);
    }
    Ok(orders)
}

/// Inserts the order and its items. This is not atomic. Callers embed it in a transaction together with the cart and
/// notification writes.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, OrderFlowError> {
    let code = order.code.clone();
    let result = sqlx::query_as::<_, OrderRow>(
        r#"
            INSERT INTO orders (code, user_id, channel, amount, shipping_address, payment_method)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(order.code.as_str())
    .bind(order.user_id)
    .bind(order.channel)
    .bind(order.amount)
    .bind(Json(&order.shipping_address))
    .bind(order.payment_method)
    .fetch_one(&mut *conn)
    .await;
    let row = match result {
        Ok(row) => row,
        Err(e) if is_unique_violation(&e) => return Err(OrderFlowError::DuplicateOrderCode(code)),
        Err(e) => return Err(e.into()),
    };
    for item in order.items {
        sqlx::query(
            r#"
                INSERT INTO order_items (order_id, product_id, seller_id, product_name, unit_price, quantity)
                VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(row.id)
        .bind(item.product_id)
        .bind(item.seller_id)
        .bind(item.product_name)
        .bind(item.unit_price)
        .bind(item.quantity)
        .execute(&mut *conn)
        .await?;
    }
    let order = hydrate(row, conn).await?;
    debug!("📝️ Order {} inserted with id {} and {} items", order.code, order.id, order.items.len());
    Ok(order)
}

pub async fn fetch_order_by_code(code: &OrderCode, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let row: Option<OrderRow> =
        sqlx::query_as("SELECT * FROM orders WHERE code = $1").bind(code.as_str()).fetch_optional(&mut *conn).await?;
    match row {
        Some(row) => Ok(Some(hydrate(row, conn).await?)),
        None => Ok(None),
    }
}

pub async fn fetch_order_by_gateway_order(
    gateway_order_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let row: Option<OrderRow> = sqlx::query_as("SELECT * FROM orders WHERE gateway_order_id = $1")
        .bind(gateway_order_id)
        .fetch_optional(&mut *conn)
        .await?;
    match row {
        Some(row) => Ok(Some(hydrate(row, conn).await?)),
        None => Ok(None),
    }
}

/// Fetches orders according to the criteria in the `OrderQueryFilter`, newest first.
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(code) = query.code {
        where_clause.push("code = ");
        where_clause.push_bind_unseparated(code.0);
    }
    if let Some(user_id) = query.user_id {
        where_clause.push("user_id = ");
        where_clause.push_bind_unseparated(user_id);
    }
    if let Some(seller_id) = query.seller_id {
        where_clause.push("id IN (SELECT order_id FROM order_items WHERE seller_id = ");
        where_clause.push_bind_unseparated(seller_id);
        where_clause.push_unseparated(")");
    }
    if let Some(agent) = query.delivery_boy_id {
        where_clause.push("delivery_boy_id = ");
        where_clause.push_bind_unseparated(agent);
    }
    if let Some(channel) = query.channel {
        where_clause.push("channel = ");
        where_clause.push_bind_unseparated(channel);
    }
    if let Some(status) = query.payment_status {
        where_clause.push("payment_status = ");
        where_clause.push_bind_unseparated(status);
    }
    if let Some(method) = query.payment_method {
        where_clause.push("payment_method = ");
        where_clause.push_bind_unseparated(method);
    }
    if let Some(statuses) = query.status.filter(|s| !s.is_empty()) {
        where_clause.push("delivery_status IN (");
        for (i, status) in statuses.into_iter().enumerate() {
            if i > 0 {
                where_clause.push_unseparated(", ");
            }
            where_clause.push_bind_unseparated(status);
        }
        where_clause.push_unseparated(")");
    }
    if let Some(since) = query.since {
        where_clause.push("datetime(created_at) >= datetime(");
        where_clause.push_bind_unseparated(since);
        where_clause.push_unseparated(")");
    }
    if let Some(until) = query.until {
        where_clause.push("datetime(created_at) <= datetime(");
        where_clause.push_bind_unseparated(until);
        where_clause.push_unseparated(")");
    }
    builder.push(" ORDER BY created_at DESC, id DESC");

    trace!("📝️ Executing query: {}", builder.sql());
    let rows = builder.build_query_as::<OrderRow>().fetch_all(&mut *conn).await?;
    trace!("📝️ Result of search_orders: {}", rows.len());
    hydrate_all(rows, conn).await
}

/// Unassigned, unfinished orders that can be handed to an agent, oldest first.
pub async fn fetch_pending_deliveries(
    channel: Option<Channel>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new(
        "SELECT * FROM orders WHERE delivery_boy_id IS NULL AND delivery_status NOT IN ('Delivered', 'Cancelled') AND \
         (payment_status = 'Paid' OR payment_method = 'CashOnDelivery')",
    );
    if let Some(channel) = channel {
        builder.push(" AND channel = ");
        builder.push_bind(channel);
    }
    builder.push(" ORDER BY created_at ASC, id ASC");
    let rows = builder.build_query_as::<OrderRow>().fetch_all(&mut *conn).await?;
    hydrate_all(rows, conn).await
}

pub async fn set_gateway_order(
    order_id: i64,
    gateway_order_id: &str,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET gateway_order_id = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
        .bind(gateway_order_id)
        .bind(order_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Paid orders are final. Returns false, without writing, if the order does not exist or is already paid.
pub async fn set_payment_status(
    order_id: i64,
    status: PaymentStatus,
    payment_id: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE orders SET payment_status = $1, gateway_payment_id = COALESCE($2, gateway_payment_id), updated_at = \
         CURRENT_TIMESTAMP WHERE id = $3 AND payment_status != $4",
    )
    .bind(status)
    .bind(payment_id)
    .bind(order_id)
    .bind(PaymentStatus::Paid)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Writes everything in a [`TransitionPlan`]. Callers must run this inside a transaction, since the plan was made
/// from a snapshot of `order` that must not change underneath it.
pub async fn apply_transition_plan(
    order: &Order,
    plan: TransitionPlan,
    conn: &mut SqliteConnection,
) -> Result<(), OrderFlowError> {
    if let Some(agent_id) = plan.assign_agent {
        let result = sqlx::query(
            "UPDATE orders SET delivery_boy_id = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND delivery_boy_id \
             IS NULL",
        )
        .bind(agent_id)
        .bind(order.id)
        .execute(&mut *conn)
        .await?;
        if result.rows_affected() == 0 {
            return Err(OrderFlowError::AlreadyAssigned(order.code.clone()));
        }
        debug!("🚚️ Order {} assigned to delivery agent #{agent_id}", order.code);
    }
    for &(item_id, status) in &plan.item_updates {
        sqlx::query("UPDATE order_items SET status = $1 WHERE id = $2 AND order_id = $3")
            .bind(status)
            .bind(item_id)
            .bind(order.id)
            .execute(&mut *conn)
            .await?;
    }
    sqlx::query("UPDATE orders SET delivery_status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
        .bind(plan.order_status)
        .bind(order.id)
        .execute(&mut *conn)
        .await?;
    if plan.order_status != order.delivery_status {
        debug!("📝️ Order {} moved from {} to {}", order.code, order.delivery_status, plan.order_status);
    }
    for settlement in &plan.settlements {
        ledgers::insert_sales_entry(settlement.seller_id, &order.code, settlement.amount, conn).await?;
    }
    if let Some(cash) = plan.cash_due {
        ledgers::insert_cash_collection(cash.delivery_boy_id, &order.code, cash.amount, conn).await?;
    }
    if plan.mark_paid {
        set_payment_status(order.id, PaymentStatus::Paid, None, conn).await?;
        debug!("💵️ Cash on delivery order {} marked as paid", order.code);
    }
    notifications::insert_notifications(plan.notifications, conn).await?;
    Ok(())
}

/// Notifications sent when an order is placed: one to the customer and one to every seller in the order.
pub fn order_placed_notifications(order: &Order) -> Vec<NewNotification> {
    let mut result = vec![NewNotification::for_order(
        order.user_id,
        &order.code,
        format!("Your order {} for {} has been placed", order.code, order.amount),
    )];
    for seller_id in order.notified_sellers() {
        let count = order.items_for_seller(seller_id).count();
        result.push(NewNotification::for_order(
            seller_id,
            &order.code,
            format!("New order {}: {count} item(s) to prepare", order.code),
        ));
    }
    result
}
