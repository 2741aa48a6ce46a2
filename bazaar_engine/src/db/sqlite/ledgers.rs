//! Seller sales history, the delivery agents' cash ledger, and the aggregates built on them.
use log::*;
use sqlx::{Row, SqliteConnection};

use crate::{
    db_types::{CashCollection, FulfillmentStatus, Money, OrderCode, SalesEntry},
    order_objects::{OutstandingCash, SellerEarnings, StatusCount},
};

pub async fn insert_sales_entry(
    seller_id: i64,
    code: &OrderCode,
    amount: Money,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO sales_history (seller_id, order_code, amount) VALUES ($1, $2, $3)")
        .bind(seller_id)
        .bind(code.as_str())
        .bind(amount)
        .execute(conn)
        .await?;
    trace!("💰️ {amount} credited to seller #{seller_id} for order {code}");
    Ok(())
}

pub async fn fetch_sales_history(seller_id: i64, conn: &mut SqliteConnection) -> Result<Vec<SalesEntry>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM sales_history WHERE seller_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(seller_id)
        .fetch_all(conn)
        .await
}

pub async fn insert_cash_collection(
    delivery_boy_id: i64,
    code: &OrderCode,
    amount: Money,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO cash_collections (delivery_boy_id, order_code, amount) VALUES ($1, $2, $3)")
        .bind(delivery_boy_id)
        .bind(code.as_str())
        .bind(amount)
        .execute(conn)
        .await?;
    trace!("💵️ Delivery agent #{delivery_boy_id} owes {amount} for order {code}");
    Ok(())
}

pub async fn fetch_cash_ledger(
    delivery_boy_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<CashCollection>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM cash_collections WHERE delivery_boy_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(delivery_boy_id)
        .fetch_all(conn)
        .await
}

pub async fn outstanding_cash(conn: &mut SqliteConnection) -> Result<Vec<OutstandingCash>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
            SELECT users.id AS id, users.name AS name, users.phone AS phone,
                SUM(cash_collections.amount) AS amount, COUNT(cash_collections.id) AS orders
            FROM cash_collections JOIN users ON users.id = cash_collections.delivery_boy_id
            WHERE NOT cash_collections.collected
            GROUP BY users.id
            ORDER BY amount DESC
        "#,
    )
    .fetch_all(conn)
    .await?;
    rows.iter()
        .map(|row| {
            Ok(OutstandingCash {
                delivery_boy_id: row.try_get("id")?,
                name: row.try_get("name")?,
                phone: row.try_get("phone")?,
                amount: Money::from(row.try_get::<i64, _>("amount")?),
                orders: row.try_get("orders")?,
            })
        })
        .collect()
}

pub async fn total_outstanding_cash(conn: &mut SqliteConnection) -> Result<Money, sqlx::Error> {
    let total: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(amount), 0) FROM cash_collections WHERE NOT collected")
        .fetch_one(conn)
        .await?;
    Ok(Money::from(total))
}

/// Marks the agent's outstanding entries as collected and returns their total.
pub async fn collect_cash(delivery_boy_id: i64, conn: &mut SqliteConnection) -> Result<Money, sqlx::Error> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount), 0) FROM cash_collections WHERE delivery_boy_id = $1 AND NOT collected",
    )
    .bind(delivery_boy_id)
    .fetch_one(&mut *conn)
    .await?;
    sqlx::query(
        "UPDATE cash_collections SET collected = TRUE, collected_at = CURRENT_TIMESTAMP WHERE delivery_boy_id = $1 \
         AND NOT collected",
    )
    .bind(delivery_boy_id)
    .execute(conn)
    .await?;
    Ok(Money::from(total))
}

pub async fn seller_earnings(conn: &mut SqliteConnection) -> Result<Vec<SellerEarnings>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
            SELECT users.id AS id, users.name AS name, shops.name AS shop_name,
                SUM(sales_history.amount) AS total, COUNT(DISTINCT sales_history.order_code) AS orders
            FROM sales_history
                JOIN users ON users.id = sales_history.seller_id
                LEFT JOIN shops ON shops.seller_id = users.id
            GROUP BY users.id
            ORDER BY total DESC
        "#,
    )
    .fetch_all(conn)
    .await?;
    rows.iter()
        .map(|row| {
            Ok(SellerEarnings {
                seller_id: row.try_get("id")?,
                name: row.try_get("name")?,
                shop_name: row.try_get("shop_name")?,
                total: Money::from(row.try_get::<i64, _>("total")?),
                orders: row.try_get("orders")?,
            })
        })
        .collect()
}

pub async fn orders_by_status(conn: &mut SqliteConnection) -> Result<Vec<StatusCount>, sqlx::Error> {
    let rows = sqlx::query("SELECT delivery_status, COUNT(*) AS n FROM orders GROUP BY delivery_status")
        .fetch_all(conn)
        .await?;
    let mut counts = rows
        .iter()
        .map(|row| {
            let status = row.try_get::<FulfillmentStatus, _>("delivery_status")?;
            Ok(StatusCount { status, count: row.try_get("n")? })
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()?;
    counts.sort_by_key(|c| c.status.stage().unwrap_or(u8::MAX));
    Ok(counts)
}

/// The value of every delivered item at its snapshot price.
pub async fn delivered_revenue(conn: &mut SqliteConnection) -> Result<Money, sqlx::Error> {
    let total: i64 =
        sqlx::query_scalar("SELECT COALESCE(SUM(unit_price * quantity), 0) FROM order_items WHERE status = $1")
            .bind(FulfillmentStatus::Delivered)
            .fetch_one(conn)
            .await?;
    Ok(Money::from(total))
}
