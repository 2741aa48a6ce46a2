use sqlx::{FromRow, SqliteConnection};

use crate::db_types::{CartLine, Channel, Product, MAX_CART_QUANTITY};

#[derive(FromRow)]
struct CartLineRow {
    #[sqlx(flatten)]
    product: Product,
    shop_open: bool,
    quantity: i64,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        CartLine { product: row.product, shop_open: row.shop_open, quantity: row.quantity }
    }
}

/// The cart rows for the user and channel, joined with the current product and shop state. Oldest line first.
pub async fn fetch_cart_lines(
    user_id: i64,
    channel: Channel,
    conn: &mut SqliteConnection,
) -> Result<Vec<CartLine>, sqlx::Error> {
    let rows: Vec<CartLineRow> = sqlx::query_as(
        r#"
            SELECT products.*, shops.is_open AS shop_open, cart_items.quantity AS quantity
            FROM cart_items
                JOIN products ON products.id = cart_items.product_id
                JOIN shops ON shops.id = products.shop_id
            WHERE cart_items.user_id = $1 AND cart_items.channel = $2
            ORDER BY cart_items.id ASC
        "#,
    )
    .bind(user_id)
    .bind(channel)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(CartLine::from).collect())
}

pub async fn upsert_cart_item(
    user_id: i64,
    channel: Channel,
    product_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO cart_items (user_id, channel, product_id, quantity) VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, channel, product_id) DO UPDATE SET quantity = excluded.quantity
        "#,
    )
    .bind(user_id)
    .bind(channel)
    .bind(product_id)
    .bind(quantity)
    .execute(conn)
    .await?;
    Ok(())
}

/// Increments the line for the product, creating it if needed. Nothing is written, and `false` is returned, if the
/// product does not exist, is unavailable, belongs to another channel, or the line would exceed `MAX_CART_QUANTITY`.
pub async fn add_cart_item(
    user_id: i64,
    channel: Channel,
    product_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            INSERT INTO cart_items (user_id, channel, product_id, quantity)
                SELECT $1, $2, id, $4 FROM products WHERE id = $3 AND channel = $2 AND is_available AND $4 <= $5
            ON CONFLICT (user_id, channel, product_id) DO UPDATE SET quantity = cart_items.quantity + excluded.quantity
                WHERE cart_items.quantity + excluded.quantity <= $5
        "#,
    )
    .bind(user_id)
    .bind(channel)
    .bind(product_id)
    .bind(quantity)
    .bind(MAX_CART_QUANTITY)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn remove_cart_item(
    user_id: i64,
    channel: Channel,
    product_id: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND channel = $2 AND product_id = $3")
        .bind(user_id)
        .bind(channel)
        .bind(product_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn clear_cart(user_id: i64, channel: Channel, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND channel = $2")
        .bind(user_id)
        .bind(channel)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
