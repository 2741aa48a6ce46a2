use log::*;
use sqlx::{QueryBuilder, SqliteConnection};

use super::{is_unique_violation, like_pattern};
use crate::{
    db_types::{Channel, NewProduct, NewShop, Product, ProductUpdate, Shop, ShopUpdate},
    traits::CatalogError,
};

//--------------------------------------        Shops         ---------------------------------------------------------

pub async fn insert_shop(seller_id: i64, shop: NewShop, conn: &mut SqliteConnection) -> Result<Shop, CatalogError> {
    let result = sqlx::query_as(
        r#"
            INSERT INTO shops (seller_id, name, description, channel, address)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(seller_id)
    .bind(shop.name)
    .bind(shop.description)
    .bind(shop.channel)
    .bind(shop.address)
    .fetch_one(conn)
    .await;
    match result {
        Ok(shop) => Ok(shop),
        Err(e) if is_unique_violation(&e) => Err(CatalogError::ShopAlreadyExists(seller_id)),
        Err(e) => Err(e.into()),
    }
}

pub async fn update_shop(
    seller_id: i64,
    update: ShopUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Shop>, sqlx::Error> {
    let mut builder = QueryBuilder::new("UPDATE shops SET updated_at = CURRENT_TIMESTAMP");
    if let Some(name) = update.name {
        builder.push(", name = ");
        builder.push_bind(name);
    }
    if let Some(description) = update.description {
        builder.push(", description = ");
        builder.push_bind(description);
    }
    if let Some(address) = update.address {
        builder.push(", address = ");
        builder.push_bind(address);
    }
    builder.push(" WHERE seller_id = ");
    builder.push_bind(seller_id);
    builder.push(" RETURNING *");
    builder.build_query_as::<Shop>().fetch_optional(conn).await
}

pub async fn set_shop_open(
    seller_id: i64,
    is_open: bool,
    conn: &mut SqliteConnection,
) -> Result<Option<Shop>, sqlx::Error> {
    sqlx::query_as("UPDATE shops SET is_open = $1, updated_at = CURRENT_TIMESTAMP WHERE seller_id = $2 RETURNING *")
        .bind(is_open)
        .bind(seller_id)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_shop(shop_id: i64, conn: &mut SqliteConnection) -> Result<Option<Shop>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM shops WHERE id = $1").bind(shop_id).fetch_optional(conn).await
}

pub async fn fetch_shop_for_seller(seller_id: i64, conn: &mut SqliteConnection) -> Result<Option<Shop>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM shops WHERE seller_id = $1").bind(seller_id).fetch_optional(conn).await
}

pub async fn list_shops(channel: Option<Channel>, conn: &mut SqliteConnection) -> Result<Vec<Shop>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM shops");
    if let Some(channel) = channel {
        builder.push(" WHERE channel = ");
        builder.push_bind(channel);
    }
    builder.push(" ORDER BY is_open DESC, name ASC");
    builder.build_query_as::<Shop>().fetch_all(conn).await
}

//--------------------------------------       Products       ---------------------------------------------------------

/// Adds a product to `shop`. The product takes its seller and channel from the shop.
pub async fn insert_product(
    shop: &Shop,
    product: NewProduct,
    conn: &mut SqliteConnection,
) -> Result<Product, sqlx::Error> {
    let product: Product = sqlx::query_as(
        r#"
            INSERT INTO products (shop_id, seller_id, name, description, channel, price, image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(shop.id)
    .bind(shop.seller_id)
    .bind(product.name)
    .bind(product.description)
    .bind(shop.channel)
    .bind(product.price)
    .bind(product.image_url)
    .fetch_one(conn)
    .await?;
    debug!("🛒️ Product #{} ({}) added to shop #{}", product.id, product.name, shop.id);
    Ok(product)
}

pub async fn update_product(
    product_id: i64,
    update: ProductUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Product>, sqlx::Error> {
    let mut builder = QueryBuilder::new("UPDATE products SET updated_at = CURRENT_TIMESTAMP");
    if let Some(name) = update.name {
        builder.push(", name = ");
        builder.push_bind(name);
    }
    if let Some(description) = update.description {
        builder.push(", description = ");
        builder.push_bind(description);
    }
    if let Some(price) = update.price {
        builder.push(", price = ");
        builder.push_bind(price);
    }
    if let Some(is_available) = update.is_available {
        builder.push(", is_available = ");
        builder.push_bind(is_available);
    }
    if let Some(image_url) = update.image_url {
        builder.push(", image_url = ");
        builder.push_bind(image_url);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(product_id);
    builder.push(" RETURNING *");
    builder.build_query_as::<Product>().fetch_optional(conn).await
}

pub async fn delete_product(product_id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1").bind(product_id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}

pub async fn fetch_product(product_id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(product_id).fetch_optional(conn).await
}

pub async fn list_products_for_shop(
    shop_id: i64,
    available_only: bool,
    conn: &mut SqliteConnection,
) -> Result<Vec<Product>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM products WHERE shop_id = ");
    builder.push_bind(shop_id);
    if available_only {
        builder.push(" AND is_available");
    }
    builder.push(" ORDER BY name ASC");
    builder.build_query_as::<Product>().fetch_all(conn).await
}

pub async fn search_products(
    query: &str,
    channel: Option<Channel>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Product>, sqlx::Error> {
    let pattern = like_pattern(query.trim());
    let mut builder = QueryBuilder::new(
        "SELECT products.* FROM products JOIN shops ON shops.id = products.shop_id WHERE products.is_available AND \
         shops.is_open AND (products.name LIKE ",
    );
    builder.push_bind(pattern.clone());
    builder.push(" ESCAPE '\\' OR products.description LIKE ");
    builder.push_bind(pattern);
    builder.push(" ESCAPE '\\')");
    if let Some(channel) = channel {
        builder.push(" AND products.channel = ");
        builder.push_bind(channel);
    }
    builder.push(" ORDER BY products.name ASC LIMIT 100");
    trace!("🛒️ Executing query: {}", builder.sql());
    builder.build_query_as::<Product>().fetch_all(conn).await
}
