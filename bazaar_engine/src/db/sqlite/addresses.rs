//! Address book queries.
//!
//! A user has at most one default address. The partial unique index `addresses_one_default` enforces this in the
//! schema, so the default flag must always be cleared before it is set on another row. Callers run these functions
//! inside a transaction.
use log::*;
use sqlx::{Row, SqliteConnection};

use crate::db_types::{Address, NewAddress};

pub async fn fetch_addresses(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Address>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM addresses WHERE user_id = $1 ORDER BY is_default DESC, created_at ASC, id ASC")
        .bind(user_id)
        .fetch_all(conn)
        .await
}

pub async fn fetch_address(
    user_id: i64,
    address_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Address>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM addresses WHERE id = $1 AND user_id = $2")
        .bind(address_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await
}

async fn count_addresses(user_id: i64, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let row =
        sqlx::query("SELECT COUNT(*) AS n FROM addresses WHERE user_id = $1").bind(user_id).fetch_one(conn).await?;
    row.try_get("n")
}

async fn clear_default(user_id: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE addresses SET is_default = FALSE WHERE user_id = $1 AND is_default")
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(())
}

async fn mark_default(user_id: i64, address_id: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE addresses SET is_default = TRUE WHERE id = $1 AND user_id = $2")
        .bind(address_id)
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Inserts an address. The user's first address is made the default whatever the request says.
pub async fn insert_address(
    user_id: i64,
    address: NewAddress,
    conn: &mut SqliteConnection,
) -> Result<Address, sqlx::Error> {
    let is_default = address.is_default || count_addresses(user_id, conn).await? == 0;
    if is_default {
        clear_default(user_id, conn).await?;
    }
    let address: Address = sqlx::query_as(
        r#"
            INSERT INTO addresses (user_id, label, line1, line2, city, state, pincode, phone, is_default)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *;
        "#,
    )
    .bind(user_id)
    .bind(address.label)
    .bind(address.line1)
    .bind(address.line2)
    .bind(address.city)
    .bind(address.state)
    .bind(address.pincode)
    .bind(address.phone)
    .bind(is_default)
    .fetch_one(conn)
    .await?;
    debug!("🏠️ Address #{} added for user #{user_id} (default: {is_default})", address.id);
    Ok(address)
}

/// Replaces the address fields. `is_default = true` makes this the default address. `false` leaves the flag alone,
/// since a user with addresses always keeps a default.
pub async fn update_address(
    user_id: i64,
    address_id: i64,
    address: NewAddress,
    conn: &mut SqliteConnection,
) -> Result<Option<Address>, sqlx::Error> {
    if fetch_address(user_id, address_id, conn).await?.is_none() {
        return Ok(None);
    }
    if address.is_default {
        clear_default(user_id, conn).await?;
        mark_default(user_id, address_id, conn).await?;
    }
    sqlx::query_as(
        r#"
            UPDATE addresses SET label = $1, line1 = $2, line2 = $3, city = $4, state = $5, pincode = $6, phone = $7
            WHERE id = $8 AND user_id = $9
            RETURNING *;
        "#,
    )
    .bind(address.label)
    .bind(address.line1)
    .bind(address.line2)
    .bind(address.city)
    .bind(address.state)
    .bind(address.pincode)
    .bind(address.phone)
    .bind(address_id)
    .bind(user_id)
    .fetch_optional(conn)
    .await
}

/// Deletes the address, promoting the oldest remaining address if the default was deleted. Returns `false` if the
/// address does not exist.
pub async fn delete_address(user_id: i64, address_id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let Some(address) = fetch_address(user_id, address_id, conn).await? else {
        return Ok(false);
    };
    sqlx::query("DELETE FROM addresses WHERE id = $1").bind(address_id).execute(&mut *conn).await?;
    if address.is_default {
        let next: Option<i64> =
            sqlx::query_scalar("SELECT id FROM addresses WHERE user_id = $1 ORDER BY created_at ASC, id ASC LIMIT 1")
                .bind(user_id)
                .fetch_optional(&mut *conn)
                .await?;
        if let Some(id) = next {
            mark_default(user_id, id, conn).await?;
            debug!("🏠️ Address #{id} promoted to default for user #{user_id}");
        }
    }
    Ok(true)
}

pub async fn set_default_address(
    user_id: i64,
    address_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Address>, sqlx::Error> {
    if fetch_address(user_id, address_id, conn).await?.is_none() {
        return Ok(None);
    }
    clear_default(user_id, conn).await?;
    mark_default(user_id, address_id, conn).await?;
    fetch_address(user_id, address_id, conn).await
}
