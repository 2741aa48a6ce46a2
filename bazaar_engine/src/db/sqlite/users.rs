use log::*;
use sqlx::{QueryBuilder, Row, SqliteConnection};

use super::is_unique_violation;
use crate::{
    db_types::{DeliveryAgent, NewUserAccount, ProfileUpdate, Role, UserAccount},
    traits::AccountApiError,
};

pub async fn fetch_user(id: i64, conn: &mut SqliteConnection) -> Result<Option<UserAccount>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_user_by_phone(phone: &str, conn: &mut SqliteConnection) -> Result<Option<UserAccount>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE phone = $1").bind(phone).fetch_optional(conn).await
}

/// Inserts a user. This is not atomic with [`insert_delivery_agent`]; wrap both in a transaction when creating agents.
pub async fn insert_user(user: NewUserAccount, conn: &mut SqliteConnection) -> Result<UserAccount, AccountApiError> {
    let phone = user.phone.clone();
    let result = sqlx::query_as("INSERT INTO users (name, phone, email, role) VALUES ($1, $2, $3, $4) RETURNING *")
        .bind(user.name)
        .bind(user.phone)
        .bind(user.email)
        .bind(user.role)
        .fetch_one(conn)
        .await;
    match result {
        Ok(account) => Ok(account),
        Err(e) if is_unique_violation(&e) => Err(AccountApiError::AlreadyRegistered(phone)),
        Err(e) => Err(e.into()),
    }
}

pub async fn update_profile(
    id: i64,
    update: ProfileUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<UserAccount>, sqlx::Error> {
    let mut builder = QueryBuilder::new("UPDATE users SET updated_at = CURRENT_TIMESTAMP");
    if let Some(name) = update.name {
        builder.push(", name = ");
        builder.push_bind(name);
    }
    if let Some(email) = update.email {
        builder.push(", email = ");
        builder.push_bind(email);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");
    trace!("👤️ Executing query: {}", builder.sql());
    builder.build_query_as::<UserAccount>().fetch_optional(conn).await
}

pub async fn insert_delivery_agent(user_id: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO delivery_agents (user_id, is_available) VALUES ($1, FALSE) ON CONFLICT DO NOTHING")
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(())
}

const AGENT_QUERY: &str = r#"
    SELECT users.id AS user_id, users.name, users.phone, delivery_agents.is_available
    FROM delivery_agents JOIN users ON users.id = delivery_agents.user_id
"#;

pub async fn fetch_delivery_agent(
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<DeliveryAgent>, sqlx::Error> {
    let q = format!("{AGENT_QUERY} WHERE users.id = $1");
    sqlx::query_as(&q).bind(user_id).fetch_optional(conn).await
}

pub async fn fetch_delivery_agents(conn: &mut SqliteConnection) -> Result<Vec<DeliveryAgent>, sqlx::Error> {
    let q = format!("{AGENT_QUERY} ORDER BY users.name ASC");
    sqlx::query_as(&q).fetch_all(conn).await
}

pub async fn set_agent_availability(
    user_id: i64,
    is_available: bool,
    conn: &mut SqliteConnection,
) -> Result<Option<DeliveryAgent>, sqlx::Error> {
    let result = sqlx::query("UPDATE delivery_agents SET is_available = $1 WHERE user_id = $2")
        .bind(is_available)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Ok(None);
    }
    debug!("👤️ Delivery agent #{user_id} is now {}", if is_available { "available" } else { "unavailable" });
    fetch_delivery_agent(user_id, conn).await
}

pub async fn count_by_role(role: Role, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM users WHERE role = $1").bind(role).fetch_one(conn).await?;
    row.try_get("n")
}

pub async fn count_available_agents(conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM delivery_agents WHERE is_available").fetch_one(conn).await?;
    row.try_get("n")
}
