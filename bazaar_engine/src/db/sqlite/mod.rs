//! # SQLite backend
//!
//! The submodules hold the "low-level" SQLite interactions as plain functions that accept a `&mut SqliteConnection`.
//! Callers can pass a pooled connection, or `&mut tx` for a transaction, without any other changes. [`SqliteDatabase`]
//! composes them into the backend traits and decides where the transaction boundaries are.
use std::{env, str::FromStr, time::Duration};

use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Error as SqlxError,
    SqlitePool,
};

mod db;
mod errors;

pub mod addresses;
pub mod carts;
pub mod catalog;
pub mod ledgers;
pub mod notifications;
pub mod orders;
pub mod otp;
pub mod users;

pub use db::SqliteDatabase;
pub use errors::SqliteDatabaseError;

const SQLITE_DB_URL: &str = "sqlite://data/bazaar.db";
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

pub fn db_url() -> String {
    let result = env::var("BAZAAR_DATABASE_URL").unwrap_or_else(|_| {
        info!("BAZAAR_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let options =
        SqliteConnectOptions::from_str(url)?.create_if_missing(true).foreign_keys(true).busy_timeout(BUSY_TIMEOUT);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}

/// Escapes `%`, `_` and `\` so that user input can be used inside a `LIKE ... ESCAPE '\'` pattern.
pub(crate) fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Whether the error is a violation of a `UNIQUE` constraint.
pub(crate) fn is_unique_violation(e: &SqlxError) -> bool {
    matches!(e, SqlxError::Database(de) if de.is_unique_violation())
}
