use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::db_types::OtpRecord;

pub async fn upsert_otp(
    phone: &str,
    code: &str,
    expires_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO otps (phone, code, attempts, expires_at) VALUES ($1, $2, 0, $3)
            ON CONFLICT (phone) DO UPDATE SET code = excluded.code, attempts = 0, expires_at = excluded.expires_at
        "#,
    )
    .bind(phone)
    .bind(code)
    .bind(expires_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_otp(phone: &str, conn: &mut SqliteConnection) -> Result<Option<OtpRecord>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM otps WHERE phone = $1").bind(phone).fetch_optional(conn).await
}

/// Returns the new attempt count, or `None` if there is no code for the phone number.
pub async fn increment_attempts(phone: &str, conn: &mut SqliteConnection) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar("UPDATE otps SET attempts = attempts + 1 WHERE phone = $1 RETURNING attempts")
        .bind(phone)
        .fetch_optional(conn)
        .await
}

pub async fn delete_otp(phone: &str, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM otps WHERE phone = $1").bind(phone).execute(conn).await?;
    Ok(())
}
