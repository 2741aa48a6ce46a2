use sqlx::SqliteConnection;

use crate::db_types::{NewNotification, Notification};

pub async fn insert_notification(
    notification: NewNotification,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO notifications (recipient_id, message, order_code) VALUES ($1, $2, $3)")
        .bind(notification.recipient_id)
        .bind(notification.message)
        .bind(notification.order_code)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn insert_notifications(
    notifications: Vec<NewNotification>,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    for notification in notifications {
        insert_notification(notification, conn).await?;
    }
    Ok(())
}

pub async fn fetch_notifications(
    user_id: i64,
    unread_only: bool,
    conn: &mut SqliteConnection,
) -> Result<Vec<Notification>, sqlx::Error> {
    let q = if unread_only {
        "SELECT * FROM notifications WHERE recipient_id = $1 AND NOT is_read ORDER BY created_at DESC, id DESC"
    } else {
        "SELECT * FROM notifications WHERE recipient_id = $1 ORDER BY created_at DESC, id DESC"
    };
    sqlx::query_as(q).bind(user_id).fetch_all(conn).await
}

pub async fn mark_read(
    user_id: i64,
    notification_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Notification>, sqlx::Error> {
    sqlx::query_as("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND recipient_id = $2 RETURNING *")
        .bind(notification_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await
}

pub async fn mark_all_read(user_id: i64, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE recipient_id = $1 AND NOT is_read")
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
