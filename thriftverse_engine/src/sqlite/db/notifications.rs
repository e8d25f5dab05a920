use sqlx::SqliteConnection;

use crate::{
    db_types::{NewNotification, Notification},
    traits::MarketplaceError,
};

pub async fn insert_notification(
    note: NewNotification,
    conn: &mut SqliteConnection,
) -> Result<i64, MarketplaceError> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO notifications (seller_id, order_id, title, body) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(note.seller_id)
    .bind(note.order_id)
    .bind(note.title)
    .bind(note.body)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

/// A seller's in-app notifications, newest first. This feeds the seller app's notification pane.
pub async fn fetch_notifications(
    seller_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Notification>, MarketplaceError> {
    let notes = sqlx::query_as("SELECT * FROM notifications WHERE seller_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(seller_id)
        .fetch_all(conn)
        .await?;
    Ok(notes)
}
