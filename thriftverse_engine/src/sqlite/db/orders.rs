use log::debug;
use sqlx::{types::Json, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderStatusType, TransactionId},
    traits::{InsertOrderResult, MarketplaceError},
};

/// Inserts the order, treating a unique violation on `transaction_uuid` as the idempotency signal: some other call
/// (concurrent or earlier) has already materialized this transaction, so the existing order is fetched and returned.
pub async fn idempotent_insert(
    order: NewOrder,
    conn: &mut SqliteConnection,
) -> Result<InsertOrderResult, MarketplaceError> {
    let txid = order.transaction_uuid.clone();
    match insert_order(order, &mut *conn).await {
        Ok(order) => {
            debug!("🗃️ Order {} inserted with id {} for transaction [{txid}]", order.order_code, order.id);
            Ok(InsertOrderResult::Inserted(order))
        },
        Err(MarketplaceError::DuplicateTransaction(_)) => {
            let existing = fetch_order_by_transaction_id(&txid, conn)
                .await?
                .ok_or_else(|| MarketplaceError::OrderNotFound(txid.to_string()))?;
            debug!("🗃️ Transaction [{txid}] already has order {}; returning it", existing.order_code);
            Ok(InsertOrderResult::AlreadyExists(existing))
        },
        Err(e) => Err(e),
    }
}

async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, MarketplaceError> {
    let result: Result<Order, sqlx::Error> = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_code,
                seller_id,
                product_id,
                quantity,
                buyer_email,
                buyer_name,
                shipping_address,
                transaction_code,
                transaction_uuid,
                amount,
                shipping_fee,
                payment_channel,
                sellers_earning,
                platform_earnings,
                buyer_notes
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *;
        "#,
    )
    .bind(order.order_code)
    .bind(order.seller_id)
    .bind(order.product_id)
    .bind(order.quantity)
    .bind(order.buyer_email)
    .bind(order.buyer_name)
    .bind(Json(order.shipping_address))
    .bind(order.transaction_code)
    .bind(order.transaction_uuid.clone())
    .bind(order.amount)
    .bind(order.shipping_fee)
    .bind(order.payment_channel)
    .bind(order.sellers_earning)
    .bind(order.platform_earnings)
    .bind(order.buyer_notes)
    .fetch_one(conn)
    .await;
    match result {
        Ok(order) => Ok(order),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(MarketplaceError::DuplicateTransaction(order.transaction_uuid))
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_order_by_transaction_id(
    txid: &TransactionId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, MarketplaceError> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE transaction_uuid = $1")
        .bind(txid.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_order_by_code(
    order_code: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, MarketplaceError> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_code = $1").bind(order_code).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, MarketplaceError> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

/// Forward-only status update. The current status is read inside the caller's transaction, so a racing update
/// cannot sneak a terminal order back to `Pending`.
pub async fn update_order_status(
    id: i64,
    status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Order, MarketplaceError> {
    let current = fetch_order_by_id(id, &mut *conn)
        .await?
        .ok_or_else(|| MarketplaceError::OrderNotFound(format!("#{id}")))?;
    if !current.status.can_transition_to(status) {
        return Err(MarketplaceError::IllegalStatusChange(format!(
            "order {} cannot move from {} to {status}",
            current.order_code, current.status
        )));
    }
    let order: Order =
        sqlx::query_as("UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
            .bind(status)
            .bind(id)
            .fetch_one(conn)
            .await?;
    Ok(order)
}
