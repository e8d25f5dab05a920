use chrono::{DateTime, Utc};
use log::debug;
use sqlx::{types::Json, FromRow, SqliteConnection};
use tv_common::Rupees;

use crate::{
    db_types::{
        MetadataState,
        NewPaymentMetadata,
        PaymentChannel,
        PaymentMetadata,
        ShippingAddress,
        ShippingOption,
        TransactionId,
    },
    traits::MarketplaceError,
};

/// The raw row shape. The tagged [`MetadataState`] is reconstructed from the `state` text column plus the nullable
/// `transaction_code`/`order_id` columns; rows where the columns contradict the tag are rejected as corrupt.
#[derive(Debug, Clone, FromRow)]
struct MetadataRow {
    id: i64,
    transaction_id: TransactionId,
    product_id: String,
    seller_id: String,
    buyer_email: String,
    buyer_name: String,
    shipping_address: Json<ShippingAddress>,
    amount: Rupees,
    quantity: i64,
    shipping_option: ShippingOption,
    payment_channel: PaymentChannel,
    buyer_notes: Option<String>,
    state: String,
    transaction_code: Option<String>,
    order_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MetadataRow> for PaymentMetadata {
    type Error = MarketplaceError;

    fn try_from(row: MetadataRow) -> Result<Self, Self::Error> {
        let corrupt = |msg: &str| MarketplaceError::MetadataCorrupt(row.transaction_id.clone(), msg.to_string());
        let state = match row.state.as_str() {
            "Staged" => MetadataState::Staged,
            "Verified" => MetadataState::Verified {
                transaction_code: row.transaction_code.clone().ok_or_else(|| corrupt("Verified without a code"))?,
            },
            "Processed" => MetadataState::Processed {
                transaction_code: row.transaction_code.clone().ok_or_else(|| corrupt("Processed without a code"))?,
                order_id: row.order_id.ok_or_else(|| corrupt("Processed without an order id"))?,
            },
            other => return Err(corrupt(&format!("unknown state tag {other}"))),
        };
        Ok(PaymentMetadata {
            id: row.id,
            transaction_id: row.transaction_id,
            product_id: row.product_id,
            seller_id: row.seller_id,
            buyer_email: row.buyer_email,
            buyer_name: row.buyer_name,
            shipping_address: row.shipping_address.0,
            amount: row.amount,
            quantity: row.quantity,
            shipping_option: row.shipping_option,
            payment_channel: row.payment_channel,
            buyer_notes: row.buyer_notes,
            state,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Insert-only staging. A transaction id collision surfaces as `DuplicateTransaction` rather than an overwrite.
pub async fn insert_metadata(
    meta: NewPaymentMetadata,
    conn: &mut SqliteConnection,
) -> Result<PaymentMetadata, MarketplaceError> {
    let txid = meta.transaction_id.clone();
    let row: Result<MetadataRow, sqlx::Error> = sqlx::query_as(
        r#"
            INSERT INTO payment_metadata (
                transaction_id,
                product_id,
                seller_id,
                buyer_email,
                buyer_name,
                shipping_address,
                amount,
                quantity,
                shipping_option,
                payment_channel,
                buyer_notes
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *;
        "#,
    )
    .bind(meta.transaction_id)
    .bind(meta.product_id)
    .bind(meta.seller_id)
    .bind(meta.buyer_email)
    .bind(meta.buyer_name)
    .bind(Json(meta.shipping_address))
    .bind(meta.amount)
    .bind(meta.quantity)
    .bind(meta.shipping_option)
    .bind(meta.payment_channel)
    .bind(meta.buyer_notes)
    .fetch_one(conn)
    .await;
    match row {
        Ok(row) => {
            debug!("🗃️ Payment metadata staged for transaction [{}]", row.transaction_id);
            row.try_into()
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(MarketplaceError::DuplicateTransaction(txid))
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_metadata(
    txid: &TransactionId,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentMetadata>, MarketplaceError> {
    let row: Option<MetadataRow> = sqlx::query_as("SELECT * FROM payment_metadata WHERE transaction_id = $1")
        .bind(txid.as_str())
        .fetch_optional(conn)
        .await?;
    row.map(PaymentMetadata::try_from).transpose()
}

/// One-time `Staged → Verified` transition. Already-verified and processed rows are left untouched, so gateway
/// callback retries land here harmlessly.
pub async fn attach_gateway_reference(
    txid: &TransactionId,
    transaction_code: &str,
    conn: &mut SqliteConnection,
) -> Result<PaymentMetadata, MarketplaceError> {
    let updated = sqlx::query(
        "UPDATE payment_metadata SET state = 'Verified', transaction_code = $2, updated_at = CURRENT_TIMESTAMP \
         WHERE transaction_id = $1 AND state = 'Staged'",
    )
    .bind(txid.as_str())
    .bind(transaction_code)
    .execute(&mut *conn)
    .await?;
    if updated.rows_affected() > 0 {
        debug!("🗃️ Gateway reference {transaction_code} attached to transaction [{txid}]");
    }
    fetch_metadata(txid, conn).await?.ok_or_else(|| MarketplaceError::MetadataNotFound(txid.clone()))
}

/// Terminal state flip, called inside the materialization transaction. Idempotent: a row that is already
/// `Processed` is not touched.
pub async fn mark_processed(
    txid: &TransactionId,
    order_id: i64,
    transaction_code: &str,
    conn: &mut SqliteConnection,
) -> Result<(), MarketplaceError> {
    sqlx::query(
        "UPDATE payment_metadata SET state = 'Processed', transaction_code = COALESCE(transaction_code, $2), \
         order_id = $3, updated_at = CURRENT_TIMESTAMP WHERE transaction_id = $1 AND state != 'Processed'",
    )
    .bind(txid.as_str())
    .bind(transaction_code)
    .bind(order_id)
    .execute(conn)
    .await?;
    Ok(())
}
