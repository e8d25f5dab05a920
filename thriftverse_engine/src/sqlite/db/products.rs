use log::debug;
use sqlx::SqliteConnection;

use crate::{db_types::Product, traits::MarketplaceError};

pub async fn fetch_product(product_id: &str, conn: &mut SqliteConnection) -> Result<Option<Product>, MarketplaceError> {
    let product =
        sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(product_id).fetch_optional(conn).await?;
    Ok(product)
}

/// Atomic decrement-with-floor. The arithmetic happens in the UPDATE itself (never read-modify-write in application
/// code), so concurrent orders for the same product cannot lose updates, and the count can never go negative. The
/// status flips to `OutOfStock` exactly when the floored count reaches zero.
pub async fn decrement_stock(
    product_id: &str,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<Product, MarketplaceError> {
    let product: Option<Product> = sqlx::query_as(
        r#"
            UPDATE products SET
                availability_count = MAX(0, availability_count - $1),
                status = CASE WHEN MAX(0, availability_count - $1) = 0 THEN 'OutOfStock' ELSE status END,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $2
            RETURNING *;
        "#,
    )
    .bind(quantity)
    .bind(product_id)
    .fetch_optional(conn)
    .await?;
    let product = product.ok_or_else(|| MarketplaceError::ProductNotFound(product_id.to_string()))?;
    debug!(
        "📦️ Product {product_id} stock decremented by {quantity}; {} remaining ({})",
        product.availability_count, product.status
    );
    Ok(product)
}
