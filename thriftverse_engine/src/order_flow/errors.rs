use thiserror::Error;

use crate::{db_types::TransactionId, traits::MarketplaceError};

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    /// A verified payment arrived with no staged metadata to join against. Nothing can be materialized; the buyer is
    /// told to contact support, quoting the transaction id, for manual reconciliation.
    #[error("No payment metadata staged for transaction {0}")]
    MetadataNotFound(TransactionId),
    /// Transient storage failure during materialization. The whole call is safe to retry: the idempotency check and
    /// the unique constraint guarantee a retry cannot double-create.
    #[error("Could not create order: {0}")]
    OrderCreation(String),
    #[error("The requested product {0} does not exist")]
    ProductNotFound(String),
    #[error("Product {product_id} cannot cover the order: {requested} requested, {available} in stock")]
    InsufficientStock { product_id: String, requested: i64, available: i64 },
    #[error("Order quantity must be positive, got {0}")]
    InvalidQuantity(i64),
    #[error("Quoted amount {amount} is less than the {fee} shipping fee")]
    AmountBelowShippingFee { amount: String, fee: String },
    #[error("{0}")]
    Backend(MarketplaceError),
}

impl From<MarketplaceError> for OrderFlowError {
    fn from(e: MarketplaceError) -> Self {
        match e {
            MarketplaceError::MetadataNotFound(txid) => OrderFlowError::MetadataNotFound(txid),
            MarketplaceError::ProductNotFound(id) => OrderFlowError::ProductNotFound(id),
            MarketplaceError::DatabaseError(msg) => OrderFlowError::OrderCreation(msg),
            other => OrderFlowError::Backend(other),
        }
    }
}
