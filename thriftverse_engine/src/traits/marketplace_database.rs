use thiserror::Error;

use crate::db_types::{
    NewNotification,
    NewOrder,
    NewPaymentMetadata,
    Notification,
    Order,
    OrderStatusType,
    PaymentMetadata,
    Product,
    SellerProfile,
    TransactionId,
};

/// The outcome of an order materialization attempt. `AlreadyExists` is the idempotency signal: a unique-constraint
/// conflict on the transaction id resolved by fetching the order the winning writer created.
#[derive(Debug, Clone)]
pub enum InsertOrderResult {
    Inserted(Order),
    AlreadyExists(Order),
}

impl InsertOrderResult {
    pub fn into_parts(self) -> (Order, bool) {
        match self {
            InsertOrderResult::Inserted(order) => (order, true),
            InsertOrderResult::AlreadyExists(order) => (order, false),
        }
    }
}

/// This trait defines the behaviour of backends supporting the ThriftVerse payment engine.
///
/// This behaviour includes:
/// * Durable staging of payment metadata, keyed by transaction id, before the buyer is redirected to a gateway.
/// * Atomic order materialization: order insert, floor-clamped inventory decrement, and the metadata state flip
///   happen in one storage transaction.
/// * The reads needed by callback handling, client re-polls, and notification fan-out.
#[allow(async_fn_in_trait)]
pub trait MarketplaceDatabase: Clone {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Stage a new payment metadata row. Insert-only: an existing row with the same transaction id is a
    /// [`MarketplaceError::DuplicateTransaction`] conflict, never an overwrite.
    async fn stage_payment_metadata(&self, meta: NewPaymentMetadata) -> Result<PaymentMetadata, MarketplaceError>;

    /// Record the gateway's own payment reference after verification, moving `Staged` metadata to `Verified`.
    ///
    /// Attaching the same code again is a no-op, and `Processed` metadata is left untouched, so callback retries are
    /// harmless. Unknown transaction ids fail with [`MarketplaceError::MetadataNotFound`].
    async fn attach_gateway_reference(
        &self,
        txid: &TransactionId,
        transaction_code: &str,
    ) -> Result<PaymentMetadata, MarketplaceError>;

    async fn fetch_payment_metadata(&self, txid: &TransactionId) -> Result<Option<PaymentMetadata>, MarketplaceError>;

    /// Materialize an order in a single atomic transaction:
    /// * insert the order row; a unique violation on the transaction id means a concurrent (or earlier) call already
    ///   materialized it, and the existing order is returned as `AlreadyExists`,
    /// * on a fresh insert only: decrement the product's availability by the order quantity, clamped at zero, and
    ///   flip the product to `OutOfStock` when the count reaches zero,
    /// * on a fresh insert only: move the metadata row to `Processed`.
    ///
    /// Any failure rolls the whole transaction back; there is no window where an order exists with stale inventory.
    async fn materialize_order(&self, order: NewOrder) -> Result<InsertOrderResult, MarketplaceError>;

    async fn fetch_order_by_transaction_id(&self, txid: &TransactionId) -> Result<Option<Order>, MarketplaceError>;

    async fn fetch_order_by_code(&self, order_code: &str) -> Result<Option<Order>, MarketplaceError>;

    /// Forward-only status update, driven by seller actions outside this crate. Illegal transitions (anything out of
    /// a terminal state) fail with [`MarketplaceError::IllegalStatusChange`].
    async fn update_order_status(&self, order_id: i64, status: OrderStatusType) -> Result<Order, MarketplaceError>;

    async fn fetch_product(&self, product_id: &str) -> Result<Option<Product>, MarketplaceError>;

    async fn fetch_seller_profile(&self, seller_id: &str) -> Result<Option<SellerProfile>, MarketplaceError>;

    /// Write an in-app notification record. Written even when the seller has muted push notifications.
    async fn insert_notification(&self, note: NewNotification) -> Result<i64, MarketplaceError>;

    /// A seller's in-app notifications, newest first.
    async fn fetch_notifications(&self, seller_id: &str) -> Result<Vec<Notification>, MarketplaceError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), MarketplaceError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum MarketplaceError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Payment metadata already staged for transaction {0}")]
    DuplicateTransaction(TransactionId),
    #[error("No payment metadata staged for transaction {0}")]
    MetadataNotFound(TransactionId),
    #[error("Stored metadata for transaction {0} is inconsistent: {1}")]
    MetadataCorrupt(TransactionId, String),
    #[error("The requested product {0} does not exist")]
    ProductNotFound(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(String),
    #[error("The requested seller {0} does not exist")]
    SellerNotFound(String),
    #[error("Illegal order status change: {0}")]
    IllegalStatusChange(String),
}

impl From<sqlx::Error> for MarketplaceError {
    fn from(e: sqlx::Error) -> Self {
        MarketplaceError::DatabaseError(e.to_string())
    }
}
