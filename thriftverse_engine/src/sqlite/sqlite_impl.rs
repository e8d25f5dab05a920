//! `SqliteDatabase` is the concrete SQLite implementation of the [`MarketplaceDatabase`] contract.
use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::db::{metadata, new_pool, notifications, orders, products, sellers};
use crate::{
    db_types::{
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
    },
    traits::{InsertOrderResult, MarketplaceDatabase, MarketplaceError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, MarketplaceError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl MarketplaceDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Writes run inside an explicit transaction so the committed row is visible to every pool connection, not
    /// just the one that ran the INSERT.
    async fn stage_payment_metadata(&self, meta: NewPaymentMetadata) -> Result<PaymentMetadata, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let staged = metadata::insert_metadata(meta, &mut tx).await?;
        tx.commit().await?;
        Ok(staged)
    }

    async fn attach_gateway_reference(
        &self,
        txid: &TransactionId,
        transaction_code: &str,
    ) -> Result<PaymentMetadata, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let meta = metadata::attach_gateway_reference(txid, transaction_code, &mut tx).await?;
        tx.commit().await?;
        Ok(meta)
    }

    async fn fetch_payment_metadata(&self, txid: &TransactionId) -> Result<Option<PaymentMetadata>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        metadata::fetch_metadata(txid, &mut conn).await
    }

    /// Order insert, inventory decrement and the metadata state flip run in one transaction. A crash or error in
    /// any step rolls all of them back; the losing side of a transaction-id race commits nothing.
    async fn materialize_order(&self, order: NewOrder) -> Result<InsertOrderResult, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let result = orders::idempotent_insert(order, &mut tx).await?;
        if let InsertOrderResult::Inserted(order) = &result {
            products::decrement_stock(&order.product_id, order.quantity, &mut tx).await?;
            metadata::mark_processed(&order.transaction_uuid, order.id, &order.transaction_code, &mut tx).await?;
            debug!("🗃️ Order {} committed with inventory and metadata updates", order.order_code);
        }
        tx.commit().await?;
        Ok(result)
    }

    async fn fetch_order_by_transaction_id(&self, txid: &TransactionId) -> Result<Option<Order>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_transaction_id(txid, &mut conn).await
    }

    async fn fetch_order_by_code(&self, order_code: &str) -> Result<Option<Order>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_code(order_code, &mut conn).await
    }

    async fn update_order_status(&self, order_id: i64, status: OrderStatusType) -> Result<Order, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::update_order_status(order_id, status, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Order {} status set to {status}", order.order_code);
        Ok(order)
    }

    async fn fetch_product(&self, product_id: &str) -> Result<Option<Product>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        products::fetch_product(product_id, &mut conn).await
    }

    async fn fetch_seller_profile(&self, seller_id: &str) -> Result<Option<SellerProfile>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        sellers::fetch_seller_profile(seller_id, &mut conn).await
    }

    async fn insert_notification(&self, note: NewNotification) -> Result<i64, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let id = notifications::insert_notification(note, &mut tx).await?;
        tx.commit().await?;
        Ok(id)
    }

    async fn fetch_notifications(&self, seller_id: &str) -> Result<Vec<Notification>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        notifications::fetch_notifications(seller_id, &mut conn).await
    }

    async fn close(&mut self) -> Result<(), MarketplaceError> {
        self.pool.close().await;
        Ok(())
    }
}
