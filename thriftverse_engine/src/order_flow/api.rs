use std::fmt::Debug;

use chrono::Utc;
use log::*;

use crate::{
    db_types::{
        CheckoutIntent,
        MetadataState,
        NewOrder,
        NewPaymentMetadata,
        Order,
        PaymentChannel,
        PaymentMetadata,
        Product,
        ProductStatus,
        TransactionId,
    },
    events::{EventProducers, OrderCreatedEvent},
    helpers::{cod_order_code, earnings_split, order_code_for_transaction},
    order_flow::OrderFlowError,
    traits::{MarketplaceDatabase, MarketplaceError},
};

/// The result of a materialization call. `newly_created` is false when the call short-circuited onto an order an
/// earlier (or concurrent) call already created; callers use it to avoid duplicate side effects.
#[derive(Debug, Clone)]
pub struct MaterializedOrder {
    pub order: Order,
    pub newly_created: bool,
}

/// `OrderFlowApi` is the primary API for staging payments and materializing orders.
///
/// The flow per transaction id is `staged → verified → processed`, driven by [`Self::stage_payment`] at checkout
/// time and [`Self::create_order_from_payment`] once the server has verified the gateway callback. COD orders skip
/// verification and run the whole flow in [`Self::create_cod_order`].
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> OrderFlowApi<B>
where B: MarketplaceDatabase
{
    /// Stage the metadata for a gateway payment. Must complete before the buyer is handed the redirect, otherwise
    /// the eventual callback has nothing to join against.
    pub async fn stage_payment(&self, meta: NewPaymentMetadata) -> Result<PaymentMetadata, OrderFlowError> {
        if meta.quantity <= 0 {
            return Err(OrderFlowError::InvalidQuantity(meta.quantity));
        }
        let fee = meta.shipping_option.fee();
        if (meta.amount - fee).is_negative() {
            return Err(OrderFlowError::AmountBelowShippingFee {
                amount: meta.amount.to_string(),
                fee: fee.to_string(),
            });
        }
        let staged = self.db.stage_payment_metadata(meta).await?;
        debug!(
            "💳️ Staged payment [{}]: {} for {} × product {}",
            staged.transaction_id, staged.amount, staged.quantity, staged.product_id
        );
        Ok(staged)
    }

    /// Stage a gateway checkout from a buyer's intent. The total is quoted from the live product price plus the
    /// shipping fee; the client never supplies an amount. Returns the staged metadata, whose transaction id and
    /// amount feed the gateway redirect.
    pub async fn stage_checkout(
        &self,
        intent: CheckoutIntent,
        channel: PaymentChannel,
    ) -> Result<PaymentMetadata, OrderFlowError> {
        if intent.quantity <= 0 {
            return Err(OrderFlowError::InvalidQuantity(intent.quantity));
        }
        let product = self
            .db
            .fetch_product(&intent.product_id)
            .await?
            .ok_or_else(|| OrderFlowError::ProductNotFound(intent.product_id.clone()))?;
        check_stock(&product, intent.quantity)?;
        let amount = product.price * intent.quantity + intent.shipping_option.fee();
        let meta = NewPaymentMetadata {
            transaction_id: TransactionId::fresh(),
            product_id: product.id,
            seller_id: product.seller_id,
            buyer_email: intent.buyer_email,
            buyer_name: intent.buyer_name,
            shipping_address: intent.shipping_address,
            amount,
            quantity: intent.quantity,
            shipping_option: intent.shipping_option,
            payment_channel: channel,
            buyer_notes: intent.buyer_notes,
        };
        self.stage_payment(meta).await
    }

    /// The staged metadata for a transaction, if any. Used by callback handlers to cross-check the amount the
    /// gateway reports against the amount that was quoted.
    pub async fn payment_metadata(&self, txid: &TransactionId) -> Result<Option<PaymentMetadata>, OrderFlowError> {
        Ok(self.db.fetch_payment_metadata(txid).await?)
    }

    /// Materialize the order for a verified gateway payment.
    ///
    /// Idempotent: invoking this any number of times, sequentially or concurrently, for one transaction id yields
    /// the same order, decrements inventory exactly once, and notifies exactly once. Callers must only invoke it
    /// after signature verification has passed.
    pub async fn create_order_from_payment(
        &self,
        txid: &TransactionId,
        transaction_code: &str,
    ) -> Result<MaterializedOrder, OrderFlowError> {
        let meta = self
            .db
            .fetch_payment_metadata(txid)
            .await?
            .ok_or_else(|| OrderFlowError::MetadataNotFound(txid.clone()))?;
        if let MetadataState::Processed { order_id, .. } = &meta.state {
            trace!("🧾️ Transaction [{txid}] already processed as order #{order_id}; short-circuiting");
            let order = self
                .db
                .fetch_order_by_transaction_id(txid)
                .await?
                .ok_or_else(|| OrderFlowError::Backend(MarketplaceError::OrderNotFound(txid.to_string())))?;
            return Ok(MaterializedOrder { order, newly_created: false });
        }
        let meta = self.db.attach_gateway_reference(txid, transaction_code).await?;
        let order = new_order_from_metadata(&meta, transaction_code)?;
        let (order, newly_created) = self.db.materialize_order(order).await?.into_parts();
        if newly_created {
            info!("🧾️ Order {} materialized from transaction [{txid}], {} total", order.order_code, order.amount);
            self.call_order_created_hook(&order).await;
        } else {
            info!("🧾️ Transaction [{txid}] raced an earlier materialization; returning order {}", order.order_code);
        }
        Ok(MaterializedOrder { order, newly_created })
    }

    /// Materialize a cash-on-delivery order directly from the buyer's intent: no gateway round-trip, no signature
    /// verification, the COD platform fee rate. A metadata row is still synthesized so the audit trail is uniform
    /// across channels.
    pub async fn create_cod_order(&self, intent: CheckoutIntent) -> Result<MaterializedOrder, OrderFlowError> {
        if intent.quantity <= 0 {
            return Err(OrderFlowError::InvalidQuantity(intent.quantity));
        }
        let product = self
            .db
            .fetch_product(&intent.product_id)
            .await?
            .ok_or_else(|| OrderFlowError::ProductNotFound(intent.product_id.clone()))?;
        check_stock(&product, intent.quantity)?;
        let txid = TransactionId::fresh_cod();
        let transaction_code = txid.as_str().to_ascii_uppercase();
        let shipping_fee = intent.shipping_option.fee();
        let product_cost = product.price * intent.quantity;
        let amount = product_cost + shipping_fee;
        let meta = NewPaymentMetadata {
            transaction_id: txid.clone(),
            product_id: product.id.clone(),
            seller_id: product.seller_id.clone(),
            buyer_email: intent.buyer_email.clone(),
            buyer_name: intent.buyer_name.clone(),
            shipping_address: intent.shipping_address.clone(),
            amount,
            quantity: intent.quantity,
            shipping_option: intent.shipping_option,
            payment_channel: PaymentChannel::Cod,
            buyer_notes: intent.buyer_notes.clone(),
        };
        self.db.stage_payment_metadata(meta).await?;
        let split = earnings_split(product_cost, PaymentChannel::Cod);
        let order = NewOrder {
            order_code: cod_order_code(Utc::now()),
            seller_id: product.seller_id,
            product_id: product.id,
            quantity: intent.quantity,
            buyer_email: intent.buyer_email,
            buyer_name: intent.buyer_name,
            shipping_address: intent.shipping_address,
            transaction_code,
            transaction_uuid: txid.clone(),
            amount,
            shipping_fee,
            payment_channel: PaymentChannel::Cod,
            sellers_earning: split.sellers_earning,
            platform_earnings: split.platform_earnings,
            buyer_notes: intent.buyer_notes,
        };
        let (order, newly_created) = self.db.materialize_order(order).await?.into_parts();
        if newly_created {
            info!("🧾️ COD order {} materialized [{txid}], {} total", order.order_code, order.amount);
            self.call_order_created_hook(&order).await;
        }
        Ok(MaterializedOrder { order, newly_created })
    }

    /// Lookup for client re-polls: "has my payment turned into an order yet?"
    pub async fn order_by_transaction_id(&self, txid: &TransactionId) -> Result<Option<Order>, OrderFlowError> {
        Ok(self.db.fetch_order_by_transaction_id(txid).await?)
    }

    pub async fn order_by_code(&self, order_code: &str) -> Result<Option<Order>, OrderFlowError> {
        Ok(self.db.fetch_order_by_code(order_code).await?)
    }

    async fn call_order_created_hook(&self, order: &Order) {
        for emitter in &self.producers.order_created_producer {
            trace!("🧾️ Notifying order created hook subscribers for {}", order.order_code);
            let event = OrderCreatedEvent::new(order.clone());
            emitter.publish_event(event).await;
        }
    }
}

/// Checkout-time stock gate: a listing that is out of stock, or holds fewer units than the buyer wants, cannot be
/// checked out at all. Races that slip past this gate are still floor-clamped at materialization time.
fn check_stock(product: &Product, quantity: i64) -> Result<(), OrderFlowError> {
    if product.status != ProductStatus::Available || product.availability_count < quantity {
        return Err(OrderFlowError::InsufficientStock {
            product_id: product.id.clone(),
            requested: quantity,
            available: product.availability_count,
        });
    }
    Ok(())
}

/// Assemble the order row for a verified payment. The shipping fee comes from the stored option, never the
/// callback; the product cost is the staged total minus that fee, so `amount = product_cost + shipping_fee` holds
/// exactly.
fn new_order_from_metadata(meta: &PaymentMetadata, transaction_code: &str) -> Result<NewOrder, OrderFlowError> {
    let shipping_fee = meta.shipping_option.fee();
    let product_cost = meta.amount - shipping_fee;
    if product_cost.is_negative() {
        return Err(OrderFlowError::AmountBelowShippingFee {
            amount: meta.amount.to_string(),
            fee: shipping_fee.to_string(),
        });
    }
    let split = earnings_split(product_cost, meta.payment_channel);
    Ok(NewOrder {
        order_code: order_code_for_transaction(&meta.transaction_id),
        seller_id: meta.seller_id.clone(),
        product_id: meta.product_id.clone(),
        quantity: meta.quantity,
        buyer_email: meta.buyer_email.clone(),
        buyer_name: meta.buyer_name.clone(),
        shipping_address: meta.shipping_address.clone(),
        transaction_code: transaction_code.to_string(),
        transaction_uuid: meta.transaction_id.clone(),
        amount: meta.amount,
        shipping_fee,
        payment_channel: meta.payment_channel,
        sellers_earning: split.sellers_earning,
        platform_earnings: split.platform_earnings,
        buyer_notes: meta.buyer_notes.clone(),
    })
}
