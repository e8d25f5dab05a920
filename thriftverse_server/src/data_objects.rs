use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thriftverse_engine::db_types::{CheckoutIntent, Order, OrderStatusType, PaymentChannel, ShippingAddress};

/// The body of a checkout or COD request. Deliberately identical to [`CheckoutIntent`]: the client names a product
/// and how it wants it shipped. Prices and totals are never accepted from the client.
pub type CheckoutRequest = CheckoutIntent;

/// The query string eSewa appends to the return URL: one base64-encoded JSON document.
#[derive(Debug, Clone, Deserialize)]
pub struct EsewaReturnQuery {
    pub data: String,
}

/// What callers get back about an order. Seller earnings and the platform cut stay server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_code: String,
    pub product_id: String,
    pub quantity: i64,
    pub buyer_name: String,
    pub shipping_address: ShippingAddress,
    pub amount: String,
    pub shipping_fee: String,
    pub payment_channel: PaymentChannel,
    pub status: OrderStatusType,
    pub transaction_code: String,
    pub created_at: DateTime<Utc>,
    /// False when this response re-reports an order created by an earlier callback for the same payment.
    pub newly_created: bool,
}

impl OrderSummary {
    pub fn from_order(order: Order, newly_created: bool) -> Self {
        Self {
            order_code: order.order_code,
            product_id: order.product_id,
            quantity: order.quantity,
            buyer_name: order.buyer_name,
            shipping_address: order.shipping_address.0,
            amount: order.amount.to_string(),
            shipping_fee: order.shipping_fee.to_string(),
            payment_channel: order.payment_channel,
            status: order.status,
            transaction_code: order.transaction_code,
            created_at: order.created_at,
            newly_created,
        }
    }
}
