use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, Type};
use thiserror::Error;
use tv_common::Rupees;
use uuid::Uuid;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(pub String);

//--------------------------------------    TransactionId    ---------------------------------------------------------
/// The transaction id minted by ThriftVerse before a buyer is redirected to a gateway. It correlates the eventual
/// callback with the staged payment metadata, and is the single idempotency key for order materialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct TransactionId(pub String);

impl TransactionId {
    /// Mint a fresh transaction id for a gateway payment.
    pub fn fresh() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Mint a transaction id for a cash-on-delivery order, which never goes through a gateway.
    pub fn fresh_cod() -> Self {
        Self(format!("cod-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TransactionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------    ShippingOption   ---------------------------------------------------------
/// How the buyer wants the item delivered. The fee table is fixed; the same figure must be used when quoting the
/// buyer at checkout and when recording the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShippingOption {
    /// Door-to-door courier delivery.
    Home,
    /// Pickup at the nearest courier branch.
    Branch,
    /// No shipping (e.g. in-person handover).
    None,
}

impl ShippingOption {
    pub fn fee(&self) -> Rupees {
        match self {
            ShippingOption::Home => Rupees::from_rupees(170),
            ShippingOption::Branch => Rupees::from_rupees(120),
            ShippingOption::None => Rupees::from_rupees(0),
        }
    }
}

impl Display for ShippingOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShippingOption::Home => write!(f, "Home"),
            ShippingOption::Branch => write!(f, "Branch"),
            ShippingOption::None => write!(f, "None"),
        }
    }
}

impl FromStr for ShippingOption {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "home" => Ok(Self::Home),
            "branch" => Ok(Self::Branch),
            "none" | "" => Ok(Self::None),
            s => Err(ConversionError(format!("Invalid shipping option: {s}"))),
        }
    }
}

//--------------------------------------    PaymentChannel   ---------------------------------------------------------
/// The payment rail an order came in on. The platform fee rate depends on the channel: 3% for gateway payments and
/// 5% for cash on delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentChannel {
    Esewa,
    Fonepay,
    Cod,
}

impl PaymentChannel {
    pub fn platform_fee_percent(&self) -> i64 {
        match self {
            PaymentChannel::Esewa | PaymentChannel::Fonepay => 3,
            PaymentChannel::Cod => 5,
        }
    }

}

impl Display for PaymentChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentChannel::Esewa => write!(f, "Esewa"),
            PaymentChannel::Fonepay => write!(f, "Fonepay"),
            PaymentChannel::Cod => write!(f, "Cod"),
        }
    }
}

impl FromStr for PaymentChannel {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "esewa" => Ok(Self::Esewa),
            "fonepay" => Ok(Self::Fonepay),
            "cod" => Ok(Self::Cod),
            s => Err(ConversionError(format!("Invalid payment channel: {s}"))),
        }
    }
}

//--------------------------------------   OrderStatusType   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order has been materialized and awaits seller action.
    Pending,
    /// The seller has fulfilled the order.
    Completed,
    /// The order was cancelled before fulfilment.
    Cancelled,
    /// The order was refunded after payment.
    Refunded,
}

impl OrderStatusType {
    /// Status moves forward only: `Pending` can transition to any terminal state, terminal states never change.
    pub fn can_transition_to(&self, next: OrderStatusType) -> bool {
        matches!(
            (self, next),
            (OrderStatusType::Pending, OrderStatusType::Completed)
                | (OrderStatusType::Pending, OrderStatusType::Cancelled)
                | (OrderStatusType::Pending, OrderStatusType::Refunded)
        )
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "Pending"),
            OrderStatusType::Completed => write!(f, "Completed"),
            OrderStatusType::Cancelled => write!(f, "Cancelled"),
            OrderStatusType::Refunded => write!(f, "Refunded"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Completed" => Ok(Self::Completed),
            "Cancelled" => Ok(Self::Cancelled),
            "Refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------    ProductStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum ProductStatus {
    Available,
    OutOfStock,
}

impl Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductStatus::Available => write!(f, "Available"),
            ProductStatus::OutOfStock => write!(f, "OutOfStock"),
        }
    }
}

//--------------------------------------   ShippingAddress   ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub street: String,
    pub city: String,
    pub district: String,
    pub country: String,
    pub phone: String,
}

impl Display for ShippingAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}, {}, {}", self.street, self.city, self.district, self.country)
    }
}

//--------------------------------------    MetadataState    ---------------------------------------------------------
/// The lifecycle of a staged payment, as an explicit tagged state so that illegal combinations (a processed payment
/// with no gateway reference, say) cannot be represented.
///
/// `Staged → Verified → Processed`, one way. COD orders jump from `Staged` to `Processed` inside the
/// materialization transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataState {
    /// Metadata written, buyer not yet confirmed by the gateway.
    Staged,
    /// The gateway callback passed signature verification; `transaction_code` is the gateway's own reference.
    Verified { transaction_code: String },
    /// An order exists for this transaction. Terminal.
    Processed { transaction_code: String, order_id: i64 },
}

impl MetadataState {
    pub fn is_processed(&self) -> bool {
        matches!(self, MetadataState::Processed { .. })
    }
}

//-------------------------------------- NewPaymentMetadata  ---------------------------------------------------------
/// Everything needed to materialize an order later, captured *before* the buyer leaves for the gateway. A COD order
/// synthesizes one of these too, for symmetry and audit.
#[derive(Debug, Clone)]
pub struct NewPaymentMetadata {
    pub transaction_id: TransactionId,
    pub product_id: String,
    pub seller_id: String,
    pub buyer_email: String,
    pub buyer_name: String,
    pub shipping_address: ShippingAddress,
    /// The total the buyer was quoted, shipping included.
    pub amount: Rupees,
    pub quantity: i64,
    pub shipping_option: ShippingOption,
    pub payment_channel: PaymentChannel,
    pub buyer_notes: Option<String>,
}

//--------------------------------------   PaymentMetadata   ---------------------------------------------------------
/// A staging row. Never deleted; it is the audit trail for every payment attempt, successful or not.
#[derive(Debug, Clone)]
pub struct PaymentMetadata {
    pub id: i64,
    pub transaction_id: TransactionId,
    pub product_id: String,
    pub seller_id: String,
    pub buyer_email: String,
    pub buyer_name: String,
    pub shipping_address: ShippingAddress,
    pub amount: Rupees,
    pub quantity: i64,
    pub shipping_option: ShippingOption,
    pub payment_channel: PaymentChannel,
    pub buyer_notes: Option<String>,
    pub state: MetadataState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct Order {
    pub id: i64,
    /// Human-readable order reference, shown to buyer and seller.
    pub order_code: String,
    pub seller_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub buyer_email: String,
    pub buyer_name: String,
    pub shipping_address: Json<ShippingAddress>,
    /// The gateway's own reference for the payment (synthesized for COD).
    pub transaction_code: String,
    /// The ThriftVerse transaction id this order was materialized from. UNIQUE in the store.
    pub transaction_uuid: TransactionId,
    /// Total charged to the buyer, shipping included.
    pub amount: Rupees,
    pub shipping_fee: Rupees,
    pub payment_channel: PaymentChannel,
    pub status: OrderStatusType,
    pub sellers_earning: Rupees,
    pub platform_earnings: Rupees,
    pub buyer_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// The item cost without shipping. `amount = product_cost + shipping_fee` holds by construction.
    pub fn product_cost(&self) -> Rupees {
        self.amount - self.shipping_fee
    }
}

//--------------------------------------      NewOrder       ---------------------------------------------------------
/// A fully-computed order, ready for insertion. Earnings are computed once, here; they are never recomputed on
/// status changes.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_code: String,
    pub seller_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub buyer_email: String,
    pub buyer_name: String,
    pub shipping_address: ShippingAddress,
    pub transaction_code: String,
    pub transaction_uuid: TransactionId,
    pub amount: Rupees,
    pub shipping_fee: Rupees,
    pub payment_channel: PaymentChannel,
    pub sellers_earning: Rupees,
    pub platform_earnings: Rupees,
    pub buyer_notes: Option<String>,
}

//--------------------------------------   CheckoutIntent    ---------------------------------------------------------
/// A buyer's request to purchase, before any money moves. The server quotes the amount from the live product price;
/// the client never supplies it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutIntent {
    pub product_id: String,
    pub buyer_email: String,
    pub buyer_name: String,
    pub shipping_address: ShippingAddress,
    pub quantity: i64,
    pub shipping_option: ShippingOption,
    #[serde(default)]
    pub buyer_notes: Option<String>,
}

//--------------------------------------       Product       ---------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct Product {
    pub id: String,
    pub seller_id: String,
    pub name: String,
    /// Unit price.
    pub price: Rupees,
    pub availability_count: i64,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------    SellerProfile    ---------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct SellerProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Expo push token, if the seller's device has registered one.
    pub push_token: Option<String>,
    /// When muted, push messages are skipped; in-app notification records are still written.
    pub notifications_muted: bool,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------    Notifications    ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub seller_id: String,
    pub order_id: i64,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct Notification {
    pub id: i64,
    pub seller_id: String,
    pub order_id: i64,
    pub title: String,
    pub body: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}
