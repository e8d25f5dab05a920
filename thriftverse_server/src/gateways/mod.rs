//! Gateway adapters for eSewa and FonePay.
//!
//! Each adapter does exactly two things: build the signed redirect that sends a buyer to the gateway, and parse and
//! verify the return callback into a gateway-neutral [`VerifiedPayment`]. Everything downstream of verification
//! (metadata lookup, amount cross-check, order materialization) is gateway-agnostic and lives in the route handlers.

mod esewa;
mod fonepay;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use thriftverse_engine::db_types::TransactionId;
use tv_common::Rupees;

pub use esewa::EsewaGateway;
pub use fonepay::{FonepayCallbackParams, FonepayGateway};

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The callback signature did not verify against the merchant secret. Logged as a potential forgery.
    #[error("The callback signature is invalid.")]
    SignatureInvalid,
    #[error("The gateway reported an unsuccessful payment: {0}")]
    PaymentNotSuccessful(String),
    #[error("The callback payload is malformed: {0}")]
    MalformedCallback(String),
    #[error("The gateway credentials are not configured.")]
    NotConfigured,
}

/// A signed redirect handed back to the client at checkout. eSewa takes an auto-submitted POST form; FonePay takes
/// a plain GET. The client follows `payload` verbatim; the signature fields are already embedded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedRedirect {
    pub transaction_id: TransactionId,
    pub gateway_url: String,
    #[serde(flatten)]
    pub payload: RedirectPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum RedirectPayload {
    /// POST the given fields to `gateway_url` as an HTML form.
    Form { fields: Vec<(String, String)> },
    /// Navigate to `gateway_url` with the given query string appended.
    Url { query: String },
}

/// A gateway callback that passed signature verification, reduced to the facts the order flow needs. Holding one of
/// these means the money moved; it does not yet mean the amount matches what was quoted.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedPayment {
    pub transaction_id: TransactionId,
    /// The gateway's own reference for the payment.
    pub transaction_code: String,
    pub amount: Rupees,
}
