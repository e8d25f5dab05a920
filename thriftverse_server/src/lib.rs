//! # ThriftVerse payment server
//! This crate hosts the HTTP surface of the ThriftVerse payment flow. It is responsible for:
//! * Staging checkouts and handing buyers a signed redirect to eSewa or FonePay.
//! * Receiving gateway return callbacks, verifying their signatures, and driving idempotent order materialization.
//! * Accepting cash-on-delivery orders directly.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/checkout/esewa`, `/checkout/fonepay`: Stage a payment and return the signed gateway redirect.
//! * `/payments/esewa/return`, `/payments/fonepay/return`: Gateway callback verification and order creation.
//! * `/orders/cod`: Direct cash-on-delivery order placement.
//! * `/payments/{txid}/order`: Poll whether a payment has turned into an order yet.

pub mod config;
pub mod data_objects;
pub mod errors;
pub mod gateways;
pub mod helpers;
pub mod integrations;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
