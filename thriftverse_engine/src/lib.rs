//! ThriftVerse Payment Engine
//!
//! The engine turns verified gateway payments (and direct cash-on-delivery requests) into persisted orders for the
//! ThriftVerse thrift marketplace. It is gateway-agnostic: the HTTP server parses and verifies callbacks, and then
//! drives the flows in this crate.
//!
//! The crate is divided into three main sections:
//! 1. Database management and control ([`mod@sqlite`]). SQLite is the only backend at present, behind the
//!    [`traits::MarketplaceDatabase`] contract so that another store can be slotted in. You should never need to touch
//!    the database directly; use the public API instead. The exception is the data types, which live in
//!    [`mod@db_types`] and are public.
//! 2. The order flow API ([`OrderFlowApi`]). This stages payment metadata before a buyer is redirected to a gateway,
//!    and idempotently materializes orders once a payment has been verified (or a COD request arrives).
//! 3. Events and notifications ([`mod@events`], [`mod@notifications`]). Order creation publishes an
//!    [`events::OrderCreatedEvent`] onto an mpsc hook channel; the [`notifications::NotificationDispatcher`] consumes
//!    it and fans out buyer/seller emails, a push message and an in-app record, all best-effort.

pub mod db_types;
pub mod events;
pub mod helpers;
pub mod notifications;
pub mod traits;

mod order_flow;
#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::{db, SqliteDatabase};
pub use order_flow::{MaterializedOrder, OrderFlowApi, OrderFlowError};
pub use traits::{InsertOrderResult, MarketplaceDatabase, MarketplaceError};
