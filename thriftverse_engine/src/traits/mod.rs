//! Interface contracts for marketplace database backends.
//!
//! [`MarketplaceDatabase`] is the behaviour a storage backend must expose to support the engine: staging payment
//! metadata, atomically materializing orders, and the reads the notification dispatcher and HTTP surface need.
//! The SQLite backend in [`crate::sqlite`] is the only implementation at present.

mod marketplace_database;

pub use marketplace_database::{InsertOrderResult, MarketplaceDatabase, MarketplaceError};
