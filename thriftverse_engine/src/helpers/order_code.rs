use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};

use crate::db_types::TransactionId;

/// Derive the human-readable order code for a gateway payment from its transaction id.
///
/// The derivation is deterministic so that a callback retry that races the insert still produces the same code and
/// lands on the UNIQUE constraint instead of minting a second order.
pub fn order_code_for_transaction(txid: &TransactionId) -> String {
    let compact: String = txid.as_str().chars().filter(|c| c.is_ascii_alphanumeric()).take(8).collect();
    format!("TV-{}", compact.to_ascii_uppercase())
}

/// Order code for a COD order: a date stamp plus a random seed. COD has no prior transaction to derive from, so the
/// code is minted alongside the synthesized transaction id.
pub fn cod_order_code(now: DateTime<Utc>) -> String {
    let seed: String = rand::thread_rng().sample_iter(&Alphanumeric).take(6).map(char::from).collect();
    format!("TV-{}-{}", now.format("%Y%m%d"), seed.to_ascii_uppercase())
}
