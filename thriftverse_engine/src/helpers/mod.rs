//! Pure helpers used by the order flow: the earnings split and order-code derivation.

mod earnings;
mod order_code;

pub use earnings::{earnings_split, EarningsSplit};
pub use order_code::{cod_order_code, order_code_for_transaction};
