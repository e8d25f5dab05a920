mod api;
mod errors;

pub use api::{MaterializedOrder, OrderFlowApi};
pub use errors::OrderFlowError;
