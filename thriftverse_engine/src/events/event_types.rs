use crate::db_types::Order;

/// Published exactly once per materialized order, on the branch that actually inserted the row. Idempotent retries
/// that short-circuit to an existing order do not publish, which is what keeps confirmation emails from being
/// re-sent on gateway callback retries.
#[derive(Debug, Clone)]
pub struct OrderCreatedEvent {
    pub order: Order,
}

impl OrderCreatedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}
