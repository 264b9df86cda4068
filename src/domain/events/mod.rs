//! Order lifecycle events published to the message bus.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// Emitted at the service boundary after a state change has been
/// persisted. Delivery is fire-and-forget; consumers must tolerate gaps.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Created {
        order_id: Uuid,
        user: Uuid,
        order_number: String,
        total_amount: Decimal,
    },
    Cancelled {
        order_id: Uuid,
        user: Uuid,
        order_number: String,
    },
}

impl OrderEvent {
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Created { .. } => "orders.created",
            Self::Cancelled { .. } => "orders.cancelled",
        }
    }
}
