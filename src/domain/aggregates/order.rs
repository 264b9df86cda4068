//! Order aggregate.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::value_objects::{OrderNumber, ParseEnumError};

/// Days between order creation and the estimated delivery date.
pub const DELIVERY_WINDOW_DAYS: i64 = 7;

/// Frozen copy of a purchased line. Deliberately decoupled from the live
/// product record so historical orders stay accurate when the catalog
/// changes.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product: Uuid,
    pub name: String,
    pub image: String,
    pub price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub size: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub phone: String,
}

/// Fulfillment state machine: pending → confirmed → processing → shipped
/// → delivered, with cancelled reachable from the first three states.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(ParseEnumError { kind: "order status", value: other.to_string() }),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            other => Err(ParseEnumError { kind: "payment status", value: other.to_string() }),
        }
    }
}

/// Payment method is a label only; no gateway integration sits behind it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    Upi,
    NetBanking,
    #[default]
    CashOnDelivery,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreditCard => "credit_card",
            Self::DebitCard => "debit_card",
            Self::Upi => "upi",
            Self::NetBanking => "net_banking",
            Self::CashOnDelivery => "cash_on_delivery",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit_card" => Ok(Self::CreditCard),
            "debit_card" => Ok(Self::DebitCard),
            "upi" => Ok(Self::Upi),
            "net_banking" => Ok(Self::NetBanking),
            "cash_on_delivery" => Ok(Self::CashOnDelivery),
            other => Err(ParseEnumError { kind: "payment method", value: other.to_string() }),
        }
    }
}

/// Monetary breakdown of a checkout. All components are non-negative and
/// `total_amount = subtotal + tax + shipping - discount`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub discount: Decimal,
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("Order must have at least 1 item")]
    NoItems,
    #[error("Order cannot be cancelled at this stage")]
    CannotCancel { from: OrderStatus },
}

/// Immutable record of a completed checkout. Created once from a
/// validated cart; afterwards only status transitions mutate it, and it
/// is never deleted.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user: Uuid,
    pub order_number: OrderNumber,
    pub items: Vec<OrderItem>,
    pub total_items: u32,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub discount: Decimal,
    pub total_amount: Decimal,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    pub tracking_number: Option<String>,
    /// Creation date + [`DELIVERY_WINDOW_DAYS`]; set once, never
    /// recomputed.
    pub estimated_delivery: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn create(
        user: Uuid,
        items: Vec<OrderItem>,
        totals: OrderTotals,
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
        notes: Option<String>,
    ) -> Result<Self, OrderError> {
        if items.is_empty() {
            return Err(OrderError::NoItems);
        }
        let now = Utc::now();
        let total_items = items.iter().map(|i| i.quantity).sum();
        Ok(Self {
            id: Uuid::now_v7(),
            user,
            order_number: OrderNumber::generate(now),
            items,
            total_items,
            subtotal: totals.subtotal,
            tax: totals.tax,
            shipping: totals.shipping,
            discount: totals.discount,
            total_amount: totals.total_amount,
            shipping_address,
            payment_method,
            payment_status: PaymentStatus::Pending,
            order_status: OrderStatus::Pending,
            tracking_number: None,
            estimated_delivery: now + Duration::days(DELIVERY_WINDOW_DAYS),
            delivered_at: None,
            notes,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn can_cancel(&self) -> bool {
        matches!(
            self.order_status,
            OrderStatus::Pending | OrderStatus::Confirmed | OrderStatus::Processing
        )
    }

    /// Cancels the order if the state machine allows it. Stock restore is
    /// the workflow's responsibility, not the aggregate's.
    pub fn cancel(&mut self) -> Result<(), OrderError> {
        if !self.can_cancel() {
            return Err(OrderError::CannotCancel { from: self.order_status });
        }
        self.order_status = OrderStatus::Cancelled;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: u32, price: Decimal) -> OrderItem {
        OrderItem {
            product: Uuid::now_v7(),
            name: "DAP 50kg".into(),
            image: "https://img/dap.jpg".into(),
            price,
            quantity,
            size: String::new(),
        }
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            name: "Asha Patel".into(),
            street: "12 Mandi Road".into(),
            city: "Nashik".into(),
            state: "Maharashtra".into(),
            zip_code: "422001".into(),
            country: "India".into(),
            phone: "9876543210".into(),
        }
    }

    fn totals(subtotal: Decimal) -> OrderTotals {
        OrderTotals {
            subtotal,
            tax: Decimal::ZERO,
            shipping: Decimal::ZERO,
            discount: Decimal::ZERO,
            total_amount: subtotal,
        }
    }

    #[test]
    fn test_create_derives_item_count_and_delivery_window() {
        let order = Order::create(
            Uuid::now_v7(),
            vec![item(2, Decimal::from(300)), item(1, Decimal::from(120))],
            totals(Decimal::from(720)),
            address(),
            PaymentMethod::Upi,
            None,
        )
        .unwrap();
        assert_eq!(order.total_items, 3);
        assert_eq!(order.order_status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.estimated_delivery, order.created_at + Duration::days(7));
    }

    #[test]
    fn test_create_rejects_empty_items() {
        let err = Order::create(
            Uuid::now_v7(),
            vec![],
            totals(Decimal::ZERO),
            address(),
            PaymentMethod::CashOnDelivery,
            None,
        )
        .unwrap_err();
        assert_eq!(err, OrderError::NoItems);
    }

    #[test]
    fn test_cancel_allowed_before_shipping() {
        for status in [OrderStatus::Pending, OrderStatus::Confirmed, OrderStatus::Processing] {
            let mut order = Order::create(
                Uuid::now_v7(),
                vec![item(1, Decimal::from(50))],
                totals(Decimal::from(50)),
                address(),
                PaymentMethod::CashOnDelivery,
                None,
            )
            .unwrap();
            order.order_status = status;
            order.cancel().unwrap();
            assert_eq!(order.order_status, OrderStatus::Cancelled);
        }
    }

    #[test]
    fn test_cancel_blocked_on_late_and_terminal_states() {
        for status in [OrderStatus::Shipped, OrderStatus::Delivered, OrderStatus::Cancelled] {
            let mut order = Order::create(
                Uuid::now_v7(),
                vec![item(1, Decimal::from(50))],
                totals(Decimal::from(50)),
                address(),
                PaymentMethod::CashOnDelivery,
                None,
            )
            .unwrap();
            order.order_status = status;
            let err = order.cancel().unwrap_err();
            assert_eq!(err, OrderError::CannotCancel { from: status });
            assert_eq!(order.order_status, status);
        }
    }
}
