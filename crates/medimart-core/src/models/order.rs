use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

use crate::collection::Collection;
use crate::error::{CoreError, Result};
use crate::models::{Meta, impl_document};
use crate::validation;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub unit_price: f64,
}

impl OrderItem {
    pub fn line_total(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Placed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn is_final(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Buyers may cancel until the parcel leaves the shop.
    pub fn is_cancellable(self) -> bool {
        matches!(self, OrderStatus::Placed | OrderStatus::Processing)
    }

    fn stage(self) -> u8 {
        match self {
            OrderStatus::Placed => 0,
            OrderStatus::Processing => 1,
            OrderStatus::Shipped => 2,
            OrderStatus::Delivered => 3,
            OrderStatus::Cancelled => 4,
        }
    }

    /// Fulfilment only moves forward. Cancelling follows `is_cancellable`.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        match next {
            OrderStatus::Cancelled => self.is_cancellable(),
            _ => !self.is_final() && next.stage() > self.stage(),
        }
    }

    pub fn transition_to(self, next: OrderStatus) -> Result<OrderStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::invalid_transition(self, next))
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Placed => "placed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl FromStr for OrderStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "placed" => Ok(OrderStatus::Placed),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(CoreError::invalid_field(
                "orderStatus",
                format!("'{other}' is not an order status"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderPaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl OrderPaymentStatus {
    /// A paid order only leaves `paid` through a refund.
    pub fn can_transition_to(self, next: OrderPaymentStatus) -> bool {
        use OrderPaymentStatus::*;
        self == next
            || matches!(
                (self, next),
                (Pending, Paid) | (Pending, Failed) | (Failed, Paid) | (Failed, Pending) | (Paid, Refunded)
            )
    }

    pub fn transition_to(self, next: OrderPaymentStatus) -> Result<OrderPaymentStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::invalid_transition(self, next))
        }
    }
}

impl fmt::Display for OrderPaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderPaymentStatus::Pending => "pending",
            OrderPaymentStatus::Paid => "paid",
            OrderPaymentStatus::Failed => "failed",
            OrderPaymentStatus::Refunded => "refunded",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetailerStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFeedback {
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(flatten)]
    pub meta: Meta,
    #[serde(default)]
    pub buyer_id: String,
    #[serde(default)]
    pub retailer_id: String,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub total_amount: f64,
    #[serde(default)]
    pub shipping_address: String,
    #[serde(default)]
    pub payment_status: OrderPaymentStatus,
    #[serde(default)]
    pub order_status: OrderStatus,
    #[serde(default)]
    pub retailer_status: RetailerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<OrderFeedback>,
}

impl_document!(Order, Collection::Orders);

impl Order {
    pub fn validate(&self) -> Result<()> {
        validation::require("buyerId", &self.buyer_id)?;
        validation::require("retailerId", &self.retailer_id)?;
        validation::require("shippingAddress", &self.shipping_address)?;
        if self.items.is_empty() {
            return Err(CoreError::invalid_field("items", "an order needs at least one item"));
        }
        for item in &self.items {
            validation::require("items.productId", &item.product_id)?;
            if item.quantity == 0 {
                return Err(CoreError::invalid_field("items.quantity", "must be at least 1"));
            }
            validation::require_non_negative("items.unitPrice", item.unit_price)?;
        }
        if let Some(feedback) = &self.feedback {
            validation::require_rating(feedback.rating)?;
        }
        Ok(())
    }

    pub fn compute_total(&self) -> f64 {
        self.items.iter().map(OrderItem::line_total).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> Order {
        Order {
            buyer_id: "p1".into(),
            retailer_id: "r1".into(),
            shipping_address: "12 MG Road, Pune".into(),
            items: vec![
                OrderItem {
                    product_id: "m1".into(),
                    name: "Cetirizine".into(),
                    quantity: 2,
                    unit_price: 12.5,
                },
                OrderItem {
                    product_id: "m2".into(),
                    name: "ORS".into(),
                    quantity: 3,
                    unit_price: 20.0,
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn total_sums_line_items() {
        assert_eq!(order().compute_total(), 85.0);
    }

    #[test]
    fn zero_quantity_rejected() {
        let mut o = order();
        o.items[0].quantity = 0;
        assert!(o.validate().is_err());
        o.items.clear();
        assert!(o.validate().is_err());
    }

    #[test]
    fn cancellation_window() {
        assert!(OrderStatus::Placed.is_cancellable());
        assert!(OrderStatus::Processing.is_cancellable());
        assert!(!OrderStatus::Shipped.is_cancellable());
        assert!(OrderStatus::Delivered.is_final());
        assert!(!OrderStatus::Shipped.is_final());
    }

    #[test]
    fn fulfilment_moves_forward_only() {
        use OrderStatus::*;
        assert!(Placed.can_transition_to(Processing));
        assert!(Placed.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));
        assert!(Processing.can_transition_to(Cancelled));
        assert!(!Shipped.can_transition_to(Placed));
        assert!(!Shipped.can_transition_to(Cancelled));
        assert!(!Delivered.can_transition_to(Shipped));
        assert!(!Cancelled.can_transition_to(Placed));
        assert!(matches!(
            Shipped.transition_to(Processing),
            Err(CoreError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn paid_orders_only_move_to_refunded() {
        use OrderPaymentStatus::*;
        assert!(Pending.can_transition_to(Paid));
        assert!(Failed.can_transition_to(Paid));
        assert!(Paid.can_transition_to(Paid));
        assert!(Paid.can_transition_to(Refunded));
        assert!(!Paid.can_transition_to(Pending));
        assert!(!Refunded.can_transition_to(Paid));
        assert!(Refunded.transition_to(Pending).is_err());
    }

    #[test]
    fn status_round_trips_through_text() {
        let s: OrderStatus = "shipped".parse().unwrap();
        assert_eq!(s.to_string(), "shipped");
        assert!("lost".parse::<OrderStatus>().is_err());
    }
}
