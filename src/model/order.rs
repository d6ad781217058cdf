use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Approved,
    Rejected,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Approved => "approved",
            OrderStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "approved" => OrderStatus::Approved,
            "rejected" => OrderStatus::Rejected,
            _ => OrderStatus::Pending, // Default fallback
        }
    }
}

/// An order header. Created at checkout, mutated only by manager
/// status transitions and archive toggling, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Id,
    pub customer_id: Id,
    pub status: OrderStatus,
    pub total: f64,
    pub created_at: DateTime<Utc>,
    pub archived: bool,
}

/// A line on an order. `product_id` is a weak link into the catalog:
/// it is rewritten by the inventory importer when the referenced
/// product's name survives a reload under a new identifier, and left
/// pointing at the retired identifier when the name disappears.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: Id,
    pub order_id: Id,
    pub product_id: Id,
    pub quantity: i32,
}

/// Line item joined against the live catalog for display. When the
/// product reference no longer resolves the name falls back to a
/// retired-product placeholder instead of failing the whole order view.
#[derive(Debug, Clone, Serialize)]
pub struct LineItemView {
    pub id: Id,
    pub product_id: Id,
    pub product_name: String,
    pub unit_price: f64,
    pub quantity: i32,
    pub retired: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    pub id: Id,
    pub customer_id: Id,
    pub status: OrderStatus,
    pub total: f64,
    pub created_at: DateTime<Utc>,
    pub archived: bool,
    pub items: Vec<LineItemView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_round_trip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Approved,
            OrderStatus::Rejected,
        ] {
            assert_eq!(OrderStatus::from_str(status.as_str()), status);
        }
    }

    #[test]
    fn test_order_status_unknown_falls_back_to_pending() {
        assert_eq!(OrderStatus::from_str("shipped"), OrderStatus::Pending);
    }
}
