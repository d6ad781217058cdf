use serde::{Deserialize, Serialize};

use crate::model::Id;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: Id,
    pub session_token: String,
    pub product_id: Id,
    pub quantity: i32,
}

/// Cart line priced against the live catalog
#[derive(Debug, Clone, Serialize)]
pub struct PricedCartItem {
    pub product_id: Id,
    pub product_name: String,
    pub unit_price: f64,
    pub quantity: i32,
    pub line_total: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PricedCart {
    pub items: Vec<PricedCartItem>,
    pub total: f64,
}
