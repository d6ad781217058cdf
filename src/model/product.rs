use serde::{Deserialize, Serialize};

use crate::model::Id;

/// A catalog row. `name` is the business key the importer reconciles on;
/// `id` is an internal surrogate that is reassigned on every inventory
/// reload and must not be treated as stable across reloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: f64,
}

/// Fields an admin may edit in place between reloads
#[derive(Debug, Clone, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
}
