use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Id;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: Id,
    pub email: String,
    pub name: String,
    /// Salted digest, never serialized out to API responses
    #[serde(skip_serializing)]
    pub password_digest: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCustomer {
    pub email: String,
    pub name: String,
    pub password: String,
}
