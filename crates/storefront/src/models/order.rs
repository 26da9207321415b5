//! Customer order as listed in the admin section.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use seamline_core::{OrderId, OrderStatus};

/// An order row from the `orders` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    pub status: OrderStatus,
    pub total: Decimal,
    #[serde(default)]
    pub items: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
