//! Catalogue product.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use seamline_core::{CurrencyCode, Price, ProductId};

/// A product row from the `products` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Unit price in the store currency.
    pub price: Decimal,
    #[serde(default)]
    pub currency: CurrencyCode,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub stock: Option<i32>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Price with its currency.
    #[must_use]
    pub const fn unit_price(&self) -> Price {
        Price::new(self.price, self.currency)
    }

    /// Whether the product can currently be bought.
    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.stock.is_none_or(|s| s > 0)
    }
}
