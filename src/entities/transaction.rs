//! Transaction entity - income or expense recorded against the fleet.
//!
//! `category` and `subcategory` take their values from the owner's
//! [`Settings`](super::Settings) lists, but the backend does not enforce that.
use super::Record;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Transaction row in the `transactions` table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Server-assigned identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Owner identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Day the money moved
    pub date: NaiveDate,
    /// Category, e.g. `"Rent"`
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub category: String,
    /// Optional finer classification, e.g. `"Parts"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    /// Signed amount (positive for income, negative for spending)
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub amount: f64,
    /// Vehicle the transaction relates to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub car_id: Option<String>,
    /// Stamped on every save
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Remaining columns
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Transaction {
    /// Creates an unsaved transaction.
    #[must_use]
    pub fn new(date: NaiveDate, category: impl Into<String>, amount: f64) -> Self {
        Self {
            id: None,
            user_id: None,
            date,
            category: category.into(),
            subcategory: None,
            amount,
            car_id: None,
            updated_at: None,
            extra: Map::new(),
        }
    }
}

impl Record for Transaction {
    const TABLE: &'static str = "transactions";
    const ORDER_BY: &'static str = "date";

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn owner_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_category_and_amount_default() {
        let row = json!({
            "id": "t1",
            "user_id": "u1",
            "date": "2024-03-01",
            "category": null,
            "amount": null
        });

        let transaction: Transaction = serde_json::from_value(row).unwrap();
        assert_eq!(transaction.category, "");
        assert_eq!(transaction.amount, 0.0);
        assert_eq!(transaction.subcategory, None);
    }
}
