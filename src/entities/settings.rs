//! Settings entity - per-identity singleton holding the opening balance and the
//! category lists offered when recording transactions.
//!
//! [`Settings`] is the in-memory value the application works with;
//! [`SettingsRow`] is the shape stored in the `user_settings` table, where
//! every field except the owner may be absent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Backend table holding one settings row per identity.
pub const SETTINGS_TABLE: &str = "user_settings";

/// Effective settings for the signed-in identity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Balance the ledger starts from
    pub starting_balance: f64,
    /// Transaction categories, in display order
    pub categories: Vec<String>,
    /// Transaction subcategories, in display order
    pub subcategories: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            starting_balance: 0.0,
            categories: [
                "Rent",
                "Maintenance",
                "Repair",
                "Insurance",
                "Salary",
                "Car wash",
                "Loan",
                "Other",
                "Deposit refund",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            subcategories: ["Parts", "Labour", "Fines", "Payment", "Surcharge"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl Settings {
    /// Overlays the fields present in `row`; absent fields keep their current value.
    pub fn merge_row(&mut self, row: SettingsRow) {
        if let Some(balance) = row.starting_balance {
            self.starting_balance = balance;
        }
        if let Some(categories) = row.categories {
            self.categories = categories;
        }
        if let Some(subcategories) = row.subcategories {
            self.subcategories = subcategories;
        }
    }

    /// Full row for an unconditional upsert keyed by owner.
    #[must_use]
    pub fn to_row(&self, user_id: &str) -> SettingsRow {
        SettingsRow {
            user_id: user_id.to_string(),
            starting_balance: Some(self.starting_balance),
            categories: Some(self.categories.clone()),
            subcategories: Some(self.subcategories.clone()),
            updated_at: Some(Utc::now()),
        }
    }
}

/// Row in the `user_settings` table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SettingsRow {
    /// Owner identifier, also the conflict target for upserts
    pub user_id: String,
    /// Opening balance
    #[serde(default)]
    pub starting_balance: Option<f64>,
    /// Category list
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    /// Subcategory list
    #[serde(default)]
    pub subcategories: Option<Vec<String>>,
    /// Last write time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_merge_keeps_defaults_for_null_columns() {
        let mut settings = Settings::default();
        let row: SettingsRow = serde_json::from_str(
            r#"{"user_id": "u1", "starting_balance": 1500.5, "categories": null}"#,
        )
        .unwrap();

        settings.merge_row(row);
        assert_eq!(settings.starting_balance, 1500.5);
        assert_eq!(settings.categories, Settings::default().categories);
        assert_eq!(settings.subcategories.len(), 5);
    }

    #[test]
    fn test_to_row_carries_every_field() {
        let settings = Settings {
            starting_balance: 10.0,
            categories: vec!["Rent".to_string()],
            subcategories: vec![],
        };
        let row = settings.to_row("u1");
        assert_eq!(row.user_id, "u1");
        assert_eq!(row.starting_balance, Some(10.0));
        assert_eq!(row.categories.as_deref(), Some(&["Rent".to_string()][..]));
        assert_eq!(row.subcategories, Some(vec![]));
        assert!(row.updated_at.is_some());
    }
}
