//! Vehicle entity - one car in the fleet.
//!
//! Columns the application does not interpret are kept in `extra` so that a
//! save never drops data another client wrote.

use super::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Vehicle row in the `cars` table
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Server-assigned identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Owner identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Manufacturer, e.g. `"Toyota"`
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub make: String,
    /// Model name, e.g. `"Camry"`
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub model: String,
    /// Licence plate
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub plate: String,
    /// Model year
    #[serde(default)]
    pub year: Option<i32>,
    /// Odometer reading in kilometres; the column is numeric, not integer
    #[serde(default)]
    pub mileage: Option<f64>,
    /// Base daily rate
    #[serde(default)]
    pub price1: Option<f64>,
    /// Set by the backend on insert
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Stamped on every save
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Remaining columns (additional rates, colour, VIN, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Vehicle {
    /// Creates an unsaved vehicle.
    #[must_use]
    pub fn new(make: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            make: make.into(),
            model: model.into(),
            ..Self::default()
        }
    }
}

impl Record for Vehicle {
    const TABLE: &'static str = "cars";
    const ORDER_BY: &'static str = "created_at";

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
    fn test_unknown_columns_survive_a_round_trip() {
        let row = json!({
            "id": "v1",
            "user_id": "u1",
            "make": "Toyota",
            "model": "Camry",
            "plate": "A123BC",
            "year": 2020,
            "mileage": 45000,
            "price1": 2000.0,
            "price2": 1800.0,
            "color": "white"
        });

        let vehicle: Vehicle = serde_json::from_value(row).unwrap();
        assert_eq!(vehicle.id(), Some("v1"));
        assert_eq!(vehicle.price1, Some(2000.0));
        assert_eq!(vehicle.extra.get("color"), Some(&json!("white")));

        let back = serde_json::to_value(&vehicle).unwrap();
        assert_eq!(back["price2"], json!(1800.0));
    }

    #[test]
    fn test_new_vehicle_serializes_without_id() {
        let vehicle = Vehicle::new("Toyota", "Camry");
        let value = serde_json::to_value(&vehicle).unwrap();
        assert!(value.get("id").is_none());
        assert!(value.get("user_id").is_none());
        assert_eq!(value["make"], "Toyota");
    }

    #[test]
    fn test_null_columns_and_fractional_mileage() {
        let row = json!({
            "id": "v1",
            "make": null,
            "model": "Rio",
            "plate": null,
            "year": null,
            "mileage": 45000.5,
            "price1": null
        });

        let vehicle: Vehicle = serde_json::from_value(row).unwrap();
        assert_eq!(vehicle.make, "");
        assert_eq!(vehicle.model, "Rio");
        assert_eq!(vehicle.plate, "");
        assert_eq!(vehicle.year, None);
        assert_eq!(vehicle.mileage, Some(45000.5));
    }
}
