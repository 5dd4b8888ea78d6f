//! Booking entity - a rental period for one vehicle.
use super::Record;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Booking row in the `bookings` table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    /// Server-assigned identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Owner identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Vehicle being rented
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub car_id: Option<String>,
    /// First rental day
    pub start_date: NaiveDate,
    /// Last rental day
    pub end_date: NaiveDate,
    /// Renter's name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    /// Stamped on every save
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Remaining columns
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Booking {
    /// Creates an unsaved booking.
    #[must_use]
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            id: None,
            user_id: None,
            car_id: None,
            start_date,
            end_date,
            client_name: None,
            updated_at: None,
            extra: Map::new(),
        }
    }
}

impl Record for Booking {
    const TABLE: &'static str = "bookings";
    const ORDER_BY: &'static str = "start_date";

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn owner_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}
