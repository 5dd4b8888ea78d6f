//! Entity module - serde models for the rows exchanged with the remote backend.
//! Column names follow the backend's snake_case schema; every owned row carries
//! a `user_id` scoping it to one identity.

/// Rental periods
pub mod booking;
/// Users and sessions from the auth endpoints
pub mod identity;
/// Per-identity settings singleton
pub mod settings;
/// Income and expense records
pub mod transaction;
/// Fleet vehicles
pub mod vehicle;

use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};

pub use booking::Booking;
pub use identity::{Session, User, UserIdentity};
pub use settings::{Settings, SettingsRow};
pub use transaction::Transaction;
pub use vehicle::Vehicle;

/// Column holding the owner identifier on every table.
pub const OWNER_COLUMN: &str = "user_id";

/// A row type stored in one backend table and mirrored locally.
pub trait Record: Serialize + DeserializeOwned + Clone {
    /// Backend table name
    const TABLE: &'static str;
    /// Column the authoritative load is ordered by (descending)
    const ORDER_BY: &'static str;

    /// Server-assigned identifier; `None` for rows not yet persisted.
    fn id(&self) -> Option<&str>;

    /// Owner identifier stamped on save.
    fn owner_id(&self) -> Option<&str>;
}

/// Reads a nullable column into a non-optional field, mapping `null` to the
/// type's default. `#[serde(default)]` alone only covers absent columns.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
