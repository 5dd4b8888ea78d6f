//! Local data store - the signed-in identity plus one mirror per collection.
//!
//! Each load/save/delete is exactly one round trip to the backend followed by
//! reconciliation of the local copy. Nothing is retried and nothing is rolled
//! back: [`DataStore::load_all`] assigns the collections one after another, so
//! a failure part-way leaves the earlier ones freshly loaded.

use super::mirror::{Mirror, Placement};
use crate::{
    backend::{Backend, Filter, Query, Row, Upsert},
    entities::{
        Booking, OWNER_COLUMN, Record, Settings, SettingsRow, Transaction, User, Vehicle,
        settings::SETTINGS_TABLE,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, info, warn};

/// A record type with a mirror in [`DataStore`].
pub trait Mirrored: Record {
    /// The store's mirror for this type.
    fn mirror(store: &DataStore) -> &Mirror<Self>;
    /// Mutable access to the store's mirror for this type.
    fn mirror_mut(store: &mut DataStore) -> &mut Mirror<Self>;
}

impl Mirrored for Vehicle {
    fn mirror(store: &DataStore) -> &Mirror<Self> {
        &store.vehicles
    }
    fn mirror_mut(store: &mut DataStore) -> &mut Mirror<Self> {
        &mut store.vehicles
    }
}

impl Mirrored for Booking {
    fn mirror(store: &DataStore) -> &Mirror<Self> {
        &store.bookings
    }
    fn mirror_mut(store: &mut DataStore) -> &mut Mirror<Self> {
        &mut store.bookings
    }
}

impl Mirrored for Transaction {
    fn mirror(store: &DataStore) -> &Mirror<Self> {
        &store.transactions
    }
    fn mirror_mut(store: &mut DataStore) -> &mut Mirror<Self> {
        &mut store.transactions
    }
}

/// Row counts from a successful [`DataStore::load_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    /// Vehicles loaded
    pub vehicles: usize,
    /// Bookings loaded
    pub bookings: usize,
    /// Transactions loaded
    pub transactions: usize,
    /// Whether a settings row existed
    pub settings_found: bool,
}

/// In-memory mirror of everything the signed-in identity owns.
#[derive(Debug, Clone)]
pub struct DataStore {
    identity: Option<User>,
    vehicles: Mirror<Vehicle>,
    bookings: Mirror<Booking>,
    transactions: Mirror<Transaction>,
    settings: Settings,
    default_settings: Settings,
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl DataStore {
    /// Creates an empty store; `default_settings` apply until settings are loaded.
    #[must_use]
    pub fn new(default_settings: Settings) -> Self {
        Self {
            identity: None,
            vehicles: Mirror::default(),
            bookings: Mirror::default(),
            transactions: Mirror::default(),
            settings: default_settings.clone(),
            default_settings,
        }
    }

    /// Records the signed-in identity.
    ///
    /// Switching to a different identity drops everything loaded for the previous one.
    pub fn sign_in(&mut self, user: User) {
        if self.identity.as_ref().is_some_and(|current| current.id != user.id) {
            debug!("Identity changed, clearing local data");
            self.clear();
        }
        self.identity = Some(user);
    }

    /// Forgets the identity and empties every collection; settings return to defaults.
    pub fn clear(&mut self) {
        self.identity = None;
        self.vehicles.clear();
        self.bookings.clear();
        self.transactions.clear();
        self.settings = self.default_settings.clone();
    }

    /// The signed-in identity.
    #[must_use]
    pub const fn identity(&self) -> Option<&User> {
        self.identity.as_ref()
    }

    /// Vehicle mirror.
    #[must_use]
    pub const fn vehicles(&self) -> &Mirror<Vehicle> {
        &self.vehicles
    }

    /// Booking mirror.
    #[must_use]
    pub const fn bookings(&self) -> &Mirror<Booking> {
        &self.bookings
    }

    /// Transaction mirror.
    #[must_use]
    pub const fn transactions(&self) -> &Mirror<Transaction> {
        &self.transactions
    }

    /// Current settings.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Settings for local editing; persist with [`DataStore::save_settings`].
    pub const fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    fn owner_id(&self) -> Result<String> {
        self.identity
            .as_ref()
            .map(|user| user.id.clone())
            .ok_or(Error::NotAuthenticated)
    }

    /// Loads vehicles, bookings, transactions and settings for `owner_id`.
    ///
    /// A missing settings row is normal for a new identity and keeps the
    /// defaults. Any other failure aborts the load; collections assigned before
    /// the failing query keep their new contents.
    pub async fn load_all<B>(&mut self, backend: &B, owner_id: &str) -> Result<LoadSummary>
    where
        B: Backend + ?Sized,
    {
        info!("Loading data for user {}", owner_id);

        let vehicles = fetch_owned::<Vehicle, B>(backend, owner_id).await?;
        self.vehicles.replace_all(vehicles);

        let bookings = fetch_owned::<Booking, B>(backend, owner_id).await?;
        self.bookings.replace_all(bookings);

        let transactions = fetch_owned::<Transaction, B>(backend, owner_id).await?;
        self.transactions.replace_all(transactions);

        let query = Query::from(SETTINGS_TABLE).eq(OWNER_COLUMN, owner_id);
        let settings_found = match backend.select_single(&query).await {
            Ok(row) => {
                let row: SettingsRow = decode(SETTINGS_TABLE, row)?;
                self.settings.merge_row(row);
                true
            }
            Err(e) if e.is_not_found() => {
                debug!("No settings row for {}, keeping defaults", owner_id);
                false
            }
            Err(e) => {
                error!("Failed to load settings: {}", e);
                return Err(e);
            }
        };

        let summary = LoadSummary {
            vehicles: self.vehicles.len(),
            bookings: self.bookings.len(),
            transactions: self.transactions.len(),
            settings_found,
        };
        info!(
            "Data loaded: {} vehicles, {} bookings, {} transactions",
            summary.vehicles, summary.bookings, summary.transactions
        );
        Ok(summary)
    }

    /// Saves `record` for the signed-in identity and folds the stored row into the mirror.
    ///
    /// The record's `id` never travels in the payload: without one the row is
    /// inserted, with one the backend updates that row (scoped to the owner).
    /// The owner and an `updated_at` timestamp are stamped on every save.
    pub async fn save<T, B>(&mut self, backend: &B, record: T) -> Result<T>
    where
        T: Mirrored,
        B: Backend + ?Sized,
    {
        let owner_id = self.owner_id()?;
        let Value::Object(mut row) = serde_json::to_value(&record)? else {
            return Err(Error::MalformedRow {
                table: T::TABLE,
                message: "record did not serialize to an object".to_string(),
            });
        };

        let existing_id = row
            .remove("id")
            .and_then(|id| id.as_str().map(str::to_owned));
        row.insert(OWNER_COLUMN.to_string(), Value::String(owner_id));
        row.insert(
            "updated_at".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );

        let request = Upsert {
            table: T::TABLE.to_string(),
            row,
            existing_id,
            on_conflict: None,
        };
        let stored = backend
            .upsert(&request)
            .await
            .inspect_err(|e| error!("Failed to save {} row: {}", T::TABLE, e))?;

        let saved: T = decode(T::TABLE, stored)?;
        if saved.id().is_none() {
            return Err(Error::MalformedRow {
                table: T::TABLE,
                message: "stored row has no id".to_string(),
            });
        }

        match T::mirror_mut(self).reconcile(saved.clone()) {
            Placement::Replaced(index) => debug!("Updated {} row at {}", T::TABLE, index),
            Placement::Prepended => debug!("Added {} row", T::TABLE),
        }
        Ok(saved)
    }

    /// Deletes the row `id` owned by the signed-in identity and drops it from the mirror.
    ///
    /// Returns the mirrored entry that was removed, if there was one.
    pub async fn delete<T, B>(&mut self, backend: &B, id: &str) -> Result<Option<T>>
    where
        T: Mirrored,
        B: Backend + ?Sized,
    {
        let owner_id = self.owner_id()?;
        let filters = [Filter::eq("id", id), Filter::eq(OWNER_COLUMN, owner_id)];
        backend
            .delete(T::TABLE, &filters)
            .await
            .inspect_err(|e| error!("Failed to delete {} row {}: {}", T::TABLE, id, e))?;

        Ok(T::mirror_mut(self).remove(id))
    }

    /// Writes the full settings row, overwriting whatever the backend holds.
    pub async fn save_settings<B>(&self, backend: &B) -> Result<()>
    where
        B: Backend + ?Sized,
    {
        let owner_id = self.owner_id()?;
        let Value::Object(row) = serde_json::to_value(self.settings.to_row(&owner_id))? else {
            return Err(Error::MalformedRow {
                table: SETTINGS_TABLE,
                message: "settings did not serialize to an object".to_string(),
            });
        };

        let request = Upsert {
            table: SETTINGS_TABLE.to_string(),
            row,
            existing_id: None,
            on_conflict: Some(OWNER_COLUMN.to_string()),
        };
        backend
            .upsert(&request)
            .await
            .inspect_err(|e| error!("Failed to save settings: {}", e))?;
        Ok(())
    }

    /// Saves a vehicle.
    pub async fn save_vehicle<B: Backend + ?Sized>(
        &mut self,
        backend: &B,
        vehicle: Vehicle,
    ) -> Result<Vehicle> {
        self.save(backend, vehicle).await
    }

    /// Deletes a vehicle.
    pub async fn delete_vehicle<B: Backend + ?Sized>(
        &mut self,
        backend: &B,
        id: &str,
    ) -> Result<Option<Vehicle>> {
        self.delete(backend, id).await
    }

    /// Saves a booking.
    pub async fn save_booking<B: Backend + ?Sized>(
        &mut self,
        backend: &B,
        booking: Booking,
    ) -> Result<Booking> {
        self.save(backend, booking).await
    }

    /// Deletes a booking.
    pub async fn delete_booking<B: Backend + ?Sized>(
        &mut self,
        backend: &B,
        id: &str,
    ) -> Result<Option<Booking>> {
        self.delete(backend, id).await
    }

    /// Saves a transaction.
    pub async fn save_transaction<B: Backend + ?Sized>(
        &mut self,
        backend: &B,
        transaction: Transaction,
    ) -> Result<Transaction> {
        self.save(backend, transaction).await
    }

    /// Deletes a transaction.
    pub async fn delete_transaction<B: Backend + ?Sized>(
        &mut self,
        backend: &B,
        id: &str,
    ) -> Result<Option<Transaction>> {
        self.delete(backend, id).await
    }
}

async fn fetch_owned<T, B>(backend: &B, owner_id: &str) -> Result<Vec<T>>
where
    T: Record,
    B: Backend + ?Sized,
{
    let query = Query::from(T::TABLE)
        .eq(OWNER_COLUMN, owner_id)
        .order_desc(T::ORDER_BY);
    let rows = backend
        .select(&query)
        .await
        .inspect_err(|e| error!("Failed to load {}: {}", T::TABLE, e))?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let record: T = decode(T::TABLE, row)?;
        if record.owner_id().is_some_and(|owner| owner != owner_id) {
            warn!("Dropping {} row owned by another user", T::TABLE);
            continue;
        }
        records.push(record);
    }
    Ok(records)
}

fn decode<T: serde::de::DeserializeOwned>(table: &'static str, row: Row) -> Result<T> {
    serde_json::from_value(Value::Object(row)).map_err(|e| Error::MalformedRow {
        table,
        message: e.to_string(),
    })
}
