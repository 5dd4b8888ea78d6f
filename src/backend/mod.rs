//! Remote backend seam.
//!
//! The hosted service offers two things: password-based sessions and a generic
//! table interface (filtered/ordered select, upsert, delete). [`Backend`]
//! captures exactly that surface so the data store and the auth controller can
//! run against the real HTTP client or an in-memory double.

/// HTTP client for a Supabase project (GoTrue auth + PostgREST tables)
pub mod supabase;

use crate::{
    entities::{Session, User},
    errors::Result,
};
use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::{Map, Value};

pub use supabase::SupabaseBackend;

/// A table row as exchanged with the backend.
pub type Row = Map<String, Value>;

/// Email/password pair submitted to the auth endpoints.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Account email, already trimmed
    pub email: String,
    /// Account password
    pub password: SecretString,
}

/// Answer to a sign-up request.
///
/// With email confirmation enabled the backend returns only the user; with
/// auto-confirm it returns a full session.
#[derive(Debug, Clone)]
pub enum SignUp {
    /// Account created and signed in
    Session(Session),
    /// Account created (or already present), confirmation pending
    Pending(User),
}

impl SignUp {
    /// The user the answer refers to.
    #[must_use]
    pub const fn user(&self) -> &User {
        match self {
            Self::Session(session) => &session.user,
            Self::Pending(user) => user,
        }
    }
}

/// Equality filter on one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    /// Column name
    pub column: String,
    /// Value the column must equal
    pub value: String,
}

impl Filter {
    /// `column = value`
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

/// Select request against one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Table name
    pub table: String,
    /// Equality filters, all of which must hold
    pub filters: Vec<Filter>,
    /// Column to sort by, descending
    pub order_desc: Option<String>,
}

impl Query {
    /// Selects every row of `table`.
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filters: Vec::new(),
            order_desc: None,
        }
    }

    /// Adds an equality filter.
    #[must_use]
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    /// Orders the result by `column`, newest/largest first.
    #[must_use]
    pub fn order_desc(mut self, column: impl Into<String>) -> Self {
        self.order_desc = Some(column.into());
        self
    }
}

/// Insert-or-update request returning the canonical row.
#[derive(Debug, Clone, PartialEq)]
pub struct Upsert {
    /// Table name
    pub table: String,
    /// Column values to write; never contains the row id
    pub row: Row,
    /// Id of the persisted row this write updates; `None` inserts a new row
    pub existing_id: Option<String>,
    /// Columns forming the conflict target for merge-on-insert
    pub on_conflict: Option<String>,
}

/// Operations the application needs from the remote service.
///
/// Every method is one network round trip. Implementations report
/// backend-side failures as [`Error::Backend`](crate::errors::Error::Backend)
/// and use the `PGRST116` code when a single-row select finds nothing.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Returns the current session, if one exists.
    async fn get_session(&self) -> Result<Option<Session>>;

    /// Signs in with email and password.
    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session>;

    /// Registers a new account.
    async fn sign_up(&self, credentials: &Credentials) -> Result<SignUp>;

    /// Ends the current session.
    async fn sign_out(&self) -> Result<()>;

    /// Runs a select returning every matching row.
    async fn select(&self, query: &Query) -> Result<Vec<Row>>;

    /// Runs a select that must match exactly one row.
    async fn select_single(&self, query: &Query) -> Result<Row>;

    /// Inserts or updates one row and returns it as stored.
    async fn upsert(&self, request: &Upsert) -> Result<Row>;

    /// Deletes every row matching all `filters`.
    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<()>;
}
