//! Shared test utilities for `fleetdesk`.
//!
//! [`MemoryBackend`] stands in for the hosted service: tables are vectors of
//! JSON rows, accounts live in a list, and every call is recorded so tests can
//! assert exactly which requests went out (or that none did).

use crate::{
    app::FleetApp,
    backend::{Backend, Credentials, Filter, Query, Row, SignUp, Upsert},
    config::AppConfig,
    entities::{Session, User, UserIdentity},
    errors::{Error, NO_ROWS_CODE, Result, USER_ALREADY_EXISTS_CODE},
};
use async_trait::async_trait;
use chrono::Utc;
use secrecy::ExposeSecret;
use serde_json::Value;
use std::{
    cmp::Ordering,
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};
use tracing_subscriber::EnvFilter;

/// Installs a test-writer subscriber once; later calls are no-ops.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trace")),
        )
        .with_test_writer()
        .try_init();
}

/// A user with one email identity.
pub fn test_user(id: &str, email: &str) -> User {
    User {
        id: id.to_string(),
        email: Some(email.to_string()),
        identities: Some(vec![UserIdentity {
            id: Some(format!("identity-{id}")),
            provider: Some("email".to_string()),
        }]),
    }
}

/// An app wired to `backend` with default configuration.
pub fn test_app(backend: MemoryBackend) -> FleetApp<MemoryBackend> {
    FleetApp::new(backend, AppConfig::default())
}

/// One request received by [`MemoryBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    /// `get_session`
    GetSession,
    /// `sign_in_with_password`
    SignIn {
        /// Submitted email
        email: String,
    },
    /// `sign_up`
    SignUp {
        /// Submitted email
        email: String,
    },
    /// `sign_out`
    SignOut,
    /// `select`
    Select(Query),
    /// `select_single`
    SelectSingle(Query),
    /// `upsert`
    Upsert(Upsert),
    /// `delete`
    Delete {
        /// Table
        table: String,
        /// Filters
        filters: Vec<Filter>,
    },
}

struct Account {
    password: String,
    user: User,
}

#[derive(Default)]
struct MemoryState {
    tables: HashMap<String, Vec<Row>>,
    accounts: HashMap<String, Account>,
    session: Option<Session>,
    calls: Vec<Call>,
    failures: HashMap<String, (Option<String>, String)>,
    confirm_email: bool,
    next_id: u64,
}

impl MemoryState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn injected(&self, key: &str) -> Result<()> {
        match self.failures.get(key) {
            Some((code, message)) => Err(Error::backend(code.as_deref(), message.clone())),
            None => Ok(()),
        }
    }
}

/// In-memory [`Backend`] with call recording and failure injection.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    /// Empty backend: no tables, no accounts, no session.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers an account and returns its user.
    pub fn add_account(&self, id: &str, email: &str, password: &str) -> User {
        let user = test_user(id, email);
        self.lock().accounts.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        user
    }

    /// Starts with an existing session for `user`.
    pub fn set_session(&self, user: User) {
        self.lock().session = Some(Session {
            access_token: format!("token-{}", user.id),
            refresh_token: None,
            expires_in: Some(3600),
            expires_at: None,
            user,
        });
    }

    /// Makes sign-up behave as with email confirmation enabled.
    pub fn require_email_confirmation(&self) {
        self.lock().confirm_email = true;
    }

    /// Appends rows to `table`.
    pub fn seed(&self, table: &str, rows: Vec<Value>) {
        let mut state = self.lock();
        let entries = state.tables.entry(table.to_string()).or_default();
        entries.extend(rows.into_iter().filter_map(|row| match row {
            Value::Object(map) => Some(map),
            _ => None,
        }));
    }

    /// Current rows of `table`.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    /// Makes every later call of operation `key` fail.
    ///
    /// Keys are `sign_in`, `sign_up`, `sign_out`, `get_session`, or
    /// `<select|select_single|upsert|delete>:<table>`.
    pub fn fail(&self, key: &str, code: Option<&str>, message: &str) {
        self.lock().failures.insert(
            key.to_string(),
            (code.map(str::to_owned), message.to_string()),
        );
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Forgets recorded calls.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn session_for(user: User) -> Session {
        Session {
            access_token: format!("token-{}", user.id),
            refresh_token: Some(format!("refresh-{}", user.id)),
            expires_in: Some(3600),
            expires_at: None,
            user,
        }
        .with_expiry_resolved()
    }
}

fn matches_filters(row: &Row, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| {
        row.get(&filter.column).is_some_and(|value| match value {
            Value::String(s) => *s == filter.value,
            other => other.to_string() == filter.value,
        })
    })
}

fn compare_desc(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(x)), Some(Value::String(y))) => y.cmp(x),
        (Some(Value::Number(x)), Some(Value::Number(y))) => y
            .as_f64()
            .partial_cmp(&x.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn run_query(state: &MemoryState, query: &Query) -> Vec<Row> {
    let mut rows: Vec<Row> = state
        .tables
        .get(&query.table)
        .map(|rows| {
            rows.iter()
                .filter(|row| matches_filters(row, &query.filters))
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    if let Some(column) = &query.order_desc {
        rows.sort_by(|a, b| compare_desc(a.get(column), b.get(column)));
    }
    rows
}

fn no_rows() -> Error {
    Error::Backend {
        status: Some(406),
        code: Some(NO_ROWS_CODE.to_string()),
        message: "JSON object requested, multiple (or no) rows returned".to_string(),
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn get_session(&self) -> Result<Option<Session>> {
        let mut state = self.lock();
        state.calls.push(Call::GetSession);
        state.injected("get_session")?;
        Ok(state.session.clone())
    }

    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session> {
        let mut state = self.lock();
        state.calls.push(Call::SignIn {
            email: credentials.email.clone(),
        });
        state.injected("sign_in")?;

        let user = state
            .accounts
            .get(&credentials.email)
            .filter(|account| account.password == credentials.password.expose_secret())
            .map(|account| account.user.clone())
            .ok_or_else(|| Error::Backend {
                status: Some(400),
                code: Some("invalid_credentials".to_string()),
                message: "Invalid login credentials".to_string(),
            })?;

        let session = Self::session_for(user);
        state.session = Some(session.clone());
        Ok(session)
    }

    async fn sign_up(&self, credentials: &Credentials) -> Result<SignUp> {
        let mut state = self.lock();
        state.calls.push(Call::SignUp {
            email: credentials.email.clone(),
        });
        state.injected("sign_up")?;

        if let Some(existing) = state.accounts.get(&credentials.email) {
            if state.confirm_email {
                // Existing accounts are disguised as a user without identities.
                return Ok(SignUp::Pending(User {
                    identities: Some(Vec::new()),
                    ..existing.user.clone()
                }));
            }
            return Err(Error::Backend {
                status: Some(422),
                code: Some(USER_ALREADY_EXISTS_CODE.to_string()),
                message: "User already registered".to_string(),
            });
        }

        let id = state.next_id("user");
        let user = test_user(&id, &credentials.email);
        state.accounts.insert(
            credentials.email.clone(),
            Account {
                password: credentials.password.expose_secret().to_string(),
                user: user.clone(),
            },
        );

        if state.confirm_email {
            return Ok(SignUp::Pending(user));
        }
        let session = Self::session_for(user);
        state.session = Some(session.clone());
        Ok(SignUp::Session(session))
    }

    async fn sign_out(&self) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(Call::SignOut);
        state.injected("sign_out")?;
        state.session = None;
        Ok(())
    }

    async fn select(&self, query: &Query) -> Result<Vec<Row>> {
        let mut state = self.lock();
        state.calls.push(Call::Select(query.clone()));
        state.injected(&format!("select:{}", query.table))?;
        Ok(run_query(&state, query))
    }

    async fn select_single(&self, query: &Query) -> Result<Row> {
        let mut state = self.lock();
        state.calls.push(Call::SelectSingle(query.clone()));
        state.injected(&format!("select_single:{}", query.table))?;

        let mut rows = run_query(&state, query);
        if rows.len() == 1 {
            rows.pop().ok_or_else(no_rows)
        } else {
            Err(no_rows())
        }
    }

    async fn upsert(&self, request: &Upsert) -> Result<Row> {
        let mut state = self.lock();
        state.calls.push(Call::Upsert(request.clone()));
        state.injected(&format!("upsert:{}", request.table))?;

        let owner = request.row.get("user_id").cloned();
        let match_on: Option<(String, Value)> = match (&request.existing_id, &request.on_conflict) {
            (Some(id), _) => Some(("id".to_string(), Value::String(id.clone()))),
            (None, Some(column)) => request
                .row
                .get(column)
                .cloned()
                .map(|value| (column.clone(), value)),
            (None, None) => None,
        };

        let new_id = state.next_id("row");
        let table = state.tables.entry(request.table.clone()).or_default();

        let position = match_on.as_ref().and_then(|(column, value)| {
            table.iter().position(|row| {
                row.get(column) == Some(value)
                    && (request.existing_id.is_none() || row.get("user_id") == owner.as_ref())
            })
        });

        if let Some(index) = position {
            let stored = &mut table[index];
            for (key, value) in &request.row {
                stored.insert(key.clone(), value.clone());
            }
            return Ok(stored.clone());
        }
        if request.existing_id.is_some() {
            return Err(no_rows());
        }

        let mut row = request.row.clone();
        row.insert("id".to_string(), Value::String(new_id));
        row.entry("created_at".to_string())
            .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));
        table.push(row.clone());
        Ok(row)
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(Call::Delete {
            table: table.to_string(),
            filters: filters.to_vec(),
        });
        state.injected(&format!("delete:{table}"))?;

        if let Some(rows) = state.tables.get_mut(table) {
            rows.retain(|row| !matches_filters(row, filters));
        }
        Ok(())
    }
}
