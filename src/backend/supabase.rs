//! Supabase implementation of [`Backend`].
//!
//! Auth goes through the GoTrue endpoints under `/auth/v1`, tables through
//! PostgREST under `/rest/v1`. The session lives in memory and, when a session
//! file is configured, is mirrored to disk so a restart can pick it up again.

use super::{Backend, Credentials, Filter, Query, Row, SignUp, Upsert};
use crate::{
    config::backend::BackendConfig,
    entities::{OWNER_COLUMN, Session, User},
    errors::{Error, Result},
};
use async_trait::async_trait;
use reqwest::{
    Method, RequestBuilder, Response, StatusCode, Url,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue},
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use std::{path::PathBuf, sync::Arc};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
const PREFER_RETURN: &str = "return=representation";
const PREFER_UPSERT: &str = "resolution=merge-duplicates,return=representation";

/// Supabase project client.
///
/// Cheap to clone; clones share the HTTP connection pool and the session.
#[derive(Clone)]
pub struct SupabaseBackend {
    inner: Arc<SupabaseInner>,
}

struct SupabaseInner {
    client: reqwest::Client,
    base_url: Url,
    anon_key: SecretString,
    redirect_url: Option<String>,
    session_file: Option<PathBuf>,
    session: RwLock<Option<Session>>,
}

impl SupabaseBackend {
    /// Creates a client for the project described by `config`.
    ///
    /// `redirect_url` is where confirmation emails sent on sign-up link back to.
    pub fn new(config: &BackendConfig, redirect_url: Option<String>) -> Result<Self> {
        let mut base = config.url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| Error::Config {
            message: format!("Invalid backend URL {base:?}: {e}"),
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(config.anon_key.expose_secret()).map_err(|e| Error::Config {
                message: format!("Anon key is not a valid header value: {e}"),
            })?,
        );
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: Arc::new(SupabaseInner {
                client,
                base_url,
                anon_key: config.anon_key.clone(),
                redirect_url,
                session_file: config.session_file.clone(),
                session: RwLock::new(None),
            }),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.inner.base_url.join(path).map_err(|e| Error::Config {
            message: format!("Cannot build URL for {path}: {e}"),
        })
    }

    fn table_url(&self, table: &str, filters: &[Filter], order_desc: Option<&str>) -> Result<Url> {
        let mut url = self.endpoint(&format!("rest/v1/{table}"))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", "*");
            for filter in filters {
                pairs.append_pair(&filter.column, &format!("eq.{}", filter.value));
            }
            if let Some(column) = order_desc {
                pairs.append_pair("order", &format!("{column}.desc"));
            }
        }
        Ok(url)
    }

    /// Bearer token for table requests: the user's access token, else the anon key.
    async fn bearer(&self) -> String {
        self.inner.session.read().await.as_ref().map_or_else(
            || self.inner.anon_key.expose_secret().to_string(),
            |session| session.access_token.clone(),
        )
    }

    async fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let bearer = self.bearer().await;
        self.inner
            .client
            .request(method, url)
            .header(AUTHORIZATION, format!("Bearer {bearer}"))
    }

    async fn token_grant(&self, grant_type: &str, body: Value) -> Result<Session> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);

        let response = self.inner.client.post(url).json(&body).send().await?;
        let session: Session = check(response).await?.json().await?;
        Ok(session.with_expiry_resolved())
    }

    /// Method, URL and `Prefer` value for an upsert.
    ///
    /// Updates PATCH the row matching the id and the owner stamped in the
    /// payload; inserts POST with the conflict target.
    fn upsert_target(&self, request: &Upsert) -> Result<(Method, Url, &'static str)> {
        if let Some(id) = &request.existing_id {
            let mut filters = vec![Filter::eq("id", id.as_str())];
            if let Some(owner) = request.row.get(OWNER_COLUMN).and_then(Value::as_str) {
                filters.push(Filter::eq(OWNER_COLUMN, owner));
            }
            let url = self.table_url(&request.table, &filters, None)?;
            return Ok((Method::PATCH, url, PREFER_RETURN));
        }

        let mut url = self.table_url(&request.table, &[], None)?;
        if let Some(target) = &request.on_conflict {
            url.query_pairs_mut().append_pair("on_conflict", target);
        }
        Ok((Method::POST, url, PREFER_UPSERT))
    }

    async fn store_session(&self, session: Option<Session>) -> Result<()> {
        if let Some(path) = &self.inner.session_file {
            match &session {
                Some(s) => tokio::fs::write(path, serde_json::to_vec(s)?).await?,
                None => match tokio::fs::remove_file(path).await {
                    Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
                    _ => {}
                },
            }
        }
        *self.inner.session.write().await = session;
        Ok(())
    }

    async fn load_persisted_session(&self) -> Result<Option<Session>> {
        let Some(path) = &self.inner.session_file else {
            return Ok(None);
        };
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice::<Session>(&bytes) {
            Ok(session) => {
                debug!("Restored session from {:?}", path);
                Ok(Some(session))
            }
            Err(e) => {
                warn!("Ignoring unreadable session file {:?}: {}", path, e);
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl Backend for SupabaseBackend {
    #[instrument(skip(self))]
    async fn get_session(&self) -> Result<Option<Session>> {
        let cached = self.inner.session.read().await.clone();
        let session = match cached {
            Some(session) => Some(session),
            None => self.load_persisted_session().await?,
        };
        let Some(session) = session else {
            return Ok(None);
        };

        if !session.is_expired() {
            *self.inner.session.write().await = Some(session.clone());
            return Ok(Some(session));
        }

        let Some(refresh_token) = session.refresh_token.clone() else {
            info!("Stored session expired and cannot be refreshed");
            self.store_session(None).await?;
            return Ok(None);
        };
        info!("Refreshing expired session for user {}", session.user.id);
        let refreshed = self
            .token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await?;
        self.store_session(Some(refreshed.clone())).await?;
        Ok(Some(refreshed))
    }

    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session> {
        let session = self
            .token_grant(
                "password",
                json!({
                    "email": credentials.email,
                    "password": credentials.password.expose_secret(),
                }),
            )
            .await?;
        self.store_session(Some(session.clone())).await?;
        Ok(session)
    }

    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    async fn sign_up(&self, credentials: &Credentials) -> Result<SignUp> {
        let mut url = self.endpoint("auth/v1/signup")?;
        if let Some(redirect) = &self.inner.redirect_url {
            url.query_pairs_mut().append_pair("redirect_to", redirect);
        }
        let body = json!({
            "email": credentials.email,
            "password": credentials.password.expose_secret(),
        });

        let response = self.inner.client.post(url).json(&body).send().await?;
        let value: Value = check(response).await?.json().await?;
        let answer = parse_sign_up(value)?;
        if let SignUp::Session(session) = &answer {
            self.store_session(Some(session.clone())).await?;
        }
        Ok(answer)
    }

    #[instrument(skip(self))]
    async fn sign_out(&self) -> Result<()> {
        let token = self
            .inner
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone());

        if let Some(token) = token {
            let url = self.endpoint("auth/v1/logout")?;
            let response = self
                .inner
                .client
                .post(url)
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .send()
                .await?;
            let status = response.status();
            // The session is already gone server-side for these.
            let already_gone = matches!(
                status,
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
            );
            if !already_gone {
                check(response).await?;
            }
        }

        self.store_session(None).await
    }

    #[instrument(skip(self), fields(table = %query.table))]
    async fn select(&self, query: &Query) -> Result<Vec<Row>> {
        let url = self.table_url(&query.table, &query.filters, query.order_desc.as_deref())?;
        let response = self.request(Method::GET, url).await.send().await?;
        let rows: Vec<Row> = check(response).await?.json().await?;
        debug!("Selected {} rows from {}", rows.len(), query.table);
        Ok(rows)
    }

    #[instrument(skip(self), fields(table = %query.table))]
    async fn select_single(&self, query: &Query) -> Result<Row> {
        let url = self.table_url(&query.table, &query.filters, query.order_desc.as_deref())?;
        let response = self
            .request(Method::GET, url)
            .await
            .header(ACCEPT, SINGLE_OBJECT)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    #[instrument(skip(self, request), fields(table = %request.table, update = request.existing_id.is_some()))]
    async fn upsert(&self, request: &Upsert) -> Result<Row> {
        let (method, url, prefer) = self.upsert_target(request)?;
        let response = self
            .request(method, url)
            .await
            .header("Prefer", prefer)
            .header(ACCEPT, SINGLE_OBJECT)
            .json(&request.row)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    #[instrument(skip(self, filters), fields(table = %table))]
    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<()> {
        let url = self.table_url(table, filters, None)?;
        let response = self.request(Method::DELETE, url).await.send().await?;
        check(response).await?;
        Ok(())
    }
}

/// Classifies a sign-up answer: a body carrying `access_token` is a session,
/// anything else is the (unconfirmed) user, either bare or under `user`.
fn parse_sign_up(value: Value) -> Result<SignUp> {
    if value.get("access_token").is_some() {
        let session: Session = serde_json::from_value(value)?;
        return Ok(SignUp::Session(session.with_expiry_resolved()));
    }
    let user_value = match value {
        Value::Object(mut map) if map.contains_key("user") => {
            map.remove("user").unwrap_or(Value::Null)
        }
        other => other,
    };
    let user: User = serde_json::from_value(user_value)?;
    Ok(SignUp::Pending(user))
}

/// Error body shapes used by GoTrue (`msg`, `error_description`, `error_code`)
/// and PostgREST (`code`, `message`).
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

fn parse_error_body(status: u16, body: &str) -> Error {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let code = parsed
        .error_code
        .or_else(|| match parsed.code {
            Some(Value::String(code)) => Some(code),
            _ => None,
        })
        .or_else(|| parsed.error.clone());
    let message = parsed
        .message
        .or(parsed.msg)
        .or(parsed.error_description)
        .or(parsed.error)
        .unwrap_or_default();

    Error::Backend {
        status: Some(status),
        code,
        message,
    }
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let error = parse_error_body(status.as_u16(), &body);
    debug!("Backend answered {}: {}", status, error);
    Err(error)
}
