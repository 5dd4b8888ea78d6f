//! Identity and session models returned by the auth endpoints.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An authenticated user as reported by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Owner identifier used to scope every row
    pub id: String,
    /// Email the account was registered with
    #[serde(default)]
    pub email: Option<String>,
    /// Linked sign-in identities; an empty list on sign-up means the email was taken
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identities: Option<Vec<UserIdentity>>,
}

impl User {
    /// Email for display, empty when the backend did not return one.
    #[must_use]
    pub fn email_or_empty(&self) -> &str {
        self.email.as_deref().unwrap_or_default()
    }
}

/// One sign-in identity linked to a user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Identity id
    #[serde(default)]
    pub id: Option<String>,
    /// Provider name, e.g. `"email"`
    #[serde(default)]
    pub provider: Option<String>,
}

/// Server-issued proof of authentication.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token sent with table requests
    pub access_token: String,
    /// Token used to obtain a fresh access token
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Unix timestamp after which the access token is stale
    #[serde(default)]
    pub expires_at: Option<i64>,
    /// Signed-in user
    pub user: User,
}

impl Session {
    /// Fills `expires_at` from `expires_in` when the server only sent the latter.
    #[must_use]
    pub fn with_expiry_resolved(mut self) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = self
                .expires_in
                .map(|secs| Utc::now().timestamp().saturating_add(secs));
        }
        self
    }

    /// True when the access token expired (with a small safety margin).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        const MARGIN_SECS: i64 = 10;
        self.expires_at
            .is_some_and(|at| at - MARGIN_SECS <= Utc::now().timestamp())
    }
}

// Tokens stay out of logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_password_grant_response() {
        let json = r#"{
            "access_token": "jwt",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "r1",
            "user": {
                "id": "u1",
                "aud": "authenticated",
                "email": "a@b.com",
                "identities": [{"id": "i1", "provider": "email"}]
            }
        }"#;

        let session: Session = serde_json::from_str(json).unwrap();
        let session = session.with_expiry_resolved();
        assert_eq!(session.user.id, "u1");
        assert_eq!(session.user.email_or_empty(), "a@b.com");
        assert!(session.expires_at.is_some());
        assert!(!session.is_expired());
    }

    #[test]
    fn test_expired_session() {
        let session = Session {
            access_token: "jwt".to_string(),
            refresh_token: None,
            expires_in: None,
            expires_at: Some(Utc::now().timestamp() - 60),
            user: User {
                id: "u1".to_string(),
                email: None,
                identities: None,
            },
        };
        assert!(session.is_expired());
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let session = Session {
            access_token: "very-secret".to_string(),
            refresh_token: Some("also-secret".to_string()),
            expires_in: None,
            expires_at: None,
            user: User {
                id: "u1".to_string(),
                email: None,
                identities: None,
            },
        };
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("very-secret"));
        assert!(!rendered.contains("also-secret"));
    }
}
