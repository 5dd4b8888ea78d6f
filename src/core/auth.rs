//! Credential validation and sign-up answer classification.
//!
//! These checks run before any network call; a failure here means the
//! backend is never contacted.

use crate::{
    backend::{Credentials, SignUp},
    errors::{Error, Result, USER_ALREADY_EXISTS_CODE},
};
use secrecy::{ExposeSecret, SecretString};

/// Shortest password the sign-up form accepts.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Raw contents of the email/password form.
#[derive(Debug, Clone)]
pub struct AuthForm {
    /// Email field as typed
    pub email: String,
    /// Password field as typed
    pub password: SecretString,
}

impl AuthForm {
    /// Builds a form from field values.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// Checks the login form: both fields must be non-empty (email after trimming).
pub fn validate_login(form: &AuthForm) -> Result<Credentials> {
    let email = form.email.trim();
    if email.is_empty() || form.password.expose_secret().is_empty() {
        return Err(Error::validation("email", "Enter email and password"));
    }
    Ok(Credentials {
        email: email.to_string(),
        password: form.password.clone(),
    })
}

/// Checks the sign-up form: the login rules plus a minimum password length.
pub fn validate_signup(form: &AuthForm) -> Result<Credentials> {
    let credentials = validate_login(form)?;
    if credentials.password.expose_secret().chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::validation(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    Ok(credentials)
}

/// True when a successful sign-up answer actually means "email already registered".
///
/// With email confirmation enabled the backend hides existing accounts by
/// answering with a user that has no linked identities. That shape is the only
/// signal available there, so it is checked here and nowhere else.
#[must_use]
pub fn signals_existing_account(answer: &SignUp) -> bool {
    answer
        .user()
        .identities
        .as_ref()
        .is_some_and(Vec::is_empty)
}

/// True when a sign-up error is the backend's explicit "already exists" code.
#[must_use]
pub fn is_existing_account_error(error: &Error) -> bool {
    error.code() == Some(USER_ALREADY_EXISTS_CODE)
}
