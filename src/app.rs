//! Application state and the authentication controller.
//!
//! [`FleetApp`] owns everything the running front end needs: the backend
//! client, the local data store, the page regions and the configuration.
//! Operations take `&mut self`, so only one of them can touch the store at a
//! time. Every operation turns its own errors into page text (an inline auth
//! error or a notice) and also hands the `Result` back to the caller.

use crate::{
    backend::{Backend, SignUp},
    config::AppConfig,
    core::{
        auth::{
            AuthForm, is_existing_account_error, signals_existing_account, validate_login,
            validate_signup,
        },
        store::{DataStore, Mirrored},
    },
    entities::{Settings, User},
    errors::{Error, Result},
    presentation::{
        Page,
        views::{render_main_app, render_signed_out},
    },
};
use tracing::{debug, error, info, warn};

/// Shown when a failed login carries no server message.
pub const LOGIN_FALLBACK: &str = "Login failed";
/// Shown when a failed sign-up carries no server message.
pub const SIGNUP_FALLBACK: &str = "Sign-up failed";
/// Notice after a successful sign-up.
pub const SIGNUP_NOTICE: &str =
    "Registration successful! Check your email for a confirmation link (if enabled).";

/// The running application.
pub struct FleetApp<B> {
    backend: B,
    store: DataStore,
    page: Page,
    config: AppConfig,
}

impl<B: Backend> FleetApp<B> {
    /// Creates a signed-out application with an empty store.
    pub fn new(backend: B, config: AppConfig) -> Self {
        Self {
            backend,
            store: DataStore::new(config.settings.to_settings()),
            page: Page::default(),
            config,
        }
    }

    /// The backend client.
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// The local data store.
    pub const fn store(&self) -> &DataStore {
        &self.store
    }

    /// Current page regions.
    pub const fn page(&self) -> &Page {
        &self.page
    }

    /// Mutable page access, for dialogs and draining notices.
    pub const fn page_mut(&mut self) -> &mut Page {
        &mut self.page
    }

    /// Loaded configuration.
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Resumes an existing session, if the backend has one.
    ///
    /// Errors are logged and reported as `false`; the user never sees them.
    pub async fn check_session(&mut self) -> bool {
        match self.backend.get_session().await {
            Ok(Some(session)) => {
                info!("Resuming session for {}", session.user.email_or_empty());
                self.handle_authenticated(session.user).await;
                true
            }
            Ok(None) => {
                debug!("No existing session");
                false
            }
            Err(e) => {
                warn!("Session check failed: {}", e);
                false
            }
        }
    }

    /// Signs in with the form's email and password.
    ///
    /// Empty fields fail locally without contacting the backend.
    pub async fn login(&mut self, form: &AuthForm) -> Result<()> {
        self.page.clear_auth_error();
        let credentials =
            validate_login(form).inspect_err(|e| self.show_auth_error(e, LOGIN_FALLBACK))?;

        match self.backend.sign_in_with_password(&credentials).await {
            Ok(session) => {
                info!("Signed in as {}", credentials.email);
                self.handle_authenticated(session.user).await;
                self.page.close_auth_modal();
                Ok(())
            }
            Err(e) => {
                error!("Login failed for {}: {}", credentials.email, e);
                self.show_auth_error(&e, LOGIN_FALLBACK);
                Err(e)
            }
        }
    }

    /// Registers a new account and signs it in.
    ///
    /// An answer meaning "this email is already registered" becomes an
    /// [`Error::AccountExists`] field error instead of a success.
    pub async fn signup(&mut self, form: &AuthForm) -> Result<()> {
        self.page.clear_auth_error();
        let credentials =
            validate_signup(form).inspect_err(|e| self.show_auth_error(e, SIGNUP_FALLBACK))?;

        let answer = match self.backend.sign_up(&credentials).await {
            Ok(answer) => answer,
            Err(e) if is_existing_account_error(&e) => {
                return Err(self.account_exists(credentials.email));
            }
            Err(e) => {
                error!("Sign-up failed for {}: {}", credentials.email, e);
                self.show_auth_error(&e, SIGNUP_FALLBACK);
                return Err(e);
            }
        };
        if signals_existing_account(&answer) {
            return Err(self.account_exists(credentials.email));
        }

        info!("Registered {}", credentials.email);
        self.page.notify(SIGNUP_NOTICE);
        self.page.close_auth_modal();
        let user = match answer {
            SignUp::Session(session) => session.user,
            SignUp::Pending(user) => user,
        };
        self.handle_authenticated(user).await;
        Ok(())
    }

    /// Signs out and forgets everything loaded for the identity.
    ///
    /// When the backend refuses, nothing local changes.
    pub async fn logout(&mut self) -> Result<()> {
        if let Err(e) = self.backend.sign_out().await {
            error!("Logout failed: {}", e);
            self.page
                .notify(format!("Logout failed: {}", e.user_message("unknown error")));
            return Err(e);
        }

        info!("Signed out");
        self.store.clear();
        let view = render_signed_out().unwrap_or_else(|e| {
            error!("Failed to render signed-out view: {}", e);
            String::new()
        });
        self.page.show_signed_out(view);
        Ok(())
    }

    /// Saves a record for the signed-in identity and re-renders.
    pub async fn save<T: Mirrored>(&mut self, record: T) -> Result<T> {
        match self.store.save(&self.backend, record).await {
            Ok(saved) => {
                self.refresh_view();
                Ok(saved)
            }
            Err(e) => {
                self.page.notify(format!(
                    "Failed to save {}: {}",
                    T::TABLE,
                    e.user_message("unknown error")
                ));
                Err(e)
            }
        }
    }

    /// Deletes a record of the signed-in identity and re-renders.
    pub async fn delete<T: Mirrored>(&mut self, id: &str) -> Result<Option<T>> {
        match self.store.delete::<T, B>(&self.backend, id).await {
            Ok(removed) => {
                self.refresh_view();
                Ok(removed)
            }
            Err(e) => {
                self.page.notify(format!(
                    "Failed to delete {}: {}",
                    T::TABLE,
                    e.user_message("unknown error")
                ));
                Err(e)
            }
        }
    }

    /// Edits the settings and persists them; a failed save restores the previous values.
    pub async fn update_settings(&mut self, edit: impl FnOnce(&mut Settings)) -> Result<()> {
        let previous = self.store.settings().clone();
        edit(self.store.settings_mut());

        if let Err(e) = self.store.save_settings(&self.backend).await {
            *self.store.settings_mut() = previous;
            self.page.notify(format!(
                "Failed to save settings: {}",
                e.user_message("unknown error")
            ));
            return Err(e);
        }
        Ok(())
    }

    /// Stores the identity, shows the signed-in header and loads its data.
    ///
    /// The main view is mounted only when the load succeeds; otherwise the page
    /// stays signed in without data and a notice says why.
    async fn handle_authenticated(&mut self, user: User) {
        let owner_id = user.id.clone();
        let email = user.email_or_empty().to_string();
        self.store.sign_in(user);
        self.page.show_signed_in(&email);

        if let Err(e) = self.store.load_all(&self.backend, &owner_id).await {
            self.page.notify(format!(
                "Failed to load data: {}",
                e.user_message("unknown error")
            ));
            return;
        }

        if let Err(e) = self.show_main_app() {
            error!("Failed to render main view: {}", e);
            self.page.notify(e.user_message("Failed to render"));
        }
    }

    fn show_main_app(&mut self) -> Result<()> {
        let view = render_main_app(&self.store, &self.config.display)?;
        self.page.show_main(view.main_content, view.cars_grid);
        Ok(())
    }

    fn refresh_view(&mut self) {
        if !self.page.main_mounted() {
            return;
        }
        if let Err(e) = self.show_main_app() {
            error!("Failed to re-render main view: {}", e);
        }
    }

    fn show_auth_error(&mut self, error: &Error, fallback: &str) {
        self.page.set_auth_error(error.user_message(fallback));
    }

    fn account_exists(&mut self, email: String) -> Error {
        warn!("Sign-up for already registered email {}", email);
        let error = Error::AccountExists { email };
        self.show_auth_error(&error, SIGNUP_FALLBACK);
        error
    }
}
