//! Presentation layer - the page regions the application writes into, and the
//! views rendered into them.
//!
//! [`Page`] models the page as plain data: each region holds the HTML (or
//! text) last written to it and is replaced wholesale on every render.

/// HTML views rendered with askama templates
pub mod views;

/// Current contents and visibility of every page region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// `main-content`: the main view's HTML
    pub main_content: String,
    /// `cars-grid`: present only while the main application view is mounted
    pub cars_grid: Option<String>,
    /// `user-email`: text shown inside `user-info`
    pub user_email: String,
    /// Whether `user-info` is visible
    pub user_info_visible: bool,
    /// Whether `auth-buttons` is visible
    pub auth_buttons_visible: bool,
    /// `auth-error`: inline form error, hidden when `None`
    pub auth_error: Option<String>,
    /// Whether the sign-in dialog is open
    pub auth_modal_open: bool,
    /// Messages waiting to be shown to the user
    pub notices: Vec<String>,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            main_content: String::new(),
            cars_grid: None,
            user_email: String::new(),
            user_info_visible: false,
            auth_buttons_visible: true,
            auth_error: None,
            auth_modal_open: false,
            notices: Vec::new(),
        }
    }
}

impl Page {
    /// Shows the signed-in header for `email`.
    pub fn show_signed_in(&mut self, email: &str) {
        self.user_email = email.to_string();
        self.user_info_visible = true;
        self.auth_buttons_visible = false;
    }

    /// Shows the signed-out header and the post-logout view.
    pub fn show_signed_out(&mut self, main_content: String) {
        self.user_email.clear();
        self.user_info_visible = false;
        self.auth_buttons_visible = true;
        self.cars_grid = None;
        self.main_content = main_content;
    }

    /// Mounts the main application view.
    pub fn show_main(&mut self, main_content: String, cars_grid: String) {
        self.main_content = main_content;
        self.cars_grid = Some(cars_grid);
    }

    /// True while the main application view is mounted.
    #[must_use]
    pub const fn main_mounted(&self) -> bool {
        self.cars_grid.is_some()
    }

    /// Shows an inline auth form error.
    pub fn set_auth_error(&mut self, message: impl Into<String>) {
        self.auth_error = Some(message.into());
    }

    /// Hides the inline auth form error.
    pub fn clear_auth_error(&mut self) {
        self.auth_error = None;
    }

    /// Opens the sign-in dialog with a clean error region.
    pub fn open_auth_modal(&mut self) {
        self.auth_modal_open = true;
        self.auth_error = None;
    }

    /// Closes the sign-in dialog.
    pub fn close_auth_modal(&mut self) {
        self.auth_modal_open = false;
    }

    /// Queues a message for the user.
    pub fn notify(&mut self, message: impl Into<String>) {
        self.notices.push(message.into());
    }

    /// Drains queued messages.
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_visibility_toggles() {
        let mut page = Page::default();
        assert!(page.auth_buttons_visible);
        assert!(!page.user_info_visible);

        page.show_signed_in("a@b.com");
        assert!(page.user_info_visible);
        assert!(!page.auth_buttons_visible);
        assert_eq!(page.user_email, "a@b.com");

        page.show_main("<main/>".to_string(), "<grid/>".to_string());
        assert!(page.main_mounted());

        page.show_signed_out("<bye/>".to_string());
        assert!(!page.user_info_visible);
        assert!(page.auth_buttons_visible);
        assert!(!page.main_mounted());
        assert_eq!(page.main_content, "<bye/>");
    }

    #[test]
    fn test_notices_drain() {
        let mut page = Page::default();
        page.notify("one");
        page.notify("two");
        assert_eq!(page.take_notices(), vec!["one", "two"]);
        assert!(page.take_notices().is_empty());
    }
}
