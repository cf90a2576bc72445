//! Shared limits and names used across the application.

pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 50;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 100;

pub const MAX_TAB_NAME_LENGTH: usize = 50;
pub const MAX_TABS_PER_SITE: i64 = 20;

/// Name of the tab every new site starts with.
pub const DEFAULT_TAB_NAME: &str = "Main";

/// Cookie carrying the session token in the web UI.
pub const SESSION_COOKIE_NAME: &str = "vault_session";
