use std::sync::LazyLock;

use regex::Regex;

use crate::constants::{
    MAX_PASSWORD_LENGTH, MAX_USERNAME_LENGTH, MIN_PASSWORD_LENGTH, MIN_USERNAME_LENGTH,
};
use crate::db::SiteStore;
use crate::error::{Error, Result};

/// Usernames double as site URLs, so only URL-safe characters are allowed.
static USERNAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]+$").expect("username pattern is valid")
});

/// Check length and charset of a username without touching the store.
pub fn validate_username_shape(username: &str) -> Result<()> {
    let len = username.chars().count();
    if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&len) {
        return Err(Error::InvalidUsername);
    }
    if !USERNAME_PATTERN.is_match(username) {
        return Err(Error::InvalidUsername);
    }
    Ok(())
}

/// Check a username's shape and that no active site already uses it.
///
/// The store's unique index remains the final arbiter; two signups racing
/// past this check are resolved there.
pub async fn validate_username(store: &dyn SiteStore, username: &str) -> Result<()> {
    validate_username_shape(username)?;

    if store.find_site_by_username(username).await?.is_some() {
        return Err(Error::UsernameTaken);
    }

    Ok(())
}

/// Check password length. No composition rules are enforced.
pub fn validate_password(password: &str) -> Result<()> {
    let len = password.chars().count();
    if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&len) {
        return Err(Error::InvalidPasswordFormat);
    }
    Ok(())
}
