//! Errors returned by the auth and tab services.

use thiserror::Error;

use crate::auth::token::TokenError;
use crate::constants::{
    MAX_PASSWORD_LENGTH, MAX_TAB_NAME_LENGTH, MAX_USERNAME_LENGTH, MIN_PASSWORD_LENGTH,
    MIN_USERNAME_LENGTH,
};
use crate::db::StoreError;
use crate::tabs::cipher::CipherError;

/// Coarse classification of [`Error`], used to pick HTTP statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input had the wrong shape; the caller can fix and retry.
    Validation,
    /// The name is already in use.
    Conflict,
    NotFound,
    /// Credentials or session were rejected.
    Auth,
    /// The store failed; carries only a message.
    Persistence,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "Username must be {}-{} characters using letters, numbers, underscores or hyphens",
        MIN_USERNAME_LENGTH,
        MAX_USERNAME_LENGTH
    )]
    InvalidUsername,
    #[error(
        "Password must be {}-{} characters",
        MIN_PASSWORD_LENGTH,
        MAX_PASSWORD_LENGTH
    )]
    InvalidPasswordFormat,
    #[error(
        "Tab name must be 1-{} characters using letters, numbers, spaces, underscores or hyphens",
        MAX_TAB_NAME_LENGTH
    )]
    InvalidTabName,
    #[error("Content is {size} bytes, the limit is {limit} bytes")]
    ContentTooLarge { size: usize, limit: usize },
    #[error("A site can have at most {limit} tabs")]
    TabLimitReached { limit: i64 },
    #[error("A site must keep at least one tab")]
    LastTab,

    #[error("Username already exists")]
    UsernameTaken,
    #[error("A tab with that name already exists")]
    TabNameTaken,

    #[error("Username not found")]
    UsernameNotFound,
    #[error("Site not found")]
    SiteNotFound,
    #[error("Tab not found")]
    TabNotFound,

    #[error("Invalid password")]
    InvalidPassword,
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("Token username mismatch")]
    UsernameMismatch,

    #[error("Failed to create site: {0}")]
    CreateFailed(String),
    #[error("Storage error: {0}")]
    Store(String),
    #[error(transparent)]
    Cipher(#[from] CipherError),
}

impl Error {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUsername
            | Self::InvalidPasswordFormat
            | Self::InvalidTabName
            | Self::ContentTooLarge { .. }
            | Self::TabLimitReached { .. }
            | Self::LastTab => ErrorKind::Validation,
            Self::UsernameTaken | Self::TabNameTaken => ErrorKind::Conflict,
            Self::UsernameNotFound | Self::SiteNotFound | Self::TabNotFound => {
                ErrorKind::NotFound
            }
            Self::InvalidPassword | Self::Token(_) | Self::UsernameMismatch => ErrorKind::Auth,
            Self::CreateFailed(_) | Self::Store(_) | Self::Cipher(_) => ErrorKind::Persistence,
        }
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict("username") => Self::UsernameTaken,
            StoreError::Conflict(_) => Self::TabNameTaken,
            StoreError::Backend(e) => Self::Store(format!("{e:#}")),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(Error::InvalidUsername.kind(), ErrorKind::Validation);
        assert_eq!(Error::UsernameTaken.kind(), ErrorKind::Conflict);
        assert_eq!(Error::SiteNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(Error::Token(TokenError::Expired).kind(), ErrorKind::Auth);
        assert_eq!(
            Error::CreateFailed("boom".to_string()).kind(),
            ErrorKind::Persistence
        );
    }

    #[test]
    fn test_store_conflicts_map_by_field() {
        assert!(matches!(
            Error::from(StoreError::Conflict("username")),
            Error::UsernameTaken
        ));
        assert!(matches!(
            Error::from(StoreError::Conflict("tab name")),
            Error::TabNameTaken
        ));
    }

    #[test]
    fn test_store_backend_keeps_message_only() {
        let err = Error::from(StoreError::Backend(anyhow::anyhow!("disk I/O error")));
        assert_eq!(err.to_string(), "Storage error: disk I/O error");
    }

    #[test]
    fn test_content_too_large_message() {
        let err = Error::ContentTooLarge { size: 11, limit: 10 };
        assert_eq!(err.to_string(), "Content is 11 bytes, the limit is 10 bytes");
    }
}
