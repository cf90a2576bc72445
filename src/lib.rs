//! SecureText Vault library.
//!
//! Password-protected, multi-tab text storage. Each site is a
//! username/password namespace holding ordered text tabs, accessed through
//! self-contained signed session tokens.

// Allow raw string hashes for safety - they're harmless and prevent issues if content changes
#![allow(clippy::needless_raw_string_hashes)]

pub mod auth;
pub mod components;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod export;
pub mod tabs;
pub mod web;

pub use error::{Error, ErrorKind, Result};
