//! Self-contained session tokens.
//!
//! A token is five fields joined by `.`:
//!
//! ```text
//! <session id hex>.<site id>.<username>.<expiry RFC 3339>.<signature hex>
//! ```
//!
//! None of the fields can contain the delimiter: the session id and
//! signature are hex, the site id is decimal, usernames are restricted to
//! `[A-Za-z0-9_-]` and the expiry is written with whole seconds and a `Z`
//! suffix. The signature is HMAC-SHA256 over the length-prefixed first four
//! fields, keyed with the server secret, and is checked in constant time.
//!
//! Tokens are not stored anywhere; they die by expiry or secret rotation.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use thiserror::Error;

use super::credentials::validate_username_shape;

type HmacSha256 = Hmac<Sha256>;

pub const TOKEN_DELIMITER: char = '.';

/// Random bytes in a session id (256 bits).
const SESSION_ID_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Invalid token format")]
    Malformed,
    #[error("Session expired")]
    Expired,
    #[error("Invalid token signature")]
    BadSignature,
    /// A field cannot be encoded without colliding with the delimiter.
    #[error("Cannot encode {0} into a session token")]
    InvalidClaim(&'static str),
}

/// The verified contents of a session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    pub session_id: String,
    pub site_id: i64,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

/// Build a signed session token for `site_id`/`username` valid for `ttl`
/// from `now`.
pub fn issue(
    site_id: i64,
    username: &str,
    secret: &[u8],
    now: DateTime<Utc>,
    ttl: Duration,
) -> Result<String, TokenError> {
    validate_username_shape(username).map_err(|_| TokenError::InvalidClaim("username"))?;

    let expires_at = now
        .checked_add_signed(ttl)
        .ok_or(TokenError::InvalidClaim("expiry"))?;
    let expires_str = expires_at.to_rfc3339_opts(SecondsFormat::Secs, true);

    let session_id = generate_session_id();
    let site_str = site_id.to_string();

    let mac = signing_mac(
        secret,
        [
            session_id.as_str(),
            site_str.as_str(),
            username,
            expires_str.as_str(),
        ],
    );
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok([
        session_id.as_str(),
        site_str.as_str(),
        username,
        expires_str.as_str(),
        signature.as_str(),
    ]
    .join(&TOKEN_DELIMITER.to_string()))
}

/// Parse and verify a session token.
///
/// Expiry is checked before the signature, so a stale token always reports
/// [`TokenError::Expired`].
pub fn validate(
    token: &str,
    secret: &[u8],
    now: DateTime<Utc>,
) -> Result<SessionClaims, TokenError> {
    let parts: Vec<&str> = token.split(TOKEN_DELIMITER).collect();
    let [session_id, site_str, username, expires_str, signature] = parts.as_slice() else {
        return Err(TokenError::Malformed);
    };

    if session_id.is_empty() || !session_id.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(TokenError::Malformed);
    }
    let site_id: i64 = site_str.parse().map_err(|_| TokenError::Malformed)?;
    validate_username_shape(username).map_err(|_| TokenError::Malformed)?;
    let expires_at = DateTime::parse_from_rfc3339(expires_str)
        .map_err(|_| TokenError::Malformed)?
        .with_timezone(&Utc);

    if now > expires_at {
        return Err(TokenError::Expired);
    }

    // Only the canonical lowercase encoding is accepted
    if !signature
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    {
        return Err(TokenError::BadSignature);
    }
    let signature = hex::decode(signature).map_err(|_| TokenError::BadSignature)?;

    signing_mac(secret, [*session_id, *site_str, *username, *expires_str])
        .verify_slice(&signature)
        .map_err(|_| TokenError::BadSignature)?;

    Ok(SessionClaims {
        session_id: (*session_id).to_string(),
        site_id,
        username: (*username).to_string(),
        expires_at,
    })
}

fn generate_session_id() -> String {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn signing_mac(secret: &[u8], fields: [&str; 4]) -> HmacSha256 {
    let mut mac =
        <HmacSha256 as Mac>::new_from_slice(secret).expect("HMAC can take key of any size");
    for field in fields {
        mac.update(&(field.len() as u64).to_be_bytes());
        mac.update(field.as_bytes());
    }
    mac
}
