use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
    response::{IntoResponse, Redirect, Response},
};

use super::AuthService;
use crate::constants::SESSION_COOKIE_NAME;
use crate::db::Site;

/// Current authenticated site (if any).
/// Use this extractor when authentication is optional.
#[derive(Debug, Clone)]
pub struct MaybeSite(pub Option<Site>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeSite
where
    S: Send + Sync,
    AuthService: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthService::from_ref(state);

        let Some(token) = session_token(&parts.headers) else {
            return Ok(Self(None));
        };

        match auth.validate_session_token(token).await {
            Ok(site) => Ok(Self(Some(site))),
            Err(e) => {
                tracing::debug!("Rejected session token: {e}");
                Ok(Self(None))
            }
        }
    }
}

/// Current authenticated site (required).
/// Redirects to the landing page if there is no valid session.
#[derive(Debug, Clone)]
pub struct RequireSite(pub Site);

#[async_trait]
impl<S> FromRequestParts<S> for RequireSite
where
    S: Send + Sync,
    AuthService: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let MaybeSite(site) = MaybeSite::from_request_parts(parts, state).await?;

        match site {
            Some(site) => Ok(Self(site)),
            // A stale or forged cookie is dropped so the browser stops sending it
            None if session_token(&parts.headers).is_some() => Err((
                [(header::SET_COOKIE, clear_session_cookie())],
                Redirect::to("/"),
            )
                .into_response()),
            None => Err(Redirect::to("/").into_response()),
        }
    }
}

/// `Set-Cookie` value that removes the session cookie.
#[must_use]
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE_NAME}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0")
}

/// `Set-Cookie` value carrying a session token.
#[must_use]
pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{SESSION_COOKIE_NAME}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age_secs}{secure}"
    )
}

/// Session token from the session cookie, or an `Authorization: Bearer` header.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .find_map(|cookie| {
            let (name, value) = cookie.trim().split_once('=')?;
            (name == SESSION_COOKIE_NAME && !value.is_empty()).then_some(value)
        });

    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
    })
}

/// Get client IP address from request headers.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    // Check X-Forwarded-For header (if behind proxy)
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            if let Some(first_ip) = forwarded_str.split(',').next() {
                let first_ip = first_ip.trim();
                if !first_ip.is_empty() {
                    return Some(first_ip.to_string());
                }
            }
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .map(String::from)
}

/// Get user agent from request headers.
pub fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .map(String::from)
}
