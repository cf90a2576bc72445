use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info};

use super::pages;
use super::rate_limit::rate_limit_middleware;
use super::AppState;
use crate::auth::{
    clear_session_cookie, client_ip, session_cookie, user_agent, MaybeSite, RequireSite,
};
use crate::components::Alert;
use crate::constants::DEFAULT_TAB_NAME;
use crate::db::Site;
use crate::error::{Error, ErrorKind};
use crate::export::{export_filename, export_tab, ExportFormat};
use crate::tabs::MoveDirection;

const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// Create the router with all routes.
pub fn router(state: AppState) -> Router<AppState> {
    let auth_forms = Router::new()
        .route("/create", post(create_site))
        .route("/access", post(access_site))
        .route_layer(middleware::from_fn_with_state(state, rate_limit_middleware));

    Router::new()
        .route("/", get(landing))
        .merge(auth_forms)
        .route("/logout", post(logout))
        .route("/site", get(site_page))
        .route("/site/tabs", post(create_tab))
        .route("/site/tabs/:id/content", post(save_content))
        .route("/site/tabs/:id/rename", post(rename_tab))
        .route("/site/tabs/:id/delete", post(delete_tab))
        .route("/site/tabs/:id/move", post(move_tab))
        .route("/site/tabs/:id/export", get(export))
        .route("/healthz", get(health))
}

/// HTTP status for a service error.
pub const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Auth => StatusCode::UNAUTHORIZED,
        ErrorKind::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Message safe to show a visitor. Storage failures are logged, not shown.
fn public_message(err: &Error) -> String {
    if err.kind() == ErrorKind::Persistence {
        error!("Request failed: {err}");
        GENERIC_FAILURE.to_string()
    } else {
        err.to_string()
    }
}

/// Client address of a request.
///
/// Proxy headers are client-controlled, so they are only consulted when
/// `trust_proxy_headers` is set. Otherwise this is the peer address.
pub fn request_ip(
    headers: &HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    trust_proxy_headers: bool,
) -> Option<String> {
    let peer = connect_info.map(|ConnectInfo(addr)| addr.ip().to_string());
    if trust_proxy_headers {
        client_ip(headers).or(peer)
    } else {
        peer
    }
}

// ========== Landing / auth ==========

async fn landing(MaybeSite(site): MaybeSite) -> Response {
    if site.is_some() {
        return Redirect::to("/site").into_response();
    }
    Html(pages::landing_page(None, None).into_string()).into_response()
}

fn landing_error(status: StatusCode, message: &str, username: Option<&str>) -> Response {
    (
        status,
        Html(pages::landing_page(Some(Alert::error(message)), username).into_string()),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct CreateSiteForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    confirm_password: String,
}

/// POST /create - Create a site and sign in to it.
async fn create_site(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Form(form): Form<CreateSiteForm>,
) -> Response {
    if form.username.is_empty() || form.password.is_empty() {
        return landing_error(StatusCode::BAD_REQUEST, "Please fill in all fields", None);
    }
    if form.password != form.confirm_password {
        return landing_error(
            StatusCode::BAD_REQUEST,
            "Passwords do not match",
            Some(&form.username),
        );
    }

    let site = match state.auth.create_site(&form.username, &form.password).await {
        Ok(site) => site,
        Err(e) => {
            return landing_error(
                status_for(e.kind()),
                &public_message(&e),
                Some(&form.username),
            );
        }
    };

    sign_in(&state, &site, &headers, connect_info, "/site?notice=welcome").await
}

#[derive(Debug, Deserialize)]
pub struct AccessSiteForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

/// POST /access - Sign in to an existing site.
async fn access_site(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Form(form): Form<AccessSiteForm>,
) -> Response {
    if form.username.is_empty() || form.password.is_empty() {
        return landing_error(
            StatusCode::BAD_REQUEST,
            "Please enter both username and password",
            None,
        );
    }

    let site = match state.auth.authenticate(&form.username, &form.password).await {
        Ok(site) => site,
        Err(e) => {
            info!(username = %form.username, "Site access denied: {e}");
            return landing_error(
                status_for(e.kind()),
                &public_message(&e),
                Some(&form.username),
            );
        }
    };

    sign_in(&state, &site, &headers, connect_info, "/site").await
}

async fn sign_in(
    state: &AppState,
    site: &Site,
    headers: &HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    redirect_to: &str,
) -> Response {
    let ip = request_ip(headers, connect_info, state.config.trust_proxy_headers);
    let ua = user_agent(headers);
    state
        .auth
        .log_access(site.id, ip.as_deref(), ua.as_deref())
        .await;

    let token = match state.auth.issue_session_token(site.id, &site.username) {
        Ok(token) => token,
        Err(e) => {
            error!(site_id = site.id, "Failed to issue session token: {e}");
            return landing_error(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE, None);
        }
    };

    let max_age = state.config.session_ttl().num_seconds();
    let cookie = session_cookie(&token, max_age, state.config.secure_cookies);

    ([(header::SET_COOKIE, cookie)], Redirect::to(redirect_to)).into_response()
}

/// POST /logout - Drop the session cookie.
async fn logout() -> Response {
    ([(header::SET_COOKIE, clear_session_cookie())], Redirect::to("/")).into_response()
}

// ========== Site page ==========

#[derive(Debug, Deserialize)]
pub struct SiteQuery {
    tab: Option<i64>,
    notice: Option<String>,
}

fn notice_message(code: &str) -> Option<&'static str> {
    match code {
        "welcome" => Some(
            "Site created successfully! Save your password securely. It cannot be recovered if lost.",
        ),
        "saved" => Some("Content saved!"),
        "created" => Some("Tab created!"),
        "renamed" => Some("Tab renamed."),
        "deleted" => Some("Tab deleted."),
        _ => None,
    }
}

/// GET /site - Show the selected tab.
async fn site_page(
    State(state): State<AppState>,
    RequireSite(site): RequireSite,
    Query(query): Query<SiteQuery>,
) -> Response {
    let flash = query
        .notice
        .as_deref()
        .and_then(notice_message)
        .map(Alert::success);
    render_site(&state, &site, query.tab, flash, StatusCode::OK).await
}

async fn render_site(
    state: &AppState,
    site: &Site,
    tab_id: Option<i64>,
    flash: Option<Alert<'_>>,
    status: StatusCode,
) -> Response {
    let mut tabs = match state.tabs.list_tabs(site.id).await {
        Ok(tabs) => tabs,
        Err(e) => {
            error!(site_id = site.id, "Failed to load tabs: {e}");
            return (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE).into_response();
        }
    };

    // Sites always get a tab at creation; recreate one if it is gone.
    if tabs.is_empty() {
        match state.tabs.create_tab(site.id, DEFAULT_TAB_NAME).await {
            Ok(tab) => tabs.push(tab),
            Err(e) => {
                error!(site_id = site.id, "Failed to create default tab: {e}");
                return (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE).into_response();
            }
        }
    }

    let active = tab_id
        .and_then(|id| tabs.iter().find(|t| t.id == id))
        .unwrap_or(&tabs[0]);

    let page = pages::site_page(site, &tabs, active, flash, state.tabs.max_content_bytes());
    (status, Html(page.into_string())).into_response()
}

async fn tab_error(state: &AppState, site: &Site, tab_id: Option<i64>, err: &Error) -> Response {
    let message = public_message(err);
    render_site(
        state,
        site,
        tab_id,
        Some(Alert::error(&message)),
        status_for(err.kind()),
    )
    .await
}

fn back_to_tab(tab_id: i64, notice: &str) -> Response {
    Redirect::to(&format!("/site?tab={tab_id}&notice={notice}")).into_response()
}

// ========== Tab actions ==========

#[derive(Debug, Deserialize)]
pub struct TabNameForm {
    #[serde(default)]
    tab_name: String,
}

/// POST /site/tabs - Create a tab.
async fn create_tab(
    State(state): State<AppState>,
    RequireSite(site): RequireSite,
    Form(form): Form<TabNameForm>,
) -> Response {
    match state.tabs.create_tab(site.id, &form.tab_name).await {
        Ok(tab) => back_to_tab(tab.id, "created"),
        Err(e) => tab_error(&state, &site, None, &e).await,
    }
}

#[derive(Debug, Deserialize)]
pub struct ContentForm {
    #[serde(default)]
    content: String,
}

/// POST /site/tabs/:id/content - Save tab content.
async fn save_content(
    State(state): State<AppState>,
    RequireSite(site): RequireSite,
    Path(tab_id): Path<i64>,
    Form(form): Form<ContentForm>,
) -> Response {
    match state.tabs.save_content(site.id, tab_id, &form.content).await {
        Ok(_) => back_to_tab(tab_id, "saved"),
        Err(e) => tab_error(&state, &site, Some(tab_id), &e).await,
    }
}

/// POST /site/tabs/:id/rename - Rename a tab.
async fn rename_tab(
    State(state): State<AppState>,
    RequireSite(site): RequireSite,
    Path(tab_id): Path<i64>,
    Form(form): Form<TabNameForm>,
) -> Response {
    match state.tabs.rename_tab(site.id, tab_id, &form.tab_name).await {
        Ok(_) => back_to_tab(tab_id, "renamed"),
        Err(e) => tab_error(&state, &site, Some(tab_id), &e).await,
    }
}

/// POST /site/tabs/:id/delete - Delete a tab.
async fn delete_tab(
    State(state): State<AppState>,
    RequireSite(site): RequireSite,
    Path(tab_id): Path<i64>,
) -> Response {
    match state.tabs.delete_tab(site.id, tab_id).await {
        Ok(()) => Redirect::to("/site?notice=deleted").into_response(),
        Err(e) => tab_error(&state, &site, Some(tab_id), &e).await,
    }
}

#[derive(Debug, Deserialize)]
pub struct MoveForm {
    direction: MoveDirection,
}

/// POST /site/tabs/:id/move - Move a tab one place left or right.
async fn move_tab(
    State(state): State<AppState>,
    RequireSite(site): RequireSite,
    Path(tab_id): Path<i64>,
    Form(form): Form<MoveForm>,
) -> Response {
    match state.tabs.move_tab(site.id, tab_id, form.direction).await {
        Ok(()) => Redirect::to(&format!("/site?tab={tab_id}")).into_response(),
        Err(e) => tab_error(&state, &site, Some(tab_id), &e).await,
    }
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    format: Option<String>,
}

/// GET /site/tabs/:id/export - Download a tab.
async fn export(
    State(state): State<AppState>,
    RequireSite(site): RequireSite,
    Path(tab_id): Path<i64>,
    Query(query): Query<ExportQuery>,
) -> Response {
    let Some(format) = ExportFormat::parse(query.format.as_deref().unwrap_or("txt")) else {
        return (StatusCode::BAD_REQUEST, "Unsupported export format").into_response();
    };

    let tab = match state.tabs.get_tab(site.id, tab_id).await {
        Ok(tab) => tab,
        Err(e) => {
            return (status_for(e.kind()), public_message(&e)).into_response();
        }
    };

    let body = export_tab(format, &site.username, &tab, Utc::now());
    let filename = export_filename(format, &site.username, &tab.tab_name);

    (
        [
            (header::CONTENT_TYPE, format.mime_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

async fn health() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::Validation), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::Conflict), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::Auth), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_for(ErrorKind::Persistence),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_session_cookie_flags() {
        let cookie = session_cookie("tok", 86400, false);
        assert!(cookie.starts_with("vault_session=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=86400"));
        assert!(!cookie.contains("Secure"));

        assert!(session_cookie("tok", 60, true).ends_with("; Secure"));
    }

    #[test]
    fn test_persistence_errors_are_not_shown() {
        let err = Error::CreateFailed("UNIQUE constraint failed: sites.username".to_string());
        assert_eq!(public_message(&err), GENERIC_FAILURE);

        assert_eq!(public_message(&Error::InvalidPassword), "Invalid password");
    }

    #[test]
    fn test_request_ip_ignores_proxy_headers_unless_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9".parse().unwrap());
        let peer = || Some(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 4000))));

        assert_eq!(
            request_ip(&headers, peer(), false).as_deref(),
            Some("192.0.2.1")
        );
        assert_eq!(
            request_ip(&headers, peer(), true).as_deref(),
            Some("203.0.113.9")
        );
        assert_eq!(
            request_ip(&HeaderMap::new(), peer(), true).as_deref(),
            Some("192.0.2.1")
        );
        assert_eq!(request_ip(&headers, None, false), None);
    }

    #[test]
    fn test_unknown_notice_is_ignored() {
        assert!(notice_message("saved").is_some());
        assert!(notice_message("<script>").is_none());
    }
}
