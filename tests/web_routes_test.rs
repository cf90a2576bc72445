//! Integration tests for the HTTP routes.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use securetext_vault::auth::AuthService;
use securetext_vault::config::Config;
use securetext_vault::db::{Database, Site, SiteStore};
use securetext_vault::tabs::TabService;
use securetext_vault::web::{create_app, AppState};
use tempfile::TempDir;
use tower::ServiceExt;

fn test_config(db_path: &Path, rate_limit_per_minute: u32, trust_proxy_headers: bool) -> Config {
    Config {
        database_path: db_path.to_path_buf(),
        session_secret: "web-routes-test-secret-0123456789abcdef".to_string(),
        session_ttl_hours: 24,
        secure_cookies: false,
        password_hash_cost: 4,
        max_content_size_mb: 1,
        encryption_enabled: false,
        encryption_key: None,
        rate_limit_per_minute,
        access_log_retention_days: 90,
        trust_proxy_headers,
        web_host: "127.0.0.1".to_string(),
        web_port: 0,
    }
}

async fn setup_with(
    rate_limit_per_minute: u32,
    trust_proxy_headers: bool,
) -> (Router, AppState, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.sqlite");
    let db = Database::new(&db_path)
        .await
        .expect("Failed to create database");
    let store: Arc<dyn SiteStore> = Arc::new(db);

    let config = test_config(&db_path, rate_limit_per_minute, trust_proxy_headers);
    let auth = AuthService::from_config(store.clone(), &config);
    let tabs = TabService::from_config(store, &config).expect("Failed to build tab service");
    let state = AppState::new(auth, tabs, config);

    (create_app(state.clone()), state, temp_dir)
}

async fn setup() -> (Router, AppState, TempDir) {
    setup_with(100, false).await
}

fn form_post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header("x-forwarded-for", "198.51.100.4")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn with_cookie(mut request: Request<Body>, cookie: &str) -> Request<Body> {
    request
        .headers_mut()
        .insert(header::COOKIE, cookie.parse().unwrap());
    request
}

/// Attach a peer address and a forwarded-for value to a request.
fn via(mut request: Request<Body>, peer: [u8; 4], forwarded_for: &str) -> Request<Body> {
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((peer, 40000))));
    request
        .headers_mut()
        .insert("x-forwarded-for", forwarded_for.parse().unwrap());
    request
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// The `name=value` part of the response's `Set-Cookie` header.
fn cookie_pair(response: &Response) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .unwrap_or_default()
        .to_string()
}

async fn body_string(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

/// Create a site through the form and return its session cookie.
async fn create_site(app: &Router, username: &str) -> String {
    let response = app
        .clone()
        .oneshot(form_post(
            "/create",
            &format!("username={username}&password=password123&confirm_password=password123"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/site?notice=welcome");
    cookie_pair(&response)
}

async fn site_for(state: &AppState, cookie: &str) -> Site {
    let token = cookie.trim_start_matches("vault_session=");
    state.auth.validate_session_token(token).await.unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, _state, _temp_dir) = setup().await;

    let response = app.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "OK");
}

#[tokio::test]
async fn test_landing_page_forms() {
    let (app, _state, _temp_dir) = setup().await;

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_string(response).await;
    assert!(body.contains("action=\"/create\""));
    assert!(body.contains("action=\"/access\""));
}

#[tokio::test]
async fn test_create_site_and_view() {
    let (app, state, _temp_dir) = setup().await;

    let cookie = create_site(&app, "demo_user").await;
    assert!(cookie.starts_with("vault_session="));

    let response = app
        .clone()
        .oneshot(with_cookie(get("/site?notice=welcome"), &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_string(response).await;
    assert!(body.contains("demo_user"));
    assert!(body.contains("Main"));
    assert!(body.contains("Site created successfully!"));

    let site = site_for(&state, &cookie).await;
    assert_eq!(site.username, "demo_user");
}

#[tokio::test]
async fn test_landing_redirects_signed_in_visitor() {
    let (app, _state, _temp_dir) = setup().await;
    let cookie = create_site(&app, "returning").await;

    let response = app
        .oneshot(with_cookie(get("/"), &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/site");
}

#[tokio::test]
async fn test_create_site_form_errors() {
    let (app, _state, _temp_dir) = setup().await;

    let response = app
        .clone()
        .oneshot(form_post("/create", "username=&password=&confirm_password="))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(response)
        .await
        .contains("Please fill in all fields"));

    let response = app
        .clone()
        .oneshot(form_post(
            "/create",
            "username=mismatch&password=password123&confirm_password=password124",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(response).await.contains("Passwords do not match"));

    let response = app
        .clone()
        .oneshot(form_post(
            "/create",
            "username=ab&password=password123&confirm_password=password123",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(header::SET_COOKIE).is_none());

    create_site(&app, "duplicate").await;
    let response = app
        .oneshot(form_post(
            "/create",
            "username=duplicate&password=password123&confirm_password=password123",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(body_string(response).await.contains("Username already exists"));
}

#[tokio::test]
async fn test_access_site() {
    let (app, _state, _temp_dir) = setup().await;
    create_site(&app, "access_me").await;

    let response = app
        .clone()
        .oneshot(form_post(
            "/access",
            "username=access_me&password=password123",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/site");
    assert!(cookie_pair(&response).starts_with("vault_session="));

    let response = app
        .clone()
        .oneshot(form_post("/access", "username=access_me&password=wrongpass1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert!(body_string(response).await.contains("Invalid password"));

    let response = app
        .oneshot(form_post("/access", "username=&password="))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(response)
        .await
        .contains("Please enter both username and password"));
}

#[tokio::test]
async fn test_site_requires_session() {
    let (app, _state, _temp_dir) = setup().await;

    let response = app.clone().oneshot(get("/site")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    assert!(response.headers().get(header::SET_COOKIE).is_none());

    // A bad cookie is cleared
    let response = app
        .oneshot(with_cookie(get("/site"), "vault_session=forged.1.nobody.x.y"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(set_cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_bearer_token_accepted() {
    let (app, _state, _temp_dir) = setup().await;
    let cookie = create_site(&app, "api_user").await;
    let token = cookie.trim_start_matches("vault_session=");

    let request = Request::builder()
        .uri("/site")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let (app, _state, _temp_dir) = setup().await;

    let response = app.oneshot(form_post("/logout", "")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    assert_eq!(cookie_pair(&response), "vault_session=");
}

#[tokio::test]
async fn test_tab_actions() {
    let (app, state, _temp_dir) = setup().await;
    let cookie = create_site(&app, "tab_user").await;
    let site = site_for(&state, &cookie).await;
    let main = state.tabs.list_tabs(site.id).await.unwrap().remove(0);

    // Save content
    let response = app
        .clone()
        .oneshot(with_cookie(
            form_post(
                &format!("/site/tabs/{}/content", main.id),
                "content=hello+world",
            ),
            &cookie,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        format!("/site?tab={}&notice=saved", main.id)
    );
    assert_eq!(
        state.tabs.get_tab(site.id, main.id).await.unwrap().content,
        "hello world"
    );

    // Deleting the only tab is refused
    let response = app
        .clone()
        .oneshot(with_cookie(
            form_post(&format!("/site/tabs/{}/delete", main.id), ""),
            &cookie,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(response)
        .await
        .contains("A site must keep at least one tab"));

    // Create a second tab
    let response = app
        .clone()
        .oneshot(with_cookie(
            form_post("/site/tabs", "tab_name=Work"),
            &cookie,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let tabs = state.tabs.list_tabs(site.id).await.unwrap();
    assert_eq!(tabs.len(), 2);
    let work = tabs[1].clone();
    assert_eq!(work.tab_name, "Work");

    // Move it first
    let response = app
        .clone()
        .oneshot(with_cookie(
            form_post(&format!("/site/tabs/{}/move", work.id), "direction=up"),
            &cookie,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let tabs = state.tabs.list_tabs(site.id).await.unwrap();
    assert_eq!(tabs[0].id, work.id);

    // Rename
    let response = app
        .clone()
        .oneshot(with_cookie(
            form_post(&format!("/site/tabs/{}/rename", work.id), "tab_name=Office"),
            &cookie,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        state.tabs.get_tab(site.id, work.id).await.unwrap().tab_name,
        "Office"
    );

    // Delete
    let response = app
        .oneshot(with_cookie(
            form_post(&format!("/site/tabs/{}/delete", work.id), ""),
            &cookie,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/site?notice=deleted");
    assert_eq!(state.tabs.list_tabs(site.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_other_sites_tabs_are_not_reachable() {
    let (app, state, _temp_dir) = setup().await;
    let owner_cookie = create_site(&app, "owner").await;
    let intruder_cookie = create_site(&app, "intruder").await;

    let owner = site_for(&state, &owner_cookie).await;
    let owner_tab = state.tabs.list_tabs(owner.id).await.unwrap().remove(0);

    let response = app
        .oneshot(with_cookie(
            form_post(
                &format!("/site/tabs/{}/content", owner_tab.id),
                "content=defaced",
            ),
            &intruder_cookie,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        state.tabs.get_tab(owner.id, owner_tab.id).await.unwrap().content,
        ""
    );
}

#[tokio::test]
async fn test_export_tab() {
    let (app, state, _temp_dir) = setup().await;
    let cookie = create_site(&app, "exporter").await;
    let site = site_for(&state, &cookie).await;
    let main = state.tabs.list_tabs(site.id).await.unwrap().remove(0);
    state
        .tabs
        .save_content(site.id, main.id, "line one\nline two")
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(with_cookie(
            get(&format!("/site/tabs/{}/export?format=json", main.id)),
            &cookie,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    assert_eq!(
        response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=\"exporter_Main.json\""
    );

    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["username"], "exporter");
    assert_eq!(body["tab_name"], "Main");
    assert_eq!(body["content"], "line one\nline two");

    let response = app
        .clone()
        .oneshot(with_cookie(
            get(&format!("/site/tabs/{}/export", main.id)),
            &cookie,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "line one\nline two");

    let response = app
        .oneshot(with_cookie(
            get(&format!("/site/tabs/{}/export?format=pdf", main.id)),
            &cookie,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_auth_forms_are_rate_limited() {
    let (app, _state, _temp_dir) = setup_with(2, false).await;

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(form_post("/access", "username=nobody&password=password123"))
            .await
            .unwrap();
        assert_ne!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    let response = app
        .clone()
        .oneshot(form_post("/access", "username=nobody&password=password123"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "60");

    // Other pages are not limited
    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit_ignores_rotating_forwarded_for() {
    let (app, _state, _temp_dir) = setup_with(2, false).await;

    let mut limited = 0;
    for i in 0..10 {
        let request = via(
            form_post("/access", "username=nobody&password=password123"),
            [192, 0, 2, 10],
            &format!("203.0.113.{i}"),
        );
        let response = app.clone().oneshot(request).await.unwrap();
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            limited += 1;
        }
    }
    assert_eq!(limited, 8);

    // A different peer has its own budget
    let request = via(
        form_post("/access", "username=nobody&password=password123"),
        [192, 0, 2, 11],
        "203.0.113.1",
    );
    let response = app.oneshot(request).await.unwrap();
    assert_ne!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_rate_limit_uses_forwarded_for_behind_trusted_proxy() {
    let (app, _state, _temp_dir) = setup_with(2, true).await;
    let proxy = [10, 0, 0, 1];

    for i in 0..4 {
        let request = via(
            form_post("/access", "username=nobody&password=password123"),
            proxy,
            &format!("203.0.113.{i}"),
        );
        let response = app.clone().oneshot(request).await.unwrap();
        assert_ne!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    let mut statuses = Vec::new();
    for _ in 0..3 {
        let request = via(
            form_post("/access", "username=nobody&password=password123"),
            proxy,
            "198.51.100.77",
        );
        statuses.push(app.clone().oneshot(request).await.unwrap().status());
    }
    assert_ne!(statuses[0], StatusCode::TOO_MANY_REQUESTS);
    assert_ne!(statuses[1], StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(statuses[2], StatusCode::TOO_MANY_REQUESTS);
}
