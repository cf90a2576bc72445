use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use super::credentials::{validate_password, validate_username};
use super::password::PasswordHasher;
use super::token;
use crate::config::Config;
use crate::constants::DEFAULT_TAB_NAME;
use crate::db::{Site, SiteStore, StoreError};
use crate::error::{Error, Result};

/// Site signup, login and session handling over an injected store.
///
/// Observed from a client, a session moves Anonymous → Authenticated on
/// [`authenticate`](Self::authenticate) + [`issue_session_token`](Self::issue_session_token),
/// and back to Anonymous once [`validate_session_token`](Self::validate_session_token)
/// starts failing (expiry, deactivation, secret rotation).
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn SiteStore>,
    hasher: PasswordHasher,
    secret: Arc<[u8]>,
    session_ttl: Duration,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("hasher", &self.hasher)
            .field("session_ttl", &self.session_ttl)
            .finish_non_exhaustive()
    }
}

impl AuthService {
    #[must_use]
    pub fn new(
        store: Arc<dyn SiteStore>,
        hasher: PasswordHasher,
        secret: &[u8],
        session_ttl: Duration,
    ) -> Self {
        Self {
            store,
            hasher,
            secret: Arc::from(secret),
            session_ttl,
        }
    }

    #[must_use]
    pub fn from_config(store: Arc<dyn SiteStore>, config: &Config) -> Self {
        Self::new(
            store,
            PasswordHasher::new(config.password_hash_cost),
            config.session_secret.as_bytes(),
            config.session_ttl(),
        )
    }

    /// Validate credentials and create a site with its default tab.
    pub async fn create_site(&self, username: &str, password: &str) -> Result<Site> {
        validate_username(self.store.as_ref(), username).await?;
        validate_password(password)?;

        let hasher = self.hasher;
        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| Error::CreateFailed(e.to_string()))?
            .map_err(|e| Error::CreateFailed(format!("{e:#}")))?;

        let (site, _tab) = self
            .store
            .create_site_with_default_tab(username, &password_hash, DEFAULT_TAB_NAME)
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => Error::UsernameTaken,
                StoreError::Backend(e) => Error::CreateFailed(format!("{e:#}")),
            })?;

        info!(site_id = site.id, username = %site.username, "Site created");
        Ok(site)
    }

    /// Check a username/password pair against the active site.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Site> {
        let site = self
            .store
            .find_site_by_username(username)
            .await?
            .ok_or(Error::UsernameNotFound)?;

        let hasher = self.hasher;
        let password = password.to_string();
        let password_hash = site.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || hasher.verify(&password, &password_hash))
            .await
            .map_err(|e| Error::Store(e.to_string()))?;

        if !valid {
            debug!(site_id = site.id, "Password mismatch");
            return Err(Error::InvalidPassword);
        }

        self.touch(site.id).await;
        Ok(site)
    }

    /// Issue a session token valid for the configured TTL from now.
    pub fn issue_session_token(&self, site_id: i64, username: &str) -> Result<String> {
        self.issue_session_token_at(site_id, username, Utc::now())
    }

    pub fn issue_session_token_at(
        &self,
        site_id: i64,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<String> {
        Ok(token::issue(
            site_id,
            username,
            &self.secret,
            now,
            self.session_ttl,
        )?)
    }

    /// Resolve a session token to its still-active site.
    pub async fn validate_session_token(&self, token: &str) -> Result<Site> {
        self.validate_session_token_at(token, Utc::now()).await
    }

    pub async fn validate_session_token_at(&self, token: &str, now: DateTime<Utc>) -> Result<Site> {
        let claims = token::validate(token, &self.secret, now)?;

        let site = self
            .store
            .find_site_by_id(claims.site_id)
            .await?
            .ok_or(Error::SiteNotFound)?;

        if site.username != claims.username {
            return Err(Error::UsernameMismatch);
        }

        self.touch(site.id).await;
        Ok(site)
    }

    /// Record a site access. Failures are logged and ignored.
    pub async fn log_access(&self, site_id: i64, ip_address: Option<&str>, user_agent: Option<&str>) {
        if !self.store.log_access(site_id, ip_address, user_agent).await {
            warn!(site_id, "Access was not logged");
        }
    }

    /// Deactivate a site. Its username becomes free and its tokens stop validating.
    pub async fn deactivate_site(&self, site_id: i64) -> Result<()> {
        if self.store.deactivate_site(site_id).await? {
            info!(site_id, "Site deactivated");
            Ok(())
        } else {
            Err(Error::SiteNotFound)
        }
    }

    async fn touch(&self, site_id: i64) {
        if !self.store.touch_site_last_accessed(site_id).await {
            warn!(site_id, "Last accessed timestamp not updated");
        }
    }
}
