//! Tab management for an authenticated site.
//!
//! Every operation is scoped by `site_id`; a tab ID belonging to another
//! site behaves exactly like a missing one.

pub mod cipher;

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info};

pub use cipher::{CipherError, ContentCipher};

use crate::config::Config;
use crate::constants::{MAX_TABS_PER_SITE, MAX_TAB_NAME_LENGTH};
use crate::db::{SiteStore, Tab};
use crate::error::{Error, Result};

static TAB_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9 _-]+$").expect("tab name pattern is valid"));

/// Trim and validate a tab name, returning the name to store.
pub fn validate_tab_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_TAB_NAME_LENGTH {
        return Err(Error::InvalidTabName);
    }
    if !TAB_NAME_PATTERN.is_match(name) {
        return Err(Error::InvalidTabName);
    }
    Ok(name.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    Up,
    Down,
}

#[derive(Clone)]
pub struct TabService {
    store: Arc<dyn SiteStore>,
    cipher: ContentCipher,
    max_content_bytes: usize,
}

impl std::fmt::Debug for TabService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TabService")
            .field("cipher", &self.cipher)
            .field("max_content_bytes", &self.max_content_bytes)
            .finish_non_exhaustive()
    }
}

impl TabService {
    #[must_use]
    pub fn new(store: Arc<dyn SiteStore>, cipher: ContentCipher, max_content_bytes: usize) -> Self {
        Self {
            store,
            cipher,
            max_content_bytes,
        }
    }

    /// Build from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if encryption is enabled with an unusable key.
    pub fn from_config(store: Arc<dyn SiteStore>, config: &Config) -> Result<Self> {
        let cipher = match (&config.encryption_enabled, &config.encryption_key) {
            (true, Some(key)) => ContentCipher::from_hex_key(key)?,
            (true, None) => {
                return Err(CipherError::InvalidKey("ENCRYPTION_KEY is not set".to_string()).into())
            }
            (false, _) => ContentCipher::disabled(),
        };
        Ok(Self::new(store, cipher, config.max_content_bytes()))
    }

    #[must_use]
    pub const fn max_content_bytes(&self) -> usize {
        self.max_content_bytes
    }

    /// All tabs of a site in display order, content decrypted.
    pub async fn list_tabs(&self, site_id: i64) -> Result<Vec<Tab>> {
        let tabs = self.store.list_tabs_by_site(site_id).await?;
        tabs.into_iter().map(|tab| self.reveal(tab)).collect()
    }

    pub async fn get_tab(&self, site_id: i64, tab_id: i64) -> Result<Tab> {
        let tab = self
            .store
            .find_tab(site_id, tab_id)
            .await?
            .ok_or(Error::TabNotFound)?;
        self.reveal(tab)
    }

    /// Append an empty tab after the current last one.
    pub async fn create_tab(&self, site_id: i64, name: &str) -> Result<Tab> {
        let name = validate_tab_name(name)?;

        let tabs = self.store.list_tabs_by_site(site_id).await?;
        if i64::try_from(tabs.len()).unwrap_or(i64::MAX) >= MAX_TABS_PER_SITE {
            return Err(Error::TabLimitReached {
                limit: MAX_TABS_PER_SITE,
            });
        }
        let next_order = tabs.iter().map(|t| t.tab_order).max().map_or(0, |max| max + 1);

        let tab = self.store.insert_tab(site_id, &name, next_order).await?;
        info!(site_id, tab_id = tab.id, tab_name = %tab.tab_name, "Tab created");
        Ok(tab)
    }

    /// Replace a tab's content. On failure the stored content is unchanged.
    pub async fn save_content(&self, site_id: i64, tab_id: i64, content: &str) -> Result<Tab> {
        if content.len() > self.max_content_bytes {
            return Err(Error::ContentTooLarge {
                size: content.len(),
                limit: self.max_content_bytes,
            });
        }

        let stored = self.cipher.seal(content)?;
        let mut tab = self
            .store
            .update_tab_content(site_id, tab_id, &stored)
            .await?
            .ok_or(Error::TabNotFound)?;

        debug!(site_id, tab_id, bytes = content.len(), "Tab content saved");
        tab.content = content.to_string();
        Ok(tab)
    }

    pub async fn rename_tab(&self, site_id: i64, tab_id: i64, name: &str) -> Result<Tab> {
        let name = validate_tab_name(name)?;
        let tab = self
            .store
            .update_tab_name(site_id, tab_id, &name)
            .await?
            .ok_or(Error::TabNotFound)?;
        self.reveal(tab)
    }

    /// Delete a tab. A site always keeps at least one.
    pub async fn delete_tab(&self, site_id: i64, tab_id: i64) -> Result<()> {
        if self.store.find_tab(site_id, tab_id).await?.is_none() {
            return Err(Error::TabNotFound);
        }
        if self.store.count_tabs(site_id).await? <= 1 {
            return Err(Error::LastTab);
        }

        if !self.store.delete_tab(site_id, tab_id).await? {
            return Err(Error::TabNotFound);
        }
        info!(site_id, tab_id, "Tab deleted");
        Ok(())
    }

    /// Apply an explicit `(tab_id, tab_order)` mapping.
    pub async fn reorder_tabs(&self, site_id: i64, mapping: &[(i64, i64)]) -> Result<()> {
        self.store.reorder_tabs(site_id, mapping).await?;
        Ok(())
    }

    /// Swap a tab with its neighbour and renumber the site's tabs from zero.
    ///
    /// Moving the first tab up or the last tab down is a no-op.
    pub async fn move_tab(&self, site_id: i64, tab_id: i64, direction: MoveDirection) -> Result<()> {
        let mut ids: Vec<i64> = self
            .store
            .list_tabs_by_site(site_id)
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect();

        let pos = ids
            .iter()
            .position(|&id| id == tab_id)
            .ok_or(Error::TabNotFound)?;
        let target = match direction {
            MoveDirection::Up => pos.checked_sub(1),
            MoveDirection::Down => Some(pos + 1).filter(|&p| p < ids.len()),
        };
        let Some(target) = target else {
            return Ok(());
        };
        ids.swap(pos, target);

        let mapping: Vec<(i64, i64)> = ids.into_iter().zip(0_i64..).collect();
        self.reorder_tabs(site_id, &mapping).await
    }

    fn reveal(&self, mut tab: Tab) -> Result<Tab> {
        tab.content = self.cipher.open(&tab.content)?;
        Ok(tab)
    }
}
