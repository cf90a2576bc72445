use serde::{Deserialize, Serialize};

/// A password-protected namespace owning a set of tabs.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Site {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: String,
    pub last_accessed: Option<String>,
    pub is_active: bool,
}

/// A named, ordered unit of text inside a site.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tab {
    pub id: i64,
    pub site_id: i64,
    pub tab_name: String,
    pub content: String,
    pub tab_order: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// A single recorded access to a site.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AccessLog {
    pub id: i64,
    pub site_id: i64,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub accessed_at: String,
}

/// Data for inserting a new tab.
#[derive(Debug, Clone)]
pub struct NewTab<'a> {
    pub site_id: i64,
    pub tab_name: &'a str,
    pub tab_order: i64,
}
