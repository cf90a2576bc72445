//! Rendering a tab as a downloadable document.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::db::Tab;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Txt,
    Json,
    Markdown,
}

impl ExportFormat {
    /// Parse a format name as used in the `format` query parameter.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "txt" | "text" => Some(Self::Txt),
            "json" => Some(Self::Json),
            "md" | "markdown" => Some(Self::Markdown),
            _ => None,
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Txt => "txt",
            Self::Json => "json",
            Self::Markdown => "md",
        }
    }

    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Txt => "text/plain; charset=utf-8",
            Self::Json => "application/json",
            Self::Markdown => "text/markdown; charset=utf-8",
        }
    }
}

#[derive(Serialize)]
struct JsonExport<'a> {
    username: &'a str,
    tab_name: &'a str,
    exported_at: String,
    content: &'a str,
}

/// Render `tab` in `format`.
#[must_use]
pub fn export_tab(format: ExportFormat, username: &str, tab: &Tab, now: DateTime<Utc>) -> String {
    let exported_at = now.to_rfc3339_opts(SecondsFormat::Secs, true);

    match format {
        ExportFormat::Txt => tab.content.clone(),
        ExportFormat::Json => {
            let doc = JsonExport {
                username,
                tab_name: &tab.tab_name,
                exported_at,
                content: &tab.content,
            };
            // Serializing plain strings cannot fail
            serde_json::to_string_pretty(&doc).unwrap_or_default()
        }
        ExportFormat::Markdown => format!(
            "# {username} — {}\n\n*Exported {exported_at}*\n\n{}",
            tab.tab_name, tab.content
        ),
    }
}

/// Download file name for an exported tab.
#[must_use]
pub fn export_filename(format: ExportFormat, username: &str, tab_name: &str) -> String {
    let safe_tab: String = tab_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{username}_{safe_tab}.{}", format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tab() -> Tab {
        Tab {
            id: 1,
            site_id: 1,
            tab_name: "Shopping list".to_string(),
            content: "eggs\nmilk".to_string(),
            tab_order: 0,
            created_at: "2026-03-01T12:00:00Z".to_string(),
            updated_at: "2026-03-01T12:00:00Z".to_string(),
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-02T08:30:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_parse() {
        assert_eq!(ExportFormat::parse("txt"), Some(ExportFormat::Txt));
        assert_eq!(ExportFormat::parse("JSON"), Some(ExportFormat::Json));
        assert_eq!(ExportFormat::parse("md"), Some(ExportFormat::Markdown));
        assert_eq!(ExportFormat::parse("markdown"), Some(ExportFormat::Markdown));
        assert_eq!(ExportFormat::parse("pdf"), None);
    }

    #[test]
    fn test_txt_is_raw_content() {
        let out = export_tab(ExportFormat::Txt, "demo_user", &sample_tab(), now());
        assert_eq!(out, "eggs\nmilk");
    }

    #[test]
    fn test_json_export() {
        let out = export_tab(ExportFormat::Json, "demo_user", &sample_tab(), now());
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(value["username"], "demo_user");
        assert_eq!(value["tab_name"], "Shopping list");
        assert_eq!(value["exported_at"], "2026-03-02T08:30:00Z");
        assert_eq!(value["content"], "eggs\nmilk");
    }

    #[test]
    fn test_markdown_export() {
        let out = export_tab(ExportFormat::Markdown, "demo_user", &sample_tab(), now());
        assert!(out.starts_with("# demo_user — Shopping list\n"));
        assert!(out.contains("2026-03-02T08:30:00Z"));
        assert!(out.ends_with("\n\neggs\nmilk"));
    }

    #[test]
    fn test_filename_is_sanitized() {
        assert_eq!(
            export_filename(ExportFormat::Markdown, "demo_user", "Shopping list"),
            "demo_user_Shopping_list.md"
        );
        assert_eq!(
            export_filename(ExportFormat::Txt, "abc", "a/b"),
            "abc_a_b.txt"
        );
    }
}
