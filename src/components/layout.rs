//! Base layout components for the web UI.
//!
//! This module provides the page skeleton: head, navigation and footer.

use maud::{html, Markup, PreEscaped, DOCTYPE};

use crate::db::Site;

/// Critical theme initialization script that runs in <head> to prevent flash of wrong theme.
/// Must be inline (not external) to execute before body renders.
const THEME_INIT_SCRIPT: &str = r#"(function() {
    var theme = localStorage.getItem('theme');
    if (theme) {
        document.documentElement.setAttribute('data-theme', theme);
    } else if (window.matchMedia('(prefers-color-scheme: dark)').matches) {
        document.documentElement.setAttribute('data-theme', 'dark');
    }
})();"#;

/// Minimal inline styles; the app ships no static assets.
const BASE_STYLE: &str = r"
body { font-family: system-ui, sans-serif; margin: 0; }
.container { max-width: 960px; margin: 0 auto; padding: 0 1rem; }
nav { display: flex; justify-content: space-between; align-items: center; }
nav ul { list-style: none; display: flex; gap: 1rem; padding: 0; }
article.error { border-left: 4px solid #c0392b; padding: .5rem 1rem; }
article.success { border-left: 4px solid #27ae60; padding: .5rem 1rem; }
article.info { border-left: 4px solid #2980b9; padding: .5rem 1rem; }
.vault-tabs { display: flex; gap: .5rem; flex-wrap: wrap; margin: 1rem 0; }
.vault-tab { padding: .25rem .75rem; border: 1px solid #ccc; border-radius: 4px; text-decoration: none; }
.vault-tab.active { font-weight: bold; border-color: #333; }
textarea { width: 100%; min-height: 24rem; font-family: ui-monospace, monospace; }
.inline-form { display: inline-block; margin-right: .5rem; }
";

/// Base page layout builder.
///
/// # Example
///
/// ```ignore
/// use maud::html;
/// use crate::components::layout::BaseLayout;
///
/// let content = html! { h1 { "Hello World" } };
/// let page = BaseLayout::new("My Page", site.as_ref()).render(content);
/// ```
#[derive(Debug, Clone)]
pub struct BaseLayout<'a> {
    title: &'a str,
    site: Option<&'a Site>,
}

impl<'a> BaseLayout<'a> {
    /// Create a new base layout with the given page title and signed-in site.
    ///
    /// Pass `None` for anonymous visitors.
    #[must_use]
    pub const fn new(title: &'a str, site: Option<&'a Site>) -> Self {
        Self { title, site }
    }

    /// Render the complete HTML page with the given content.
    ///
    /// The content will be placed inside the `<main class="container">` element.
    #[must_use]
    pub fn render(self, content: Markup) -> Markup {
        html! {
            (DOCTYPE)
            html lang="en" data-theme="light" {
                head {
                    meta charset="UTF-8";
                    meta name="viewport" content="width=device-width, initial-scale=1.0";
                    meta name="color-scheme" content="light dark";
                    meta name="robots" content="noindex, noarchive";
                    title { (self.title) " - SecureText Vault" }
                    link rel="icon" href="data:image/svg+xml,<svg xmlns='http://www.w3.org/2000/svg' viewBox='0 0 100 100'><text y='.9em' font-size='90'>🔐</text></svg>";
                    style { (PreEscaped(BASE_STYLE)) }
                    // Inline critical script to prevent theme flicker
                    script { (PreEscaped(THEME_INIT_SCRIPT)) }
                }
                body {
                    (self.render_header())
                    main class="container" {
                        (content)
                    }
                    (Self::render_footer())
                }
            }
        }
    }

    fn render_header(&self) -> Markup {
        html! {
            header class="container" {
                nav {
                    ul {
                        li {
                            a href="/" {
                                strong class="site-logo" { "SecureText Vault" }
                            }
                        }
                    }
                    ul {
                        (self.render_auth_nav())
                    }
                }
            }
        }
    }

    fn render_auth_nav(&self) -> Markup {
        match self.site {
            Some(site) => html! {
                li { a href="/site" { (site.username) } }
                li {
                    form method="post" action="/logout" class="inline-form" {
                        button type="submit" { "Log out" }
                    }
                }
            },
            None => html! {
                li { a href="/" { "Create or open a site" } }
            },
        }
    }

    fn render_footer() -> Markup {
        html! {
            footer class="container" {
                small { "SecureText Vault | password-protected text, organized in tabs" }
            }
        }
    }
}
