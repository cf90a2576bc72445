//! Tab strip for switching between a site's tabs.

use maud::{html, Markup, Render};

/// A single link in the tab strip.
#[derive(Debug, Clone)]
pub struct TabLink<'a> {
    pub label: &'a str,
    pub href: String,
    pub active: bool,
}

impl<'a> TabLink<'a> {
    #[must_use]
    pub fn new(label: &'a str, href: impl Into<String>) -> Self {
        Self {
            label,
            href: href.into(),
            active: false,
        }
    }

    #[must_use]
    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}

impl Render for TabLink<'_> {
    fn render(&self) -> Markup {
        let class = if self.active {
            "vault-tab active"
        } else {
            "vault-tab"
        };

        html! {
            a class=(class) href=(self.href) aria-current=[self.active.then_some("page")] {
                (self.label)
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TabBar<'a> {
    pub tabs: Vec<TabLink<'a>>,
}

impl<'a> TabBar<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self { tabs: Vec::new() }
    }

    #[must_use]
    pub fn push(mut self, tab: TabLink<'a>) -> Self {
        self.tabs.push(tab);
        self
    }
}

impl Render for TabBar<'_> {
    fn render(&self) -> Markup {
        html! {
            nav class="vault-tabs" aria-label="Tabs" {
                @for tab in &self.tabs {
                    (tab)
                }
            }
        }
    }
}
