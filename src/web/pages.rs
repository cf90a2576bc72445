//! Server-rendered pages.

use maud::{html, Markup, Render};

use crate::components::{
    Alert, BaseLayout, Form, FormGroup, HiddenInput, Input, TabBar, TabLink, TextArea,
};
use crate::constants::{
    MAX_PASSWORD_LENGTH, MAX_TABS_PER_SITE, MAX_TAB_NAME_LENGTH, MAX_USERNAME_LENGTH,
    MIN_PASSWORD_LENGTH, MIN_USERNAME_LENGTH,
};
use crate::db::{Site, Tab};

/// Landing page with the create-site and access-site forms.
#[must_use]
pub fn landing_page(flash: Option<Alert<'_>>, username: Option<&str>) -> Markup {
    let username = username.unwrap_or_default();

    let content = html! {
        h1 { "SecureText Vault" }
        p { "Password-protected text storage, organized in tabs." }

        @if let Some(alert) = flash {
            (alert)
        }

        section {
            h2 { "Create a new site" }
            (Form::post("/create", html! {
                (FormGroup::new(
                    "Username",
                    "create-username",
                    Input::text("username")
                        .id("create-username")
                        .value(username)
                        .placeholder("e.g., my_secure_notes")
                        .pattern("[A-Za-z0-9_-]+")
                        .length(MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH)
                        .required()
                        .render(),
                ).help("3-50 characters: letters, numbers, underscores, hyphens"))
                (FormGroup::new(
                    "Password",
                    "create-password",
                    Input::password("password")
                        .id("create-password")
                        .length(MIN_PASSWORD_LENGTH, MAX_PASSWORD_LENGTH)
                        .autocomplete("new-password")
                        .required()
                        .render(),
                ).help("8-100 characters. It cannot be recovered if lost."))
                (FormGroup::new(
                    "Confirm password",
                    "create-confirm",
                    Input::password("confirm_password")
                        .id("create-confirm")
                        .autocomplete("new-password")
                        .required()
                        .render(),
                ))
                button type="submit" { "Create Site" }
            }))
        }

        section {
            h2 { "Access an existing site" }
            (Form::post("/access", html! {
                (FormGroup::new(
                    "Username",
                    "access-username",
                    Input::text("username")
                        .id("access-username")
                        .value(username)
                        .autocomplete("username")
                        .required()
                        .render(),
                ))
                (FormGroup::new(
                    "Password",
                    "access-password",
                    Input::password("password")
                        .id("access-password")
                        .autocomplete("current-password")
                        .required()
                        .render(),
                ))
                button type="submit" { "Access Site" }
            }))
        }
    };

    BaseLayout::new("Welcome", None).render(content)
}

/// The site management page for one selected tab.
#[must_use]
pub fn site_page(
    site: &Site,
    tabs: &[Tab],
    active: &Tab,
    flash: Option<Alert<'_>>,
    max_content_bytes: usize,
) -> Markup {
    let tab_bar = tabs.iter().fold(TabBar::new(), |bar, tab| {
        bar.push(
            TabLink::new(&tab.tab_name, format!("/site?tab={}", tab.id))
                .active(tab.id == active.id),
        )
    });
    let base = format!("/site/tabs/{}", active.id);
    let can_add = i64::try_from(tabs.len()).unwrap_or(i64::MAX) < MAX_TABS_PER_SITE;

    let content = html! {
        h1 { (site.username) "'s SecureText Vault" }

        @if let Some(alert) = flash {
            (alert)
        }

        (tab_bar)

        section {
            h2 { (active.tab_name) }
            (Form::post(&format!("{base}/content"), html! {
                (TextArea::new("content").id("tab-content").rows(24).value(&active.content))
                small {
                    "Characters: " (active.content.chars().count())
                    " | Limit: " (max_content_bytes / (1024 * 1024)) " MB"
                    " | Last updated: " (active.updated_at)
                }
                div { button type="submit" { "Save" } }
            }))
        }

        section {
            h3 { "Tab actions" }
            (Form::post(&format!("{base}/rename"), html! {
                (Input::text("tab_name")
                    .value(&active.tab_name)
                    .length(1, MAX_TAB_NAME_LENGTH)
                    .required())
                button type="submit" { "Rename" }
            }).class("inline-form"))
            (Form::post(&format!("{base}/move"), html! {
                (HiddenInput::new("direction", "up"))
                button type="submit" { "Move left" }
            }).class("inline-form"))
            (Form::post(&format!("{base}/move"), html! {
                (HiddenInput::new("direction", "down"))
                button type="submit" { "Move right" }
            }).class("inline-form"))
            @if tabs.len() > 1 {
                (Form::post(&format!("{base}/delete"), html! {
                    button type="submit" { "Delete tab" }
                }).class("inline-form"))
            }
            p {
                "Export: "
                a href=(format!("{base}/export?format=txt")) { "TXT" } " "
                a href=(format!("{base}/export?format=json")) { "JSON" } " "
                a href=(format!("{base}/export?format=md")) { "Markdown" }
            }
        }

        @if can_add {
            section {
                h3 { "New tab" }
                (Form::post("/site/tabs", html! {
                    (Input::text("tab_name")
                        .placeholder("Tab name")
                        .length(1, MAX_TAB_NAME_LENGTH)
                        .required())
                    button type="submit" { "Create tab" }
                }))
            }
        } @else {
            p { small { "This site has the maximum of " (MAX_TABS_PER_SITE) " tabs." } }
        }

        section {
            h3 { "Site info" }
            p {
                "Created: " (site.created_at.get(..10).unwrap_or(site.created_at.as_str()))
            }
        }
    };

    BaseLayout::new(&site.username, Some(site)).render(content)
}
