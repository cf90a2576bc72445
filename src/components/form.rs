//! Form components for maud templates.

use maud::{html, Markup, Render};

/// A form container element.
#[derive(Debug)]
pub struct Form<'a> {
    /// Form action URL
    pub action: &'a str,
    /// HTTP method ("get" or "post")
    pub method: &'a str,
    /// Form content (inputs, buttons, etc.)
    pub content: Markup,
    /// Optional CSS class
    pub class: Option<&'a str>,
}

impl<'a> Form<'a> {
    #[must_use]
    pub fn new(action: &'a str, method: &'a str, content: Markup) -> Self {
        Self {
            action,
            method,
            content,
            class: None,
        }
    }

    /// Create a POST form.
    #[must_use]
    pub fn post(action: &'a str, content: Markup) -> Self {
        Self::new(action, "post", content)
    }

    #[must_use]
    pub fn class(mut self, class: &'a str) -> Self {
        self.class = Some(class);
        self
    }
}

impl Render for Form<'_> {
    fn render(&self) -> Markup {
        html! {
            form action=(self.action) method=(self.method) class=[self.class] {
                (self.content)
            }
        }
    }
}

/// An input element.
#[derive(Debug, Clone)]
pub struct Input<'a> {
    pub name: &'a str,
    /// Input type ("text", "password", "hidden", ...)
    pub r#type: &'a str,
    pub value: Option<&'a str>,
    pub placeholder: Option<&'a str>,
    pub required: bool,
    pub id: Option<&'a str>,
    pub autocomplete: Option<&'a str>,
    /// Pattern for client-side validation
    pub pattern: Option<&'a str>,
    pub minlength: Option<usize>,
    pub maxlength: Option<usize>,
}

impl<'a> Input<'a> {
    #[must_use]
    pub fn new(name: &'a str, r#type: &'a str) -> Self {
        Self {
            name,
            r#type,
            value: None,
            placeholder: None,
            required: false,
            id: None,
            autocomplete: None,
            pattern: None,
            minlength: None,
            maxlength: None,
        }
    }

    #[must_use]
    pub fn text(name: &'a str) -> Self {
        Self::new(name, "text")
    }

    #[must_use]
    pub fn password(name: &'a str) -> Self {
        Self::new(name, "password")
    }

    #[must_use]
    pub fn value(mut self, value: &'a str) -> Self {
        self.value = Some(value);
        self
    }

    #[must_use]
    pub fn placeholder(mut self, placeholder: &'a str) -> Self {
        self.placeholder = Some(placeholder);
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn id(mut self, id: &'a str) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn autocomplete(mut self, autocomplete: &'a str) -> Self {
        self.autocomplete = Some(autocomplete);
        self
    }

    #[must_use]
    pub fn pattern(mut self, pattern: &'a str) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Set client-side length bounds.
    #[must_use]
    pub fn length(mut self, min: usize, max: usize) -> Self {
        self.minlength = Some(min);
        self.maxlength = Some(max);
        self
    }
}

impl Render for Input<'_> {
    fn render(&self) -> Markup {
        html! {
            input
                type=(self.r#type)
                name=(self.name)
                value=[self.value]
                placeholder=[self.placeholder]
                required[self.required]
                id=[self.id]
                autocomplete=[self.autocomplete]
                pattern=[self.pattern]
                minlength=[self.minlength]
                maxlength=[self.maxlength];
        }
    }
}

/// A textarea element.
#[derive(Debug)]
pub struct TextArea<'a> {
    pub name: &'a str,
    pub value: Option<&'a str>,
    pub rows: Option<u32>,
    pub id: Option<&'a str>,
}

impl<'a> TextArea<'a> {
    #[must_use]
    pub fn new(name: &'a str) -> Self {
        Self {
            name,
            value: None,
            rows: None,
            id: None,
        }
    }

    #[must_use]
    pub fn value(mut self, value: &'a str) -> Self {
        self.value = Some(value);
        self
    }

    #[must_use]
    pub fn rows(mut self, rows: u32) -> Self {
        self.rows = Some(rows);
        self
    }

    #[must_use]
    pub fn id(mut self, id: &'a str) -> Self {
        self.id = Some(id);
        self
    }
}

impl Render for TextArea<'_> {
    fn render(&self) -> Markup {
        html! {
            textarea name=(self.name) rows=[self.rows] id=[self.id] {
                @if let Some(value) = self.value {
                    (value)
                }
            }
        }
    }
}

/// A hidden input element (convenience wrapper).
#[derive(Debug)]
pub struct HiddenInput<'a> {
    pub name: &'a str,
    pub value: &'a str,
}

impl<'a> HiddenInput<'a> {
    #[must_use]
    pub fn new(name: &'a str, value: &'a str) -> Self {
        Self { name, value }
    }
}

impl Render for HiddenInput<'_> {
    fn render(&self) -> Markup {
        html! {
            input type="hidden" name=(self.name) value=(self.value);
        }
    }
}

/// A form group container for label + input + help text.
#[derive(Debug)]
pub struct FormGroup<'a> {
    pub label: &'a str,
    /// Input ID (also used for label's `for` attribute)
    pub id: &'a str,
    pub input: Markup,
    pub help: Option<&'a str>,
}

impl<'a> FormGroup<'a> {
    #[must_use]
    pub fn new(label: &'a str, id: &'a str, input: Markup) -> Self {
        Self {
            label,
            id,
            input,
            help: None,
        }
    }

    #[must_use]
    pub fn help(mut self, help: &'a str) -> Self {
        self.help = Some(help);
        self
    }
}

impl Render for FormGroup<'_> {
    fn render(&self) -> Markup {
        html! {
            div {
                label for=(self.id) { (self.label) }
                (self.input)
                @if let Some(help) = self.help {
                    small { (help) }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_form() {
        let html = Form::post("/access", html! { "x" })
            .class("auth-form")
            .render()
            .into_string();
        assert!(html.contains(r#"action="/access""#));
        assert!(html.contains(r#"method="post""#));
        assert!(html.contains(r#"class="auth-form""#));
    }

    #[test]
    fn test_password_input_attributes() {
        let html = Input::password("password")
            .id("create-password")
            .required()
            .length(8, 100)
            .autocomplete("new-password")
            .render()
            .into_string();

        assert!(html.contains(r#"type="password""#));
        assert!(html.contains(r#"name="password""#));
        assert!(html.contains("required"));
        assert!(html.contains(r#"minlength="8""#));
        assert!(html.contains(r#"maxlength="100""#));
        assert!(!html.contains("value="));
    }

    #[test]
    fn test_textarea_escapes_content() {
        let html = TextArea::new("content")
            .value("</textarea><b>")
            .render()
            .into_string();
        assert!(html.contains("&lt;/textarea&gt;&lt;b&gt;"));
    }

    #[test]
    fn test_form_group_with_help() {
        let html = FormGroup::new("Username", "u", Input::text("username").id("u").render())
            .help("3-50 characters")
            .render()
            .into_string();
        assert!(html.contains(r#"<label for="u">Username</label>"#));
        assert!(html.contains("<small>3-50 characters</small>"));
    }
}
