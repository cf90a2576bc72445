//! Maud HTML template components for the web UI.
//!
//! - `layout`: Base page layout and navigation
//! - `alert`: Flash messages
//! - `form`: Form elements and input components
//! - `tabs`: The tab strip on the site page

pub mod alert;
pub mod form;
pub mod layout;
pub mod tabs;

pub use alert::{Alert, AlertVariant};
pub use form::{Form, FormGroup, HiddenInput, Input, TextArea};
pub use layout::BaseLayout;
pub use tabs::{TabBar, TabLink};

/// Re-export maud for convenience
pub use maud::{html, Markup, PreEscaped, DOCTYPE};
