//! Element location targets
//!
//! The GitNotes client is a Flutter web bundle: it renders into a canvas
//! behind a single glass-pane element, so most of the page has no usable DOM
//! selectors. A [`Target`] captures the three ways the suite reaches UI
//! elements, in decreasing order of reliability:
//!
//! 1. a plain CSS selector, for the few real DOM nodes (the glass pane,
//!    semantic `input` shims),
//! 2. an accessibility-role locator with an accessible-name filter,
//! 3. a viewport-relative coordinate, anchored at the viewport center.
//!
//! A click step may carry a fallback target. When the primary locator fails
//! the fallback is clicked instead, and the switch is logged.

use serde::{Deserialize, Serialize};

/// A clickable (or watchable) location on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Target {
    /// CSS selector.
    Css { selector: String },

    /// Accessibility-role locator. `name` filters on the accessible name,
    /// matched case-insensitively as a substring.
    Role { role: String, name: Option<String> },

    /// Coordinate relative to the viewport center, in CSS pixels.
    /// Positive `dy` is below the center, positive `dx` right of it.
    CenterOffset { dx: i32, dy: i32 },
}

impl Target {
    pub fn css(selector: impl Into<String>) -> Self {
        Target::Css {
            selector: selector.into(),
        }
    }

    pub fn role(role: impl Into<String>, name: impl Into<String>) -> Self {
        Target::Role {
            role: role.into(),
            name: Some(name.into()),
        }
    }

    pub fn center_offset(dx: i32, dy: i32) -> Self {
        Target::CenterOffset { dx, dy }
    }

    /// Short form used in step names and log lines.
    pub fn describe(&self) -> String {
        match self {
            Target::Css { selector } => format!("css:{selector}"),
            Target::Role { role, name } => match name {
                Some(n) => format!("role:{role}[{n}]"),
                None => format!("role:{role}"),
            },
            Target::CenterOffset { dx, dy } => format!("center{dx:+},{dy:+}"),
        }
    }

    /// Whether this target resolves through the page's semantics (and can
    /// therefore fail to match) rather than through raw coordinates.
    pub fn is_semantic(&self) -> bool {
        !matches!(self, Target::CenterOffset { .. })
    }

    /// Render a click on this target as driver-script statements.
    pub(crate) fn click_js(&self, timeout_ms: u64) -> String {
        match self {
            Target::Css { selector } => format!(
                "await page.click({}, {{ timeout: {timeout_ms} }});",
                js_str(selector)
            ),
            Target::Role { role, name } => {
                let locator = match name {
                    Some(n) => format!(
                        "page.getByRole({}, {{ name: {} }})",
                        js_str(role),
                        js_regex_ci(n)
                    ),
                    None => format!("page.getByRole({})", js_str(role)),
                };
                format!("await {locator}.click({{ timeout: {timeout_ms} }});")
            }
            Target::CenterOffset { dx, dy } => format!(
                "const vp = page.viewportSize();\n\
                 await page.mouse.click(vp.width / 2 + ({dx}), vp.height / 2 + ({dy}));"
            ),
        }
    }
}

/// Quote a string as a single-quoted JS literal.
pub(crate) fn js_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Render a case-insensitive JS regex literal matching `name` as a
/// substring. Metacharacters in the name are escaped so accessible names
/// like "Save (all)" match literally.
pub(crate) fn js_regex_ci(name: &str) -> String {
    let escaped = regex::escape(name).replace('/', "\\/");
    format!("/{escaped}/i")
}
