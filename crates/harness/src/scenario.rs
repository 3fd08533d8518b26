//! Code-defined test scenarios
//!
//! A scenario is a linear sequence of steps executed in a single browser
//! session. Scenarios are plain Rust values built with the methods on
//! [`Scenario`]; there is no on-disk spec format.

use serde::{Deserialize, Serialize};

use crate::locate::Target;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport {
            width: 1280,
            height: 720,
        }
    }
}

/// A single step in a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Navigate to a path relative to the app base URL.
    Goto { path: String },

    /// Fixed-duration wait for the UI to render. The Flutter bundle gives
    /// no load event once the engine takes over, so some waits stay
    /// time-based.
    Settle { ms: u64 },

    /// Assert that an element becomes visible within the timeout.
    WaitVisible { selector: String, timeout_ms: u64 },

    /// Click a target. If `fallback` is set and the primary target cannot
    /// be located, the fallback is clicked instead.
    Click {
        target: Target,
        #[serde(default)]
        fallback: Option<Target>,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Type text into whichever element currently has focus.
    TypeText {
        text: String,
        #[serde(default)]
        delay_ms: Option<u64>,
    },

    /// Press a single key (e.g. "Tab").
    PressKey { key: String },

    /// Capture a screenshot into the artifact directory.
    Screenshot {
        name: String,
        #[serde(default)]
        full_page: bool,
    },

    /// Capture the accessibility tree. Diagnostic only.
    AxSnapshot,

    /// Count elements matching a selector. Diagnostic only.
    CountElements { selector: String },
}

impl Step {
    /// Label used in step outcomes and log lines.
    pub fn label(&self) -> String {
        match self {
            Step::Goto { path } => format!("goto:{path}"),
            Step::Settle { ms } => format!("settle:{ms}ms"),
            Step::WaitVisible { selector, .. } => format!("wait-visible:{selector}"),
            Step::Click { target, .. } => format!("click:{}", target.describe()),
            Step::TypeText { text, .. } => format!("type:{}", &text[..text.len().min(24)]),
            Step::PressKey { key } => format!("press:{key}"),
            Step::Screenshot { name, .. } => format!("screenshot:{name}"),
            Step::AxSnapshot => "ax-snapshot".to_string(),
            Step::CountElements { selector } => format!("count:{selector}"),
        }
    }

    /// Name of the screenshot this step produces, if any.
    pub fn screenshot_name(&self) -> Option<&str> {
        match self {
            Step::Screenshot { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// A complete scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub viewport: Viewport,

    pub steps: Vec<Step>,

    /// Compare this scenario's screenshots against stored baselines.
    #[serde(default)]
    pub visual: bool,

    /// Allowed pixel difference, in percent, when `visual` is on.
    #[serde(default = "default_visual_threshold")]
    pub visual_threshold: f64,
}

fn default_visual_threshold() -> f64 {
    0.5
}

impl Scenario {
    pub fn new(name: impl Into<String>) -> Self {
        Scenario {
            name: name.into(),
            description: String::new(),
            tags: Vec::new(),
            viewport: Viewport::default(),
            steps: Vec::new(),
            visual: false,
            visual_threshold: default_visual_threshold(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = Viewport { width, height };
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Enable screenshot baseline comparison with the given threshold.
    pub fn visual(mut self, threshold: f64) -> Self {
        self.visual = true;
        self.visual_threshold = threshold;
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Names of all screenshots this scenario captures, in order.
    pub fn screenshot_names(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter_map(Step::screenshot_name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Scenario {
        Scenario::new("login-smoke")
            .describe("Open the login screen and wait for the glass pane")
            .tag("auth")
            .tag("smoke")
            .step(Step::Goto { path: "/".into() })
            .step(Step::Settle { ms: 3000 })
            .step(Step::WaitVisible {
                selector: "flt-glass-pane".into(),
                timeout_ms: 10_000,
            })
            .step(Step::Screenshot {
                name: "login-initial".into(),
                full_page: true,
            })
    }

    #[test]
    fn builder_keeps_step_order() {
        let s = sample();
        assert_eq!(s.steps.len(), 4);
        assert_eq!(s.steps[0].label(), "goto:/");
        assert_eq!(s.steps[2].label(), "wait-visible:flt-glass-pane");
    }

    #[test]
    fn default_viewport_matches_driver_default() {
        let s = sample();
        assert_eq!(s.viewport, Viewport::default());
        assert_eq!(s.viewport.width, 1280);
        assert_eq!(s.viewport.height, 720);
    }

    #[test]
    fn screenshot_names_are_collected_in_order() {
        let s = sample().step(Step::Screenshot {
            name: "login-late".into(),
            full_page: false,
        });
        assert_eq!(s.screenshot_names(), vec!["login-initial", "login-late"]);
    }

    #[test]
    fn tags_filter() {
        let s = sample();
        assert!(s.has_tag("smoke"));
        assert!(!s.has_tag("visual"));
    }

    #[test]
    fn type_label_truncates_long_text() {
        let step = Step::TypeText {
            text: "x".repeat(100),
            delay_ms: None,
        };
        assert_eq!(step.label().len(), "type:".len() + 24);
    }
}
