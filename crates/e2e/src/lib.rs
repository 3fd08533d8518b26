//! Login-screen scenarios for the GitNotes web client
//!
//! The client is a Flutter web bundle: once the engine boots it paints into
//! a canvas behind a single `flt-glass-pane` element, so the login form has
//! no per-field DOM nodes to select. The scenarios here work the way a
//! manual tester would: wait for the bundle to boot, click where the fields
//! are laid out, type, Tab between fields, and keep screenshots as
//! evidence. The Connect button is the one element with an accessible role,
//! so that click goes through the role locator first and only falls back to
//! coordinates.

use gitnotes_harness::{Scenario, Step, Target};

/// The element the Flutter engine mounts once it has booted. Its
/// visibility is the only reliable "app is up" signal the bundle gives us.
pub const GLASS_PANE: &str = "flt-glass-pane";

/// How long the bundle takes to boot before anything is worth looking at.
pub const BOOTSTRAP_SETTLE_MS: u64 = 3000;

/// Timeout for the glass pane to become visible.
pub const GLASS_PANE_TIMEOUT_MS: u64 = 10_000;

const FOCUS_SETTLE_MS: u64 = 500;
const FIELD_SWITCH_SETTLE_MS: u64 = 300;
const SUBMIT_SETTLE_MS: u64 = 1000;

// Login form layout relative to the viewport center, in CSS pixels.
// Estimated from the 1280x720 layout; the form is centered with the
// Connect button below the three fields.
const USERNAME_FIELD: (i32, i32) = (0, -100);
const FIRST_FIELD: (i32, i32) = (0, -80);
const CONNECT_BUTTON: (i32, i32) = (0, 150);

// Throwaway credentials typed into the form.
const TEST_USERNAME: &str = "testuser";
const TEST_REPOSITORY: &str = "my-notes-repo";
const TEST_TOKEN: &str = "ghp_test123456789";

/// All login scenarios, in execution order.
pub fn login_suite() -> Vec<Scenario> {
    vec![
        renders_login_screen(),
        text_inputs_present(),
        username_field_accepts_input(),
        fill_all_form_fields(),
        connect_button_click(),
        empty_submit_validation(),
    ]
}

/// The app boots and the login screen renders.
pub fn renders_login_screen() -> Scenario {
    Scenario::new("login-screen-renders")
        .describe("Open the app and wait for the Flutter glass pane")
        .tag("login")
        .tag("smoke")
        .visual(1.0)
        .step(Step::Goto { path: "/".into() })
        .step(Step::Settle {
            ms: BOOTSTRAP_SETTLE_MS,
        })
        .step(Step::Screenshot {
            name: "login-initial".into(),
            full_page: true,
        })
        .step(Step::WaitVisible {
            selector: GLASS_PANE.into(),
            timeout_ms: GLASS_PANE_TIMEOUT_MS,
        })
}

/// The form's input shims exist; the accessibility tree is captured for
/// inspection.
pub fn text_inputs_present() -> Scenario {
    Scenario::new("login-text-inputs-present")
        .describe("Record the input elements and the accessibility tree")
        .tag("login")
        .tag("smoke")
        .tag("a11y")
        .visual(1.0)
        .step(Step::Goto { path: "/".into() })
        .step(Step::Settle {
            ms: BOOTSTRAP_SETTLE_MS,
        })
        .step(Step::Screenshot {
            name: "login-fields".into(),
            full_page: true,
        })
        .step(Step::CountElements {
            selector: "input".into(),
        })
        .step(Step::AxSnapshot)
}

/// Clicking the username area focuses the field and typed text lands in it.
pub fn username_field_accepts_input() -> Scenario {
    let (dx, dy) = USERNAME_FIELD;
    Scenario::new("username-field-accepts-input")
        .describe("Focus the username field by position and type into it")
        .tag("login")
        .tag("form")
        .step(Step::Goto { path: "/".into() })
        .step(Step::Settle {
            ms: BOOTSTRAP_SETTLE_MS,
        })
        .step(Step::Screenshot {
            name: "before-input".into(),
            full_page: false,
        })
        .step(Step::Click {
            target: Target::center_offset(dx, dy),
            fallback: None,
            timeout_ms: None,
        })
        .step(Step::Settle {
            ms: FOCUS_SETTLE_MS,
        })
        .step(Step::TypeText {
            text: TEST_USERNAME.into(),
            delay_ms: None,
        })
        .step(Step::Settle {
            ms: FOCUS_SETTLE_MS,
        })
        .step(Step::Screenshot {
            name: "after-username-input".into(),
            full_page: false,
        })
}

/// All three fields filled by Tab order: username, repository, token.
pub fn fill_all_form_fields() -> Scenario {
    let (dx, dy) = FIRST_FIELD;
    Scenario::new("fill-all-form-fields")
        .describe("Fill username, repository and token via keyboard focus order")
        .tag("login")
        .tag("form")
        .step(Step::Goto { path: "/".into() })
        .step(Step::Settle {
            ms: BOOTSTRAP_SETTLE_MS,
        })
        .step(Step::Click {
            target: Target::center_offset(dx, dy),
            fallback: None,
            timeout_ms: None,
        })
        .step(Step::Settle {
            ms: FIELD_SWITCH_SETTLE_MS,
        })
        .step(Step::TypeText {
            text: TEST_USERNAME.into(),
            delay_ms: None,
        })
        .step(Step::PressKey { key: "Tab".into() })
        .step(Step::Settle {
            ms: FIELD_SWITCH_SETTLE_MS,
        })
        .step(Step::TypeText {
            text: TEST_REPOSITORY.into(),
            delay_ms: None,
        })
        .step(Step::PressKey { key: "Tab".into() })
        .step(Step::Settle {
            ms: FIELD_SWITCH_SETTLE_MS,
        })
        .step(Step::TypeText {
            text: TEST_TOKEN.into(),
            delay_ms: None,
        })
        .step(Step::Screenshot {
            name: "all-fields-filled".into(),
            full_page: false,
        })
}

/// The Connect button via its accessible role, with a coordinate fallback
/// for builds that ship without semantics.
pub fn connect_button_click() -> Scenario {
    let (dx, dy) = CONNECT_BUTTON;
    Scenario::new("connect-button-click")
        .describe("Click Connect by role, or by position below the form")
        .tag("login")
        .tag("submit")
        .step(Step::Goto { path: "/".into() })
        .step(Step::Settle {
            ms: BOOTSTRAP_SETTLE_MS,
        })
        .step(Step::Screenshot {
            name: "before-connect".into(),
            full_page: false,
        })
        .step(Step::Click {
            target: Target::role("button", "connect"),
            fallback: Some(Target::center_offset(dx, dy)),
            timeout_ms: Some(3000),
        })
        .step(Step::Settle {
            ms: SUBMIT_SETTLE_MS,
        })
        .step(Step::Screenshot {
            name: "after-connect-click".into(),
            full_page: false,
        })
}

/// Submitting the empty form; the screenshots carry the validation state.
pub fn empty_submit_validation() -> Scenario {
    let (dx, dy) = CONNECT_BUTTON;
    Scenario::new("empty-submit-validation")
        .describe("Click Connect with nothing filled in")
        .tag("login")
        .tag("submit")
        .tag("validation")
        .step(Step::Goto { path: "/".into() })
        .step(Step::Settle {
            ms: BOOTSTRAP_SETTLE_MS,
        })
        .step(Step::Screenshot {
            name: "before-validation".into(),
            full_page: false,
        })
        .step(Step::Click {
            target: Target::center_offset(dx, dy),
            fallback: None,
            timeout_ms: None,
        })
        .step(Step::Settle {
            ms: SUBMIT_SETTLE_MS,
        })
        .step(Step::Screenshot {
            name: "validation-errors".into(),
            full_page: false,
        })
}
