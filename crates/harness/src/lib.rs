//! GitNotes E2E Test Harness
//!
//! This crate provides a Rust-controlled E2E testing framework that:
//! - Spawns (or attaches to) the GitNotes web client under test
//! - Controls Playwright through generated Node scripts
//! - Executes code-defined login scenarios step by step
//! - Compares screenshot artifacts against baselines
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Suite Runner (Rust)                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SuiteRunner                                                │
//! │    ├── prepare() -> AppHandle (spawn or attach) + Driver    │
//! │    ├── run_scenario(Scenario) -> ScenarioResult             │
//! │    └── write_report(SuiteResult) -> results.json            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scenario (code-defined)                                    │
//! │    ├── name, description, tags, viewport                    │
//! │    └── steps: [Step]                                        │
//! │          ├── goto { path }                                  │
//! │          ├── settle { ms }                                  │
//! │          ├── wait_visible { selector, timeout_ms }          │
//! │          ├── click { target, fallback? }                    │
//! │          ├── type_text / press_key                          │
//! │          ├── screenshot { name, full_page }                 │
//! │          └── ax_snapshot / count_elements (diagnostic)      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The flows under test live in a Flutter web bundle, so semantic DOM
//! selectors are mostly unavailable. Element location goes through
//! [`locate::Target`], which can fall back from an accessibility-role
//! locator to a viewport-relative coordinate click.

pub mod driver;
pub mod error;
pub mod locate;
pub mod runner;
pub mod scenario;
pub mod server;
pub mod visual;

pub use driver::{Browser, Driver, DriverConfig, ScenarioScript, StepOutcome};
pub use error::{HarnessError, HarnessResult};
pub use locate::Target;
pub use runner::{AppMode, RunnerConfig, ScenarioResult, SuiteResult, SuiteRunner};
pub use scenario::{Scenario, Step, Viewport};
pub use server::{AppConfig, AppHandle};
pub use visual::{ScreenshotCheck, VisualChecker, VisualConfig};
