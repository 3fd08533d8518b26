//! Playwright browser automation
//!
//! The harness does not speak CDP itself. Each scenario is rendered into a
//! self-contained Node script that drives Playwright, and the script is run
//! with `node`. The whole scenario executes in one browser session so form
//! state entered by one step is still there for the next.
//!
//! The generated script prints one `##STEP##`-prefixed JSON line per step;
//! `##NOTE##` lines carry free-form diagnostics (the locator fallback path
//! reports itself this way). Everything else on stdout is forwarded to the
//! log at debug level.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use tokio::process::Command as TokioCommand;
use tracing::{debug, info, warn};

use crate::error::{HarnessError, HarnessResult};
use crate::locate::js_str;
use crate::scenario::{Scenario, Step};

const STEP_PREFIX: &str = "##STEP## ";
const NOTE_PREFIX: &str = "##NOTE## ";

const DEFAULT_CLICK_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chromium" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(format!("unknown browser: {other}")),
        }
    }
}

/// Configuration for the driver.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Base URL of the app under test.
    pub base_url: String,

    /// Directory screenshots are written into.
    pub screenshot_dir: PathBuf,

    pub browser: Browser,
    pub headless: bool,

    /// Directory whose `node_modules` provides the `playwright` package.
    /// `None` runs node from the process working directory.
    pub driver_dir: Option<PathBuf>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            base_url: "http://127.0.0.1:3000".to_string(),
            screenshot_dir: PathBuf::from("test-results/screenshots"),
            browser: Browser::Chromium,
            headless: true,
            driver_dir: None,
        }
    }
}

/// Outcome of one executed step, as reported by the generated script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub index: usize,
    pub name: String,
    pub ok: bool,
    pub duration_ms: u64,
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A rendered scenario script, ready to hand to `node`.
#[derive(Debug, Clone)]
pub struct ScenarioScript {
    pub scenario: String,
    pub source: String,
    pub step_count: usize,
}

/// Handle to the Playwright installation.
pub struct Driver {
    config: DriverConfig,
}

impl Driver {
    pub fn new(config: DriverConfig) -> HarnessResult<Self> {
        std::fs::create_dir_all(&config.screenshot_dir)?;
        Ok(Driver { config })
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Probe the Playwright installation. Called once per run, before any
    /// scenario script is spawned.
    pub fn check_installed() -> HarnessResult<()> {
        let status = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(HarnessError::DriverNotFound),
        }
    }

    /// Execute a scenario and return the per-step outcomes. The returned
    /// vector stops at the first failed step.
    pub async fn run_scenario(&self, scenario: &Scenario) -> HarnessResult<Vec<StepOutcome>> {
        let script = self.render(scenario);
        debug!(scenario = %scenario.name, steps = script.step_count, "running driver script");

        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("scenario.js");
        std::fs::write(&script_path, &script.source)?;

        let mut cmd = TokioCommand::new("node");
        cmd.arg(&script_path);
        if let Some(dir) = &self.config.driver_dir {
            cmd.current_dir(dir);
        }

        let output = cmd.output().await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let outcomes = parse_output(&stdout)?;

        if !output.status.success() {
            let step_failed = outcomes.last().map(|o| !o.ok).unwrap_or(false);
            if !step_failed {
                // The script died outside any step (crash, missing browser).
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(HarnessError::Script(format!(
                    "scenario '{}' exited with {}: {}",
                    scenario.name,
                    output.status,
                    stderr.trim()
                )));
            }
        }

        if !output.stderr.is_empty() {
            warn!(scenario = %scenario.name, "driver stderr: {}", String::from_utf8_lossy(&output.stderr).trim());
        }

        Ok(outcomes)
    }

    /// Render a scenario into a Node script.
    pub fn render(&self, scenario: &Scenario) -> ScenarioScript {
        let mut source = String::new();

        source.push_str(&format!(
            r#"const {{ chromium, firefox, webkit }} = require('playwright');

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();
  const emit = (obj) => console.log('{step_prefix}' + JSON.stringify(obj));
  const note = (msg) => console.log('{note_prefix}' + msg);

  const run = async (index, name, body) => {{
    const started = Date.now();
    try {{
      const detail = await body();
      emit({{ index, name, ok: true, duration_ms: Date.now() - started,
             detail: detail === undefined ? null : detail }});
    }} catch (err) {{
      emit({{ index, name, ok: false, duration_ms: Date.now() - started,
             error: String((err && err.message) || err) }});
      throw err;
    }}
  }};

  try {{
"#,
            browser = self.config.browser.as_str(),
            headless = self.config.headless,
            width = scenario.viewport.width,
            height = scenario.viewport.height,
            step_prefix = STEP_PREFIX,
            note_prefix = NOTE_PREFIX,
        ));

        for (index, step) in scenario.steps.iter().enumerate() {
            let label = step.label();
            source.push_str(&format!(
                "    await run({index}, {}, async () => {{\n",
                js_str(&label)
            ));
            for line in self.step_body(step).lines() {
                source.push_str("      ");
                source.push_str(line);
                source.push('\n');
            }
            source.push_str("    });\n");
        }

        source.push_str(
            r#"
    process.exitCode = 0;
  } catch (err) {
    process.exitCode = 1;
  } finally {
    await browser.close();
  }
})();
"#,
        );

        ScenarioScript {
            scenario: scenario.name.clone(),
            source,
            step_count: scenario.steps.len(),
        }
    }

    fn step_body(&self, step: &Step) -> String {
        match step {
            Step::Goto { path } => {
                let url = join_url(&self.config.base_url, path);
                format!("await page.goto({});", js_str(&url))
            }
            Step::Settle { ms } => format!("await page.waitForTimeout({ms});"),
            Step::WaitVisible {
                selector,
                timeout_ms,
            } => format!(
                "await page.waitForSelector({}, {{ state: 'visible', timeout: {timeout_ms} }});",
                js_str(selector)
            ),
            Step::Click {
                target,
                fallback,
                timeout_ms,
            } => {
                let timeout = timeout_ms.unwrap_or(DEFAULT_CLICK_TIMEOUT_MS);
                match fallback {
                    None => target.click_js(timeout),
                    Some(fallback) => {
                        let mut body = String::from("try {\n");
                        for line in target.click_js(timeout).lines() {
                            body.push_str("  ");
                            body.push_str(line);
                            body.push('\n');
                        }
                        body.push_str("  return 'primary';\n");
                        body.push_str("} catch (err) {\n");
                        body.push_str(&format!(
                            "  note({} + String((err && err.message) || err).split('\\n')[0]);\n",
                            js_str(&format!(
                                "{} not located, falling back to {}: ",
                                target.describe(),
                                fallback.describe()
                            ))
                        ));
                        for line in fallback.click_js(timeout).lines() {
                            body.push_str("  ");
                            body.push_str(line);
                            body.push('\n');
                        }
                        body.push_str("  return 'fallback';\n");
                        body.push('}');
                        body
                    }
                }
            }
            Step::TypeText { text, delay_ms } => match delay_ms {
                Some(delay) => format!(
                    "await page.keyboard.type({}, {{ delay: {delay} }});",
                    js_str(text)
                ),
                None => format!("await page.keyboard.type({});", js_str(text)),
            },
            Step::PressKey { key } => format!("await page.keyboard.press({});", js_str(key)),
            Step::Screenshot { name, full_page } => {
                let path = self.config.screenshot_dir.join(format!("{name}.png"));
                format!(
                    "await page.screenshot({{ path: {}, fullPage: {full_page} }});",
                    js_str(&path.to_string_lossy())
                )
            }
            Step::AxSnapshot => "return await page.accessibility.snapshot();".to_string(),
            Step::CountElements { selector } => {
                format!("return await page.locator({}).count();", js_str(selector))
            }
        }
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Parse driver stdout into step outcomes. Note lines are logged, unknown
/// lines are kept at debug level for troubleshooting.
pub(crate) fn parse_output(stdout: &str) -> HarnessResult<Vec<StepOutcome>> {
    let mut outcomes = Vec::new();

    for line in stdout.lines() {
        if let Some(json) = line.strip_prefix(STEP_PREFIX) {
            let outcome: StepOutcome = serde_json::from_str(json)?;
            outcomes.push(outcome);
        } else if let Some(msg) = line.strip_prefix(NOTE_PREFIX) {
            info!("[driver] {msg}");
        } else if !line.trim().is_empty() {
            debug!("[driver] {line}");
        }
    }

    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locate::Target;

    fn driver() -> Driver {
        // Construct directly so rendering tests touch no directories.
        Driver {
            config: DriverConfig::default(),
        }
    }

    fn render(scenario: &Scenario) -> String {
        driver().render(scenario).source
    }

    #[test]
    fn script_header_carries_browser_and_viewport() {
        let scenario = Scenario::new("empty").viewport(1024, 768);
        let source = render(&scenario);
        assert!(source.contains("chromium.launch({ headless: true })"));
        assert!(source.contains("viewport: { width: 1024, height: 768 }"));
    }

    #[test]
    fn goto_joins_base_url_and_path() {
        let scenario = Scenario::new("nav").step(Step::Goto { path: "/".into() });
        let source = render(&scenario);
        assert!(source.contains("await page.goto('http://127.0.0.1:3000/');"));
    }

    #[test]
    fn wait_visible_renders_state_and_timeout() {
        let scenario = Scenario::new("wait").step(Step::WaitVisible {
            selector: "flt-glass-pane".into(),
            timeout_ms: 10_000,
        });
        let source = render(&scenario);
        assert!(source
            .contains("page.waitForSelector('flt-glass-pane', { state: 'visible', timeout: 10000 })"));
    }

    #[test]
    fn click_without_fallback_has_no_catch_block() {
        let scenario = Scenario::new("click").step(Step::Click {
            target: Target::center_offset(0, -100),
            fallback: None,
            timeout_ms: None,
        });
        let source = render(&scenario);
        assert!(source.contains("page.mouse.click(vp.width / 2 + (0), vp.height / 2 + (-100))"));
        assert!(!source.contains("return 'fallback';"));
    }

    #[test]
    fn click_with_fallback_tries_role_first() {
        let scenario = Scenario::new("connect").step(Step::Click {
            target: Target::role("button", "connect"),
            fallback: Some(Target::center_offset(0, 150)),
            timeout_ms: Some(3000),
        });
        let source = render(&scenario);

        let role_pos = source
            .find("page.getByRole('button', { name: /connect/i })")
            .expect("role locator present");
        let fallback_pos = source
            .find("vp.height / 2 + (150)")
            .expect("coordinate fallback present");
        assert!(role_pos < fallback_pos);
        assert!(source.contains("note('role:button[connect] not located, falling back to center+0,+150: '"));
    }

    #[test]
    fn keyboard_steps_target_the_focused_element() {
        let scenario = Scenario::new("kbd")
            .step(Step::TypeText {
                text: "testuser".into(),
                delay_ms: None,
            })
            .step(Step::PressKey { key: "Tab".into() });
        let source = render(&scenario);
        assert!(source.contains("await page.keyboard.type('testuser');"));
        assert!(source.contains("await page.keyboard.press('Tab');"));
    }

    #[test]
    fn screenshot_lands_in_configured_directory() {
        let scenario = Scenario::new("shot").step(Step::Screenshot {
            name: "login-initial".into(),
            full_page: true,
        });
        let source = render(&scenario);
        assert!(source.contains("login-initial.png"));
        assert!(source.contains("fullPage: true"));
    }

    #[test]
    fn diagnostic_steps_return_their_payload() {
        let scenario = Scenario::new("diag")
            .step(Step::AxSnapshot)
            .step(Step::CountElements {
                selector: "input".into(),
            });
        let source = render(&scenario);
        assert!(source.contains("return await page.accessibility.snapshot();"));
        assert!(source.contains("return await page.locator('input').count();"));
    }

    #[test]
    fn parse_output_reads_step_lines_and_skips_noise() {
        let stdout = "\
random warning from the bundle
##STEP## {\"index\":0,\"name\":\"goto:/\",\"ok\":true,\"duration_ms\":12,\"detail\":null}
##NOTE## role:button[connect] not located, falling back to center+0,+150: strict mode violation
##STEP## {\"index\":1,\"name\":\"click:role:button[connect]\",\"ok\":true,\"duration_ms\":40,\"detail\":\"fallback\"}
";
        let outcomes = parse_output(stdout).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].ok);
        assert_eq!(
            outcomes[1].detail,
            Some(serde_json::Value::String("fallback".into()))
        );
    }

    #[test]
    fn parse_output_surfaces_step_errors() {
        let stdout = "##STEP## {\"index\":0,\"name\":\"wait-visible:flt-glass-pane\",\"ok\":false,\"duration_ms\":10000,\"error\":\"Timeout 10000ms exceeded\"}\n";
        let outcomes = parse_output(stdout).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].ok);
        assert_eq!(outcomes[0].error.as_deref(), Some("Timeout 10000ms exceeded"));
    }

    #[test]
    fn parse_output_rejects_malformed_step_lines() {
        let stdout = "##STEP## {not json}\n";
        assert!(parse_output(stdout).is_err());
    }

    #[test]
    fn join_url_normalizes_slashes() {
        assert_eq!(join_url("http://h:3000", "/"), "http://h:3000/");
        assert_eq!(join_url("http://h:3000/", "/login"), "http://h:3000/login");
        assert_eq!(join_url("http://h:3000", "login"), "http://h:3000/login");
    }
}
