//! Suite orchestration: app, driver, scenarios, screenshot checks, report

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::driver::{Driver, DriverConfig, StepOutcome};
use crate::error::{HarnessError, HarnessResult};
use crate::scenario::Scenario;
use crate::server::{AppConfig, AppHandle};
use crate::visual::{VisualChecker, VisualConfig};

/// How the runner obtains the app under test.
#[derive(Debug, Clone)]
pub enum AppMode {
    /// Spawn the app server and reap it afterwards.
    Spawn(AppConfig),

    /// Probe an instance someone else manages.
    Attach { base_url: String, timeout: Duration },
}

/// Configuration for the suite runner.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub app: AppMode,
    pub driver: DriverConfig,
    pub visual: VisualConfig,
    pub output_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            // The usual dev loop keeps a server running on 3000; spawning
            // is opt-in via the CLI.
            app: AppMode::Attach {
                base_url: "http://127.0.0.1:3000".to_string(),
                timeout: Duration::from_secs(30),
            },
            driver: DriverConfig::default(),
            visual: VisualConfig::default(),
            output_dir: PathBuf::from("test-results"),
        }
    }
}

/// Result of one scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub steps: Vec<StepOutcome>,
    pub screenshots: Vec<ScreenshotCheckResult>,
    pub error: Option<String>,
}

/// Serializable view of a screenshot check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotCheckResult {
    pub name: String,
    pub matches: bool,
    pub diff_percent: f64,
    pub diff_image: Option<String>,
}

/// Result of the whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

/// Select scenarios by exact name or tag. No filter returns everything.
pub fn select<'a>(
    scenarios: &'a [Scenario],
    name: Option<&str>,
    tag: Option<&str>,
) -> Vec<&'a Scenario> {
    scenarios
        .iter()
        .filter(|s| name.map(|n| s.name == n).unwrap_or(true))
        .filter(|s| tag.map(|t| s.has_tag(t)).unwrap_or(true))
        .collect()
}

/// Main E2E suite runner.
pub struct SuiteRunner {
    config: RunnerConfig,
    app: Option<AppHandle>,
    driver: Option<Driver>,
}

impl SuiteRunner {
    pub fn new() -> Self {
        Self::with_config(RunnerConfig::default())
    }

    pub fn with_config(config: RunnerConfig) -> Self {
        SuiteRunner {
            config,
            app: None,
            driver: None,
        }
    }

    /// Bring up the app (or confirm it is reachable) and the driver.
    pub async fn prepare(&mut self) -> HarnessResult<()> {
        if self.app.is_none() {
            let app = match &self.config.app {
                AppMode::Spawn(app_config) => AppHandle::spawn(app_config.clone()).await?,
                AppMode::Attach { base_url, timeout } => {
                    AppHandle::attach(base_url.clone(), *timeout).await?
                }
            };
            self.config.driver.base_url = app.base_url().to_string();
            self.app = Some(app);
        }

        if self.driver.is_none() {
            Driver::check_installed()?;
            self.driver = Some(Driver::new(self.config.driver.clone())?);
        }

        Ok(())
    }

    /// Stop a spawned app. Attached instances are left alone.
    pub fn stop_app(&mut self) -> HarnessResult<()> {
        if let Some(mut app) = self.app.take() {
            app.stop()?;
        }
        Ok(())
    }

    /// Run every scenario in order, stopping each at its first failed step.
    pub async fn run_all(&mut self, scenarios: &[Scenario]) -> HarnessResult<SuiteResult> {
        let started_at = Utc::now();
        let start = Instant::now();

        self.prepare().await?;

        info!("running {} scenario(s)...", scenarios.len());

        let mut results = Vec::new();
        let mut passed = 0;
        let mut failed = 0;

        for scenario in scenarios {
            match self.run_scenario(scenario).await {
                Ok(result) => {
                    if result.success {
                        passed += 1;
                        info!("✓ {} ({} ms)", result.name, result.duration_ms);
                    } else {
                        failed += 1;
                        error!(
                            "✗ {} - {}",
                            result.name,
                            result.error.as_deref().unwrap_or("unknown error")
                        );
                    }
                    results.push(result);
                }
                Err(e) => {
                    failed += 1;
                    error!("✗ {} - {e}", scenario.name);
                    results.push(ScenarioResult {
                        name: scenario.name.clone(),
                        success: false,
                        duration_ms: 0,
                        steps: vec![],
                        screenshots: vec![],
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;

        info!("");
        info!("suite: {passed} passed, {failed} failed ({duration_ms} ms)");

        Ok(SuiteResult {
            started_at,
            total: scenarios.len(),
            passed,
            failed,
            duration_ms,
            results,
        })
    }

    /// Run a single scenario.
    pub async fn run_scenario(&mut self, scenario: &Scenario) -> HarnessResult<ScenarioResult> {
        self.prepare().await?;
        let driver = self
            .driver
            .as_ref()
            .ok_or_else(|| HarnessError::Script("driver not prepared".to_string()))?;

        let start = Instant::now();
        let steps = driver.run_scenario(scenario).await?;

        let mut scenario_error = steps
            .last()
            .filter(|outcome| !outcome.ok)
            .map(|outcome| {
                format!(
                    "step '{}' failed: {}",
                    outcome.name,
                    outcome.error.as_deref().unwrap_or("no error reported")
                )
            });

        let mut screenshots = Vec::new();
        if scenario.visual && scenario_error.is_none() {
            let checker = VisualChecker::new(self.config.visual.clone())?;

            for name in scenario.screenshot_names() {
                match checker.check(name, Some(scenario.visual_threshold)) {
                    Ok(check) => {
                        if !check.matches && scenario_error.is_none() {
                            scenario_error = Some(
                                HarnessError::ScreenshotMismatch {
                                    name: name.to_string(),
                                    diff_percent: check.diff_percent,
                                    threshold: scenario.visual_threshold,
                                }
                                .to_string(),
                            );
                        }
                        screenshots.push(ScreenshotCheckResult {
                            name: check.name,
                            matches: check.matches,
                            diff_percent: check.diff_percent,
                            diff_image: check
                                .diff_image
                                .map(|p| p.to_string_lossy().to_string()),
                        });
                    }
                    Err(HarnessError::BaselineNotFound(_)) => {
                        // First run; rerun with --update-baselines to adopt.
                        info!("no baseline for '{name}' yet");
                    }
                    Err(e) => {
                        scenario_error = Some(format!("screenshot check failed: {e}"));
                    }
                }
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        let success = scenario_error.is_none();

        Ok(ScenarioResult {
            name: scenario.name.clone(),
            success,
            duration_ms,
            steps,
            screenshots,
            error: scenario_error,
        })
    }

    /// Adopt every captured screenshot as the new baseline.
    pub fn update_baselines(&self) -> HarnessResult<usize> {
        let checker = VisualChecker::new(self.config.visual.clone())?;
        checker.update_all_baselines()
    }

    /// Write the suite report as pretty JSON.
    pub fn write_report(&self, suite: &SuiteResult) -> HarnessResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("results.json");
        let json = serde_json::to_string_pretty(suite)?;
        std::fs::write(&path, json)?;

        info!("report written to {}", path.display());
        Ok(path)
    }
}

impl Default for SuiteRunner {
    fn default() -> Self {
        Self::new()
    }
}
