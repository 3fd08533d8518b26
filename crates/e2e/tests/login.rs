//! Login suite entry point
//!
//! This file is the test binary that runs the login scenarios against a
//! live client. Run with: cargo test --package gitnotes-e2e --test login
//!
//! By default it attaches to a dev server on http://127.0.0.1:3000; pass
//! --app-bin to have the harness spawn and reap the server itself.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use gitnotes_e2e::login_suite;
use gitnotes_harness::runner::select;
use gitnotes_harness::{
    AppConfig, AppMode, Browser, DriverConfig, HarnessResult, RunnerConfig, SuiteRunner,
    VisualConfig,
};

#[derive(Parser, Debug)]
#[command(name = "gitnotes-e2e")]
#[command(about = "Login-screen E2E suite for the GitNotes web client")]
struct Args {
    /// Run only the scenario with this exact name
    #[arg(short, long)]
    scenario: Option<String>,

    /// Run only scenarios carrying this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Attach to an already-running app at this URL
    #[arg(long, env = "GITNOTES_APP_URL", default_value = "http://127.0.0.1:3000")]
    app_url: String,

    /// Spawn this app server binary instead of attaching
    #[arg(long)]
    app_bin: Option<PathBuf>,

    /// Extra argument for the spawned app server (repeatable)
    #[arg(long = "app-arg")]
    app_args: Vec<String>,

    /// Seconds to wait for the app to become ready
    #[arg(long, default_value = "30")]
    app_timeout: u64,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long, default_value = "chromium")]
    browser: Browser,

    /// Show the browser window instead of running headless
    #[arg(long)]
    headed: bool,

    /// Override the viewport width for every scenario
    #[arg(long)]
    viewport_width: Option<u32>,

    /// Override the viewport height for every scenario
    #[arg(long)]
    viewport_height: Option<u32>,

    /// Directory whose node_modules provides the playwright package
    #[arg(long)]
    driver_dir: Option<PathBuf>,

    /// Adopt captured screenshots as the new baselines
    #[arg(long)]
    update_baselines: bool,

    /// Output directory for the report, baselines and diffs
    #[arg(short, long, default_value = "test-results")]
    output: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("info".parse().expect("valid directive")),
        )
        .init();

    let args = Args::parse();

    let rt = tokio::runtime::Runtime::new().expect("create tokio runtime");
    match rt.block_on(run(args)) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    }
}

async fn run(args: Args) -> HarnessResult<bool> {
    let app = match &args.app_bin {
        Some(bin) => AppMode::Spawn(AppConfig {
            command: bin.clone(),
            args: args.app_args.clone(),
            port: None,
            ready_path: "/".to_string(),
            startup_timeout: Duration::from_secs(args.app_timeout),
        }),
        None => AppMode::Attach {
            base_url: args.app_url.clone(),
            timeout: Duration::from_secs(args.app_timeout),
        },
    };

    let screenshot_dir = args.output.join("screenshots");

    let config = RunnerConfig {
        app,
        driver: DriverConfig {
            screenshot_dir: screenshot_dir.clone(),
            browser: args.browser,
            headless: !args.headed,
            driver_dir: args.driver_dir.clone(),
            ..Default::default()
        },
        visual: VisualConfig {
            baseline_dir: args.output.join("baselines"),
            actual_dir: screenshot_dir,
            diff_dir: args.output.join("diffs"),
            auto_update: args.update_baselines,
            ..Default::default()
        },
        output_dir: args.output.clone(),
    };

    let mut scenarios = login_suite();
    if let (Some(width), Some(height)) = (args.viewport_width, args.viewport_height) {
        scenarios = scenarios
            .into_iter()
            .map(|s| s.viewport(width, height))
            .collect();
    }

    let selected: Vec<_> = select(&scenarios, args.scenario.as_deref(), args.tag.as_deref())
        .into_iter()
        .cloned()
        .collect();

    if selected.is_empty() {
        eprintln!("No scenario matches the given filter");
        return Ok(false);
    }

    let mut runner = SuiteRunner::with_config(config);
    let suite = runner.run_all(&selected).await?;

    if args.update_baselines {
        let updated = runner.update_baselines()?;
        tracing::info!("adopted {updated} baseline(s)");
    }

    runner.write_report(&suite)?;
    runner.stop_app()?;

    Ok(suite.failed == 0)
}
