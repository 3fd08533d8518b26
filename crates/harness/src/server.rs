//! App-under-test lifecycle - spawning and readiness probing
//!
//! The suite can either spawn the GitNotes web server itself or attach to a
//! dev server someone already started (the usual loop while working on the
//! client). Either way the app is only considered up once an HTTP probe
//! against it succeeds; the Flutter bundle exposes no health endpoint, so
//! the probe targets the app root and accepts any successful status.

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{HarnessError, HarnessResult};

/// Handle to the app under test.
pub struct AppHandle {
    child: Option<Child>,
    base_url: String,
}

impl AppHandle {
    /// Spawn the app server and wait for it to become ready.
    pub async fn spawn(config: AppConfig) -> HarnessResult<Self> {
        let port = config.port.unwrap_or_else(free_port);
        let base_url = format!("http://127.0.0.1:{port}");

        info!("spawning app server on port {port}");

        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .env("GITNOTES_WEB_HOST", "127.0.0.1")
            .env("GITNOTES_WEB_PORT", port.to_string())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let child = cmd.spawn().map_err(|e| {
            HarnessError::AppStartup(format!("failed to spawn {}: {e}", config.command.display()))
        })?;

        let handle = AppHandle {
            child: Some(child),
            base_url,
        };

        handle
            .wait_ready(&config.ready_path, config.startup_timeout)
            .await?;

        info!("app is ready at {}", handle.base_url);
        Ok(handle)
    }

    /// Attach to an externally managed instance. Nothing is spawned and
    /// nothing is stopped on drop; the probe only confirms something is
    /// listening.
    pub async fn attach(base_url: impl Into<String>, timeout: Duration) -> HarnessResult<Self> {
        let handle = AppHandle {
            child: None,
            base_url: base_url.into(),
        };

        handle.wait_ready("/", timeout).await?;

        info!("attached to running app at {}", handle.base_url);
        Ok(handle)
    }

    async fn wait_ready(&self, ready_path: &str, timeout: Duration) -> HarnessResult<()> {
        let probe_url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            ready_path.trim_start_matches('/')
        );
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = std::time::Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout {
            attempts += 1;

            match client.get(&probe_url).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) => {
                    warn!("readiness probe returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("waiting for app at {probe_url}...");
                    }
                    // Connection refused is expected while the server boots.
                    if !e.is_connect() {
                        warn!("readiness probe error: {e}");
                    }
                }
            }

            sleep(Duration::from_millis(100)).await;
        }

        Err(HarnessError::AppUnreachable(attempts))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether this handle owns the app process.
    pub fn is_managed(&self) -> bool {
        self.child.is_some()
    }

    /// Stop a managed app process. No-op for attached instances.
    pub fn stop(&mut self) -> HarnessResult<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        info!("stopping app server (pid: {})", child.id());

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                std::thread::sleep(Duration::from_millis(500));
            }
        }

        let _ = child.kill();
        let _ = child.wait();

        Ok(())
    }
}

impl Drop for AppHandle {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Configuration for spawning the app server.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server binary or launcher script.
    pub command: PathBuf,

    pub args: Vec<String>,

    /// Port to listen on (None = find a free one).
    pub port: Option<u16>,

    /// Path probed for readiness, relative to the base URL.
    pub ready_path: String,

    pub startup_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            command: PathBuf::from("target/debug/gitnotes-web"),
            args: Vec::new(),
            port: None,
            ready_path: "/".to_string(),
            startup_timeout: Duration::from_secs(30),
        }
    }
}

/// Find a free port by binding port 0 and reading back the assignment.
pub fn free_port() -> u16 {
    use std::net::TcpListener;

    TcpListener::bind("127.0.0.1:0")
        .expect("bind to probe for a free port")
        .local_addr()
        .expect("read local addr")
        .port()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_port_is_outside_the_reserved_range() {
        assert!(free_port() > 1024);
    }

    #[tokio::test]
    async fn attach_times_out_when_nothing_listens() {
        // Port just probed as free, so nothing is listening on it.
        let url = format!("http://127.0.0.1:{}", free_port());
        let result = AppHandle::attach(url, Duration::from_millis(300)).await;
        assert!(matches!(result, Err(HarnessError::AppUnreachable(_))));
    }

    #[test]
    fn default_probe_targets_the_app_root() {
        let config = AppConfig::default();
        assert_eq!(config.ready_path, "/");
        assert!(config.port.is_none());
    }
}
