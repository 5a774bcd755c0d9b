//! Browser session management for dynamic-render sources.

use anyhow::{anyhow, Result};
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use which::which;

/// An exclusively-owned browser instance plus its CDP handler task.
///
/// One session backs one harvest run. It is never shared across logical
/// threads (session state would corrupt) and is released deterministically
/// through [`BrowserSession::close`] when the run ends, success or not.
pub struct BrowserSession {
    browser: Option<Browser>,
    handler_task: Option<JoinHandle<()>>,
}

impl BrowserSession {
    /// Launch a browser, preferring system Chromium and falling back to a
    /// fetched build under `profile_dir`.
    pub async fn launch(profile_dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(profile_dir).await?;
        let chrome_path = resolve_chromium(&profile_dir.join("chromium")).await?;
        let config = build_browser_config(&chrome_path, profile_dir)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| anyhow!("failed to launch browser: {}", e))?;

        // Drive CDP messages until the browser goes away. A burst of
        // consecutive errors means the process crashed underneath us.
        let handler_task = tokio::spawn(async move {
            let mut error_count = 0;
            const MAX_ERRORS: usize = 10;

            while let Some(event) = handler.next().await {
                match event {
                    Ok(_) => error_count = 0,
                    Err(e) => {
                        error_count += 1;
                        warn!(
                            "browser handler error ({}/{}): {:?}",
                            error_count, MAX_ERRORS, e
                        );
                        if error_count >= MAX_ERRORS {
                            error!(
                                "browser handler hit {} consecutive errors, browser process may have crashed",
                                error_count
                            );
                            break;
                        }
                    }
                }
            }
        });

        Ok(Self {
            browser: Some(browser),
            handler_task: Some(handler_task),
        })
    }

    /// Open a fresh page on this session.
    pub async fn new_page(&self) -> Result<Page> {
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| anyhow!("browser session already closed"))?;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| anyhow!("failed to open page: {}", e))?;
        Ok(page)
    }

    /// Shut the browser down and reap the handler task. Idempotent.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(browser) = self.browser.take() {
            info!("closing browser session");
            drop(browser);
            if let Some(handler_task) = self.handler_task.take() {
                let _ = tokio::time::timeout(Duration::from_secs(2), handler_task).await;
            }
        }
        Ok(())
    }
}

/// Find a usable Chromium, downloading one when the system has none.
async fn resolve_chromium(fetch_dir: &Path) -> Result<PathBuf> {
    if let Some(path) = find_system_chromium() {
        info!(path = %path.display(), "using system Chromium");
        return Ok(path);
    }

    info!("no system Chromium found, downloading via BrowserFetcher");
    tokio::fs::create_dir_all(fetch_dir).await?;
    let fetcher = BrowserFetcher::new(
        BrowserFetcherOptions::builder()
            .with_path(fetch_dir)
            .build()
            .map_err(|e| anyhow!("failed to build fetcher options: {}", e))?,
    );
    let fetched = fetcher
        .fetch()
        .await
        .map_err(|e| anyhow!("failed to fetch Chromium: {}", e))?;
    Ok(fetched.executable_path)
}

fn find_system_chromium() -> Option<PathBuf> {
    let candidates = [
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/usr/local/bin/chromium",
        "/usr/local/bin/chromium-browser",
        "/opt/chromium/chromium",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    ];
    for path in &candidates {
        if Path::new(path).exists() {
            return Some(PathBuf::from(path));
        }
    }

    which("chromium")
        .or_else(|_| which("chromium-browser"))
        .or_else(|_| which("google-chrome"))
        .ok()
}

fn is_docker() -> bool {
    Path::new("/.dockerenv").exists()
        || std::fs::read_to_string("/proc/self/cgroup")
            .ok()
            .map(|s| s.contains("docker") || s.contains("containerd"))
            .unwrap_or(false)
}

fn build_browser_config(chrome_path: &Path, profile_dir: &Path) -> Result<BrowserConfig> {
    let mut builder = BrowserConfig::builder()
        .chrome_executable(chrome_path)
        .arg("--headless=new")
        .arg("--disable-extensions")
        .arg("--disable-notifications")
        .arg("--disable-sync")
        .arg("--disable-default-apps")
        .arg("--log-level=3")
        .arg("--window-size=1280,900")
        .arg(format!("--user-data-dir={}", profile_dir.join("profile").display()))
        .arg("--user-agent=Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36");

    // Sandboxing and /dev/shm are the usual container pain points.
    if is_docker() {
        builder = builder
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--disable-crash-reporter");
    }

    builder.build().map_err(|e| anyhow!(e))
}
