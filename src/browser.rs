//! Headless Chrome engine for a single capture
//!
//! `ChromeEngine` owns one Chrome process, the task that drives its DevTools
//! Protocol connection and the one page the run uses. The runner talks to it
//! through the `BrowserEngine` trait so the sequence can be exercised without
//! a browser.

use crate::{CaptureError, Config, Viewport};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, NavigateParams};
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// How long each step of closing the browser may take before it is killed.
pub const BROWSER_EXIT_GRACE: Duration = Duration::from_secs(5);

/// Browser operations the capture sequence needs, in the order it uses them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BrowserEngine: Send {
    /// Open the page the rest of the run works on and size it to `viewport`.
    async fn open_page(&mut self, viewport: &Viewport) -> Result<(), CaptureError>;

    /// Load `url` and wait for the load event.
    async fn navigate(&mut self, url: &str) -> Result<(), CaptureError>;

    async fn page_title(&mut self) -> Option<String>;

    async fn page_url(&mut self) -> Option<String>;

    /// PNG bytes of the current page.
    async fn capture(&mut self, full_page: bool) -> Result<Vec<u8>, CaptureError>;

    /// Close the page and the browser. Must be safe to call once after any
    /// other call has failed.
    async fn shutdown(&mut self);
}

/// Chrome command-line arguments for a headless capture. Headless mode and
/// window size come from the `BrowserConfig` builder and are not repeated here.
///
/// # Examples
///
/// ```rust
/// use admin_capture::chrome_args;
///
/// let args = chrome_args();
/// assert!(args.contains(&"--no-sandbox".to_string()));
/// ```
pub fn chrome_args() -> Vec<String> {
    vec![
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-gpu".to_string(),
        "--disable-extensions".to_string(),
        "--disable-default-apps".to_string(),
        "--disable-sync".to_string(),
        "--disable-features=TranslateUI".to_string(),
        "--no-first-run".to_string(),
        "--hide-scrollbars".to_string(),
    ]
}

/// Profile directory unique to this process and run.
pub fn user_data_dir() -> PathBuf {
    std::env::temp_dir().join(format!(
        "admin-capture-{}-{}",
        std::process::id(),
        uuid::Uuid::new_v4()
    ))
}

pub fn create_browser_config(
    config: &Config,
    user_data_dir: &Path,
) -> Result<BrowserConfig, CaptureError> {
    let mut builder = BrowserConfig::builder()
        .window_size(config.viewport.width, config.viewport.height)
        .user_data_dir(user_data_dir)
        .args(chrome_args());

    if let Some(chrome_path) = &config.chrome_path {
        builder = builder.chrome_executable(chrome_path);
    }

    builder.build().map_err(CaptureError::BrowserLaunchFailed)
}

/// Temporary Chrome profile directory, removed when dropped.
#[derive(Debug)]
pub struct ProfileDir {
    path: PathBuf,
}

impl ProfileDir {
    pub fn create() -> Result<Self, CaptureError> {
        let path = user_data_dir();
        std::fs::create_dir_all(&path).map_err(|e| {
            CaptureError::BrowserLaunchFailed(format!("Failed to create user data dir: {e}"))
        })?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ProfileDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            debug!("Profile directory {} left behind: {}", self.path.display(), e);
        }
    }
}

/// Lifecycle of the browser process, separate from page operations.
#[async_trait]
pub trait BrowserProcess: Send {
    /// Ask the browser to exit over the DevTools connection.
    async fn request_close(&mut self) -> Result<(), String>;

    async fn wait_exit(&mut self) -> Result<(), String>;

    async fn force_kill(&mut self) -> Result<(), String>;
}

#[async_trait]
impl BrowserProcess for Browser {
    async fn request_close(&mut self) -> Result<(), String> {
        self.close().await.map(|_| ()).map_err(|e| e.to_string())
    }

    async fn wait_exit(&mut self) -> Result<(), String> {
        self.wait().await.map(|_| ()).map_err(|e| e.to_string())
    }

    async fn force_kill(&mut self) -> Result<(), String> {
        match self.kill().await {
            Some(result) => result.map_err(|e| e.to_string()),
            None => Ok(()),
        }
    }
}

/// How the browser process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessRelease {
    /// Exited after a close request
    Closed,
    /// Had to be killed
    Killed,
    /// Still running after the kill, left to the OS
    Abandoned,
}

/// Close the browser, killing it when the close request fails or the process
/// does not exit within `grace`. Every await is bounded.
pub async fn release_process<P: BrowserProcess>(
    process: &mut P,
    grace: Duration,
) -> ProcessRelease {
    let close_requested = match timeout(grace, process.request_close()).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!("Browser close failed: {}", e);
            false
        }
        Err(_) => {
            warn!("Browser close timed out after {:?}", grace);
            false
        }
    };

    if close_requested {
        match timeout(grace, process.wait_exit()).await {
            Ok(Ok(())) => return ProcessRelease::Closed,
            Ok(Err(e)) => warn!("Waiting for browser exit failed: {}", e),
            Err(_) => warn!("Browser did not exit within {:?}", grace),
        }
    }

    if let Err(e) = process.force_kill().await {
        warn!("Killing browser failed: {}", e);
    }

    match timeout(grace, process.wait_exit()).await {
        Ok(Ok(())) => ProcessRelease::Killed,
        Ok(Err(e)) => {
            error!("Waiting for killed browser failed: {}", e);
            ProcessRelease::Abandoned
        }
        Err(_) => {
            error!("Browser still running {:?} after kill", grace);
            ProcessRelease::Abandoned
        }
    }
}

pub struct ChromeEngine {
    browser: Browser,
    /// Background task handling Chrome DevTools Protocol communication
    handler: JoinHandle<()>,
    page: Option<Page>,
    // Declared after `browser` so the child is killed before the profile goes
    profile: ProfileDir,
    closed: bool,
}

impl ChromeEngine {
    pub async fn launch(config: &Config) -> Result<Self, CaptureError> {
        let profile = ProfileDir::create()?;
        let browser_config = create_browser_config(config, profile.path())?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| CaptureError::BrowserLaunchFailed(e.to_string()))?;

        // The handler stream must be polled for any command to make progress
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    error!("Handler error: {}", e);
                    break;
                }
            }
            debug!("Handler stream ended");
        });

        info!("Browser launched (profile {})", profile.path().display());

        Ok(Self {
            browser,
            handler,
            page: None,
            profile,
            closed: false,
        })
    }

    fn page(&self) -> Result<&Page, CaptureError> {
        self.page
            .as_ref()
            .ok_or_else(|| CaptureError::PageError("No page is open".to_string()))
    }
}

#[async_trait]
impl BrowserEngine for ChromeEngine {
    async fn open_page(&mut self, viewport: &Viewport) -> Result<(), CaptureError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| CaptureError::PageError(e.to_string()))?;

        let emulation_params = SetDeviceMetricsOverrideParams::builder()
            .width(viewport.width)
            .height(viewport.height)
            .device_scale_factor(viewport.device_scale_factor)
            .mobile(viewport.mobile)
            .build()
            .map_err(CaptureError::PageError)?;

        // Keep the page so shutdown closes it even if emulation fails
        self.page = Some(page);

        self.page()?
            .execute(emulation_params)
            .await
            .map_err(|e| CaptureError::PageError(e.to_string()))?;

        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<(), CaptureError> {
        let page = self.page()?;
        let navigation_error = |reason: String| CaptureError::NavigationFailed {
            url: url.to_string(),
            reason,
        };

        let response = page
            .execute(NavigateParams::new(url))
            .await
            .map_err(|e| navigation_error(e.to_string()))?;

        if let Some(error_text) = response.result.error_text.clone() {
            return Err(navigation_error(error_text));
        }

        page.wait_for_navigation()
            .await
            .map_err(|e| navigation_error(e.to_string()))?;

        Ok(())
    }

    async fn page_title(&mut self) -> Option<String> {
        let page = self.page.as_ref()?;
        page.get_title().await.ok().flatten()
    }

    async fn page_url(&mut self) -> Option<String> {
        let page = self.page.as_ref()?;
        page.url().await.ok().flatten()
    }

    async fn capture(&mut self, full_page: bool) -> Result<Vec<u8>, CaptureError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(full_page)
            .build();

        self.page()?
            .screenshot(params)
            .await
            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))
    }

    async fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                debug!("Page close failed: {}", e);
            }
        }

        let release = release_process(&mut self.browser, BROWSER_EXIT_GRACE).await;
        self.handler.abort();

        info!(
            "Browser released ({:?}), profile {}",
            release,
            self.profile.path().display()
        );
    }
}

impl Drop for ChromeEngine {
    fn drop(&mut self) {
        // Reached without shutdown() only when the run was cancelled or
        // panicked. Dropping `browser` kills the child process, then
        // `profile` removes the directory.
        if !self.closed {
            warn!("Browser engine dropped without shutdown");
            self.handler.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chrome_args_generation() {
        let args = chrome_args();

        assert!(args.contains(&"--no-sandbox".to_string()));
        assert!(args.contains(&"--disable-gpu".to_string()));
        assert!(args.contains(&"--hide-scrollbars".to_string()));
    }

    #[test]
    fn test_chrome_args_leave_builder_flags_alone() {
        let args = chrome_args();

        assert!(!args.iter().any(|arg| arg.starts_with("--headless")));
        assert!(!args.iter().any(|arg| arg.starts_with("--window-size")));
        assert!(!args.iter().any(|arg| arg.starts_with("--user-data-dir")));
    }

    #[test]
    fn test_profile_dir_removed_on_drop() {
        let profile = ProfileDir::create().unwrap();
        let path = profile.path().to_path_buf();
        std::fs::write(path.join("Local State"), b"{}").unwrap();
        assert!(path.is_dir());

        drop(profile);
        assert!(!path.exists());
    }

    #[test]
    fn test_profile_dir_already_gone() {
        let profile = ProfileDir::create().unwrap();
        std::fs::remove_dir_all(profile.path()).unwrap();
        drop(profile);
    }

    #[derive(Clone, Copy)]
    enum CloseBehavior {
        Exits,
        Fails,
        Hangs,
        LeavesRunning,
    }

    struct FakeProcess {
        behavior: CloseBehavior,
        running: bool,
        calls: Vec<&'static str>,
    }

    impl FakeProcess {
        fn new(behavior: CloseBehavior) -> Self {
            Self {
                behavior,
                running: true,
                calls: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl BrowserProcess for FakeProcess {
        async fn request_close(&mut self) -> Result<(), String> {
            self.calls.push("close");
            match self.behavior {
                CloseBehavior::Exits => {
                    self.running = false;
                    Ok(())
                }
                CloseBehavior::Fails => Err("Request timed out.".to_string()),
                CloseBehavior::Hangs => {
                    std::future::pending::<()>().await;
                    Ok(())
                }
                CloseBehavior::LeavesRunning => Ok(()),
            }
        }

        async fn wait_exit(&mut self) -> Result<(), String> {
            self.calls.push("wait");
            if self.running {
                std::future::pending::<()>().await;
            }
            Ok(())
        }

        async fn force_kill(&mut self) -> Result<(), String> {
            self.calls.push("kill");
            self.running = false;
            Ok(())
        }
    }

    const GRACE: Duration = Duration::from_millis(50);

    #[tokio::test]
    async fn test_release_after_clean_close() {
        let mut process = FakeProcess::new(CloseBehavior::Exits);
        let release = release_process(&mut process, GRACE).await;

        assert_eq!(release, ProcessRelease::Closed);
        assert_eq!(process.calls, vec!["close", "wait"]);
    }

    #[tokio::test]
    async fn test_release_kills_when_close_fails() {
        let mut process = FakeProcess::new(CloseBehavior::Fails);
        let release = release_process(&mut process, GRACE).await;

        assert_eq!(release, ProcessRelease::Killed);
        assert_eq!(process.calls, vec!["close", "kill", "wait"]);
        assert!(!process.running);
    }

    #[tokio::test]
    async fn test_release_kills_when_close_hangs() {
        let mut process = FakeProcess::new(CloseBehavior::Hangs);
        let release = release_process(&mut process, GRACE).await;

        assert_eq!(release, ProcessRelease::Killed);
        assert_eq!(process.calls, vec!["close", "kill", "wait"]);
    }

    #[tokio::test]
    async fn test_release_kills_when_browser_lingers() {
        let mut process = FakeProcess::new(CloseBehavior::LeavesRunning);
        let release = release_process(&mut process, GRACE).await;

        assert_eq!(release, ProcessRelease::Killed);
        assert_eq!(process.calls, vec!["close", "wait", "kill", "wait"]);
    }

    #[test]
    fn test_user_data_dir_is_unique() {
        let first = user_data_dir();
        let second = user_data_dir();
        assert_ne!(first, second);
        assert!(first.starts_with(std::env::temp_dir()));
    }

    #[test]
    fn test_browser_config_creation() {
        let config = Config {
            chrome_path: Some("/usr/bin/chromium".to_string()),
            ..Default::default()
        };
        let dir = user_data_dir();
        assert!(create_browser_config(&config, &dir).is_ok());
    }
}
