use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use periscope_core::error::AppError;
use periscope_core::traits::SearchSession;
use tokio::task::JoinHandle;

/// Selector of the AI-mode prompt box.
pub const DEFAULT_INPUT_SELECTOR: &str = "textarea[jsname='qyBLR']";

static PROFILE_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Launch options for [`ChromiumSession`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub input_selector: String,
    pub headless: bool,
    pub navigation_timeout: Duration,
    /// Explicit browser binary; otherwise well-known install paths are probed.
    pub chrome_binary: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            input_selector: DEFAULT_INPUT_SELECTOR.to_string(),
            headless: true,
            navigation_timeout: Duration::from_secs(30),
            chrome_binary: None,
        }
    }
}

impl SessionConfig {
    /// Read configuration from environment variables.
    ///
    /// - `CHROME_BIN` (optional, must exist when set)
    /// - `PERISCOPE_INPUT_SELECTOR` (optional)
    /// - `PERISCOPE_HEADLESS` (optional, `true`/`false`, defaults to true)
    pub fn from_env() -> Result<Self, AppError> {
        let mut config = Self::default();

        if let Ok(bin) = std::env::var("CHROME_BIN") {
            let path = PathBuf::from(&bin);
            if !path.exists() {
                return Err(AppError::ConfigError(format!(
                    "CHROME_BIN points to a missing file: {bin}"
                )));
            }
            config.chrome_binary = Some(path);
        }
        if let Ok(selector) = std::env::var("PERISCOPE_INPUT_SELECTOR") {
            config.input_selector = selector;
        }
        if let Ok(raw) = std::env::var("PERISCOPE_HEADLESS") {
            config.headless = raw.trim().parse().map_err(|_| {
                AppError::ConfigError(format!("PERISCOPE_HEADLESS must be true or false, got {raw:?}"))
            })?;
        }

        Ok(config)
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }
}

/// One Chromium process with one tab, driven over the DevTools protocol.
///
/// Each worker owns its own session, so every session launches its own
/// browser with a private profile directory.
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    config: SessionConfig,
    /// Where `reset_session` returns to; the last URL passed to `navigate`.
    home: Option<String>,
}

impl ChromiumSession {
    /// Launches a browser and opens a blank tab.
    pub async fn launch(config: SessionConfig) -> Result<Self, AppError> {
        let mut builder = BrowserConfig::builder();
        builder = builder.no_sandbox().disable_default_args();

        let binary = config.chrome_binary.clone().or_else(find_chrome_binary);
        if let Some(bin) = binary {
            tracing::info!("Using Chrome binary: {}", bin.display());
            builder = builder.chrome_executable(bin);
        }

        let profile = std::env::temp_dir().join(format!(
            "periscope-profile-{}-{}",
            std::process::id(),
            PROFILE_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        builder = builder.user_data_dir(profile);

        if config.headless {
            builder = builder.arg("--headless=new");
        } else {
            builder = builder.with_head();
        }

        let browser_config = builder
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-popup-blocking")
            .arg("--disable-translate")
            .arg("--no-first-run")
            .arg("--window-size=1920,1080")
            .build()
            .map_err(|e| AppError::SessionError(format!("Browser config error: {e}")))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| AppError::SessionError(format!("Failed to launch browser: {e}")))?;

        // The CDP handler must be polled continuously for the connection to work.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::warn!("Browser CDP handler error: {event:?}");
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| AppError::SessionError(format!("Failed to open tab: {e}")))?;

        Ok(Self {
            browser,
            page,
            handler,
            config,
            home: None,
        })
    }

    /// Launches `count` independent sessions, one per worker.
    pub async fn launch_many(config: &SessionConfig, count: usize) -> Result<Vec<Self>, AppError> {
        let mut sessions = Vec::with_capacity(count);
        for _ in 0..count {
            sessions.push(Self::launch(config.clone()).await?);
        }
        Ok(sessions)
    }

    async fn goto(&self, url: &str) -> Result<(), AppError> {
        let timeout = self.config.navigation_timeout;
        let navigation = async {
            self.page
                .goto(url)
                .await
                .map_err(|e| AppError::SessionError(format!("Failed to navigate to {url}: {e}")))?;
            // Some navigations settle without a load event; the input poll covers them.
            let _ = self.page.wait_for_navigation().await;
            Ok::<(), AppError>(())
        };

        match tokio::time::timeout(timeout, navigation).await {
            Ok(inner) => inner,
            Err(_) => Err(AppError::SessionError(format!(
                "Navigation to {url} timed out after {}s",
                timeout.as_secs()
            ))),
        }
    }
}

impl SearchSession for ChromiumSession {
    type Input = Element;

    async fn navigate(&mut self, url: &str) -> Result<(), AppError> {
        self.goto(url).await?;
        self.home = Some(url.to_string());
        Ok(())
    }

    async fn locate_input(&mut self) -> Result<Option<Element>, AppError> {
        match self.page.find_element(self.config.input_selector.as_str()).await {
            Ok(element) => Ok(Some(element)),
            Err(e) => {
                tracing::trace!(selector = %self.config.input_selector, error = %e, "Input not present");
                Ok(None)
            }
        }
    }

    async fn submit(&mut self, input: &Element, text: &str) -> Result<(), AppError> {
        input
            .click()
            .await
            .map_err(|e| AppError::SessionError(format!("Failed to focus input: {e}")))?;
        input
            .type_str(text)
            .await
            .map_err(|e| AppError::SessionError(format!("Failed to type query: {e}")))?;
        input
            .press_key("Enter")
            .await
            .map_err(|e| AppError::SessionError(format!("Failed to submit query: {e}")))?;
        Ok(())
    }

    async fn read_rendered_markup(&mut self) -> Result<String, AppError> {
        self.page
            .content()
            .await
            .map_err(|e| AppError::SessionError(format!("Failed to read page content: {e}")))
    }

    async fn reset_session(&mut self) -> Result<(), AppError> {
        let home = self
            .home
            .clone()
            .ok_or_else(|| AppError::SessionError("Session has no start page yet".into()))?;

        // Leftover text would be prepended to the next query.
        if let Some(input) = self.locate_input().await? {
            let cleared = input
                .call_js_fn("function() { this.value = ''; }", false)
                .await;
            if let Err(e) = cleared {
                tracing::debug!(error = %e, "Could not clear input before reset");
            }
        }

        self.goto(&home).await
    }

    async fn close_session(&mut self) -> Result<(), AppError> {
        if let Err(e) = self.page.clone().close().await {
            tracing::debug!(error = %e, "Failed to close tab");
        }
        let closed = self
            .browser
            .close()
            .await
            .map_err(|e| AppError::SessionError(format!("Failed to close browser: {e}")));
        if closed.is_ok() {
            let _ = self.browser.wait().await;
        }
        self.handler.abort();
        closed.map(|_| ())
    }
}

/// Tries to locate the real Chrome/Chromium binary.
///
/// On systems where Chromium is installed via **snap**, the wrapper at
/// `/snap/bin/chromium` strips unknown CLI flags, breaking headless mode.
/// We look for the real binary inside the snap first, then fall back to
/// well-known system paths. If nothing is found we return `None` and let
/// `chromiumoxide` do its own lookup.
fn find_chrome_binary() -> Option<PathBuf> {
    let candidates: &[&str] = &[
        // Snap (Ubuntu default)
        "/snap/chromium/current/usr/lib/chromium-browser/chrome",
        // Flatpak
        "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/google-chrome",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
    ];

    candidates.iter().map(PathBuf::from).find(|p| p.exists())
}
