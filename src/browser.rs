use chromiumoxide::browser::{Browser as CrBrowser, BrowserConfig as CrBrowserConfig};
use chromiumoxide::handler::viewport::Viewport;
use futures::StreamExt;
use tracing::{debug, info};

use crate::config::{BrowserBuilder, BrowserConfig};
use crate::error::{Error, Result};
use crate::page::Page;

/// Chrome flags that improve performance without affecting functionality.
const PERF_ARGS: &[&str] = &[
    "disable-gpu",
    "disable-extensions",
    "metrics-recording-only",
    "mute-audio",
    "no-default-browser-check",
    "no-first-run",
    "disable-client-side-phishing-detection",
    "disable-prompt-on-repost",
];

/// A Chrome instance the sweeper drives, launched by us or attached to.
pub struct Session {
    browser: CrBrowser,
    default_timeout: std::time::Duration,
    _handler_task: tokio::task::JoinHandle<()>,
}

impl Session {
    /// Create a new BrowserBuilder for configuring and launching a browser.
    pub fn builder() -> BrowserBuilder {
        BrowserBuilder::new()
    }

    /// Launch a browser instance with the given configuration.
    pub async fn launch(config: BrowserConfig) -> Result<Self> {
        let mut builder = CrBrowserConfig::builder();

        if config.headless {
            builder = builder.new_headless_mode().no_sandbox();
        } else {
            builder = builder.with_head().no_sandbox();
        }

        for arg in PERF_ARGS {
            builder = builder.arg(*arg);
        }

        if let Some(ref path) = config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        // Reusing a signed-in profile is how the sweeper gets past login.
        if let Some(ref dir) = config.user_data_dir {
            builder = builder.user_data_dir(dir);
        }

        builder = builder.viewport(Viewport {
            width: config.viewport_width,
            height: config.viewport_height,
            device_scale_factor: None,
            emulating_mobile: false,
            is_landscape: false,
            has_touch: false,
        });

        let cr_config = builder
            .build()
            .map_err(|e| Error::LaunchError(e.to_string()))?;

        let (browser, mut handler) = CrBrowser::launch(cr_config)
            .await
            .map_err(|e| Error::LaunchError(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(_event) = handler.next().await {}
        });

        info!(headless = config.headless, "browser launched");
        Ok(Self {
            browser,
            default_timeout: config.default_timeout,
            _handler_task: handler_task,
        })
    }

    /// Attach to an already running Chrome through its DevTools websocket URL.
    pub async fn connect(ws_url: &str, config: BrowserConfig) -> Result<Self> {
        let (browser, mut handler) = CrBrowser::connect(ws_url)
            .await
            .map_err(|e| Error::LaunchError(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(_event) = handler.next().await {}
        });

        info!(ws_url, "attached to running browser");
        Ok(Self {
            browser,
            default_timeout: config.default_timeout,
            _handler_task: handler_task,
        })
    }

    /// Open the activity page in a new tab.
    pub async fn open(&self, url: &str) -> Result<Page> {
        let cr_page = tokio::time::timeout(self.default_timeout, self.browser.new_page(url))
            .await
            .map_err(|_| Error::Timeout(format!("opening {url}")))?
            .map_err(|e| Error::NavigationError(e.to_string()))?;
        debug!(url, "page opened");
        Ok(Page::new(cr_page))
    }

    /// Adopt an already open tab whose URL contains `pattern`.
    pub async fn adopt(&self, pattern: &str) -> Result<Page> {
        let cr_pages = self.browser.pages().await?;
        for cr_page in cr_pages {
            let page = Page::new(cr_page);
            if page.url().await.is_ok_and(|url| url.contains(pattern)) {
                return Ok(page);
            }
        }
        Err(Error::NavigationError(format!(
            "no open tab with a URL containing {pattern}"
        )))
    }
}
