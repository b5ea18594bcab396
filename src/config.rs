use std::path::PathBuf;
use std::time::Duration;

use crate::browser::Session;
use crate::document::LoadStep;
use crate::error::Result;

pub struct BrowserConfig {
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub chrome_path: Option<String>,
    /// Chrome profile directory. Pointing this at a profile that is already
    /// signed in lets the sweeper run without handling authentication.
    pub user_data_dir: Option<PathBuf>,
    /// Timeout for opening the activity page (default: 30s).
    pub default_timeout: Duration,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            viewport_width: 1920,
            viewport_height: 1080,
            chrome_path: None,
            user_data_dir: None,
            default_timeout: Duration::from_secs(30),
        }
    }
}

pub struct BrowserBuilder {
    config: BrowserConfig,
}

impl BrowserBuilder {
    pub fn new() -> Self {
        Self {
            config: BrowserConfig::default(),
        }
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.config.viewport_width = width;
        self.config.viewport_height = height;
        self
    }

    pub fn chrome_path(mut self, path: impl Into<String>) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    pub fn user_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.user_data_dir = Some(dir.into());
        self
    }

    /// Set the timeout for opening the activity page.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.default_timeout = timeout;
        self
    }

    pub fn build_config(self) -> BrowserConfig {
        self.config
    }

    pub async fn build(self) -> Result<Session> {
        Session::launch(self.build_config()).await
    }
}

impl Default for BrowserBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Timing tunables for one sweep.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Interval between two polls of the document (default: 100ms).
    pub poll_interval: Duration,
    /// Budget for the delete affordance to show up in the opened menu (default: 5s).
    pub menu_wait: Duration,
    /// Budget for the confirmation dialog (default: 5s).
    pub confirm_wait: Duration,
    /// Budget for the item to leave the document after confirming (default: 60s).
    pub removal_wait: Duration,
    /// Pause after clicking the item's trigger control (default: 300ms).
    pub menu_settle: Duration,
    /// Pause after clicking the delete affordance (default: 200ms).
    pub delete_settle: Duration,
    /// Pause between two items of the same pass (default: 500ms).
    pub item_pause: Duration,
    /// Pause after asking the page for more content (default: 3s).
    pub load_settle: Duration,
    /// Overrides the profile's load step when set.
    pub load_step: Option<LoadStep>,
    /// Stop after this many passes even if the page keeps changing. `None` keeps
    /// going until the page is exhausted.
    pub max_passes: Option<u32>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            menu_wait: Duration::from_secs(5),
            confirm_wait: Duration::from_secs(5),
            removal_wait: Duration::from_secs(60),
            menu_settle: Duration::from_millis(300),
            delete_settle: Duration::from_millis(200),
            item_pause: Duration::from_millis(500),
            load_settle: Duration::from_secs(3),
            load_step: None,
            max_passes: None,
        }
    }
}

impl SweepConfig {
    pub fn builder() -> SweepBuilder {
        SweepBuilder::new()
    }
}

pub struct SweepBuilder {
    config: SweepConfig,
}

impl SweepBuilder {
    pub fn new() -> Self {
        Self {
            config: SweepConfig::default(),
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn menu_wait(mut self, budget: Duration) -> Self {
        self.config.menu_wait = budget;
        self
    }

    pub fn confirm_wait(mut self, budget: Duration) -> Self {
        self.config.confirm_wait = budget;
        self
    }

    pub fn removal_wait(mut self, budget: Duration) -> Self {
        self.config.removal_wait = budget;
        self
    }

    /// Set both settle delays used inside one item's sequence.
    pub fn settle(mut self, menu: Duration, delete: Duration) -> Self {
        self.config.menu_settle = menu;
        self.config.delete_settle = delete;
        self
    }

    pub fn item_pause(mut self, pause: Duration) -> Self {
        self.config.item_pause = pause;
        self
    }

    pub fn load_settle(mut self, settle: Duration) -> Self {
        self.config.load_settle = settle;
        self
    }

    pub fn load_step(mut self, step: LoadStep) -> Self {
        self.config.load_step = Some(step);
        self
    }

    pub fn max_passes(mut self, passes: u32) -> Self {
        self.config.max_passes = Some(passes);
        self
    }

    pub fn build(self) -> SweepConfig {
        self.config
    }
}

impl Default for SweepBuilder {
    fn default() -> Self {
        Self::new()
    }
}
