use std::path::PathBuf;
use std::time::Duration;

use activity_sweeper::{
    BrowserConfig, ListDriver, LoadStep, Page, Session, SweepConfig, SweepProfile,
};
use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;

#[derive(Clone, Copy, ValueEnum)]
enum Target {
    Comments,
    Posts,
}

#[derive(Parser)]
#[command(
    name = "activity-sweeper",
    about = "Delete every comment or post from a recent activity page",
    version
)]
struct Cli {
    /// What to delete
    #[arg(value_enum)]
    target: Target,

    /// Activity page to open in a new tab
    #[arg(long, env = "SWEEPER_URL")]
    url: Option<String>,

    /// Attach to a running Chrome through its DevTools websocket URL instead of launching one
    #[arg(long, env = "SWEEPER_CONNECT")]
    connect: Option<String>,

    /// With --connect and no --url, use the open tab whose URL contains this
    #[arg(long, default_value = "recent-activity")]
    tab: String,

    /// Chrome profile directory to reuse (keeps an existing login)
    #[arg(long, env = "SWEEPER_USER_DATA_DIR")]
    user_data_dir: Option<PathBuf>,

    #[arg(long)]
    chrome_path: Option<String>,

    #[arg(long)]
    headless: bool,

    /// JSON file replacing the built-in selectors for the target
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Polling interval in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,

    /// Budget for the delete entry of the item menu, in milliseconds
    #[arg(long, default_value_t = 5000)]
    menu_wait_ms: u64,

    /// Budget for the confirmation dialog, in milliseconds
    #[arg(long, default_value_t = 5000)]
    confirm_wait_ms: u64,

    /// Budget for a confirmed item to disappear, in milliseconds
    #[arg(long, default_value_t = 60_000)]
    removal_wait_ms: u64,

    /// Pause after opening an item menu, in milliseconds
    #[arg(long, default_value_t = 300)]
    menu_settle_ms: u64,

    /// Pause after clicking the delete entry, in milliseconds
    #[arg(long, default_value_t = 200)]
    delete_settle_ms: u64,

    /// Pause between items, in milliseconds
    #[arg(long, default_value_t = 500)]
    item_pause_ms: u64,

    /// Pause after asking the page for more content, in milliseconds
    #[arg(long, default_value_t = 3000)]
    load_settle_ms: u64,

    /// Load more content by scrolling this many pixels instead of the profile's own step
    #[arg(long)]
    scroll_step: Option<u32>,

    /// Stop after this many passes
    #[arg(long)]
    max_passes: Option<u32>,

    /// Count deletable items on the current page and exit without clicking
    #[arg(long)]
    dry_run: bool,

    /// Default log level (RUST_LOG takes precedence)
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,
}

impl Cli {
    fn sweep_config(&self) -> SweepConfig {
        let mut builder = SweepConfig::builder()
            .poll_interval(Duration::from_millis(self.poll_ms))
            .menu_wait(Duration::from_millis(self.menu_wait_ms))
            .confirm_wait(Duration::from_millis(self.confirm_wait_ms))
            .removal_wait(Duration::from_millis(self.removal_wait_ms))
            .settle(
                Duration::from_millis(self.menu_settle_ms),
                Duration::from_millis(self.delete_settle_ms),
            )
            .item_pause(Duration::from_millis(self.item_pause_ms))
            .load_settle(Duration::from_millis(self.load_settle_ms));
        if let Some(pixels) = self.scroll_step {
            builder = builder.load_step(LoadStep::ScrollBy(pixels));
        }
        if let Some(max) = self.max_passes {
            builder = builder.max_passes(max);
        }
        builder.build()
    }

    fn sweep_profile(&self) -> Result<SweepProfile> {
        match &self.profile {
            Some(path) => SweepProfile::from_json_file(path)
                .with_context(|| format!("loading profile {}", path.display())),
            None => Ok(match self.target {
                Target::Comments => SweepProfile::comments(),
                Target::Posts => SweepProfile::posts(),
            }),
        }
    }

    fn browser_config(&self) -> BrowserConfig {
        let mut builder = Session::builder().headless(self.headless);
        if let Some(path) = &self.chrome_path {
            builder = builder.chrome_path(path.clone());
        }
        if let Some(dir) = &self.user_data_dir {
            builder = builder.user_data_dir(dir.clone());
        }
        builder.build_config()
    }
}

async fn open_page(cli: &Cli, session: &Session) -> Result<Page> {
    match (&cli.url, &cli.connect) {
        (Some(url), _) => Ok(session.open(url).await?),
        (None, Some(_)) => Ok(session.adopt(&cli.tab).await?),
        (None, None) => bail!("--url is required unless attaching with --connect"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(cli.log_level.into()),
        )
        .with_target(false)
        .init();

    let profile = cli.sweep_profile()?;
    let config = cli.sweep_config();

    let session = match &cli.connect {
        Some(ws_url) => Session::connect(ws_url, cli.browser_config()).await?,
        None => Session::launch(cli.browser_config()).await?,
    };
    let page = open_page(&cli, &session).await?;
    info!(title = %page.title().await?, profile = %profile.name, "starting activity deletion");

    let driver = ListDriver::new(&page, &profile, &config);
    if cli.dry_run {
        let snapshot = driver.scan().await?;
        info!(
            items = snapshot.items.len(),
            extent = snapshot.extent,
            "dry run, nothing deleted"
        );
        return Ok(());
    }

    let report = driver.run().await.context("sweep aborted")?;
    info!(
        passes = report.passes,
        deleted = report.tally.completed,
        skipped = report.tally.skipped_not_found + report.tally.skipped_confirm_missing,
        timed_out = report.tally.timed_out,
        failed = report.tally.failed,
        termination = ?report.termination,
        "done"
    );
    Ok(())
}
