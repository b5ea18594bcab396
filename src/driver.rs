//! Outer loop: scan, drain, load more, until the page runs dry.

use tracing::{debug, info, warn};

use crate::config::SweepConfig;
use crate::document::{Document, LoadStep};
use crate::error::Result;
use crate::profile::SweepProfile;
use crate::sequencer::{ActionOutcome, ActionSequencer};

/// Items visible at the start of one pass, with the page extent at that moment.
pub struct ScanSnapshot<N> {
    pub items: Vec<N>,
    pub extent: u64,
}

/// Per-outcome counters across a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutcomeTally {
    pub completed: u32,
    pub skipped_not_found: u32,
    pub skipped_confirm_missing: u32,
    pub timed_out: u32,
    pub failed: u32,
}

impl OutcomeTally {
    pub fn record(&mut self, outcome: &ActionOutcome) {
        match outcome {
            ActionOutcome::Completed => self.completed += 1,
            ActionOutcome::SkippedNotFound => self.skipped_not_found += 1,
            ActionOutcome::SkippedConfirmMissing => self.skipped_confirm_missing += 1,
            ActionOutcome::TimedOut => self.timed_out += 1,
            ActionOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.completed
            + self.skipped_not_found
            + self.skipped_confirm_missing
            + self.timed_out
            + self.failed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// No items left and loading more changed nothing.
    Exhausted,
    /// `max_passes` was reached first.
    PassLimit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Outer iterations run, including the final empty one.
    pub passes: u32,
    /// Iterations that found items and drained them.
    pub drains: u32,
    pub tally: OutcomeTally,
    pub termination: Termination,
}

pub struct ListDriver<'a, D: Document> {
    doc: &'a D,
    profile: &'a SweepProfile,
    config: &'a SweepConfig,
}

impl<'a, D: Document> ListDriver<'a, D> {
    pub fn new(doc: &'a D, profile: &'a SweepProfile, config: &'a SweepConfig) -> Self {
        Self {
            doc,
            profile,
            config,
        }
    }

    fn load_step(&self) -> LoadStep {
        self.config.load_step.unwrap_or(self.profile.load_step)
    }

    /// Every deletable item currently rendered, plus the current extent.
    pub async fn scan(&self) -> Result<ScanSnapshot<D::Node>> {
        let items = self.doc.query(None, &self.profile.item).await?;
        let extent = self.doc.scroll_extent().await?;
        Ok(ScanSnapshot { items, extent })
    }

    async fn load_more(&self) -> Result<()> {
        self.doc.load_more(self.load_step()).await?;
        tokio::time::sleep(self.config.load_settle).await;
        Ok(())
    }

    /// Delete items until a scan comes back empty and loading more changes
    /// neither the item count nor the extent. Scan and load failures abort the
    /// run; per-item failures never do.
    pub async fn run(&self) -> Result<SweepReport> {
        let mut tally = OutcomeTally::default();
        let mut passes = 0;
        let mut drains = 0;

        loop {
            if self.config.max_passes.is_some_and(|max| passes >= max) {
                warn!(passes, "pass limit reached, stopping");
                return Ok(SweepReport {
                    passes,
                    drains,
                    tally,
                    termination: Termination::PassLimit,
                });
            }
            passes += 1;

            let snapshot = self.scan().await?;
            if snapshot.items.is_empty() {
                info!(pass = passes, "no {} found, loading more", self.profile.name);
                self.load_more().await?;
                let after = self.scan().await?;
                if after.items.is_empty() && after.extent == snapshot.extent {
                    info!(
                        passes,
                        deleted = tally.completed,
                        "no more {} left to delete",
                        self.profile.name
                    );
                    return Ok(SweepReport {
                        passes,
                        drains,
                        tally,
                        termination: Termination::Exhausted,
                    });
                }
                debug!(
                    items = after.items.len(),
                    extent = after.extent,
                    "page loaded more content"
                );
                continue;
            }

            drains += 1;
            let total = snapshot.items.len();
            info!(pass = passes, items = total, "deleting loaded {}", self.profile.name);
            for (index, item) in snapshot.items.iter().enumerate() {
                let outcome = ActionSequencer::new(self.doc, self.profile, self.config)
                    .run(item)
                    .await;
                match &outcome {
                    ActionOutcome::Completed => {
                        info!(item = index + 1, of = total, "{outcome}")
                    }
                    _ => warn!(item = index + 1, of = total, "{outcome}"),
                }
                tally.record(&outcome);
                tokio::time::sleep(self.config.item_pause).await;
            }

            info!(pass = passes, ?tally, "pass finished, loading more");
            self.load_more().await?;
        }
    }
}
