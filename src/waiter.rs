//! Time-bounded polling over the live document.

use std::borrow::Cow;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::document::{Document, NodeInfo};
use crate::error::{Error, Result};

/// Maximum time a condition may take, plus what to call it when it does not hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitBudget {
    pub duration: Duration,
    pub label: Cow<'static, str>,
}

impl WaitBudget {
    pub fn new(duration: Duration, label: impl Into<Cow<'static, str>>) -> Self {
        Self {
            duration,
            label: label.into(),
        }
    }
}

/// Polls a [`Document`] on a fixed interval until a condition holds or the
/// budget runs out.
pub struct Waiter<'d, D: Document> {
    doc: &'d D,
    poll_interval: Duration,
}

impl<'d, D: Document> Waiter<'d, D> {
    pub fn new(doc: &'d D, poll_interval: Duration) -> Self {
        Self { doc, poll_interval }
    }

    /// Wait until a visible, attached node matching `selector` (inside `scope`
    /// when given) satisfies `predicate`, and return the first such node.
    pub async fn wait_for_appearance<F>(
        &self,
        scope: Option<&D::Node>,
        selector: &str,
        predicate: F,
        budget: &WaitBudget,
    ) -> Result<D::Node>
    where
        F: Fn(&NodeInfo) -> bool + Send + Sync,
    {
        let start = Instant::now();
        loop {
            for candidate in self.doc.query(scope, selector).await? {
                // A candidate removed between query and inspection is just skipped.
                let info = match self.doc.inspect(&candidate).await {
                    Ok(info) => info,
                    Err(e) if e.is_stale() => {
                        debug!(selector, error = %e, "candidate went stale");
                        continue;
                    }
                    Err(e) => return Err(e),
                };
                if info.attached && info.visible && predicate(&info) {
                    debug!(selector, elapsed = ?start.elapsed(), "element appeared");
                    return Ok(candidate);
                }
            }
            self.tick(start, budget).await?;
        }
    }

    /// Wait until `node` is no longer reachable from the document root. A node
    /// that never existed counts as already gone.
    pub async fn wait_for_disappearance(
        &self,
        node: Option<&D::Node>,
        budget: &WaitBudget,
    ) -> Result<()> {
        let Some(node) = node else {
            return Ok(());
        };
        let start = Instant::now();
        loop {
            if !self.doc.is_attached(node).await? {
                debug!(label = %budget.label, elapsed = ?start.elapsed(), "element gone");
                return Ok(());
            }
            self.tick(start, budget).await?;
        }
    }

    /// Sleep until the next poll, clipped to what is left of the budget.
    async fn tick(&self, start: Instant, budget: &WaitBudget) -> Result<()> {
        let elapsed = start.elapsed();
        if elapsed >= budget.duration {
            return Err(Error::Timeout(budget.label.to_string()));
        }
        let remaining = budget.duration - elapsed;
        tokio::time::sleep(self.poll_interval.min(remaining)).await;
        Ok(())
    }
}
