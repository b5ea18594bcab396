//! The live document the sweeper observes and clicks on.
//!
//! Everything the waiter, sequencer and driver know about a page goes through
//! [`Document`]. The page mutates on its own between calls; implementations only
//! report what is rendered at the instant they are asked.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A point-in-time reading of one node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct NodeInfo {
    /// Still reachable from the document root.
    pub attached: bool,
    /// Has a non-empty layout box.
    pub visible: bool,
    /// Trimmed text content.
    pub label: String,
    pub classes: Vec<String>,
}

impl NodeInfo {
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// How the page is asked for more content once the visible items are drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStep {
    /// Scroll down by a fixed number of pixels.
    ScrollBy(u32),
    /// Jump to the bottom of the scrollable extent.
    ScrollToBottom,
}

#[async_trait]
pub trait Document: Send + Sync {
    /// Structural handle to a rendered node. Becomes stale once the node is removed.
    type Node: Send + Sync;

    /// All nodes currently matching `selector`, in document order. With a scope,
    /// only descendants of that node are considered.
    async fn query(&self, scope: Option<&Self::Node>, selector: &str) -> Result<Vec<Self::Node>>;

    async fn inspect(&self, node: &Self::Node) -> Result<NodeInfo>;

    /// Whether `node` is still reachable from the document root. A handle whose
    /// backing object is gone reports `false` rather than an error.
    async fn is_attached(&self, node: &Self::Node) -> Result<bool>;

    async fn scroll_into_view(&self, node: &Self::Node) -> Result<()>;

    /// Dispatch a synthetic click on `node`.
    async fn click(&self, node: &Self::Node) -> Result<()>;

    /// Current scrollable height of the page.
    async fn scroll_extent(&self) -> Result<u64>;

    async fn load_more(&self, step: LoadStep) -> Result<()>;
}
