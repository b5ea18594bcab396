use std::sync::atomic::{AtomicU64, Ordering};

use chromiumoxide::element::Element as CrElement;
use chromiumoxide::error::CdpError;
use tracing::debug;

use crate::document::NodeInfo;
use crate::error::{Error, Result};

const INSPECT_JS: &str = r#"function() {
    return JSON.stringify({
        attached: this.isConnected,
        visible: this.isConnected && this.getClientRects().length > 0,
        label: (this.textContent || '').trim(),
        classes: Array.from(this.classList || [])
    });
}"#;

const ATTACHED_JS: &str = "function() { return this.isConnected; }";

const CLICK_JS: &str = "function() { this.click(); }";

/// Attribute tagging an element so a document-wide query can be limited to
/// its descendants.
pub(crate) const SCOPE_ATTR: &str = "data-sweep-scope";

static NEXT_SCOPE: AtomicU64 = AtomicU64::new(1);

/// Rewrite `selector` so it only matches descendants of the element tagged
/// with `token`. Each branch of a selector list is prefixed separately.
pub(crate) fn scoped_selector(token: u64, selector: &str) -> String {
    let prefix = format!("[{SCOPE_ATTR}=\"{token}\"]");
    let mut branches = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in selector.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                branches.push(&selector[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    branches.push(&selector[start..]);
    branches
        .into_iter()
        .map(|branch| format!("{prefix} {}", branch.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Wrapper around a chromiumoxide Element. The remote object outlives the DOM
/// node, so a removed element can still be asked whether it is connected.
pub struct Element {
    inner: CrElement,
}

impl Element {
    pub(crate) fn new(inner: CrElement) -> Self {
        Self { inner }
    }

    /// Returns a reference to the underlying chromiumoxide Element.
    pub fn inner(&self) -> &CrElement {
        &self.inner
    }

    async fn call(&self, function: &str) -> Result<Option<serde_json::Value>> {
        let returns = self.inner.call_js_fn(function, false).await?;
        if let Some(details) = returns.exception_details {
            return Err(Error::JsError(details.text));
        }
        Ok(returns.result.value)
    }

    /// Dispatch a synthetic click, as `element.click()` in page script would.
    pub async fn click(&self) -> Result<()> {
        match self.call(CLICK_JS).await {
            Err(Error::CdpError(CdpError::Chrome(e))) => Err(Error::Stale(e.to_string())),
            other => other.map(|_| ()),
        }
    }

    /// Scroll this element into view.
    pub async fn scroll_into_view(&self) -> Result<()> {
        self.inner
            .scroll_into_view()
            .await
            .map_err(|e| Error::Stale(e.to_string()))?;
        Ok(())
    }

    /// Read attachment, visibility, text and classes in one round trip.
    pub async fn inspect(&self) -> Result<NodeInfo> {
        let value = match self.call(INSPECT_JS).await {
            Err(Error::CdpError(CdpError::Chrome(e))) => return Err(Error::Stale(e.to_string())),
            other => other?,
        };
        let json = value
            .as_ref()
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::JsError("element inspection returned no data".into()))?;
        serde_json::from_str(json).map_err(|e| Error::JsError(e.to_string()))
    }

    /// Whether the element is still reachable from the document root. A
    /// remote object the browser no longer knows about counts as detached.
    pub async fn is_connected(&self) -> Result<bool> {
        match self.call(ATTACHED_JS).await {
            Ok(value) => Ok(value.and_then(|v| v.as_bool()).unwrap_or(false)),
            Err(Error::CdpError(CdpError::Chrome(e))) => {
                debug!(error = %e, "remote object gone, treating element as detached");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Tag this element with a fresh scope token and return the token. Goes
    /// through the remote object, which stays valid when the page re-fetches
    /// the document and invalidates DOM node ids.
    pub async fn mark_scope(&self) -> Result<u64> {
        let token = NEXT_SCOPE.fetch_add(1, Ordering::Relaxed);
        let js = format!("function() {{ this.setAttribute('{SCOPE_ATTR}', '{token}'); }}");
        match self.call(&js).await {
            Ok(_) => Ok(token),
            Err(Error::CdpError(CdpError::Chrome(e))) => Err(Error::Stale(e.to_string())),
            Err(e) => Err(e),
        }
    }
}
