use async_trait::async_trait;
use chromiumoxide::page::Page as CrPage;

use crate::document::{Document, LoadStep, NodeInfo};
use crate::element::{scoped_selector, Element};
use crate::error::{Error, Result};

const EXTENT_JS: &str = "Math.max(document.body ? document.body.scrollHeight : 0, \
    document.documentElement.scrollHeight)";

/// A live Chrome tab seen through the [`Document`] interface.
pub struct Page {
    inner: CrPage,
}

impl Page {
    pub(crate) fn new(inner: CrPage) -> Self {
        Self { inner }
    }

    /// Returns a reference to the underlying chromiumoxide Page.
    pub fn inner(&self) -> &CrPage {
        &self.inner
    }

    /// Get the current page URL.
    pub async fn url(&self) -> Result<String> {
        self.inner
            .url()
            .await
            .map_err(|e| Error::NavigationError(e.to_string()))?
            .ok_or_else(|| Error::NavigationError("No URL found".into()))
    }

    /// Get the current page title.
    pub async fn title(&self) -> Result<String> {
        let result = self
            .inner
            .evaluate("document.title")
            .await
            .map_err(|e| Error::JsError(e.to_string()))?;
        match result.into_value::<String>() {
            Ok(title) => Ok(title),
            Err(_) => Ok(String::new()),
        }
    }

    /// Evaluate a JavaScript expression without caring about the return value.
    pub async fn evaluate_void(&self, expression: &str) -> Result<()> {
        self.inner
            .evaluate(expression)
            .await
            .map_err(|e| Error::JsError(e.to_string()))?;
        Ok(())
    }

    /// Find all elements matching the given CSS selector.
    pub async fn find_elements(&self, selector: &str) -> Result<Vec<Element>> {
        let els = self.inner.find_elements(selector).await?;
        Ok(els.into_iter().map(Element::new).collect())
    }

    /// Find descendants of `scope` matching `selector`. Every document-wide
    /// query re-fetches the document, which invalidates the DOM node ids held
    /// by earlier results, so the scope is tagged through its remote object and
    /// the query runs from the document root.
    pub async fn find_within(&self, scope: &Element, selector: &str) -> Result<Vec<Element>> {
        let token = scope.mark_scope().await?;
        self.find_elements(&scoped_selector(token, selector)).await
    }
}

#[async_trait]
impl Document for Page {
    type Node = Element;

    async fn query(&self, scope: Option<&Element>, selector: &str) -> Result<Vec<Element>> {
        match scope {
            Some(scope) => self.find_within(scope, selector).await,
            None => self.find_elements(selector).await,
        }
    }

    async fn inspect(&self, node: &Element) -> Result<NodeInfo> {
        node.inspect().await
    }

    async fn is_attached(&self, node: &Element) -> Result<bool> {
        node.is_connected().await
    }

    async fn scroll_into_view(&self, node: &Element) -> Result<()> {
        node.scroll_into_view().await
    }

    async fn click(&self, node: &Element) -> Result<()> {
        node.click().await
    }

    async fn scroll_extent(&self) -> Result<u64> {
        let result = self
            .inner
            .evaluate(EXTENT_JS)
            .await
            .map_err(|e| Error::JsError(e.to_string()))?;
        result
            .into_value::<u64>()
            .map_err(|e| Error::JsError(e.to_string()))
    }

    async fn load_more(&self, step: LoadStep) -> Result<()> {
        let js = match step {
            LoadStep::ScrollBy(pixels) => format!("window.scrollBy(0, {pixels})"),
            LoadStep::ScrollToBottom => {
                "window.scrollTo(0, document.body.scrollHeight)".to_string()
            }
        };
        self.evaluate_void(&js).await
    }
}
