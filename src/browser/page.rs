use async_trait::async_trait;

use crate::{
    agent::error::AgentError,
    screen::screen_model::{DomElement, ElementHandle, SelectOption},
};

/// A live page the agent can observe and act on.
///
/// Implemented by the Node/Playwright-backed `BrowserSession` and by the
/// in-memory `MemoryPage` used for tests and dry runs.
#[async_trait]
pub trait Page: Send + Sync {
    async fn current_url(&self) -> Result<String, AgentError>;

    /// Report every element in document order with its live handle.
    async fn scan(&self) -> Result<Vec<DomElement>, AgentError>;

    /// Handle of the first element matching a CSS selector, if any.
    async fn query_selector(&self, selector: &str) -> Result<Option<ElementHandle>, AgentError>;

    async fn click(&self, handle: &ElementHandle) -> Result<(), AgentError>;

    /// Replace the element's value and fire input/change events.
    async fn set_value(&self, handle: &ElementHandle, text: &str) -> Result<(), AgentError>;

    /// Pick `option` on a select element and fire a change event.
    async fn select_option(
        &self,
        handle: &ElementHandle,
        option: &SelectOption,
    ) -> Result<(), AgentError>;

    /// Scroll the viewport vertically by `delta_y` pixels (negative is up).
    async fn scroll(&self, delta_y: i64) -> Result<(), AgentError>;
}
