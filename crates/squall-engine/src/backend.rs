use async_trait::async_trait;
pub use squall_common::error::BackendError;
use squall_common::protocol::{ProbeAction, ProbeResponse};

#[derive(Debug, Clone)]
pub struct NavigationResult {
    pub url: String,
    pub title: String,
}

/// The driver seam. The production implementation owns one browser process
/// and one page; tests script one.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Launch the browser process and open the page context.
    async fn launch(&mut self) -> Result<(), BackendError>;

    /// Tear down the browser process. Must release it even after failures.
    async fn close(&mut self) -> Result<(), BackendError>;

    async fn is_ready(&self) -> bool;

    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, BackendError>;

    /// Execute one probe request in the page context.
    async fn execute_probe(&mut self, action: ProbeAction)
    -> Result<ProbeResponse, BackendError>;

    /// Full-page screenshot.
    async fn screenshot(&mut self) -> Result<Vec<u8>, BackendError>;

    /// Serialized markup of the current document.
    async fn content(&mut self) -> Result<String, BackendError>;

    /// Dispatch a single key press (e.g. "Tab", "Enter") at the page.
    async fn press_key(&mut self, key: &str) -> Result<(), BackendError>;

    /// Keyboard-level text insertion at the current focus.
    async fn insert_text(&mut self, text: &str) -> Result<(), BackendError>;
}
