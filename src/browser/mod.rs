//! Browser session abstraction.
//!
//! The pipeline talks to the browser only through `PageDriver`: navigate,
//! evaluate a script, read the rendered HTML, take a screenshot, close.
//! `chrome::BrowserSession` drives a headless Chromium over CDP; tests use
//! scripted drivers.

pub mod chrome;
pub mod scripts;
pub mod stability;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

pub use chrome::BrowserSession;
pub use stability::{lazy_scroll, prepare_snapshot, wait_for_stability, SnapshotPrep};

/// One page (tab) in a browser session.
#[async_trait]
pub trait PageDriver: Send {
    /// Load `url`, waiting at most `timeout`.
    ///
    /// Returns `Error::NavigationTimeout` when the bound elapses; the page
    /// keeps whatever it loaded so far.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()>;

    /// Evaluate a JavaScript expression and return its JSON value.
    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value>;

    /// Serialized HTML of the current document.
    async fn content(&mut self) -> Result<String>;

    /// Full-page PNG screenshot.
    async fn screenshot(&mut self) -> Result<Vec<u8>>;

    /// Release the page and its browser. Safe to call more than once.
    async fn close(&mut self) -> Result<()>;
}
