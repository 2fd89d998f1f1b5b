//! Traits and interfaces for browser-agnostic page automation

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::WorkflowError;

/// Starts a browser session
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    type Session: BrowserSession;

    async fn launch(&self) -> Result<Self::Session, WorkflowError>;
}

/// A running browser that owns its pages
#[async_trait]
pub trait BrowserSession: Send + Sync {
    type Page: PageDriver;

    /// Open a new blank page
    async fn new_page(&self) -> Result<Self::Page, WorkflowError>;

    /// Shut the browser down and release its process
    async fn close(self) -> Result<(), WorkflowError>
    where
        Self: Sized;
}

/// Operations the workflow needs from a live page
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to `url` and wait for the load event
    ///
    /// # Errors
    /// * `NavigationTimeout` - the page did not load within `timeout`
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), WorkflowError>;

    /// Wait until an element matching `selector` is attached and visible
    ///
    /// # Errors
    /// * `RequiredElementMissing` - nothing visible matched within `timeout`
    async fn wait_for_visible(&self, selector: &str, timeout: Duration)
    -> Result<(), WorkflowError>;

    /// Click the first element matching `selector`
    async fn click(&self, selector: &str) -> Result<(), WorkflowError>;

    /// Wait for pending navigation to finish and network activity to settle
    async fn wait_for_load(&self, timeout: Duration) -> Result<(), WorkflowError>;

    /// Run a script in the current document, discarding its result
    async fn add_script(&self, source: &str) -> Result<(), WorkflowError>;

    /// Evaluate an expression (awaiting promises) and return its JSON value
    async fn evaluate(&self, expression: &str) -> Result<Value, WorkflowError>;

    /// Save a PNG screenshot of the page to `path`
    async fn screenshot(&self, path: &Path) -> Result<(), WorkflowError>;

    /// The URL of the current document
    async fn url(&self) -> Result<String, WorkflowError>;

    /// Serialized HTML of the current document
    async fn content(&self) -> Result<String, WorkflowError>;
}
