//! Chrome DevTools Protocol implementation of the page traits

use std::io;
use std::path::Path;
use std::process::ExitStatus;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::BrowserSettings;
use crate::error::WorkflowError;
use crate::traits::{BrowserLauncher, BrowserSession, PageDriver};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Quiet period with no new resource requests before a load counts as settled
const NETWORK_IDLE_WINDOW: Duration = Duration::from_millis(500);

const LOAD_STATE_PROBE: &str = "({ ready: document.readyState, \
     resources: performance.getEntriesByType('resource').length })";

impl From<CdpError> for WorkflowError {
    fn from(e: CdpError) -> Self {
        Self::Browser(e.to_string())
    }
}

fn visibility_probe(selector: &str) -> Result<String, WorkflowError> {
    let selector = serde_json::to_string(selector)?;
    Ok(format!(
        "(() => {{
            const el = document.querySelector({selector});
            if (!el) return false;
            const style = window.getComputedStyle(el);
            const rect = el.getBoundingClientRect();
            return style.visibility !== 'hidden' && style.display !== 'none'
                && rect.width > 0 && rect.height > 0;
        }})()"
    ))
}

/// Process control needed to release a browser
#[async_trait]
trait BrowserProcess: Send {
    async fn close(&mut self) -> Result<(), CdpError>;
    async fn kill(&mut self) -> Option<io::Result<()>>;
    async fn wait(&mut self) -> io::Result<Option<ExitStatus>>;
}

#[async_trait]
impl BrowserProcess for Browser {
    async fn close(&mut self) -> Result<(), CdpError> {
        Browser::close(self).await.map(|_| ())
    }

    async fn kill(&mut self) -> Option<io::Result<()>> {
        Browser::kill(self).await
    }

    async fn wait(&mut self) -> io::Result<Option<ExitStatus>> {
        Browser::wait(self).await
    }
}

/// Ask the browser to close, killing the process if it does not answer,
/// then reap it.
async fn shut_down<B: BrowserProcess>(browser: &mut B) -> Result<(), CdpError> {
    let closed = browser.close().await;
    if let Err(e) = &closed {
        warn!("Browser did not close cleanly ({}), killing it", e);
        if let Some(Err(e)) = browser.kill().await {
            warn!("Could not kill browser process: {}", e);
        }
    }

    match browser.wait().await {
        Ok(status) => debug!("Browser process exited: {:?}", status),
        Err(e) => warn!("Could not wait for browser process: {}", e),
    }
    closed
}

/// Launches a local Chrome/Chromium
pub struct ChromeLauncher {
    settings: BrowserSettings,
}

impl ChromeLauncher {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }

    fn browser_config(&self) -> Result<BrowserConfig, WorkflowError> {
        let mut builder = BrowserConfig::builder()
            .window_size(self.settings.window_width, self.settings.window_height);
        if !self.settings.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.settings.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        builder.build().map_err(WorkflowError::Browser)
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    type Session = ChromeSession;

    async fn launch(&self) -> Result<ChromeSession, WorkflowError> {
        info!(
            "Launching Chrome (headless: {}, slow-mo: {}ms)",
            self.settings.headless, self.settings.slow_mo_ms
        );

        let (browser, mut handler) = Browser::launch(self.browser_config()?).await?;
        let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });

        Ok(ChromeSession {
            browser,
            handler,
            slow_mo: Duration::from_millis(self.settings.slow_mo_ms),
        })
    }
}

pub struct ChromeSession {
    browser: Browser,
    handler: JoinHandle<()>,
    slow_mo: Duration,
}

#[async_trait]
impl BrowserSession for ChromeSession {
    type Page = ChromePage;

    async fn new_page(&self) -> Result<ChromePage, WorkflowError> {
        let page = self.browser.new_page("about:blank").await?;
        Ok(ChromePage {
            page,
            slow_mo: self.slow_mo,
        })
    }

    async fn close(self) -> Result<(), WorkflowError> {
        let Self {
            mut browser,
            handler,
            ..
        } = self;

        let result = shut_down(&mut browser).await;
        handler.abort();
        result?;

        info!("Browser closed");
        Ok(())
    }
}

pub struct ChromePage {
    page: Page,
    slow_mo: Duration,
}

impl ChromePage {
    async fn pace(&self) {
        if !self.slow_mo.is_zero() {
            tokio::time::sleep(self.slow_mo).await;
        }
    }

    async fn current_url(&self) -> String {
        self.page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| "about:blank".to_string())
    }
}

#[async_trait]
impl PageDriver for ChromePage {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), WorkflowError> {
        let timed_out = || WorkflowError::NavigationTimeout {
            target: url.to_string(),
            timeout,
        };

        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(CdpError::Timeout)) | Err(_) => return Err(timed_out()),
            Ok(Err(e)) => return Err(e.into()),
        }

        self.pace().await;
        Ok(())
    }

    async fn wait_for_visible(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), WorkflowError> {
        let probe = visibility_probe(selector)?;
        let deadline = Instant::now() + timeout;

        loop {
            match self.evaluate(&probe).await {
                Ok(Value::Bool(true)) => return Ok(()),
                Ok(_) => {}
                Err(e) => debug!("Visibility probe for {} failed: {}", selector, e),
            }
            if Instant::now() >= deadline {
                return Err(WorkflowError::RequiredElementMissing {
                    selector: selector.to_string(),
                    timeout,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn click(&self, selector: &str) -> Result<(), WorkflowError> {
        let element = self.page.find_element(selector).await.map_err(|e| {
            debug!("find_element({}) failed: {}", selector, e);
            WorkflowError::RequiredElementMissing {
                selector: selector.to_string(),
                timeout: Duration::ZERO,
            }
        })?;
        element.click().await?;

        self.pace().await;
        Ok(())
    }

    async fn wait_for_load(&self, timeout: Duration) -> Result<(), WorkflowError> {
        let deadline = Instant::now() + timeout;
        let timed_out = |target: String| WorkflowError::NavigationTimeout { target, timeout };

        match tokio::time::timeout(timeout, self.page.wait_for_navigation()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(timed_out(self.current_url().await)),
        }

        let mut last_resources = None;
        loop {
            let state = self.evaluate(LOAD_STATE_PROBE).await?;
            let complete = state.get("ready").and_then(Value::as_str) == Some("complete");
            let resources = state.get("resources").and_then(Value::as_u64);

            if complete && resources.is_some() && resources == last_resources {
                return Ok(());
            }
            last_resources = if complete { resources } else { None };

            if Instant::now() >= deadline {
                return Err(timed_out(self.current_url().await));
            }
            tokio::time::sleep(NETWORK_IDLE_WINDOW).await;
        }
    }

    async fn add_script(&self, source: &str) -> Result<(), WorkflowError> {
        let params = EvaluateParams::builder()
            .expression(source)
            .await_promise(false)
            .return_by_value(false)
            .build()
            .map_err(WorkflowError::Browser)?;
        self.page.evaluate_expression(params).await?;
        Ok(())
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, WorkflowError> {
        let params = EvaluateParams::builder()
            .expression(expression)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(WorkflowError::Browser)?;
        let result = self.page.evaluate_expression(params).await?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn screenshot(&self, path: &Path) -> Result<(), WorkflowError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();
        self.page.save_screenshot(params, path).await?;
        Ok(())
    }

    async fn url(&self) -> Result<String, WorkflowError> {
        Ok(self
            .page
            .url()
            .await?
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn content(&self) -> Result<String, WorkflowError> {
        Ok(self.page.content().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct StuckProcess {
        answers_close: bool,
        killed: bool,
    }

    #[async_trait]
    impl BrowserProcess for StuckProcess {
        async fn close(&mut self) -> Result<(), CdpError> {
            if self.answers_close {
                Ok(())
            } else {
                Err(CdpError::Timeout)
            }
        }

        async fn kill(&mut self) -> Option<io::Result<()>> {
            self.killed = true;
            Some(Ok(()))
        }

        async fn wait(&mut self) -> io::Result<Option<ExitStatus>> {
            if !self.answers_close && !self.killed {
                std::future::pending::<()>().await;
            }
            Ok(None)
        }
    }

    #[tokio::test]
    async fn unresponsive_browser_is_killed_on_shutdown() {
        let mut process = StuckProcess::default();

        let result = tokio::time::timeout(Duration::from_secs(1), shut_down(&mut process))
            .await
            .expect("shutdown must not hang");

        assert!(matches!(result, Err(CdpError::Timeout)));
        assert!(process.killed);
    }

    #[tokio::test]
    async fn clean_close_does_not_kill() {
        let mut process = StuckProcess {
            answers_close: true,
            ..StuckProcess::default()
        };

        assert!(shut_down(&mut process).await.is_ok());
        assert!(!process.killed);
    }

    #[test]
    fn visibility_probe_escapes_selector() {
        let probe = visibility_probe(r#"button[data-qa="goToBasket"]"#).unwrap();
        assert!(probe.contains(r#"document.querySelector("button[data-qa=\"goToBasket\"]")"#));
    }
}
