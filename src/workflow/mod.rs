//! Sequential page-audit workflow runner
//!
//! A run walks an ordered list of [`Step`]s against a single page. Each step
//! performs its interactions, re-injects axe-core into whatever document the
//! page now shows, scans it and appends one [`ReportEntry`]. The first fatal
//! error stops the run; a screenshot is taken and the entries collected so
//! far are returned alongside the error.

mod step;
#[cfg(test)]
pub(crate) mod testing;

pub use step::{Action, Interaction, Step};

use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::error::WorkflowError;
use crate::models::{Report, ReportEntry, RunOnly};
use crate::report;
use crate::scanner::AccessibilityScanner;
use crate::traits::{BrowserLauncher, BrowserSession, PageDriver};

const URL_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Result of an action that is allowed to fail
#[derive(Debug)]
pub enum Attempt<T> {
    Completed(T),
    /// The action failed or ran out of time; carries `OptionalElementMissing`
    Absent(WorkflowError),
}

/// Run `action` within `budget`, turning any failure into [`Attempt::Absent`].
pub async fn best_effort<T, F>(label: &str, budget: Duration, action: F) -> Attempt<T>
where
    F: Future<Output = Result<T, WorkflowError>>,
{
    let reason = match tokio::time::timeout(budget, action).await {
        Ok(Ok(value)) => return Attempt::Completed(value),
        Ok(Err(e)) => e.to_string(),
        Err(_) => format!("not completed within {budget:?}"),
    };

    Attempt::Absent(WorkflowError::OptionalElementMissing {
        element: label.to_string(),
        reason,
    })
}

/// Why a run stopped early
#[derive(Debug)]
pub struct Abort {
    /// Index of the failing step, `None` when the browser never got a page
    pub step_index: Option<usize>,
    pub error: WorkflowError,
    pub screenshot: Option<PathBuf>,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub report: Report,
    pub abort: Option<Abort>,
}

/// Drives steps through one browser page and collects a report.
pub struct WorkflowRunner<L> {
    launcher: L,
    scanner: AccessibilityScanner,
    run_only: RunOnly,
    diagnostics_dir: PathBuf,
    capture_html: bool,
}

impl<L: BrowserLauncher> WorkflowRunner<L> {
    pub fn new(launcher: L, scanner: AccessibilityScanner, run_only: RunOnly) -> Self {
        Self {
            launcher,
            scanner,
            run_only,
            diagnostics_dir: PathBuf::from("."),
            capture_html: false,
        }
    }

    pub fn with_diagnostics_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.diagnostics_dir = dir.into();
        self
    }

    pub fn with_html_capture(mut self, capture_html: bool) -> Self {
        self.capture_html = capture_html;
        self
    }

    /// Execute `steps` in order. Never fails: errors end up in
    /// [`RunOutcome::abort`] next to the partial report.
    pub async fn run(&self, steps: &[Step]) -> RunOutcome {
        let session = match self.launcher.launch().await {
            Ok(session) => session,
            Err(e) => {
                error!("Could not launch browser: {}", e);
                return RunOutcome {
                    report: Report::default(),
                    abort: Some(Abort {
                        step_index: None,
                        error: e,
                        screenshot: None,
                    }),
                };
            }
        };

        let outcome = match session.new_page().await {
            Ok(page) => self.drive(&page, steps).await,
            Err(e) => {
                error!("Could not open a page: {}", e);
                RunOutcome {
                    report: Report::default(),
                    abort: Some(Abort {
                        step_index: None,
                        error: e,
                        screenshot: None,
                    }),
                }
            }
        };

        if let Err(e) = session.close().await {
            warn!("Failed to close browser cleanly: {}", e);
        }

        outcome
    }

    async fn drive<P: PageDriver>(&self, page: &P, steps: &[Step]) -> RunOutcome {
        let mut report = Report::default();

        for (index, step) in steps.iter().enumerate() {
            info!("--- Step {}/{}: {} ---", index + 1, steps.len(), step.description);
            debug!("Selectors for this step: {:?}", step.selectors_used());

            match self.execute(page, index, step).await {
                Ok(entry) => report.push(entry),
                Err(e) => {
                    error!("Fatal error in step '{}': {}", step.description, e);
                    let screenshot = self.capture_diagnostic(page).await;
                    return RunOutcome {
                        report,
                        abort: Some(Abort {
                            step_index: Some(index),
                            error: e,
                            screenshot,
                        }),
                    };
                }
            }
        }

        RunOutcome {
            report,
            abort: None,
        }
    }

    async fn execute<P: PageDriver>(
        &self,
        page: &P,
        index: usize,
        step: &Step,
    ) -> Result<ReportEntry, WorkflowError> {
        for interaction in &step.interactions {
            match interaction {
                Interaction::Required(action) => perform(page, action).await?,
                Interaction::BestEffort {
                    label,
                    actions,
                    budget,
                } => {
                    let attempt = best_effort(label, *budget, async {
                        for action in actions {
                            perform(page, action).await?;
                        }
                        Ok::<(), WorkflowError>(())
                    })
                    .await;
                    match attempt {
                        Attempt::Completed(()) => info!("Handled {}", label),
                        Attempt::Absent(e) => {
                            debug_assert!(!e.is_fatal());
                            info!("{} (continuing)", e);
                        }
                    }
                }
            }
        }

        self.scanner.inject(page).await?;

        let url = page.url().await?;
        let scan = self.scanner.scan(page, &self.run_only).await?;
        report::log_scan(&step.description, &url, &scan);

        let html_snapshot = if self.capture_html {
            Some(page.content().await?)
        } else {
            None
        };

        Ok(ReportEntry {
            step_index: index,
            description: step.description.clone(),
            url,
            violations: scan.violations,
            html_snapshot,
        })
    }

    async fn capture_diagnostic<P: PageDriver>(&self, page: &P) -> Option<PathBuf> {
        if let Err(e) = tokio::fs::create_dir_all(&self.diagnostics_dir).await {
            warn!(
                "Could not create diagnostics directory {}: {}",
                self.diagnostics_dir.display(),
                e
            );
            return None;
        }
        let path = self
            .diagnostics_dir
            .join(report::diagnostic_file_name(Utc::now()));

        match page.screenshot(&path).await {
            Ok(()) => {
                info!("Saved diagnostic screenshot to {}", path.display());
                Some(path)
            }
            Err(e) => {
                warn!("Could not capture diagnostic screenshot: {}", e);
                None
            }
        }
    }
}

async fn perform<P: PageDriver>(page: &P, action: &Action) -> Result<(), WorkflowError> {
    match action {
        Action::Goto { url, timeout } => {
            info!("Navigating to {}", url);
            page.goto(url, *timeout).await
        }
        Action::WaitVisible { selector, timeout } => {
            page.wait_for_visible(selector, *timeout).await
        }
        Action::Click { selector } => {
            info!("Clicking {}", selector);
            page.click(selector).await
        }
        Action::WaitForLoad { timeout } => page.wait_for_load(*timeout).await,
        Action::WaitForUrl { fragment, timeout } => wait_for_url(page, fragment, *timeout).await,
        Action::Pause(duration) => {
            tokio::time::sleep(*duration).await;
            Ok(())
        }
    }
}

async fn wait_for_url<P: PageDriver>(
    page: &P,
    fragment: &str,
    timeout: Duration,
) -> Result<(), WorkflowError> {
    let deadline = Instant::now() + timeout;
    loop {
        if page.url().await?.contains(fragment) {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(WorkflowError::NavigationTimeout {
                target: format!("*{fragment}*"),
                timeout,
            });
        }
        tokio::time::sleep(URL_POLL_INTERVAL).await;
    }
}
