use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use tracing::{error, info, warn};

use crate::browser::ChromeLauncher;
use crate::config::AuditConfig;
use crate::journey;
use crate::report::{self, Summary};
use crate::scanner::AccessibilityScanner;
use crate::workflow::WorkflowRunner;

pub struct WorkflowAuditor {
    config: AuditConfig,
    runner: WorkflowRunner<ChromeLauncher>,
}

impl WorkflowAuditor {
    pub async fn new(config: AuditConfig) -> Result<Self> {
        let scanner = AccessibilityScanner::from_settings(&config.engine).await?;
        let run_only = config.run_only()?.clone();

        info!(
            "Audit profile '{}' ({:?}: {})",
            config.active_profile,
            run_only.kind,
            run_only.values.join(", ")
        );

        let runner = WorkflowRunner::new(
            ChromeLauncher::new(config.browser.clone()),
            scanner,
            run_only,
        )
        .with_diagnostics_dir(config.output.diagnostics_dir.clone())
        .with_html_capture(config.output.capture_html);

        Ok(Self { config, runner })
    }

    pub async fn run(&self) -> Result<()> {
        let steps = journey::for_config(&self.config);
        info!(
            "Starting workflow on {} with {} steps",
            self.config.site.name,
            steps.len()
        );

        let outcome = self.runner.run(&steps).await;

        match &outcome.abort {
            None => info!("Workflow completed all {} steps", steps.len()),
            Some(abort) => {
                let failed_at = abort
                    .step_index
                    .map_or_else(|| "browser start".to_string(), |i| format!("step {}", i + 1));
                error!(
                    "Workflow aborted at {} ({} of {} steps audited): {}",
                    failed_at,
                    outcome.report.len(),
                    steps.len(),
                    abort.error
                );
                if let Some(path) = &abort.screenshot {
                    info!("Diagnostic screenshot: {}", path.display());
                }
            }
        }

        match report::persist(&outcome.report, &self.config.output.results_dir, Utc::now()).await? {
            Some(path) => {
                Summary::of(&outcome.report).log();
                info!("Workflow WCAG report saved to {}", path.display());
            }
            None => warn!("Workflow produced no results, no report written"),
        }

        Ok(())
    }
}

/// Log the totals of a previously written report.
pub async fn summarize(path: &Path) -> Result<()> {
    let report = report::load(path).await?;
    info!("Summary of {}", path.display());
    Summary::of(&report).log();
    Ok(())
}
