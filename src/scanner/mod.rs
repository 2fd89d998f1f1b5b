//! axe-core injection and invocation

use std::path::Path;

use reqwest::Client;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::EngineSettings;
use crate::error::WorkflowError;
use crate::models::{EngineOptions, RunOnly, ScanResult};
use crate::traits::PageDriver;

const ENGINE_PRESENT_CHECK: &str =
    "typeof window.axe !== 'undefined' && typeof window.axe.run === 'function'";

const RESULT_BUCKETS: [&str; 4] = ["violations", "passes", "incomplete", "inapplicable"];

/// Marshals scans between the workflow and the in-page axe engine.
///
/// The scanner never interprets results; rule semantics belong to axe.
#[derive(Clone)]
pub struct AccessibilityScanner {
    engine_source: String,
}

impl AccessibilityScanner {
    pub fn new(engine_source: impl Into<String>) -> Self {
        Self {
            engine_source: engine_source.into(),
        }
    }

    /// Read the engine bundle from disk, downloading and caching it when it
    /// is not there yet.
    pub async fn from_settings(settings: &EngineSettings) -> Result<Self, WorkflowError> {
        match tokio::fs::read_to_string(&settings.script_path).await {
            Ok(source) => {
                info!("Loaded axe-core from {}", settings.script_path.display());
                return Ok(Self::new(source));
            }
            Err(e) => warn!(
                "axe-core not readable at {}: {}",
                settings.script_path.display(),
                e
            ),
        }

        let Some(url) = &settings.download_url else {
            return Err(WorkflowError::EngineInjectionFailure(format!(
                "no engine script at {} and no download URL configured",
                settings.script_path.display()
            )));
        };

        let source = download_engine(url).await?;

        cache_engine(&settings.script_path, &source).await;

        Ok(Self::new(source))
    }

    /// Add the engine to the current document. Navigation discards injected
    /// scripts, so this runs again for every scanned page.
    pub async fn inject<P: PageDriver + ?Sized>(&self, page: &P) -> Result<(), WorkflowError> {
        page.add_script(&self.engine_source)
            .await
            .map_err(|e| WorkflowError::EngineInjectionFailure(e.to_string()))?;

        let present = page
            .evaluate(ENGINE_PRESENT_CHECK)
            .await
            .map_err(|e| WorkflowError::EngineInjectionFailure(e.to_string()))?;

        if present.as_bool() == Some(true) {
            Ok(())
        } else {
            Err(WorkflowError::EngineInjectionFailure(
                "axe.run is not defined after injection".to_string(),
            ))
        }
    }

    /// Run axe on the whole document, restricted to `run_only`.
    pub async fn scan<P: PageDriver + ?Sized>(
        &self,
        page: &P,
        run_only: &RunOnly,
    ) -> Result<ScanResult, WorkflowError> {
        let options = serde_json::to_string(&EngineOptions { run_only })?;
        let raw = page
            .evaluate(&format!("window.axe.run(document, {options})"))
            .await?;

        Ok(into_scan_result(raw))
    }
}

/// Copy the four buckets out of a raw axe result, defaulting absent ones.
fn into_scan_result(mut raw: Value) -> ScanResult {
    let mut take = |key: &str| match raw.get_mut(key).map(Value::take) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };

    let [violations, passes, incomplete, inapplicable] = RESULT_BUCKETS.map(&mut take);
    ScanResult {
        violations,
        passes,
        incomplete,
        inapplicable,
    }
}

async fn download_engine(url: &str) -> Result<String, WorkflowError> {
    info!("Downloading axe-core from {}", url);

    fetch_text(url).await.map_err(|e| {
        WorkflowError::EngineInjectionFailure(format!("failed to download axe-core: {e}"))
    })
}

async fn fetch_text(url: &str) -> reqwest::Result<String> {
    let client = Client::builder()
        .user_agent("wcag-workflow-auditor")
        .build()?;

    client.get(url).send().await?.error_for_status()?.text().await
}

/// Keep a downloaded engine for the next run. Failures only cost a download.
async fn cache_engine(path: &Path, source: &str) -> bool {
    if let Some(parent) = path.parent() {
        if let Err(e) = tokio::fs::create_dir_all(parent).await {
            warn!("Could not create {}: {}", parent.display(), e);
            return false;
        }
    }
    match tokio::fs::write(path, source).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Could not cache axe-core at {}: {}", path.display(), e);
            false
        }
    }
}
