//! Report persistence and operator-facing summaries

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use tracing::info;

use crate::error::WorkflowError;
use crate::models::{Report, ScanResult};
use crate::rules;

const NODES_SHOWN: usize = 3;
const HTML_PREVIEW_CHARS: usize = 100;

/// `wcag_workflow_report_<ISO-8601 with ':' replaced by '-'>.json`
pub fn report_file_name(now: DateTime<Utc>) -> String {
    let stamp = now
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace(':', "-");
    format!("wcag_workflow_report_{stamp}.json")
}

/// `error_workflow_<epoch millis>.png`
pub fn diagnostic_file_name(now: DateTime<Utc>) -> String {
    format!("error_workflow_{}.png", now.timestamp_millis())
}

/// Pretty-print with four-space indentation.
pub fn to_pretty_json<T: Serialize>(value: &T) -> Result<Vec<u8>, WorkflowError> {
    let mut buffer = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer)?;
    Ok(buffer)
}

/// Write the report into `dir` under a timestamped name.
///
/// Returns `None` without touching the filesystem when the report is empty.
pub async fn persist(
    report: &Report,
    dir: &Path,
    now: DateTime<Utc>,
) -> Result<Option<PathBuf>, WorkflowError> {
    if report.is_empty() {
        return Ok(None);
    }

    let bytes = to_pretty_json(report)?;

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| WorkflowError::Persistence {
            path: dir.to_path_buf(),
            source,
        })?;

    let path = dir.join(report_file_name(now));
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|source| WorkflowError::Persistence {
            path: path.clone(),
            source,
        })?;

    Ok(Some(path))
}

pub async fn load(path: &Path) -> Result<Report, WorkflowError> {
    let raw = tokio::fs::read(path)
        .await
        .map_err(|source| WorkflowError::Persistence {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(serde_json::from_slice(&raw)?)
}

fn field<'a>(record: &'a Value, key: &str) -> &'a str {
    record.get(key).and_then(Value::as_str).unwrap_or("n/a")
}

fn preview(html: &str) -> String {
    html.chars().take(HTML_PREVIEW_CHARS).collect()
}

fn nodes(violation: &Value) -> &[Value] {
    violation
        .get("nodes")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Log every violation of a scan with a few of the affected elements.
pub fn log_scan(description: &str, url: &str, scan: &ScanResult) {
    info!(
        "Scan of '{}' ({}): {} violations, {} passes, {} incomplete, {} inapplicable",
        description,
        url,
        scan.violations.len(),
        scan.passes.len(),
        scan.incomplete.len(),
        scan.inapplicable.len()
    );

    for (i, violation) in scan.violations.iter().enumerate() {
        let affected = nodes(violation);
        info!(
            "Violation {}: {} [{}] {} (help: {}, {}) - {} elements",
            i + 1,
            field(violation, "id"),
            field(violation, "impact"),
            field(violation, "description"),
            field(violation, "help"),
            field(violation, "helpUrl"),
            affected.len()
        );
        for node in affected.iter().take(NODES_SHOWN) {
            let target = node.get("target").unwrap_or(&Value::Null);
            info!("    {}... at {}", preview(field(node, "html")), target);
        }
    }
}

/// Totals for a finished run
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub entries: usize,
    pub violations: usize,
    pub affected_nodes: usize,
    /// Violation count per rule id
    pub by_rule: BTreeMap<String, usize>,
}

impl Summary {
    pub fn of(report: &Report) -> Self {
        let mut summary = Self {
            entries: report.len(),
            violations: report.total_violations(),
            ..Self::default()
        };

        for violation in report.entries().iter().flat_map(|e| &e.violations) {
            summary.affected_nodes += nodes(violation).len();
            *summary
                .by_rule
                .entry(field(violation, "id").to_string())
                .or_default() += 1;
        }

        summary
    }

    pub fn log(&self) {
        info!(
            "Workflow report: {} steps audited, {} violations affecting {} elements",
            self.entries, self.violations, self.affected_nodes
        );
        for (rule, count) in &self.by_rule {
            let criteria = rules::wcag_criteria(rule);
            if criteria.is_empty() {
                info!("  {}: {}", rule, count);
            } else {
                info!("  {}: {} (WCAG {})", rule, count, criteria.join("; "));
            }
        }
    }
}
