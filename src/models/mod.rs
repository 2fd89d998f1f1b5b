//! Data models for scan results and the persisted workflow report

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Whether an axe `runOnly` list names individual rules or rule tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOnlyType {
    Rule,
    Tag,
}

/// The `runOnly` option passed to `axe.run`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOnly {
    #[serde(rename = "type")]
    pub kind: RunOnlyType,
    pub values: Vec<String>,
}

impl RunOnly {
    pub fn rules<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: RunOnlyType::Rule,
            values: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: RunOnlyType::Tag,
            values: tags.into_iter().map(Into::into).collect(),
        }
    }
}

/// Options object handed to the engine's evaluation entry point
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineOptions<'a> {
    pub run_only: &'a RunOnly,
}

/// The four result buckets returned by axe, kept as opaque JSON records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    #[serde(default)]
    pub violations: Vec<Value>,
    #[serde(default)]
    pub passes: Vec<Value>,
    #[serde(default)]
    pub incomplete: Vec<Value>,
    #[serde(default)]
    pub inapplicable: Vec<Value>,
}

/// One audited step of a workflow run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    pub step_index: usize,
    pub description: String,
    pub url: String,
    pub violations: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_snapshot: Option<String>,
}

/// Ordered entries of one run, serialized as a bare JSON array
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Report {
    entries: Vec<ReportEntry>,
}

impl Report {
    pub fn push(&mut self, entry: ReportEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of violated rules summed over all entries.
    pub fn total_violations(&self) -> usize {
        self.entries.iter().map(|e| e.violations.len()).sum()
    }
}
