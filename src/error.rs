//! Error taxonomy for audit runs

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkflowError {
    /// An element that may legitimately be absent (cookie banner, ...).
    #[error("Optional element '{element}' not handled: {reason}")]
    OptionalElementMissing { element: String, reason: String },

    #[error("Required element '{selector}' not visible within {timeout:?}")]
    RequiredElementMissing { selector: String, timeout: Duration },

    #[error("Navigation to '{target}' did not settle within {timeout:?}")]
    NavigationTimeout { target: String, timeout: Duration },

    #[error("Accessibility engine injection failed: {0}")]
    EngineInjectionFailure(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Failed to write '{path}': {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WorkflowError {
    /// Whether this error aborts the remaining steps of a run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::OptionalElementMissing { .. })
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("Unknown audit profile '{0}'")]
    UnknownProfile(String),

    #[error("Audit profile '{0}' has no rule or tag values")]
    EmptyProfile(String),
}
