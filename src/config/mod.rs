//! Audit configuration
//!
//! Built-in defaults reproduce the otto.de shopping journey. A JSON file named
//! by `A11Y_CONFIG` can replace any section, and individual environment
//! variables (usually from `.env`) override single values on top of that.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;
use crate::models::RunOnly;
use crate::rules;

/// Site URLs used to build the shopping journey
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Display name for the website
    pub name: String,
    /// Search URL pattern with {query} placeholder
    pub search_url_pattern: String,
    /// Term searched for on the first page
    pub search_term: String,
    /// Substring the cart page URL is expected to contain
    pub cart_url_fragment: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "OTTO".to_string(),
            search_url_pattern: "https://www.otto.de/suche/{query}".to_string(),
            search_term: "t-shirt".to_string(),
            cart_url_fragment: "/warenkorb".to_string(),
        }
    }
}

impl SiteConfig {
    pub fn search_url(&self) -> String {
        let encoded_term = urlencoding::encode(&self.search_term);
        self.search_url_pattern.replace("{query}", &encoded_term)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    /// Delay inserted after every page interaction
    pub slow_mo_ms: u64,
    pub chrome_executable: Option<PathBuf>,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: false,
            slow_mo_ms: 50,
            chrome_executable: None,
            window_width: 1280,
            window_height: 900,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub navigation_ms: u64,
    pub element_ms: u64,
    pub dialog_ms: u64,
    pub optional_element_ms: u64,
    pub settle_ms: u64,
    pub ui_pause_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation_ms: 30_000,
            element_ms: 10_000,
            dialog_ms: 15_000,
            optional_element_ms: 5_000,
            settle_ms: 10_000,
            ui_pause_ms: 500,
        }
    }
}

impl Timeouts {
    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    pub fn element(&self) -> Duration {
        Duration::from_millis(self.element_ms)
    }

    pub fn dialog(&self) -> Duration {
        Duration::from_millis(self.dialog_ms)
    }

    pub fn optional_element(&self) -> Duration {
        Duration::from_millis(self.optional_element_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn ui_pause(&self) -> Duration {
        Duration::from_millis(self.ui_pause_ms)
    }
}

/// Where the axe-core bundle comes from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub script_path: PathBuf,
    /// Fetched (and cached at `script_path`) when the script is not on disk
    pub download_url: Option<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            script_path: PathBuf::from("node_modules/axe-core/axe.min.js"),
            download_url: Some(
                "https://cdnjs.cloudflare.com/ajax/libs/axe-core/4.10.2/axe.min.js".to_string(),
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub results_dir: PathBuf,
    pub diagnostics_dir: PathBuf,
    /// Store each page's HTML alongside its violations
    pub capture_html: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("results"),
            diagnostics_dir: PathBuf::from("."),
            capture_html: false,
        }
    }
}

/// Complete configuration for one audit run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub site: SiteConfig,
    /// Logical element name to CSS selector
    pub selectors: BTreeMap<String, String>,
    /// Audit profile name to axe `runOnly` option
    pub profiles: BTreeMap<String, RunOnly>,
    pub active_profile: String,
    pub browser: BrowserSettings,
    pub timeouts: Timeouts,
    pub engine: EngineSettings,
    pub output: OutputSettings,
    /// Audit this single page instead of running the shopping journey
    pub audit_url: Option<String>,
    /// Summarize an existing report instead of running a workflow
    pub summarize_report: Option<PathBuf>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            site: SiteConfig::default(),
            selectors: default_selectors(),
            profiles: rules::default_profiles(),
            active_profile: rules::DEFAULT_PROFILE.to_string(),
            browser: BrowserSettings::default(),
            timeouts: Timeouts::default(),
            engine: EngineSettings::default(),
            output: OutputSettings::default(),
            audit_url: None,
            summarize_report: None,
        }
    }
}

fn default_selectors() -> BTreeMap<String, String> {
    [
        ("cookie_accept_button", "#onetrust-accept-btn-handler"),
        ("search_result_item", r#"article[data-id="S0O1G0UW"]"#),
        (
            "size_option",
            r#"div.pl_selectiontile-text100.js_pdp_dimension-selection__scrollable-tile:has(input[value="XXL"])"#,
        ),
        (
            "color_option",
            r#"img.pdp_dimension-selection__color-tile-image[alt="grau"]"#,
        ),
        (
            "add_to_cart_button",
            r#"button.button--variant-primary[type="submit"]"#,
        ),
        ("dialog_to_cart_button", r#"oc-button-v1[data-qa="goToBasket"]"#),
    ]
    .into_iter()
    .map(|(name, selector)| (name.to_string(), selector.to_string()))
    .collect()
}

impl AuditConfig {
    /// Load the configuration from `A11Y_CONFIG` (if set) and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("A11Y_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded audit configuration from {}", path.display());
        Ok(config)
    }

    /// Override single values from a variable lookup (the process environment
    /// in production).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("A11Y_HEADLESS") {
            self.browser.headless = parse_bool("A11Y_HEADLESS", &value)?;
        }
        if let Some(value) = lookup("A11Y_SLOW_MO_MS") {
            self.browser.slow_mo_ms = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                key: "A11Y_SLOW_MO_MS",
                value: value.clone(),
            })?;
        }
        if let Some(value) = lookup("CHROME_PATH") {
            self.browser.chrome_executable = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup("AXE_SCRIPT_PATH") {
            self.engine.script_path = PathBuf::from(value);
        }
        if let Some(value) = lookup("A11Y_RESULTS_DIR") {
            self.output.results_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup("A11Y_DIAGNOSTICS_DIR") {
            self.output.diagnostics_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup("A11Y_CAPTURE_HTML") {
            self.output.capture_html = parse_bool("A11Y_CAPTURE_HTML", &value)?;
        }
        if let Some(value) = lookup("A11Y_PROFILE").filter(|v| !v.trim().is_empty()) {
            self.active_profile = value.trim().to_string();
        }
        if let Some(value) = lookup("A11Y_AUDIT_URL").filter(|v| !v.trim().is_empty()) {
            self.audit_url = Some(value);
        }
        if let Some(value) = lookup("A11Y_SUMMARIZE_REPORT").filter(|v| !v.trim().is_empty()) {
            self.summarize_report = Some(PathBuf::from(value));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.run_only().map(|_| ())
    }

    /// The `runOnly` option of the active audit profile.
    pub fn run_only(&self) -> Result<&RunOnly, ConfigError> {
        let profile = self
            .profiles
            .get(&self.active_profile)
            .ok_or_else(|| ConfigError::UnknownProfile(self.active_profile.clone()))?;
        if profile.values.is_empty() {
            return Err(ConfigError::EmptyProfile(self.active_profile.clone()));
        }
        Ok(profile)
    }

    /// Selector for a logical element name; blank entries count as missing.
    pub fn selector(&self, name: &str) -> Option<&str> {
        self.selectors
            .get(name)
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            key,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RunOnlyType;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = AuditConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.run_only().unwrap().kind, RunOnlyType::Rule);
        assert_eq!(
            config.selector("cookie_accept_button"),
            Some("#onetrust-accept-btn-handler")
        );
        assert!(!config.browser.headless);
    }

    #[test]
    fn search_url_encodes_term() {
        let site = SiteConfig {
            search_term: "t shirt & more".to_string(),
            ..SiteConfig::default()
        };
        assert_eq!(
            site.search_url(),
            "https://www.otto.de/suche/t%20shirt%20%26%20more"
        );
    }

    #[test]
    fn env_overrides_values() {
        let mut config = AuditConfig::default();
        config
            .apply_env(env(&[
                ("A11Y_HEADLESS", "true"),
                ("A11Y_SLOW_MO_MS", "0"),
                ("A11Y_PROFILE", "wcag2aa"),
                ("A11Y_AUDIT_URL", "https://example.com"),
                ("A11Y_RESULTS_DIR", "/tmp/reports"),
                ("A11Y_SUMMARIZE_REPORT", ""),
            ]))
            .unwrap();

        assert!(config.browser.headless);
        assert_eq!(config.browser.slow_mo_ms, 0);
        assert_eq!(config.run_only().unwrap().kind, RunOnlyType::Tag);
        assert_eq!(config.audit_url.as_deref(), Some("https://example.com"));
        assert_eq!(config.output.results_dir, PathBuf::from("/tmp/reports"));
        assert_eq!(config.summarize_report, None);
    }

    #[test]
    fn profile_from_env_is_trimmed() {
        let mut config = AuditConfig::default();
        config
            .apply_env(env(&[("A11Y_PROFILE", "semantics \n")]))
            .unwrap();

        assert_eq!(config.active_profile, "semantics");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_env_value_is_rejected() {
        let mut config = AuditConfig::default();
        let err = config
            .apply_env(env(&[("A11Y_HEADLESS", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { key: "A11Y_HEADLESS", .. }));
    }

    #[test]
    fn unknown_or_empty_profile_fails_validation() {
        let mut config = AuditConfig {
            active_profile: "nope".to_string(),
            ..AuditConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::UnknownProfile(_))));

        config
            .profiles
            .insert("empty".to_string(), RunOnly::rules(Vec::<String>::new()));
        config.active_profile = "empty".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::EmptyProfile(_))));
    }

    #[test]
    fn blank_selector_counts_as_missing() {
        let mut config = AuditConfig::default();
        config
            .selectors
            .insert("dialog_to_cart_button".to_string(), "  ".to_string());
        assert_eq!(config.selector("dialog_to_cart_button"), None);
        assert_eq!(config.selector("not_configured"), None);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "selectors": {{ "search_result_item": "article.product" }},
                "active_profile": "semantics",
                "timeouts": {{ "element_ms": 2500 }}
            }}"#
        )
        .unwrap();

        let config = AuditConfig::from_file(file.path()).unwrap();
        assert_eq!(config.selector("search_result_item"), Some("article.product"));
        assert_eq!(config.selector("add_to_cart_button"), None);
        assert_eq!(config.active_profile, "semantics");
        assert_eq!(config.timeouts.element(), Duration::from_millis(2500));
        assert_eq!(config.timeouts.dialog_ms, 15_000);
        assert_eq!(config.site.search_term, "t-shirt");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn malformed_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = AuditConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }
}
