//! In-memory browser used by the workflow tests

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::WorkflowError;
use crate::traits::{BrowserLauncher, BrowserSession, PageDriver};

#[derive(Default)]
struct State {
    url: String,
    /// Visible selectors, with the URL a click on them navigates to
    elements: HashMap<String, Option<String>>,
    unreachable: HashSet<String>,
    broken_engine: bool,
    engine_loaded: bool,
    injections: usize,
    scans_without_engine: usize,
    evaluated: Vec<String>,
    clicked: Vec<String>,
    screenshots: Vec<PathBuf>,
}

/// A page whose DOM is a fixed set of selectors
#[derive(Clone, Default)]
pub struct ScriptedPage {
    state: Arc<Mutex<State>>,
}

impl ScriptedPage {
    pub fn new() -> Self {
        let page = Self::default();
        page.state().url = "about:blank".to_string();
        page
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Make `selector` visible; clicking it navigates to `target` if given.
    pub fn with_element(self, selector: &str, target: Option<&str>) -> Self {
        self.state()
            .elements
            .insert(selector.to_string(), target.map(str::to_string));
        self
    }

    pub fn with_unreachable(self, url: &str) -> Self {
        self.state().unreachable.insert(url.to_string());
        self
    }

    /// Injected scripts never define `axe`.
    pub fn with_broken_engine(self) -> Self {
        self.state().broken_engine = true;
        self
    }

    pub fn injections(&self) -> usize {
        self.state().injections
    }

    pub fn scans_without_engine(&self) -> usize {
        self.state().scans_without_engine
    }

    pub fn evaluated(&self) -> Vec<String> {
        self.state().evaluated.clone()
    }

    pub fn clicked(&self) -> Vec<String> {
        self.state().clicked.clone()
    }

    pub fn screenshots(&self) -> Vec<PathBuf> {
        self.state().screenshots.clone()
    }

    fn navigate(state: &mut State, url: &str) {
        state.url = url.to_string();
        state.engine_loaded = false;
    }
}

#[async_trait]
impl PageDriver for ScriptedPage {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), WorkflowError> {
        let mut state = self.state();
        if state.unreachable.contains(url) {
            return Err(WorkflowError::NavigationTimeout {
                target: url.to_string(),
                timeout,
            });
        }
        Self::navigate(&mut state, url);
        Ok(())
    }

    async fn wait_for_visible(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), WorkflowError> {
        if self.state().elements.contains_key(selector) {
            Ok(())
        } else {
            Err(WorkflowError::RequiredElementMissing {
                selector: selector.to_string(),
                timeout,
            })
        }
    }

    async fn click(&self, selector: &str) -> Result<(), WorkflowError> {
        let mut state = self.state();
        let Some(target) = state.elements.get(selector).cloned() else {
            return Err(WorkflowError::RequiredElementMissing {
                selector: selector.to_string(),
                timeout: Duration::ZERO,
            });
        };
        state.clicked.push(selector.to_string());
        if let Some(url) = target {
            Self::navigate(&mut state, &url);
        }
        Ok(())
    }

    async fn wait_for_load(&self, _timeout: Duration) -> Result<(), WorkflowError> {
        Ok(())
    }

    async fn add_script(&self, _source: &str) -> Result<(), WorkflowError> {
        let mut state = self.state();
        state.injections += 1;
        state.engine_loaded = !state.broken_engine;
        Ok(())
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, WorkflowError> {
        let mut state = self.state();
        state.evaluated.push(expression.to_string());

        if expression.starts_with("typeof window.axe") {
            return Ok(Value::Bool(state.engine_loaded));
        }
        if expression.starts_with("window.axe.run(") {
            if !state.engine_loaded {
                state.scans_without_engine += 1;
                return Err(WorkflowError::Browser("ReferenceError: axe is not defined".into()));
            }
            return Ok(json!({
                "violations": [{
                    "id": "link-name",
                    "impact": "serious",
                    "description": "Ensure links have discernible text",
                    "help": "Links must have discernible text",
                    "helpUrl": "https://dequeuniversity.com/rules/axe/4.10/link-name",
                    "nodes": [{ "html": "<a href=\"/\"></a>", "target": ["a"] }]
                }],
                "passes": [{ "id": "document-title" }],
                "incomplete": []
            }));
        }
        Ok(Value::Null)
    }

    async fn screenshot(&self, path: &Path) -> Result<(), WorkflowError> {
        std::fs::write(path, b"\x89PNG").map_err(|source| WorkflowError::Persistence {
            path: path.to_path_buf(),
            source,
        })?;
        self.state().screenshots.push(path.to_path_buf());
        Ok(())
    }

    async fn url(&self) -> Result<String, WorkflowError> {
        Ok(self.state().url.clone())
    }

    async fn content(&self) -> Result<String, WorkflowError> {
        Ok(format!("<html><body data-url=\"{}\"></body></html>", self.state().url))
    }
}

/// Hands out one shared [`ScriptedPage`] and records whether it was closed
#[derive(Clone)]
pub struct ScriptedLauncher {
    page: Option<ScriptedPage>,
    closed: Arc<AtomicBool>,
}

impl ScriptedLauncher {
    pub fn new(page: ScriptedPage) -> Self {
        Self {
            page: Some(page),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A launcher whose browser never starts.
    pub fn failing() -> Self {
        Self {
            page: None,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

pub struct ScriptedSession {
    page: ScriptedPage,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl BrowserLauncher for ScriptedLauncher {
    type Session = ScriptedSession;

    async fn launch(&self) -> Result<ScriptedSession, WorkflowError> {
        let page = self
            .page
            .clone()
            .ok_or_else(|| WorkflowError::Browser("no Chrome executable found".into()))?;
        Ok(ScriptedSession {
            page,
            closed: Arc::clone(&self.closed),
        })
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    type Page = ScriptedPage;

    async fn new_page(&self) -> Result<ScriptedPage, WorkflowError> {
        Ok(self.page.clone())
    }

    async fn close(self) -> Result<(), WorkflowError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
