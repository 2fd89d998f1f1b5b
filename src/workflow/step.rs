//! Steps of an audit workflow and the page interactions they perform

use std::collections::BTreeSet;
use std::time::Duration;

/// A single page operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Goto { url: String, timeout: Duration },
    WaitVisible { selector: String, timeout: Duration },
    Click { selector: String },
    WaitForLoad { timeout: Duration },
    /// Wait until the current URL contains `fragment`
    WaitForUrl { fragment: String, timeout: Duration },
    Pause(Duration),
}

impl Action {
    pub fn selector(&self) -> Option<&str> {
        match self {
            Self::WaitVisible { selector, .. } | Self::Click { selector } => Some(selector),
            _ => None,
        }
    }
}

/// How failures of a group of actions are treated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    /// Failure aborts the run
    Required(Action),
    /// Failure or running past `budget` is logged and the step continues
    BestEffort {
        label: String,
        actions: Vec<Action>,
        budget: Duration,
    },
}

impl Interaction {
    pub fn actions(&self) -> &[Action] {
        match self {
            Self::Required(action) => std::slice::from_ref(action),
            Self::BestEffort { actions, .. } => actions,
        }
    }
}

/// An audited point in the workflow: interactions, then a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub description: String,
    pub interactions: Vec<Interaction>,
}

impl Step {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            interactions: Vec::new(),
        }
    }

    pub fn required(mut self, action: Action) -> Self {
        self.interactions.push(Interaction::Required(action));
        self
    }

    pub fn best_effort(
        mut self,
        label: impl Into<String>,
        budget: Duration,
        actions: Vec<Action>,
    ) -> Self {
        self.interactions.push(Interaction::BestEffort {
            label: label.into(),
            actions,
            budget,
        });
        self
    }

    /// Every CSS selector the step's interactions touch.
    pub fn selectors_used(&self) -> BTreeSet<&str> {
        self.interactions
            .iter()
            .flat_map(Interaction::actions)
            .filter_map(Action::selector)
            .collect()
    }
}
