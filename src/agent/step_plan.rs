use std::{
    path::Path,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::agent::{
    ai_model::{ChatRequest, ReasoningService},
    error::AgentError,
};

pub const DEFAULT_MAX_RETRIES: u32 = 3;

static INDEX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(\d+)\]").expect("index regex"));
const ELEMENTS_MARKER: &str = "Available elements:\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanAction {
    Click,
    Type,
    Select,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    /// Regex matched against each pseudo-HTML line
    pub find: String,
    pub action: PlanAction,
    #[serde(default)]
    pub text: Option<String>,
}

/// A scripted walk through a page: find an element, act on it, move on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepPlan {
    pub done: String,
    pub steps: Vec<PlanStep>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl StepPlan {
    pub fn from_yaml(text: &str) -> Result<Self, AgentError> {
        serde_yaml::from_str(text).map_err(|e| AgentError::Config {
            context: "step plan".into(),
            message: e.to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, AgentError> {
        let text = std::fs::read_to_string(path).map_err(|e| AgentError::Config {
            context: format!("step plan {}", path.display()),
            message: e.to_string(),
        })?;
        Self::from_yaml(&text)
    }
}

/// The element listing embedded in a prompt, or "" when there is none.
pub fn extract_elements(prompt: &str) -> &str {
    prompt
        .find(ELEMENTS_MARKER)
        .map(|pos| &prompt[pos + ELEMENTS_MARKER.len()..])
        .unwrap_or("")
}

/// Index of the first listing line matching `pattern`.
pub fn find_element_index(elements: &str, pattern: &Regex) -> Option<usize> {
    let line = elements.lines().find(|line| pattern.is_match(line))?;
    INDEX_RE.captures(line)?[1].parse().ok()
}

#[derive(Debug, Default)]
struct Progress {
    step: usize,
    retries: u32,
}

/// Deterministic reasoning service that follows a `StepPlan`.
///
/// When the current step's element is not listed it scrolls down, up to
/// `max_retries` times, then skips the step.
#[derive(Debug)]
pub struct StepPlanReasoner {
    plan: StepPlan,
    patterns: Vec<Regex>,
    progress: Mutex<Progress>,
}

impl StepPlanReasoner {
    pub fn new(plan: StepPlan) -> Result<Self, AgentError> {
        let patterns = plan
            .steps
            .iter()
            .map(|s| {
                Regex::new(&s.find).map_err(|e| AgentError::Config {
                    context: "step plan pattern".into(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(StepPlanReasoner {
            plan,
            patterns,
            progress: Mutex::new(Progress::default()),
        })
    }

    /// Index of the step currently being looked for.
    pub fn current_step(&self) -> usize {
        self.progress().step
    }

    fn progress(&self) -> MutexGuard<'_, Progress> {
        self.progress
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_reply(&self, prompt: &str) -> String {
        let done = format!("DONE: {}", self.plan.done);
        let mut progress = self.progress();

        let Some(step) = self.plan.steps.get(progress.step) else {
            return done;
        };

        let elements = extract_elements(prompt);
        if let Some(index) = find_element_index(elements, &self.patterns[progress.step]) {
            progress.retries = 0;
            progress.step += 1;
            // Text goes through a JSON command: the inline form ends at the first ')'.
            return match (step.action, step.text.as_deref()) {
                (PlanAction::Type, Some(text)) => {
                    format!("[COMMAND: type] {}", json!({"index": index, "text": text}))
                }
                (PlanAction::Select, Some(text)) => {
                    format!("[COMMAND: select] {}", json!({"index": index, "option": text}))
                }
                _ => format!("ACTION: click({})", index),
            };
        }

        if progress.retries < self.plan.max_retries {
            progress.retries += 1;
            return "ACTION: scroll(\"down\")".into();
        }

        debug!(step = progress.step, pattern = %step.find, "Skipping plan step");
        progress.retries = 0;
        progress.step += 1;
        if progress.step >= self.plan.steps.len() {
            done
        } else {
            "ACTION: scroll(\"up\")".into()
        }
    }
}

#[async_trait]
impl ReasoningService for StepPlanReasoner {
    async fn complete(&self, request: ChatRequest) -> Result<String, AgentError> {
        Ok(self.next_reply(&request.message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_listing_after_marker() {
        let prompt = "Current URL: x\n\nAvailable elements:\n[0]<a>Home</a>\n[1]<button>Go</button>";
        assert_eq!(extract_elements(prompt), "[0]<a>Home</a>\n[1]<button>Go</button>");
        assert_eq!(extract_elements("no listing"), "");
    }

    #[test]
    fn finds_index_of_first_matching_line() {
        let listing = "[0]<a>Home</a>\n[7]<button>Create task</button>\n[8]<button>Create</button>";
        let re = Regex::new(">Create<").unwrap();
        assert_eq!(find_element_index(listing, &re), Some(8));
        let re = Regex::new("[Cc]reate").unwrap();
        assert_eq!(find_element_index(listing, &re), Some(7));
        let re = Regex::new("Delete").unwrap();
        assert_eq!(find_element_index(listing, &re), None);
    }

    #[test]
    fn plan_yaml_defaults_retries() {
        let plan = StepPlan::from_yaml(
            "done: finished\nsteps:\n  - find: 'New Task'\n    action: click\n",
        )
        .unwrap();
        assert_eq!(plan.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(plan.steps[0].action, PlanAction::Click);
    }
}
