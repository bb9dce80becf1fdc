use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::agent::executor::DEFAULT_SCROLL_AMOUNT;

pub const DEFAULT_MAX_ITERATIONS: u32 = 20;
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Stored in place of a blank reply so history never holds empty turns.
pub const EMPTY_RESPONSE: &str = "[empty response]";
pub const STOPPED_MESSAGE: &str = "Stopped by user";
pub const MAX_ITERATIONS_MESSAGE: &str = "Max iterations reached";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentState {
    Idle,
    Thinking,
    Acting,
    Done,
    Failed,
    Aborted,
}

/// One recorded iteration. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentStep {
    /// 1-based
    pub iteration: u32,
    /// `done` or the canonical `name(args)` rendering
    pub action: String,
    pub result: String,
    pub elements_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        ConversationTurn {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        ConversationTurn {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The service signalled completion
    Completed,
    /// The reply could not be parsed and was taken as completion
    Unparsed,
    ActionFailed,
    Error,
    Aborted,
    MaxIterations,
}

impl RunOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, RunOutcome::Completed | RunOutcome::Unparsed)
    }
}

/// Final result of `execute_task`, produced exactly once per call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentResult {
    pub success: bool,
    pub message: String,
    pub outcome: RunOutcome,
    pub steps: Vec<AgentStep>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub max_iterations: u32,
    /// Pause after a successful action before the next detection
    pub settle_delay: Duration,
    /// Pixels per scroll action
    pub scroll_amount: i64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            settle_delay: DEFAULT_SETTLE_DELAY,
            scroll_amount: DEFAULT_SCROLL_AMOUNT,
        }
    }
}
