use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::agent::agent_model::{AgentState, AgentStep, RunOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceKind {
    Step,
    Outcome,
}

/// One line of the JSONL trace file.
#[derive(Debug, Serialize)]
pub struct TraceEvent {
    pub timestamp: String,
    pub kind: TraceKind,
    pub iteration: u32,
    pub agent_state: AgentState,

    pub url: Option<String>,
    pub snapshot_fingerprint: Option<String>,
    pub elements_count: Option<usize>,

    pub action: Option<String>,
    pub result: Option<String>,

    pub outcome: Option<RunOutcome>,
    pub success: Option<bool>,
}

impl TraceEvent {
    pub fn now(kind: TraceKind, iteration: u32, state: AgentState) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            kind,
            iteration,
            agent_state: state,
            url: None,
            snapshot_fingerprint: None,
            elements_count: None,
            action: None,
            result: None,
            outcome: None,
            success: None,
        }
    }

    pub fn step(step: &AgentStep, state: AgentState) -> Self {
        let mut event = Self::now(TraceKind::Step, step.iteration, state);
        event.elements_count = Some(step.elements_count);
        event.action = Some(step.action.clone());
        event.result = Some(step.result.clone());
        event
    }

    pub fn outcome(iteration: u32, state: AgentState, outcome: RunOutcome, message: &str) -> Self {
        let mut event = Self::now(TraceKind::Outcome, iteration, state);
        event.outcome = Some(outcome);
        event.success = Some(outcome.is_success());
        event.result = Some(message.to_string());
        event
    }

    pub fn with_snapshot(mut self, url: &str, fingerprint: String) -> Self {
        self.url = Some(url.to_string());
        self.snapshot_fingerprint = Some(fingerprint);
        self
    }
}
