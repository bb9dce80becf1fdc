use std::sync::{
    Arc, Mutex, MutexGuard,
    atomic::{AtomicBool, Ordering},
};

use tracing::{debug, info, warn};

use crate::{
    agent::{
        agent_model::{
            AgentConfig, AgentResult, AgentState, AgentStep, ConversationTurn, EMPTY_RESPONSE,
            MAX_ITERATIONS_MESSAGE, RunOutcome, STOPPED_MESSAGE,
        },
        ai_model::{ChatRequest, ReasoningService},
        error::AgentError,
        executor::{ActionExecutor, ActionOutcome},
        parser::{CommandCall, Directive, parse_directive},
    },
    browser::page::Page,
    screen::{detector::Detector, screen_model::ElementSnapshot},
    trace::{logger::TraceLogger, trace::TraceEvent},
};

pub type ProgressCallback<'a> = Box<dyn FnMut(&AgentStep) + Send + 'a>;
pub type StatusCallback<'a> = Box<dyn FnMut(&str) + Send + 'a>;

/// Optional hooks invoked while a task runs.
#[derive(Default)]
pub struct TaskCallbacks<'a> {
    /// Once per recorded step, right after it is appended
    pub on_progress: Option<ProgressCallback<'a>>,
    /// With "thinking" and with the label of each action before it runs
    pub on_status: Option<StatusCallback<'a>>,
}

impl<'a> TaskCallbacks<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_progress(mut self, f: impl FnMut(&AgentStep) + Send + 'a) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    pub fn on_status(mut self, f: impl FnMut(&str) + Send + 'a) -> Self {
        self.on_status = Some(Box::new(f));
        self
    }

    fn progress(&mut self, step: &AgentStep) {
        if let Some(f) = self.on_progress.as_mut() {
            f(step);
        }
    }

    fn status(&mut self, label: &str) {
        if let Some(f) = self.on_status.as_mut() {
            f(label);
        }
    }
}

/// Cloneable remote control for a running agent.
#[derive(Debug, Clone)]
pub struct AgentHandle {
    abort: Arc<AtomicBool>,
    steps: Arc<Mutex<Vec<AgentStep>>>,
}

impl AgentHandle {
    /// Ask the run to stop at the next iteration boundary. An in-flight
    /// reasoning call or page action is not interrupted.
    pub fn stop(&self) {
        self.abort.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.abort.load(Ordering::SeqCst)
    }

    /// Steps recorded so far by the current or last run.
    pub fn steps(&self) -> Vec<AgentStep> {
        lock(&self.steps).clone()
    }
}

enum Flow {
    Continue,
    Finish(RunOutcome, String),
}

/// The perceive/decide/act loop.
pub struct BrowserAgent {
    page: Arc<dyn Page>,
    reasoner: Arc<dyn ReasoningService>,
    detector: Detector,
    executor: ActionExecutor,
    config: AgentConfig,
    state: AgentState,
    history: Vec<ConversationTurn>,
    steps: Arc<Mutex<Vec<AgentStep>>>,
    abort: Arc<AtomicBool>,
    tracer: Option<TraceLogger>,
}

impl BrowserAgent {
    pub fn new(page: Arc<dyn Page>, reasoner: Arc<dyn ReasoningService>) -> Self {
        let config = AgentConfig::default();
        Self {
            page,
            reasoner,
            detector: Detector::new(),
            executor: ActionExecutor::new(config.scroll_amount),
            config,
            state: AgentState::Idle,
            history: Vec::new(),
            steps: Arc::new(Mutex::new(Vec::new())),
            abort: Arc::new(AtomicBool::new(false)),
            tracer: None,
        }
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.executor = ActionExecutor::new(config.scroll_amount);
        self.config = config;
        self
    }

    pub fn with_tracer(mut self, tracer: TraceLogger) -> Self {
        self.tracer = Some(tracer);
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    pub fn steps(&self) -> Vec<AgentStep> {
        lock(&self.steps).clone()
    }

    pub fn handle(&self) -> AgentHandle {
        AgentHandle {
            abort: Arc::clone(&self.abort),
            steps: Arc::clone(&self.steps),
        }
    }

    pub fn stop(&self) {
        self.abort.store(true, Ordering::SeqCst);
    }

    /// Forget steps and conversation history. Required between unrelated
    /// tasks; history is otherwise carried over.
    pub fn reset(&mut self) {
        lock(&self.steps).clear();
        self.history.clear();
        self.abort.store(false, Ordering::SeqCst);
        self.state = AgentState::Idle;
    }

    /// Run `task` to completion. Always returns a result: failures of any
    /// kind end the run with `success: false` rather than an error.
    pub async fn execute_task(&mut self, task: &str, mut callbacks: TaskCallbacks<'_>) -> AgentResult {
        lock(&self.steps).clear();
        self.abort.store(false, Ordering::SeqCst);
        info!(task, max_iterations = self.config.max_iterations, "Starting task");

        for i in 0..self.config.max_iterations {
            if self.abort.load(Ordering::SeqCst) {
                return self.finish(RunOutcome::Aborted, STOPPED_MESSAGE.into());
            }

            match self.iterate(task, i, &mut callbacks).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Finish(outcome, message)) => return self.finish(outcome, message),
                Err(e) => return self.finish(RunOutcome::Error, format!("Error: {}", e)),
            }
        }

        self.finish(RunOutcome::MaxIterations, MAX_ITERATIONS_MESSAGE.into())
    }

    async fn iterate(
        &mut self,
        task: &str,
        i: u32,
        callbacks: &mut TaskCallbacks<'_>,
    ) -> Result<Flow, AgentError> {
        let iteration = i + 1;

        self.state = AgentState::Thinking;
        callbacks.status("thinking");

        let snapshot = self.detector.detect(self.page.as_ref()).await?;
        let prompt = build_prompt(task, i, &snapshot);

        let history: Vec<ConversationTurn> = self
            .history
            .iter()
            .filter(|t| !t.content.trim().is_empty())
            .cloned()
            .collect();
        self.history.push(ConversationTurn::user(prompt.clone()));

        let reply = self
            .reasoner
            .complete(ChatRequest {
                message: prompt,
                history,
            })
            .await?;
        debug!(iteration, reply = %reply, "Reasoning reply");

        let stored = if reply.trim().is_empty() {
            EMPTY_RESPONSE.to_string()
        } else {
            reply.clone()
        };
        self.history.push(ConversationTurn::assistant(stored));

        let call = match parse_directive(&reply) {
            Directive::Completion => {
                return Ok(self.complete(iteration, &snapshot, reply, RunOutcome::Completed, callbacks));
            }
            Directive::Unparseable => {
                warn!(iteration, reply = %reply, "Unparseable reply taken as completion");
                return Ok(self.complete(iteration, &snapshot, reply, RunOutcome::Unparsed, callbacks));
            }
            Directive::Action(call) => call,
            Directive::Command(command) => {
                let resolved = self.resolve_selector(&command).await;
                match command.into_call(resolved) {
                    Some(call) => call,
                    None => {
                        warn!(iteration, reply = %reply, "Command without usable parameters taken as completion");
                        return Ok(self.complete(iteration, &snapshot, reply, RunOutcome::Unparsed, callbacks));
                    }
                }
            }
        };

        callbacks.status(&call.status_label());
        self.state = AgentState::Acting;

        let outcome = match call.to_action() {
            Ok(action) => {
                self.executor
                    .execute(self.page.as_ref(), &self.detector, &snapshot, &action)
                    .await
            }
            Err(e) => {
                warn!(iteration, call = %call, error = %e, "Rejected action");
                ActionOutcome::failed(e.to_string())
            }
        };

        self.record_step(
            AgentStep {
                iteration,
                action: call.to_string(),
                result: outcome.message.clone(),
                elements_count: snapshot.len(),
            },
            &snapshot,
            callbacks,
        );

        if !outcome.success {
            self.history.push(ConversationTurn::user(format!(
                "Action failed: {} - {}",
                call, outcome.message
            )));
            return Ok(Flow::Finish(
                RunOutcome::ActionFailed,
                format!("Action failed: {}", outcome.message),
            ));
        }

        self.history.push(ConversationTurn::user(format!(
            "Action completed: {} - {}",
            call, outcome.message
        )));

        if !self.config.settle_delay.is_zero() {
            tokio::time::sleep(self.config.settle_delay).await;
        }
        Ok(Flow::Continue)
    }

    fn complete(
        &mut self,
        iteration: u32,
        snapshot: &ElementSnapshot,
        reply: String,
        outcome: RunOutcome,
        callbacks: &mut TaskCallbacks<'_>,
    ) -> Flow {
        self.record_step(
            AgentStep {
                iteration,
                action: "done".into(),
                result: reply.clone(),
                elements_count: snapshot.len(),
            },
            snapshot,
            callbacks,
        );
        Flow::Finish(outcome, reply)
    }

    /// A selector resolves through the live page and the detector's reverse
    /// lookup. Lookup failures fall back to the command's explicit fields.
    async fn resolve_selector(&self, command: &CommandCall) -> Option<usize> {
        let selector = command.fields.selector.as_deref()?;
        match self.page.query_selector(selector).await {
            Ok(Some(handle)) => self.detector.find_index_by_handle(&handle),
            Ok(None) => None,
            Err(e) => {
                warn!(selector, error = %e, "Selector lookup failed");
                None
            }
        }
    }

    fn record_step(
        &mut self,
        step: AgentStep,
        snapshot: &ElementSnapshot,
        callbacks: &mut TaskCallbacks<'_>,
    ) {
        if let Some(tracer) = &self.tracer {
            tracer.log(
                &TraceEvent::step(&step, self.state)
                    .with_snapshot(&snapshot.url, snapshot.fingerprint()),
            );
        }
        lock(&self.steps).push(step.clone());
        callbacks.progress(&step);
    }

    fn finish(&mut self, outcome: RunOutcome, message: String) -> AgentResult {
        self.state = match outcome {
            RunOutcome::Completed | RunOutcome::Unparsed => AgentState::Done,
            RunOutcome::Aborted => AgentState::Aborted,
            _ => AgentState::Failed,
        };

        let steps = self.steps();
        info!(?outcome, steps = steps.len(), %message, "Task finished");

        if let Some(tracer) = &self.tracer {
            let iteration = steps.last().map_or(0, |s| s.iteration);
            tracer.log(&TraceEvent::outcome(iteration, self.state, outcome, &message));
        }

        AgentResult {
            success: outcome.is_success(),
            message,
            outcome,
            steps,
        }
    }
}

/// The first prompt of a run carries the task; later ones only the page.
pub fn build_prompt(task: &str, iteration: u32, snapshot: &ElementSnapshot) -> String {
    let page = format!(
        "Current URL: {}\n\nAvailable elements:\n{}",
        snapshot.url, snapshot.pseudo_html
    );
    if iteration == 0 {
        format!("Task: {}\n\n{}", task, page)
    } else {
        page
    }
}

fn lock(steps: &Mutex<Vec<AgentStep>>) -> MutexGuard<'_, Vec<AgentStep>> {
    steps.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
