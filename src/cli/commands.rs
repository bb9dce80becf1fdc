use std::{path::Path, sync::Arc};

use anyhow::Context;
use tracing::{info, warn};

use crate::{
    agent::{
        agent::{BrowserAgent, TaskCallbacks},
        agent_model::{AgentConfig, AgentResult},
        error::AgentError,
        ai_model::{ChatEndpoint, ReasoningService},
        parser::{Directive, parse_directive},
        step_plan::{StepPlan, StepPlanReasoner},
    },
    browser::session::BrowserSession,
    cli::config::{BrowserSection, ServiceSettings},
    screen::detector::Detector,
    trace::logger::TraceLogger,
};

// ============================================================================
// run subcommand
// ============================================================================

pub struct RunOptions<'a> {
    pub task: &'a str,
    pub url: &'a str,
    pub plan: Option<&'a str>,
    pub trace: Option<&'a str>,
    pub headless: bool,
    pub agent: AgentConfig,
    pub service: ServiceSettings,
    pub browser: &'a BrowserSection,
}

/// Run a task in a fresh browser session. Returns whether the task succeeded.
pub async fn cmd_run(opts: RunOptions<'_>) -> anyhow::Result<bool> {
    let reasoner = build_reasoner(opts.plan, &opts.service)?;

    let session = Arc::new(BrowserSession::launch(&opts.browser.driver_script, opts.headless).await?);
    session
        .navigate(opts.url)
        .await
        .with_context(|| format!("Failed to open {}", opts.url))?;

    let mut agent = BrowserAgent::new(session.clone(), reasoner).with_config(opts.agent);
    if let Some(path) = opts.trace {
        agent = agent.with_tracer(TraceLogger::new(path));
    }

    let callbacks = TaskCallbacks::new()
        .on_status(|label| info!(status = label, "Agent status"))
        .on_progress(|step| println!("  [{}] {} -> {}", step.iteration, step.action, step.result));

    let result = agent.execute_task(opts.task, callbacks).await;
    let shutdown = session.quit().await;
    Ok(report_run(&result, shutdown))
}

/// Print the run summary. A failed shutdown is only logged: the result of
/// the task stands.
pub fn report_run(result: &AgentResult, shutdown: Result<(), AgentError>) -> bool {
    if let Err(e) = shutdown {
        warn!(error = %e, "Browser session did not shut down cleanly");
    }
    println!("{}", format_result(result));
    result.success
}

fn build_reasoner(
    plan: Option<&str>,
    service: &ServiceSettings,
) -> anyhow::Result<Arc<dyn ReasoningService>> {
    if let Some(path) = plan {
        let plan = StepPlan::load(Path::new(path))?;
        info!(path, steps = plan.steps.len(), "Using step plan");
        return Ok(Arc::new(StepPlanReasoner::new(plan)?));
    }

    let mut endpoint = ChatEndpoint::new(&service.endpoint);
    if let Some(key) = &service.api_key {
        endpoint = endpoint.with_api_key(key.clone());
    }
    if let Some(timeout) = service.timeout {
        endpoint = endpoint.with_timeout(timeout);
    }
    info!(endpoint = %service.endpoint, "Using chat endpoint");
    Ok(Arc::new(endpoint))
}

pub fn format_result(result: &AgentResult) -> String {
    format!(
        "{} ({:?}, {} steps): {}",
        if result.success { "SUCCESS" } else { "FAILED" },
        result.outcome,
        result.steps.len(),
        result.message
    )
}

// ============================================================================
// detect subcommand
// ============================================================================

pub async fn cmd_detect(
    url: &str,
    json: bool,
    browser: &BrowserSection,
    headless: bool,
) -> anyhow::Result<()> {
    let session = BrowserSession::launch(&browser.driver_script, headless).await?;
    session
        .navigate(url)
        .await
        .with_context(|| format!("Failed to open {}", url))?;

    let snapshot = Detector::new().detect(&session).await?;
    if let Err(e) = session.quit().await {
        warn!(error = %e, "Browser session did not shut down cleanly");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!("{} ({} interactive elements)", snapshot.url, snapshot.len());
        println!("{}", snapshot.pseudo_html);
    }
    Ok(())
}

// ============================================================================
// parse subcommand
// ============================================================================

pub fn cmd_parse(text: &str) {
    println!("{}", describe_directive(text));
}

/// Human-readable account of how a reply parses and validates.
pub fn describe_directive(text: &str) -> String {
    match parse_directive(text) {
        Directive::Completion => "completion".to_string(),
        Directive::Unparseable => "unparseable (taken as completion)".to_string(),
        Directive::Action(call) => match call.to_action() {
            Ok(action) => format!("action {} -> {:?}", call, action),
            Err(e) => format!("action {} -> invalid: {}", call, e),
        },
        Directive::Command(command) => {
            let name = command.name.clone();
            let has_selector = command.fields.selector.is_some();
            match command.into_call(None) {
                Some(call) if has_selector => {
                    format!("command {} -> {} (selector resolved at run time)", name, call)
                }
                Some(call) => format!("command {} -> {}", name, call),
                None if has_selector => {
                    format!("command {} -> selector only, resolved at run time", name)
                }
                None => format!("command {} -> no usable parameters", name),
            }
        }
    }
}
