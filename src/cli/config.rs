use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    agent::{
        agent_model::{AgentConfig, DEFAULT_MAX_ITERATIONS},
        ai_model::DEFAULT_ENDPOINT,
        executor::DEFAULT_SCROLL_AMOUNT,
    },
    browser::session::DEFAULT_DRIVER_SCRIPT,
};

pub const DEFAULT_CONFIG_PATH: &str = "browser-agent.yaml";
pub const ENV_ENDPOINT: &str = "BROWSER_AGENT_ENDPOINT";
pub const ENV_API_KEY: &str = "BROWSER_AGENT_API_KEY";

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "browser-agent",
    version,
    about = "LLM-driven browser automation agent"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Reasoning service chat endpoint
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Bearer token for the reasoning service
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Path to config file (default: browser-agent.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a task against a live page
    Run {
        /// What the agent should do, in plain language
        task: String,

        /// Page to open before the first detection
        #[arg(long)]
        url: String,

        /// Follow a YAML step plan instead of calling the reasoning service
        #[arg(long)]
        plan: Option<String>,

        /// Maximum perceive/decide/act iterations
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Pause after each successful action, in milliseconds
        #[arg(long)]
        settle_ms: Option<u64>,

        /// Append step and outcome events to this JSONL file
        #[arg(long)]
        trace: Option<String>,

        /// Show the browser window
        #[arg(long)]
        headed: bool,
    },

    /// Print the indexed element listing of a page
    Detect {
        /// Page to scan
        #[arg(long)]
        url: String,

        /// Print the snapshot as JSON instead of pseudo-HTML
        #[arg(long)]
        json: bool,

        /// Show the browser window
        #[arg(long)]
        headed: bool,
    },

    /// Show how a reasoning reply would be parsed
    Parse {
        /// Reply text
        text: String,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `browser-agent.yaml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub service: ServiceSection,
    #[serde(default)]
    pub browser: BrowserSection,
    #[serde(default)]
    pub trace: TraceSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSection {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    #[serde(default = "default_scroll_amount")]
    pub scroll_amount: i64,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            settle_delay_ms: default_settle_delay_ms(),
            scroll_amount: DEFAULT_SCROLL_AMOUNT,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSection {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    /// No timeout unless set
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserSection {
    #[serde(default = "default_driver_script")]
    pub driver_script: String,

    #[serde(default = "default_true")]
    pub headless: bool,
}

impl Default for BrowserSection {
    fn default() -> Self {
        Self {
            driver_script: default_driver_script(),
            headless: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceSection {
    pub path: Option<String>,
}

// Serde default helpers
fn default_max_iterations() -> u32 { DEFAULT_MAX_ITERATIONS }
fn default_settle_delay_ms() -> u64 { 500 }
fn default_scroll_amount() -> i64 { DEFAULT_SCROLL_AMOUNT }
fn default_driver_script() -> String { DEFAULT_DRIVER_SCRIPT.to_string() }
fn default_true() -> bool { true }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if the file is missing or
/// malformed; an explicitly requested file that cannot be read is logged.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_PATH);
    let content = match std::fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            if path.is_some() {
                warn!(path = config_path, error = %e, "Could not read config file, using defaults");
            }
            return AppConfig::default();
        }
    };

    serde_yaml::from_str(&content).unwrap_or_else(|e| {
        warn!(path = config_path, error = %e, "Malformed config file, using defaults");
        AppConfig::default()
    })
}

// ============================================================================
// Settings resolution (CLI > config file > environment > defaults)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout: Option<Duration>,
}

/// Resolve reasoning service settings. `env` looks up an environment
/// variable; pass `|k| std::env::var(k).ok()` outside tests.
pub fn resolve_service(
    cli_endpoint: Option<&str>,
    cli_api_key: Option<&str>,
    section: &ServiceSection,
    env: impl Fn(&str) -> Option<String>,
) -> ServiceSettings {
    let endpoint = cli_endpoint
        .map(str::to_string)
        .or_else(|| section.endpoint.clone())
        .or_else(|| env(ENV_ENDPOINT))
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
    let api_key = cli_api_key
        .map(str::to_string)
        .or_else(|| section.api_key.clone())
        .or_else(|| env(ENV_API_KEY));

    ServiceSettings {
        endpoint,
        api_key,
        timeout: section.timeout_secs.map(Duration::from_secs),
    }
}

/// Build the controller configuration, CLI overrides first.
pub fn build_agent_config(
    section: &AgentSection,
    max_iterations: Option<u32>,
    settle_ms: Option<u64>,
) -> AgentConfig {
    AgentConfig {
        max_iterations: max_iterations.unwrap_or(section.max_iterations),
        settle_delay: Duration::from_millis(settle_ms.unwrap_or(section.settle_delay_ms)),
        scroll_amount: section.scroll_amount,
    }
}
