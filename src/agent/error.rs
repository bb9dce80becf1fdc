use thiserror::Error;

/// Errors raised by the page backends, the reasoning service clients and the
/// detector. Any of these ends an agent run with an `Error: ...` result.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Driver subprocess failed to spawn (browser_server.js)
    #[error("Failed to spawn {script} (is Node.js installed?): {source}")]
    SubprocessSpawn {
        script: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading from or writing to the driver subprocess failed
    #[error("Session I/O error: {0}")]
    SessionIO(String),

    /// Driver answered a command with ok=false or an unexpected shape
    #[error("Driver command '{command}' failed: {error}")]
    SessionProtocol { command: String, error: String },

    /// JSON parsing failed (driver output, reasoning replies, plan files)
    #[error("JSON parse error ({context}): {source}")]
    JsonParse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization failed (requests to the driver)
    #[error("JSON serialize error ({context}): {source}")]
    JsonSerialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Network-level failure talking to the reasoning service
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// Reasoning service answered with a non-2xx status
    #[error("Reasoning service returned HTTP {status}: {message}")]
    ServiceStatus { status: u16, message: String },

    /// Reasoning service answered 2xx but flagged the call as failed
    #[error("{0}")]
    Service(String),

    /// A scripted reasoning service ran out of replies
    #[error("Scripted reasoning service exhausted after {0} replies")]
    ScriptExhausted(usize),

    /// In-memory page rejected an operation
    #[error("Page error: {0}")]
    Page(String),

    /// Step plan or config file could not be loaded
    #[error("Invalid {context}: {message}")]
    Config { context: String, message: String },
}

/// Failures of a dispatched action. The controller records the message as the
/// step result and ends the run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("No element snapshot available, elements must be detected first")]
    NoSnapshot,

    #[error("Snapshot generation {snapshot} is stale (current generation is {current})")]
    StaleSnapshot { snapshot: u64, current: u64 },

    #[error("Element index {index} out of range ({count} elements available)")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("Element [{index}] <{tag}> is disabled")]
    Disabled { index: usize, tag: String },

    #[error("Element [{index}] <{tag}> is not text-editable")]
    NotEditable { index: usize, tag: String },

    #[error("Element [{index}] <{tag}> is not a select control")]
    NotSelectable { index: usize, tag: String },

    #[error("Option \"{option}\" not found in element [{index}] (available: {available})")]
    OptionNotFound {
        index: usize,
        option: String,
        available: String,
    },

    #[error("{0}")]
    Page(String),
}

/// Malformed action calls, caught before anything reaches the executor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{action} requires {expected}")]
    MissingParameter {
        action: &'static str,
        expected: &'static str,
    },

    #[error("{action} requires a numeric element index, got \"{value}\"")]
    InvalidIndex { action: &'static str, value: String },

    #[error("scroll direction must be \"up\" or \"down\", got \"{0}\"")]
    InvalidDirection(String),

    #[error("Unknown action type: {0}")]
    UnknownAction(String),
}
