use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    process::{Child, ChildStdin, ChildStdout, Command},
    sync::Mutex,
};
use tracing::{debug, info, warn};

use crate::{
    agent::error::AgentError,
    browser::page::Page,
    screen::screen_model::{DomElement, ElementHandle, SelectOption},
};

pub const DEFAULT_DRIVER_SCRIPT: &str = "driver/browser_server.js";

/// Request sent to browser_server.js over stdin (one JSON line).
#[derive(Debug, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum DriverRequest {
    Navigate { url: String },
    Url,
    Scan,
    Query { selector: String },
    Click { handle: ElementHandle },
    Fill { handle: ElementHandle, value: String },
    Select { handle: ElementHandle, value: String },
    Scroll { delta_y: i64 },
    Quit,
}

impl DriverRequest {
    pub fn name(&self) -> &'static str {
        match self {
            DriverRequest::Navigate { .. } => "navigate",
            DriverRequest::Url => "url",
            DriverRequest::Scan => "scan",
            DriverRequest::Query { .. } => "query",
            DriverRequest::Click { .. } => "click",
            DriverRequest::Fill { .. } => "fill",
            DriverRequest::Select { .. } => "select",
            DriverRequest::Scroll { .. } => "scroll",
            DriverRequest::Quit => "quit",
        }
    }
}

/// Response received from browser_server.js over stdout (one JSON line).
#[derive(Debug, Deserialize)]
pub struct DriverResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub ready: Option<bool>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub elements: Option<Vec<DomElement>>,
    #[serde(default)]
    pub handle: Option<ElementHandle>,
}

struct Pipes {
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
}

/// A persistent browser session backed by browser_server.js.
///
/// Launches a long-lived Node.js process that keeps a Chromium page open.
/// Commands are sent as NDJSON over stdin, responses read from stdout. The
/// pipes sit behind one lock so a request and its response line are never
/// interleaved with another command.
pub struct BrowserSession {
    child: Mutex<Child>,
    pipes: Mutex<Pipes>,
}

impl BrowserSession {
    /// Launch a new browser session by spawning the driver script.
    pub async fn launch(driver_script: &str, headless: bool) -> Result<Self, AgentError> {
        let mut child = Command::new("node")
            .arg(driver_script)
            .env("HEADLESS", if headless { "1" } else { "0" })
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AgentError::SubprocessSpawn {
                script: driver_script.into(),
                source: e,
            })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            AgentError::SessionIO(format!("Failed to capture stdin of {}", driver_script))
        })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            AgentError::SessionIO(format!("Failed to capture stdout of {}", driver_script))
        })?;

        let mut reader = BufReader::new(stdout);

        // Wait for the ready signal
        let line = read_line(&mut reader).await?;
        let response: DriverResponse =
            serde_json::from_str(line.trim()).map_err(|e| AgentError::JsonParse {
                context: "driver ready signal".into(),
                source: e,
            })?;

        if !response.ok || response.ready != Some(true) {
            return Err(AgentError::SessionProtocol {
                command: "launch".into(),
                error: format!("Did not receive ready signal from {}", driver_script),
            });
        }

        info!(script = driver_script, headless, "Browser session ready");

        Ok(BrowserSession {
            child: Mutex::new(child),
            pipes: Mutex::new(Pipes { stdin, reader }),
        })
    }

    /// Send a request and read the response.
    async fn send(&self, request: &DriverRequest) -> Result<DriverResponse, AgentError> {
        let json = serde_json::to_string(request).map_err(|e| AgentError::JsonSerialize {
            context: "DriverRequest".into(),
            source: e,
        })?;

        let mut pipes = self.pipes.lock().await;

        debug!(cmd = request.name(), "-> driver");
        pipes
            .stdin
            .write_all(format!("{}\n", json).as_bytes())
            .await
            .map_err(|e| AgentError::SessionIO(format!("Failed to write to driver stdin: {}", e)))?;
        pipes
            .stdin
            .flush()
            .await
            .map_err(|e| AgentError::SessionIO(format!("Failed to flush driver stdin: {}", e)))?;

        let line = read_line(&mut pipes.reader).await?;
        serde_json::from_str(line.trim()).map_err(|e| AgentError::JsonParse {
            context: "driver response".into(),
            source: e,
        })
    }

    /// Send a request and verify it succeeded.
    async fn send_ok(&self, request: &DriverRequest) -> Result<DriverResponse, AgentError> {
        let response = self.send(request).await?;
        if !response.ok {
            return Err(AgentError::SessionProtocol {
                command: request.name().into(),
                error: response.error.unwrap_or_else(|| "Unknown error".into()),
            });
        }
        Ok(response)
    }

    pub async fn navigate(&self, url: &str) -> Result<(), AgentError> {
        self.send_ok(&DriverRequest::Navigate { url: url.into() })
            .await?;
        Ok(())
    }

    /// Quit the browser session. Best-effort: a driver that already exited
    /// is not an error.
    pub async fn quit(&self) -> Result<(), AgentError> {
        if let Err(e) = self.send(&DriverRequest::Quit).await {
            warn!(error = %e, "Driver did not acknowledge quit");
        }
        let mut child = self.child.lock().await;
        child
            .wait()
            .await
            .map_err(|e| AgentError::SessionIO(format!("Failed to wait for driver: {}", e)))?;
        Ok(())
    }
}

async fn read_line(reader: &mut BufReader<ChildStdout>) -> Result<String, AgentError> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .await
        .map_err(|e| AgentError::SessionIO(format!("Failed to read from driver stdout: {}", e)))?;

    if line.trim().is_empty() {
        return Err(AgentError::SessionIO(
            "Empty response from driver (process may have died)".into(),
        ));
    }
    Ok(line)
}

#[async_trait]
impl Page for BrowserSession {
    async fn current_url(&self) -> Result<String, AgentError> {
        let response = self.send_ok(&DriverRequest::Url).await?;
        response.url.ok_or_else(|| AgentError::SessionProtocol {
            command: "url".into(),
            error: "No URL in response".into(),
        })
    }

    async fn scan(&self) -> Result<Vec<DomElement>, AgentError> {
        let response = self.send_ok(&DriverRequest::Scan).await?;
        response.elements.ok_or_else(|| AgentError::SessionProtocol {
            command: "scan".into(),
            error: "No elements in response".into(),
        })
    }

    async fn query_selector(&self, selector: &str) -> Result<Option<ElementHandle>, AgentError> {
        let response = self
            .send_ok(&DriverRequest::Query {
                selector: selector.into(),
            })
            .await?;
        Ok(response.handle)
    }

    async fn click(&self, handle: &ElementHandle) -> Result<(), AgentError> {
        self.send_ok(&DriverRequest::Click {
            handle: handle.clone(),
        })
        .await?;
        Ok(())
    }

    async fn set_value(&self, handle: &ElementHandle, text: &str) -> Result<(), AgentError> {
        self.send_ok(&DriverRequest::Fill {
            handle: handle.clone(),
            value: text.into(),
        })
        .await?;
        Ok(())
    }

    async fn select_option(
        &self,
        handle: &ElementHandle,
        option: &SelectOption,
    ) -> Result<(), AgentError> {
        self.send_ok(&DriverRequest::Select {
            handle: handle.clone(),
            value: option.value.clone(),
        })
        .await?;
        Ok(())
    }

    async fn scroll(&self, delta_y: i64) -> Result<(), AgentError> {
        self.send_ok(&DriverRequest::Scroll { delta_y }).await?;
        Ok(())
    }
}
