//! Process-wide agent for hosts that cannot pass a `BrowserAgent` around.
//!
//! Prefer constructing an agent and handing it to whatever needs it; this
//! accessor only exists at the host boundary.

use once_cell::sync::OnceCell;
use tokio::sync::Mutex;

use crate::agent::agent::BrowserAgent;

static GLOBAL_AGENT: OnceCell<Mutex<BrowserAgent>> = OnceCell::new();

/// Install `agent` as the process-wide instance. Gives the agent back if
/// one was already installed.
pub fn install_global_agent(agent: BrowserAgent) -> Result<(), BrowserAgent> {
    GLOBAL_AGENT
        .set(Mutex::new(agent))
        .map_err(|rejected| rejected.into_inner())
}

/// The installed instance, constructing it with `init` on first use.
pub fn global_agent_or_init(init: impl FnOnce() -> BrowserAgent) -> &'static Mutex<BrowserAgent> {
    GLOBAL_AGENT.get_or_init(|| Mutex::new(init()))
}

pub fn global_agent() -> Option<&'static Mutex<BrowserAgent>> {
    GLOBAL_AGENT.get()
}
