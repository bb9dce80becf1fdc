use std::{sync::Arc, time::Duration};

use browser_agent::{
    agent::{
        agent::BrowserAgent,
        agent_model::AgentConfig,
        ai_model::ReasoningService,
    },
    browser::memory::{MemoryPage, Reaction},
    screen::screen_model::{DomElement, ElementHandle},
};

pub const TASKS_URL: &str = "https://app.test/tasks";

/// Task list page. Visible interactive elements, in index order:
/// [0] Home link, [1] Create task, [2] search, [3] priority select,
/// [4] disabled Archive. Clicking "Create task" reveals the title input and
/// the Create button (indices 4 and 5, pushing Archive to 6); clicking
/// Create navigates to the new task.
pub fn task_page() -> MemoryPage {
    MemoryPage::new(TASKS_URL)
        .with_elements(vec![
            DomElement::new("nav-home", "a").with_href("/").with_text("Home"),
            DomElement::new("heading", "h1").with_text("My Tasks"),
            DomElement::new("create", "button")
                .with_id("create-btn")
                .with_text("Create task"),
            DomElement::new("search", "input")
                .with_type("search")
                .with_placeholder("Search tasks"),
            DomElement::new("priority", "select")
                .with_name("priority")
                .with_options(&["All", "High", "Medium", "Low"]),
            DomElement::new("title", "input")
                .with_placeholder("Enter task title")
                .hidden(),
            DomElement::new("save", "button").with_text("Create").hidden(),
            DomElement::new("archive", "button").with_text("Archive").disabled(),
        ])
        .on_click(
            "create",
            Reaction::Reveal(vec![handle("title"), handle("save")]),
        )
        .on_click("save", Reaction::Navigate(format!("{}/1", TASKS_URL)))
}

pub fn handle(id: &str) -> ElementHandle {
    ElementHandle::new(id)
}

/// Default config without the settle pause.
pub fn fast_config(max_iterations: u32) -> AgentConfig {
    AgentConfig {
        max_iterations,
        settle_delay: Duration::ZERO,
        ..AgentConfig::default()
    }
}

pub fn agent_for(page: &Arc<MemoryPage>, reasoner: Arc<dyn ReasoningService>) -> BrowserAgent {
    BrowserAgent::new(page.clone(), reasoner).with_config(fast_config(20))
}
