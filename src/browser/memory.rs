use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use tracing::trace;

use crate::{
    agent::error::AgentError,
    browser::page::Page,
    screen::screen_model::{DomElement, ElementHandle, SelectOption},
};

/// What a click on an element does to the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    /// Un-hide the listed elements
    Reveal(Vec<ElementHandle>),
    /// Detach the listed elements
    Remove(Vec<ElementHandle>),
    /// Change the current URL
    Navigate(String),
}

/// Every mutation the page went through, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    Clicked(ElementHandle),
    ValueSet { handle: ElementHandle, value: String },
    Selected { handle: ElementHandle, value: String },
    Scrolled(i64),
}

#[derive(Debug, Default)]
struct Document {
    url: String,
    elements: Vec<DomElement>,
    reactions: HashMap<ElementHandle, Vec<Reaction>>,
    events: Vec<PageEvent>,
    scroll_y: i64,
    scan_error: Option<String>,
}

impl Document {
    fn find_mut(&mut self, handle: &ElementHandle) -> Result<&mut DomElement, AgentError> {
        self.elements
            .iter_mut()
            .find(|e| &e.handle == handle)
            .ok_or_else(|| AgentError::Page(format!("element {} is detached", handle)))
    }

    fn apply(&mut self, reaction: Reaction) {
        match reaction {
            Reaction::Reveal(handles) => {
                for el in self.elements.iter_mut().filter(|e| handles.contains(&e.handle)) {
                    el.hidden = false;
                }
            }
            Reaction::Remove(handles) => self.elements.retain(|e| !handles.contains(&e.handle)),
            Reaction::Navigate(url) => self.url = url,
        }
    }
}

/// In-memory document implementing `Page`.
///
/// Used for offline runs and tests: clicks can trigger scripted reactions,
/// and every mutation is kept in an event log.
#[derive(Debug, Default)]
pub struct MemoryPage {
    doc: Mutex<Document>,
}

impl MemoryPage {
    pub fn new(url: impl Into<String>) -> Self {
        MemoryPage {
            doc: Mutex::new(Document {
                url: url.into(),
                ..Default::default()
            }),
        }
    }

    pub fn with_elements(self, elements: Vec<DomElement>) -> Self {
        self.doc().elements = elements;
        self
    }

    pub fn with_element(self, element: DomElement) -> Self {
        self.doc().elements.push(element);
        self
    }

    /// Register what clicking `handle` does.
    pub fn on_click(self, handle: impl Into<String>, reaction: Reaction) -> Self {
        self.doc()
            .reactions
            .entry(ElementHandle::new(handle))
            .or_default()
            .push(reaction);
        self
    }

    /// Make every following scan fail with `message` (None clears it).
    pub fn set_scan_error(&self, message: Option<&str>) {
        self.doc().scan_error = message.map(str::to_string);
    }

    pub fn push_element(&self, element: DomElement) {
        self.doc().elements.push(element);
    }

    pub fn element(&self, handle: &str) -> Option<DomElement> {
        self.doc()
            .elements
            .iter()
            .find(|e| e.handle.as_str() == handle)
            .cloned()
    }

    pub fn events(&self) -> Vec<PageEvent> {
        self.doc().events.clone()
    }

    pub fn scroll_y(&self) -> i64 {
        self.doc().scroll_y
    }

    pub fn url(&self) -> String {
        self.doc().url.clone()
    }

    fn doc(&self) -> MutexGuard<'_, Document> {
        self.doc.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Page for MemoryPage {
    async fn current_url(&self) -> Result<String, AgentError> {
        Ok(self.doc().url.clone())
    }

    async fn scan(&self) -> Result<Vec<DomElement>, AgentError> {
        let doc = self.doc();
        if let Some(message) = &doc.scan_error {
            return Err(AgentError::Page(message.clone()));
        }
        Ok(doc.elements.clone())
    }

    async fn query_selector(&self, selector: &str) -> Result<Option<ElementHandle>, AgentError> {
        let sel = SimpleSelector::parse(selector)
            .ok_or_else(|| AgentError::Page(format!("unsupported selector: {}", selector)))?;
        Ok(self
            .doc()
            .elements
            .iter()
            .find(|e| sel.matches(e))
            .map(|e| e.handle.clone()))
    }

    async fn click(&self, handle: &ElementHandle) -> Result<(), AgentError> {
        let mut doc = self.doc();
        doc.find_mut(handle)?;
        doc.events.push(PageEvent::Clicked(handle.clone()));
        let reactions = doc.reactions.get(handle).cloned().unwrap_or_default();
        for reaction in reactions {
            trace!(%handle, ?reaction, "Applying click reaction");
            doc.apply(reaction);
        }
        Ok(())
    }

    async fn set_value(&self, handle: &ElementHandle, text: &str) -> Result<(), AgentError> {
        let mut doc = self.doc();
        let el = doc.find_mut(handle)?;
        if el.content_editable {
            el.text = Some(text.to_string());
        } else {
            el.value = Some(text.to_string());
        }
        doc.events.push(PageEvent::ValueSet {
            handle: handle.clone(),
            value: text.to_string(),
        });
        Ok(())
    }

    async fn select_option(
        &self,
        handle: &ElementHandle,
        option: &SelectOption,
    ) -> Result<(), AgentError> {
        let mut doc = self.doc();
        let el = doc.find_mut(handle)?;
        el.value = Some(option.value.clone());
        doc.events.push(PageEvent::Selected {
            handle: handle.clone(),
            value: option.value.clone(),
        });
        Ok(())
    }

    async fn scroll(&self, delta_y: i64) -> Result<(), AgentError> {
        let mut doc = self.doc();
        doc.scroll_y = (doc.scroll_y + delta_y).max(0);
        doc.events.push(PageEvent::Scrolled(delta_y));
        Ok(())
    }
}

/// The selector subset the in-memory page understands:
/// `tag`, `#id`, `[attr="v"]` and combinations like `input[name='title']`.
#[derive(Debug, Default, PartialEq, Eq)]
struct SimpleSelector {
    tag: Option<String>,
    id: Option<String>,
    attr: Option<(String, String)>,
}

impl SimpleSelector {
    fn parse(selector: &str) -> Option<Self> {
        let mut rest = selector.trim();
        let mut sel = SimpleSelector::default();

        let tag_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
            .unwrap_or(rest.len());
        if tag_len > 0 {
            sel.tag = Some(rest[..tag_len].to_lowercase());
            rest = &rest[tag_len..];
        }

        if let Some(after) = rest.strip_prefix('#') {
            let end = after.find('[').unwrap_or(after.len());
            sel.id = Some(after[..end].to_string());
            rest = &after[end..];
        }

        if let Some(inner) = rest.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
            let (name, value) = inner.split_once('=')?;
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            sel.attr = Some((name.trim().to_string(), value.to_string()));
            rest = "";
        }

        if !rest.is_empty() || sel == SimpleSelector::default() {
            return None;
        }
        Some(sel)
    }

    fn matches(&self, el: &DomElement) -> bool {
        if self.tag.as_ref().is_some_and(|t| t != &el.tag) {
            return false;
        }
        if self.id.is_some() && self.id != el.id {
            return false;
        }
        match &self.attr {
            None => true,
            Some((name, value)) => attribute(el, name) == Some(value.as_str()),
        }
    }
}

fn attribute<'a>(el: &'a DomElement, name: &str) -> Option<&'a str> {
    match name {
        "id" => el.id.as_deref(),
        "name" => el.name.as_deref(),
        "type" => el.input_type.as_deref(),
        "role" => el.role.as_deref(),
        "aria-label" => el.aria_label.as_deref(),
        "placeholder" => el.placeholder.as_deref(),
        "href" => el.href.as_deref(),
        "value" => el.value.as_deref(),
        _ => None,
    }
}
