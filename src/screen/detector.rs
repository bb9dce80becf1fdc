use tracing::debug;

use crate::{
    agent::error::{ActionError, AgentError},
    browser::page::Page,
    screen::{
        normalize::normalize_text,
        screen_model::{DomElement, ElementHandle, ElementSnapshot, InteractiveElement},
    },
};

pub const MAX_TEXT_CHARS: usize = 80;
const MAX_ATTR_CHARS: usize = 60;
const MAX_VALUE_CHARS: usize = 30;

const INTERACTIVE_TAGS: &[&str] = &["a", "button", "input", "textarea", "select", "summary"];

const INTERACTIVE_ROLES: &[&str] = &[
    "button",
    "link",
    "checkbox",
    "radio",
    "switch",
    "tab",
    "menuitem",
    "menuitemcheckbox",
    "menuitemradio",
    "option",
    "combobox",
    "listbox",
    "textbox",
    "searchbox",
    "slider",
    "spinbutton",
];

/// Scans a page into indexed snapshots.
///
/// Keeps only the latest snapshot: every detection bumps the generation and
/// replaces the index-to-handle map, so indices from an earlier detection
/// can no longer be resolved.
#[derive(Debug, Default)]
pub struct Detector {
    generation: u64,
    latest: Option<ElementSnapshot>,
}

impl Detector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan the live page and build a fresh snapshot.
    pub async fn detect(&mut self, page: &dyn Page) -> Result<ElementSnapshot, AgentError> {
        let url = page.current_url().await?;
        let raw = page.scan().await?;
        Ok(self.build(url, raw))
    }

    /// Build a snapshot from already scanned elements.
    pub fn build(&mut self, url: String, raw: Vec<DomElement>) -> ElementSnapshot {
        self.generation += 1;
        let scanned = raw.len();

        let elements: Vec<InteractiveElement> = raw
            .into_iter()
            .filter(is_interactive)
            .enumerate()
            .map(|(index, element)| InteractiveElement {
                index,
                handle: element.handle.clone(),
                element,
            })
            .collect();

        let pseudo_html = elements
            .iter()
            .map(|e| render_element(e.index, &e.element))
            .collect::<Vec<_>>()
            .join("\n");

        debug!(
            generation = self.generation,
            scanned,
            interactive = elements.len(),
            "Detected elements"
        );

        let snapshot = ElementSnapshot {
            generation: self.generation,
            url,
            elements,
            pseudo_html,
        };
        self.latest = Some(snapshot.clone());
        snapshot
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn latest(&self) -> Option<&ElementSnapshot> {
        self.latest.as_ref()
    }

    /// Resolve an index against the latest snapshot.
    pub fn resolve(&self, index: usize) -> Result<&InteractiveElement, ActionError> {
        let snapshot = self.latest.as_ref().ok_or(ActionError::NoSnapshot)?;
        snapshot.get(index).ok_or(ActionError::IndexOutOfRange {
            index,
            count: snapshot.len(),
        })
    }

    /// Resolve an index against a snapshot the caller holds, rejecting it if
    /// a newer detection has happened since.
    pub fn resolve_in<'a>(
        &self,
        snapshot: &'a ElementSnapshot,
        index: usize,
    ) -> Result<&'a InteractiveElement, ActionError> {
        if snapshot.generation != self.generation {
            return Err(ActionError::StaleSnapshot {
                snapshot: snapshot.generation,
                current: self.generation,
            });
        }
        snapshot.get(index).ok_or(ActionError::IndexOutOfRange {
            index,
            count: snapshot.len(),
        })
    }

    /// Reverse lookup from a live node to its index in the latest snapshot.
    pub fn find_index_by_handle(&self, handle: &ElementHandle) -> Option<usize> {
        self.latest.as_ref()?.index_of(handle)
    }
}

/// Whether a scanned element is something the agent can act on.
pub fn is_interactive(el: &DomElement) -> bool {
    if el.hidden {
        return false;
    }

    let tag = el.tag.to_lowercase();
    if tag == "input" && el.input_type.as_deref() == Some("hidden") {
        return false;
    }

    INTERACTIVE_TAGS.contains(&tag.as_str())
        || el
            .role
            .as_deref()
            .is_some_and(|r| INTERACTIVE_ROLES.contains(&r.to_lowercase().as_str()))
        || el.content_editable
        || el.clickable
}

/// One pseudo-HTML line, e.g. `[2]<input type="text" placeholder="Task name">`.
pub fn render_element(index: usize, el: &DomElement) -> String {
    let tag = el.tag.to_lowercase();
    let mut attrs = String::new();

    if matches!(tag.as_str(), "input" | "button") {
        push_attr(&mut attrs, "type", el.input_type.as_deref(), MAX_ATTR_CHARS);
    }
    push_attr(&mut attrs, "role", el.role.as_deref(), MAX_ATTR_CHARS);
    push_attr(&mut attrs, "aria-label", el.aria_label.as_deref(), MAX_ATTR_CHARS);
    push_attr(&mut attrs, "placeholder", el.placeholder.as_deref(), MAX_ATTR_CHARS);
    push_attr(&mut attrs, "name", el.name.as_deref(), MAX_ATTR_CHARS);
    push_attr(&mut attrs, "href", el.href.as_deref(), MAX_ATTR_CHARS);
    if matches!(tag.as_str(), "input" | "textarea" | "select") {
        push_attr(&mut attrs, "value", el.value.as_deref(), MAX_VALUE_CHARS);
    }
    if el.content_editable {
        attrs.push_str(" contenteditable");
    }
    if el.readonly {
        attrs.push_str(" readonly");
    }
    if el.disabled {
        attrs.push_str(" disabled");
    }

    if tag == "input" {
        return format!("[{}]<{}{}>", index, tag, attrs);
    }

    let body = if tag == "select" {
        el.options
            .iter()
            .filter_map(|o| normalize_text(&o.label, MAX_VALUE_CHARS))
            .collect::<Vec<_>>()
            .join("|")
    } else {
        el.text
            .as_deref()
            .and_then(|t| normalize_text(t, MAX_TEXT_CHARS))
            .unwrap_or_default()
    };

    format!("[{}]<{}{}>{}</{}>", index, tag, attrs, body, tag)
}

fn push_attr(out: &mut String, name: &str, value: Option<&str>, max: usize) {
    if let Some(v) = value.and_then(|v| normalize_text(v, max)) {
        out.push_str(&format!(" {}=\"{}\"", name, v));
    }
}
