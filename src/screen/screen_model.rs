use serde::{Deserialize, Serialize};

use crate::screen::normalize::text_fingerprint;

/// Opaque back-reference to a live DOM node, minted by the page backend.
/// Only meaningful for the snapshot it was detected in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementHandle(pub String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        ElementHandle(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

/// Raw element description as reported by a page scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomElement {
    pub handle: ElementHandle,
    pub tag: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(rename = "type", default)]
    pub input_type: Option<String>,
    #[serde(default)]
    pub aria_label: Option<String>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub options: Vec<SelectOption>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub content_editable: bool,
    /// Has a click handler or a non-negative tabindex
    #[serde(default)]
    pub clickable: bool,
}

impl DomElement {
    pub fn new(handle: impl Into<String>, tag: impl Into<String>) -> Self {
        DomElement {
            handle: ElementHandle::new(handle),
            tag: tag.into().to_lowercase(),
            ..Default::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_type(mut self, input_type: impl Into<String>) -> Self {
        self.input_type = Some(input_type.into());
        self
    }

    pub fn with_aria_label(mut self, label: impl Into<String>) -> Self {
        self.aria_label = Some(label.into());
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Options given as labels; each option's value is its label.
    pub fn with_options(mut self, labels: &[&str]) -> Self {
        self.options = labels
            .iter()
            .map(|l| SelectOption {
                label: l.to_string(),
                value: l.to_string(),
            })
            .collect();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn content_editable(mut self) -> Self {
        self.content_editable = true;
        self
    }

    pub fn clickable(mut self) -> Self {
        self.clickable = true;
        self
    }

    /// Best human-readable label: aria-label, visible text, placeholder, name.
    pub fn label(&self) -> Option<&str> {
        [
            self.aria_label.as_deref(),
            self.text.as_deref(),
            self.placeholder.as_deref(),
            self.name.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
    }
}

/// One indexed entry of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InteractiveElement {
    pub index: usize,
    pub handle: ElementHandle,
    pub element: DomElement,
}

/// Interactive elements captured by one detection call.
///
/// Indices are contiguous from 0 and only valid together with the
/// `generation` they were assigned in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElementSnapshot {
    pub generation: u64,
    pub url: String,
    pub elements: Vec<InteractiveElement>,
    pub pseudo_html: String,
}

impl ElementSnapshot {
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&InteractiveElement> {
        self.elements.get(index)
    }

    /// Reverse lookup from a live node to its index in this snapshot.
    pub fn index_of(&self, handle: &ElementHandle) -> Option<usize> {
        self.elements
            .iter()
            .find(|e| &e.handle == handle)
            .map(|e| e.index)
    }

    /// Content hash of the textual representation, used to tell whether an
    /// action changed the page.
    pub fn fingerprint(&self) -> String {
        text_fingerprint(&self.pseudo_html)
    }
}
