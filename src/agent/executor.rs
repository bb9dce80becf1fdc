use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    agent::{
        action::{AgentAction, ScrollDirection},
        error::ActionError,
    },
    browser::page::Page,
    screen::{
        detector::Detector,
        normalize::truncate_chars,
        screen_model::{DomElement, ElementSnapshot, InteractiveElement, SelectOption},
    },
};

pub const DEFAULT_SCROLL_AMOUNT: i64 = 500;

const TEXT_INPUT_TYPES: &[&str] = &[
    "text", "email", "password", "search", "tel", "url", "number", "date",
    "datetime-local", "month", "week", "time",
];

/// Result of one dispatched action, as reported back to the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    pub success: bool,
    pub message: String,
}

impl ActionOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        ActionOutcome {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        ActionOutcome {
            success: false,
            message: message.into(),
        }
    }
}

/// Performs validated actions against the page.
#[derive(Debug, Clone)]
pub struct ActionExecutor {
    scroll_amount: i64,
}

impl Default for ActionExecutor {
    fn default() -> Self {
        ActionExecutor::new(DEFAULT_SCROLL_AMOUNT)
    }
}

impl ActionExecutor {
    pub fn new(scroll_amount: i64) -> Self {
        ActionExecutor { scroll_amount }
    }

    pub fn scroll_amount(&self) -> i64 {
        self.scroll_amount
    }

    /// Run `action` against `snapshot`, which must be the detector's latest.
    /// Never fails: every problem is reported as an unsuccessful outcome.
    pub async fn execute(
        &self,
        page: &dyn Page,
        detector: &Detector,
        snapshot: &ElementSnapshot,
        action: &AgentAction,
    ) -> ActionOutcome {
        match self.run(page, detector, snapshot, action).await {
            Ok(message) => {
                debug!(?action, %message, "Action succeeded");
                ActionOutcome::ok(message)
            }
            Err(e) => {
                warn!(?action, error = %e, "Action failed");
                ActionOutcome::failed(e.to_string())
            }
        }
    }

    async fn run(
        &self,
        page: &dyn Page,
        detector: &Detector,
        snapshot: &ElementSnapshot,
        action: &AgentAction,
    ) -> Result<String, ActionError> {
        match action {
            AgentAction::Click { index } => {
                let target = detector.resolve_in(snapshot, *index)?;
                let el = &target.element;
                if el.disabled {
                    return Err(ActionError::Disabled {
                        index: *index,
                        tag: el.tag.clone(),
                    });
                }
                page.click(&target.handle).await.map_err(page_error)?;
                Ok(format!("Clicked {}", describe(target)))
            }

            AgentAction::Type { index, text } => {
                let target = detector.resolve_in(snapshot, *index)?;
                if !is_text_editable(&target.element) {
                    return Err(ActionError::NotEditable {
                        index: *index,
                        tag: target.element.tag.clone(),
                    });
                }
                page.set_value(&target.handle, text)
                    .await
                    .map_err(page_error)?;
                Ok(format!(
                    "Typed \"{}\" into {}",
                    truncate_chars(text, 30),
                    describe(target)
                ))
            }

            AgentAction::Scroll { direction } => {
                let delta = match direction {
                    ScrollDirection::Up => -self.scroll_amount,
                    ScrollDirection::Down => self.scroll_amount,
                };
                page.scroll(delta).await.map_err(page_error)?;
                Ok(format!("Scrolled {} by {}px", direction, self.scroll_amount))
            }

            AgentAction::Select { index, option } => {
                let target = detector.resolve_in(snapshot, *index)?;
                let el = &target.element;
                if el.tag != "select" {
                    return Err(ActionError::NotSelectable {
                        index: *index,
                        tag: el.tag.clone(),
                    });
                }
                if el.disabled {
                    return Err(ActionError::Disabled {
                        index: *index,
                        tag: el.tag.clone(),
                    });
                }
                let choice =
                    match_option(&el.options, option).ok_or_else(|| ActionError::OptionNotFound {
                        index: *index,
                        option: option.clone(),
                        available: el
                            .options
                            .iter()
                            .map(|o| o.label.as_str())
                            .collect::<Vec<_>>()
                            .join(", "),
                    })?;
                page.select_option(&target.handle, choice)
                    .await
                    .map_err(page_error)?;
                Ok(format!("Selected \"{}\" in {}", choice.label, describe(target)))
            }
        }
    }
}

/// Whether typing into the element makes sense: enabled, writable, and
/// either a text-like input, a textarea or a contenteditable region.
pub fn is_text_editable(el: &DomElement) -> bool {
    if el.disabled || el.readonly {
        return false;
    }
    if el.content_editable || el.tag == "textarea" {
        return true;
    }
    if el.tag == "input" {
        let kind = el.input_type.as_deref().unwrap_or("text").to_lowercase();
        return TEXT_INPUT_TYPES.contains(&kind.as_str());
    }
    matches!(el.role.as_deref(), Some("textbox") | Some("searchbox"))
}

/// Find an option by exact label, then case-insensitive label, then value.
pub fn match_option<'a>(options: &'a [SelectOption], wanted: &str) -> Option<&'a SelectOption> {
    let wanted = wanted.trim();
    options
        .iter()
        .find(|o| o.label.trim() == wanted)
        .or_else(|| {
            options
                .iter()
                .find(|o| o.label.trim().eq_ignore_ascii_case(wanted))
        })
        .or_else(|| options.iter().find(|o| o.value == wanted))
}

fn describe(target: &InteractiveElement) -> String {
    match target.element.label() {
        Some(label) => format!(
            "element [{}] <{}> \"{}\"",
            target.index,
            target.element.tag,
            truncate_chars(label, 40)
        ),
        None => format!("element [{}] <{}>", target.index, target.element.tag),
    }
}

fn page_error(e: crate::agent::error::AgentError) -> ActionError {
    ActionError::Page(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_editable_rules() {
        assert!(is_text_editable(&DomElement::new("a", "input")));
        assert!(is_text_editable(&DomElement::new("b", "input").with_type("email")));
        assert!(is_text_editable(&DomElement::new("c", "textarea")));
        assert!(is_text_editable(&DomElement::new("d", "div").content_editable()));
        assert!(!is_text_editable(&DomElement::new("e", "input").with_type("checkbox")));
        assert!(!is_text_editable(&DomElement::new("f", "input").readonly()));
        assert!(!is_text_editable(&DomElement::new("g", "textarea").disabled()));
        assert!(!is_text_editable(&DomElement::new("h", "button")));
    }

    #[test]
    fn option_matching_order() {
        let options = vec![
            SelectOption {
                label: "High".into(),
                value: "p1".into(),
            },
            SelectOption {
                label: "high".into(),
                value: "p1b".into(),
            },
            SelectOption {
                label: "Low".into(),
                value: "p3".into(),
            },
        ];
        assert_eq!(match_option(&options, "high").map(|o| o.value.as_str()), Some("p1b"));
        assert_eq!(match_option(&options, "LOW").map(|o| o.value.as_str()), Some("p3"));
        assert_eq!(match_option(&options, "p3").map(|o| o.label.as_str()), Some("Low"));
        assert_eq!(match_option(&options, "Medium"), None);
    }
}
