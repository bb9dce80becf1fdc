use std::fmt;

use serde::Serialize;

use crate::agent::error::ValidationError;

/// One positional argument of an inline action call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ActionArg {
    Int(i64),
    Text(String),
}

impl ActionArg {
    /// Integer value, accepting numeric text as well.
    fn as_index(&self) -> Option<usize> {
        match self {
            ActionArg::Int(n) => usize::try_from(*n).ok(),
            ActionArg::Text(s) => s.trim().parse().ok(),
        }
    }

    fn as_text(&self) -> String {
        match self {
            ActionArg::Int(n) => n.to_string(),
            ActionArg::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for ActionArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionArg::Int(n) => write!(f, "{}", n),
            ActionArg::Text(s) => f.write_str(s),
        }
    }
}

/// An action as the reasoning service wrote it, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionCall {
    pub name: String,
    pub args: Vec<ActionArg>,
}

impl ActionCall {
    pub fn new(name: impl Into<String>, args: Vec<ActionArg>) -> Self {
        ActionCall {
            name: name.into().to_lowercase(),
            args,
        }
    }

    /// Status text shown while the action runs.
    pub fn status_label(&self) -> String {
        let arg = |i: usize| self.args.get(i).map(ActionArg::as_text);
        match self.name.as_str() {
            "click" => "Clicking element".into(),
            "type" => {
                let text: String = arg(1).unwrap_or_default().chars().take(30).collect();
                format!("Typing \"{}\"", text)
            }
            "scroll" => format!("Scrolling {}", arg(0).unwrap_or_else(|| "down".into())),
            "select" => format!("Selecting \"{}\"", arg(1).unwrap_or_default()),
            _ => "Performing action".into(),
        }
    }

    /// Check arity and argument types and build the typed action.
    pub fn to_action(&self) -> Result<AgentAction, ValidationError> {
        let name = self.name.as_str();
        match name {
            "click" => {
                let index = self.index_arg("click", "an index parameter")?;
                Ok(AgentAction::Click { index })
            }
            "type" => {
                let expected = "index and text parameters";
                let text = self
                    .args
                    .get(1)
                    .ok_or(ValidationError::MissingParameter {
                        action: "type",
                        expected,
                    })?
                    .as_text();
                let index = self.index_arg("type", expected)?;
                Ok(AgentAction::Type { index, text })
            }
            "scroll" => {
                let raw = self
                    .args
                    .first()
                    .ok_or(ValidationError::MissingParameter {
                        action: "scroll",
                        expected: "a direction parameter",
                    })?
                    .as_text();
                let direction = ScrollDirection::parse(&raw)
                    .ok_or_else(|| ValidationError::InvalidDirection(raw.clone()))?;
                Ok(AgentAction::Scroll { direction })
            }
            "select" => {
                let expected = "index and option parameters";
                let option = self
                    .args
                    .get(1)
                    .ok_or(ValidationError::MissingParameter {
                        action: "select",
                        expected,
                    })?
                    .as_text();
                let index = self.index_arg("select", expected)?;
                Ok(AgentAction::Select { index, option })
            }
            other => Err(ValidationError::UnknownAction(other.to_string())),
        }
    }

    fn index_arg(
        &self,
        action: &'static str,
        expected: &'static str,
    ) -> Result<usize, ValidationError> {
        let arg = self
            .args
            .first()
            .ok_or(ValidationError::MissingParameter { action, expected })?;
        arg.as_index().ok_or_else(|| ValidationError::InvalidIndex {
            action,
            value: arg.as_text(),
        })
    }
}

/// Canonical rendering used in step records and history, e.g. `type(3, hello)`.
impl fmt::Display for ActionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.args.iter().map(ToString::to_string).collect();
        write!(f, "{}({})", self.name, args.join(", "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
}

impl ScrollDirection {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "up" => Some(ScrollDirection::Up),
            "down" => Some(ScrollDirection::Down),
            _ => None,
        }
    }
}

impl fmt::Display for ScrollDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrollDirection::Up => f.write_str("up"),
            ScrollDirection::Down => f.write_str("down"),
        }
    }
}

/// Validated action, ready for the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AgentAction {
    Click { index: usize },
    Type { index: usize, text: String },
    Scroll { direction: ScrollDirection },
    Select { index: usize, option: String },
}
