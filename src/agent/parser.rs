use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::agent::action::{ActionArg, ActionCall};

static ACTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)ACTION:\s*(\w+)\(([^)]*)\)").expect("action regex"));
static ARG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?:[^,"]+|"[^"]*")+"#).expect("argument regex"));
static INT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+$").expect("integer regex"));
static COMMAND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[COMMAND:\s*(\w+)\]\s*\{").expect("command regex"));

/// What a reasoning reply asks the agent to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// `DONE: ...` or "task complete"
    Completion,
    /// `ACTION: name(args)`
    Action(ActionCall),
    /// `[COMMAND: name] {json}`, still to be resolved against the page
    Command(CommandCall),
    /// Nothing recognizable
    Unparseable,
}

/// Parse a reply. Strategies are tried in fixed order: completion, inline
/// action, structured command.
pub fn parse_directive(text: &str) -> Directive {
    if is_completion(text) {
        return Directive::Completion;
    }
    if let Some(call) = parse_inline_call(text) {
        return Directive::Action(call);
    }
    if let Some(command) = parse_command(text) {
        return Directive::Command(command);
    }
    Directive::Unparseable
}

/// Completion always wins, even over a well-formed action elsewhere in the text.
pub fn is_completion(text: &str) -> bool {
    text.trim().starts_with("DONE:") || text.to_lowercase().contains("task complete")
}

pub fn parse_inline_call(text: &str) -> Option<ActionCall> {
    let caps = ACTION_RE.captures(text)?;
    let args = split_args(caps.get(2).map_or("", |m| m.as_str()))
        .into_iter()
        .map(|piece| parse_arg(&piece))
        .collect();
    Some(ActionCall::new(&caps[1], args))
}

/// Split an argument list on commas outside double quotes, trimming each
/// piece and dropping empty ones.
pub fn split_args(raw: &str) -> Vec<String> {
    ARG_RE
        .find_iter(raw)
        .map(|m| m.as_str().trim().to_string())
        .filter(|piece| !piece.is_empty())
        .collect()
}

/// A quoted piece is text with its quotes stripped once; a piece that is
/// entirely an integer is an integer; anything else stays raw text.
pub fn parse_arg(piece: &str) -> ActionArg {
    if piece.len() >= 2 && piece.starts_with('"') && piece.ends_with('"') {
        return ActionArg::Text(piece[1..piece.len() - 1].to_string());
    }
    if INT_RE.is_match(piece) {
        if let Ok(n) = piece.parse() {
            return ActionArg::Int(n);
        }
    }
    ActionArg::Text(piece.to_string())
}

/// Fields a structured command may carry.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CommandFields {
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub element: Option<Value>,
    #[serde(default)]
    pub index: Option<Value>,
    #[serde(default)]
    pub text: Option<Value>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub direction: Option<Value>,
    #[serde(default)]
    pub option: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandCall {
    pub name: String,
    pub fields: CommandFields,
}

impl CommandCall {
    /// Build the positional call. `resolved_index` is what the selector
    /// resolved to on the live page; `element` and `index` only count when
    /// it is None. Returns None when no parameter could be extracted.
    pub fn into_call(self, resolved_index: Option<usize>) -> Option<ActionCall> {
        let f = self.fields;
        let mut args = Vec::new();

        let target = match resolved_index {
            Some(i) => i64::try_from(i).ok().map(ActionArg::Int),
            None => f
                .element
                .as_ref()
                .and_then(json_arg)
                .or_else(|| f.index.as_ref().and_then(json_arg)),
        };
        args.extend(target);
        args.extend(
            f.text
                .as_ref()
                .and_then(json_arg)
                .or_else(|| f.value.as_ref().and_then(json_arg)),
        );
        args.extend(f.direction.as_ref().and_then(json_arg));
        args.extend(f.option.as_ref().and_then(json_arg));

        if args.is_empty() {
            return None;
        }
        Some(ActionCall::new(self.name, args))
    }
}

/// Find `[COMMAND: name]` followed by a JSON object. A malformed object
/// yields None.
pub fn parse_command(text: &str) -> Option<CommandCall> {
    let caps = COMMAND_RE.captures(text)?;
    let brace = caps.get(0)?.end() - 1;

    let mut stream = serde_json::Deserializer::from_str(&text[brace..]).into_iter::<Value>();
    let object = match stream.next()? {
        Ok(v @ Value::Object(_)) => v,
        _ => return None,
    };
    let fields: CommandFields = serde_json::from_value(object).ok()?;

    Some(CommandCall {
        name: caps[1].to_lowercase(),
        fields,
    })
}

fn json_arg(value: &Value) -> Option<ActionArg> {
    match value {
        Value::Null => None,
        Value::Number(n) => n
            .as_i64()
            .map(ActionArg::Int)
            .or_else(|| Some(ActionArg::Text(n.to_string()))),
        Value::String(s) => Some(ActionArg::Text(s.clone())),
        other => Some(ActionArg::Text(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_args_keeps_commas_inside_quotes() {
        assert_eq!(
            split_args(r#"2, "hello, world", 3"#),
            vec!["2", "\"hello, world\"", "3"]
        );
        assert!(split_args("  ").is_empty());
    }

    #[test]
    fn parse_arg_kinds() {
        assert_eq!(parse_arg("42"), ActionArg::Int(42));
        assert_eq!(parse_arg("-7"), ActionArg::Int(-7));
        assert_eq!(parse_arg("\"42\""), ActionArg::Text("42".into()));
        assert_eq!(parse_arg("4x"), ActionArg::Text("4x".into()));
        assert_eq!(parse_arg("\"\"\"\""), ActionArg::Text("\"\"".into()));
    }

    #[test]
    fn json_arg_skips_null() {
        assert_eq!(json_arg(&Value::Null), None);
        assert_eq!(json_arg(&serde_json::json!(5)), Some(ActionArg::Int(5)));
    }
}
