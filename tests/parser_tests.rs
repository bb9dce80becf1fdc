use browser_agent::agent::{
    action::{ActionArg, ActionCall, AgentAction, ScrollDirection},
    error::ValidationError,
    parser::{Directive, is_completion, parse_command, parse_directive, parse_inline_call},
};

fn action(text: &str) -> ActionCall {
    match parse_directive(text) {
        Directive::Action(call) => call,
        other => panic!("expected an action for {:?}, got {:?}", text, other),
    }
}

// =========================================================================
// Completion
// =========================================================================

#[test]
fn done_prefix_is_completion() {
    assert_eq!(parse_directive("DONE: Hi there"), Directive::Completion);
    assert_eq!(parse_directive("   DONE: padded"), Directive::Completion);
}

#[test]
fn task_complete_phrase_is_completion_anywhere() {
    assert!(is_completion("Looks good, the Task Complete banner is shown"));
    assert!(is_completion("TASK COMPLETE"));
    assert!(!is_completion("done: lowercase prefix does not count"));
}

#[test]
fn completion_wins_over_action() {
    let replies = [
        "DONE: finished\nACTION: click(3)",
        "ACTION: click(3) and the task complete message appeared",
        "DONE: ok [COMMAND: click] {\"index\": 1}",
    ];
    for reply in replies {
        assert_eq!(
            parse_directive(reply),
            Directive::Completion,
            "completion must win for {:?}",
            reply
        );
    }
}

// =========================================================================
// Inline calls
// =========================================================================

#[test]
fn click_with_integer_index() {
    let call = action("ACTION: click(3)");
    assert_eq!(call.name, "click");
    assert_eq!(call.args, vec![ActionArg::Int(3)]);
    assert_eq!(call.to_string(), "click(3)");
}

#[test]
fn type_strips_quotes_exactly_once() {
    let call = action(r#"ACTION: type(2, "hello world")"#);
    assert_eq!(
        call.args,
        vec![ActionArg::Int(2), ActionArg::Text("hello world".into())]
    );
    assert_eq!(
        call.to_action(),
        Ok(AgentAction::Type {
            index: 2,
            text: "hello world".into()
        })
    );
}

#[test]
fn quoted_commas_stay_in_one_argument() {
    let call = action(r#"I will type now. ACTION: type(5, "milk, eggs, bread")"#);
    assert_eq!(
        call.args,
        vec![ActionArg::Int(5), ActionArg::Text("milk, eggs, bread".into())]
    );
}

#[test]
fn keyword_and_name_are_case_insensitive() {
    let call = action("action: CLICK(7)");
    assert_eq!(call.name, "click");
    assert_eq!(call.args, vec![ActionArg::Int(7)]);
}

#[test]
fn unquoted_text_and_quoted_numbers() {
    let call = action("ACTION: scroll(down)");
    assert_eq!(call.args, vec![ActionArg::Text("down".into())]);

    let call = action(r#"ACTION: select(3, "2")"#);
    assert_eq!(
        call.args,
        vec![ActionArg::Int(3), ActionArg::Text("2".into())]
    );
}

#[test]
fn empty_argument_list() {
    let call = action("ACTION: click()");
    assert!(call.args.is_empty());
    assert_eq!(
        call.to_action(),
        Err(ValidationError::MissingParameter {
            action: "click",
            expected: "an index parameter"
        })
    );
}

#[test]
fn missing_closing_paren_is_not_an_action() {
    assert_eq!(parse_inline_call("ACTION: click(3"), None);
    assert_eq!(parse_directive("ACTION: click(3"), Directive::Unparseable);
}

// =========================================================================
// Validation
// =========================================================================

#[test]
fn arity_errors_name_the_expected_parameters() {
    let cases = [
        ("ACTION: click()", "click requires an index parameter"),
        ("ACTION: type(1)", "type requires index and text parameters"),
        ("ACTION: scroll()", "scroll requires a direction parameter"),
        ("ACTION: select(3)", "select requires index and option parameters"),
    ];
    for (reply, expected) in cases {
        let err = action(reply).to_action().unwrap_err();
        assert_eq!(err.to_string(), expected, "for {:?}", reply);
    }
}

#[test]
fn invalid_scroll_direction_names_the_value() {
    let err = action("ACTION: scroll(sideways)").to_action().unwrap_err();
    assert_eq!(err, ValidationError::InvalidDirection("sideways".into()));
    assert!(err.to_string().contains("sideways"));
}

#[test]
fn quoted_direction_is_accepted() {
    assert_eq!(
        action(r#"ACTION: scroll("Up")"#).to_action(),
        Ok(AgentAction::Scroll {
            direction: ScrollDirection::Up
        })
    );
}

#[test]
fn unknown_action_type() {
    let err = action("ACTION: hover(2)").to_action().unwrap_err();
    assert_eq!(err.to_string(), "Unknown action type: hover");
}

#[test]
fn non_numeric_index_is_rejected() {
    let err = action("ACTION: click(first)").to_action().unwrap_err();
    assert_eq!(
        err,
        ValidationError::InvalidIndex {
            action: "click",
            value: "first".into()
        }
    );
}

// =========================================================================
// Structured commands
// =========================================================================

#[test]
fn command_with_index_and_text() {
    let reply = r#"[COMMAND: type] {"index": 4, "text": "Buy milk"} trailing words"#;
    let Directive::Command(command) = parse_directive(reply) else {
        panic!("expected a command");
    };
    assert_eq!(command.name, "type");

    let call = command.into_call(None).unwrap();
    assert_eq!(call.to_string(), "type(4, Buy milk)");
}

#[test]
fn resolved_selector_takes_priority_over_fields() {
    let command =
        parse_command(r##"[COMMAND: click] {"selector": "#save", "element": 9, "index": 8}"##).unwrap();
    assert_eq!(command.clone().into_call(Some(2)).unwrap().args, vec![ActionArg::Int(2)]);
    assert_eq!(command.into_call(None).unwrap().args, vec![ActionArg::Int(9)]);
}

#[test]
fn command_argument_order() {
    let command = parse_command(
        r#"[COMMAND: select] {"option": "High", "value": "p1", "index": 3}"#,
    )
    .unwrap();
    assert_eq!(
        command.into_call(None).unwrap().to_string(),
        "select(3, p1, High)"
    );

    let command = parse_command(r#"[command: scroll] {"direction": "down"}"#).unwrap();
    assert_eq!(command.into_call(None).unwrap().to_string(), "scroll(down)");
}

#[test]
fn text_is_preferred_over_value() {
    let command =
        parse_command(r#"[COMMAND: type] {"index": 1, "text": "a", "value": "b"}"#).unwrap();
    assert_eq!(command.into_call(None).unwrap().to_string(), "type(1, a)");
}

#[test]
fn malformed_command_json_is_unparseable() {
    assert_eq!(
        parse_directive(r#"[COMMAND: click] {"index": 1,"#),
        Directive::Unparseable
    );
    assert_eq!(
        parse_directive(r#"[COMMAND: click] {"selector": 12}"#),
        Directive::Unparseable,
        "selector must be a string"
    );
}

#[test]
fn command_without_parameters_yields_no_call() {
    let command = parse_command(r#"[COMMAND: click] {}"#).unwrap();
    assert_eq!(command.into_call(None), None);
}

#[test]
fn inline_action_is_tried_before_command() {
    let call = action(r#"[COMMAND: click] {"index": 1} ACTION: click(2)"#);
    assert_eq!(call.args, vec![ActionArg::Int(2)]);
}

#[test]
fn plain_prose_is_unparseable() {
    assert_eq!(
        parse_directive("I am not sure what to do here."),
        Directive::Unparseable
    );
    assert_eq!(parse_directive(""), Directive::Unparseable);
}
