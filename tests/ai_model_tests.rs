use std::{sync::Arc, time::Duration};

use browser_agent::agent::{
    agent::TaskCallbacks,
    agent_model::{ConversationTurn, RunOutcome},
    ai_model::{ChatEndpoint, ChatRequest, ReasoningService},
    error::AgentError,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::utils::{agent_for, task_page};

mod common;

fn request(message: &str) -> ChatRequest {
    ChatRequest {
        message: message.into(),
        history: vec![
            ConversationTurn::user("Task: earlier"),
            ConversationTurn::assistant("ACTION: click(1)"),
        ],
    }
}

async fn endpoint_replying(template: ResponseTemplate) -> (MockServer, ChatEndpoint) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(template)
        .mount(&server)
        .await;
    let endpoint = ChatEndpoint::new(&format!("{}/api/chat", server.uri()));
    (server, endpoint)
}

// =========================================================================
// Wire format
// =========================================================================

#[tokio::test]
async fn posts_message_and_history() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_json(json!({
            "message": "Current URL: x",
            "history": [
                {"role": "user", "content": "Task: earlier"},
                {"role": "assistant", "content": "ACTION: click(1)"}
            ]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"message": "DONE: ok", "success": true})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let endpoint = ChatEndpoint::new(&format!("{}/api/chat", server.uri()));
    let reply = endpoint.complete(request("Current URL: x")).await.unwrap();

    assert_eq!(reply, "DONE: ok");
}

#[tokio::test]
async fn sends_bearer_token_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("authorization", "Bearer secret-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "DONE: authed"})))
        .expect(1)
        .mount(&server)
        .await;

    let endpoint = ChatEndpoint::new(&server.uri()).with_api_key("secret-key");
    assert_eq!(endpoint.complete(request("hi")).await.unwrap(), "DONE: authed");
}

// =========================================================================
// Failures
// =========================================================================

#[tokio::test]
async fn success_false_is_a_service_error() {
    let (_server, endpoint) = endpoint_replying(
        ResponseTemplate::new(200).set_body_json(json!({"success": false, "error": "model overloaded"})),
    )
    .await;

    let err = endpoint.complete(request("hi")).await.unwrap_err();
    assert!(matches!(err, AgentError::Service(ref m) if m == "model overloaded"), "{:?}", err);
}

#[tokio::test]
async fn error_without_message_is_a_service_error() {
    let (_server, endpoint) =
        endpoint_replying(ResponseTemplate::new(200).set_body_json(json!({"error": "bad prompt"}))).await;

    let err = endpoint.complete(request("hi")).await.unwrap_err();
    assert_eq!(err.to_string(), "bad prompt");
}

#[tokio::test]
async fn non_2xx_status_carries_error_text() {
    let (_server, endpoint) = endpoint_replying(
        ResponseTemplate::new(503).set_body_json(json!({"error": "upstream unavailable"})),
    )
    .await;

    let err = endpoint.complete(request("hi")).await.unwrap_err();
    match err {
        AgentError::ServiceStatus { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "upstream unavailable");
        }
        other => panic!("expected ServiceStatus, got {:?}", other),
    }
}

#[tokio::test]
async fn non_json_body_is_a_parse_error() {
    let (_server, endpoint) =
        endpoint_replying(ResponseTemplate::new(200).set_body_string("<html>oops</html>")).await;

    let err = endpoint.complete(request("hi")).await.unwrap_err();
    assert!(matches!(err, AgentError::JsonParse { .. }), "{:?}", err);
}

#[tokio::test]
async fn timeout_is_a_transport_error() {
    let (_server, endpoint) = endpoint_replying(
        ResponseTemplate::new(200)
            .set_body_json(json!({"message": "DONE: late"}))
            .set_delay(Duration::from_secs(5)),
    )
    .await;
    let endpoint = endpoint.with_timeout(Duration::from_millis(100));

    let err = endpoint.complete(request("hi")).await.unwrap_err();
    assert!(matches!(err, AgentError::Transport(_)), "{:?}", err);
}

// =========================================================================
// Through the controller
// =========================================================================

#[tokio::test]
async fn agent_runs_against_http_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "DONE: Hi there", "success": true})))
        .mount(&server)
        .await;

    let page = Arc::new(task_page());
    let mut agent = agent_for(&page, Arc::new(ChatEndpoint::new(&server.uri())));

    let result = agent.execute_task("Hello", TaskCallbacks::new()).await;

    assert!(result.success);
    assert_eq!(result.message, "DONE: Hi there");

    let received = server.received_requests().await.unwrap();
    let body: ChatRequest = serde_json::from_slice(&received[0].body).unwrap();
    assert!(body.message.starts_with("Task: Hello"));
    assert!(body.history.is_empty());
}

#[tokio::test]
async fn http_failure_ends_run_with_error() {
    let (_server, endpoint) =
        endpoint_replying(ResponseTemplate::new(500).set_body_string("Internal Server Error")).await;

    let page = Arc::new(task_page());
    let mut agent = agent_for(&page, Arc::new(endpoint));

    let result = agent.execute_task("Hello", TaskCallbacks::new()).await;

    assert!(!result.success);
    assert_eq!(result.outcome, RunOutcome::Error);
    assert_eq!(
        result.message,
        "Error: Reasoning service returned HTTP 500: Internal Server Error"
    );
}
