use browser_agent::{
    agent::{
        action::{AgentAction, ScrollDirection},
        executor::ActionExecutor,
    },
    browser::{
        memory::{MemoryPage, PageEvent, Reaction},
        page::Page,
    },
    screen::{detector::Detector, screen_model::ElementSnapshot},
};

use crate::common::utils::{handle, task_page};

mod common;

async fn detect(page: &MemoryPage) -> (Detector, ElementSnapshot) {
    let mut detector = Detector::new();
    let snapshot = detector.detect(page).await.unwrap();
    (detector, snapshot)
}

// =========================================================================
// click
// =========================================================================

#[tokio::test]
async fn click_resolves_index_and_clicks() {
    let page = task_page();
    let (detector, snapshot) = detect(&page).await;

    let outcome = ActionExecutor::default()
        .execute(&page, &detector, &snapshot, &AgentAction::Click { index: 1 })
        .await;

    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(outcome.message, "Clicked element [1] <button> \"Create task\"");
    assert_eq!(page.events(), vec![PageEvent::Clicked(handle("create"))]);
    assert!(!page.element("title").unwrap().hidden, "click reaction should run");
}

#[tokio::test]
async fn click_on_disabled_element_fails() {
    let page = task_page();
    let (detector, snapshot) = detect(&page).await;

    let outcome = ActionExecutor::default()
        .execute(&page, &detector, &snapshot, &AgentAction::Click { index: 4 })
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.message, "Element [4] <button> is disabled");
    assert!(page.events().is_empty());
}

#[tokio::test]
async fn out_of_range_index_fails() {
    let page = task_page();
    let (detector, snapshot) = detect(&page).await;

    let outcome = ActionExecutor::default()
        .execute(&page, &detector, &snapshot, &AgentAction::Click { index: 42 })
        .await;

    assert!(!outcome.success);
    assert_eq!(
        outcome.message,
        "Element index 42 out of range (5 elements available)"
    );
}

#[tokio::test]
async fn stale_snapshot_fails_without_touching_the_page() {
    let page = task_page();
    let mut detector = Detector::new();
    let old = detector.detect(&page).await.unwrap();
    detector.detect(&page).await.unwrap();

    let outcome = ActionExecutor::default()
        .execute(&page, &detector, &old, &AgentAction::Click { index: 1 })
        .await;

    assert!(!outcome.success);
    assert!(outcome.message.contains("stale"), "{}", outcome.message);
    assert!(page.events().is_empty());
}

#[tokio::test]
async fn detached_element_reports_page_error() {
    let page = task_page().on_click("nav-home", Reaction::Remove(vec![handle("create")]));
    let (detector, snapshot) = detect(&page).await;

    // The page changes between detection and execution
    page.click(&handle("nav-home")).await.unwrap();

    let outcome = ActionExecutor::default()
        .execute(&page, &detector, &snapshot, &AgentAction::Click { index: 1 })
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.message, "Page error: element create is detached");
}

// =========================================================================
// type
// =========================================================================

#[tokio::test]
async fn type_sets_value() {
    let page = task_page();
    let (detector, snapshot) = detect(&page).await;

    let outcome = ActionExecutor::default()
        .execute(
            &page,
            &detector,
            &snapshot,
            &AgentAction::Type {
                index: 2,
                text: "hello world".into(),
            },
        )
        .await;

    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(page.element("search").unwrap().value.as_deref(), Some("hello world"));
    assert_eq!(
        page.events(),
        vec![PageEvent::ValueSet {
            handle: handle("search"),
            value: "hello world".into()
        }]
    );
}

#[tokio::test]
async fn type_into_non_text_element_fails() {
    let page = task_page();
    let (detector, snapshot) = detect(&page).await;

    let outcome = ActionExecutor::default()
        .execute(
            &page,
            &detector,
            &snapshot,
            &AgentAction::Type {
                index: 1,
                text: "x".into(),
            },
        )
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.message, "Element [1] <button> is not text-editable");
}

// =========================================================================
// select
// =========================================================================

#[tokio::test]
async fn select_matches_option_case_insensitively() {
    let page = task_page();
    let (detector, snapshot) = detect(&page).await;

    let outcome = ActionExecutor::default()
        .execute(
            &page,
            &detector,
            &snapshot,
            &AgentAction::Select {
                index: 3,
                option: "medium".into(),
            },
        )
        .await;

    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(page.element("priority").unwrap().value.as_deref(), Some("Medium"));
}

#[tokio::test]
async fn select_unknown_option_lists_available() {
    let page = task_page();
    let (detector, snapshot) = detect(&page).await;

    let outcome = ActionExecutor::default()
        .execute(
            &page,
            &detector,
            &snapshot,
            &AgentAction::Select {
                index: 3,
                option: "Urgent".into(),
            },
        )
        .await;

    assert!(!outcome.success);
    assert_eq!(
        outcome.message,
        "Option \"Urgent\" not found in element [3] (available: All, High, Medium, Low)"
    );
    assert!(page.events().is_empty());
}

#[tokio::test]
async fn select_on_non_select_fails() {
    let page = task_page();
    let (detector, snapshot) = detect(&page).await;

    let outcome = ActionExecutor::default()
        .execute(
            &page,
            &detector,
            &snapshot,
            &AgentAction::Select {
                index: 2,
                option: "High".into(),
            },
        )
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.message, "Element [2] <input> is not a select control");
}

// =========================================================================
// scroll
// =========================================================================

#[tokio::test]
async fn scroll_moves_by_fixed_amount() {
    let page = task_page();
    let (detector, snapshot) = detect(&page).await;
    let executor = ActionExecutor::new(300);
    assert_eq!(executor.scroll_amount(), 300);
    assert_eq!(ActionExecutor::default().scroll_amount(), 500);

    let down = AgentAction::Scroll {
        direction: ScrollDirection::Down,
    };
    let up = AgentAction::Scroll {
        direction: ScrollDirection::Up,
    };

    assert!(executor.execute(&page, &detector, &snapshot, &down).await.success);
    assert!(executor.execute(&page, &detector, &snapshot, &down).await.success);
    let outcome = executor.execute(&page, &detector, &snapshot, &up).await;

    assert_eq!(outcome.message, "Scrolled up by 300px");
    assert_eq!(page.scroll_y(), 300);
    assert_eq!(
        page.events(),
        vec![
            PageEvent::Scrolled(300),
            PageEvent::Scrolled(300),
            PageEvent::Scrolled(-300)
        ]
    );
}
