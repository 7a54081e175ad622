use super::mock::{MockEngine, MockTree, NodeSpec, ROOT};
use crate::actions::{ScrollDirection, LONG_PRESS_DURATION};
use crate::{Automation, AutomationError, GestureHandle, GestureOutcome, GlobalAction, NodeAction};
use std::time::Duration;

fn bound(tree: &std::sync::Arc<MockTree>) -> (Automation, std::sync::Arc<MockEngine>) {
    let engine = MockEngine::with_tree(tree.clone());
    (Automation::with_engine(engine.clone()), engine)
}

#[test]
fn test_find_by_text_matches_text_and_description_in_tree_order() {
    let tree = MockTree::new("com.facebook.katana");
    let a = tree.add(ROOT, NodeSpec::label("Share post"));
    let b = tree.add(ROOT, NodeSpec::new("android.widget.ImageButton").description("Share"));
    tree.add(ROOT, NodeSpec::label("Comment"));
    let (automation, _) = bound(&tree);

    let found = automation.find_by_text("share").unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].text().as_deref(), Some("Share post"));
    assert_eq!(found[1].content_description().as_deref(), Some("Share"));
    assert!(tree.actions_on(a).is_empty() && tree.actions_on(b).is_empty());
}

#[test]
fn test_click_by_text_walks_up_to_clickable_ancestor() {
    let tree = MockTree::new("com.facebook.orca");
    let row = tree.add(ROOT, NodeSpec::layout().clickable());
    let inner = tree.add(row, NodeSpec::layout());
    let wrapper = tree.add(inner, NodeSpec::layout());
    let name = tree.add(wrapper, NodeSpec::label("Nguyen Van A"));
    let (automation, _) = bound(&tree);

    automation.click_by_text("Nguyen Van A").unwrap();

    assert_eq!(tree.actions_on(row), vec![NodeAction::Click]);
    assert!(tree.actions_on(name).is_empty());
    assert_eq!(tree.actions().len(), 1);
}

#[test]
fn test_click_by_text_stops_after_first_success() {
    let tree = MockTree::new("com.zing.zalo");
    let first = tree.add(ROOT, NodeSpec::button("Gửi"));
    let second = tree.add(ROOT, NodeSpec::button("Gửi lại"));
    let (automation, _) = bound(&tree);

    automation.click_by_text("Gửi").unwrap();

    assert_eq!(tree.actions_on(first), vec![NodeAction::Click]);
    assert!(tree.actions_on(second).is_empty());
}

#[test]
fn test_click_by_text_moves_on_when_click_rejected() {
    let tree = MockTree::new("com.zing.zalo");
    let broken = tree.add(ROOT, NodeSpec::button("Send").rejecting());
    let working = tree.add(ROOT, NodeSpec::button("Send"));
    let (automation, _) = bound(&tree);

    automation.click_by_text("Send").unwrap();

    assert!(tree.actions_on(broken).is_empty());
    assert_eq!(tree.actions_on(working), vec![NodeAction::Click]);
}

#[test]
fn test_click_by_text_fails_without_clickable_chain() {
    let tree = MockTree::new("com.zing.zalo");
    tree.add(ROOT, NodeSpec::label("Just text"));
    let (automation, _) = bound(&tree);

    match automation.click_by_text("Just text") {
        Err(AutomationError::ElementNotFound(_)) => {}
        other => panic!("Expected ElementNotFound, got {other:?}"),
    }
    assert!(automation.click_by_text("missing").is_err());
    assert!(tree.actions().is_empty());
}

#[test]
fn test_type_into_field_only_touches_matching_field() {
    let tree = MockTree::new("com.facebook.orca");
    let search = tree.add(ROOT, NodeSpec::field("Search"));
    let message = tree.add(ROOT, NodeSpec::field("Type a MESSAGE"));
    let (automation, _) = bound(&tree);

    automation.type_into_field("message", "Chào bạn").unwrap();

    assert!(tree.actions_on(search).is_empty());
    assert_eq!(tree.text_of(search), None);
    assert_eq!(
        tree.actions_on(message),
        vec![
            NodeAction::Focus,
            NodeAction::Click,
            NodeAction::SetText("Chào bạn".to_string())
        ]
    );
    assert_eq!(tree.text_of(message).as_deref(), Some("Chào bạn"));
}

#[test]
fn test_type_into_field_without_match_mutates_nothing() {
    let tree = MockTree::new("com.facebook.orca");
    let search = tree.add(ROOT, NodeSpec::field("Search"));
    let message = tree.add(ROOT, NodeSpec::field("Message"));
    let (automation, _) = bound(&tree);

    let result = automation.type_into_field("password", "secret");

    assert!(matches!(result, Err(AutomationError::ElementNotFound(_))));
    assert!(tree.actions().is_empty());
    assert_eq!(tree.text_of(search), None);
    assert_eq!(tree.text_of(message), None);
}

#[test]
fn test_type_into_field_does_not_fail_over() {
    let tree = MockTree::new("com.facebook.orca");
    let broken = tree.add(ROOT, NodeSpec::field("Message").rejecting());
    let other = tree.add(ROOT, NodeSpec::field("Message"));
    let (automation, _) = bound(&tree);

    assert!(automation.type_into_field("message", "hi").is_err());
    assert!(tree.actions_on(other).is_empty());
    assert_eq!(tree.text_of(broken), None);
}

#[test]
fn test_type_into_field_matches_current_text_and_description() {
    let tree = MockTree::new("com.zing.zalo");
    let field = tree.add(
        ROOT,
        NodeSpec::new("android.widget.EditText")
            .editable()
            .description("Ô nhập tin nhắn"),
    );
    let (automation, _) = bound(&tree);

    automation.type_into_field("TIN NHẮN", "xin chào").unwrap();
    assert_eq!(tree.text_of(field).as_deref(), Some("xin chào"));
}

#[test]
fn test_type_text_and_press_enter_use_focused_field() {
    let tree = MockTree::new("com.facebook.orca");
    tree.add(ROOT, NodeSpec::field("Search"));
    let focused = tree.add(ROOT, NodeSpec::field("Message").focused());
    let (automation, _) = bound(&tree);

    automation.type_text("hello").unwrap();
    automation.press_enter().unwrap();

    assert_eq!(
        tree.actions_on(focused),
        vec![NodeAction::SetText("hello".to_string()), NodeAction::ImeEnter]
    );
}

#[test]
fn test_press_enter_without_focus_fails() {
    let tree = MockTree::new("com.facebook.orca");
    tree.add(ROOT, NodeSpec::field("Message"));
    let (automation, _) = bound(&tree);

    assert!(automation.press_enter().is_err());
    assert!(automation.type_text("hello").is_err());
    assert!(tree.actions().is_empty());
}

#[test]
fn test_scroll_targets_first_scrollable() {
    let tree = MockTree::new("com.facebook.katana");
    let feed = tree.add(ROOT, NodeSpec::layout().scrollable());
    tree.add(feed, NodeSpec::layout().scrollable());
    let (automation, _) = bound(&tree);

    automation.scroll(ScrollDirection::Forward).unwrap();
    automation.scroll(ScrollDirection::Backward).unwrap();

    assert_eq!(
        tree.actions_on(feed),
        vec![NodeAction::ScrollForward, NodeAction::ScrollBackward]
    );
}

#[tokio::test]
async fn test_gestures_dispatch_and_complete() {
    let tree = MockTree::new("com.facebook.katana");
    let (automation, engine) = bound(&tree);

    let tap = automation
        .tap_at(540.0, 1200.0, Duration::from_millis(50))
        .unwrap();
    tap.wait().await.unwrap();

    // Dropping the handle is the "don't wait" policy.
    let _ = automation
        .swipe((540.0, 1600.0), (540.0, 400.0), Duration::from_millis(300))
        .unwrap();

    automation.long_press(10.0, 20.0).unwrap().wait().await.unwrap();

    let gestures = engine.gestures.lock().unwrap();
    assert_eq!(gestures.len(), 3);
    assert_eq!(gestures[2].total_duration(), LONG_PRESS_DURATION);
    assert_eq!(gestures[0].strokes[0].points, vec![(540.0, 1200.0)]);
    assert_eq!(gestures[1].total_duration(), Duration::from_millis(300));
}

#[test]
fn test_global_actions_map_one_to_one() {
    let tree = MockTree::new("com.zing.zalo");
    let (automation, engine) = bound(&tree);

    automation.back().unwrap();
    automation.home().unwrap();
    automation.recents().unwrap();
    automation.notifications().unwrap();

    assert_eq!(
        *engine.globals.lock().unwrap(),
        vec![
            GlobalAction::Back,
            GlobalAction::Home,
            GlobalAction::Recents,
            GlobalAction::Notifications
        ]
    );
}

#[test]
fn test_every_primitive_fails_when_unbound() {
    let automation = Automation::new();

    let results = [
        automation.find_by_text("x").map(|_| ()),
        automation.click_by_text("x"),
        automation.type_into_field("x", "y"),
        automation.type_text("y"),
        automation.press_enter(),
        automation.scroll(ScrollDirection::Forward),
        automation.tap_at(1.0, 1.0, Duration::ZERO).map(|_| ()),
        automation
            .swipe((0.0, 0.0), (1.0, 1.0), Duration::ZERO)
            .map(|_| ()),
        automation.back(),
        automation.open_app("com.zing.zalo"),
    ];
    for result in results {
        assert!(result.unwrap_err().is_unavailable());
    }
}

#[test]
fn test_walks_survive_deeply_nested_trees() {
    let tree = MockTree::new("com.facebook.orca");
    let mut parent = ROOT;
    for _ in 0..20_000 {
        parent = tree.add(parent, NodeSpec::layout());
    }
    let list = tree.add(parent, NodeSpec::layout().scrollable());
    let label = tree.add(list, NodeSpec::label("deep message"));
    let field = tree.add(list, NodeSpec::field("Message"));
    let (automation, _) = bound(&tree);

    let found = automation.find_by_text("deep message").unwrap();
    assert_eq!(found.len(), 1);
    assert!(automation.click_by_text("deep message").is_err());
    assert!(tree.actions_on(label).is_empty());

    automation.type_into_field("message", "hi").unwrap();
    assert_eq!(tree.text_of(field).as_deref(), Some("hi"));

    automation.scroll(ScrollDirection::Forward).unwrap();
    assert_eq!(tree.actions_on(list), vec![NodeAction::ScrollForward]);

    // Capture stays bounded by its depth cap
    assert_eq!(automation.capture().unwrap().element_count, 0);
}

#[tokio::test]
async fn test_gesture_cancelled_by_backend() {
    let (tx, handle) = GestureHandle::channel();
    tx.send(GestureOutcome::Cancelled).unwrap();

    assert!(matches!(
        handle.wait().await,
        Err(AutomationError::GestureCancelled(_))
    ));
}

#[tokio::test]
async fn test_gesture_without_completion_callback_counts_as_cancelled() {
    let (tx, handle) = GestureHandle::channel();
    drop(tx);

    assert!(matches!(
        handle.wait().await,
        Err(AutomationError::GestureCancelled(_))
    ));
}

#[tokio::test]
async fn test_gesture_completed_through_channel() {
    let (tx, handle) = GestureHandle::channel();
    let waiter = tokio::spawn(handle.wait());
    tx.send(GestureOutcome::Completed).unwrap();

    waiter.await.unwrap().unwrap();
}
