mod common;

use chat_tree::conversation::Provider;
use chat_tree::tree::{ROOT_ID, Role};
use chat_tree::navigator::LevelMatcher;
use chat_tree::{
    ActionContext, ActionRegistry, ChatTreeError, ContentPage, ConversationView, NavigationConfig, PageHandles,
};
use common::{FakeHost, Row, build_tree, chatgpt_payload, claude_payload, scenario_b, scenario_b_markdown};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

async fn claude_view(host: &Arc<FakeHost>, rows: &[Row<'_>], config: NavigationConfig) -> ConversationView {
    let pages = PageHandles::from_host(Arc::clone(host), host.clone());
    ConversationView::load(&claude_payload(rows), pages, config).await.expect("view loads")
}

fn claude_host(rows: &[Row<'_>]) -> FakeHost {
    FakeHost::new(build_tree(Provider::Claude, rows))
}

fn hidden_ids(view: &ConversationView) -> Vec<String> {
    view.tree().messages().filter(|n| n.hidden).map(|n| n.id.clone()).collect()
}

#[tokio::test(start_paused = true)]
async fn test_visibility_reflects_rendered_branch() {
    let rows = scenario_b();
    let host = Arc::new(claude_host(&rows));
    let view = claude_view(&host, &rows, NavigationConfig::default()).await;

    assert_eq!(host.path(), vec!["u", "a1"]);
    assert_eq!(hidden_ids(&view), vec!["a2", "f1", "f2", "f3"]);
    // the synthetic root is never matched against the page
    assert!(view.tree().get(ROOT_ID).is_some_and(|r| r.hidden));

    let texts = vec![rows[1].3.to_string(), rows[2].3.to_string()];
    assert_eq!(view.check_hidden(&texts).await.unwrap(), vec![false, true]);
}

#[tokio::test(start_paused = true)]
async fn test_go_to_switches_both_levels() {
    let rows = scenario_b();
    let host = Arc::new(claude_host(&rows));
    let mut view = claude_view(&host, &rows, NavigationConfig::default()).await;

    let outcome = view.go_to("f3").await.unwrap();

    assert!(outcome.visible);
    // one click at the first level, two at the second
    assert_eq!(outcome.clicks, 3);
    assert_eq!(host.click_count(), 3);
    assert_eq!(host.path(), vec!["u", "a2", "f3"]);
    assert!(!host.is_attached());
    assert_eq!(*host.attaches.lock().unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_tracks_hidden_flags_and_previously_visited() {
    let rows = scenario_b();
    let host = Arc::new(claude_host(&rows));
    let mut view = claude_view(&host, &rows, NavigationConfig::default()).await;

    view.go_to("f3").await.unwrap();
    assert_eq!(hidden_ids(&view), vec!["a1", "f1", "f2"]);
    // a1 dropped out but its parent stayed rendered
    assert!(view.tree().messages().all(|n| !n.previously_visited));

    let outcome = view.go_to("a1").await.unwrap();
    assert_eq!(outcome.clicks, 1);
    assert_eq!(hidden_ids(&view), vec!["a2", "f1", "f2", "f3"]);
    assert!(view.tree().get("f3").unwrap().previously_visited);
    assert!(!view.tree().get("a2").unwrap().previously_visited);

    assert_eq!(view.hints().get("u").as_deref(), Some("a1"));
    assert_eq!(view.hints().get("a2").as_deref(), Some("f3"));
}

#[tokio::test(start_paused = true)]
async fn test_target_already_rendered_needs_no_clicks() {
    let rows = scenario_b();
    let host = Arc::new(claude_host(&rows));
    let mut view = claude_view(&host, &rows, NavigationConfig::default()).await;

    let outcome = view.go_to("a1").await.unwrap();
    assert_eq!(outcome.clicks, 0);
    assert!(outcome.visible);
    assert_eq!(host.click_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_queued_navigations_never_overlap() {
    let rows = scenario_b();
    let host = Arc::new(claude_host(&rows));
    let view = claude_view(&host, &rows, NavigationConfig::default()).await;

    let to_f3 = view.plan("f3");
    let to_f1 = view.plan("f1");
    let (first, second) = tokio::join!(view.execute_plan(&to_f3), view.execute_plan(&to_f1));

    assert_eq!(first.unwrap().clicks, 3);
    assert_eq!(second.unwrap().clicks, 2);
    // a second attach while the first run held the channel would be counted
    assert_eq!(*host.contentions.lock().unwrap(), 0);
    assert_eq!(*host.attaches.lock().unwrap(), 2);
    assert_eq!(host.path(), vec!["u", "a2", "f1"]);
    assert_eq!(view.queue().pending(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_views_sharing_handles_take_turns() {
    let rows = scenario_b();
    let host = Arc::new(claude_host(&rows));
    let pages = PageHandles::from_host(Arc::clone(&host), host.clone());
    let conversation = claude_payload(&rows);
    let mut first = ConversationView::load(&conversation, pages.clone(), NavigationConfig::default()).await.unwrap();
    let mut second = ConversationView::load(&conversation, pages, NavigationConfig::default()).await.unwrap();

    let (a, b) = tokio::join!(first.go_to("f3"), second.go_to("f1"));

    assert_eq!(a.unwrap().clicks, 3);
    assert_eq!(b.unwrap().clicks, 2);
    assert_eq!(host.click_count(), 5);
    // the second run waited in the shared queue, not on the channel
    assert_eq!(*host.contentions.lock().unwrap(), 0);
    assert_eq!(*host.attaches.lock().unwrap(), 2);
    assert_eq!(host.path(), vec!["u", "a2", "f1"]);
    assert_eq!(first.queue().pending(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_views_with_separate_queues_wait_for_the_channel() {
    let rows = scenario_b();
    let host = Arc::new(claude_host(&rows));
    let conversation = claude_payload(&rows);
    let config = NavigationConfig::default().attach_retry(50, Duration::from_millis(200));
    let mut first = ConversationView::load(
        &conversation,
        PageHandles::from_host(Arc::clone(&host), host.clone()),
        config.clone(),
    )
    .await
    .unwrap();
    let mut second = ConversationView::load(
        &conversation,
        PageHandles::from_host(Arc::clone(&host), host.clone()),
        config,
    )
    .await
    .unwrap();

    let (a, b) = tokio::join!(first.go_to("f3"), second.go_to("f1"));

    // the holder is never released from under its run
    assert_eq!(a.unwrap().clicks, 3);
    assert_eq!(b.unwrap().clicks, 2);
    assert!(*host.contentions.lock().unwrap() > 0);
    assert_eq!(*host.attaches.lock().unwrap(), 2);
    assert_eq!(host.path(), vec!["u", "a2", "f1"]);
    assert!(!host.is_attached());
}

#[tokio::test(start_paused = true)]
async fn test_markdown_target_becomes_visible() {
    let rows = scenario_b_markdown();
    let host = Arc::new(claude_host(&rows).renders_markdown());
    let mut view = claude_view(&host, &rows, NavigationConfig::default()).await;
    assert_eq!(hidden_ids(&view), vec!["a2", "f1", "f2", "f3"]);

    let plan = view.plan("a2");
    let report = view.execute_plan(&plan).await.unwrap();
    assert_eq!(report.clicks, 1);
    // recognised right after the click, not after scrolling about
    assert_eq!(report.iterations, 1);
    assert_eq!(host.path(), vec!["u", "a2", "f1"]);

    view.refresh_visibility().await.unwrap();
    assert!(view.tree().get("a2").is_some_and(|n| n.is_visible()));
}

#[tokio::test(start_paused = true)]
async fn test_markdown_anchors_select_the_right_control() {
    let rows = scenario_b_markdown();
    let host = Arc::new(claude_host(&rows).renders_markdown());
    let mut view = claude_view(&host, &rows, NavigationConfig::default()).await;
    let config = NavigationConfig::default();

    host.select("u", 1);
    let plan = view.plan("f3");
    let indicators = host.branch_indicators().await.unwrap();
    assert_eq!(indicators.len(), 2);

    let best = LevelMatcher::new(&plan.decisions[1], &config).select(&indicators).unwrap();
    assert_eq!(best.indicator.wrapper_text, "Can you give an example in Rust?");
    // anchor head and middle, one sibling, matching total
    assert_eq!(best.score, 5 + 3 + 1 + 2);
    host.select("u", 0);

    let outcome = view.go_to("f3").await.unwrap();
    assert_eq!(outcome.clicks, 3);
    assert!(outcome.visible);
    assert_eq!(host.path(), vec!["u", "a2", "f3"]);
}

#[tokio::test(start_paused = true)]
async fn test_satisfied_levels_end_the_run() {
    let rows = scenario_b();
    let host = Arc::new(claude_host(&rows));
    let view = claude_view(&host, &rows, NavigationConfig::default()).await;

    // the host shows the target in a form no excerpt matches
    let mut plan = view.plan("f3");
    plan.target_fingerprints = vec!["Rendered as an attachment card instead".to_string()];

    let report = view.execute_plan(&plan).await.unwrap();
    assert_eq!(report.clicks, 3);
    assert!(report.iterations < 10, "{:?}", report);
    assert_eq!(host.path(), vec!["u", "a2", "f3"]);
    assert!(!host.is_attached());
}

#[tokio::test(start_paused = true)]
async fn test_scrolls_to_reach_virtualized_controls() {
    let mut rows: Vec<Row<'static>> = vec![
        ("m0", None, Role::User, "Start with the basics of ownership"),
        ("m1", Some("m0"), Role::Assistant, "Every value has exactly one owner."),
        ("m2", Some("m1"), Role::User, "What happens on assignment?"),
        ("m3", Some("m2"), Role::Assistant, "The value moves unless its type is Copy."),
        ("m4", Some("m3"), Role::User, "And for function arguments?"),
        ("m5", Some("m4"), Role::Assistant, "Same rule, passing is a move."),
        ("m6", Some("m5"), Role::User, "How do I keep using it afterwards?"),
        ("m7", Some("m6"), Role::Assistant, "Pass a reference instead."),
        ("m8", Some("m7"), Role::User, "Show me lifetimes next"),
    ];
    rows.push(("b1", Some("m8"), Role::Assistant, "Lifetimes name how long a reference is valid."));
    rows.push(("b2", Some("m8"), Role::Assistant, "A lifetime is a region of code where a borrow lives."));
    rows.push(("c", Some("b2"), Role::User, "Why does the compiler need elision rules?"));

    let host = Arc::new(claude_host(&rows).virtualized(200.0));
    let mut view = claude_view(&host, &rows, NavigationConfig::default()).await;

    // only the first few blocks render at the top of the page
    assert!(view.tree().get("m8").unwrap().hidden);
    assert!(view.tree().get("m0").unwrap().is_visible());

    let outcome = view.go_to("c").await.unwrap();
    assert_eq!(outcome.clicks, 1);
    assert!(outcome.visible);
    assert!(host.scroll_top() > 2000.0);
    assert_eq!(host.path().last().map(String::as_str), Some("c"));
}

#[tokio::test(start_paused = true)]
async fn test_hover_reveals_branch_buttons() {
    let rows = scenario_b();
    let host = Arc::new(claude_host(&rows).buttons_on_hover());
    let mut view = claude_view(&host, &rows, NavigationConfig::default()).await;

    let outcome = view.go_to("f2").await.unwrap();
    assert_eq!(outcome.clicks, 2);
    assert_eq!(host.path(), vec!["u", "a2", "f2"]);
}

#[tokio::test(start_paused = true)]
async fn test_exhaustion_reports_pending_levels() {
    let rows = scenario_b();
    let host = Arc::new(claude_host(&rows));
    let view = claude_view(&host, &rows, NavigationConfig::default().max_iterations(15)).await;

    // a sibling count no control on the page shows
    let mut plan = view.plan("f3");
    plan.decisions[0].sibling_count = 4;

    let err = view.execute_plan(&plan).await.unwrap_err();
    match err {
        ChatTreeError::NavigationExhausted { iterations, pending, available_totals } => {
            assert_eq!(iterations, 15);
            assert_eq!(available_totals, vec![2]);
            assert!(pending.starts_with("Pending levels: ["), "{}", pending);
            assert!(pending.contains(r#""siblingCount":4"#), "{}", pending);
        }
        other => panic!("expected exhaustion, got {:?}", other),
    }
    assert_eq!(host.click_count(), 0);
    assert!(!host.is_attached());
}

#[tokio::test(start_paused = true)]
async fn test_attach_retries_on_contention() {
    let rows = scenario_b();
    let host = Arc::new(claude_host(&rows).busy_for(2));
    let mut view = claude_view(&host, &rows, NavigationConfig::default()).await;

    let outcome = view.go_to("f3").await.unwrap();
    assert!(outcome.visible);
    assert_eq!(*host.contentions.lock().unwrap(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_persistent_contention_fails_without_clicking() {
    let rows = scenario_b();
    let host = Arc::new(claude_host(&rows).busy_for(3));
    let mut view = claude_view(&host, &rows, NavigationConfig::default()).await;

    let err = view.go_to("f3").await.unwrap_err();
    assert!(matches!(err, ChatTreeError::ChannelContention(_)), "{:?}", err);
    assert_eq!(host.click_count(), 0);
    assert!(!host.is_attached());

    // the queue is free again for the next action
    let outcome = view.go_to("f3").await.unwrap();
    assert!(outcome.visible);
}

#[tokio::test(start_paused = true)]
async fn test_id_host_navigation() {
    let rows = scenario_b();
    let host = Arc::new(FakeHost::new(build_tree(Provider::ChatGpt, &rows)).opens_newest());
    let pages = PageHandles::from_host(Arc::clone(&host), host.clone());
    let mut view = ConversationView::load(&chatgpt_payload(&rows), pages, NavigationConfig::default()).await.unwrap();

    assert!(*host.primes.lock().unwrap() >= 1);
    assert_eq!(hidden_ids(&view), vec!["a1", "f1", "f2"]);

    let outcome = view.go_to("a1").await.unwrap();
    assert_eq!(outcome.clicks, 1);
    assert!(outcome.visible);
    assert_eq!(host.path(), vec!["u", "a1"]);

    // a2's children are not rendered, so the newest one is assumed
    let steps = view.steps("f1");
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[1].node_id, "f3");

    let outcome = view.go_to("f1").await.unwrap();
    assert_eq!(outcome.clicks, 3);
    assert_eq!(host.path(), vec!["u", "a2", "f1"]);
    // id hosts never take the trusted-input channel
    assert_eq!(*host.attaches.lock().unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_reveal_rendered_and_hidden_nodes() {
    let rows = scenario_b();
    let host = Arc::new(claude_host(&rows));
    let view = claude_view(&host, &rows, NavigationConfig::default()).await;

    assert!(view.reveal("a1").await.unwrap());
    assert!(!view.reveal("a2").await.unwrap());
    assert!(matches!(view.reveal("nope").await, Err(ChatTreeError::MalformedInput(_))));
}

#[tokio::test(start_paused = true)]
async fn test_registry_actions_against_host() {
    let rows = scenario_b();
    let host = Arc::new(claude_host(&rows));
    let mut view = claude_view(&host, &rows, NavigationConfig::default()).await;
    let registry = ActionRegistry::with_defaults();
    let mut context = ActionContext::new(&mut view);

    let result = registry.execute("go_to_node", json!({ "node_id": "f2" }), &mut context).await;
    assert!(result.success, "{:?}", result.error);
    let data = result.data.unwrap();
    assert_eq!(data["clicks"], 2);
    assert_eq!(data["visible"], true);
    assert_eq!(data["revealed"], true);

    let result = registry.execute("edit_message", json!({ "node_id": "f2", "text": "Is Option a monad?" }), &mut context).await;
    assert!(result.success, "{:?}", result.error);
    assert_eq!(*host.submitted.lock().unwrap(), vec![("f2".to_string(), "Is Option a monad?".to_string())]);

    // f1 is not rendered; the reply goes through the first rendered child
    let result =
        registry.execute("respond_to_message", json!({ "node_id": "a2", "text": "Another angle" }), &mut context).await;
    assert!(result.success, "{:?}", result.error);
    assert_eq!(host.submitted.lock().unwrap().last().map(|(id, _)| id.as_str()), Some("f2"));

    let result = registry.execute("edit_message", json!({ "node_id": "a1", "text": "hidden" }), &mut context).await;
    assert!(!result.success);
    assert!(result.error.unwrap().contains("Message not found"));

    let result = registry.execute("go_to_node", json!({ "node_id": "missing" }), &mut context).await;
    assert!(!result.success);
}
