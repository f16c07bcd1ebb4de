mod common;

use common::*;
use navstack::nav::headless::ViewOp;
use navstack::nav::{FnFactory, ScreenLifecycle};
use navstack::{CachePolicy, NavConfig, NavError, Page, Params, RevisitMode, ScreenKind, Topic, Transition};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn nav_error(err: &anyhow::Error) -> &NavError {
    err.downcast_ref::<NavError>().expect("expected a NavError")
}

#[tokio::test]
async fn test_forward_then_back_restores_state() {
    let (_headless, nav) = instant();

    let home = nav.go(HOME, (), Transition::None, false).await.unwrap();
    let before = nav.snapshot();

    nav.forward(DETAIL, Params::new().with("id", &1), Transition::SlideForward).await.unwrap();
    nav.forward(SETTINGS, (), Transition::SlideUp).await.unwrap();
    nav.forward(DETAIL, Params::new().with("id", &2), Transition::Fade).await.unwrap();
    assert_eq!(nav.snapshot().back_stack, vec![HOME, DETAIL, SETTINGS]);

    nav.back().await.unwrap();
    assert_eq!(nav.current_page().unwrap().kind(), SETTINGS);

    // Detail was disposable: it comes back as a new instance with its old params
    let detail = nav.back().await.unwrap();
    assert_eq!(detail.kind(), DETAIL);
    assert_eq!(detail.params().param::<i32>("id").unwrap(), Some(1));

    let back_home = nav.back().await.unwrap();
    assert!(Arc::ptr_eq(&home, &back_home));

    let after = nav.snapshot();
    assert_eq!(after.page, before.page);
    assert_eq!(after.back_stack, before.back_stack);
    assert!(!nav.can_go_back());
}

#[tokio::test]
async fn test_forward_to_shown_page_keeps_history() {
    let (_headless, nav) = instant();

    nav.go(HOME, (), Transition::None, false).await.unwrap();
    let settings = nav.forward(SETTINGS, (), Transition::SlideForward).await.unwrap();
    let before = nav.snapshot();

    let again = nav.forward(SETTINGS, Params::new().with("tab", "sound"), Transition::Fade).await.unwrap();
    assert!(Arc::ptr_eq(&settings, &again));
    assert_eq!(nav.snapshot().back_stack, vec![HOME, SETTINGS]);

    let restored = nav.back().await.unwrap();
    assert!(Arc::ptr_eq(&settings, &restored));
    assert_eq!(restored.params().param::<String>("tab").unwrap(), None);
    assert_eq!(nav.snapshot(), before);

    nav.back().await.unwrap();
    assert_eq!(nav.current_page().unwrap().kind(), HOME);
    assert!(!nav.can_go_back());
}

#[tokio::test]
async fn test_back_plays_reverse_transition() {
    let (headless, nav) = instant();

    nav.go(HOME, (), Transition::None, false).await.unwrap();
    nav.forward(DETAIL, (), Transition::SlideForward).await.unwrap();
    let forward_steps = headless.animator.steps();

    nav.back().await.unwrap();
    let back_steps = &headless.animator.steps()[forward_steps.len()..];

    let expected = Transition::SlideBack.plan(&NavConfig::instant().transitions);
    assert_eq!(back_steps.len(), 2);
    assert_eq!(back_steps[0], (HOME, expected.enter.unwrap()));
    assert_eq!(back_steps[1], (DETAIL, expected.exit.unwrap()));
}

#[tokio::test]
async fn test_back_on_empty_history_fails_without_side_effects() {
    let (_headless, nav) = instant();

    nav.go(HOME, (), Transition::None, false).await.unwrap();
    let before = nav.snapshot();

    let err = nav.back().await.unwrap_err();
    assert!(nav_error(&err).is_invalid_operation());
    assert_eq!(nav.snapshot(), before);
}

#[tokio::test]
async fn test_revisit_modes() {
    let (_headless, nav) = instant();
    let events = record(&nav, &[Topic::Revisited]);

    nav.go(HOME, Params::new().with("a", &1), Transition::None, false).await.unwrap();
    nav.forward(DETAIL, (), Transition::None).await.unwrap();
    nav.go(HOME, Params::new().with("a", &1), Transition::None, false).await.unwrap();
    nav.forward(DETAIL, (), Transition::None).await.unwrap();
    nav.go(HOME, Params::new().with("a", &2), Transition::None, false).await.unwrap();

    assert_eq!(
        *events.lock(),
        vec![
            format!("revisited home {:?}", RevisitMode::SameParams),
            format!("revisited home {:?}", RevisitMode::NewParams),
        ]
    );
}

#[tokio::test]
async fn test_event_order_for_animated_page_swap() {
    let (_headless, nav) = instant();
    nav.go(HOME, (), Transition::None, false).await.unwrap();

    let events = record(&nav, &[Topic::Navigating, Topic::AnimationStarted, Topic::Navigated]);
    nav.forward(DETAIL, (), Transition::SlideForward).await.unwrap();
    nav.go(SETTINGS, (), Transition::None, false).await.unwrap();

    assert_eq!(
        *events.lock(),
        vec![
            "navigating home->detail",
            "animating home->detail",
            "navigated home->detail",
            // No animation plays for Transition::None
            "navigating detail->settings",
            "navigated detail->settings",
        ]
    );
}

#[tokio::test]
async fn test_superseded_page_disposed_after_delay() {
    let config = NavConfig::builder()
        .disposal_delay(Duration::from_millis(30))
        .transitions(navstack::nav::TransitionDurations::instant())
        .build();
    let (headless, nav) = setup(config);

    let home = nav.go(HOME, (), Transition::None, false).await.unwrap();
    let detail = nav.forward(DETAIL, (), Transition::None).await.unwrap();
    nav.back().await.unwrap();

    // Still alive while its exit could be running
    assert!(detail.is_alive());

    wait_until(|| headless.view_tree.was_disposed(detail.id())).await;
    assert_eq!(detail.lifecycle(), ScreenLifecycle::Disposed);
    assert!(home.is_alive());
    assert!(!headless.view_tree.was_disposed(home.id()));
}

struct CountingPage {
    destroyed: Arc<AtomicUsize>,
}

impl Page for CountingPage {
    fn create(_params: &Params) -> anyhow::Result<Self> {
        Ok(CountingPage {
            destroyed: Arc::default(),
        })
    }

    fn kind() -> ScreenKind {
        SETTINGS
    }

    fn on_destroy(&self) -> anyhow::Result<()> {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_replaced_current_page_disposed_once() {
    let config = NavConfig::builder()
        .disposal_delay(Duration::from_millis(30))
        .transitions(navstack::nav::TransitionDurations::instant())
        .build();
    let (headless, nav) = setup(config);
    let destroyed = Arc::new(AtomicUsize::new(0));
    let counter = destroyed.clone();
    nav.register(
        SETTINGS,
        FnFactory::new(CachePolicy::Keep, move |_: &Params| {
            Ok(Box::new(CountingPage {
                destroyed: counter.clone(),
            }) as Box<dyn Page>)
        }),
    );

    let first = nav.go(SETTINGS, (), Transition::None, false).await.unwrap();
    // The reloaded instance takes the cache slot while the first awaits disposal
    let second = nav.reload().await.unwrap();
    nav.go(&first, (), Transition::None, false).await.unwrap();
    assert!(Arc::ptr_eq(&nav.get_from_cache(SETTINGS).unwrap(), &first));

    wait_until(|| headless.view_tree.was_disposed(second.id())).await;
    tokio::time::sleep(Duration::from_millis(90)).await;

    assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    let disposals = headless
        .view_tree
        .records()
        .iter()
        .filter(|record| record.op == ViewOp::Dispose && record.id == second.id())
        .count();
    assert_eq!(disposals, 1);
    assert!(first.is_alive());
}

#[tokio::test]
async fn test_disposal_skipped_when_current_again() {
    let config = NavConfig::builder()
        .disposal_delay(Duration::from_millis(40))
        .transitions(navstack::nav::TransitionDurations::instant())
        .build();
    let (headless, nav) = setup(config);

    let detail = nav.go(DETAIL, (), Transition::None, false).await.unwrap();
    nav.go(HOME, (), Transition::None, false).await.unwrap();
    nav.go(&detail, (), Transition::None, false).await.unwrap();

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(detail.is_alive());
    assert!(!headless.view_tree.was_disposed(detail.id()));
    assert!(Arc::ptr_eq(&nav.current_page().unwrap(), &detail));
}

#[tokio::test]
async fn test_unknown_kind_leaves_history_untouched() {
    let (_headless, nav) = instant();
    nav.go(HOME, (), Transition::None, false).await.unwrap();
    let before = nav.snapshot();

    let nowhere = ScreenKind::new("nowhere");
    let err = nav.forward(nowhere, (), Transition::None).await.unwrap_err();
    assert!(matches!(nav_error(&err), NavError::UnknownScreen(kind) if *kind == nowhere));
    assert_eq!(nav.snapshot(), before);
}

#[tokio::test]
async fn test_clear_back_stack() {
    let (headless, nav) = instant();

    nav.go(HOME, (), Transition::None, false).await.unwrap();
    let detail = nav.forward(DETAIL, (), Transition::None).await.unwrap();
    nav.forward(SETTINGS, (), Transition::None).await.unwrap();

    nav.go(HOME, (), Transition::Fade, true).await.unwrap();
    assert!(nav.snapshot().back_stack.is_empty());
    assert!(!nav.can_go_back());

    wait_until(|| headless.view_tree.was_disposed(detail.id())).await;
    // Settings stays cached
    assert!(nav.get_from_cache(SETTINGS).is_some());
}

#[tokio::test]
async fn test_reload_replaces_current_page() {
    let (headless, nav) = instant();

    let first = nav.go(HOME, Params::new().with("tab", "inbox"), Transition::None, false).await.unwrap();
    let second = nav.reload().await.unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(second.params().param::<String>("tab").unwrap().as_deref(), Some("inbox"));
    assert!(Arc::ptr_eq(&nav.get_from_cache(HOME).unwrap(), &second));

    wait_until(|| headless.view_tree.was_disposed(first.id())).await;
}

#[tokio::test]
async fn test_warm_up_renders_cacheable_kind_only() {
    let (headless, nav) = instant();

    nav.warm_up(SETTINGS).await.unwrap();
    nav.warm_up(DETAIL).await.unwrap();

    assert_eq!(headless.view_tree.kinds(ViewOp::Render), vec![SETTINGS]);
    let warmed = nav.get_from_cache(SETTINGS).unwrap();
    assert!(nav.get_from_cache(DETAIL).is_none());

    let shown = nav.go(SETTINGS, (), Transition::None, false).await.unwrap();
    assert!(Arc::ptr_eq(&warmed, &shown));
}

#[tokio::test]
async fn test_dispose_cache_spares_current_page() {
    let (_headless, nav) = instant();

    let home = nav.go(HOME, (), Transition::None, false).await.unwrap();
    let settings = nav.forward(SETTINGS, (), Transition::None).await.unwrap();

    let evicted = nav.dispose_cache(None).await;
    assert_eq!(evicted, 1);
    assert_eq!(home.lifecycle(), ScreenLifecycle::Disposed);
    assert!(settings.is_alive());
    assert_eq!(nav.snapshot().cached_pages, vec![SETTINGS]);

    // Home is recreated on the way back
    let back_home = nav.back().await.unwrap();
    assert!(!Arc::ptr_eq(&home, &back_home));
}

#[tokio::test]
async fn test_listener_failure_is_alerted_not_propagated() {
    let config = NavConfig::builder()
        .diagnostics(false)
        .transitions(navstack::nav::TransitionDurations::instant())
        .build();
    let (headless, nav) = setup(config);
    nav.subscribe(Topic::Navigated, |_| anyhow::bail!("listener exploded"));

    nav.go(HOME, (), Transition::None, false).await.unwrap();

    assert_eq!(nav.current_page().unwrap().kind(), HOME);
    let alerts = headless.platform.alerts();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].contains("listener exploded"));
}

#[tokio::test]
async fn test_diagnostics_mode_only_logs_listener_failures() {
    let (headless, nav) = instant();
    nav.subscribe(Topic::Navigating, |_| anyhow::bail!("listener exploded"));

    nav.go(HOME, (), Transition::None, false).await.unwrap();
    assert!(headless.platform.alerts().is_empty());
}

#[tokio::test]
async fn test_cache_predicate_overrides_policy() {
    use navstack::nav::headless::HeadlessHost;
    use navstack::nav::Screen;

    let headless = HeadlessHost::new();
    let host = headless
        .host()
        .with_cache_predicate(Arc::new(|screen: &Screen| screen.kind() != HOME));
    let nav = navstack::Navigator::new(NavConfig::instant(), host);
    nav.register_blank(HOME, CachePolicy::Keep);
    nav.register_blank(SETTINGS, CachePolicy::Keep);

    let home = nav.go(HOME, (), Transition::None, false).await.unwrap();
    nav.forward(SETTINGS, (), Transition::None).await.unwrap();

    assert!(!home.is_cacheable());
    assert_eq!(nav.snapshot().cached_pages, vec![SETTINGS]);
    wait_until(|| headless.view_tree.was_disposed(home.id())).await;
}

#[tokio::test]
async fn test_shutdown_rejects_popups_and_disposes_cache() {
    let (_headless, nav) = instant();
    let home = nav.go(HOME, (), Transition::None, false).await.unwrap();

    nav.shutdown().await;

    assert_eq!(home.lifecycle(), ScreenLifecycle::Disposed);
    let err = nav.show_popup(MENU, (), Transition::None).await.unwrap_err();
    assert!(matches!(nav_error(&err), NavError::ShutDown));
}
