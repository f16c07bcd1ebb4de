#![allow(dead_code)]

use navstack::nav::headless::HeadlessHost;
use navstack::{CachePolicy, NavConfig, NavEvent, Navigator, ScreenKind, Topic};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

pub const HOME: ScreenKind = ScreenKind::new("home");
pub const DETAIL: ScreenKind = ScreenKind::new("detail");
pub const SETTINGS: ScreenKind = ScreenKind::new("settings");

pub const MENU: ScreenKind = ScreenKind::new("menu");
pub const DIALOG: ScreenKind = ScreenKind::new("dialog");
pub const PICKER: ScreenKind = ScreenKind::new("picker");

/// Headless navigator with home/settings/menu/picker cached and detail/dialog disposable
pub fn setup(config: NavConfig) -> (HeadlessHost, Navigator) {
    setup_with(HeadlessHost::new(), config)
}

pub fn setup_with(headless: HeadlessHost, config: NavConfig) -> (HeadlessHost, Navigator) {
    let navigator = headless.navigator(config);
    for kind in [HOME, SETTINGS, MENU, PICKER] {
        navigator.register_blank(kind, CachePolicy::Keep);
    }
    for kind in [DETAIL, DIALOG] {
        navigator.register_blank(kind, CachePolicy::Dispose);
    }
    (headless, navigator)
}

pub fn instant() -> (HeadlessHost, Navigator) {
    setup(NavConfig::instant())
}

/// Record a one-line description of every event on `topics`
pub fn record(navigator: &Navigator, topics: &[Topic]) -> Arc<Mutex<Vec<String>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    for topic in topics {
        let log = log.clone();
        navigator.subscribe(*topic, move |event| {
            log.lock().push(describe(event));
            Ok(())
        });
    }
    log
}

pub fn describe(event: &NavEvent) -> String {
    match event {
        NavEvent::Navigating { from, to } => format!("navigating {}->{}", kind_of(from), to.kind()),
        NavEvent::AnimationStarted { from, to, .. } => format!("animating {}->{}", from.kind(), to.kind()),
        NavEvent::Navigated { from, to } => format!("navigated {}->{}", kind_of(from), to.kind()),
        NavEvent::Revisiting { screen, mode, .. } => format!("revisiting {} {:?}", screen.kind(), mode),
        NavEvent::Revisited { screen, mode, .. } => format!("revisited {} {:?}", screen.kind(), mode),
        NavEvent::HardwareBack(_) => "hardware back".to_string(),
    }
}

fn kind_of(screen: &Option<navstack::ScreenRef>) -> String {
    screen
        .as_ref()
        .map(|screen| screen.kind().to_string())
        .unwrap_or_else(|| "none".to_string())
}

/// Poll until `condition` holds or a second passes
pub async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}
