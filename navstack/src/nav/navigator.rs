use anyhow::{Context, Result};
use arc_swap::{ArcSwap, ArcSwapOption};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use crate::nav::back_button::SingleFlight;
use crate::nav::popup::{PopupRef, PopupState};
use crate::nav::{
    BackStack, CachePolicy, DisposeReason, EventBus, HistoryEntry, Host, InstructionQueue, IntoParams, NavConfig,
    NavError, NavEvent, Page, PageCache, Params, RevisitMode, Screen, ScreenFactory, ScreenKind, ScreenLifecycle,
    ScreenRef, SubscriptionId, Topic, Transition, Transitor,
};

/// What a navigation call should show
#[derive(Debug, Clone)]
pub enum Target {
    /// Reuse the cached instance of this kind, or create one
    Kind(ScreenKind),

    /// Show this exact instance
    Instance(ScreenRef),
}

impl From<ScreenKind> for Target {
    fn from(kind: ScreenKind) -> Self {
        Target::Kind(kind)
    }
}

impl From<ScreenRef> for Target {
    fn from(screen: ScreenRef) -> Self {
        Target::Instance(screen)
    }
}

impl From<&ScreenRef> for Target {
    fn from(screen: &ScreenRef) -> Self {
        Target::Instance(screen.clone())
    }
}

/// Point-in-time view of the navigation state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NavSnapshot {
    /// Topmost popup, or the active page
    pub current: Option<ScreenKind>,
    pub page: Option<ScreenKind>,
    /// Bottom to top
    pub back_stack: Vec<ScreenKind>,
    /// Bottom to top
    pub popups: Vec<ScreenKind>,
    pub cached_pages: Vec<ScreenKind>,
    pub cached_popups: Vec<ScreenKind>,
}

/// A resolved navigation target
struct Resolved {
    screen: ScreenRef,
    revisit: bool,
}

/// One page swap, fully resolved
struct PageSwap {
    target: Resolved,
    params: Params,
    transition: Transition,
    clear_back_stack: bool,
    history: Option<HistoryEntry>,
    leave_reason: DisposeReason,
}

pub(crate) struct NavigatorInner {
    pub(crate) config: ArcSwap<NavConfig>,
    pub(crate) host: Host,
    pub(crate) factories: RwLock<HashMap<ScreenKind, Arc<dyn ScreenFactory>>>,
    pub(crate) events: EventBus,
    pub(crate) transitor: Transitor,
    /// Serializes page swaps
    pub(crate) nav_lock: tokio::sync::Mutex<()>,
    pub(crate) back_stack: Mutex<BackStack>,
    pub(crate) page_cache: Mutex<PageCache<ScreenRef>>,
    pub(crate) current_page: ArcSwapOption<Screen>,
    /// Held across every popup show/hide, transition included
    pub(crate) popup_lock: tokio::sync::Mutex<()>,
    pub(crate) popups: Mutex<PopupState>,
    pub(crate) queue: InstructionQueue,
    pub(crate) back_flight: SingleFlight,
}

/// Page navigation, popups and hardware back for one view hierarchy.
///
/// Cheap to clone; clones share state. Must be created inside a tokio
/// runtime (the popup instruction queue is spawned on it).
#[derive(Clone)]
pub struct Navigator {
    pub(crate) inner: Arc<NavigatorInner>,
}

impl Navigator {
    pub fn new(config: NavConfig, host: Host) -> Self {
        log::info!(
            "🧭 Creating navigator (disposal delay {:?}, close app on back: {})",
            config.disposal_delay,
            config.close_app_on_back
        );

        let transitor = Transitor::new(host.animator.clone(), config.transitions);
        let queue = InstructionQueue::start(host.dispatcher.clone());

        Self {
            inner: Arc::new(NavigatorInner {
                config: ArcSwap::from_pointee(config),
                host,
                factories: RwLock::new(HashMap::new()),
                events: EventBus::new(),
                transitor,
                nav_lock: tokio::sync::Mutex::new(()),
                back_stack: Mutex::new(BackStack::new()),
                page_cache: Mutex::new(PageCache::new()),
                current_page: ArcSwapOption::empty(),
                popup_lock: tokio::sync::Mutex::new(()),
                popups: Mutex::new(PopupState::default()),
                queue,
                back_flight: SingleFlight::new(),
            }),
        }
    }

    pub fn config(&self) -> Arc<NavConfig> {
        self.inner.config.load_full()
    }

    /// Replace the configuration for subsequent operations.
    /// Transition durations are fixed at construction.
    pub fn reconfigure(&self, config: NavConfig) {
        log::info!("Navigator reconfigured: {:?}", config);
        self.inner.config.store(Arc::new(config));
    }

    /// Register a factory for a screen kind, replacing any previous one
    pub fn register<F>(&self, kind: ScreenKind, factory: F)
    where
        F: ScreenFactory + 'static,
    {
        let previous = self.inner.factories.write().insert(kind, Arc::new(factory));
        if previous.is_some() {
            log::warn!("Replaced factory for screen {}", kind);
        } else {
            log::debug!("Registered screen {}", kind);
        }
    }

    pub fn register_page<P: Page>(&self) {
        self.register(P::kind(), PhantomData::<P>);
    }

    pub fn is_registered(&self, kind: ScreenKind) -> bool {
        self.inner.factories.read().contains_key(&kind)
    }

    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: Fn(&NavEvent) -> Result<()> + Send + Sync + 'static,
    {
        self.inner.events.subscribe(topic, handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.events.unsubscribe(id)
    }

    /// Show `target` as the active page.
    ///
    /// With `clear_back_stack` the history is dropped and its non-retained
    /// pages are disposed.
    pub async fn go(
        &self,
        target: impl Into<Target>,
        params: impl IntoParams,
        transition: Transition,
        clear_back_stack: bool,
    ) -> Result<ScreenRef> {
        let params = params.into_params()?;
        let _guard = self.inner.nav_lock.lock().await;

        let target = self.resolve(target.into(), &params)?;
        self.swap(PageSwap {
            target,
            params,
            transition,
            clear_back_stack,
            history: None,
            leave_reason: DisposeReason::NavigatedAway,
        })
        .await
    }

    /// Push the current page onto the back stack, then show `target`
    pub async fn forward(
        &self,
        target: impl Into<Target>,
        params: impl IntoParams,
        transition: Transition,
    ) -> Result<ScreenRef> {
        let params = params.into_params()?;
        let _guard = self.inner.nav_lock.lock().await;

        // Resolve first so a failed lookup leaves the history untouched
        let target = self.resolve(target.into(), &params)?;
        let history = self
            .current_page()
            .map(|current| HistoryEntry::new(current, transition));

        self.swap(PageSwap {
            target,
            params,
            transition,
            clear_back_stack: false,
            history,
            leave_reason: DisposeReason::NavigatedAway,
        })
        .await
    }

    /// Return to the previous page, playing the reverse of the transition that left it.
    ///
    /// Fails with [`NavError::InvalidOperation`] when the history is empty.
    pub async fn back(&self) -> Result<ScreenRef> {
        let _guard = self.inner.nav_lock.lock().await;

        let entry = self
            .inner
            .back_stack
            .lock()
            .pop()
            .ok_or_else(|| NavError::invalid_operation("cannot go back: the back stack is empty"))?;

        let target = match self.resolve_history(&entry) {
            Ok(target) => target,
            Err(err) => {
                self.inner.back_stack.lock().push(entry);
                return Err(err);
            }
        };

        log::info!("⬅️ Going back to {}", entry.kind());
        let result = self
            .swap(PageSwap {
                target,
                params: entry.params.clone(),
                transition: entry.transition.reverse(),
                clear_back_stack: false,
                history: None,
                leave_reason: DisposeReason::NavigatedAway,
            })
            .await;

        if result.is_err() {
            self.inner.back_stack.lock().push(entry);
        }
        result
    }

    /// Recreate the current screen with its current parameters.
    ///
    /// A popup on top is closed and reopened instead.
    pub async fn reload(&self) -> Result<ScreenRef> {
        if !self.inner.popups.lock().stack.is_empty() {
            return self.reload_popup().await;
        }

        let _guard = self.inner.nav_lock.lock().await;
        let current = self
            .current_page()
            .ok_or_else(|| NavError::invalid_operation("cannot reload: no page is shown"))?;

        log::info!("🔄 Reloading {}", current.kind());
        let params = current.params();
        self.inner.page_cache.lock().remove_instance(&current);
        let fresh = self.create_screen(current.kind(), &params, false)?;

        self.swap(PageSwap {
            target: Resolved {
                screen: fresh,
                revisit: false,
            },
            params,
            transition: Transition::None,
            clear_back_stack: false,
            history: None,
            leave_reason: DisposeReason::Reloaded,
        })
        .await
    }

    /// Construct and render a cache-eligible page ahead of its first visit
    pub async fn warm_up(&self, kind: ScreenKind) -> Result<()> {
        let factory = self.factory(kind)?;
        if factory.cache_policy() != CachePolicy::Keep {
            log::warn!("Not warming up {}: screen is not cache-eligible", kind);
            return Ok(());
        }

        if self.inner.page_cache.lock().get(kind).is_some() {
            log::debug!("{} is already warm", kind);
            return Ok(());
        }

        let screen = self.create_screen(kind, &Params::new(), false)?;
        if !screen.is_cacheable() {
            log::warn!("Not warming up {}: rejected by the cache predicate", kind);
            self.dispose_now(&screen, DisposeReason::Evicted).await;
            return Ok(());
        }

        self.inner
            .host
            .view_tree
            .render(&screen)
            .await
            .with_context(|| format!("Failed to render {} off-screen", kind))?;

        screen.set_lifecycle(ScreenLifecycle::Background);
        if let Some(replaced) = self.inner.page_cache.lock().put(screen) {
            self.schedule_disposal(replaced, DisposeReason::Evicted);
        }
        log::info!("🔥 Warmed up {}", kind);
        Ok(())
    }

    /// Dispose cached pages and hidden popups, optionally of one kind only.
    ///
    /// The screen currently shown and popups on the stack are spared.
    pub async fn dispose_cache(&self, kind: Option<ScreenKind>) -> usize {
        let current = self.current_page();
        let pages = self
            .inner
            .page_cache
            .lock()
            .evict(kind, |screen| current.as_ref().is_some_and(|current| current.same(screen)));

        let popups = {
            let mut state = self.inner.popups.lock();
            let PopupState { stack, cache } = &mut *state;
            cache.evict(kind, |popup| stack.iter().any(|shown| Arc::ptr_eq(shown, popup)))
        };

        let count = pages.len() + popups.len();
        for screen in pages {
            self.dispose_now(&screen, DisposeReason::Evicted).await;
        }
        for popup in popups {
            popup.mark_disposed();
            self.dispose_now(popup.screen(), DisposeReason::Evicted).await;
        }

        log::info!("🧹 Evicted {} cached screen(s)", count);
        count
    }

    /// Cached instance of `kind`: page cache first, then hidden popups
    pub fn get_from_cache(&self, kind: ScreenKind) -> Option<ScreenRef> {
        if let Some(screen) = self.inner.page_cache.lock().get(kind) {
            return Some(screen);
        }
        self.inner
            .popups
            .lock()
            .cache
            .get(kind)
            .map(|popup| popup.screen().clone())
    }

    /// The topmost popup, or the active page
    pub fn current(&self) -> Option<ScreenRef> {
        let top = self
            .inner
            .popups
            .lock()
            .stack
            .last()
            .map(|popup| popup.screen().clone());
        top.or_else(|| self.current_page())
    }

    pub fn current_page(&self) -> Option<ScreenRef> {
        self.inner.current_page.load_full()
    }

    /// Shown popups, bottom to top
    pub fn popups(&self) -> Vec<PopupRef> {
        self.inner.popups.lock().stack.clone()
    }

    /// True if a popup can be hidden or a page popped
    pub fn can_go_back(&self) -> bool {
        !self.inner.popups.lock().stack.is_empty() || !self.inner.back_stack.lock().is_empty()
    }

    pub fn snapshot(&self) -> NavSnapshot {
        let (popups, cached_popups) = {
            let state = self.inner.popups.lock();
            (
                state.stack.iter().map(|popup| popup.screen().kind()).collect::<Vec<_>>(),
                state.cache.kinds(),
            )
        };
        let page = self.current_page().map(|screen| screen.kind());

        NavSnapshot {
            current: popups.last().copied().or(page),
            page,
            back_stack: self.inner.back_stack.lock().kinds(),
            popups,
            cached_pages: self.inner.page_cache.lock().kinds(),
            cached_popups,
        }
    }

    /// Close the popup queue and dispose every cached screen
    pub async fn shutdown(&self) {
        log::info!("🛑 Shutting down navigator");
        self.inner.queue.close();

        let pages = self.inner.page_cache.lock().evict(None, |_| false);
        let popups = self.inner.popups.lock().cache.evict(None, |_| false);
        for screen in pages {
            self.dispose_now(&screen, DisposeReason::Shutdown).await;
        }
        for popup in popups {
            popup.mark_disposed();
            self.dispose_now(popup.screen(), DisposeReason::Shutdown).await;
        }
    }

    pub(crate) fn factory(&self, kind: ScreenKind) -> Result<Arc<dyn ScreenFactory>> {
        let factory = self
            .inner
            .factories
            .read()
            .get(&kind)
            .cloned()
            .ok_or(NavError::UnknownScreen(kind))?;
        Ok(factory)
    }

    /// Build a fresh instance through the registered factory
    pub(crate) fn create_screen(&self, kind: ScreenKind, params: &Params, is_popup: bool) -> Result<ScreenRef> {
        let factory = self.factory(kind)?;
        let page = factory
            .create(params)
            .with_context(|| format!("Failed to create screen {}", kind))?;

        let screen = Arc::new(Screen::new(kind, page, factory.cache_policy(), is_popup, params.clone()));
        let cacheable = screen.resolve_cacheable(self.inner.host.cache_predicate.as_ref());
        log::debug!("Created {} ({}), cacheable: {}", kind, screen.id(), cacheable);
        Ok(screen)
    }

    fn resolve(&self, target: Target, params: &Params) -> Result<Resolved> {
        match target {
            Target::Instance(screen) => {
                if !screen.is_alive() {
                    return Err(NavError::invalid_operation(format!(
                        "cannot navigate to disposed screen {}",
                        screen.kind()
                    ))
                    .into());
                }
                let revisit = self.inner.page_cache.lock().holds(&screen);
                Ok(Resolved { screen, revisit })
            }
            Target::Kind(kind) => {
                let cached = self.inner.page_cache.lock().get(kind);
                match cached {
                    Some(screen) if screen.is_alive() => Ok(Resolved { screen, revisit: true }),
                    _ => Ok(Resolved {
                        screen: self.create_screen(kind, params, false)?,
                        revisit: false,
                    }),
                }
            }
        }
    }

    /// The page a history entry returns to: the retained instance, or a new one
    fn resolve_history(&self, entry: &HistoryEntry) -> Result<Resolved> {
        let cache = self.inner.page_cache.lock();
        if entry.screen.is_alive() && cache.holds(&entry.screen) {
            return Ok(Resolved {
                screen: entry.screen.clone(),
                revisit: true,
            });
        }
        if let Some(screen) = cache.get(entry.kind()).filter(|screen| screen.is_alive()) {
            return Ok(Resolved { screen, revisit: true });
        }
        drop(cache);

        Ok(Resolved {
            screen: self.create_screen(entry.kind(), &entry.params, false)?,
            revisit: false,
        })
    }

    /// Replace the active page. Caller holds `nav_lock`.
    async fn swap(&self, request: PageSwap) -> Result<ScreenRef> {
        let PageSwap {
            target: Resolved { screen, revisit },
            params,
            transition,
            clear_back_stack,
            history,
            leave_reason,
        } = request;

        let from = self.current_page();
        if from.as_ref().is_some_and(|from| from.same(&screen)) {
            return self.refresh_current(screen, params, history, clear_back_stack).await;
        }

        self.raise(&NavEvent::Navigating {
            from: from.clone(),
            to: screen.clone(),
        });

        let mode = revisit.then(|| RevisitMode::between(&screen.params(), &params));
        if let Some(mode) = mode {
            self.raise(&NavEvent::Revisiting {
                screen: screen.clone(),
                params: params.clone(),
                mode,
            });
        }

        self.inner
            .host
            .view_tree
            .add(&screen)
            .await
            .with_context(|| format!("Failed to attach {}", screen.kind()))?;

        screen.set_params(params.clone());
        screen.set_transition(transition);

        let cleared = {
            let mut back_stack = self.inner.back_stack.lock();
            if let Some(entry) = history {
                back_stack.push(entry);
            }
            if clear_back_stack {
                back_stack.clear()
            } else {
                Vec::new()
            }
        };

        if screen.is_cacheable() {
            let replaced = self.inner.page_cache.lock().put(screen.clone());
            // A replaced `from` is disposed below once it has left the screen
            let replaced = replaced.filter(|replaced| !from.as_ref().is_some_and(|from| from.same(replaced)));
            if let Some(replaced) = replaced {
                self.schedule_disposal(replaced, DisposeReason::Evicted);
            }
        }

        self.inner.current_page.store(Some(screen.clone()));
        screen.set_lifecycle(ScreenLifecycle::Active);
        log::info!(
            "🧭 {} -> {} ({})",
            from.as_ref().map(|from| from.kind().name()).unwrap_or("<none>"),
            screen.kind(),
            transition
        );

        self.inner
            .transitor
            .run(transition, from.as_ref(), Some(&screen), |plan| {
                if let (Some(from), Some(duration)) = (from.as_ref(), plan.visible_duration()) {
                    self.raise(&NavEvent::AnimationStarted {
                        from: from.clone(),
                        to: screen.clone(),
                        duration,
                    });
                }
            })
            .await;

        if let Some(from) = &from {
            self.suspend(from).await;
        }

        if let Err(err) = screen.page().on_resume(&params) {
            log::error!("❌ {} failed to resume: {:#}", screen.kind(), err);
        }

        if let Some(mode) = mode {
            self.raise(&NavEvent::Revisited {
                screen: screen.clone(),
                params,
                mode,
            });
        }

        self.raise(&NavEvent::Navigated {
            from: from.clone(),
            to: screen.clone(),
        });

        if let Some(from) = from {
            if self.should_dispose(&from) {
                self.schedule_disposal(from, leave_reason);
            }
        }
        for entry in cleared {
            if self.should_dispose(&entry.screen) {
                self.schedule_disposal(entry.screen, DisposeReason::NavigatedAway);
            }
        }

        Ok(screen)
    }

    /// Navigation to the page already shown: only parameters change
    async fn refresh_current(
        &self,
        screen: ScreenRef,
        params: Params,
        history: Option<HistoryEntry>,
        clear_back_stack: bool,
    ) -> Result<ScreenRef> {
        let mode = RevisitMode::between(&screen.params(), &params);
        log::debug!("{} is already shown ({:?})", screen.kind(), mode);

        self.raise(&NavEvent::Revisiting {
            screen: screen.clone(),
            params: params.clone(),
            mode,
        });
        screen.set_params(params.clone());

        let cleared = {
            let mut back_stack = self.inner.back_stack.lock();
            if let Some(entry) = history {
                back_stack.push(entry);
            }
            if clear_back_stack {
                back_stack.clear()
            } else {
                Vec::new()
            }
        };
        for entry in cleared {
            if self.should_dispose(&entry.screen) {
                self.schedule_disposal(entry.screen, DisposeReason::NavigatedAway);
            }
        }

        if let Err(err) = screen.page().on_resume(&params) {
            log::error!("❌ {} failed to resume: {:#}", screen.kind(), err);
        }
        self.raise(&NavEvent::Revisited {
            screen: screen.clone(),
            params,
            mode,
        });
        Ok(screen)
    }

    /// Take a page that was left off screen
    async fn suspend(&self, screen: &ScreenRef) {
        screen.set_lifecycle(ScreenLifecycle::Background);
        if let Err(err) = screen.page().on_suspend() {
            log::error!("❌ {} failed to suspend: {:#}", screen.kind(), err);
        }
        if let Err(err) = self.inner.host.view_tree.remove(screen).await {
            log::error!("❌ Failed to detach {}: {:#}", screen.kind(), err);
        }
    }

    /// A left page is retained only while it is the cached instance of its kind
    fn should_dispose(&self, screen: &ScreenRef) -> bool {
        if self.is_current(screen) {
            return false;
        }
        !(screen.is_cacheable() && self.inner.page_cache.lock().holds(screen))
    }

    fn is_current(&self, screen: &ScreenRef) -> bool {
        let is_page = self
            .current_page()
            .is_some_and(|current| current.same(screen));
        is_page
            || self
                .inner
                .popups
                .lock()
                .stack
                .iter()
                .any(|popup| popup.screen().same(screen))
    }

    /// Dispose `screen` after the configured delay unless it is in use again by then
    pub(crate) fn schedule_disposal(&self, screen: ScreenRef, reason: DisposeReason) {
        let delay = self.inner.config.load().disposal_delay;
        let navigator: Weak<NavigatorInner> = Arc::downgrade(&self.inner);
        log::debug!("Disposing {} ({}) in {:?}: {:?}", screen.kind(), screen.id(), delay, reason);

        self.inner.host.dispatcher.run_in_background(Box::pin(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = navigator.upgrade() else {
                return;
            };
            let navigator = Navigator { inner };

            if navigator.is_current(&screen) {
                log::warn!("⚠️ Skipping disposal of {} ({}): it is current again", screen.kind(), screen.id());
                return;
            }
            let cached = screen.is_cacheable() && navigator.inner.page_cache.lock().holds(&screen);
            if cached {
                log::warn!("⚠️ Skipping disposal of {} ({}): it is cached", screen.kind(), screen.id());
                return;
            }
            navigator.dispose_now(&screen, reason).await;
        }));
    }

    pub(crate) async fn dispose_now(&self, screen: &ScreenRef, reason: DisposeReason) {
        if !screen.begin_disposal() {
            return;
        }
        if let Err(err) = screen.page().on_destroy() {
            log::error!("❌ {} failed during destroy: {:#}", screen.kind(), err);
        }
        if let Err(err) = self.inner.host.view_tree.dispose(screen).await {
            log::error!("❌ Failed to dispose view of {}: {:#}", screen.kind(), err);
        }
        screen.set_lifecycle(ScreenLifecycle::Disposed);
        log::info!("🗑️ Disposed {} ({}): {:?}", screen.kind(), screen.id(), reason);
    }

    /// Publish to listeners; failures are contained here
    pub(crate) fn raise(&self, event: &NavEvent) {
        for err in self.inner.events.publish(event) {
            self.report_failure(&err, &format!("{:?} listener", event.topic()));
        }
    }

    /// Log a contained failure and, outside diagnostics mode, alert the user
    pub(crate) fn report_failure(&self, err: &anyhow::Error, context: &str) {
        log::error!("❌ {} failed: {:#}", context, err);
        if !self.inner.config.load().diagnostics {
            self.inner.host.platform.alert(&format!("{} failed: {}", context, err));
        }
    }
}
