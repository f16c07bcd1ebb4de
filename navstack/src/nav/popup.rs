use anyhow::Result;
use parking_lot::Mutex;
use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::nav::{
    DisposeReason, IntoParams, NavError, NavEvent, Navigator, PageCache, Params, PopupPhase, RevisitMode, ScreenKind,
    ScreenLifecycle, ScreenRef, Transition,
};

type AnyValue = Box<dyn Any + Send>;

/// A value a popup was dismissed with
pub struct ResultValue {
    value: AnyValue,
    type_name: &'static str,
    sentinel: bool,
}

impl ResultValue {
    pub fn of<T: Any + Send>(value: T) -> Self {
        let any: &dyn Any = &value;
        // `()` and `false` mean "dismissed without a result"
        let sentinel = any.is::<()>() || any.downcast_ref::<bool>() == Some(&false);
        Self {
            value: Box::new(value),
            type_name: type_name::<T>(),
            sentinel,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is_sentinel(&self) -> bool {
        self.sentinel
    }
}

impl fmt::Debug for ResultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultValue")
            .field("type_name", &self.type_name)
            .field("sentinel", &self.sentinel)
            .finish()
    }
}

fn accepts<T: Any>(value: &(dyn Any + Send)) -> bool {
    value.is::<T>()
}

/// The single-resolution result a typed popup caller is waiting on
pub struct PendingResult {
    accepts: fn(&(dyn Any + Send)) -> bool,
    expected: &'static str,
    sender: oneshot::Sender<Option<AnyValue>>,
}

impl PendingResult {
    pub fn new<T: Any + Send>() -> (Self, oneshot::Receiver<Option<AnyValue>>) {
        let (sender, receiver) = oneshot::channel();
        let pending = Self {
            accepts: accepts::<T>,
            expected: type_name::<T>(),
            sender,
        };
        (pending, receiver)
    }

    pub fn expected(&self) -> &'static str {
        self.expected
    }
}

impl fmt::Debug for PendingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingResult").field("expected", &self.expected).finish()
    }
}

/// An overlay screen stacked above a host screen
#[derive(Debug)]
pub struct Popup {
    screen: ScreenRef,
    host: Mutex<Option<ScreenRef>>,
    phase: Mutex<PopupPhase>,
    pending: Mutex<Option<PendingResult>>,
}

pub type PopupRef = Arc<Popup>;

impl Popup {
    pub fn new(screen: ScreenRef) -> Self {
        Self {
            screen,
            host: Mutex::new(None),
            phase: Mutex::new(PopupPhase::Unshown),
            pending: Mutex::new(None),
        }
    }

    pub fn screen(&self) -> &ScreenRef {
        &self.screen
    }

    pub fn kind(&self) -> ScreenKind {
        self.screen.kind()
    }

    /// The screen beneath this popup when it was last shown
    pub fn host(&self) -> Option<ScreenRef> {
        self.host.lock().clone()
    }

    pub(crate) fn bind_host(&self, host: Option<ScreenRef>) {
        *self.host.lock() = host;
    }

    pub fn phase(&self) -> PopupPhase {
        *self.phase.lock()
    }

    pub(crate) fn set_phase(&self, phase: PopupPhase) {
        let mut current = self.phase.lock();
        log::debug!("Popup {} {:?} -> {:?}", self.screen.kind(), *current, phase);
        *current = phase;
    }

    pub(crate) fn mark_disposed(&self) {
        self.set_phase(PopupPhase::Disposed);
        self.pending.lock().take();
    }

    pub fn is_fully_visible(&self) -> bool {
        self.phase() == PopupPhase::FullyVisible
    }

    pub fn expects_result(&self) -> bool {
        self.pending.lock().is_some()
    }

    pub(crate) fn set_pending(&self, pending: PendingResult) {
        if self.pending.lock().replace(pending).is_some() {
            log::warn!("Popup {} had an unresolved result; its caller receives the default", self.kind());
        }
    }

    pub(crate) fn take_pending(&self) -> Option<PendingResult> {
        self.pending.lock().take()
    }

    /// Hand `result` to the waiting caller.
    ///
    /// A sentinel (or no result) resolves the caller with its default. A
    /// value of the wrong type fails and leaves the pending result in place.
    pub(crate) fn resolve(&self, result: Option<ResultValue>) -> Result<(), NavError> {
        let mut pending = self.pending.lock();
        let Some(expected) = pending.as_ref() else {
            if let Some(result) = &result {
                log::debug!("Popup {} takes no result; dropping {}", self.kind(), result.type_name());
            }
            return Ok(());
        };

        let delivery = match result {
            Some(result) if (expected.accepts)(result.value.as_ref()) => Some(result.value),
            Some(result) if !result.is_sentinel() => {
                return Err(NavError::ResultTypeMismatch {
                    kind: self.kind(),
                    expected: expected.expected(),
                    actual: result.type_name(),
                });
            }
            _ => None,
        };

        if let Some(pending) = pending.take() {
            // The caller may have stopped waiting
            let _ = pending.sender.send(delivery);
        }
        Ok(())
    }
}

/// Shown popups and hidden cached ones
#[derive(Default)]
pub(crate) struct PopupState {
    /// Bottom to top
    pub(crate) stack: Vec<PopupRef>,
    pub(crate) cache: PageCache<PopupRef>,
}

impl PopupState {
    fn contains(&self, popup: &PopupRef) -> bool {
        self.stack.iter().any(|shown| Arc::ptr_eq(shown, popup))
    }
}

impl Navigator {
    /// Show a popup above the current screen; resolves once it is fully visible
    pub async fn show_popup(
        &self,
        kind: ScreenKind,
        params: impl IntoParams,
        transition: Transition,
    ) -> Result<PopupRef> {
        let params = params.into_params()?;
        let navigator = self.clone();
        self.inner
            .queue
            .run(move || async move { navigator.show_popup_now(kind, params, transition, None).await })
            .await
    }

    /// Show a popup and wait for the value it is hidden with.
    ///
    /// Dismissal without a value (plain hide, `()` or `false`, or disposal)
    /// yields `T::default()`.
    pub async fn show_popup_for<T>(&self, kind: ScreenKind, params: impl IntoParams, transition: Transition) -> Result<T>
    where
        T: Any + Send + Default,
    {
        let params = params.into_params()?;
        let (pending, receiver) = PendingResult::new::<T>();
        let navigator = self.clone();
        self.inner
            .queue
            .run(move || async move {
                navigator
                    .show_popup_now(kind, params, transition, Some(pending))
                    .await
            })
            .await?;

        match receiver.await {
            Ok(Some(value)) => value.downcast::<T>().map(|value| *value).map_err(|_| {
                NavError::ResultTypeMismatch {
                    kind,
                    expected: type_name::<T>(),
                    actual: "unknown",
                }
                .into()
            }),
            Ok(None) | Err(_) => Ok(T::default()),
        }
    }

    /// Hide the topmost popup without a result.
    ///
    /// With no popup shown this goes back when there is history.
    pub async fn hide_popup(&self) -> Result<()> {
        self.enqueue_hide(None, None).await
    }

    /// Hide the topmost popup, resolving its caller with `result`
    pub async fn hide_popup_with<T: Any + Send>(&self, result: T) -> Result<()> {
        self.enqueue_hide(None, Some(ResultValue::of(result))).await
    }

    /// Hide the popup of `kind`, which must be the topmost one
    pub async fn hide_popup_of(&self, kind: ScreenKind) -> Result<()> {
        self.enqueue_hide(Some(kind), None).await
    }

    async fn enqueue_hide(&self, kind: Option<ScreenKind>, result: Option<ResultValue>) -> Result<()> {
        let navigator = self.clone();
        self.inner
            .queue
            .run(move || async move { navigator.hide_popup_now(kind, result).await })
            .await
    }

    /// Close and reopen the topmost popup as a fresh instance
    pub(crate) async fn reload_popup(&self) -> Result<ScreenRef> {
        let navigator = self.clone();
        let popup = self
            .inner
            .queue
            .run(move || async move {
                let _guard = navigator.inner.popup_lock.lock().await;
                let top = navigator.inner.popups.lock().stack.last().cloned();
                let Some(top) = top else {
                    return Err(NavError::invalid_operation("cannot reload: no popup is shown").into());
                };

                log::info!("🔄 Reloading popup {}", top.kind());
                let (kind, params, transition) = (top.kind(), top.screen().params(), top.screen().transition());
                navigator.inner.popups.lock().cache.remove_instance(&top);
                let pending = top.take_pending();

                navigator.dismiss(&top, DisposeReason::Reloaded).await;
                navigator.present(kind, params, transition, pending).await
            })
            .await?;
        Ok(popup.screen().clone())
    }

    async fn show_popup_now(
        &self,
        kind: ScreenKind,
        params: Params,
        transition: Transition,
        pending: Option<PendingResult>,
    ) -> Result<PopupRef> {
        let _guard = self.inner.popup_lock.lock().await;
        self.present(kind, params, transition, pending).await
    }

    async fn hide_popup_now(&self, kind: Option<ScreenKind>, result: Option<ResultValue>) -> Result<()> {
        let _guard = self.inner.popup_lock.lock().await;

        let top = self.inner.popups.lock().stack.last().cloned();
        let Some(popup) = top else {
            if let Some(kind) = kind {
                return Err(NavError::invalid_operation(format!("cannot hide {}: no popup is shown", kind)).into());
            }
            if self.inner.back_stack.lock().is_empty() {
                log::info!("No popup to hide and no history to go back to");
                return Ok(());
            }
            log::debug!("No popup to hide, going back instead");
            self.back().await?;
            return Ok(());
        };

        if let Some(kind) = kind {
            if kind != popup.kind() {
                return Err(NavError::NotTopmost {
                    requested: kind,
                    top: popup.kind(),
                }
                .into());
            }
        }

        popup.resolve(result)?;
        self.dismiss(&popup, DisposeReason::PopupHidden).await;
        Ok(())
    }

    /// Push a popup and play its enter transition. Caller holds `popup_lock`.
    async fn present(
        &self,
        kind: ScreenKind,
        params: Params,
        transition: Transition,
        pending: Option<PendingResult>,
    ) -> Result<PopupRef> {
        let cached = {
            let state = self.inner.popups.lock();
            state
                .cache
                .get(kind)
                .filter(|popup| popup.screen().is_alive() && !state.contains(popup))
        };
        let revisit = cached.is_some();

        let popup = match cached {
            Some(popup) => popup,
            None => Arc::new(Popup::new(self.create_screen(kind, &params, true)?)),
        };
        let screen = popup.screen().clone();

        let mode = revisit.then(|| RevisitMode::between(&screen.params(), &params));
        if let Some(mode) = mode {
            self.raise(&NavEvent::Revisiting {
                screen: screen.clone(),
                params: params.clone(),
                mode,
            });
        }

        if revisit {
            self.inner.host.view_tree.bring_to_front(&screen).await?;
        } else {
            self.inner.host.view_tree.add(&screen).await?;
        }

        popup.bind_host(self.current());
        screen.set_params(params.clone());
        screen.set_transition(transition);
        if let Some(pending) = pending {
            popup.set_pending(pending);
        }

        let replaced = {
            let mut state = self.inner.popups.lock();
            state.stack.push(popup.clone());
            if screen.is_cacheable() {
                state.cache.put(popup.clone()).filter(|replaced| !state.contains(replaced))
            } else {
                None
            }
        };
        if let Some(replaced) = replaced {
            replaced.mark_disposed();
            self.dispose_now(replaced.screen(), DisposeReason::Evicted).await;
        }

        popup.set_phase(PopupPhase::Showing);
        screen.set_lifecycle(ScreenLifecycle::Active);
        log::info!("💬 Showing popup {} ({})", kind, transition);

        self.inner.transitor.run(transition, None, Some(&screen), |_| {}).await;
        popup.set_phase(PopupPhase::FullyVisible);

        if let Err(err) = screen.page().on_resume(&params) {
            log::error!("❌ Popup {} failed to resume: {:#}", kind, err);
        }

        if let Some(mode) = mode {
            self.raise(&NavEvent::Revisited { screen, params, mode });
        }
        Ok(popup)
    }

    /// Play the exit transition of `popup`, then cache or dispose it.
    /// Caller holds `popup_lock`.
    async fn dismiss(&self, popup: &PopupRef, reason: DisposeReason) {
        let screen = popup.screen().clone();
        popup.set_phase(PopupPhase::Hiding);
        log::info!("💬 Hiding popup {}", screen.kind());

        self.inner
            .transitor
            .run(screen.transition().reverse(), Some(&screen), None, |_| {})
            .await;

        let cached = {
            let mut state = self.inner.popups.lock();
            state.stack.retain(|shown| !Arc::ptr_eq(shown, popup));
            screen.is_cacheable() && state.cache.holds(popup)
        };

        screen.set_lifecycle(ScreenLifecycle::Background);
        if let Err(err) = screen.page().on_suspend() {
            log::error!("❌ Popup {} failed to suspend: {:#}", screen.kind(), err);
        }

        if cached {
            if let Err(err) = self.inner.host.view_tree.send_to_back(&screen).await {
                log::error!("❌ Failed to send popup {} to back: {:#}", screen.kind(), err);
            }
            popup.set_phase(PopupPhase::Hidden);
        } else {
            if let Err(err) = self.inner.host.view_tree.remove(&screen).await {
                log::error!("❌ Failed to detach popup {}: {:#}", screen.kind(), err);
            }
            popup.mark_disposed();
            self.dispose_now(&screen, reason).await;
        }
    }
}
