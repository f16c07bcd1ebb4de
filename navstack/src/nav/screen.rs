use anyhow::Result;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

use crate::nav::{CachePolicy, CachePredicate, Params, ScreenLifecycle, Transition};

/// Identifies a screen type (at most one cached instance per kind)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScreenKind(pub &'static str);

impl ScreenKind {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ScreenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Content of a screen, implemented by the application.
///
/// Lifecycle hooks are optional; failures are logged and never abort navigation.
pub trait Page: Send + Sync + 'static {
    /// Build the page for a navigation request
    fn create(params: &Params) -> Result<Self>
    where
        Self: Sized;

    /// The kind this page registers under
    fn kind() -> ScreenKind
    where
        Self: Sized;

    /// Whether instances may be kept alive and reused
    fn cache_policy() -> CachePolicy
    where
        Self: Sized,
    {
        CachePolicy::Dispose
    }

    /// The page became visible with these parameters
    fn on_resume(&self, _params: &Params) -> Result<()> {
        Ok(())
    }

    /// The page left the screen but is still alive
    fn on_suspend(&self) -> Result<()> {
        Ok(())
    }

    /// The page is being released
    fn on_destroy(&self) -> Result<()> {
        Ok(())
    }
}

/// Trait for creating screen content (factory pattern for lazy construction)
pub trait ScreenFactory: Send + Sync {
    /// Create a new page instance for the given parameters
    fn create(&self, params: &Params) -> Result<Box<dyn Page>>;

    /// Get the cache policy for this screen kind
    fn cache_policy(&self) -> CachePolicy;
}

/// Blanket implementation of ScreenFactory for Page types
impl<P: Page> ScreenFactory for std::marker::PhantomData<P> {
    fn create(&self, params: &Params) -> Result<Box<dyn Page>> {
        Ok(Box::new(P::create(params)?))
    }

    fn cache_policy(&self) -> CachePolicy {
        P::cache_policy()
    }
}

/// Factory built from a closure, for pages registered at runtime
pub struct FnFactory<F> {
    policy: CachePolicy,
    build: F,
}

impl<F> FnFactory<F>
where
    F: Fn(&Params) -> Result<Box<dyn Page>> + Send + Sync,
{
    pub fn new(policy: CachePolicy, build: F) -> Self {
        Self { policy, build }
    }
}

impl<F> ScreenFactory for FnFactory<F>
where
    F: Fn(&Params) -> Result<Box<dyn Page>> + Send + Sync,
{
    fn create(&self, params: &Params) -> Result<Box<dyn Page>> {
        (self.build)(params)
    }

    fn cache_policy(&self) -> CachePolicy {
        self.policy
    }
}

#[derive(Debug)]
struct ScreenState {
    params: Params,
    transition: Transition,
    lifecycle: ScreenLifecycle,
}

/// A live screen instance: page content plus navigation state
pub struct Screen {
    id: Uuid,
    kind: ScreenKind,
    is_popup: bool,
    policy: CachePolicy,
    cacheable: OnceLock<bool>,
    page: Box<dyn Page>,
    state: Mutex<ScreenState>,
}

pub type ScreenRef = Arc<Screen>;

impl Screen {
    pub fn new(kind: ScreenKind, page: Box<dyn Page>, policy: CachePolicy, is_popup: bool, params: Params) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            is_popup,
            policy,
            cacheable: OnceLock::new(),
            page,
            state: Mutex::new(ScreenState {
                params,
                transition: Transition::None,
                lifecycle: ScreenLifecycle::Created,
            }),
        }
    }

    /// Evaluate cache eligibility once; later calls keep the first verdict
    pub fn resolve_cacheable(&self, predicate: &dyn CachePredicate) -> bool {
        *self.cacheable.get_or_init(|| predicate.is_cacheable(self))
    }

    pub fn is_cacheable(&self) -> bool {
        self.cacheable.get().copied().unwrap_or(false)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> ScreenKind {
        self.kind
    }

    pub fn is_popup(&self) -> bool {
        self.is_popup
    }

    pub fn cache_policy(&self) -> CachePolicy {
        self.policy
    }

    pub fn page(&self) -> &dyn Page {
        self.page.as_ref()
    }

    pub fn params(&self) -> Params {
        self.state.lock().params.clone()
    }

    pub fn set_params(&self, params: Params) {
        self.state.lock().params = params;
    }

    pub fn transition(&self) -> Transition {
        self.state.lock().transition
    }

    pub fn set_transition(&self, transition: Transition) {
        self.state.lock().transition = transition;
    }

    pub fn lifecycle(&self) -> ScreenLifecycle {
        self.state.lock().lifecycle
    }

    pub fn set_lifecycle(&self, lifecycle: ScreenLifecycle) {
        let mut state = self.state.lock();
        log::debug!("Screen {} ({}) {:?} -> {:?}", self.kind, self.id, state.lifecycle, lifecycle);
        state.lifecycle = lifecycle;
    }

    pub fn is_alive(&self) -> bool {
        self.lifecycle().is_alive()
    }

    /// Move a live screen to `Disposing`. Only the first caller gets `true`.
    pub fn begin_disposal(&self) -> bool {
        let mut state = self.state.lock();
        if !state.lifecycle.is_alive() {
            return false;
        }
        log::debug!("Screen {} ({}) {:?} -> Disposing", self.kind, self.id, state.lifecycle);
        state.lifecycle = ScreenLifecycle::Disposing;
        true
    }

    /// Instance identity (not structural equality)
    pub fn same(&self, other: &Screen) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Screen")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("is_popup", &self.is_popup)
            .field("cacheable", &self.cacheable.get())
            .field("lifecycle", &state.lifecycle)
            .field("transition", &state.transition)
            .field("params", &state.params)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nav::headless::BlankPage;

    fn blank() -> Screen {
        Screen::new(ScreenKind::new("home"), Box::new(BlankPage), CachePolicy::Keep, false, Params::new())
    }

    #[test]
    fn test_begin_disposal_claims_once() {
        let screen = blank();
        screen.set_lifecycle(ScreenLifecycle::Background);

        assert!(screen.begin_disposal());
        assert_eq!(screen.lifecycle(), ScreenLifecycle::Disposing);
        assert!(!screen.begin_disposal());

        screen.set_lifecycle(ScreenLifecycle::Disposed);
        assert!(!screen.begin_disposal());
    }

    #[test]
    fn test_begin_disposal_single_winner_across_threads() {
        let screen = blank();
        let winners = std::thread::scope(|scope| {
            let claims: Vec<_> = (0..8).map(|_| scope.spawn(|| screen.begin_disposal())).collect();
            claims
                .into_iter()
                .map(|claim| claim.join().unwrap_or(false))
                .filter(|won| *won)
                .count()
        });
        assert_eq!(winners, 1);
    }
}
