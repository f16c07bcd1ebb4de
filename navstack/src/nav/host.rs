//! Capabilities the navigation core consumes from the embedding UI framework.
//!
//! The core never renders, lays out or interpolates anything itself. It
//! sequences calls into these traits and awaits their completion signals.

use anyhow::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::nav::{AnimationStep, CachePolicy, Screen, ScreenRef};

/// View-tree mutation primitives
#[async_trait]
pub trait ViewTree: Send + Sync {
    /// Attach the screen's view to the root container
    async fn add(&self, screen: &ScreenRef) -> Result<()>;

    /// Detach the screen's view without releasing it
    async fn remove(&self, screen: &ScreenRef) -> Result<()>;

    /// Render the screen's view off-screen (warm-up)
    async fn render(&self, screen: &ScreenRef) -> Result<()>;

    async fn bring_to_front(&self, screen: &ScreenRef) -> Result<()>;

    async fn send_to_back(&self, screen: &ScreenRef) -> Result<()>;

    /// Release the native view for good
    async fn dispose(&self, screen: &ScreenRef) -> Result<()>;
}

/// Low-level animation primitive
pub trait Animator: Send + Sync {
    /// Start animating `screen` through `step`; the handle reports native start and completion
    fn animate(&self, screen: &ScreenRef, step: AnimationStep) -> AnimationHandle;
}

/// Completion signals of one running animation.
///
/// A dropped signal sender counts as signalled.
#[derive(Debug)]
pub struct AnimationHandle {
    started: Option<oneshot::Receiver<()>>,
    completed: Option<oneshot::Receiver<()>>,
}

/// Sender side of an [`AnimationHandle`], held by the animator
#[derive(Debug)]
pub struct AnimationSignals {
    started: Option<oneshot::Sender<()>>,
    completed: Option<oneshot::Sender<()>>,
}

impl AnimationHandle {
    pub fn channel() -> (AnimationHandle, AnimationSignals) {
        let (started_tx, started_rx) = oneshot::channel();
        let (completed_tx, completed_rx) = oneshot::channel();
        (
            AnimationHandle {
                started: Some(started_rx),
                completed: Some(completed_rx),
            },
            AnimationSignals {
                started: Some(started_tx),
                completed: Some(completed_tx),
            },
        )
    }

    /// A handle for an animation that already finished
    pub fn finished() -> AnimationHandle {
        AnimationHandle {
            started: None,
            completed: None,
        }
    }

    /// Wait until the animation begins playing natively
    pub async fn started(&mut self) {
        if let Some(started) = self.started.take() {
            let _ = started.await;
        }
    }

    /// Wait until the animation completes
    pub async fn completed(mut self) {
        if let Some(completed) = self.completed.take() {
            let _ = completed.await;
        }
    }
}

impl AnimationSignals {
    pub fn native_started(&mut self) {
        if let Some(started) = self.started.take() {
            let _ = started.send(());
        }
    }

    /// Completion implies the animation has started
    pub fn completed(&mut self) {
        self.native_started();
        if let Some(completed) = self.completed.take() {
            let _ = completed.send(());
        }
    }
}

/// Thread dispatch: the UI-affinity executor and the background pool
pub trait Dispatcher: Send + Sync {
    fn run_on_ui(&self, task: BoxFuture<'static, ()>);
    fn run_in_background(&self, task: BoxFuture<'static, ()>);
}

/// Dispatcher that runs both lanes on the tokio runtime it was created in
#[derive(Debug, Clone)]
pub struct TokioDispatcher {
    handle: tokio::runtime::Handle,
}

impl TokioDispatcher {
    /// Capture the current runtime. Must be called from within a tokio runtime.
    pub fn current() -> Self {
        Self {
            handle: tokio::runtime::Handle::current(),
        }
    }

    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }
}

impl Dispatcher for TokioDispatcher {
    fn run_on_ui(&self, task: BoxFuture<'static, ()>) {
        self.handle.spawn(task);
    }

    fn run_in_background(&self, task: BoxFuture<'static, ()>) {
        self.handle.spawn(task);
    }
}

/// Platform services outside the view tree
pub trait Platform: Send + Sync {
    /// Close the application (hardware back with nowhere to go)
    fn close_app(&self);

    /// Show a generic error alert to the end user
    fn alert(&self, message: &str);
}

/// Decides whether a screen may be kept alive after navigating away
pub trait CachePredicate: Send + Sync {
    fn is_cacheable(&self, screen: &Screen) -> bool;
}

/// Default predicate: trust the factory's declared [`CachePolicy`]
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyPredicate;

impl CachePredicate for PolicyPredicate {
    fn is_cacheable(&self, screen: &Screen) -> bool {
        screen.cache_policy() == CachePolicy::Keep
    }
}

impl<F> CachePredicate for F
where
    F: Fn(&Screen) -> bool + Send + Sync,
{
    fn is_cacheable(&self, screen: &Screen) -> bool {
        self(screen)
    }
}

/// Everything the navigator needs from its host
#[derive(Clone)]
pub struct Host {
    pub view_tree: Arc<dyn ViewTree>,
    pub animator: Arc<dyn Animator>,
    pub platform: Arc<dyn Platform>,
    pub dispatcher: Arc<dyn Dispatcher>,
    pub cache_predicate: Arc<dyn CachePredicate>,
}

impl Host {
    /// Host with a tokio dispatcher and the policy-based cache predicate.
    /// Must be called from within a tokio runtime.
    pub fn new(view_tree: Arc<dyn ViewTree>, animator: Arc<dyn Animator>, platform: Arc<dyn Platform>) -> Self {
        Self {
            view_tree,
            animator,
            platform,
            dispatcher: Arc::new(TokioDispatcher::current()),
            cache_predicate: Arc::new(PolicyPredicate),
        }
    }

    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn with_cache_predicate(mut self, predicate: Arc<dyn CachePredicate>) -> Self {
        self.cache_predicate = predicate;
        self
    }
}
