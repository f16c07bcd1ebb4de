//! In-memory host for tests and the CLI: records view-tree operations,
//! completes animations on a timer and counts platform calls.

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

use crate::nav::{
    AnimationHandle, AnimationStep, Animator, CachePolicy, FnFactory, Host, NavConfig, Navigator, Page, Params,
    Platform, ScreenKind, ScreenRef, ViewTree,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewOp {
    Add,
    Remove,
    Render,
    BringToFront,
    SendToBack,
    Dispose,
}

/// One recorded view-tree call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewRecord {
    pub op: ViewOp,
    pub kind: ScreenKind,
    pub id: Uuid,
}

#[derive(Debug, Default)]
pub struct RecordingViewTree {
    records: Mutex<Vec<ViewRecord>>,
}

impl RecordingViewTree {
    fn record(&self, op: ViewOp, screen: &ScreenRef) {
        log::trace!("View {:?}: {} ({})", op, screen.kind(), screen.id());
        self.records.lock().push(ViewRecord {
            op,
            kind: screen.kind(),
            id: screen.id(),
        });
    }

    pub fn records(&self) -> Vec<ViewRecord> {
        self.records.lock().clone()
    }

    /// Kinds that went through `op`, in call order
    pub fn kinds(&self, op: ViewOp) -> Vec<ScreenKind> {
        self.records
            .lock()
            .iter()
            .filter(|record| record.op == op)
            .map(|record| record.kind)
            .collect()
    }

    pub fn was_disposed(&self, id: Uuid) -> bool {
        self.records
            .lock()
            .iter()
            .any(|record| record.op == ViewOp::Dispose && record.id == id)
    }
}

#[async_trait]
impl ViewTree for RecordingViewTree {
    async fn add(&self, screen: &ScreenRef) -> Result<()> {
        self.record(ViewOp::Add, screen);
        Ok(())
    }

    async fn remove(&self, screen: &ScreenRef) -> Result<()> {
        self.record(ViewOp::Remove, screen);
        Ok(())
    }

    async fn render(&self, screen: &ScreenRef) -> Result<()> {
        self.record(ViewOp::Render, screen);
        Ok(())
    }

    async fn bring_to_front(&self, screen: &ScreenRef) -> Result<()> {
        self.record(ViewOp::BringToFront, screen);
        Ok(())
    }

    async fn send_to_back(&self, screen: &ScreenRef) -> Result<()> {
        self.record(ViewOp::SendToBack, screen);
        Ok(())
    }

    async fn dispose(&self, screen: &ScreenRef) -> Result<()> {
        self.record(ViewOp::Dispose, screen);
        Ok(())
    }
}

/// Animations start immediately and complete after their step duration
/// (or a fixed override)
#[derive(Debug, Default)]
pub struct HeadlessAnimator {
    duration_override: Option<Duration>,
    steps: Mutex<Vec<(ScreenKind, AnimationStep)>>,
}

impl HeadlessAnimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every animation takes `duration`, whatever its step says
    pub fn with_duration(duration: Duration) -> Self {
        Self {
            duration_override: Some(duration),
            steps: Mutex::new(Vec::new()),
        }
    }

    pub fn steps(&self) -> Vec<(ScreenKind, AnimationStep)> {
        self.steps.lock().clone()
    }
}

impl Animator for HeadlessAnimator {
    fn animate(&self, screen: &ScreenRef, step: AnimationStep) -> AnimationHandle {
        self.steps.lock().push((screen.kind(), step));

        let (handle, mut signals) = AnimationHandle::channel();
        let duration = self.duration_override.unwrap_or(step.duration);
        signals.native_started();

        if duration.is_zero() {
            signals.completed();
        } else {
            tokio::spawn(async move {
                tokio::time::sleep(duration).await;
                signals.completed();
            });
        }
        handle
    }
}

#[derive(Debug, Default)]
pub struct RecordingPlatform {
    closed: AtomicUsize,
    alerts: Mutex<Vec<String>>,
}

impl RecordingPlatform {
    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().clone()
    }
}

impl Platform for RecordingPlatform {
    fn close_app(&self) {
        log::info!("Platform: close app");
        self.closed.fetch_add(1, Ordering::SeqCst);
    }

    fn alert(&self, message: &str) {
        log::warn!("Platform alert: {}", message);
        self.alerts.lock().push(message.to_string());
    }
}

/// Page without content
#[derive(Debug, Default)]
pub struct BlankPage;

impl Page for BlankPage {
    fn create(_params: &Params) -> Result<Self> {
        Ok(BlankPage)
    }

    fn kind() -> ScreenKind {
        ScreenKind::new("blank")
    }
}

/// The recording collaborators bundled together
#[derive(Clone, Default)]
pub struct HeadlessHost {
    pub view_tree: Arc<RecordingViewTree>,
    pub animator: Arc<HeadlessAnimator>,
    pub platform: Arc<RecordingPlatform>,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_animator(animator: HeadlessAnimator) -> Self {
        Self {
            animator: Arc::new(animator),
            ..Self::default()
        }
    }

    /// A [`Host`] over these collaborators. Must be called within a tokio runtime.
    pub fn host(&self) -> Host {
        Host::new(self.view_tree.clone(), self.animator.clone(), self.platform.clone())
    }

    pub fn navigator(&self, config: NavConfig) -> Navigator {
        Navigator::new(config, self.host())
    }
}

impl Navigator {
    /// Register a content-free page under `kind`
    pub fn register_blank(&self, kind: ScreenKind, policy: CachePolicy) {
        self.register(kind, FnFactory::new(policy, |_: &Params| Ok(Box::new(BlankPage) as Box<dyn Page>)));
    }
}
