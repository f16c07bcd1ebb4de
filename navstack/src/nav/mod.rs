pub mod back_button;
pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod headless;
pub mod history;
pub mod host;
pub mod lifecycle;
pub mod navigator;
pub mod params;
pub mod popup;
pub mod queue;
pub mod screen;
pub mod transition;
pub mod transitor;

pub use back_button::{FlightGuard, HardwareBackOutcome, SingleFlight};
pub use cache::{CacheEntry, PageCache};
pub use config::{NavConfig, NavConfigBuilder};
pub use error::NavError;
pub use events::{EventBus, Handler, HardwareBackArgs, NavEvent, SubscriptionId, Topic};
pub use history::{BackStack, HistoryEntry};
pub use host::{
    AnimationHandle, AnimationSignals, Animator, CachePredicate, Dispatcher, Host, Platform, PolicyPredicate,
    TokioDispatcher, ViewTree,
};
pub use lifecycle::{CachePolicy, DisposeReason, PopupPhase, ScreenLifecycle};
pub use navigator::{NavSnapshot, Navigator, Target};
pub use params::{IntoParams, Params, RevisitMode};
pub use popup::{PendingResult, Popup, PopupRef, ResultValue};
pub use queue::InstructionQueue;
pub use screen::{FnFactory, Page, Screen, ScreenFactory, ScreenKind, ScreenRef};
pub use transition::{AnimationStep, Transition, TransitionDurations, TransitionPlan, ViewState};
pub use transitor::Transitor;
