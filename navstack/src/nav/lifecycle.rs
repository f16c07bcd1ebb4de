use serde::{Deserialize, Serialize};

/// Lifecycle state of a screen instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenLifecycle {
    /// Constructed by its factory, not yet shown
    Created,

    /// On screen (the active page or a visible popup)
    Active,

    /// Off screen but alive (cached, or waiting for deferred disposal)
    Background,

    /// Disposal in progress
    Disposing,

    /// Released, must not be shown again
    Disposed,
}

impl ScreenLifecycle {
    pub fn is_alive(&self) -> bool {
        !matches!(self, ScreenLifecycle::Disposing | ScreenLifecycle::Disposed)
    }
}

/// What happens to a screen when navigation moves away from it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CachePolicy {
    /// Keep the instance alive and reuse it on the next visit
    Keep,

    /// Dispose after navigating away (default)
    #[default]
    Dispose,
}

/// Reason a screen is being disposed, used for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisposeReason {
    /// Superseded by navigation and not cache-eligible
    NavigatedAway,

    /// Popup hidden and not cache-eligible
    PopupHidden,

    /// Explicit cache eviction
    Evicted,

    /// Replaced by a fresh instance of the same kind
    Reloaded,

    /// Navigator teardown
    Shutdown,
}

/// Visibility phase of a popup
///
/// State machine: Unshown → Showing → FullyVisible → Hiding → Hidden | Disposed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PopupPhase {
    #[default]
    Unshown,

    /// Added to the popup stack, enter animation running
    Showing,

    /// Enter animation complete
    FullyVisible,

    /// Exit animation running
    Hiding,

    /// Off screen and kept in cache for reuse
    Hidden,

    /// Removed and disposed
    Disposed,
}
