use thiserror::Error;

use crate::nav::ScreenKind;

/// Failures raised by navigation and popup operations.
///
/// Public operations return `anyhow::Result`; use
/// `err.downcast_ref::<NavError>()` to branch on the variant.
#[derive(Debug, Error)]
pub enum NavError {
    /// The requested operation is not valid in the current navigation state
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// A popup was dismissed with a result of the wrong type
    #[error("popup {kind} expects a result of type {expected}, got {actual}")]
    ResultTypeMismatch {
        kind: ScreenKind,
        expected: &'static str,
        actual: &'static str,
    },

    /// Only the topmost popup can be hidden
    #[error("popup {requested} is not the topmost popup (top is {top})")]
    NotTopmost {
        requested: ScreenKind,
        top: ScreenKind,
    },

    /// A navigation parameter could not be viewed as the requested type
    #[error("parameter '{key}' cannot be read as {expected}: {source}")]
    TypeConversion {
        key: String,
        expected: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A navigation parameter value could not be serialized into the map
    #[error("parameter '{key}' could not be stored: {source}")]
    ParamEncoding {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// No factory has been registered for the screen kind
    #[error("no factory registered for screen {0}")]
    UnknownScreen(ScreenKind),

    /// The instruction queue consumer is gone (navigator shut down)
    #[error("navigator has been shut down")]
    ShutDown,
}

impl NavError {
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        NavError::InvalidOperation(message.into())
    }

    /// True for the invalid-operation family (empty back stack, result mismatch, non-topmost hide)
    pub fn is_invalid_operation(&self) -> bool {
        matches!(
            self,
            NavError::InvalidOperation(_) | NavError::ResultTypeMismatch { .. } | NavError::NotTopmost { .. }
        )
    }
}
