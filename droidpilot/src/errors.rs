use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AutomationError {
    /// No accessibility backend is bound or no window is in the foreground.
    /// Transient: callers poll or back off, it is never a defect.
    #[error("Automation unavailable: {0}")]
    Unavailable(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Action rejected by backend: {0}")]
    ActionRejected(String),

    #[error("Gesture cancelled: {0}")]
    GestureCancelled(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Platform-specific error: {0}")]
    PlatformError(String),
}

impl AutomationError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, AutomationError::Unavailable(_))
    }
}
