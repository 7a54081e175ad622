//! Android app automation through the accessibility tree, plus supervision of
//! the on-device agent worker.
//!
//! The automation half reads another application's UI tree, matches elements
//! by text and drives them with primitive actions that workflows compose into
//! single tool calls. The daemon half keeps the background worker alive and
//! talks to the native agent engine across a fault-isolated boundary.

use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, instrument};

pub mod actions;
pub mod capabilities;
pub mod daemon;
pub mod element;
pub mod errors;
pub mod gesture;
pub mod platforms;
pub mod readiness;
pub mod snapshot;
#[cfg(test)]
mod tests;
pub mod workflow;

pub use element::{ElementBounds, NodeAction, UIElement, UIElementImpl};
pub use errors::AutomationError;
pub use gesture::{GestureDescription, GestureHandle, GestureOutcome};
pub use platforms::{AccessibilityEngine, GlobalAction};
pub use snapshot::{ScreenElement, ScreenSnapshot};
pub use workflow::{WorkflowEngine, WorkflowResult};

/// The main entry point for UI automation.
///
/// Holds the accessibility service binding. The platform glue calls
/// [`Automation::bind`] when the service connects and [`Automation::unbind`]
/// when it goes away; every primitive fails with
/// [`AutomationError::Unavailable`] while nothing is bound. Clones share the
/// same binding.
#[derive(Clone, Default)]
pub struct Automation {
    engine: Arc<RwLock<Option<Arc<dyn AccessibilityEngine>>>>,
}

impl Automation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor that binds immediately
    pub fn with_engine(engine: Arc<dyn AccessibilityEngine>) -> Self {
        let automation = Self::new();
        automation.bind(engine);
        automation
    }

    pub fn bind(&self, engine: Arc<dyn AccessibilityEngine>) {
        *self.engine.write().unwrap_or_else(PoisonError::into_inner) = Some(engine);
        info!("Accessibility service bound");
    }

    pub fn unbind(&self) {
        let previous = self
            .engine
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            info!("Accessibility service unbound");
        }
    }

    pub fn is_bound(&self) -> bool {
        self.engine
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub(crate) fn engine(&self) -> Result<Arc<dyn AccessibilityEngine>, AutomationError> {
        self.engine
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| {
                AutomationError::Unavailable("accessibility service is not bound".to_string())
            })
    }

    pub(crate) fn active_root(&self) -> Result<UIElement, AutomationError> {
        self.engine()?
            .root_in_active_window()
            .ok_or_else(|| AutomationError::Unavailable("no active window".to_string()))
    }

    /// Captures the foreground tree into a bounded snapshot.
    ///
    /// Returns [`AutomationError::Unavailable`] when no service is bound or no
    /// window is active; that is an expected state and callers may poll.
    #[instrument(level = "debug", skip(self))]
    pub fn capture(&self) -> Result<crate::ScreenSnapshot, AutomationError> {
        let root = self.active_root()?;
        let snapshot = crate::ScreenSnapshot::capture_from(&root);
        debug!(
            package = %snapshot.package_name,
            element_count = snapshot.element_count,
            kept = snapshot.elements.len(),
            "Captured screen"
        );
        Ok(snapshot)
    }
}

impl std::fmt::Debug for Automation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Automation")
            .field("bound", &self.is_bound())
            .finish()
    }
}
