//! Text matching and primitive actions against the live tree
//!
//! Every primitive looks the tree up again when it is called. Matches are
//! taken in tree order; when the same text appears twice on screen the first
//! node in pre-order wins, there is no ranking by position or visibility.

use crate::element::{NodeAction, UIElement};
use crate::errors::AutomationError;
use crate::gesture::{GestureDescription, GestureHandle};
use crate::platforms::GlobalAction;
use crate::Automation;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

pub const LONG_PRESS_DURATION: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Forward,
    Backward,
}

impl Automation {
    /// Every node whose text or description contains `query`, in tree order
    pub fn find_by_text(&self, query: &str) -> Result<Vec<UIElement>, AutomationError> {
        Ok(self.engine()?.find_by_text(query))
    }

    /// Clicks the first match for `query` that is clickable itself or has a
    /// clickable ancestor. Later matches are not tried once a click lands.
    #[instrument(level = "debug", skip(self))]
    pub fn click_by_text(&self, query: &str) -> Result<(), AutomationError> {
        let candidates = self.find_by_text(query)?;
        if candidates.is_empty() {
            return Err(AutomationError::ElementNotFound(format!(
                "no element with text '{query}'"
            )));
        }

        for candidate in candidates {
            let Some(target) = clickable_self_or_ancestor(candidate) else {
                debug!("Candidate for '{}' has no clickable ancestor", query);
                continue;
            };
            match target.click() {
                Ok(()) => {
                    info!("Clicked {} for '{}'", target.label(), query);
                    return Ok(());
                }
                Err(e) => warn!("Click on {} rejected: {}", target.label(), e),
            }
        }

        Err(AutomationError::ElementNotFound(format!(
            "no clickable element for text '{query}'"
        )))
    }

    /// Types into the first editable field whose hint, text or description
    /// contains `hint` (case-insensitive).
    ///
    /// The first matching field is the only one attempted: its set-text
    /// result is returned as is, even on failure.
    #[instrument(level = "debug", skip(self, text))]
    pub fn type_into_field(&self, hint: &str, text: &str) -> Result<(), AutomationError> {
        let root = self.active_root()?;
        let mut editable = Vec::new();
        collect_editable(root, &mut editable);

        let field = editable
            .into_iter()
            .find(|field| field.matches_hint(hint))
            .ok_or_else(|| {
                AutomationError::ElementNotFound(format!("no editable field matching '{hint}'"))
            })?;

        if let Err(e) = field.focus() {
            debug!("Focus on {} rejected: {}", field.label(), e);
        }
        if let Err(e) = field.click() {
            debug!("Click on {} rejected: {}", field.label(), e);
        }
        field.set_text(text)
    }

    /// Replaces the text of whatever editable node holds input focus
    pub fn type_text(&self, text: &str) -> Result<(), AutomationError> {
        self.focused_input()?.set_text(text)
    }

    /// Submits the focused editable node through its IME action
    pub fn press_enter(&self) -> Result<(), AutomationError> {
        self.focused_input()?.perform_action(&NodeAction::ImeEnter)
    }

    /// Scrolls the first scrollable node of the active window
    pub fn scroll(&self, direction: ScrollDirection) -> Result<(), AutomationError> {
        let root = self.active_root()?;
        let container = first_scrollable(root).ok_or_else(|| {
            AutomationError::ElementNotFound("no scrollable element on screen".to_string())
        })?;
        let action = match direction {
            ScrollDirection::Forward => NodeAction::ScrollForward,
            ScrollDirection::Backward => NodeAction::ScrollBackward,
        };
        container.perform_action(&action)
    }

    /// Taps at screen coordinates. Returns once the backend accepted the
    /// gesture; await the handle to wait for the backend's completion.
    #[instrument(level = "debug", skip(self))]
    pub fn tap_at(
        &self,
        x: f32,
        y: f32,
        duration: Duration,
    ) -> Result<GestureHandle, AutomationError> {
        self.engine()?
            .dispatch_gesture(GestureDescription::tap(x, y, duration))
    }

    /// Press and hold at screen coordinates for [`LONG_PRESS_DURATION`]
    pub fn long_press(&self, x: f32, y: f32) -> Result<GestureHandle, AutomationError> {
        self.tap_at(x, y, LONG_PRESS_DURATION)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn swipe(
        &self,
        from: (f32, f32),
        to: (f32, f32),
        duration: Duration,
    ) -> Result<GestureHandle, AutomationError> {
        self.engine()?
            .dispatch_gesture(GestureDescription::swipe(from, to, duration))
    }

    pub fn dispatch_gesture(
        &self,
        gesture: GestureDescription,
    ) -> Result<GestureHandle, AutomationError> {
        self.engine()?.dispatch_gesture(gesture)
    }

    /// Success only means the OS accepted the action
    pub fn global_action(&self, action: GlobalAction) -> Result<(), AutomationError> {
        self.engine()?.perform_global_action(action)
    }

    pub fn back(&self) -> Result<(), AutomationError> {
        self.global_action(GlobalAction::Back)
    }

    pub fn home(&self) -> Result<(), AutomationError> {
        self.global_action(GlobalAction::Home)
    }

    pub fn recents(&self) -> Result<(), AutomationError> {
        self.global_action(GlobalAction::Recents)
    }

    pub fn notifications(&self) -> Result<(), AutomationError> {
        self.global_action(GlobalAction::Notifications)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn open_app(&self, package: &str) -> Result<(), AutomationError> {
        self.engine()?.launch_application(package)
    }

    fn focused_input(&self) -> Result<UIElement, AutomationError> {
        self.engine()?
            .focused_input()
            .ok_or_else(|| AutomationError::ElementNotFound("no focused input".to_string()))
    }
}

fn clickable_self_or_ancestor(node: UIElement) -> Option<UIElement> {
    let mut current = Some(node);
    while let Some(node) = current {
        if node.is_clickable() {
            return Some(node);
        }
        current = node.parent();
    }
    None
}

// Both walks are pre-order over an explicit stack so that deeply nested
// trees cannot exhaust the call stack.
fn collect_editable(root: UIElement, out: &mut Vec<UIElement>) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        stack.extend(node.children().into_iter().rev());
        if node.is_editable() {
            out.push(node);
        }
    }
}

fn first_scrollable(root: UIElement) -> Option<UIElement> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_scrollable() {
            return Some(node);
        }
        stack.extend(node.children().into_iter().rev());
    }
    None
}
