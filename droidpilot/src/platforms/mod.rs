use crate::errors::AutomationError;
use crate::gesture::{GestureDescription, GestureHandle};
use crate::UIElement;
use serde::{Deserialize, Serialize};

/// OS-level navigation actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlobalAction {
    Back,
    Home,
    Recents,
    Notifications,
    QuickSettings,
}

/// The trait the bound accessibility service implements.
///
/// Implementations forward to the platform's automation service. None of the
/// calls may block on the foreground app re-rendering.
pub trait AccessibilityEngine: Send + Sync {
    /// Root of the active window, or `None` when no window is focused
    fn root_in_active_window(&self) -> Option<UIElement>;

    /// Editable node currently holding input focus
    fn focused_input(&self) -> Option<UIElement>;

    /// Every node whose live text or description contains `query`, in
    /// pre-order. Backends with a native text search should override this.
    fn find_by_text(&self, query: &str) -> Vec<UIElement> {
        let mut found = Vec::new();
        if let Some(root) = self.root_in_active_window() {
            collect_matching(root, query, &mut found);
        }
        found
    }

    fn perform_global_action(&self, action: GlobalAction) -> Result<(), AutomationError>;

    /// Hand a pointer path to the OS; returns once the dispatch is accepted
    fn dispatch_gesture(
        &self,
        gesture: GestureDescription,
    ) -> Result<GestureHandle, AutomationError>;

    /// Bring an application to the foreground by package identifier
    fn launch_application(&self, package: &str) -> Result<(), AutomationError>;
}

/// Iterative pre-order walk; foreground trees can nest arbitrarily deep.
fn collect_matching(root: UIElement, query: &str, found: &mut Vec<UIElement>) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        stack.extend(node.children().into_iter().rev());
        if node.matches_text(query) {
            found.push(node);
        }
    }
}
