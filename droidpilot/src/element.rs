use crate::errors::AutomationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Debug;
use tracing::instrument;

/// Screen rectangle in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawBounds")]
pub struct ElementBounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl ElementBounds {
    /// Builds bounds from raw edges, swapping inverted edges so that
    /// `left <= right` and `top <= bottom` always hold.
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left: left.min(right),
            top: top.min(bottom),
            right: left.max(right),
            bottom: top.max(bottom),
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn center(&self) -> (i32, i32) {
        (
            self.left + self.width() / 2,
            self.top + self.height() / 2,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// Edges as they arrive on the wire, before normalization
#[derive(Deserialize)]
struct RawBounds {
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
}

impl From<RawBounds> for ElementBounds {
    fn from(raw: RawBounds) -> Self {
        ElementBounds::new(raw.left, raw.top, raw.right, raw.bottom)
    }
}

impl fmt::Display for ElementBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{},{}][{},{}]",
            self.left, self.top, self.right, self.bottom
        )
    }
}

/// Node-level accessibility actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeAction {
    Click,
    LongClick,
    Focus,
    /// Structured replacement of the node's editable text
    SetText(String),
    /// IME submit on the focused editable node
    ImeEnter,
    ScrollForward,
    ScrollBackward,
}

impl NodeAction {
    pub fn name(&self) -> &'static str {
        match self {
            NodeAction::Click => "click",
            NodeAction::LongClick => "long_click",
            NodeAction::Focus => "focus",
            NodeAction::SetText(_) => "set_text",
            NodeAction::ImeEnter => "ime_enter",
            NodeAction::ScrollForward => "scroll_forward",
            NodeAction::ScrollBackward => "scroll_backward",
        }
    }
}

/// Interface for backend-specific node implementations.
///
/// Every getter reads the live node, so two calls may disagree if the
/// foreground app re-rendered in between.
pub trait UIElementImpl: Send + Sync + Debug {
    fn text(&self) -> Option<String>;
    fn content_description(&self) -> Option<String>;
    /// Widget category, e.g. `android.widget.Button`
    fn class_name(&self) -> String;
    fn hint_text(&self) -> Option<String>;
    fn package_name(&self) -> Option<String>;
    fn is_clickable(&self) -> bool;
    fn is_editable(&self) -> bool;
    fn is_scrollable(&self) -> bool;
    fn is_focused(&self) -> bool;
    fn bounds(&self) -> ElementBounds;
    fn children(&self) -> Vec<UIElement>;
    fn parent(&self) -> Option<UIElement>;
    fn perform_action(&self, action: &NodeAction) -> Result<(), AutomationError>;
}

/// Live handle to a node of the foreground application's tree.
///
/// Handles are only valid for the call that obtained them and must not be
/// stored across calls.
#[derive(Debug)]
pub struct UIElement {
    inner: Box<dyn UIElementImpl>,
}

impl UIElement {
    pub fn new(impl_: Box<dyn UIElementImpl>) -> Self {
        Self { inner: impl_ }
    }

    pub fn text(&self) -> Option<String> {
        self.inner.text()
    }

    pub fn content_description(&self) -> Option<String> {
        self.inner.content_description()
    }

    pub fn class_name(&self) -> String {
        self.inner.class_name()
    }

    pub fn hint_text(&self) -> Option<String> {
        self.inner.hint_text()
    }

    pub fn package_name(&self) -> Option<String> {
        self.inner.package_name()
    }

    pub fn is_clickable(&self) -> bool {
        self.inner.is_clickable()
    }

    pub fn is_editable(&self) -> bool {
        self.inner.is_editable()
    }

    pub fn is_scrollable(&self) -> bool {
        self.inner.is_scrollable()
    }

    pub fn is_focused(&self) -> bool {
        self.inner.is_focused()
    }

    pub fn bounds(&self) -> ElementBounds {
        self.inner.bounds()
    }

    pub fn children(&self) -> Vec<UIElement> {
        self.inner.children()
    }

    pub fn parent(&self) -> Option<UIElement> {
        self.inner.parent()
    }

    #[instrument(level = "debug", skip(self), fields(element = %self.label()))]
    pub fn click(&self) -> Result<(), AutomationError> {
        self.inner.perform_action(&NodeAction::Click)
    }

    pub fn focus(&self) -> Result<(), AutomationError> {
        self.inner.perform_action(&NodeAction::Focus)
    }

    #[instrument(level = "debug", skip(self, text), fields(element = %self.label(), len = text.len()))]
    pub fn set_text(&self, text: &str) -> Result<(), AutomationError> {
        self.inner
            .perform_action(&NodeAction::SetText(text.to_string()))
    }

    pub fn perform_action(&self, action: &NodeAction) -> Result<(), AutomationError> {
        self.inner.perform_action(action)
    }

    pub fn text_or_empty(&self) -> String {
        self.text().unwrap_or_default()
    }

    pub fn description_or_empty(&self) -> String {
        self.content_description().unwrap_or_default()
    }

    /// Human-readable identifier used in logs
    pub fn label(&self) -> String {
        let class = self.class_name();
        let short = class.rsplit('.').next().unwrap_or(&class).to_string();
        match self.text().filter(|t| !t.is_empty()) {
            Some(text) => format!("{short} '{text}'"),
            None => match self.content_description().filter(|d| !d.is_empty()) {
                Some(desc) => format!("{short} [{desc}]"),
                None => short,
            },
        }
    }

    /// Case-insensitive containment against the node's live text or
    /// accessibility description.
    pub fn matches_text(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.text()
            .map(|t| t.to_lowercase().contains(&needle))
            .unwrap_or(false)
            || self
                .content_description()
                .map(|d| d.to_lowercase().contains(&needle))
                .unwrap_or(false)
    }

    /// Case-insensitive containment against hint, current text and description.
    pub fn matches_hint(&self, hint: &str) -> bool {
        let needle = hint.to_lowercase();
        [self.hint_text(), self.text(), self.content_description()]
            .into_iter()
            .flatten()
            .any(|value| value.to_lowercase().contains(&needle))
    }
}
