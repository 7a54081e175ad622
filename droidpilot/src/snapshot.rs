//! Bounded, point-in-time captures of the foreground element tree
//!
//! A snapshot is produced fresh for every query and owned by the caller that
//! asked for it. Nothing in this crate keeps one around, because the tree it
//! was taken from keeps mutating underneath.

use crate::element::{ElementBounds, UIElement};
use serde::{Deserialize, Serialize};

/// Deepest level of the tree that capture descends into
pub const MAX_CAPTURE_DEPTH: usize = 15;
/// Most elements a snapshot carries
pub const MAX_SNAPSHOT_ELEMENTS: usize = 50;

/// One node of the foreground tree as it looked at capture time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenElement {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Widget category, e.g. `android.widget.EditText`
    pub class_name: String,
    pub clickable: bool,
    pub editable: bool,
    pub scrollable: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hint: String,
    pub bounds: ElementBounds,
}

impl ScreenElement {
    fn from_live(node: &UIElement) -> Self {
        Self {
            text: node.text_or_empty(),
            description: node.description_or_empty(),
            class_name: node.class_name(),
            clickable: node.is_clickable(),
            editable: node.is_editable(),
            scrollable: node.is_scrollable(),
            hint: node.hint_text().unwrap_or_default(),
            bounds: {
                let raw = node.bounds();
                ElementBounds::new(raw.left, raw.top, raw.right, raw.bottom)
            },
        }
    }

    /// Nodes that carry no text and cannot be clicked or edited are layout
    /// containers and are not worth reporting.
    fn is_retained(&self) -> bool {
        !self.text.is_empty() || self.clickable || self.editable
    }

    pub fn is_interactive(&self) -> bool {
        self.clickable || self.editable
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenSnapshot {
    /// Package that owns the active window
    pub package_name: String,
    /// Retained elements found before truncation
    pub element_count: usize,
    pub elements: Vec<ScreenElement>,
}

impl ScreenSnapshot {
    /// Walks the tree under `root` in pre-order. Descent stops at
    /// [`MAX_CAPTURE_DEPTH`]; every retained node within that depth is counted
    /// but only the first [`MAX_SNAPSHOT_ELEMENTS`] are kept.
    pub(crate) fn capture_from(root: &UIElement) -> Self {
        let mut walk = Walk {
            elements: Vec::new(),
            count: 0,
        };
        walk.visit(root, 0);
        Self {
            package_name: root.package_name().unwrap_or_default(),
            element_count: walk.count,
            elements: walk.elements,
        }
    }

    pub fn is_truncated(&self) -> bool {
        self.elements.len() < self.element_count
    }

    /// Text-bearing elements that cannot be interacted with, in tree order
    pub fn passive_text(&self) -> impl Iterator<Item = &ScreenElement> {
        self.elements
            .iter()
            .filter(|e| !e.is_interactive() && !e.text.trim().is_empty())
    }

    /// Stable digest of what the snapshot shows, used to detect a settled
    /// screen across consecutive captures.
    pub fn content_hash(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.package_name.as_bytes());
        hasher.update(&(self.element_count as u64).to_le_bytes());
        for element in &self.elements {
            for field in [
                &element.text,
                &element.description,
                &element.class_name,
                &element.hint,
            ] {
                hasher.update(&(field.len() as u64).to_le_bytes());
                hasher.update(field.as_bytes());
            }
            hasher.update(&[
                element.clickable as u8,
                element.editable as u8,
                element.scrollable as u8,
            ]);
            for edge in [
                element.bounds.left,
                element.bounds.top,
                element.bounds.right,
                element.bounds.bottom,
            ] {
                hasher.update(&edge.to_le_bytes());
            }
        }
        hasher.finalize()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

struct Walk {
    elements: Vec<ScreenElement>,
    count: usize,
}

impl Walk {
    fn visit(&mut self, node: &UIElement, depth: usize) {
        if depth > MAX_CAPTURE_DEPTH {
            return;
        }
        let element = ScreenElement::from_live(node);
        if element.is_retained() {
            self.count += 1;
            if self.elements.len() < MAX_SNAPSHOT_ELEMENTS {
                self.elements.push(element);
            }
        }
        for child in node.children() {
            self.visit(&child, depth + 1);
        }
    }
}
