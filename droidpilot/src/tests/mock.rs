//! Scripted accessibility tree for exercising matching and workflows
//! without a device.

use crate::element::{ElementBounds, NodeAction, UIElement, UIElementImpl};
use crate::errors::AutomationError;
use crate::gesture::{GestureDescription, GestureHandle};
use crate::platforms::{AccessibilityEngine, GlobalAction};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
pub struct NodeSpec {
    pub class_name: String,
    pub text: Option<String>,
    pub description: Option<String>,
    pub hint: Option<String>,
    pub clickable: bool,
    pub editable: bool,
    pub scrollable: bool,
    pub focused: bool,
    pub rejects_actions: bool,
    pub bounds: ElementBounds,
}

impl NodeSpec {
    pub fn new(class_name: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
            bounds: ElementBounds::new(0, 0, 100, 40),
            ..Default::default()
        }
    }

    pub fn layout() -> Self {
        Self::new("android.widget.FrameLayout")
    }

    pub fn label(text: &str) -> Self {
        Self::new("android.widget.TextView").text(text)
    }

    pub fn button(text: &str) -> Self {
        Self::new("android.widget.Button").text(text).clickable()
    }

    pub fn field(hint: &str) -> Self {
        Self::new("android.widget.EditText")
            .hint(hint)
            .editable()
            .clickable()
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn hint(mut self, hint: &str) -> Self {
        self.hint = Some(hint.to_string());
        self
    }

    pub fn clickable(mut self) -> Self {
        self.clickable = true;
        self
    }

    pub fn editable(mut self) -> Self {
        self.editable = true;
        self
    }

    pub fn scrollable(mut self) -> Self {
        self.scrollable = true;
        self
    }

    pub fn focused(mut self) -> Self {
        self.focused = true;
        self
    }

    pub fn rejecting(mut self) -> Self {
        self.rejects_actions = true;
        self
    }
}

#[derive(Debug)]
struct NodeData {
    spec: NodeSpec,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// Node tree owned by the test; ids are insertion indices, root is 0.
#[derive(Debug)]
pub struct MockTree {
    package: String,
    nodes: Mutex<Vec<NodeData>>,
    actions: Mutex<Vec<(usize, NodeAction)>>,
}

pub const ROOT: usize = 0;

impl MockTree {
    pub fn new(package: &str) -> Arc<Self> {
        Arc::new(Self {
            package: package.to_string(),
            nodes: Mutex::new(vec![NodeData {
                spec: NodeSpec::layout(),
                parent: None,
                children: Vec::new(),
            }]),
            actions: Mutex::new(Vec::new()),
        })
    }

    pub fn add(&self, parent: usize, spec: NodeSpec) -> usize {
        let mut nodes = self.nodes.lock().unwrap();
        let id = nodes.len();
        nodes.push(NodeData {
            spec,
            parent: Some(parent),
            children: Vec::new(),
        });
        nodes[parent].children.push(id);
        id
    }

    pub fn element(self: &Arc<Self>, id: usize) -> UIElement {
        UIElement::new(Box::new(MockElement {
            tree: Arc::clone(self),
            id,
        }))
    }

    /// Every action performed so far, in order
    pub fn actions(&self) -> Vec<(usize, NodeAction)> {
        self.actions.lock().unwrap().clone()
    }

    pub fn actions_on(&self, id: usize) -> Vec<NodeAction> {
        self.actions()
            .into_iter()
            .filter(|(node, _)| *node == id)
            .map(|(_, action)| action)
            .collect()
    }

    pub fn text_of(&self, id: usize) -> Option<String> {
        self.spec(id).text
    }

    fn spec(&self, id: usize) -> NodeSpec {
        self.nodes.lock().unwrap()[id].spec.clone()
    }

    fn focused_editable(&self) -> Option<usize> {
        self.nodes
            .lock()
            .unwrap()
            .iter()
            .position(|n| n.spec.focused && n.spec.editable)
    }

    fn perform(&self, id: usize, action: &NodeAction) -> Result<(), AutomationError> {
        let mut nodes = self.nodes.lock().unwrap();
        let spec = nodes[id].spec.clone();
        if spec.rejects_actions {
            return Err(AutomationError::ActionRejected(format!(
                "node {id} rejected {}",
                action.name()
            )));
        }
        let allowed = match action {
            NodeAction::Click | NodeAction::LongClick => spec.clickable,
            NodeAction::Focus => spec.editable || spec.clickable,
            NodeAction::SetText(_) | NodeAction::ImeEnter => spec.editable,
            NodeAction::ScrollForward | NodeAction::ScrollBackward => spec.scrollable,
        };
        if !allowed {
            return Err(AutomationError::ActionRejected(format!(
                "node {id} does not support {}",
                action.name()
            )));
        }
        match action {
            NodeAction::Focus => {
                for node in nodes.iter_mut() {
                    node.spec.focused = false;
                }
                nodes[id].spec.focused = true;
            }
            NodeAction::SetText(text) => nodes[id].spec.text = Some(text.clone()),
            _ => {}
        }
        self.actions.lock().unwrap().push((id, action.clone()));
        Ok(())
    }
}

#[derive(Debug)]
struct MockElement {
    tree: Arc<MockTree>,
    id: usize,
}

impl UIElementImpl for MockElement {
    fn text(&self) -> Option<String> {
        self.tree.spec(self.id).text
    }

    fn content_description(&self) -> Option<String> {
        self.tree.spec(self.id).description
    }

    fn class_name(&self) -> String {
        self.tree.spec(self.id).class_name
    }

    fn hint_text(&self) -> Option<String> {
        self.tree.spec(self.id).hint
    }

    fn package_name(&self) -> Option<String> {
        Some(self.tree.package.clone())
    }

    fn is_clickable(&self) -> bool {
        self.tree.spec(self.id).clickable
    }

    fn is_editable(&self) -> bool {
        self.tree.spec(self.id).editable
    }

    fn is_scrollable(&self) -> bool {
        self.tree.spec(self.id).scrollable
    }

    fn is_focused(&self) -> bool {
        self.tree.spec(self.id).focused
    }

    fn bounds(&self) -> ElementBounds {
        self.tree.spec(self.id).bounds
    }

    fn children(&self) -> Vec<UIElement> {
        let children = self.tree.nodes.lock().unwrap()[self.id].children.clone();
        children
            .into_iter()
            .map(|id| self.tree.element(id))
            .collect()
    }

    fn parent(&self) -> Option<UIElement> {
        let parent = self.tree.nodes.lock().unwrap()[self.id].parent;
        parent.map(|id| self.tree.element(id))
    }

    fn perform_action(&self, action: &NodeAction) -> Result<(), AutomationError> {
        self.tree.perform(self.id, action)
    }
}

#[derive(Debug, Default)]
pub struct MockEngine {
    tree: Option<Arc<MockTree>>,
    pub globals: Mutex<Vec<GlobalAction>>,
    pub gestures: Mutex<Vec<GestureDescription>>,
    pub launched: Mutex<Vec<String>>,
}

impl MockEngine {
    pub fn with_tree(tree: Arc<MockTree>) -> Arc<Self> {
        Arc::new(Self {
            tree: Some(tree),
            ..Default::default()
        })
    }

    /// Bound service with no focused window
    pub fn without_window() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl AccessibilityEngine for MockEngine {
    fn root_in_active_window(&self) -> Option<UIElement> {
        self.tree.as_ref().map(|tree| tree.element(ROOT))
    }

    fn focused_input(&self) -> Option<UIElement> {
        let tree = self.tree.as_ref()?;
        tree.focused_editable().map(|id| tree.element(id))
    }

    fn perform_global_action(&self, action: GlobalAction) -> Result<(), AutomationError> {
        self.globals.lock().unwrap().push(action);
        Ok(())
    }

    fn dispatch_gesture(
        &self,
        gesture: GestureDescription,
    ) -> Result<GestureHandle, AutomationError> {
        self.gestures.lock().unwrap().push(gesture);
        Ok(GestureHandle::completed())
    }

    fn launch_application(&self, package: &str) -> Result<(), AutomationError> {
        self.launched.lock().unwrap().push(package.to_string());
        Ok(())
    }
}
