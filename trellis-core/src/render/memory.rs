//! An in-memory [`Host`].
//!
//! `MemoryHost` keeps a plain node tree and a log of every operation the
//! renderer issued. It backs the test suite and is handy for headless
//! rendering: [`MemoryHost::inner_html`] and [`MemoryHost::snapshot`] turn the
//! tree into something to assert on.
//!
//! The tree looks like this:
//!
//! ```text
//! document
//! ├── div#app        <- root(), where trees are usually rendered
//! └── div#<id>       <- add_target(id), for teleports
//! ```

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::json;
use smallvec::SmallVec;

use super::host::{Host, NodeId};
use super::vnode::{to_display_string, Handler, PropValue};
use crate::reactive::Value;

/// One call the renderer made on the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostOp {
    CreateElement {
        id: NodeId,
        tag: String,
    },
    CreateText {
        id: NodeId,
        text: String,
    },
    SetText {
        id: NodeId,
        text: String,
    },
    SetElementText {
        id: NodeId,
        text: String,
    },
    Insert {
        child: NodeId,
        parent: NodeId,
        anchor: Option<NodeId>,
    },
    Remove {
        id: NodeId,
    },
    PatchProp {
        id: NodeId,
        key: String,
    },
}

enum NodeKind {
    Element {
        tag: String,
        attrs: IndexMap<String, Value>,
        listeners: IndexMap<String, Handler>,
    },
    Text(String),
}

struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: SmallVec<[NodeId; 4]>,
}

impl Node {
    fn element(tag: &str) -> Self {
        Self {
            kind: NodeKind::Element {
                tag: tag.to_string(),
                attrs: IndexMap::new(),
                listeners: IndexMap::new(),
            },
            parent: None,
            children: SmallVec::new(),
        }
    }

    fn text(text: &str) -> Self {
        Self {
            kind: NodeKind::Text(text.to_string()),
            parent: None,
            children: SmallVec::new(),
        }
    }
}

#[derive(Default)]
struct State {
    nodes: IndexMap<NodeId, Node>,
    ops: Vec<HostOp>,
}

impl State {
    fn add(&mut self, node: Node) -> NodeId {
        let id = NodeId::new();
        self.nodes.insert(id, node);
        id
    }

    fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.nodes.get_mut(&child).and_then(|n| n.parent.take()) else {
            return;
        };
        if let Some(parent) = self.nodes.get_mut(&parent) {
            parent.children.retain(|c| *c != child);
        }
    }

    fn attach(&mut self, child: NodeId, parent: NodeId, anchor: Option<NodeId>) {
        self.detach(child);
        let Some(node) = self.nodes.get_mut(&parent) else {
            tracing::warn!(%parent, "insert into unknown node");
            return;
        };
        let index = anchor
            .and_then(|a| node.children.iter().position(|c| *c == a))
            .unwrap_or(node.children.len());
        node.children.insert(index, child);
        if let Some(child) = self.nodes.get_mut(&child) {
            child.parent = Some(parent);
        }
    }

    fn find(&self, from: NodeId, matches: &dyn Fn(&Node) -> bool) -> Option<NodeId> {
        let node = self.nodes.get(&from)?;
        if matches(node) {
            return Some(from);
        }
        node.children.iter().find_map(|c| self.find(*c, matches))
    }

    fn text_content(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        match &node.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element { .. } => {
                for child in &node.children {
                    self.text_content(*child, out);
                }
            }
        }
    }

    fn outer_html(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        match &node.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element { tag, attrs, .. } => {
                out.push('<');
                out.push_str(tag);
                for (key, value) in attrs {
                    out.push_str(&format!(" {key}=\"{}\"", to_display_string(value)));
                }
                out.push('>');
                self.inner_html(id, out);
                out.push_str(&format!("</{tag}>"));
            }
        }
    }

    fn inner_html(&self, id: NodeId, out: &mut String) {
        if let Some(node) = self.nodes.get(&id) {
            for child in &node.children {
                self.outer_html(*child, out);
            }
        }
    }

    fn snapshot(&self, id: NodeId) -> serde_json::Value {
        let Some(node) = self.nodes.get(&id) else {
            return serde_json::Value::Null;
        };
        match &node.kind {
            NodeKind::Text(text) => json!(text),
            NodeKind::Element { tag, attrs, .. } => json!({
                "tag": tag,
                "attrs": attrs,
                "children": node
                    .children
                    .iter()
                    .map(|c| self.snapshot(*c))
                    .collect::<Vec<_>>(),
            }),
        }
    }
}

/// `onClick` -> `click`.
fn event_name(key: &str) -> Option<String> {
    let rest = key.strip_prefix("on")?;
    let mut chars = rest.chars();
    let first = chars.next().filter(char::is_ascii_uppercase)?;
    Some(first.to_ascii_lowercase().to_string() + chars.as_str())
}

fn normalize_class(value: &Value) -> String {
    match value {
        Value::List(items) => items
            .iter()
            .map(normalize_class)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        Value::Object(_) | Value::Reactive(_) => {
            let Some(object) = value.target() else {
                return String::new();
            };
            object
                .keys()
                .into_iter()
                .filter(|k| object.get(k).is_some_and(|v| is_truthy(&v)))
                .collect::<Vec<_>>()
                .join(" ")
        }
        other => to_display_string(other),
    }
}

fn normalize_style(value: &Value) -> String {
    match value.target() {
        Some(object) => object
            .keys()
            .into_iter()
            .filter_map(|k| {
                let v = object.get(&k)?;
                (!v.is_null()).then(|| format!("{k}: {};", to_display_string(&v)))
            })
            .collect::<Vec<_>>()
            .join(" "),
        None => to_display_string(value),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::Int(i) => *i != 0,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// In-memory host that records every operation.
pub struct MemoryHost {
    document: NodeId,
    root: NodeId,
    state: Mutex<State>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    pub fn new() -> Self {
        let mut state = State::default();
        let document = state.add(Node::element("document"));
        let root = state.add(Node::element("div"));
        if let Some(NodeKind::Element { attrs, .. }) = state.nodes.get_mut(&root).map(|n| &mut n.kind) {
            attrs.insert("id".into(), Value::from("app"));
        }
        state.attach(root, document, None);
        Self {
            document,
            root,
            state: Mutex::new(state),
        }
    }

    /// The `div#app` container.
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn document(&self) -> NodeId {
        self.document
    }

    /// Append a `div` with the given id to the document, outside the root.
    pub fn add_target(&self, id: &str) -> NodeId {
        let mut state = self.state.lock();
        let mut node = Node::element("div");
        if let NodeKind::Element { attrs, .. } = &mut node.kind {
            attrs.insert("id".into(), Value::from(id));
        }
        let target = state.add(node);
        let document = self.document;
        state.attach(target, document, None);
        target
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let state = self.state.lock();
        state
            .nodes
            .get(&id)
            .map(|n| n.children.to_vec())
            .unwrap_or_default()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.state.lock().nodes.get(&id).and_then(|n| n.parent)
    }

    pub fn tag(&self, id: NodeId) -> Option<String> {
        match &self.state.lock().nodes.get(&id)?.kind {
            NodeKind::Element { tag, .. } => Some(tag.clone()),
            NodeKind::Text(_) => None,
        }
    }

    /// Content of a text node.
    pub fn text(&self, id: NodeId) -> Option<String> {
        match &self.state.lock().nodes.get(&id)?.kind {
            NodeKind::Text(text) => Some(text.clone()),
            NodeKind::Element { .. } => None,
        }
    }

    /// Concatenated text of `id` and its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.state.lock().text_content(id, &mut out);
        out
    }

    pub fn attr(&self, id: NodeId, key: &str) -> Option<Value> {
        match &self.state.lock().nodes.get(&id)?.kind {
            NodeKind::Element { attrs, .. } => attrs.get(key).cloned(),
            NodeKind::Text(_) => None,
        }
    }

    pub fn has_listener(&self, id: NodeId, event: &str) -> bool {
        match self.state.lock().nodes.get(&id).map(|n| &n.kind) {
            Some(NodeKind::Element { listeners, .. }) => listeners.contains_key(event),
            _ => false,
        }
    }

    /// Call the listener for `event` on `id`. Returns whether one was found.
    pub fn dispatch(&self, id: NodeId, event: &str, args: &[Value]) -> bool {
        // Handlers may re-enter the host; release the lock first
        let handler = match self.state.lock().nodes.get(&id).map(|n| &n.kind) {
            Some(NodeKind::Element { listeners, .. }) => listeners.get(event).cloned(),
            _ => None,
        };
        match handler {
            Some(handler) => {
                handler.call(args);
                true
            }
            None => false,
        }
    }

    pub fn ops(&self) -> Vec<HostOp> {
        self.state.lock().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.state.lock().ops.clear();
    }

    /// Number of `Insert` operations logged, mounts and moves alike.
    pub fn insert_count(&self) -> usize {
        self.state
            .lock()
            .ops
            .iter()
            .filter(|op| matches!(op, HostOp::Insert { .. }))
            .count()
    }

    /// Nodes ever created, attached or not.
    pub fn node_count(&self) -> usize {
        self.state.lock().nodes.len()
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.state.lock().inner_html(id, &mut out);
        out
    }

    /// JSON view of the subtree at `id`.
    pub fn snapshot(&self, id: NodeId) -> serde_json::Value {
        self.state.lock().snapshot(id)
    }
}

impl Host for MemoryHost {
    fn create_element(&self, tag: &str) -> NodeId {
        let mut state = self.state.lock();
        let id = state.add(Node::element(tag));
        state.ops.push(HostOp::CreateElement {
            id,
            tag: tag.to_string(),
        });
        id
    }

    fn create_text(&self, text: &str) -> NodeId {
        let mut state = self.state.lock();
        let id = state.add(Node::text(text));
        state.ops.push(HostOp::CreateText {
            id,
            text: text.to_string(),
        });
        id
    }

    fn set_text(&self, node: NodeId, text: &str) {
        let mut state = self.state.lock();
        state.ops.push(HostOp::SetText {
            id: node,
            text: text.to_string(),
        });
        if let Some(Node {
            kind: NodeKind::Text(current),
            ..
        }) = state.nodes.get_mut(&node)
        {
            *current = text.to_string();
        }
    }

    fn set_element_text(&self, el: NodeId, text: &str) {
        let mut state = self.state.lock();
        state.ops.push(HostOp::SetElementText {
            id: el,
            text: text.to_string(),
        });
        let old = state
            .nodes
            .get_mut(&el)
            .map(|n| std::mem::take(&mut n.children))
            .unwrap_or_default();
        for child in old {
            if let Some(child) = state.nodes.get_mut(&child) {
                child.parent = None;
            }
        }
        if !text.is_empty() {
            let run = state.add(Node::text(text));
            state.attach(run, el, None);
        }
    }

    fn insert(&self, child: NodeId, parent: NodeId, anchor: Option<NodeId>) {
        let mut state = self.state.lock();
        state.ops.push(HostOp::Insert {
            child,
            parent,
            anchor,
        });
        state.attach(child, parent, anchor);
    }

    fn remove(&self, child: NodeId) {
        let mut state = self.state.lock();
        state.ops.push(HostOp::Remove { id: child });
        state.detach(child);
    }

    fn patch_prop(
        &self,
        el: NodeId,
        key: &str,
        _prev: Option<&PropValue>,
        next: Option<&PropValue>,
    ) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.ops.push(HostOp::PatchProp {
            id: el,
            key: key.to_string(),
        });
        let Some(Node {
            kind: NodeKind::Element { attrs, listeners, .. },
            ..
        }) = state.nodes.get_mut(&el)
        else {
            return;
        };

        if let Some(event) = event_name(key) {
            match next.and_then(PropValue::as_handler) {
                Some(handler) => {
                    listeners.insert(event, handler.clone());
                }
                None => {
                    listeners.shift_remove(&event);
                }
            }
            return;
        }

        match next.and_then(PropValue::as_value) {
            None | Some(Value::Null) | Some(Value::Bool(false)) => {
                attrs.shift_remove(key);
            }
            Some(value) => {
                let value = match key {
                    "class" => Value::from(normalize_class(value)),
                    "style" => Value::from(normalize_style(value)),
                    _ => value.clone(),
                };
                attrs.insert(key.to_string(), value);
            }
        }
    }

    fn parent_node(&self, node: NodeId) -> Option<NodeId> {
        self.parent(node)
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let state = self.state.lock();
        let parent = state.nodes.get(&node)?.parent?;
        let siblings = &state.nodes.get(&parent)?.children;
        let index = siblings.iter().position(|c| *c == node)?;
        siblings.get(index + 1).copied()
    }

    fn query_selector(&self, selector: &str) -> Option<NodeId> {
        let state = self.state.lock();
        match selector.strip_prefix('#') {
            Some(id) => state.find(self.document, &|node| match &node.kind {
                NodeKind::Element { attrs, .. } => {
                    attrs.get("id").and_then(Value::as_str) == Some(id)
                }
                NodeKind::Text(_) => false,
            }),
            None => state.find(self.document, &|node| {
                matches!(&node.kind, NodeKind::Element { tag, .. } if tag == selector)
            }),
        }
    }
}

// ---- Tests ----
