//! Host abstraction.
//!
//! The renderer never touches a concrete UI tree. It drives a [`Host`]: a
//! small set of node operations addressed by opaque [`NodeId`] handles. A
//! browser DOM, a terminal cell buffer or the in-memory tree in
//! [`memory`](super::memory) can all sit behind it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use super::vnode::PropValue;

/// Handle to a node owned by a [`Host`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Node operations the renderer needs from the platform.
///
/// Methods take `&self`; hosts use interior mutability. Implementations
/// must not call back into the renderer.
pub trait Host: Send + Sync + 'static {
    fn create_element(&self, tag: &str) -> NodeId;

    fn create_text(&self, text: &str) -> NodeId;

    /// Replace the content of a text node.
    fn set_text(&self, node: NodeId, text: &str);

    /// Replace all children of an element with a single text run.
    fn set_element_text(&self, el: NodeId, text: &str);

    /// Insert (or move) `child` into `parent` before `anchor`, or at the end
    /// when there is no anchor.
    fn insert(&self, child: NodeId, parent: NodeId, anchor: Option<NodeId>);

    /// Detach `child` from its parent.
    fn remove(&self, child: NodeId);

    /// Apply a prop change. `next == None` removes the prop.
    fn patch_prop(
        &self,
        el: NodeId,
        key: &str,
        prev: Option<&PropValue>,
        next: Option<&PropValue>,
    );

    fn parent_node(&self, node: NodeId) -> Option<NodeId>;

    fn next_sibling(&self, node: NodeId) -> Option<NodeId>;

    /// Resolve a teleport target.
    fn query_selector(&self, selector: &str) -> Option<NodeId>;
}
