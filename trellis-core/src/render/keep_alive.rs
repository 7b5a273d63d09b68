//! Keep-alive.
//!
//! [`keep_alive()`] is a built-in component that renders its default slot's
//! single child and keeps component children alive when they are switched
//! out.
//!
//! # How Caching Works
//!
//! 1. Each render looks the child up by its key, or by its component type
//!    when it has no key. A hit reuses the cached instance and marks the
//!    vnode [`COMPONENT_KEPT_ALIVE`](ShapeFlags::COMPONENT_KEPT_ALIVE), so
//!    the renderer moves its host nodes back instead of mounting.
//!
//! 2. Every child is marked
//!    [`COMPONENT_SHOULD_KEEP_ALIVE`](ShapeFlags::COMPONENT_SHOULD_KEEP_ALIVE),
//!    so unmounting it moves its host nodes into an off-screen storage node
//!    instead of destroying them.
//!
//! 3. Keys are kept in least-recently-used order. When a new key pushes the
//!    cache past `max`, the oldest entry is unmounted for real. If that
//!    entry is the one on screen, its flags are cleared instead and the
//!    ensuing patch unmounts it.

use std::sync::{OnceLock, Weak};

use indexmap::{IndexMap, IndexSet};
use parking_lot::Mutex;

use super::component::{
    current_instance, Component, ReadonlyProps, RenderContext, SetupContext, SetupResult,
};
use super::flags::ShapeFlags;
use super::host::NodeId;
use super::lifecycle::{on_before_unmount, on_mounted, on_updated};
use super::vnode::{is_same_vnode_type, Key, VNode};
use crate::config;

/// Renderer operations keep-alive needs.
pub(crate) trait RendererInternals: Send + Sync {
    /// Move the host nodes of a mounted vnode.
    fn move_vnode(&self, vnode: &VNode, container: NodeId, anchor: Option<NodeId>);

    /// Unmount a vnode and remove its host nodes.
    fn unmount_vnode(&self, vnode: &VNode);
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CacheKey {
    Key(Key),
    Type(usize),
}

impl CacheKey {
    fn of(vnode: &VNode) -> Self {
        match (vnode.key(), vnode.component_def()) {
            (Some(key), _) => CacheKey::Key(key.clone()),
            (None, Some(def)) => CacheKey::Type(def.identity()),
            (None, None) => CacheKey::Type(0),
        }
    }
}

#[derive(Default)]
struct CacheState {
    keys: IndexSet<CacheKey>,
    cache: IndexMap<CacheKey, VNode>,
    pending: Option<CacheKey>,
    max: Option<usize>,
}

/// Per-instance keep-alive state, set up by the renderer at mount.
pub(crate) struct KeepAliveContext {
    renderer: Weak<dyn RendererInternals>,
    storage: NodeId,
    state: Mutex<CacheState>,
}

fn reset_shape_flag(vnode: &VNode) {
    vnode.remove_shape_flag(
        ShapeFlags::COMPONENT_SHOULD_KEEP_ALIVE | ShapeFlags::COMPONENT_KEPT_ALIVE,
    );
}

impl KeepAliveContext {
    pub(crate) fn new(renderer: Weak<dyn RendererInternals>, storage: NodeId) -> Self {
        Self {
            renderer,
            storage,
            state: Mutex::new(CacheState::default()),
        }
    }

    fn set_max(&self, max: Option<usize>) {
        self.state.lock().max = max;
    }

    #[cfg(test)]
    fn cached_len(&self) -> usize {
        self.state.lock().cache.len()
    }

    /// Decide how `child` is rendered; `current` is the child on screen.
    fn render_child(&self, child: VNode, current: Option<VNode>) -> VNode {
        if !child.is_component() {
            self.state.lock().pending = None;
            return child;
        }

        let key = CacheKey::of(&child);
        let evicted = {
            let mut state = self.state.lock();
            state.pending = Some(key.clone());

            let hit = state.cache.get(&key).map(VNode::component);
            if let Some(component) = hit {
                child.set_component(component);
                child.insert_shape_flag(ShapeFlags::COMPONENT_KEPT_ALIVE);
                state.keys.shift_remove(&key);
                state.keys.insert(key);
                None
            } else {
                state.keys.insert(key);
                let over = state.max.is_some_and(|max| max > 0 && state.keys.len() > max);
                if over {
                    let oldest = state.keys.shift_remove_index(0);
                    oldest.and_then(|oldest| state.cache.shift_remove(&oldest))
                } else {
                    None
                }
            }
        };

        if let Some(evicted) = evicted {
            self.prune(&evicted, current.as_ref());
        }

        child.insert_shape_flag(ShapeFlags::COMPONENT_SHOULD_KEEP_ALIVE);
        child
    }

    fn prune(&self, cached: &VNode, current: Option<&VNode>) {
        match current {
            Some(current) if is_same_vnode_type(cached, current) => {
                tracing::trace!("evicting the active keep-alive entry");
                reset_shape_flag(current);
            }
            _ => self.unmount(cached),
        }
    }

    fn unmount(&self, vnode: &VNode) {
        reset_shape_flag(vnode);
        match self.renderer.upgrade() {
            Some(renderer) => renderer.unmount_vnode(vnode),
            None => tracing::debug!("renderer dropped before keep-alive eviction"),
        }
    }

    fn cache_sub_tree(&self, tree: Option<VNode>) {
        let mut state = self.state.lock();
        if let (Some(key), Some(tree)) = (state.pending.clone(), tree) {
            state.cache.insert(key, tree);
        }
    }

    /// Drop every entry; the one on screen is left to the normal unmount.
    fn purge(&self, current: Option<VNode>) {
        let cached = {
            let mut state = self.state.lock();
            state.keys.clear();
            std::mem::take(&mut state.cache)
        };
        for (_, vnode) in cached {
            self.prune(&vnode, current.as_ref());
        }
    }

    /// Bring a cached child back on screen.
    pub(crate) fn activate(&self, vnode: &VNode, container: NodeId, anchor: Option<NodeId>) {
        if let Some(renderer) = self.renderer.upgrade() {
            renderer.move_vnode(vnode, container, anchor);
        }
    }

    /// Park a child in the storage node.
    pub(crate) fn deactivate(&self, vnode: &VNode) {
        if let Some(renderer) = self.renderer.upgrade() {
            renderer.move_vnode(vnode, self.storage, None);
        }
    }
}

/// The keep-alive component.
///
/// Accepts a `max` prop bounding the number of cached children; without it
/// [`RuntimeConfig::keep_alive_max`](crate::config::RuntimeConfig) applies.
pub fn keep_alive() -> Component {
    static KEEP_ALIVE: OnceLock<Component> = OnceLock::new();
    KEEP_ALIVE
        .get_or_init(|| {
            Component::builder("KeepAlive")
                .props(["max"])
                .setup(setup)
                .keep_alive()
                .build()
        })
        .clone()
}

fn setup(props: &ReadonlyProps, _ctx: &SetupContext) -> SetupResult {
    let Some(instance) = current_instance() else {
        return SetupResult::Empty;
    };
    let Some(ctx) = instance.keep_alive() else {
        tracing::warn!("keep-alive mounted without renderer support");
        return SetupResult::Empty;
    };

    let max = props
        .get("max")
        .as_int()
        .and_then(|max| usize::try_from(max).ok())
        .or(config::current().keep_alive_max);
    ctx.set_max(max);

    let cache = {
        let instance = instance.downgrade();
        move || {
            if let Some(instance) = instance.upgrade() {
                if let Some(ctx) = instance.keep_alive() {
                    ctx.cache_sub_tree(instance.sub_tree());
                }
            }
        }
    };
    on_mounted(cache.clone());
    on_updated(cache);

    let weak = instance.downgrade();
    on_before_unmount(move || {
        if let Some(instance) = weak.upgrade() {
            if let Some(ctx) = instance.keep_alive() {
                ctx.purge(instance.sub_tree());
            }
        }
    });

    SetupResult::render(render)
}

fn render(ctx: &RenderContext) -> VNode {
    let children = ctx.render_slot("default");
    if children.len() > 1 {
        tracing::warn!(count = children.len(), "keep-alive expects a single child");
    }
    let Some(child) = children.into_iter().next() else {
        return VNode::text("");
    };

    let instance = ctx.instance();
    match instance.keep_alive() {
        Some(keep_alive) => keep_alive.render_child(child, instance.sub_tree()),
        None => child,
    }
}

// ---- Tests ----
