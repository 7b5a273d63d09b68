//! The renderer: mounts vnode trees onto a [`Host`] and patches them.
//!
//! # How Patching Works
//!
//! [`Renderer::render`] patches the new tree against the tree previously
//! rendered into the same container. `patch(n1, n2)` first checks identity:
//! if `n1` and `n2` are not the same vnode type (type and key), `n1` is
//! unmounted and `n2` mounted in its place. Otherwise `n2` takes over `n1`'s
//! host nodes and only the differences are applied.
//!
//! ## Keyed children
//!
//! Two child lists are reconciled in five steps:
//!
//! 1. Patch matching nodes from the start.
//! 2. Patch matching nodes from the end.
//! 3. If only new nodes remain, mount them.
//! 4. If only old nodes remain, unmount them.
//! 5. Otherwise map the remaining new keys to indices, patch or unmount each
//!    remaining old node, then walk the new range backwards, mounting fresh
//!    nodes and moving only the nodes outside the longest increasing
//!    subsequence of old positions.
//!
//! ## Components
//!
//! Each component instance owns a render effect. Its first run mounts the
//! sub tree; later runs re-render and patch it. State changes do not re-run
//! the effect directly: its scheduler queues the instance's update job, so
//! several writes in one tick cause a single re-render.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::component::ComponentInstance;
use super::flags::{PatchFlags, ShapeFlags, SpecialPatch};
use super::host::{Host, NodeId};
use super::keep_alive::{KeepAliveContext, RendererInternals};
use super::lifecycle::LifecycleHook;
use super::sequence::longest_increasing_subsequence;
use super::vnode::{is_same_vnode_type, Children, Key, PropValue, Props, VNode, VNodeType};
use crate::error::{report, RuntimeError};
use crate::reactive::{ReactiveEffect, Value};
use crate::scheduler::{invalidate_job, queue_job, Job};

struct RendererInner<H: Host> {
    host: H,
    this: Weak<RendererInner<H>>,
    roots: Mutex<HashMap<NodeId, VNode>>,
}

/// Renders vnode trees onto a host.
///
/// Cloning shares the renderer.
pub struct Renderer<H: Host> {
    inner: Arc<RendererInner<H>>,
}

impl<H: Host> Clone for Renderer<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<H: Host> Renderer<H> {
    pub fn new(host: H) -> Self {
        Self {
            inner: Arc::new_cyclic(|this| RendererInner {
                host,
                this: this.clone(),
                roots: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn host(&self) -> &H {
        &self.inner.host
    }

    /// Render `vnode` into `container`, patching against whatever was
    /// rendered there before. `None` unmounts the current tree.
    pub fn render(&self, vnode: Option<VNode>, container: NodeId) {
        let prev = self.inner.roots.lock().get(&container).cloned();
        match vnode {
            Some(vnode) => {
                self.inner
                    .patch(prev.as_ref(), &vnode, container, None, None);
                self.inner.roots.lock().insert(container, vnode);
            }
            None => {
                if let Some(prev) = prev {
                    self.inner.unmount(&prev, None, true);
                    self.inner.roots.lock().remove(&container);
                }
            }
        }
    }

    /// The tree last rendered into `container`.
    pub fn root(&self, container: NodeId) -> Option<VNode> {
        self.inner.roots.lock().get(&container).cloned()
    }
}

impl<H: Host> RendererInternals for RendererInner<H> {
    fn move_vnode(&self, vnode: &VNode, container: NodeId, anchor: Option<NodeId>) {
        RendererInner::move_vnode(self, vnode, container, anchor);
    }

    fn unmount_vnode(&self, vnode: &VNode) {
        self.unmount(vnode, None, true);
    }
}

fn prop_str(vnode: &VNode, key: &str) -> Option<String> {
    vnode
        .prop(key)
        .and_then(PropValue::as_value)
        .and_then(Value::as_str)
        .map(str::to_owned)
}

fn should_component_update(n1: &VNode, n2: &VNode) -> bool {
    // Slots may read anything; always re-render
    if !n1.children().is_none() || !n2.children().is_none() {
        return true;
    }
    match (n1.props(), n2.props()) {
        (None, None) => false,
        (prev, next) => {
            let empty = Props::new();
            has_props_changed(prev.unwrap_or(&empty), next.unwrap_or(&empty))
        }
    }
}

fn has_props_changed(prev: &Props, next: &Props) -> bool {
    if prev.len() != next.len() {
        return true;
    }
    next.iter().any(|(key, value)| prev.get(key) != Some(value))
}

impl<H: Host> RendererInner<H> {
    fn patch(
        &self,
        n1: Option<&VNode>,
        n2: &VNode,
        container: NodeId,
        anchor: Option<NodeId>,
        parent: Option<&ComponentInstance>,
    ) {
        let mut n1 = n1;
        let mut anchor = anchor;

        if let Some(old) = n1 {
            if old.ptr_eq(n2) {
                return;
            }
            if !is_same_vnode_type(old, n2) {
                anchor = self.next_host_node(old);
                self.unmount(old, parent, true);
                n1 = None;
            }
        }

        if let (Some(old), Some(SpecialPatch::Hoisted)) = (n1, n2.special()) {
            n2.set_el(old.el());
            return;
        }

        match n2.ty() {
            VNodeType::Text => self.process_text(n1, n2, container, anchor),
            VNodeType::Fragment => self.process_fragment(n1, n2, container, anchor, parent),
            _ => {
                let shape = n2.shape_flag();
                if shape.contains(ShapeFlags::ELEMENT) {
                    self.process_element(n1, n2, container, anchor, parent);
                } else if shape.contains(ShapeFlags::TELEPORT) {
                    self.process_teleport(n1, n2, container, anchor, parent);
                } else if shape.intersects(ShapeFlags::COMPONENT) {
                    self.process_component(n1, n2, container, anchor, parent);
                }
            }
        }
    }

    fn process_text(&self, n1: Option<&VNode>, n2: &VNode, container: NodeId, anchor: Option<NodeId>) {
        let text = n2.text_content().unwrap_or_default();
        match n1 {
            None => {
                let el = self.host.create_text(text);
                n2.set_el(Some(el));
                self.host.insert(el, container, anchor);
            }
            Some(n1) => {
                let el = n1.el();
                n2.set_el(el);
                if let Some(el) = el {
                    if n1.text_content() != n2.text_content() {
                        self.host.set_text(el, text);
                    }
                }
            }
        }
    }

    fn process_fragment(
        &self,
        n1: Option<&VNode>,
        n2: &VNode,
        container: NodeId,
        anchor: Option<NodeId>,
        parent: Option<&ComponentInstance>,
    ) {
        let Some(n1) = n1 else {
            let start = self.host.create_text("");
            let end = self.host.create_text("");
            n2.set_el(Some(start));
            n2.set_anchor(Some(end));
            self.host.insert(start, container, anchor);
            self.host.insert(end, container, anchor);
            if let Some(children) = n2.children().as_nodes() {
                self.mount_children(children, container, Some(end), parent);
            }
            return;
        };

        n2.set_el(n1.el());
        n2.set_anchor(n1.anchor());

        if n2.patch_flag().contains(PatchFlags::STABLE_FRAGMENT) {
            if let Some((old, new)) = block_pair(n1, n2) {
                self.patch_block_children(&old, &new, container, parent);
                return;
            }
        }
        self.patch_children(n1, n2, container, n1.anchor(), parent);
    }

    fn process_element(
        &self,
        n1: Option<&VNode>,
        n2: &VNode,
        container: NodeId,
        anchor: Option<NodeId>,
        parent: Option<&ComponentInstance>,
    ) {
        match n1 {
            None => self.mount_element(n2, container, anchor, parent),
            Some(n1) => self.patch_element(n1, n2, parent),
        }
    }

    fn mount_element(
        &self,
        vnode: &VNode,
        container: NodeId,
        anchor: Option<NodeId>,
        parent: Option<&ComponentInstance>,
    ) {
        let VNodeType::Element(tag) = vnode.ty() else {
            return;
        };
        let el = self.host.create_element(tag);
        vnode.set_el(Some(el));

        match vnode.children() {
            Children::Text(text) => self.host.set_element_text(el, text),
            Children::Nodes(children) => self.mount_children(children, el, None, parent),
            Children::None | Children::Slots(_) => {}
        }

        if let Some(props) = vnode.props() {
            for (key, value) in props {
                self.host.patch_prop(el, key, None, Some(value));
            }
        }

        self.host.insert(el, container, anchor);
    }

    fn mount_children(
        &self,
        children: &[VNode],
        container: NodeId,
        anchor: Option<NodeId>,
        parent: Option<&ComponentInstance>,
    ) {
        for child in children {
            self.patch(None, child, container, anchor, parent);
        }
    }

    fn patch_element(&self, n1: &VNode, n2: &VNode, parent: Option<&ComponentInstance>) {
        let Some(el) = n1.el() else {
            return;
        };
        n2.set_el(Some(el));

        let bail = n2.special() == Some(SpecialPatch::Bail);
        let flag = if bail {
            PatchFlags::empty()
        } else {
            n2.patch_flag()
        };
        let dynamic = if bail { None } else { block_pair(n1, n2) };

        let empty = Props::new();
        let old_props = n1.props().unwrap_or(&empty);
        let new_props = n2.props().unwrap_or(&empty);

        if flag.contains(PatchFlags::FULL_PROPS) {
            self.patch_props(el, old_props, new_props);
        } else if !flag.is_empty() {
            if flag.contains(PatchFlags::CLASS) {
                self.patch_prop_if_changed(el, "class", old_props, new_props);
            }
            if flag.contains(PatchFlags::STYLE) {
                self.patch_prop_if_changed(el, "style", old_props, new_props);
            }
            if flag.contains(PatchFlags::PROPS) {
                for key in n2.dynamic_props() {
                    self.patch_prop_if_changed(el, key, old_props, new_props);
                }
            }
        } else if dynamic.is_none() {
            self.patch_props(el, old_props, new_props);
        }

        match dynamic {
            Some((old, new)) => self.patch_block_children(&old, &new, el, parent),
            None if !flag.contains(PatchFlags::TEXT) => {
                self.patch_children(n1, n2, el, None, parent)
            }
            None => {}
        }

        if flag.contains(PatchFlags::TEXT) && n1.children().as_text() != n2.children().as_text() {
            self.host
                .set_element_text(el, n2.children().as_text().unwrap_or_default());
        }
    }

    fn patch_prop_if_changed(&self, el: NodeId, key: &str, old: &Props, new: &Props) {
        let (prev, next) = (old.get(key), new.get(key));
        if prev != next {
            self.host.patch_prop(el, key, prev, next);
        }
    }

    fn patch_props(&self, el: NodeId, old: &Props, new: &Props) {
        for (key, next) in new {
            let prev = old.get(key);
            if prev != Some(next) {
                self.host.patch_prop(el, key, prev, Some(next));
            }
        }
        for (key, prev) in old {
            if !new.contains_key(key) {
                self.host.patch_prop(el, key, Some(prev), None);
            }
        }
    }

    /// Patch the flat dynamic descendants collected by a block.
    fn patch_block_children(
        &self,
        old: &[VNode],
        new: &[VNode],
        fallback: NodeId,
        parent: Option<&ComponentInstance>,
    ) {
        for (o, n) in old.iter().zip(new) {
            // Nodes that may be replaced or span several host nodes need
            // their real parent; anything else patches in place.
            let needs_parent = matches!(o.ty(), VNodeType::Fragment)
                || !is_same_vnode_type(o, n)
                || o.shape_flag()
                    .intersects(ShapeFlags::COMPONENT | ShapeFlags::TELEPORT);
            let container = if needs_parent {
                self.host_el(o)
                    .and_then(|el| self.host.parent_node(el))
                    .unwrap_or(fallback)
            } else {
                fallback
            };
            self.patch(Some(o), n, container, None, parent);
        }
    }

    fn patch_children(
        &self,
        n1: &VNode,
        n2: &VNode,
        container: NodeId,
        anchor: Option<NodeId>,
        parent: Option<&ComponentInstance>,
    ) {
        match (n1.children(), n2.children()) {
            (prev, Children::Text(text)) => {
                if let Children::Nodes(old) = prev {
                    self.unmount_children(old, parent, true);
                }
                if prev.as_text() != Some(text.as_str()) {
                    self.host.set_element_text(container, text);
                }
            }
            (Children::Nodes(old), Children::Nodes(new)) => {
                if n2.patch_flag().contains(PatchFlags::UNKEYED_FRAGMENT) {
                    self.patch_unkeyed_children(old, new, container, anchor, parent);
                } else {
                    self.patch_keyed_children(old, new, container, anchor, parent);
                }
            }
            (Children::Nodes(old), _) => self.unmount_children(old, parent, true),
            (prev, next) => {
                if prev.as_text().is_some() {
                    self.host.set_element_text(container, "");
                }
                if let Children::Nodes(new) = next {
                    self.mount_children(new, container, anchor, parent);
                }
            }
        }
    }

    fn patch_unkeyed_children(
        &self,
        c1: &[VNode],
        c2: &[VNode],
        container: NodeId,
        anchor: Option<NodeId>,
        parent: Option<&ComponentInstance>,
    ) {
        let common = c1.len().min(c2.len());
        for (old, new) in c1.iter().zip(c2) {
            self.patch(Some(old), new, container, None, parent);
        }
        if c1.len() > common {
            self.unmount_children(&c1[common..], parent, true);
        } else {
            self.mount_children(&c2[common..], container, anchor, parent);
        }
    }

    fn patch_keyed_children(
        &self,
        c1: &[VNode],
        c2: &[VNode],
        container: NodeId,
        parent_anchor: Option<NodeId>,
        parent: Option<&ComponentInstance>,
    ) {
        let mut i = 0usize;
        // Inclusive tail bounds; -1 means empty
        let mut e1 = c1.len() as isize - 1;
        let mut e2 = c2.len() as isize - 1;

        // 1. Sync from the start
        while (i as isize) <= e1 && (i as isize) <= e2 {
            let (old, new) = (&c1[i], &c2[i]);
            if !is_same_vnode_type(old, new) {
                break;
            }
            self.patch(Some(old), new, container, None, parent);
            i += 1;
        }

        // 2. Sync from the end
        while (i as isize) <= e1 && (i as isize) <= e2 {
            let (old, new) = (&c1[e1 as usize], &c2[e2 as usize]);
            if !is_same_vnode_type(old, new) {
                break;
            }
            self.patch(Some(old), new, container, None, parent);
            e1 -= 1;
            e2 -= 1;
        }

        // 3. Only new nodes left: mount them before the first synced tail node
        if i as isize > e1 {
            if i as isize <= e2 {
                let next_pos = (e2 + 1) as usize;
                let anchor = match c2.get(next_pos) {
                    Some(next) => self.host_el(next),
                    None => parent_anchor,
                };
                for new in &c2[i..=e2 as usize] {
                    self.patch(None, new, container, anchor, parent);
                }
            }
            return;
        }

        // 4. Only old nodes left: unmount them
        if i as isize > e2 {
            self.unmount_children(&c1[i..=e1 as usize], parent, true);
            return;
        }

        // 5. Unknown sequence
        let (s1, s2) = (i, i);
        let (e1, e2) = (e1 as usize, e2 as usize);

        let mut key_to_new_index: HashMap<&Key, usize> = HashMap::new();
        for (j, child) in c2.iter().enumerate().take(e2 + 1).skip(s2) {
            if let Some(key) = child.key() {
                key_to_new_index.insert(key, j);
            }
        }

        let to_be_patched = e2 - s2 + 1;
        let mut patched = 0;
        let mut moved = false;
        let mut max_new_index_so_far = 0;
        // Old index + 1 for each new slot; 0 means the slot must be mounted
        let mut new_index_to_old_index = vec![0usize; to_be_patched];

        for (old_index, prev) in c1.iter().enumerate().take(e1 + 1).skip(s1) {
            if patched >= to_be_patched {
                self.unmount(prev, parent, true);
                continue;
            }

            let new_index = match prev.key() {
                Some(key) => key_to_new_index.get(key).copied(),
                None => (s2..=e2).find(|&j| {
                    new_index_to_old_index[j - s2] == 0
                        && c2[j].key().is_none()
                        && is_same_vnode_type(prev, &c2[j])
                }),
            };

            match new_index {
                None => self.unmount(prev, parent, true),
                Some(new_index) => {
                    new_index_to_old_index[new_index - s2] = old_index + 1;
                    if new_index >= max_new_index_so_far {
                        max_new_index_so_far = new_index;
                    } else {
                        moved = true;
                    }
                    self.patch(Some(prev), &c2[new_index], container, None, parent);
                    patched += 1;
                }
            }
        }

        let stable = if moved {
            longest_increasing_subsequence(&new_index_to_old_index)
        } else {
            Vec::new()
        };
        let mut cursor = stable.len();

        tracing::trace!(
            to_be_patched,
            moved,
            stable = stable.len(),
            "keyed children diff"
        );

        for k in (0..to_be_patched).rev() {
            let index = s2 + k;
            let next = &c2[index];
            let anchor = match c2.get(index + 1) {
                Some(after) => self.host_el(after),
                None => parent_anchor,
            };

            if new_index_to_old_index[k] == 0 {
                self.patch(None, next, container, anchor, parent);
            } else if moved {
                if cursor > 0 && stable[cursor - 1] == k {
                    cursor -= 1;
                } else {
                    self.move_vnode(next, container, anchor);
                }
            }
        }
    }

    fn process_teleport(
        &self,
        n1: Option<&VNode>,
        n2: &VNode,
        container: NodeId,
        anchor: Option<NodeId>,
        parent: Option<&ComponentInstance>,
    ) {
        let to = prop_str(n2, "to");

        let Some(n1) = n1 else {
            let placeholder = self.host.create_text("");
            let end = self.host.create_text("");
            n2.set_el(Some(placeholder));
            n2.set_anchor(Some(end));
            self.host.insert(placeholder, container, anchor);
            self.host.insert(end, container, anchor);

            let target = self.resolve_target(to.as_deref());
            n2.set_target(target);
            if let (Some(target), Some(children)) = (target, n2.children().as_nodes()) {
                self.mount_children(children, target, None, parent);
            }
            return;
        };

        n2.set_el(n1.el());
        n2.set_anchor(n1.anchor());
        n2.set_target(n1.target());

        let Some(target) = n1.target() else {
            // Never mounted; try the new target
            let target = self.resolve_target(to.as_deref());
            n2.set_target(target);
            if let (Some(target), Some(children)) = (target, n2.children().as_nodes()) {
                self.mount_children(children, target, None, parent);
            }
            return;
        };

        self.patch_children(n1, n2, target, None, parent);

        if to != prop_str(n1, "to") {
            if let Some(next_target) = self.resolve_target(to.as_deref()) {
                tracing::debug!(to = ?to, "moving teleport children");
                for child in n2.children().as_nodes().unwrap_or_default() {
                    self.move_vnode(child, next_target, None);
                }
                n2.set_target(Some(next_target));
            }
        }
    }

    fn resolve_target(&self, selector: Option<&str>) -> Option<NodeId> {
        let selector = selector.unwrap_or_default();
        let target = if selector.is_empty() {
            None
        } else {
            self.host.query_selector(selector)
        };
        if target.is_none() {
            report(RuntimeError::TeleportTargetMissing {
                selector: selector.to_string(),
            });
        }
        target
    }

    fn process_component(
        &self,
        n1: Option<&VNode>,
        n2: &VNode,
        container: NodeId,
        anchor: Option<NodeId>,
        parent: Option<&ComponentInstance>,
    ) {
        if let Some(n1) = n1 {
            self.update_component(n1, n2);
            return;
        }

        if n2.shape_flag().contains(ShapeFlags::COMPONENT_KEPT_ALIVE) {
            if let Some(keep_alive) = parent.and_then(ComponentInstance::keep_alive) {
                keep_alive.activate(n2, container, anchor);
                if let Some(instance) = n2.component() {
                    instance.set_vnode(n2);
                }
                n2.set_el(self.host_el(n2));
                return;
            }
        }

        self.mount_component(n2, container, anchor, parent);
    }

    fn mount_component(
        &self,
        vnode: &VNode,
        container: NodeId,
        anchor: Option<NodeId>,
        parent: Option<&ComponentInstance>,
    ) {
        let Some(def) = vnode.component_def() else {
            return;
        };
        let instance = ComponentInstance::new(def, vnode, parent);
        vnode.set_component(Some(instance.clone()));

        if def.is_keep_alive() {
            let renderer: Weak<dyn RendererInternals> = self.this.clone();
            let storage = self.host.create_element("div");
            instance.set_keep_alive(Arc::new(KeepAliveContext::new(renderer, storage)));
        }

        tracing::debug!(component = def.name(), uid = instance.uid(), "mounting component");
        instance.setup();
        self.setup_render_effect(&instance, container, anchor);
    }

    fn setup_render_effect(
        &self,
        instance: &ComponentInstance,
        container: NodeId,
        anchor: Option<NodeId>,
    ) {
        let effect = instance.scope().run(|| {
            let renderer = self.this.clone();
            let target = instance.downgrade();
            ReactiveEffect::new(move || {
                if let (Some(renderer), Some(instance)) = (renderer.upgrade(), target.upgrade()) {
                    renderer.run_component(&instance, container, anchor);
                }
            })
        });

        let job: Job = {
            let effect = effect.downgrade();
            let target = instance.downgrade();
            Arc::new(move || {
                let Some(instance) = target.upgrade() else {
                    return;
                };
                if instance.is_unmounted() {
                    tracing::trace!(uid = instance.uid(), "skipping update of unmounted component");
                    return;
                }
                if let Some(effect) = effect.upgrade() {
                    if effect.dirty() {
                        effect.run();
                    }
                }
            })
        };

        effect.set_scheduler(Some({
            let job = job.clone();
            Arc::new(move || queue_job(job.clone()))
        }));
        instance.set_render_effect(effect, job.clone());
        job();
    }

    /// Body of a component's render effect.
    fn run_component(&self, instance: &ComponentInstance, container: NodeId, anchor: Option<NodeId>) {
        if !instance.is_mounted() {
            instance.invoke_hooks(LifecycleHook::BeforeMount);
            let tree = instance.render_root();
            self.patch(None, &tree, container, anchor, Some(instance));
            if let Some(vnode) = instance.vnode() {
                vnode.set_el(self.host_el(&tree));
            }
            instance.set_sub_tree(tree);
            instance.mark_mounted();
            instance.invoke_hooks(LifecycleHook::Mounted);
            return;
        }

        if let Some(next) = instance.take_next() {
            instance.apply_next(&next);
        }
        instance.invoke_hooks(LifecycleHook::BeforeUpdate);

        let next_tree = instance.render_root();
        let prev_tree = instance.sub_tree();
        // The component may have moved since it was mounted
        let (container, anchor) = match &prev_tree {
            Some(prev) => (
                self.host_el(prev)
                    .and_then(|el| self.host.parent_node(el))
                    .unwrap_or(container),
                self.next_host_node(prev),
            ),
            None => (container, anchor),
        };

        tracing::trace!(component = instance.name(), uid = instance.uid(), "re-rendering");
        self.patch(prev_tree.as_ref(), &next_tree, container, anchor, Some(instance));
        if let Some(vnode) = instance.vnode() {
            vnode.set_el(self.host_el(&next_tree));
        }
        instance.set_sub_tree(next_tree);
        instance.invoke_hooks(LifecycleHook::Updated);
    }

    fn update_component(&self, n1: &VNode, n2: &VNode) {
        let Some(instance) = n1.component() else {
            tracing::warn!("patching a component vnode that was never mounted");
            return;
        };
        n2.set_component(Some(instance.clone()));

        if should_component_update(n1, n2) {
            instance.set_next(n2.clone());
            if let Some(job) = instance.update_job() {
                invalidate_job(&job);
            }
            instance.update();
        } else {
            n2.set_el(n1.el());
            instance.set_vnode(n2);
        }
    }

    fn unmount_children(&self, children: &[VNode], parent: Option<&ComponentInstance>, do_remove: bool) {
        for child in children {
            self.unmount(child, parent, do_remove);
        }
    }

    /// Tear down `vnode`. Host nodes are detached only when `do_remove` is
    /// set; descendants of a removed element go with it.
    fn unmount(&self, vnode: &VNode, parent: Option<&ComponentInstance>, do_remove: bool) {
        let shape = vnode.shape_flag();

        if shape.contains(ShapeFlags::COMPONENT_SHOULD_KEEP_ALIVE) {
            if let Some(keep_alive) = parent.and_then(ComponentInstance::keep_alive) {
                keep_alive.deactivate(vnode);
                return;
            }
        }

        if shape.intersects(ShapeFlags::COMPONENT) {
            self.unmount_component(vnode, do_remove);
            return;
        }

        match vnode.ty() {
            VNodeType::Fragment => {
                if let Some(children) = vnode.children().as_nodes() {
                    self.unmount_children(children, parent, do_remove);
                }
                if do_remove {
                    self.remove_range(vnode);
                }
            }
            VNodeType::Teleport => {
                // Children live in the target; they always go
                if let Some(children) = vnode.children().as_nodes() {
                    self.unmount_children(children, parent, true);
                }
                if do_remove {
                    self.remove_range(vnode);
                }
            }
            _ => {
                if let Some(children) = vnode.children().as_nodes() {
                    self.unmount_children(children, parent, false);
                }
                if do_remove {
                    if let Some(el) = vnode.el() {
                        self.host.remove(el);
                    }
                }
            }
        }
    }

    fn remove_range(&self, vnode: &VNode) {
        for node in [vnode.el(), vnode.anchor()].into_iter().flatten() {
            self.host.remove(node);
        }
    }

    fn unmount_component(&self, vnode: &VNode, do_remove: bool) {
        let Some(instance) = vnode.component() else {
            return;
        };
        tracing::debug!(component = instance.name(), uid = instance.uid(), "unmounting component");

        instance.invoke_hooks(LifecycleHook::BeforeUnmount);
        instance.scope().stop();
        if let Some(effect) = instance.effect() {
            effect.stop();
        }
        if let Some(job) = instance.update_job() {
            invalidate_job(&job);
        }
        instance.mark_unmounted();

        if let Some(tree) = instance.sub_tree() {
            self.unmount(&tree, Some(&instance), do_remove);
        }
        instance.invoke_hooks(LifecycleHook::Unmounted);
    }

    fn move_vnode(&self, vnode: &VNode, container: NodeId, anchor: Option<NodeId>) {
        if vnode.is_component() {
            if let Some(tree) = vnode.component().and_then(|i| i.sub_tree()) {
                self.move_vnode(&tree, container, anchor);
            }
            return;
        }

        match vnode.ty() {
            VNodeType::Fragment => {
                if let Some(start) = vnode.el() {
                    self.host.insert(start, container, anchor);
                }
                for child in vnode.children().as_nodes().unwrap_or_default() {
                    self.move_vnode(child, container, anchor);
                }
                if let Some(end) = vnode.anchor() {
                    self.host.insert(end, container, anchor);
                }
            }
            VNodeType::Teleport => {
                // Children stay in the target
                for node in [vnode.el(), vnode.anchor()].into_iter().flatten() {
                    self.host.insert(node, container, anchor);
                }
            }
            _ => {
                if let Some(el) = vnode.el() {
                    self.host.insert(el, container, anchor);
                }
            }
        }
    }

    /// First host node of a mounted vnode.
    fn host_el(&self, vnode: &VNode) -> Option<NodeId> {
        if vnode.is_component() {
            return vnode
                .component()
                .and_then(|i| i.sub_tree())
                .and_then(|tree| self.host_el(&tree));
        }
        vnode.el()
    }

    /// Host node following everything `vnode` rendered.
    fn next_host_node(&self, vnode: &VNode) -> Option<NodeId> {
        if vnode.is_component() {
            return vnode
                .component()
                .and_then(|i| i.sub_tree())
                .and_then(|tree| self.next_host_node(&tree));
        }
        match vnode.ty() {
            VNodeType::Fragment | VNodeType::Teleport => {
                vnode.anchor().and_then(|end| self.host.next_sibling(end))
            }
            _ => vnode.el().and_then(|el| self.host.next_sibling(el)),
        }
    }
}

/// Dynamic children of both vnodes, when both are blocks of equal size.
fn block_pair(n1: &VNode, n2: &VNode) -> Option<(Vec<VNode>, Vec<VNode>)> {
    match (n1.dynamic_children(), n2.dynamic_children()) {
        (Some(old), Some(new)) if old.len() == new.len() => Some((old, new)),
        (Some(_), Some(_)) => {
            tracing::debug!("block shape changed; diffing children in full");
            None
        }
        _ => None,
    }
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props;
    use crate::render::{h, HArg, MemoryHost};

    fn keyed(keys: &[&str]) -> VNode {
        let children = keys
            .iter()
            .map(|k| h("li", Some(HArg::Props(props! { "key" => *k })), Some((*k).into())))
            .collect::<Vec<_>>();
        h("ul", Some(HArg::Children(children.into())), None)
    }

    fn texts(host: &MemoryHost, el: NodeId) -> Vec<String> {
        host.children(el)
            .into_iter()
            .map(|child| host.text_content(child))
            .collect()
    }

    #[test]
    fn mount_then_patch_text() {
        let host = MemoryHost::new();
        let root = host.root();
        let renderer = Renderer::new(host);

        renderer.render(Some(h("p", Some("a".into()), None)), root);
        assert_eq!(renderer.host().inner_html(root), "<p>a</p>");

        renderer.render(Some(h("p", Some("b".into()), None)), root);
        assert_eq!(renderer.host().inner_html(root), "<p>b</p>");
    }

    #[test]
    fn keyed_diff_appends_and_removes() {
        let host = MemoryHost::new();
        let root = host.root();
        let renderer = Renderer::new(host);

        renderer.render(Some(keyed(&["a", "b"])), root);
        renderer.render(Some(keyed(&["a", "b", "c"])), root);
        let ul = renderer.host().children(root)[0];
        assert_eq!(texts(renderer.host(), ul), ["a", "b", "c"]);

        renderer.render(Some(keyed(&["b", "c"])), root);
        assert_eq!(texts(renderer.host(), ul), ["b", "c"]);

        renderer.render(Some(keyed(&["c", "a", "b"])), root);
        assert_eq!(texts(renderer.host(), ul), ["c", "a", "b"]);
    }

    #[test]
    fn reversal_moves_all_but_one() {
        let host = MemoryHost::new();
        let root = host.root();
        let renderer = Renderer::new(host);

        renderer.render(Some(keyed(&["a", "b", "c", "d"])), root);
        renderer.host().clear_ops();
        renderer.render(Some(keyed(&["d", "c", "b", "a"])), root);

        let ul = renderer.host().children(root)[0];
        assert_eq!(texts(renderer.host(), ul), ["d", "c", "b", "a"]);
        assert_eq!(renderer.host().insert_count(), 3);
    }

    #[test]
    fn type_change_replaces_in_place() {
        let host = MemoryHost::new();
        let root = host.root();
        let renderer = Renderer::new(host);

        let tree = |middle: VNode| {
            h("div", Some(HArg::Children(vec![h("a", None, None), middle, h("b", None, None)].into())), None)
        };
        renderer.render(Some(tree(h("span", None, None))), root);
        renderer.render(Some(tree(h("em", None, None))), root);

        assert_eq!(renderer.host().inner_html(root), "<div><a></a><em></em><b></b></div>");
    }

    #[test]
    fn unmount_clears_container() {
        let host = MemoryHost::new();
        let root = host.root();
        let renderer = Renderer::new(host);

        renderer.render(Some(keyed(&["a"])), root);
        renderer.render(None, root);
        assert!(renderer.host().children(root).is_empty());
        assert!(renderer.root(root).is_none());
    }

    #[test]
    fn props_diff() {
        let host = MemoryHost::new();
        let root = host.root();
        let renderer = Renderer::new(host);

        renderer.render(Some(h("div", Some(props! { "id" => "x", "title" => "t" }.into()), None)), root);
        renderer.render(Some(h("div", Some(props! { "id" => "y" }.into()), None)), root);

        let div = renderer.host().children(root)[0];
        assert_eq!(renderer.host().attr(div, "id"), Some(Value::from("y")));
        assert_eq!(renderer.host().attr(div, "title"), None);
    }

    #[test]
    fn component_update_decision() {
        let a = h("x", Some(props! { "n" => 1 }.into()), None);
        let b = h("x", Some(props! { "n" => 1 }.into()), None);
        let c = h("x", Some(props! { "n" => 2 }.into()), None);
        let bare = h("x", None, None);

        assert!(!should_component_update(&a, &b));
        assert!(should_component_update(&a, &c));
        assert!(should_component_update(&a, &bare));
        assert!(!should_component_update(&bare, &h("x", None, None)));

        let slotted = h("x", None, Some("child".into()));
        assert!(should_component_update(&slotted, &bare));
    }
}
