//! Virtual nodes.
//!
//! A [`VNode`] describes one node of the desired UI: an element, a text run,
//! a fragment, a teleport or a component. Vnodes are immutable descriptions
//! except for their mount state (host node, anchor, component instance),
//! which the renderer fills in as it mounts them.
//!
//! # Blocks
//!
//! Compiled render code can mark the vnodes that carry dynamic parts with
//! patch flags. Between [`open_block`] and the `create_*_block` call that
//! closes it, every such vnode is collected into the block root's dynamic
//! children, and the renderer patches only that flat list instead of
//! diffing the whole subtree.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};

use super::component::{Component, ComponentInstance};
use super::flags::{PatchFlags, ShapeFlags, SpecialPatch};
use super::host::NodeId;
use crate::reactive::{Object, Reactive, Value};

/// Props of a vnode, in declaration order.
pub type Props = IndexMap<String, PropValue>;

/// An event listener or emitted-event handler.
///
/// Handlers compare by identity.
#[derive(Clone)]
pub struct Handler(Arc<dyn Fn(&[Value]) + Send + Sync>);

impl Handler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, args: &[Value]) {
        (self.0)(args)
    }

    pub fn ptr_eq(&self, other: &Handler) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler")
    }
}

/// A prop value: data, or a handler.
#[derive(Clone, Debug)]
pub enum PropValue {
    Value(Value),
    Handler(Handler),
}

impl PropValue {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            PropValue::Value(value) => Some(value),
            PropValue::Handler(_) => None,
        }
    }

    pub fn as_handler(&self) -> Option<&Handler> {
        match self {
            PropValue::Handler(handler) => Some(handler),
            PropValue::Value(_) => None,
        }
    }
}

impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropValue::Value(a), PropValue::Value(b)) => a.same(b),
            (PropValue::Handler(a), PropValue::Handler(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<Handler> for PropValue {
    fn from(handler: Handler) -> Self {
        PropValue::Handler(handler)
    }
}

macro_rules! impl_prop_from_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for PropValue {
                fn from(v: $ty) -> Self {
                    PropValue::Value(Value::from(v))
                }
            }
        )*
    };
}

impl_prop_from_value!(Value, bool, i32, i64, u32, usize, f64, String, &str, Object, Reactive);

/// Build a [`Props`] map.
///
/// ```
/// use trellis_core::props;
///
/// let props = props! { "id" => "main", "tabindex" => 1 };
/// assert_eq!(props.len(), 2);
/// ```
#[macro_export]
macro_rules! props {
    () => { $crate::render::Props::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut props = $crate::render::Props::new();
        $(
            props.insert(
                ::std::string::String::from($key),
                $crate::render::PropValue::from($value),
            );
        )+
        props
    }};
}

/// Identity of a vnode among its siblings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Str(String),
    Int(i64),
}

impl Key {
    fn from_prop(prop: &PropValue) -> Option<Self> {
        match prop.as_value()? {
            Value::String(s) => Some(Key::Str(s.clone())),
            Value::Int(i) => Some(Key::Int(*i)),
            Value::Float(f) if f.fract() == 0.0 => Some(Key::Int(*f as i64)),
            _ => None,
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Int(i)
    }
}

/// A slot function: renders the content a parent passed to a component.
pub type Slot = Arc<dyn Fn() -> Vec<VNode> + Send + Sync>;

/// Named slots passed to a component.
#[derive(Clone, Default)]
pub struct Slots(IndexMap<String, Slot>);

impl Slots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a slot, builder style.
    pub fn with<F>(mut self, name: impl Into<String>, slot: F) -> Self
    where
        F: Fn() -> Vec<VNode> + Send + Sync + 'static,
    {
        self.0.insert(name.into(), Arc::new(slot));
        self
    }

    /// Shorthand for a `default` slot.
    pub fn default_slot<F>(slot: F) -> Self
    where
        F: Fn() -> Vec<VNode> + Send + Sync + 'static,
    {
        Self::new().with("default", slot)
    }

    pub fn get(&self, name: &str) -> Option<&Slot> {
        self.0.get(name)
    }

    /// Render a slot; an absent slot renders nothing.
    pub fn render(&self, name: &str) -> Vec<VNode> {
        self.0.get(name).map(|slot| slot()).unwrap_or_default()
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Slots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Slots").field(&self.names()).finish()
    }
}

/// Children of a vnode.
#[derive(Clone, Debug, Default)]
pub enum Children {
    #[default]
    None,
    Text(String),
    Nodes(Vec<VNode>),
    /// Slots, for component vnodes.
    Slots(Slots),
}

impl Children {
    pub fn is_none(&self) -> bool {
        matches!(self, Children::None)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Children::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_nodes(&self) -> Option<&[VNode]> {
        match self {
            Children::Nodes(nodes) => Some(nodes),
            _ => None,
        }
    }
}

impl From<&str> for Children {
    fn from(text: &str) -> Self {
        Children::Text(text.to_string())
    }
}

impl From<String> for Children {
    fn from(text: String) -> Self {
        Children::Text(text)
    }
}

impl From<Vec<VNode>> for Children {
    fn from(nodes: Vec<VNode>) -> Self {
        Children::Nodes(nodes)
    }
}

impl From<VNode> for Children {
    fn from(node: VNode) -> Self {
        Children::Nodes(vec![node])
    }
}

impl From<Slots> for Children {
    fn from(slots: Slots) -> Self {
        Children::Slots(slots)
    }
}

/// What a vnode renders as.
#[derive(Clone)]
pub enum VNodeType {
    Element(String),
    Text,
    /// Children rendered in place, bracketed by two empty text anchors.
    Fragment,
    /// Children rendered into the host node selected by the `to` prop.
    Teleport,
    Component(Component),
}

impl PartialEq for VNodeType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (VNodeType::Element(a), VNodeType::Element(b)) => a == b,
            (VNodeType::Text, VNodeType::Text)
            | (VNodeType::Fragment, VNodeType::Fragment)
            | (VNodeType::Teleport, VNodeType::Teleport) => true,
            (VNodeType::Component(a), VNodeType::Component(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for VNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VNodeType::Element(tag) => write!(f, "<{tag}>"),
            VNodeType::Text => f.write_str("Text"),
            VNodeType::Fragment => f.write_str("Fragment"),
            VNodeType::Teleport => f.write_str("Teleport"),
            VNodeType::Component(c) => write!(f, "Component({})", c.name()),
        }
    }
}

impl From<&str> for VNodeType {
    fn from(tag: &str) -> Self {
        VNodeType::Element(tag.to_string())
    }
}

impl From<String> for VNodeType {
    fn from(tag: String) -> Self {
        VNodeType::Element(tag)
    }
}

impl From<Component> for VNodeType {
    fn from(component: Component) -> Self {
        VNodeType::Component(component)
    }
}

impl From<&Component> for VNodeType {
    fn from(component: &Component) -> Self {
        VNodeType::Component(component.clone())
    }
}

#[derive(Default)]
struct MountState {
    el: Option<NodeId>,
    anchor: Option<NodeId>,
    target: Option<NodeId>,
    component: Option<ComponentInstance>,
}

struct VNodeInner {
    ty: VNodeType,
    props: Option<Props>,
    key: Option<Key>,
    children: Children,
    shape_flag: AtomicU32,
    patch_flag: PatchFlags,
    special: Option<SpecialPatch>,
    dynamic_props: Vec<String>,
    dynamic_children: RwLock<Option<Vec<VNode>>>,
    mount: Mutex<MountState>,
}

/// A virtual node. Cloning shares the node.
#[derive(Clone)]
pub struct VNode {
    inner: Arc<VNodeInner>,
}

impl VNode {
    fn build(
        ty: VNodeType,
        props: Option<Props>,
        children: Children,
        patch_flag: PatchFlags,
        dynamic_props: Vec<String>,
    ) -> Self {
        // Fragments and teleports have no element to hold a text run
        let children = match (&ty, children) {
            (VNodeType::Fragment | VNodeType::Teleport, Children::Text(text)) => {
                Children::Nodes(vec![VNode::text(text)])
            }
            // Plain children of a component fill its default slot
            (VNodeType::Component(_), Children::Nodes(nodes)) => {
                Children::Slots(Slots::default_slot(move || {
                    nodes.iter().map(VNode::fresh_copy).collect()
                }))
            }
            (VNodeType::Component(_), Children::Text(text)) => {
                Children::Slots(Slots::default_slot(move || vec![VNode::text(text.clone())]))
            }
            (_, children) => children,
        };

        let mut props = props;
        let key = props
            .as_mut()
            .and_then(|p| p.shift_remove("key"))
            .and_then(|k| Key::from_prop(&k));

        let mut shape = match &ty {
            VNodeType::Element(_) => ShapeFlags::ELEMENT,
            VNodeType::Teleport => ShapeFlags::TELEPORT,
            VNodeType::Component(c) if c.is_functional() => ShapeFlags::FUNCTIONAL_COMPONENT,
            VNodeType::Component(_) => ShapeFlags::STATEFUL_COMPONENT,
            VNodeType::Text | VNodeType::Fragment => ShapeFlags::empty(),
        };
        shape |= match &children {
            Children::None => ShapeFlags::empty(),
            Children::Text(_) => ShapeFlags::TEXT_CHILDREN,
            Children::Nodes(_) => ShapeFlags::ARRAY_CHILDREN,
            Children::Slots(_) => ShapeFlags::SLOTS_CHILDREN,
        };

        Self {
            inner: Arc::new(VNodeInner {
                ty,
                props,
                key,
                children,
                shape_flag: AtomicU32::new(shape.bits()),
                patch_flag,
                special: None,
                dynamic_props,
                dynamic_children: RwLock::new(None),
                mount: Mutex::new(MountState::default()),
            }),
        }
    }

    /// A text vnode.
    pub fn text(text: impl Into<String>) -> Self {
        Self::build(
            VNodeType::Text,
            None,
            Children::Text(text.into()),
            PatchFlags::empty(),
            Vec::new(),
        )
    }

    /// A fragment of `children`.
    pub fn fragment(children: Vec<VNode>) -> Self {
        create_vnode(VNodeType::Fragment, None, Children::Nodes(children))
    }

    /// A vnode the renderer never patches once mounted.
    pub fn hoisted(ty: impl Into<VNodeType>, props: Option<Props>, children: Children) -> Self {
        let mut vnode = Self::build(ty.into(), props, children, PatchFlags::empty(), Vec::new());
        if let Some(inner) = Arc::get_mut(&mut vnode.inner) {
            inner.special = Some(SpecialPatch::Hoisted);
        }
        vnode
    }

    /// Mark this vnode so its subtree is diffed in full.
    pub fn bail(mut self) -> Self {
        match Arc::get_mut(&mut self.inner) {
            Some(inner) => inner.special = Some(SpecialPatch::Bail),
            None => tracing::debug!("cannot mark a shared vnode as bail"),
        }
        self
    }

    pub fn ty(&self) -> &VNodeType {
        &self.inner.ty
    }

    pub fn props(&self) -> Option<&Props> {
        self.inner.props.as_ref()
    }

    pub fn prop(&self, key: &str) -> Option<&PropValue> {
        self.inner.props.as_ref()?.get(key)
    }

    pub fn key(&self) -> Option<&Key> {
        self.inner.key.as_ref()
    }

    pub fn children(&self) -> &Children {
        &self.inner.children
    }

    pub fn shape_flag(&self) -> ShapeFlags {
        ShapeFlags::from_bits_truncate(self.inner.shape_flag.load(Ordering::SeqCst))
    }

    pub(crate) fn insert_shape_flag(&self, flag: ShapeFlags) {
        self.inner.shape_flag.fetch_or(flag.bits(), Ordering::SeqCst);
    }

    pub(crate) fn remove_shape_flag(&self, flag: ShapeFlags) {
        self.inner.shape_flag.fetch_and(!flag.bits(), Ordering::SeqCst);
    }

    pub fn patch_flag(&self) -> PatchFlags {
        self.inner.patch_flag
    }

    pub fn special(&self) -> Option<SpecialPatch> {
        self.inner.special
    }

    pub fn dynamic_props(&self) -> &[String] {
        &self.inner.dynamic_props
    }

    pub fn dynamic_children(&self) -> Option<Vec<VNode>> {
        self.inner.dynamic_children.read().clone()
    }

    fn set_dynamic_children(&self, children: Vec<VNode>) {
        *self.inner.dynamic_children.write() = Some(children);
    }

    pub fn is_component(&self) -> bool {
        self.shape_flag().intersects(ShapeFlags::COMPONENT)
    }

    pub fn component_def(&self) -> Option<&Component> {
        match &self.inner.ty {
            VNodeType::Component(c) => Some(c),
            _ => None,
        }
    }

    /// Text of a text vnode.
    pub fn text_content(&self) -> Option<&str> {
        self.inner.children.as_text()
    }

    /// The first host node, once mounted.
    pub fn el(&self) -> Option<NodeId> {
        self.inner.mount.lock().el
    }

    pub(crate) fn set_el(&self, el: Option<NodeId>) {
        self.inner.mount.lock().el = el;
    }

    /// The closing anchor of a fragment or teleport.
    pub fn anchor(&self) -> Option<NodeId> {
        self.inner.mount.lock().anchor
    }

    pub(crate) fn set_anchor(&self, anchor: Option<NodeId>) {
        self.inner.mount.lock().anchor = anchor;
    }

    /// The host node a teleport renders into.
    pub fn target(&self) -> Option<NodeId> {
        self.inner.mount.lock().target
    }

    pub(crate) fn set_target(&self, target: Option<NodeId>) {
        self.inner.mount.lock().target = target;
    }

    /// The component instance of a mounted component vnode.
    pub fn component(&self) -> Option<ComponentInstance> {
        self.inner.mount.lock().component.clone()
    }

    pub(crate) fn set_component(&self, instance: Option<ComponentInstance>) {
        self.inner.mount.lock().component = instance;
    }

    pub fn ptr_eq(&self, other: &VNode) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// An unmounted copy of this subtree. Slot content is copied on every
    /// render so each use gets its own host nodes.
    pub(crate) fn fresh_copy(&self) -> VNode {
        self.copy_into(&mut HashMap::new())
    }

    fn copy_into(&self, copies: &mut HashMap<usize, VNode>) -> VNode {
        let children = match &self.inner.children {
            Children::Nodes(nodes) => {
                Children::Nodes(nodes.iter().map(|node| node.copy_into(copies)).collect())
            }
            other => other.clone(),
        };

        // Dynamic children are descendants, so their copies already exist
        let dynamic_children = self.inner.dynamic_children.read().as_ref().map(|list| {
            let mut copied = Vec::with_capacity(list.len());
            for node in list {
                let copy = match copies.get(&node.addr()) {
                    Some(copy) => copy.clone(),
                    None => node.copy_into(copies),
                };
                copied.push(copy);
            }
            copied
        });

        let shape = self.shape_flag()
            - (ShapeFlags::COMPONENT_SHOULD_KEEP_ALIVE | ShapeFlags::COMPONENT_KEPT_ALIVE);
        let copy = VNode {
            inner: Arc::new(VNodeInner {
                ty: self.inner.ty.clone(),
                props: self.inner.props.clone(),
                key: self.inner.key.clone(),
                children,
                shape_flag: AtomicU32::new(shape.bits()),
                patch_flag: self.inner.patch_flag,
                special: self.inner.special,
                dynamic_props: self.inner.dynamic_props.clone(),
                dynamic_children: RwLock::new(dynamic_children),
                mount: Mutex::new(MountState::default()),
            }),
        };
        copies.insert(self.addr(), copy.clone());
        copy
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    pub(crate) fn downgrade(&self) -> WeakVNode {
        WeakVNode(Arc::downgrade(&self.inner))
    }
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("VNode");
        s.field("type", &self.inner.ty);
        if let Some(key) = &self.inner.key {
            s.field("key", key);
        }
        if let Some(text) = self.text_content() {
            s.field("text", &text);
        }
        s.field("el", &self.el()).finish()
    }
}

impl From<&str> for VNode {
    fn from(text: &str) -> Self {
        VNode::text(text)
    }
}

impl From<String> for VNode {
    fn from(text: String) -> Self {
        VNode::text(text)
    }
}

/// Primitive children are normalized to text vnodes.
impl From<Value> for VNode {
    fn from(value: Value) -> Self {
        VNode::text(to_display_string(&value))
    }
}

/// Non-owning reference to a vnode.
#[derive(Clone, Default)]
pub(crate) struct WeakVNode(Weak<VNodeInner>);

impl WeakVNode {
    pub(crate) fn upgrade(&self) -> Option<VNode> {
        self.0.upgrade().map(|inner| VNode { inner })
    }
}

/// Whether `n1` can be patched into `n2` rather than replaced: same type and
/// same key.
pub fn is_same_vnode_type(n1: &VNode, n2: &VNode) -> bool {
    n1.ty() == n2.ty() && n1.key() == n2.key()
}

/// Render a value as text: strings as-is, `Null` as empty, objects and lists
/// as JSON.
pub fn to_display_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::List(_) | Value::Object(_) | Value::Reactive(_) => {
            serde_json::to_string(value).unwrap_or_default()
        }
    }
}

thread_local! {
    static BLOCK_STACK: RefCell<Vec<Vec<VNode>>> = const { RefCell::new(Vec::new()) };
}

/// Start collecting dynamic vnodes for a block.
pub fn open_block() {
    BLOCK_STACK.with(|stack| stack.borrow_mut().push(Vec::new()));
}

/// Stop collecting and return what the innermost block gathered.
pub fn close_block() -> Option<Vec<VNode>> {
    BLOCK_STACK.with(|stack| stack.borrow_mut().pop())
}

fn track_block_node(vnode: &VNode) {
    BLOCK_STACK.with(|stack| {
        if let Some(block) = stack.borrow_mut().last_mut() {
            block.push(vnode.clone());
        }
    });
}

fn setup_block(vnode: VNode) -> VNode {
    vnode.set_dynamic_children(close_block().unwrap_or_default());
    // A block is itself dynamic to its enclosing block
    track_block_node(&vnode);
    vnode
}

/// Create a vnode without patch hints.
pub fn create_vnode(ty: impl Into<VNodeType>, props: Option<Props>, children: Children) -> VNode {
    create_vnode_with_flags(ty, props, children, PatchFlags::empty(), Vec::new())
}

/// Create a vnode carrying patch hints; dynamic vnodes are recorded in the
/// open block.
pub fn create_vnode_with_flags(
    ty: impl Into<VNodeType>,
    props: Option<Props>,
    children: Children,
    patch_flag: PatchFlags,
    dynamic_props: Vec<String>,
) -> VNode {
    let vnode = VNode::build(ty.into(), props, children, patch_flag, dynamic_props);
    let dynamic = !(patch_flag.is_empty() || patch_flag == PatchFlags::NEED_HYDRATION);
    if dynamic || vnode.is_component() {
        track_block_node(&vnode);
    }
    vnode
}

/// Create an element vnode with patch hints.
pub fn create_element_vnode(
    tag: &str,
    props: Option<Props>,
    children: Children,
    patch_flag: PatchFlags,
    dynamic_props: Vec<String>,
) -> VNode {
    create_vnode_with_flags(tag, props, children, patch_flag, dynamic_props)
}

/// Create the root of a block, closing the block opened by [`open_block`].
pub fn create_block(
    ty: impl Into<VNodeType>,
    props: Option<Props>,
    children: Children,
    patch_flag: PatchFlags,
    dynamic_props: Vec<String>,
) -> VNode {
    setup_block(VNode::build(ty.into(), props, children, patch_flag, dynamic_props))
}

/// [`create_block`] for elements.
pub fn create_element_block(
    tag: &str,
    props: Option<Props>,
    children: Children,
    patch_flag: PatchFlags,
    dynamic_props: Vec<String>,
) -> VNode {
    create_block(tag, props, children, patch_flag, dynamic_props)
}

/// The optional second argument of [`h`].
pub enum HArg {
    Empty,
    Props(Props),
    Children(Children),
}

impl From<Props> for HArg {
    fn from(props: Props) -> Self {
        HArg::Props(props)
    }
}

impl From<Option<Props>> for HArg {
    fn from(props: Option<Props>) -> Self {
        props.map_or(HArg::Empty, HArg::Props)
    }
}

impl From<Children> for HArg {
    fn from(children: Children) -> Self {
        HArg::Children(children)
    }
}

impl From<VNode> for HArg {
    fn from(node: VNode) -> Self {
        HArg::Children(Children::Nodes(vec![node]))
    }
}

impl From<Vec<VNode>> for HArg {
    fn from(nodes: Vec<VNode>) -> Self {
        HArg::Children(Children::Nodes(nodes))
    }
}

impl From<&str> for HArg {
    fn from(text: &str) -> Self {
        HArg::Children(Children::from(text))
    }
}

impl From<String> for HArg {
    fn from(text: String) -> Self {
        HArg::Children(Children::from(text))
    }
}

impl From<Slots> for HArg {
    fn from(slots: Slots) -> Self {
        HArg::Children(Children::Slots(slots))
    }
}

/// Create a vnode.
///
/// With a single extra argument, props are told apart from children by type.
/// With two, the first is props and the second children. See the [`h!`]
/// macro for the variadic form.
///
/// [`h!`]: crate::h
pub fn h(ty: impl Into<VNodeType>, arg: Option<HArg>, children: Option<Children>) -> VNode {
    let (props, children) = match (arg, children) {
        (None, children) | (Some(HArg::Empty), children) => (None, children.unwrap_or_default()),
        (Some(HArg::Props(props)), children) => (Some(props), children.unwrap_or_default()),
        (Some(HArg::Children(children)), None) => (None, children),
        (Some(HArg::Children(_)), Some(children)) => {
            tracing::debug!("h() got children in the props position; ignoring them");
            (None, children)
        }
    };
    create_vnode(ty, props, children)
}

/// Create a vnode, `h`-style.
///
/// ```
/// use trellis_core::{h, props};
/// use trellis_core::render::VNode;
///
/// let list = h!("ul", props! { "id" => "list" }, h!("li", "one"), h!("li", "two"));
/// assert_eq!(list.children().as_nodes().map(|n| n.len()), Some(2));
///
/// let text_only = h!("p", "hello");
/// assert_eq!(text_only.children().as_text(), Some("hello"));
/// ```
#[macro_export]
macro_rules! h {
    ($ty:expr $(,)?) => {
        $crate::render::h($ty, None, None)
    };
    ($ty:expr, $arg:expr $(,)?) => {
        $crate::render::h($ty, Some($crate::render::HArg::from($arg)), None)
    };
    ($ty:expr, $props:expr, $children:expr $(,)?) => {
        $crate::render::h(
            $ty,
            Some($crate::render::HArg::from($props)),
            Some($crate::render::Children::from($children)),
        )
    };
    ($ty:expr, $props:expr, $first:expr, $($rest:expr),+ $(,)?) => {
        $crate::render::h(
            $ty,
            Some($crate::render::HArg::from($props)),
            Some($crate::render::Children::Nodes(vec![
                $crate::render::VNode::from($first),
                $($crate::render::VNode::from($rest)),+
            ])),
        )
    };
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props;

    #[test]
    fn shape_reflects_type_and_children() {
        let el = h!("div", "hi");
        assert_eq!(el.shape_flag(), ShapeFlags::ELEMENT | ShapeFlags::TEXT_CHILDREN);

        let list = h!("ul", vec![h!("li")]);
        assert!(list.shape_flag().contains(ShapeFlags::ARRAY_CHILDREN));

        let text = VNode::text("x");
        assert!(!text.shape_flag().contains(ShapeFlags::ELEMENT));
    }

    #[test]
    fn key_is_lifted_out_of_props() {
        let node = h!("li", props! { "key" => "a", "class" => "item" });
        assert_eq!(node.key(), Some(&Key::from("a")));
        assert!(node.prop("key").is_none());
        assert!(node.prop("class").is_some());

        let numbered = h!("li", props! { "key" => 3 });
        assert_eq!(numbered.key(), Some(&Key::Int(3)));
    }

    #[test]
    fn same_type_requires_type_and_key() {
        let a = h!("li", props! { "key" => "a" });
        let a2 = h!("li", props! { "key" => "a" });
        let b = h!("li", props! { "key" => "b" });
        let span = h!("span", props! { "key" => "a" });

        assert!(is_same_vnode_type(&a, &a2));
        assert!(!is_same_vnode_type(&a, &b));
        assert!(!is_same_vnode_type(&a, &span));
        assert!(is_same_vnode_type(&VNode::text("x"), &VNode::text("y")));
    }

    #[test]
    fn h_distinguishes_props_from_children() {
        let with_props = h!("div", props! { "id" => "x" });
        assert!(with_props.props().is_some());
        assert!(with_props.children().is_none());

        let with_child = h!("div", h!("span"));
        assert!(with_child.props().is_none());
        assert_eq!(with_child.children().as_nodes().map(|n| n.len()), Some(1));

        let three = h!("div", None::<Props>, h!("span"));
        assert_eq!(three.children().as_nodes().map(|n| n.len()), Some(1));

        let many = h!("div", props! {}, "a", "b", "c");
        assert_eq!(many.children().as_nodes().map(|n| n.len()), Some(3));
    }

    #[test]
    fn blocks_collect_dynamic_descendants() {
        open_block();
        let children = vec![
            create_element_vnode("p", None, "static".into(), PatchFlags::empty(), vec![]),
            create_element_vnode("p", None, "dyn".into(), PatchFlags::TEXT, vec![]),
            create_element_vnode(
                "input",
                Some(props! { "value" => "v" }),
                Children::None,
                PatchFlags::PROPS,
                vec!["value".into()],
            ),
        ];
        let root = create_element_block("div", None, children.into(), PatchFlags::empty(), vec![]);

        let dynamic = root.dynamic_children().unwrap();
        assert_eq!(dynamic.len(), 2);
        assert_eq!(dynamic[0].patch_flag(), PatchFlags::TEXT);
        assert_eq!(dynamic[1].dynamic_props(), ["value".to_string()]);

        // The stack is balanced
        assert!(close_block().is_none());
    }

    #[test]
    fn nested_block_is_tracked_by_parent() {
        open_block();
        open_block();
        let inner = create_element_block("span", None, Children::None, PatchFlags::empty(), vec![]);
        let outer = create_element_block("div", None, inner.into(), PatchFlags::empty(), vec![]);

        let dynamic = outer.dynamic_children().unwrap();
        assert_eq!(dynamic.len(), 1);
        assert_eq!(dynamic[0].ty(), &VNodeType::from("span"));
    }

    #[test]
    fn display_string_formats() {
        assert_eq!(to_display_string(&Value::Null), "");
        assert_eq!(to_display_string(&Value::from("a")), "a");
        assert_eq!(to_display_string(&Value::from(3)), "3");
        assert_eq!(to_display_string(&Value::from(1.5)), "1.5");
        assert_eq!(to_display_string(&Value::from(true)), "true");

        let obj: Object = [("a", 1)].into_iter().collect();
        assert_eq!(to_display_string(&Value::from(obj)), r#"{"a":1}"#);
    }

    #[test]
    fn text_children_are_normalized_by_type() {
        let fragment = create_vnode(VNodeType::Fragment, None, "hi".into());
        let nodes = fragment.children().as_nodes().unwrap();
        assert_eq!(nodes[0].text_content(), Some("hi"));

        let comp = Component::functional("C", |_, slots| VNode::fragment(slots.render("default")));
        let with_children = h!(&comp, None::<Props>, vec![h!("p")]);
        match with_children.children() {
            Children::Slots(slots) => assert_eq!(slots.render("default").len(), 1),
            other => panic!("expected slots, got {other:?}"),
        }
        assert!(with_children.shape_flag().contains(ShapeFlags::SLOTS_CHILDREN));
    }

    #[test]
    fn fresh_copy_remaps_dynamic_children() {
        open_block();
        let dynamic = create_element_vnode(
            "span",
            None,
            "x".into(),
            PatchFlags::TEXT,
            Vec::new(),
        );
        let inner = h!("p", vec![dynamic.clone()]);
        let block = create_element_block(
            "div",
            None,
            vec![inner].into(),
            PatchFlags::empty(),
            Vec::new(),
        );
        block.set_el(Some(NodeId::from(7)));

        let copy = block.fresh_copy();
        assert!(!copy.ptr_eq(&block));
        assert_eq!(copy.el(), None);

        let copied_inner = &copy.children().as_nodes().unwrap()[0];
        let copied_dynamic = &copied_inner.children().as_nodes().unwrap()[0];
        let tracked = copy.dynamic_children().unwrap();
        assert_eq!(tracked.len(), 1);
        assert!(tracked[0].ptr_eq(copied_dynamic));
        assert!(!tracked[0].ptr_eq(&dynamic));
    }
}
