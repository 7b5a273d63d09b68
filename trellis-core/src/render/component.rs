//! Components and component instances.
//!
//! A [`Component`] is a definition: declared props, an optional `data`
//! factory, an optional `setup` function and a render function. Mounting a
//! component vnode creates a [`ComponentInstance`] that owns the live state:
//!
//! - **props**: declared props, shallow reactive, read-only to user code
//! - **attrs**: every other prop passed by the parent, not reactive
//! - **slots**: content passed by the parent
//! - **data** / **setup state**: the component's own reactive state
//! - **sub tree**: the vnode tree produced by the last render
//!
//! The renderer drives the instance through one render effect; see
//! [`renderer`](super::renderer).

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use super::keep_alive::KeepAliveContext;
use super::lifecycle::LifecycleHook;
use super::vnode::{Children, Props, PropValue, Slots, VNode, WeakVNode};
use crate::error::{report, Result, RuntimeError};
use crate::reactive::{
    reactive, shallow_reactive, untracked, Binding, EffectScope, Object, ProxyRefs, Reactive,
    ReactiveEffect, Value,
};
use crate::scheduler::Job;

/// Render function of a stateful component.
pub type RenderFn = Arc<dyn Fn(&RenderContext) -> VNode + Send + Sync>;

/// `setup(props, ctx)`.
pub type SetupFn = Arc<dyn Fn(&ReadonlyProps, &SetupContext) -> SetupResult + Send + Sync>;

/// Render function of a functional component: `(attrs, slots)`.
pub type FunctionalFn = Arc<dyn Fn(&Props, &Slots) -> VNode + Send + Sync>;

type DataFactory = Arc<dyn Fn(&ReadonlyProps) -> Object + Send + Sync>;

/// The `data` option.
#[derive(Clone)]
pub enum DataOption {
    /// Called once per instance; the result becomes reactive.
    Factory(DataFactory),
    /// A shared object. Rejected: instances must not share state.
    Value(Object),
}

/// What `setup` returns.
pub enum SetupResult {
    /// Use this as the render function.
    Render(RenderFn),
    /// Bindings exposed to the render function, ref-unwrapped.
    State(Vec<(String, Binding)>),
    Empty,
}

impl SetupResult {
    pub fn render<F>(f: F) -> Self
    where
        F: Fn(&RenderContext) -> VNode + Send + Sync + 'static,
    {
        SetupResult::Render(Arc::new(f))
    }

    pub fn state<K, B>(bindings: impl IntoIterator<Item = (K, B)>) -> Self
    where
        K: Into<String>,
        B: Into<Binding>,
    {
        SetupResult::State(
            bindings
                .into_iter()
                .map(|(k, b)| (k.into(), b.into()))
                .collect(),
        )
    }
}

struct ComponentDef {
    name: String,
    props: Vec<String>,
    data: Option<DataOption>,
    setup: Option<SetupFn>,
    render: Option<RenderFn>,
    functional: Option<FunctionalFn>,
    keep_alive: bool,
}

/// A component definition. Cloning shares the definition; two vnodes are of
/// the same component type only if they share it.
#[derive(Clone)]
pub struct Component {
    inner: Arc<ComponentDef>,
}

impl Component {
    pub fn builder(name: impl Into<String>) -> ComponentBuilder {
        ComponentBuilder {
            def: ComponentDef {
                name: name.into(),
                props: Vec::new(),
                data: None,
                setup: None,
                render: None,
                functional: None,
                keep_alive: false,
            },
        }
    }

    /// A stateless component rendered from its attrs and slots.
    pub fn functional<F>(name: impl Into<String>, render: F) -> Self
    where
        F: Fn(&Props, &Slots) -> VNode + Send + Sync + 'static,
    {
        let mut builder = Self::builder(name);
        builder.def.functional = Some(Arc::new(render));
        builder.build()
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn is_functional(&self) -> bool {
        self.inner.functional.is_some()
    }

    pub fn is_keep_alive(&self) -> bool {
        self.inner.keep_alive
    }

    pub fn declares(&self, prop: &str) -> bool {
        self.inner.props.iter().any(|p| p == prop)
    }

    pub fn ptr_eq(&self, other: &Component) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn identity(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.inner.name)
            .field("props", &self.inner.props)
            .field("functional", &self.is_functional())
            .finish()
    }
}

/// Builder for stateful components.
pub struct ComponentBuilder {
    def: ComponentDef,
}

impl ComponentBuilder {
    /// Declare props. Undeclared props become attrs.
    pub fn props<I, S>(mut self, props: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.def.props = props.into_iter().map(Into::into).collect();
        self
    }

    pub fn data<F>(mut self, factory: F) -> Self
    where
        F: Fn(&ReadonlyProps) -> Object + Send + Sync + 'static,
    {
        self.def.data = Some(DataOption::Factory(Arc::new(factory)));
        self
    }

    pub fn data_option(mut self, data: DataOption) -> Self {
        self.def.data = Some(data);
        self
    }

    pub fn setup<F>(mut self, setup: F) -> Self
    where
        F: Fn(&ReadonlyProps, &SetupContext) -> SetupResult + Send + Sync + 'static,
    {
        self.def.setup = Some(Arc::new(setup));
        self
    }

    pub fn render<F>(mut self, render: F) -> Self
    where
        F: Fn(&RenderContext) -> VNode + Send + Sync + 'static,
    {
        self.def.render = Some(Arc::new(render));
        self
    }

    pub(crate) fn keep_alive(mut self) -> Self {
        self.def.keep_alive = true;
        self
    }

    pub fn build(self) -> Component {
        Component {
            inner: Arc::new(self.def),
        }
    }
}

/// Declared props as seen by user code. Reads track; writes are rejected.
#[derive(Clone)]
pub struct ReadonlyProps {
    inner: Reactive,
}

impl ReadonlyProps {
    pub fn get(&self, key: &str) -> Value {
        self.inner.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }

    /// Always fails with [`RuntimeError::ReadonlyProp`]; nothing is written.
    pub fn set(&self, key: &str, _value: impl Into<Value>) -> Result<()> {
        let err = RuntimeError::ReadonlyProp {
            key: key.to_string(),
        };
        report(err.clone());
        Err(err)
    }
}

impl fmt::Debug for ReadonlyProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadonlyProps")
            .field(&self.inner.raw().keys())
            .finish()
    }
}

pub(crate) type HookFn = Arc<dyn Fn() + Send + Sync>;
type Provided = Arc<dyn Any + Send + Sync>;

pub(crate) struct InstanceInner {
    uid: u64,
    def: Component,
    parent: Option<Weak<InstanceInner>>,
    vnode: Mutex<WeakVNode>,
    raw_props: RwLock<Props>,
    props: Reactive,
    attrs: RwLock<Props>,
    slots: RwLock<Slots>,
    data: RwLock<Option<Reactive>>,
    setup_state: RwLock<Option<ProxyRefs>>,
    render: RwLock<Option<RenderFn>>,
    sub_tree: Mutex<Option<VNode>>,
    next: Mutex<Option<VNode>>,
    effect: Mutex<Option<ReactiveEffect>>,
    update: Mutex<Option<Job>>,
    exposed: Mutex<Option<Value>>,
    provides: Mutex<HashMap<String, Provided>>,
    hooks: Mutex<HashMap<LifecycleHook, Vec<HookFn>>>,
    scope: EffectScope,
    keep_alive: Mutex<Option<Arc<KeepAliveContext>>>,
    is_mounted: AtomicBool,
    is_unmounted: AtomicBool,
}

/// A mounted component. Cloning shares the instance.
#[derive(Clone)]
pub struct ComponentInstance {
    inner: Arc<InstanceInner>,
}

fn split_props(def: &Component, raw: Option<&Props>) -> (Object, Props) {
    let props = Object::new();
    let mut attrs = Props::new();
    for (key, value) in raw.into_iter().flatten() {
        if def.declares(key) {
            match value {
                PropValue::Value(v) => {
                    props.insert(key.clone(), v.clone());
                }
                PropValue::Handler(_) => {
                    tracing::debug!(component = def.name(), key, "handler passed as declared prop");
                    props.insert(key.clone(), Value::Null);
                }
            }
        } else {
            attrs.insert(key.clone(), value.clone());
        }
    }
    (props, attrs)
}

impl ComponentInstance {
    pub(crate) fn new(def: &Component, vnode: &VNode, parent: Option<&ComponentInstance>) -> Self {
        static NEXT_UID: AtomicU64 = AtomicU64::new(0);

        let (props, attrs) = split_props(def, vnode.props());
        let slots = match vnode.children() {
            Children::Slots(slots) => slots.clone(),
            _ => Slots::default(),
        };

        Self {
            inner: Arc::new(InstanceInner {
                uid: NEXT_UID.fetch_add(1, Ordering::Relaxed),
                def: def.clone(),
                parent: parent.map(|p| Arc::downgrade(&p.inner)),
                vnode: Mutex::new(vnode.downgrade()),
                raw_props: RwLock::new(vnode.props().cloned().unwrap_or_default()),
                props: shallow_reactive(&props),
                attrs: RwLock::new(attrs),
                slots: RwLock::new(slots),
                data: RwLock::new(None),
                setup_state: RwLock::new(None),
                render: RwLock::new(None),
                sub_tree: Mutex::new(None),
                next: Mutex::new(None),
                effect: Mutex::new(None),
                update: Mutex::new(None),
                exposed: Mutex::new(None),
                provides: Mutex::new(HashMap::new()),
                hooks: Mutex::new(HashMap::new()),
                scope: EffectScope::new(),
                keep_alive: Mutex::new(None),
                is_mounted: AtomicBool::new(false),
                is_unmounted: AtomicBool::new(false),
            }),
        }
    }

    /// Run `data` and `setup`.
    ///
    /// Runs untracked with this instance current, inside its effect scope so
    /// watchers created here stop with the instance.
    pub(crate) fn setup(&self) {
        let def = self.inner.def.clone();
        let _current = CurrentInstance::enter(self.clone());
        untracked(|| {
            self.inner.scope.run(|| {
                let props = self.props();

                if let Some(setup) = &def.inner.setup {
                    let ctx = SetupContext {
                        instance: self.clone(),
                    };
                    match setup(&props, &ctx) {
                        SetupResult::Render(render) => *self.inner.render.write() = Some(render),
                        SetupResult::State(bindings) => {
                            *self.inner.setup_state.write() = Some(ProxyRefs::new(bindings))
                        }
                        SetupResult::Empty => {}
                    }
                }

                match &def.inner.data {
                    Some(DataOption::Factory(factory)) => {
                        let data = factory(&props);
                        *self.inner.data.write() = Some(reactive(&data));
                    }
                    Some(DataOption::Value(_)) => report(RuntimeError::DataNotFunction {
                        component: def.name().to_string(),
                    }),
                    None => {}
                }
            })
        });

        let mut render = self.inner.render.write();
        if render.is_none() {
            *render = def.inner.render.clone();
        }
    }

    /// Produce the component's next sub tree.
    pub(crate) fn render_root(&self) -> VNode {
        let _current = CurrentInstance::enter(self.clone());

        if let Some(functional) = self.inner.def.inner.functional.clone() {
            let attrs = self.attrs();
            let slots = self.slots();
            return functional(&attrs, &slots);
        }

        let render = self.inner.render.read().clone();
        match render {
            Some(render) => render(&RenderContext {
                instance: self.clone(),
            }),
            None => {
                tracing::warn!(component = self.name(), "component has no render function");
                VNode::text("")
            }
        }
    }

    /// Take a parent-supplied vnode: refresh props, attrs and slots.
    pub(crate) fn apply_next(&self, next: &VNode) {
        self.set_vnode(next);

        let raw = next.props().cloned().unwrap_or_default();
        let (props, attrs) = split_props(&self.inner.def, Some(&raw));
        for key in self.inner.props.raw().keys() {
            if !props.contains_key(&key) {
                self.inner.props.remove(&key);
            }
        }
        for key in props.keys() {
            if let Some(value) = props.get(&key) {
                self.inner.props.set(&key, value);
            }
        }
        *self.inner.attrs.write() = attrs;
        *self.inner.raw_props.write() = raw;

        *self.inner.slots.write() = match next.children() {
            Children::Slots(slots) => slots.clone(),
            _ => Slots::default(),
        };
    }

    pub fn uid(&self) -> u64 {
        self.inner.uid
    }

    pub fn name(&self) -> &str {
        self.inner.def.name()
    }

    pub fn component(&self) -> &Component {
        &self.inner.def
    }

    pub fn parent(&self) -> Option<ComponentInstance> {
        self.inner
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| ComponentInstance { inner })
    }

    pub fn vnode(&self) -> Option<VNode> {
        self.inner.vnode.lock().upgrade()
    }

    pub(crate) fn set_vnode(&self, vnode: &VNode) {
        *self.inner.vnode.lock() = vnode.downgrade();
    }

    pub fn props(&self) -> ReadonlyProps {
        ReadonlyProps {
            inner: self.inner.props.clone(),
        }
    }

    pub fn attrs(&self) -> Props {
        self.inner.attrs.read().clone()
    }

    pub fn slots(&self) -> Slots {
        self.inner.slots.read().clone()
    }

    pub fn data(&self) -> Option<Reactive> {
        self.inner.data.read().clone()
    }

    pub fn setup_state(&self) -> Option<ProxyRefs> {
        self.inner.setup_state.read().clone()
    }

    pub fn exposed(&self) -> Option<Value> {
        self.inner.exposed.lock().clone()
    }

    pub fn sub_tree(&self) -> Option<VNode> {
        self.inner.sub_tree.lock().clone()
    }

    pub(crate) fn set_sub_tree(&self, tree: VNode) {
        *self.inner.sub_tree.lock() = Some(tree);
    }

    pub(crate) fn set_next(&self, next: VNode) {
        *self.inner.next.lock() = Some(next);
    }

    pub(crate) fn take_next(&self) -> Option<VNode> {
        self.inner.next.lock().take()
    }

    pub fn effect(&self) -> Option<ReactiveEffect> {
        self.inner.effect.lock().clone()
    }

    pub(crate) fn set_render_effect(&self, effect: ReactiveEffect, job: Job) {
        *self.inner.effect.lock() = Some(effect);
        *self.inner.update.lock() = Some(job);
    }

    pub(crate) fn update_job(&self) -> Option<Job> {
        self.inner.update.lock().clone()
    }

    /// Re-render synchronously.
    pub fn update(&self) {
        let effect = self.effect();
        let job = self.update_job();
        if let (Some(effect), Some(job)) = (effect, job) {
            effect.set_dirty(true);
            job();
        }
    }

    pub fn scope(&self) -> &EffectScope {
        &self.inner.scope
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.is_mounted.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_mounted(&self) {
        self.inner.is_mounted.store(true, Ordering::SeqCst);
    }

    pub fn is_unmounted(&self) -> bool {
        self.inner.is_unmounted.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_unmounted(&self) {
        self.inner.is_unmounted.store(true, Ordering::SeqCst);
    }

    pub(crate) fn add_hook(&self, hook: LifecycleHook, f: HookFn) {
        self.inner.hooks.lock().entry(hook).or_default().push(f);
    }

    /// Run the hooks of one kind, untracked, with this instance current.
    pub(crate) fn invoke_hooks(&self, hook: LifecycleHook) {
        let hooks = self.inner.hooks.lock().get(&hook).cloned();
        let Some(hooks) = hooks else {
            return;
        };
        let _current = CurrentInstance::enter(self.clone());
        untracked(|| {
            for f in &hooks {
                f();
            }
        });
    }

    pub fn hook_count(&self, hook: LifecycleHook) -> usize {
        self.inner.hooks.lock().get(&hook).map_or(0, Vec::len)
    }

    pub(crate) fn provide_value(&self, key: String, value: Provided) {
        self.inner.provides.lock().insert(key, value);
    }

    pub(crate) fn provided(&self, key: &str) -> Option<Provided> {
        self.inner.provides.lock().get(key).cloned()
    }

    pub(crate) fn keep_alive(&self) -> Option<Arc<KeepAliveContext>> {
        self.inner.keep_alive.lock().clone()
    }

    pub(crate) fn set_keep_alive(&self, ctx: Arc<KeepAliveContext>) {
        *self.inner.keep_alive.lock() = Some(ctx);
    }

    fn emit(&self, event: &str, args: &[Value]) {
        let name = handler_name(event);
        let handler = self
            .inner
            .raw_props
            .read()
            .get(&name)
            .and_then(PropValue::as_handler)
            .cloned();
        match handler {
            Some(handler) => handler.call(args),
            None => tracing::trace!(component = self.name(), event, "no listener for event"),
        }
    }

    pub fn ptr_eq(&self, other: &ComponentInstance) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn downgrade(&self) -> WeakInstance {
        WeakInstance(Arc::downgrade(&self.inner))
    }
}

impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("uid", &self.inner.uid)
            .field("name", &self.name())
            .field("mounted", &self.is_mounted())
            .field("unmounted", &self.is_unmounted())
            .finish()
    }
}

/// Non-owning reference to an instance, held by its update job.
#[derive(Clone)]
pub(crate) struct WeakInstance(Weak<InstanceInner>);

impl WeakInstance {
    pub(crate) fn upgrade(&self) -> Option<ComponentInstance> {
        self.0.upgrade().map(|inner| ComponentInstance { inner })
    }
}

/// `click` -> `onClick`.
fn handler_name(event: &str) -> String {
    let mut chars = event.chars();
    match chars.next() {
        Some(first) => format!("on{}{}", first.to_uppercase(), chars.as_str()),
        None => "on".to_string(),
    }
}

/// Second argument of `setup`.
#[derive(Clone)]
pub struct SetupContext {
    instance: ComponentInstance,
}

impl SetupContext {
    pub fn attrs(&self) -> Props {
        self.instance.attrs()
    }

    pub fn slots(&self) -> Slots {
        self.instance.slots()
    }

    /// Call the parent's `on<Event>` handler, if any.
    pub fn emit(&self, event: &str, args: &[Value]) {
        self.instance.emit(event, args);
    }

    /// Set the value a parent sees through a template ref.
    pub fn expose(&self, value: impl Into<Value>) {
        *self.instance.inner.exposed.lock() = Some(value.into());
    }

    pub fn instance(&self) -> &ComponentInstance {
        &self.instance
    }
}

/// What a render function sees.
///
/// [`get`](Self::get) resolves a name against data, then declared props,
/// then setup state.
#[derive(Clone)]
pub struct RenderContext {
    instance: ComponentInstance,
}

impl RenderContext {
    pub fn get(&self, key: &str) -> Value {
        if let Some(data) = self.instance.data() {
            if data.contains_key(key) {
                return data.get(key);
            }
        }
        if self.instance.component().declares(key) {
            return self.instance.inner.props.get(key);
        }
        if let Some(state) = self.instance.setup_state() {
            if let Some(value) = state.get(key) {
                return value;
            }
        }
        tracing::trace!(component = self.instance.name(), key, "unresolved render context key");
        Value::Null
    }

    /// Write data or setup state. Writing a declared prop is rejected.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        if let Some(data) = self.instance.data() {
            if data.raw().contains_key(key) {
                data.set(key, value);
                return Ok(());
            }
        }
        if self.instance.component().declares(key) {
            return self.instance.props().set(key, value);
        }
        if let Some(state) = self.instance.setup_state() {
            if state.contains_key(key) {
                state.set(key, value);
                return Ok(());
            }
        }
        tracing::debug!(component = self.instance.name(), key, "write to unknown key ignored");
        Ok(())
    }

    pub fn props(&self) -> ReadonlyProps {
        self.instance.props()
    }

    pub fn attrs(&self) -> Props {
        self.instance.attrs()
    }

    pub fn slots(&self) -> Slots {
        self.instance.slots()
    }

    pub fn render_slot(&self, name: &str) -> Vec<VNode> {
        self.instance.slots().render(name)
    }

    pub fn emit(&self, event: &str, args: &[Value]) {
        self.instance.emit(event, args);
    }

    pub fn instance(&self) -> &ComponentInstance {
        &self.instance
    }
}

thread_local! {
    static CURRENT_INSTANCE: RefCell<Option<ComponentInstance>> = const { RefCell::new(None) };
}

/// The instance whose setup, render or hook is running.
pub fn current_instance() -> Option<ComponentInstance> {
    CURRENT_INSTANCE.with(|slot| slot.borrow().clone())
}

/// Sets the current instance; restores the previous one on drop.
pub(crate) struct CurrentInstance {
    prev: Option<ComponentInstance>,
}

impl CurrentInstance {
    pub(crate) fn enter(instance: ComponentInstance) -> Self {
        let prev = CURRENT_INSTANCE.with(|slot| slot.borrow_mut().replace(instance));
        Self { prev }
    }
}

impl Drop for CurrentInstance {
    fn drop(&mut self) {
        let prev = self.prev.take();
        CURRENT_INSTANCE.with(|slot| *slot.borrow_mut() = prev);
    }
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props;
    use crate::render::{h, HArg, Handler};
    use std::sync::atomic::AtomicI32;

    fn mount_like(def: &Component, props: Props) -> ComponentInstance {
        let vnode = h(def, Some(HArg::Props(props)), None);
        let instance = ComponentInstance::new(def, &vnode, None);
        instance.setup();
        instance
    }

    #[test]
    fn declared_props_and_attrs_are_split() {
        let def = Component::builder("Item")
            .props(["label"])
            .render(|_| VNode::text(""))
            .build();
        let instance = mount_like(&def, props! { "label" => "a", "class" => "x" });

        assert_eq!(instance.props().get("label"), Value::from("a"));
        assert!(!instance.props().contains_key("class"));
        assert!(instance.attrs().contains_key("class"));
    }

    #[test]
    fn writing_props_is_rejected() {
        crate::error::take_diagnostics();
        let def = Component::builder("Item")
            .props(["label"])
            .render(|_| VNode::text(""))
            .build();
        let instance = mount_like(&def, props! { "label" => "a" });

        let err = instance.props().set("label", "b").unwrap_err();
        assert_eq!(err, RuntimeError::ReadonlyProp { key: "label".into() });
        assert_eq!(instance.props().get("label"), Value::from("a"));
        assert_eq!(crate::error::take_diagnostics(), vec![err]);
    }

    #[test]
    fn non_function_data_reports_and_continues() {
        crate::error::take_diagnostics();
        let def = Component::builder("Bad")
            .data_option(DataOption::Value(Object::new()))
            .render(|_| VNode::text(""))
            .build();
        let instance = mount_like(&def, Props::new());

        assert!(instance.data().is_none());
        assert_eq!(
            crate::error::take_diagnostics(),
            vec![RuntimeError::DataNotFunction { component: "Bad".into() }]
        );
    }

    #[test]
    fn render_context_resolution_order() {
        let def = Component::builder("Ctx")
            .props(["name"])
            .data(|_| [("count", 1)].into_iter().collect())
            .setup(|_, _| SetupResult::state([("title", Value::from("t"))]))
            .render(|_| VNode::text(""))
            .build();
        let instance = mount_like(&def, props! { "name" => "n" });
        let ctx = RenderContext { instance };

        assert_eq!(ctx.get("count"), Value::from(1));
        assert_eq!(ctx.get("name"), Value::from("n"));
        assert_eq!(ctx.get("title"), Value::from("t"));
        assert_eq!(ctx.get("missing"), Value::Null);

        ctx.set("count", 2).unwrap();
        assert_eq!(ctx.get("count"), Value::from(2));
        assert!(ctx.set("name", "other").is_err());
    }

    #[test]
    fn emit_calls_on_handler() {
        let hits = Arc::new(AtomicI32::new(0));
        let handler = {
            let hits = hits.clone();
            Handler::new(move |args: &[Value]| {
                hits.fetch_add(args[0].as_int().unwrap_or(0) as i32, Ordering::SeqCst);
            })
        };
        let def = Component::builder("Emitter")
            .render(|_| VNode::text(""))
            .build();
        let instance = mount_like(&def, props! { "onChange" => handler });
        let ctx = SetupContext { instance };

        ctx.emit("change", &[Value::from(5)]);
        ctx.emit("other", &[]);
        assert_eq!(hits.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn current_instance_restored_after_setup() {
        let seen = Arc::new(AtomicBool::new(false));
        let def = Component::builder("Sample")
            .setup({
                let seen = seen.clone();
                move |_, _| {
                    seen.store(current_instance().is_some(), Ordering::SeqCst);
                    SetupResult::Empty
                }
            })
            .build();
        mount_like(&def, Props::new());

        assert!(seen.load(Ordering::SeqCst));
        assert!(current_instance().is_none());
    }

    #[test]
    fn handler_names() {
        assert_eq!(handler_name("click"), "onClick");
        assert_eq!(handler_name("update"), "onUpdate");
    }
}
