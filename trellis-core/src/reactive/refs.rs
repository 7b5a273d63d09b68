//! Refs
//!
//! A [`Ref`] is a single reactive slot. Reading `get()` inside an effect
//! subscribes the effect; `set()` notifies subscribers only when the new
//! value differs from the stored one.
//!
//! # How Refs Work
//!
//! A ref keeps two copies of its value:
//!
//! - the *raw* value, used for change detection
//! - the *exposed* value, returned by `get()`; for [`Value`] refs this is
//!   the raw value with objects wrapped in a reactive view
//!
//! `set()` unwraps reactive views before comparing, so assigning a ref the
//! object it already exposes is not a change.
//!
//! [`ObjectRef`] and [`to_refs`] project individual keys of a reactive
//! object as ref-like handles, and [`ProxyRefs`] unwraps a map of bindings
//! so that component state reads like plain values.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use super::computed::Computed;
use super::dep::LazyDep;
use super::proxy::{to_raw, to_reactive, Reactive};
use super::value::Value;

/// Values that can live in a [`Ref`].
pub trait RefValue: Clone + Send + Sync + 'static {
    /// Whether a write of `other` would leave the ref unchanged.
    fn same(&self, other: &Self) -> bool;

    /// The form handed out by reads.
    fn exposed(&self) -> Self {
        self.clone()
    }

    /// The form used for storage and comparison.
    fn into_raw(self) -> Self {
        self
    }
}

impl RefValue for Value {
    fn same(&self, other: &Self) -> bool {
        Value::same(self, other)
    }

    fn exposed(&self) -> Self {
        to_reactive(self.clone())
    }

    fn into_raw(self) -> Self {
        to_raw(self)
    }
}

macro_rules! impl_ref_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl RefValue for $ty {
                fn same(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

impl_ref_value!(bool, i32, i64, u32, u64, usize, f32, f64, String, char);

struct RefInner<T> {
    raw: RwLock<T>,
    exposed: RwLock<T>,
    dep: LazyDep,
}

/// A reactive single-value container.
///
/// Cloning shares the slot.
#[derive(Clone)]
pub struct Ref<T: RefValue> {
    inner: Arc<RefInner<T>>,
}

impl<T: RefValue> Ref<T> {
    pub fn new(value: T) -> Self {
        let raw = value.into_raw();
        let exposed = raw.exposed();
        Self {
            inner: Arc::new(RefInner {
                raw: RwLock::new(raw),
                exposed: RwLock::new(exposed),
                dep: LazyDep::new("ref"),
            }),
        }
    }

    /// Tracked read.
    pub fn get(&self) -> T {
        self.inner.dep.track();
        self.inner.exposed.read().clone()
    }

    /// Read without subscribing the active effect.
    pub fn get_untracked(&self) -> T {
        self.inner.exposed.read().clone()
    }

    /// Write `value`, notifying subscribers if it differs from the current
    /// raw value. Returns whether anything changed.
    pub fn set(&self, value: T) -> bool {
        let value = value.into_raw();
        {
            let mut raw = self.inner.raw.write();
            if raw.same(&value) {
                return false;
            }
            *self.inner.exposed.write() = value.exposed();
            *raw = value;
        }
        tracing::trace!(subscribers = self.inner.dep.subscriber_count(), "ref set");
        self.inner.dep.trigger();
        true
    }

    /// Read-modify-write.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> bool {
        let current = self.inner.raw.read().clone();
        let next = f(&current);
        self.set(next)
    }

    /// Number of effects currently subscribed.
    pub fn subscriber_count(&self) -> usize {
        self.inner.dep.subscriber_count()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: RefValue + fmt::Debug> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("value", &*self.inner.raw.read())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// A ref-like handle on one key of a reactive object.
#[derive(Clone, Debug)]
pub struct ObjectRef {
    target: Reactive,
    key: String,
}

impl ObjectRef {
    /// Tracked read of the key.
    pub fn get(&self) -> Value {
        self.target.get(&self.key)
    }

    pub fn set(&self, value: impl Into<Value>) -> bool {
        self.target.set(&self.key, value)
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Project one key of a reactive object as a ref.
pub fn to_ref(target: &Reactive, key: impl Into<String>) -> ObjectRef {
    ObjectRef {
        target: target.clone(),
        key: key.into(),
    }
}

/// Project every current key of a reactive object as a ref.
pub fn to_refs(target: &Reactive) -> IndexMap<String, ObjectRef> {
    target
        .raw()
        .keys()
        .into_iter()
        .map(|key| (key.clone(), to_ref(target, key)))
        .collect()
}

/// A named entry of component state.
#[derive(Clone)]
pub enum Binding {
    /// A plain value, read as-is and replaced on write.
    Value(Value),
    Ref(Ref<Value>),
    Computed(Computed<Value>),
    ObjectRef(ObjectRef),
}

impl Binding {
    fn get(&self) -> Value {
        match self {
            Binding::Value(value) => value.clone(),
            Binding::Ref(r) => r.get(),
            Binding::Computed(c) => c.get(),
            Binding::ObjectRef(r) => r.get(),
        }
    }
}

impl From<Value> for Binding {
    fn from(value: Value) -> Self {
        Binding::Value(value)
    }
}

impl From<Ref<Value>> for Binding {
    fn from(r: Ref<Value>) -> Self {
        Binding::Ref(r)
    }
}

impl From<Computed<Value>> for Binding {
    fn from(c: Computed<Value>) -> Self {
        Binding::Computed(c)
    }
}

impl From<ObjectRef> for Binding {
    fn from(r: ObjectRef) -> Self {
        Binding::ObjectRef(r)
    }
}

/// A map of bindings whose refs read and write like plain values.
#[derive(Clone, Default)]
pub struct ProxyRefs {
    bindings: Arc<RwLock<IndexMap<String, Binding>>>,
}

impl ProxyRefs {
    pub fn new(bindings: impl IntoIterator<Item = (String, Binding)>) -> Self {
        Self {
            bindings: Arc::new(RwLock::new(bindings.into_iter().collect())),
        }
    }

    /// Read a binding, unwrapping refs. `None` if the key is unknown.
    pub fn get(&self, key: &str) -> Option<Value> {
        let binding = self.bindings.read().get(key).cloned()?;
        Some(binding.get())
    }

    /// Write through a ref binding, or replace a plain one.
    ///
    /// Returns whether anything changed.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        let binding = self.bindings.read().get(key).cloned();
        match binding {
            Some(Binding::Ref(r)) => r.set(value),
            Some(Binding::ObjectRef(r)) => r.set(value),
            Some(Binding::Computed(c)) => c.set(value).is_ok(),
            Some(Binding::Value(_)) | None => {
                self.bindings
                    .write()
                    .insert(key.to_string(), Binding::Value(value));
                true
            }
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.bindings.read().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.bindings.read().keys().cloned().collect()
    }
}

/// Unwrap a map of bindings.
pub fn proxy_refs(bindings: impl IntoIterator<Item = (String, Binding)>) -> ProxyRefs {
    ProxyRefs::new(bindings)
}

// ---- Tests ----
