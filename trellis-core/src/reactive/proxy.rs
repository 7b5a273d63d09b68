//! Reactive Objects
//!
//! A [`Reactive`] is a tracked view over a raw [`Object`]. Every read through
//! the view subscribes the active effect to that key; every write that
//! changes a value notifies the key's subscribers.
//!
//! Views are cheap handles: wrapping the same object twice yields views that
//! compare equal, and wrapping a view again is a no-op. Reads of nested
//! objects return reactive views too, unless the view is shallow.
//!
//! Adding or removing a key also notifies subscribers of the key set, so
//! code that iterates [`keys`](Reactive::keys) re-runs when the shape of the
//! object changes.

use std::fmt;

use super::dep::{track, trigger};
use super::value::{Object, Value};

/// Pseudo-key under which iteration over an object's keys is tracked.
pub(crate) const ITERATE_KEY: &str = "\u{0}iterate";

/// A tracked view over an object.
#[derive(Clone)]
pub struct Reactive {
    target: Object,
    shallow: bool,
}

/// Wrap an object in a deep reactive view.
pub fn reactive(target: &Object) -> Reactive {
    Reactive {
        target: target.clone(),
        shallow: false,
    }
}

/// Wrap an object in a view that tracks only its own keys.
pub fn shallow_reactive(target: &Object) -> Reactive {
    Reactive {
        target: target.clone(),
        shallow: true,
    }
}

/// Wrap object values in a deep reactive view; other values pass through.
pub fn to_reactive(value: Value) -> Value {
    match value {
        Value::Object(object) => Value::Reactive(reactive(&object)),
        other => other,
    }
}

/// Strip a reactive view down to its raw object; other values pass through.
pub fn to_raw(value: Value) -> Value {
    match value {
        Value::Reactive(reactive) => Value::Object(reactive.target),
        other => other,
    }
}

pub fn is_reactive(value: &Value) -> bool {
    matches!(value, Value::Reactive(_))
}

impl Reactive {
    /// Tracked read. Missing keys read as `Null`.
    pub fn get(&self, key: &str) -> Value {
        track(self.target.id(), key);
        let value = self.target.get(key).unwrap_or_default();
        if self.shallow {
            value
        } else {
            to_reactive(value)
        }
    }

    /// Write `value`, notifying subscribers if it differs from the current
    /// value. Returns whether anything changed.
    ///
    /// Reactive views are stored as their raw object.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> bool {
        let value = to_raw(value.into());
        let previous = self.target.insert(key, value.clone());
        match previous {
            Some(old) if old.same(&value) => false,
            Some(_) => {
                tracing::trace!(key, "reactive set");
                trigger(self.target.id(), key);
                true
            }
            None => {
                tracing::trace!(key, "reactive add");
                trigger(self.target.id(), key);
                trigger(self.target.id(), ITERATE_KEY);
                true
            }
        }
    }

    /// Remove a key, notifying its subscribers and those of the key set.
    pub fn remove(&self, key: &str) -> Option<Value> {
        let removed = self.target.remove(key)?;
        trigger(self.target.id(), key);
        trigger(self.target.id(), ITERATE_KEY);
        Some(removed)
    }

    /// Tracked membership test.
    pub fn contains_key(&self, key: &str) -> bool {
        track(self.target.id(), key);
        self.target.contains_key(key)
    }

    /// Keys in insertion order, tracking the key set.
    pub fn keys(&self) -> Vec<String> {
        track(self.target.id(), ITERATE_KEY);
        self.target.keys()
    }

    /// Read-modify-write of one key.
    pub fn update(&self, key: &str, f: impl FnOnce(Value) -> Value) -> bool {
        let current = super::context::untracked(|| self.get(key));
        self.set(key, f(current))
    }

    /// The raw object behind the view.
    pub fn raw(&self) -> &Object {
        &self.target
    }

    pub fn is_shallow(&self) -> bool {
        self.shallow
    }

    pub fn ptr_eq(&self, other: &Reactive) -> bool {
        self.target.ptr_eq(&other.target)
    }
}

impl PartialEq for Reactive {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) && self.shallow == other.shallow
    }
}

impl fmt::Debug for Reactive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactive")
            .field("target", &self.target)
            .field("shallow", &self.shallow)
            .finish()
    }
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::effect;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;

    fn state() -> Reactive {
        let raw: Object = [("a", 1), ("b", 2)].into_iter().collect();
        reactive(&raw)
    }

    #[test]
    fn wrapping_is_idempotent() {
        let raw = Object::new();
        let first = reactive(&raw);
        let second = reactive(&raw);
        assert_eq!(first, second);

        let value = to_reactive(Value::Reactive(first.clone()));
        assert!(matches!(value, Value::Reactive(ref r) if *r == first));

        assert!(to_raw(value).target().unwrap().ptr_eq(&raw));
        assert!(!is_reactive(&Value::from(1)));
        assert_eq!(to_reactive(Value::from(1)), Value::from(1));
    }

    #[test]
    fn unchanged_write_does_not_notify() {
        let state = state();
        let runs = Arc::new(AtomicI32::new(0));

        let _runner = effect({
            let state = state.clone();
            let runs = runs.clone();
            move || {
                state.get("a");
                runs.fetch_add(1, Ordering::SeqCst);
            }
        });

        assert!(!state.set("a", 1));
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        assert!(state.set("a", 5));
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn nested_objects_read_as_reactive() {
        let inner: Object = [("n", 1)].into_iter().collect();
        let raw: Object = [("inner", Value::from(inner.clone()))].into_iter().collect();

        let deep = reactive(&raw);
        assert!(is_reactive(&deep.get("inner")));

        let shallow = shallow_reactive(&raw);
        assert!(!is_reactive(&shallow.get("inner")));

        // Writing a view back stores the raw object and is not a change
        assert!(!deep.set("inner", deep.get("inner")));
        assert!(matches!(raw.get("inner"), Some(Value::Object(_))));
    }

    #[test]
    fn key_set_changes_notify_iteration() {
        let state = state();
        let seen = Arc::new(AtomicI32::new(0));

        let _runner = effect({
            let state = state.clone();
            let seen = seen.clone();
            move || seen.store(state.keys().len() as i32, Ordering::SeqCst)
        });
        assert_eq!(seen.load(Ordering::SeqCst), 2);

        state.set("c", 3);
        assert_eq!(seen.load(Ordering::SeqCst), 3);

        state.remove("a");
        assert_eq!(seen.load(Ordering::SeqCst), 2);

        // Updating an existing key leaves the key set alone
        state.set("b", 20);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
