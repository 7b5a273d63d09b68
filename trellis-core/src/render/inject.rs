//! Dependency injection between components.
//!
//! [`provide`] stores a value on the current instance. [`inject`] looks the
//! key up on the parent, then the parent's parent, and so on up to the root.
//! A component never sees its own provides, only its ancestors'.
//!
//! Both are no-ops outside `setup`/render: `provide` drops the value and
//! `inject` returns `None`.

use std::any::Any;
use std::sync::Arc;

use super::component::current_instance;

/// Make `value` available to descendants of the current component.
pub fn provide<T>(key: impl Into<String>, value: T)
where
    T: Any + Send + Sync,
{
    let key = key.into();
    match current_instance() {
        Some(instance) => instance.provide_value(key, Arc::new(value)),
        None => tracing::debug!(key, "provide() called outside a component"),
    }
}

/// Find the nearest ancestor value for `key`.
///
/// Returns `None` when no ancestor provides the key, when the provided value
/// is of another type, or when called outside a component.
pub fn inject<T>(key: &str) -> Option<T>
where
    T: Any + Send + Sync + Clone,
{
    let Some(instance) = current_instance() else {
        tracing::debug!(key, "inject() called outside a component");
        return None;
    };

    let mut ancestor = instance.parent();
    while let Some(current) = ancestor {
        if let Some(value) = current.provided(key) {
            return value.downcast_ref::<T>().cloned();
        }
        ancestor = current.parent();
    }
    None
}

/// [`inject`] with a fallback.
pub fn inject_or<T>(key: &str, default: T) -> T
where
    T: Any + Send + Sync + Clone,
{
    inject(key).unwrap_or(default)
}
