//! Watchers
//!
//! [`watch`] runs a callback when a source changes, handing it the new and
//! previous values. [`watch_effect`] re-runs a function whenever anything it
//! read changes. Both fire synchronously from the write that caused them.
//!
//! A source is a reactive object (watched deeply by default), a ref, a
//! computed, or a getter. Deep watching reads every nested key so that any
//! nested write fires the callback.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use super::computed::Computed;
use super::dep::TargetId;
use super::effect::ReactiveEffect;
use super::proxy::Reactive;
use super::refs::Ref;
use super::value::Value;

type CleanupFn = Box<dyn FnOnce() + Send>;
type Getter = Arc<dyn Fn() -> Value + Send + Sync>;

/// What a watcher observes.
#[derive(Clone)]
pub enum WatchSource {
    Reactive(Reactive),
    Ref(Ref<Value>),
    Computed(Computed<Value>),
    Getter(Getter),
}

impl WatchSource {
    pub fn getter<F>(f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        WatchSource::Getter(Arc::new(f))
    }
}

impl From<Reactive> for WatchSource {
    fn from(r: Reactive) -> Self {
        WatchSource::Reactive(r)
    }
}

impl From<Ref<Value>> for WatchSource {
    fn from(r: Ref<Value>) -> Self {
        WatchSource::Ref(r)
    }
}

impl From<Computed<Value>> for WatchSource {
    fn from(c: Computed<Value>) -> Self {
        WatchSource::Computed(c)
    }
}

/// Watcher options.
#[derive(Debug, Clone, Copy, Default)]
pub struct WatchOptions {
    /// Traverse the value so nested writes fire the callback. Reactive
    /// sources default to deep; `Some(false)` limits them to their own keys.
    pub deep: Option<bool>,
    /// Fire the callback once right away, with `Null` as the old value.
    pub immediate: bool,
}

/// Registers a function to run before the watcher's next callback, or when
/// the watcher stops.
pub struct OnCleanup {
    slot: Arc<Mutex<Option<CleanupFn>>>,
}

impl OnCleanup {
    pub fn register(&self, f: impl FnOnce() + Send + 'static) {
        *self.slot.lock() = Some(Box::new(f));
    }
}

fn run_cleanup(slot: &Mutex<Option<CleanupFn>>) {
    let pending = slot.lock().take();
    if let Some(cleanup) = pending {
        cleanup();
    }
}

/// Handle to a running watcher.
pub struct WatchHandle {
    effect: ReactiveEffect,
    cleanup: Arc<Mutex<Option<CleanupFn>>>,
}

impl WatchHandle {
    /// Stop watching and run any pending cleanup.
    pub fn stop(&self) {
        self.effect.stop();
        run_cleanup(&self.cleanup);
    }

    pub fn effect(&self) -> &ReactiveEffect {
        &self.effect
    }
}

/// Watch `source`, calling `callback(new, old, on_cleanup)` when it changes.
pub fn watch<S, F>(source: S, callback: F, options: WatchOptions) -> WatchHandle
where
    S: Into<WatchSource>,
    F: FnMut(&Value, &Value, &OnCleanup) + Send + 'static,
{
    let source = source.into();
    let mut force_trigger = false;

    let base: Getter = match source {
        WatchSource::Reactive(target) => {
            force_trigger = true;
            let depth = if options.deep == Some(false) { Some(1) } else { None };
            Arc::new(move || {
                let value = Value::Reactive(target.clone());
                traverse(&value, depth, &mut HashSet::new());
                value
            })
        }
        WatchSource::Ref(r) => Arc::new(move || r.get()),
        WatchSource::Computed(c) => Arc::new(move || c.get()),
        WatchSource::Getter(f) => f,
    };

    let deep = options.deep == Some(true);
    let getter: Getter = if deep && !force_trigger {
        Arc::new(move || {
            let value = base();
            traverse(&value, None, &mut HashSet::new());
            value
        })
    } else {
        base
    };

    let latest = Arc::new(Mutex::new(Value::Null));
    let effect = ReactiveEffect::new({
        let latest = Arc::clone(&latest);
        move || {
            let value = getter();
            *latest.lock() = value;
        }
    });

    let cleanup: Arc<Mutex<Option<CleanupFn>>> = Arc::new(Mutex::new(None));
    let old: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
    let callback = Arc::new(Mutex::new(callback));

    let job: Arc<dyn Fn() + Send + Sync> = {
        let effect = effect.clone();
        let latest = Arc::clone(&latest);
        let cleanup = Arc::clone(&cleanup);
        let old = Arc::clone(&old);
        Arc::new(move || {
            // A write from inside the callback lands here re-entrantly; the
            // outer call picks it up on its next iteration.
            let Some(mut callback) = callback.try_lock() else {
                return;
            };
            while effect.is_active() && effect.dirty() {
                effect.run();
                let new_value = latest.lock().clone();
                let previous = old.lock().clone();
                let changed = previous.as_ref().map_or(true, |p| !p.same(&new_value));
                if deep || force_trigger || changed {
                    run_cleanup(&cleanup);
                    let on_cleanup = OnCleanup {
                        slot: Arc::clone(&cleanup),
                    };
                    (*callback)(&new_value, &previous.unwrap_or_default(), &on_cleanup);
                    *old.lock() = Some(new_value);
                }
            }
        })
    };

    effect.set_scheduler(Some(Arc::clone(&job)));

    if options.immediate {
        job();
    } else {
        effect.run();
        *old.lock() = Some(latest.lock().clone());
    }

    WatchHandle { effect, cleanup }
}

/// Run `f` now and again whenever anything it read changes.
pub fn watch_effect<F>(f: F) -> WatchHandle
where
    F: Fn(&OnCleanup) + Send + Sync + 'static,
{
    let cleanup: Arc<Mutex<Option<CleanupFn>>> = Arc::new(Mutex::new(None));
    let effect = ReactiveEffect::new({
        let cleanup = Arc::clone(&cleanup);
        move || {
            run_cleanup(&cleanup);
            f(&OnCleanup {
                slot: Arc::clone(&cleanup),
            });
        }
    });

    let handle = effect.clone();
    effect.set_scheduler(Some(Arc::new(move || {
        if handle.is_active() && handle.dirty() {
            handle.run();
        }
    })));
    effect.run();

    WatchHandle { effect, cleanup }
}

/// Read every key reachable from `value`, down to `depth` levels.
fn traverse(value: &Value, depth: Option<usize>, seen: &mut HashSet<TargetId>) {
    if depth == Some(0) {
        return;
    }
    let next = depth.map(|d| d - 1);
    match value {
        Value::Reactive(target) => {
            if !seen.insert(target.raw().id()) {
                return;
            }
            for key in target.keys() {
                traverse(&target.get(&key), next, seen);
            }
        }
        Value::List(items) => {
            for item in items.iter() {
                traverse(item, next, seen);
            }
        }
        _ => {}
    }
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{reactive, Object};
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn watch_ref_passes_new_and_old() {
        let count = Ref::new(Value::from(1));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let _handle = watch(
            count.clone(),
            {
                let seen = seen.clone();
                move |new: &Value, old: &Value, _: &OnCleanup| {
                    seen.lock().push((new.clone(), old.clone()));
                }
            },
            WatchOptions::default(),
        );

        // Not immediate
        assert!(seen.lock().is_empty());

        count.set(Value::from(2));
        count.set(Value::from(2));
        count.set(Value::from(3));

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], (Value::from(2), Value::from(1)));
        assert_eq!(seen[1], (Value::from(3), Value::from(2)));
    }

    #[test]
    fn immediate_fires_with_null_old_value() {
        let count = Ref::new(Value::from(1));
        let olds = Arc::new(Mutex::new(Vec::new()));

        let _handle = watch(
            count,
            {
                let olds = olds.clone();
                move |_: &Value, old: &Value, _: &OnCleanup| olds.lock().push(old.clone())
            },
            WatchOptions {
                immediate: true,
                ..WatchOptions::default()
            },
        );

        assert_eq!(*olds.lock(), vec![Value::Null]);
    }

    #[test]
    fn reactive_source_is_deep_by_default() {
        let inner: Object = [("n", 1)].into_iter().collect();
        let raw: Object = [("inner", Value::from(inner))].into_iter().collect();
        let state = reactive(&raw);
        let fired = Arc::new(AtomicI32::new(0));

        let _deep = watch(
            state.clone(),
            {
                let fired = fired.clone();
                move |_: &Value, _: &Value, _: &OnCleanup| {
                    fired.fetch_add(1, Ordering::SeqCst);
                }
            },
            WatchOptions::default(),
        );

        let nested = state.get("inner");
        nested.as_reactive().unwrap().set("n", 2);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn shallow_reactive_watch_ignores_nested_writes() {
        let inner: Object = [("n", 1)].into_iter().collect();
        let raw: Object = [("inner", Value::from(inner)), ("top", Value::from(0))]
            .into_iter()
            .collect();
        let state = reactive(&raw);
        let fired = Arc::new(AtomicI32::new(0));

        let _handle = watch(
            state.clone(),
            {
                let fired = fired.clone();
                move |_: &Value, _: &Value, _: &OnCleanup| {
                    fired.fetch_add(1, Ordering::SeqCst);
                }
            },
            WatchOptions {
                deep: Some(false),
                ..WatchOptions::default()
            },
        );

        state.get("inner").as_reactive().unwrap().set("n", 5);
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        state.set("top", 1);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cleanup_runs_before_next_callback_and_on_stop() {
        let count = Ref::new(Value::from(0));
        let cleanups = Arc::new(AtomicI32::new(0));

        let handle = watch(
            count.clone(),
            {
                let cleanups = cleanups.clone();
                move |_: &Value, _: &Value, on_cleanup: &OnCleanup| {
                    let cleanups = cleanups.clone();
                    on_cleanup.register(move || {
                        cleanups.fetch_add(1, Ordering::SeqCst);
                    });
                }
            },
            WatchOptions::default(),
        );

        count.set(Value::from(1));
        assert_eq!(cleanups.load(Ordering::SeqCst), 0);
        count.set(Value::from(2));
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);

        handle.stop();
        assert_eq!(cleanups.load(Ordering::SeqCst), 2);

        count.set(Value::from(3));
        assert_eq!(cleanups.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn watch_effect_reruns_on_change() {
        let count = Ref::new(1);
        let seen = Arc::new(AtomicI32::new(0));

        let handle = watch_effect({
            let count = count.clone();
            let seen = seen.clone();
            move |_| seen.store(count.get(), Ordering::SeqCst)
        });
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        count.set(4);
        assert_eq!(seen.load(Ordering::SeqCst), 4);

        handle.stop();
        count.set(9);
        assert_eq!(seen.load(Ordering::SeqCst), 4);
    }
}
