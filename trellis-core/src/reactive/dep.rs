//! Dependency Graph
//!
//! A [`Dep`] is the subscriber set of one reactive slot: one key of one
//! reactive object, or the value of one ref or computed. Each subscriber is
//! stored with the tracking id of the run that last read the slot, which is
//! how a run tells "already recorded this pass" apart from "left over from a
//! previous pass".
//!
//! # How It Works
//!
//! Object keys are resolved through a global forward map:
//!
//! ```text
//! target id ──► DepsMap ──► key ──► Dep ──► { effect: track id }
//! ```
//!
//! 1. [`track`] looks up (creating on demand) the dep for `(target, key)`
//!    and subscribes the active effect.
//!
//! 2. [`trigger`] marks every subscriber of that dep dirty and calls its
//!    scheduler, unless the subscriber is the effect currently running.
//!
//! 3. When a dep loses its last subscriber its cleanup hook removes it from
//!    the owning map. When a target is dropped its whole entry is removed.
//!
//! Effects are held weakly so the graph never keeps an effect alive. No
//! map or dep lock is held while schedulers or cleanup hooks run.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use dashmap::DashMap;
use indexmap::IndexMap;
use parking_lot::Mutex;

use super::context::ReactiveContext;
use super::effect::{DirtyLevel, EffectId, EffectInner, ReactiveEffect};

/// Identity of a reactive target (a raw object).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub(crate) u64);

impl TargetId {
    pub(crate) fn next() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

type Cleanup = Box<dyn Fn(&Dep) + Send + Sync>;

struct DepInner {
    name: String,
    subscribers: Mutex<IndexMap<EffectId, (Weak<EffectInner>, u64)>>,
    cleanup: Option<Cleanup>,
}

/// The set of effects subscribed to one reactive slot.
#[derive(Clone)]
pub struct Dep {
    inner: Arc<DepInner>,
}

impl Dep {
    pub(crate) fn new(name: impl Into<String>, cleanup: Option<Cleanup>) -> Self {
        Self {
            inner: Arc::new(DepInner {
                name: name.into(),
                subscribers: Mutex::new(IndexMap::new()),
                cleanup,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Number of live subscribers.
    pub fn len(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn subscribers(&self) -> Vec<ReactiveEffect> {
        self.inner
            .subscribers
            .lock()
            .values()
            .filter_map(|(weak, _)| weak.upgrade().map(|inner| ReactiveEffect { inner }))
            .collect()
    }

    /// Remove a subscriber outright, e.g. when its effect is dropped.
    pub(crate) fn forget_subscriber(&self, id: EffectId) {
        let emptied = {
            let mut subscribers = self.inner.subscribers.lock();
            subscribers.shift_remove(&id).is_some() && subscribers.is_empty()
        };
        if emptied {
            self.run_cleanup();
        }
    }

    fn run_cleanup(&self) {
        if let Some(cleanup) = &self.inner.cleanup {
            cleanup(self);
        }
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dep")
            .field("name", &self.inner.name)
            .field("subscribers", &self.len())
            .finish()
    }
}

/// Subscribe `effect` to `dep` for the current tracking pass.
pub(crate) fn track_effect(effect: &ReactiveEffect, dep: &Dep) {
    let track_id = effect.track_id();
    {
        let mut subscribers = dep.inner.subscribers.lock();
        match subscribers.get_mut(&effect.id()) {
            Some((_, recorded)) if *recorded == track_id => return,
            Some((_, recorded)) => *recorded = track_id,
            None => {
                subscribers.insert(effect.id(), (Arc::downgrade(&effect.inner), track_id));
            }
        }
    }

    if let Some(displaced) = effect.record_dep(dep) {
        clean_dep_effect(&displaced, effect);
    }
}

/// Unsubscribe `effect` from `dep`, unless the current pass already read it.
pub(crate) fn clean_dep_effect(dep: &Dep, effect: &ReactiveEffect) {
    let emptied = {
        let mut subscribers = dep.inner.subscribers.lock();
        match subscribers.get(&effect.id()) {
            Some((_, recorded)) if *recorded != effect.track_id() => {
                subscribers.shift_remove(&effect.id());
                subscribers.is_empty()
            }
            _ => false,
        }
    };
    if emptied {
        dep.run_cleanup();
    }
}

/// Mark every subscriber dirty and schedule those not currently running.
pub(crate) fn trigger_effects(dep: &Dep) {
    for effect in dep.subscribers() {
        if !effect.is_active() {
            continue;
        }
        if effect.dirty_level() < DirtyLevel::Dirty {
            effect.set_dirty(true);
        }
        if !effect.is_running() {
            if let Some(scheduler) = effect.scheduler() {
                scheduler();
            }
        }
    }
}

/// Per-target map from key to dep.
#[derive(Default)]
pub(crate) struct DepsMap {
    deps: Mutex<HashMap<String, Dep>>,
}

impl DepsMap {
    fn get(&self, key: &str) -> Option<Dep> {
        self.deps.lock().get(key).cloned()
    }

    fn get_or_create(self: &Arc<Self>, key: &str) -> Dep {
        let mut deps = self.deps.lock();
        if let Some(dep) = deps.get(key) {
            return dep.clone();
        }

        let owner = Arc::downgrade(self);
        let owned_key = key.to_string();
        let dep = Dep::new(
            key,
            Some(Box::new(move |dep: &Dep| {
                if let Some(map) = owner.upgrade() {
                    let mut deps = map.deps.lock();
                    if deps.get(&owned_key).is_some_and(|d| d.ptr_eq(dep)) {
                        deps.remove(&owned_key);
                    }
                }
            })),
        );
        deps.insert(key.to_string(), dep.clone());
        dep
    }

    fn len(&self) -> usize {
        self.deps.lock().len()
    }
}

static TARGET_MAP: OnceLock<DashMap<TargetId, Arc<DepsMap>>> = OnceLock::new();

fn target_map() -> &'static DashMap<TargetId, Arc<DepsMap>> {
    TARGET_MAP.get_or_init(DashMap::new)
}

/// Subscribe the active effect to `(target, key)`.
///
/// Does nothing when no effect is active.
pub fn track(target: TargetId, key: &str) {
    let Some(effect) = ReactiveContext::current() else {
        return;
    };
    let deps_map = Arc::clone(
        &*target_map()
            .entry(target)
            .or_insert_with(|| Arc::new(DepsMap::default())),
    );
    let dep = deps_map.get_or_create(key);
    track_effect(&effect, &dep);
}

/// Notify the subscribers of `(target, key)`.
pub fn trigger(target: TargetId, key: &str) {
    let Some(deps_map) = target_map().get(&target).map(|entry| Arc::clone(&*entry)) else {
        return;
    };
    if let Some(dep) = deps_map.get(key) {
        tracing::trace!(?target, key, subscribers = dep.len(), "trigger");
        trigger_effects(&dep);
    }
}

/// Drop all dependency bookkeeping for a target.
pub(crate) fn forget_target(target: TargetId) {
    if let Some(map) = TARGET_MAP.get() {
        map.remove(&target);
    }
}

/// Number of keys of `target` that currently have subscribers.
pub fn tracked_key_count(target: TargetId) -> usize {
    target_map()
        .get(&target)
        .map(|entry| entry.len())
        .unwrap_or(0)
}

/// A dep created on first read, for single-slot sources (refs, computeds).
#[derive(Clone)]
pub(crate) struct LazyDep {
    name: &'static str,
    slot: Arc<Mutex<Option<Dep>>>,
}

impl LazyDep {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Subscribe the active effect, if any.
    pub(crate) fn track(&self) {
        let Some(effect) = ReactiveContext::current() else {
            return;
        };
        let dep = {
            let mut slot = self.slot.lock();
            match &*slot {
                Some(dep) => dep.clone(),
                None => {
                    let owner = Arc::downgrade(&self.slot);
                    let dep = Dep::new(
                        self.name,
                        Some(Box::new(move |dep: &Dep| {
                            if let Some(slot) = owner.upgrade() {
                                let mut slot = slot.lock();
                                if slot.as_ref().is_some_and(|d| d.ptr_eq(dep)) {
                                    *slot = None;
                                }
                            }
                        })),
                    );
                    *slot = Some(dep.clone());
                    dep
                }
            }
        };
        track_effect(&effect, &dep);
    }

    pub(crate) fn trigger(&self) {
        let dep = self.slot.lock().clone();
        if let Some(dep) = dep {
            trigger_effects(&dep);
        }
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.slot.lock().as_ref().map(Dep::len).unwrap_or(0)
    }
}

// ---- Tests ----
