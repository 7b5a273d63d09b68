//! Effect Implementation
//!
//! A [`ReactiveEffect`] wraps a function whose reads of reactive state are
//! recorded as dependencies. When any dependency changes the effect is marked
//! dirty and its scheduler (if any) is invoked; the scheduler decides when to
//! re-run it.
//!
//! # How Effects Work
//!
//! 1. `run()` clears the dirty flag, makes the effect the active one and
//!    starts a new tracking pass: the dependency cursor is reset to zero and
//!    the tracking id is bumped.
//!
//! 2. Each dependency read during the pass is compared against the entry at
//!    the cursor. Identical entries are kept in place, so a stable render
//!    does no subscription work at all.
//!
//! 3. After the function returns, entries past the cursor are stale and are
//!    unsubscribed.
//!
//! 4. While an effect is running its scheduler is suppressed, so an effect
//!    that writes to its own dependencies does not schedule itself.
//!
//! # Ownership
//!
//! Dependencies hold effects weakly. Whoever owns the [`ReactiveEffect`]
//! handle keeps it alive: the component instance for render effects, the
//! [`EffectRunner`] for [`effect`]. Self-scheduling effects keep themselves
//! alive until [`stop`](ReactiveEffect::stop) breaks the cycle.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;

use super::context::ReactiveContext;
use super::dep::{clean_dep_effect, Dep};
use super::scope::record_effect;

/// Unique identifier for an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(u64);

impl EffectId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// How stale an effect is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum DirtyLevel {
    /// Up to date.
    Clean = 0,
    /// A dependency changed since the last run.
    Dirty = 4,
}

/// Callback invoked when a dirty effect should be re-run.
pub type Scheduler = Arc<dyn Fn() + Send + Sync>;

pub(crate) struct EffectInner {
    id: EffectId,
    func: Box<dyn Fn() + Send + Sync>,
    scheduler: RwLock<Option<Scheduler>>,
    active: AtomicBool,
    dirty_level: AtomicU8,
    track_id: AtomicU64,
    running: AtomicUsize,
    run_count: AtomicUsize,
    deps: Mutex<SmallVec<[Dep; 4]>>,
    deps_len: AtomicUsize,
}

impl Drop for EffectInner {
    fn drop(&mut self) {
        let deps = std::mem::take(self.deps.get_mut());
        for dep in &deps {
            dep.forget_subscriber(self.id);
        }
    }
}

/// A function whose reactive reads are tracked.
///
/// Cloning the handle shares the effect.
#[derive(Clone)]
pub struct ReactiveEffect {
    pub(crate) inner: Arc<EffectInner>,
}

impl ReactiveEffect {
    /// Create an effect without running it.
    ///
    /// The effect starts dirty. If an [`EffectScope`](super::EffectScope)
    /// is active the effect is recorded in it.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let effect = Self {
            inner: Arc::new(EffectInner {
                id: EffectId::next(),
                func: Box::new(func),
                scheduler: RwLock::new(None),
                active: AtomicBool::new(true),
                dirty_level: AtomicU8::new(DirtyLevel::Dirty as u8),
                track_id: AtomicU64::new(0),
                running: AtomicUsize::new(0),
                run_count: AtomicUsize::new(0),
                deps: Mutex::new(SmallVec::new()),
                deps_len: AtomicUsize::new(0),
            }),
        };
        record_effect(&effect);
        effect
    }

    /// Create an effect with a scheduler.
    pub fn with_scheduler<F>(func: F, scheduler: Scheduler) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let effect = Self::new(func);
        effect.set_scheduler(Some(scheduler));
        effect
    }

    pub fn id(&self) -> EffectId {
        self.inner.id
    }

    pub fn set_scheduler(&self, scheduler: Option<Scheduler>) {
        *self.inner.scheduler.write() = scheduler;
    }

    pub(crate) fn scheduler(&self) -> Option<Scheduler> {
        self.inner.scheduler.read().clone()
    }

    /// Run the function, collecting dependencies.
    ///
    /// A stopped effect still runs its function, but without tracking.
    pub fn run(&self) {
        self.inner
            .dirty_level
            .store(DirtyLevel::Clean as u8, Ordering::SeqCst);
        self.inner.run_count.fetch_add(1, Ordering::Relaxed);

        if !self.is_active() {
            (self.inner.func)();
            return;
        }

        let _ctx = ReactiveContext::enter(Some(self.clone()));
        let _pass = TrackingPass::start(self);
        (self.inner.func)();
    }

    /// Permanently unsubscribe the effect from all dependencies.
    ///
    /// Also drops the scheduler, releasing anything it captured.
    pub fn stop(&self) {
        if self.inner.active.swap(false, Ordering::SeqCst) {
            tracing::trace!(effect = ?self.id(), "stopping effect");
            self.pre_clean();
            self.post_clean();
            self.set_scheduler(None);
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    pub fn dirty_level(&self) -> DirtyLevel {
        if self.inner.dirty_level.load(Ordering::SeqCst) >= DirtyLevel::Dirty as u8 {
            DirtyLevel::Dirty
        } else {
            DirtyLevel::Clean
        }
    }

    pub fn dirty(&self) -> bool {
        self.dirty_level() == DirtyLevel::Dirty
    }

    pub fn set_dirty(&self, dirty: bool) {
        let level = if dirty { DirtyLevel::Dirty } else { DirtyLevel::Clean };
        self.inner.dirty_level.store(level as u8, Ordering::SeqCst);
    }

    /// Whether the effect function is currently on the stack.
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst) > 0
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::Relaxed)
    }

    /// Get the number of dependencies recorded by the last run.
    pub fn dependency_count(&self) -> usize {
        self.inner.deps.lock().len()
    }

    pub fn downgrade(&self) -> WeakEffect {
        WeakEffect(Arc::downgrade(&self.inner))
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn track_id(&self) -> u64 {
        self.inner.track_id.load(Ordering::SeqCst)
    }

    /// Record `dep` at the cursor, returning the dependency it displaced.
    pub(crate) fn record_dep(&self, dep: &Dep) -> Option<Dep> {
        let mut deps = self.inner.deps.lock();
        let cursor = self.inner.deps_len.fetch_add(1, Ordering::SeqCst);
        match deps.get(cursor) {
            Some(existing) if existing.ptr_eq(dep) => None,
            Some(_) => Some(std::mem::replace(&mut deps[cursor], dep.clone())),
            None => {
                deps.push(dep.clone());
                None
            }
        }
    }

    fn pre_clean(&self) {
        self.inner.deps_len.store(0, Ordering::SeqCst);
        self.inner.track_id.fetch_add(1, Ordering::SeqCst);
    }

    fn post_clean(&self) {
        let stale: SmallVec<[Dep; 4]> = {
            let mut deps = self.inner.deps.lock();
            let len = self.inner.deps_len.load(Ordering::SeqCst);
            if deps.len() > len {
                deps.drain(len..).collect()
            } else {
                SmallVec::new()
            }
        };
        for dep in &stale {
            clean_dep_effect(dep, self);
        }
    }
}

impl fmt::Debug for ReactiveEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveEffect")
            .field("id", &self.inner.id)
            .field("active", &self.is_active())
            .field("dirty", &self.dirty())
            .field("deps", &self.dependency_count())
            .finish()
    }
}

/// Non-owning reference to an effect.
#[derive(Clone)]
pub struct WeakEffect(Weak<EffectInner>);

impl WeakEffect {
    pub fn upgrade(&self) -> Option<ReactiveEffect> {
        self.0.upgrade().map(|inner| ReactiveEffect { inner })
    }
}

/// Brackets one tracked run: bumps the running counter and starts a new
/// pass; on drop, releases the counter and drops stale dependencies.
struct TrackingPass<'a> {
    effect: &'a ReactiveEffect,
}

impl<'a> TrackingPass<'a> {
    fn start(effect: &'a ReactiveEffect) -> Self {
        effect.inner.running.fetch_add(1, Ordering::SeqCst);
        effect.pre_clean();
        Self { effect }
    }
}

impl Drop for TrackingPass<'_> {
    fn drop(&mut self) {
        self.effect.inner.running.fetch_sub(1, Ordering::SeqCst);
        self.effect.post_clean();
    }
}

/// Handle returned by [`effect`].
#[derive(Clone, Debug)]
pub struct EffectRunner {
    effect: ReactiveEffect,
}

impl EffectRunner {
    /// Run the effect again, re-collecting its dependencies.
    pub fn run(&self) {
        self.effect.run();
    }

    pub fn stop(&self) {
        self.effect.stop();
    }

    pub fn effect(&self) -> &ReactiveEffect {
        &self.effect
    }
}

/// Create an effect that re-runs synchronously whenever a dependency
/// changes, and run it once immediately.
///
/// # Example
///
/// ```
/// use std::sync::atomic::{AtomicI64, Ordering};
/// use std::sync::Arc;
/// use trellis_core::reactive::{effect, Ref};
///
/// let count = Ref::new(1i64);
/// let seen = Arc::new(AtomicI64::new(0));
///
/// let runner = effect({
///     let count = count.clone();
///     let seen = seen.clone();
///     move || seen.store(count.get(), Ordering::SeqCst)
/// });
///
/// count.set(5);
/// assert_eq!(seen.load(Ordering::SeqCst), 5);
/// runner.stop();
/// ```
pub fn effect<F>(func: F) -> EffectRunner
where
    F: Fn() + Send + Sync + 'static,
{
    let effect = ReactiveEffect::new(func);
    let handle = effect.clone();
    effect.set_scheduler(Some(Arc::new(move || handle.run())));
    effect.run();
    EffectRunner { effect }
}

/// Like [`effect`], but dependency changes call `scheduler` instead of
/// re-running the function.
pub fn effect_with_scheduler<F>(func: F, scheduler: Scheduler) -> EffectRunner
where
    F: Fn() + Send + Sync + 'static,
{
    let effect = ReactiveEffect::with_scheduler(func, scheduler);
    effect.run();
    EffectRunner { effect }
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Ref;
    use std::sync::atomic::AtomicI32;

    #[test]
    fn effect_runs_immediately() {
        let counter = Arc::new(AtomicI32::new(0));
        let counter_clone = counter.clone();

        let runner = effect(move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(runner.effect().run_count(), 1);
        assert!(!runner.effect().dirty());
    }

    #[test]
    fn effect_reruns_on_change() {
        let source = Ref::new(1);
        let seen = Arc::new(AtomicI32::new(0));

        let runner = effect({
            let source = source.clone();
            let seen = seen.clone();
            move || seen.store(source.get(), Ordering::SeqCst)
        });

        source.set(7);
        assert_eq!(seen.load(Ordering::SeqCst), 7);
        assert_eq!(runner.effect().run_count(), 2);
    }

    #[test]
    fn stop_unsubscribes() {
        let source = Ref::new(1);
        let runs = Arc::new(AtomicI32::new(0));

        let runner = effect({
            let source = source.clone();
            let runs = runs.clone();
            move || {
                source.get();
                runs.fetch_add(1, Ordering::SeqCst);
            }
        });
        assert_eq!(runner.effect().dependency_count(), 1);

        runner.stop();
        assert!(!runner.effect().is_active());
        assert_eq!(runner.effect().dependency_count(), 0);

        source.set(2);
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        // A stopped effect still runs its function when asked, untracked
        runner.run();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(runner.effect().dependency_count(), 0);
        source.set(3);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn custom_scheduler_receives_notifications() {
        let source = Ref::new(0);
        let scheduled = Arc::new(AtomicI32::new(0));

        let runner = effect_with_scheduler(
            {
                let source = source.clone();
                move || {
                    source.get();
                }
            },
            {
                let scheduled = scheduled.clone();
                Arc::new(move || {
                    scheduled.fetch_add(1, Ordering::SeqCst);
                })
            },
        );

        source.set(1);
        source.set(2);
        assert_eq!(scheduled.load(Ordering::SeqCst), 2);
        // The scheduler did not re-run the effect
        assert_eq!(runner.effect().run_count(), 1);
        assert!(runner.effect().dirty());
    }

    #[test]
    fn self_write_does_not_reschedule() {
        let source = Ref::new(0);

        let runner = effect({
            let source = source.clone();
            move || {
                let v = source.get();
                if v < 10 {
                    source.set(v + 1);
                }
            }
        });

        // The write inside the run is suppressed by the running guard
        assert_eq!(source.get_untracked(), 1);
        assert_eq!(runner.effect().run_count(), 1);
    }
}
