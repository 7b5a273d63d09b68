//! Effect Scopes
//!
//! An [`EffectScope`] collects the effects created while it is active so they
//! can be stopped together. Component instances run their setup inside a
//! scope; unmounting stops the scope, which disposes every watcher and
//! computed the component created.

use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::effect::ReactiveEffect;

thread_local! {
    static ACTIVE_SCOPE: RefCell<Option<EffectScope>> = const { RefCell::new(None) };
}

#[derive(Default)]
struct ScopeInner {
    stopped: AtomicBool,
    effects: Mutex<Vec<ReactiveEffect>>,
}

/// A group of effects stopped together.
#[derive(Clone, Default)]
pub struct EffectScope {
    inner: Arc<ScopeInner>,
}

impl EffectScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with this scope active; effects created inside are recorded.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        let previous = ACTIVE_SCOPE.with(|slot| slot.replace(Some(self.clone())));
        let _restore = RestoreScope(Some(previous));
        f()
    }

    /// Stop every recorded effect.
    pub fn stop(&self) {
        if self.inner.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        let effects = std::mem::take(&mut *self.inner.effects.lock());
        tracing::trace!(effects = effects.len(), "stopping effect scope");
        for effect in &effects {
            effect.stop();
        }
    }

    pub fn is_active(&self) -> bool {
        !self.inner.stopped.load(Ordering::SeqCst)
    }

    pub fn effect_count(&self) -> usize {
        self.inner.effects.lock().len()
    }

    pub(crate) fn record(&self, effect: &ReactiveEffect) {
        if self.is_active() {
            self.inner.effects.lock().push(effect.clone());
        } else {
            effect.stop();
        }
    }
}

impl fmt::Debug for EffectScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectScope")
            .field("active", &self.is_active())
            .field("effects", &self.effect_count())
            .finish()
    }
}

struct RestoreScope(Option<Option<EffectScope>>);

impl Drop for RestoreScope {
    fn drop(&mut self) {
        if let Some(previous) = self.0.take() {
            ACTIVE_SCOPE.with(|slot| *slot.borrow_mut() = previous);
        }
    }
}

/// The scope new effects are currently recorded into.
pub fn current_scope() -> Option<EffectScope> {
    ACTIVE_SCOPE.with(|slot| slot.borrow().clone())
}

pub(crate) fn record_effect(effect: &ReactiveEffect) {
    if let Some(scope) = current_scope() {
        scope.record(effect);
    }
}
