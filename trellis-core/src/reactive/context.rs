//! Reactive Context
//!
//! The reactive context records which effect is currently running, so that
//! reads of reactive state can subscribe it. There is a single slot per
//! thread; entering a context saves the previous occupant and the guard
//! restores it on drop, which gives correct attribution for nested effects
//! (a computed read inside a render, a child render inside a parent render).
//!
//! Entering with `None` pauses tracking: reads inside an [`untracked`]
//! section subscribe nothing.

use std::cell::RefCell;

use super::effect::ReactiveEffect;

thread_local! {
    static ACTIVE_EFFECT: RefCell<Option<ReactiveEffect>> = const { RefCell::new(None) };
}

/// Guard that restores the previously active effect when dropped.
///
/// Restoring on drop keeps the slot consistent even if the effect body
/// panics.
pub struct ReactiveContext {
    previous: Option<ReactiveEffect>,
}

impl ReactiveContext {
    /// Make `effect` the active effect until the guard is dropped.
    pub fn enter(effect: Option<ReactiveEffect>) -> Self {
        let previous = ACTIVE_EFFECT.with(|slot| slot.replace(effect));
        Self { previous }
    }

    /// Check if there is an active effect.
    pub fn is_active() -> bool {
        ACTIVE_EFFECT.with(|slot| slot.borrow().is_some())
    }

    /// The effect reads are currently attributed to.
    pub fn current() -> Option<ReactiveEffect> {
        ACTIVE_EFFECT.with(|slot| slot.borrow().clone())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let previous = self.previous.take();
        ACTIVE_EFFECT.with(|slot| {
            *slot.borrow_mut() = previous;
        });
    }
}

/// Run `f` with dependency tracking paused.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _ctx = ReactiveContext::enter(None);
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_tracks_active_effect() {
        let effect = ReactiveEffect::new(|| {});

        assert!(!ReactiveContext::is_active());

        {
            let _ctx = ReactiveContext::enter(Some(effect.clone()));
            assert!(ReactiveContext::is_active());
            assert_eq!(ReactiveContext::current().map(|e| e.id()), Some(effect.id()));
        }

        // Slot is cleared after drop
        assert!(!ReactiveContext::is_active());
    }

    #[test]
    fn nested_contexts_restore_outer() {
        let outer = ReactiveEffect::new(|| {});
        let inner = ReactiveEffect::new(|| {});

        {
            let _outer = ReactiveContext::enter(Some(outer.clone()));
            {
                let _inner = ReactiveContext::enter(Some(inner.clone()));
                assert_eq!(ReactiveContext::current().map(|e| e.id()), Some(inner.id()));
            }
            assert_eq!(ReactiveContext::current().map(|e| e.id()), Some(outer.id()));

            untracked(|| assert!(!ReactiveContext::is_active()));
            assert!(ReactiveContext::is_active());
        }

        assert!(ReactiveContext::current().is_none());
    }
}
