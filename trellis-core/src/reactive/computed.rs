//! Computed Implementation
//!
//! A [`Computed`] is a cached derived value that re-evaluates only when one
//! of its dependencies changes.
//!
//! # How Computeds Work
//!
//! 1. The getter runs inside an internal effect, so its reads are tracked
//!    like any other effect's.
//!
//! 2. The internal effect never re-runs on its own. When a dependency
//!    changes it is marked dirty and its scheduler notifies the computed's
//!    own subscribers instead.
//!
//! 3. `get()` re-runs the getter only if the internal effect is dirty, then
//!    subscribes the caller. Values that are never read stay dirty and cost
//!    nothing.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::dep::LazyDep;
use super::effect::ReactiveEffect;
use crate::error::{report, Result, RuntimeError};

type Getter<T> = Arc<dyn Fn() -> T + Send + Sync>;
type Setter<T> = Arc<dyn Fn(T) + Send + Sync>;

struct ComputedInner<T> {
    effect: ReactiveEffect,
    getter: Getter<T>,
    value: Arc<RwLock<Option<T>>>,
    dep: LazyDep,
    setter: Option<Setter<T>>,
}

/// A lazily evaluated, cached derived value.
///
/// Cloning shares the cache.
pub struct Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    inner: Arc<ComputedInner<T>>,
}

impl<T> Clone for Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a read-only computed. The getter does not run until the first
    /// `get()`.
    pub fn new<F>(getter: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::build(getter, None)
    }

    /// Create a computed whose writes are forwarded to `setter`.
    pub fn with_setter<F, S>(getter: F, setter: S) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        S: Fn(T) + Send + Sync + 'static,
    {
        Self::build(getter, Some(Arc::new(setter)))
    }

    fn build<F>(getter: F, setter: Option<Setter<T>>) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let value = Arc::new(RwLock::new(None));
        let dep = LazyDep::new("computed");

        let getter: Getter<T> = Arc::new(getter);
        let slot = Arc::clone(&value);
        let run = Arc::clone(&getter);
        let effect = ReactiveEffect::new(move || {
            let next = run();
            *slot.write() = Some(next);
        });

        let notify = dep.clone();
        effect.set_scheduler(Some(Arc::new(move || notify.trigger())));

        Self {
            inner: Arc::new(ComputedInner {
                effect,
                getter,
                value,
                dep,
                setter,
            }),
        }
    }

    /// Get the current value, recomputing if a dependency changed.
    pub fn get(&self) -> T {
        let cached = if self.inner.effect.dirty() {
            None
        } else {
            self.inner.value.read().clone()
        };
        let value = match cached {
            Some(value) => value,
            None => self.refresh(),
        };
        self.inner.dep.track();
        value
    }

    /// Re-run the getter through the internal effect and return the fresh
    /// value.
    fn refresh(&self) -> T {
        self.inner.effect.run();
        let fresh = self.inner.value.read().clone();
        // Filled by the run above; evaluate untracked otherwise
        fresh.unwrap_or_else(|| (self.inner.getter)())
    }

    /// Forward a write to the setter.
    ///
    /// Read-only computeds report [`RuntimeError::ReadonlyComputed`].
    pub fn set(&self, value: T) -> Result<()> {
        match &self.inner.setter {
            Some(setter) => {
                setter(value);
                Ok(())
            }
            None => {
                report(RuntimeError::ReadonlyComputed);
                Err(RuntimeError::ReadonlyComputed)
            }
        }
    }

    /// Whether the next `get()` will re-run the getter.
    pub fn is_dirty(&self) -> bool {
        self.inner.effect.dirty()
    }

    /// The internal effect.
    pub fn effect(&self) -> &ReactiveEffect {
        &self.inner.effect
    }
}

impl<T> fmt::Debug for Computed<T>
where
    T: Clone + Send + Sync + fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("value", &*self.inner.value.read())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

/// Shorthand for [`Computed::new`].
pub fn computed<T, F>(getter: F) -> Computed<T>
where
    T: Clone + Send + Sync + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    Computed::new(getter)
}

// ---- Tests ----
