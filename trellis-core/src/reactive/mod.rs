//! Reactive Primitives
//!
//! This module implements the reactivity engine: reactive objects, refs,
//! computeds, effects and watchers. These primitives drive component
//! re-rendering in the renderer.
//!
//! # Concepts
//!
//! ## Reactive objects and refs
//!
//! A [`Reactive`] is a tracked view over an [`Object`]; a [`Ref`] is a single
//! tracked slot. Reading either inside a running effect registers the effect
//! as a subscriber of exactly the keys it read. Writing a *different* value
//! notifies those subscribers; writing an identical value does nothing.
//!
//! ## Effects
//!
//! A [`ReactiveEffect`] is a function plus the dependencies it read on its
//! last run. When a dependency changes the effect is marked dirty and its
//! scheduler is called. Render effects use the job queue in
//! [`scheduler`](crate::scheduler) as their scheduler, which coalesces many
//! writes into one re-render.
//!
//! ## Computeds
//!
//! A [`Computed`] caches a derived value and recomputes it lazily, only when
//! read after a dependency changed.
//!
//! # Implementation Notes
//!
//! Dependency tracking is automatic: a thread-local slot holds the active
//! effect and every tracked read consults it. Dependencies are re-collected
//! on every run, so conditional reads subscribe only to the branch taken.

mod computed;
mod context;
mod dep;
mod effect;
mod proxy;
mod refs;
mod scope;
mod value;
mod watch;

pub use computed::{computed, Computed};
pub use context::{untracked, ReactiveContext};
pub use dep::{track, tracked_key_count, trigger, Dep, TargetId};
pub use effect::{
    effect, effect_with_scheduler, DirtyLevel, EffectId, EffectRunner, ReactiveEffect, Scheduler,
    WeakEffect,
};
pub use proxy::{is_reactive, reactive, shallow_reactive, to_raw, to_reactive, Reactive};
pub use refs::{proxy_refs, to_ref, to_refs, Binding, ObjectRef, ProxyRefs, Ref, RefValue};
pub use scope::{current_scope, EffectScope};
pub use value::{Object, Value};
pub use watch::{watch, watch_effect, OnCleanup, WatchHandle, WatchOptions, WatchSource};
