//! Lifecycle hooks.
//!
//! Hooks are registered during `setup` against the current instance and run
//! with that instance current again, outside any tracking scope.

use std::sync::Arc;

use super::component::current_instance;
use crate::error::{report, RuntimeError};

/// The points in an instance's life where hooks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleHook {
    BeforeMount,
    Mounted,
    BeforeUpdate,
    Updated,
    BeforeUnmount,
    Unmounted,
}

impl LifecycleHook {
    fn api_name(self) -> &'static str {
        match self {
            LifecycleHook::BeforeMount => "on_before_mount",
            LifecycleHook::Mounted => "on_mounted",
            LifecycleHook::BeforeUpdate => "on_before_update",
            LifecycleHook::Updated => "on_updated",
            LifecycleHook::BeforeUnmount => "on_before_unmount",
            LifecycleHook::Unmounted => "on_unmounted",
        }
    }
}

fn register<F>(hook: LifecycleHook, f: F)
where
    F: Fn() + Send + Sync + 'static,
{
    match current_instance() {
        Some(instance) => instance.add_hook(hook, Arc::new(f)),
        None => report(RuntimeError::MissingInstance {
            api: hook.api_name(),
        }),
    }
}

pub fn on_before_mount<F: Fn() + Send + Sync + 'static>(f: F) {
    register(LifecycleHook::BeforeMount, f);
}

pub fn on_mounted<F: Fn() + Send + Sync + 'static>(f: F) {
    register(LifecycleHook::Mounted, f);
}

pub fn on_before_update<F: Fn() + Send + Sync + 'static>(f: F) {
    register(LifecycleHook::BeforeUpdate, f);
}

pub fn on_updated<F: Fn() + Send + Sync + 'static>(f: F) {
    register(LifecycleHook::Updated, f);
}

pub fn on_before_unmount<F: Fn() + Send + Sync + 'static>(f: F) {
    register(LifecycleHook::BeforeUnmount, f);
}

pub fn on_unmounted<F: Fn() + Send + Sync + 'static>(f: F) {
    register(LifecycleHook::Unmounted, f);
}
