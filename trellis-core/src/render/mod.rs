//! Virtual DOM and Rendering
//!
//! This module turns component trees into host nodes and keeps them in sync
//! with reactive state.
//!
//! # How Rendering Works
//!
//! 1. Render functions build [`VNode`] trees with [`h`] (or the block
//!    helpers, which also record which descendants can change).
//! 2. [`Renderer::render`] mounts the tree onto a [`Host`], or patches it
//!    against the previous tree in the same container.
//! 3. Each component instance renders inside its own effect. Reactive
//!    reads during render subscribe that effect; a later write queues the
//!    instance's update job and the next flush re-renders and patches only
//!    that component.
//!
//! Built-ins:
//!
//! - [`keep_alive`] caches deactivated component subtrees instead of
//!   unmounting them, with optional LRU eviction.
//! - `Teleport` vnodes render their children under another host node found
//!   with [`Host::query_selector`].

mod component;
mod flags;
mod host;
mod inject;
mod keep_alive;
mod lifecycle;
mod memory;
mod renderer;
mod sequence;
mod vnode;

pub use component::{
    current_instance, Component, ComponentBuilder, ComponentInstance, DataOption, FunctionalFn,
    ReadonlyProps, RenderContext, RenderFn, SetupContext, SetupFn, SetupResult,
};
pub use flags::{PatchFlags, ShapeFlags, SpecialPatch};
pub use host::{Host, NodeId};
pub use inject::{inject, inject_or, provide};
pub use keep_alive::keep_alive;
pub use lifecycle::{
    on_before_mount, on_before_unmount, on_before_update, on_mounted, on_unmounted, on_updated,
    LifecycleHook,
};
pub use memory::{HostOp, MemoryHost};
pub use renderer::Renderer;
pub use sequence::longest_increasing_subsequence;
pub use vnode::{
    close_block, create_block, create_element_block, create_element_vnode, create_vnode,
    create_vnode_with_flags, h, is_same_vnode_type, open_block, to_display_string, Children,
    HArg, Handler, Key, PropValue, Props, Slot, Slots, VNode, VNodeType,
};
