//! Trellis Core
//!
//! This crate provides the core runtime for the Trellis reactive UI framework.
//! It implements:
//!
//! - Reactive primitives (reactive objects, refs, computeds, effects, watchers)
//! - A job scheduler that batches updates into one re-render per component
//! - Virtual nodes, components and a host-agnostic renderer with keyed diffing
//! - `KeepAlive` and `Teleport` built-ins
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: dependency tracking and the reactive primitives
//! - `scheduler`: the deduplicating job queue and its flush loop
//! - `render`: vnodes, components, lifecycle hooks and the renderer
//! - `config`: runtime knobs (recursion limit, keep-alive cache size)
//! - `error`: error and diagnostic types
//!
//! # Example
//!
//! ```rust
//! use trellis_core::h;
//! use trellis_core::reactive::{reactive, Object};
//! use trellis_core::render::{to_display_string, Component, MemoryHost, Renderer, SetupResult};
//! use trellis_core::scheduler::flush_pending;
//!
//! let state = reactive(&Object::from_iter([("count", 0)]));
//! let counter = {
//!     let state = state.clone();
//!     Component::builder("Counter")
//!         .setup(move |_, _| {
//!             let state = state.clone();
//!             SetupResult::render(move |_| h!("p", to_display_string(&state.get("count"))))
//!         })
//!         .build()
//! };
//!
//! let host = MemoryHost::new();
//! let root = host.root();
//! let renderer = Renderer::new(host);
//! renderer.render(Some(h!(&counter)), root);
//! assert_eq!(renderer.host().text_content(root), "0");
//!
//! state.set("count", 1);
//! flush_pending();
//! assert_eq!(renderer.host().text_content(root), "1");
//! ```

pub mod config;
pub mod error;
pub mod reactive;
pub mod render;
pub mod scheduler;

pub use error::{Result, RuntimeError};
pub use reactive::{computed, effect, reactive, watch, Computed, Reactive, Ref, Value};
pub use render::{h, Component, Renderer, VNode};
pub use scheduler::{flush_pending, next_tick};
