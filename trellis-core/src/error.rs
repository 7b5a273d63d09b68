//! Error types for trellis-core
//!
//! Most runtime errors are diagnostics rather than failures: they describe an
//! authoring mistake the runtime recovers from (a `data` option that is not a
//! factory, a write to a prop, a missing teleport target). [`report`] logs
//! them through `tracing` and keeps a per-thread copy so hosts and tests can
//! inspect what went wrong.

use std::cell::RefCell;

use thiserror::Error;

/// Runtime error and diagnostic taxonomy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("data option of component `{component}` must be a function")]
    DataNotFunction { component: String },

    #[error("props are readonly: cannot assign `{key}`")]
    ReadonlyProp { key: String },

    #[error("computed value is readonly")]
    ReadonlyComputed,

    #[error("`{api}` called outside of a component setup or render")]
    MissingInstance { api: &'static str },

    #[error("teleport target `{selector}` not found")]
    TeleportTargetMissing { selector: String },

    #[error("maximum recursive updates exceeded ({limit} batches in one tick)")]
    RecursionLimit { limit: usize },

    #[error("invalid runtime config: {0}")]
    InvalidConfig(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, RuntimeError>;

thread_local! {
    static DIAGNOSTICS: RefCell<Vec<RuntimeError>> = const { RefCell::new(Vec::new()) };
}

/// Report a non-fatal diagnostic.
///
/// The error is logged at `warn` level and, unless disabled in the
/// [`RuntimeConfig`](crate::config::RuntimeConfig), buffered for
/// [`take_diagnostics`]. Execution always continues.
pub fn report(error: RuntimeError) {
    tracing::warn!(%error, "runtime diagnostic");
    if crate::config::current().record_diagnostics {
        DIAGNOSTICS.with(|buffer| buffer.borrow_mut().push(error));
    }
}

/// Drain the diagnostics reported on this thread so far.
pub fn take_diagnostics() -> Vec<RuntimeError> {
    DIAGNOSTICS.with(|buffer| std::mem::take(&mut *buffer.borrow_mut()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_buffers_diagnostics() {
        take_diagnostics();

        report(RuntimeError::ReadonlyProp { key: "title".into() });
        report(RuntimeError::ReadonlyComputed);

        let diagnostics = take_diagnostics();
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(
            diagnostics[0],
            RuntimeError::ReadonlyProp { key: "title".into() }
        );

        // Draining empties the buffer
        assert!(take_diagnostics().is_empty());
    }

    #[test]
    fn errors_render_readable_messages() {
        let err = RuntimeError::TeleportTargetMissing { selector: "#modal".into() };
        assert_eq!(err.to_string(), "teleport target `#modal` not found");

        let err = RuntimeError::RecursionLimit { limit: 100 };
        assert!(err.to_string().contains("100"));
    }
}
