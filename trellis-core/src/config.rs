//! Runtime Configuration
//!
//! Settings that tune the scheduler and the built-in components. The runtime
//! is single-threaded, so the active configuration is a per-thread slot:
//! install one with [`install`] before mounting, read it with [`current`].
//!
//! # Example
//!
//! ```
//! use trellis_core::config::{self, RuntimeConfig};
//!
//! let cfg = RuntimeConfig::from_json(r#"{ "recursion_limit": 50 }"#).unwrap();
//! assert_eq!(cfg.recursion_limit, 50);
//! assert_eq!(cfg.keep_alive_max, None);
//!
//! config::install(cfg).unwrap();
//! assert_eq!(config::current().recursion_limit, 50);
//! ```

use std::cell::RefCell;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RuntimeError};

/// Default number of job batches one tick may flush.
pub const DEFAULT_RECURSION_LIMIT: usize = 100;

/// Configuration for the reactive runtime and renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Maximum number of consecutive job batches flushed in a single tick.
    ///
    /// A component whose update re-queues itself would otherwise flush
    /// forever. Exceeding the limit drops the remaining jobs and reports
    /// [`RuntimeError::RecursionLimit`].
    pub recursion_limit: usize,

    /// Cache bound for keep-alive components that do not pass a `max` prop.
    pub keep_alive_max: Option<usize>,

    /// Buffer reported diagnostics for [`take_diagnostics`](crate::error::take_diagnostics).
    pub record_diagnostics: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            keep_alive_max: None,
            record_diagnostics: true,
        }
    }
}

impl RuntimeConfig {
    /// Parse and validate a configuration from JSON.
    ///
    /// Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| RuntimeError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the runtime cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.recursion_limit == 0 {
            return Err(RuntimeError::InvalidConfig(
                "recursion_limit must be at least 1".into(),
            ));
        }
        if self.keep_alive_max == Some(0) {
            return Err(RuntimeError::InvalidConfig(
                "keep_alive_max must be at least 1 when set".into(),
            ));
        }
        Ok(())
    }
}

thread_local! {
    static CONFIG: RefCell<RuntimeConfig> = RefCell::new(RuntimeConfig::default());
}

/// Install a configuration for the current thread.
pub fn install(config: RuntimeConfig) -> Result<()> {
    config.validate()?;
    tracing::debug!(?config, "installing runtime config");
    CONFIG.with(|slot| *slot.borrow_mut() = config);
    Ok(())
}

/// The configuration active on the current thread.
pub fn current() -> RuntimeConfig {
    CONFIG.with(|slot| slot.borrow().clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config = RuntimeConfig::from_json("{}").unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.recursion_limit, DEFAULT_RECURSION_LIMIT);
        assert!(config.record_diagnostics);
    }

    #[test]
    fn rejects_zero_limits() {
        let err = RuntimeConfig::from_json(r#"{ "recursion_limit": 0 }"#).unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidConfig(_)));

        let err = RuntimeConfig::from_json(r#"{ "keep_alive_max": 0 }"#).unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = RuntimeConfig::from_json("{ recursion_limit").unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidConfig(_)));
    }

    #[test]
    fn install_is_per_thread() {
        let config = RuntimeConfig {
            keep_alive_max: Some(3),
            ..RuntimeConfig::default()
        };
        install(config).unwrap();
        assert_eq!(current().keep_alive_max, Some(3));

        let other = std::thread::spawn(|| current().keep_alive_max)
            .join()
            .unwrap();
        assert_eq!(other, None);

        install(RuntimeConfig::default()).unwrap();
    }
}
