//! Verbosity control for polling diagnostics.
//!
//! Whether failed attempts are reported is decided once, up front, and passed
//! into the executors as a [`Verbosity`] value. Nothing in this module holds
//! global mutable state; [`LogSettings`] only *reads* the environment.
//!
//! # Environment
//!
//! | Variable | Effect |
//! |---|---|
//! | `VERBOSE_RESPONSE_LOGS` | verbose unless set to `false` |
//! | `VERBOSE_CONFIG_REBUILD_LOGS` | must be `true` for logs inside the config-rebuild context |
//! | `CI` | `true` forces verbose logs outside the config-rebuild context |
//!
//! # Examples
//!
//! ```rust
//! use eventually::{LogSettings, CONFIG_REBUILD_CONTEXT};
//!
//! let settings = LogSettings::from_lookup(|key| match key {
//!     "CI" => Some("true".to_string()),
//!     _ => None,
//! });
//!
//! assert!(settings.verbosity(Some(false), None).is_enabled());
//! assert!(!settings.verbosity(Some(true), Some(CONFIG_REBUILD_CONTEXT)).is_enabled());
//! ```

use std::time::Duration;

use crate::retry::RetryEvent;

/// Context tag for polling done while waiting on a gateway config rebuild.
///
/// These loops run constantly, so they stay quiet unless
/// `VERBOSE_CONFIG_REBUILD_LOGS=true`.
pub const CONFIG_REBUILD_CONTEXT: &str = "waitForConfigRebuild";

/// Logging switches read from the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSettings {
    /// Response/diagnostic logs are on.
    pub response_logs: bool,
    /// Logs inside the config-rebuild context are on.
    pub config_rebuild_logs: bool,
    /// Running under CI.
    pub ci: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            response_logs: true,
            config_rebuild_logs: false,
            ci: false,
        }
    }
}

impl LogSettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            response_logs: lookup("VERBOSE_RESPONSE_LOGS").as_deref() != Some("false"),
            config_rebuild_logs: lookup("VERBOSE_CONFIG_REBUILD_LOGS").as_deref() == Some("true"),
            ci: lookup("CI").as_deref() == Some("true"),
        }
    }

    /// Resolve the effective verbosity for one polling call.
    ///
    /// Inside [`CONFIG_REBUILD_CONTEXT`] the requested flag and CI are both
    /// ignored. Elsewhere CI always logs, and otherwise `requested` wins,
    /// defaulting to `response_logs`.
    pub fn verbosity(&self, requested: Option<bool>, context: Option<&str>) -> Verbosity {
        let enabled = if context == Some(CONFIG_REBUILD_CONTEXT) {
            self.config_rebuild_logs
        } else if self.ci {
            true
        } else {
            requested.unwrap_or(self.response_logs)
        };

        Verbosity {
            enabled,
            context: context.map(str::to_owned),
        }
    }
}

/// Injected logging capability for the polling executors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verbosity {
    enabled: bool,
    context: Option<String>,
}

impl Verbosity {
    /// Report failed attempts only at `trace` level.
    pub fn quiet() -> Self {
        Self::default()
    }

    /// Report every failed attempt at `info` level.
    pub fn verbose() -> Self {
        Self {
            enabled: true,
            context: None,
        }
    }

    /// Verbosity derived from the environment, with no context tag.
    pub fn from_env() -> Self {
        LogSettings::from_env().verbosity(None, None)
    }

    /// Attach a context tag to every emitted event.
    ///
    /// This does not re-resolve the enabled flag; use
    /// [`LogSettings::verbosity`] for context-dependent rules.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Whether per-attempt diagnostics are printed.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The context tag, if any.
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Report a failed attempt.
    ///
    /// Usable directly as an `on_retry` hook.
    pub fn log_retry<E: std::fmt::Display>(&self, event: &RetryEvent<'_, E>) {
        let context = self.context().unwrap_or("-");
        match event.next_delay {
            Some(delay) if self.enabled => {
                tracing::info!(
                    context,
                    attempt = event.attempt,
                    error = %event.error,
                    retry_in_secs = delay.as_secs_f64(),
                    "** Assertion(s) Failed -- Retrying in {} seconds **",
                    delay.as_secs_f64()
                );
            }
            Some(delay) => {
                tracing::trace!(
                    context,
                    attempt = event.attempt,
                    error = %event.error,
                    retry_in_secs = delay.as_secs_f64(),
                    "assertion(s) failed, retrying"
                );
            }
            None => {
                tracing::trace!(
                    context,
                    attempt = event.attempt,
                    error = %event.error,
                    "assertion(s) failed, deadline reached"
                );
            }
        }
    }

    /// Report the terminal deadline failure.
    pub fn log_timeout(&self, message: &dyn std::fmt::Display, attempts: u32, elapsed: Duration) {
        if self.enabled {
            tracing::warn!(
                context = self.context().unwrap_or("-"),
                attempts,
                elapsed_secs = elapsed.as_secs_f64(),
                "{}",
                message
            );
        }
    }
}
